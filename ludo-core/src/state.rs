//! Canonical game state: players, pieces, dice, pending decision and finish order.
//!
//! `GameState` is the single aggregate the turn controller mutates; it is also the shape
//! replicated to other participants (see `patch`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ability::Ability;
use crate::board::{seat_config, PIECES_PER_PLAYER, PLAYER_COUNT, START_POSITION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("player id must be in 1..=4, got {0}")]
pub struct InvalidPlayerId(pub u8);

/// Seat identifier, `1..=4`, stable for the whole game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PlayerId(u8);

impl PlayerId {
    pub const HOST: PlayerId = PlayerId(1);

    pub const ALL: [PlayerId; PLAYER_COUNT] = [PlayerId(1), PlayerId(2), PlayerId(3), PlayerId(4)];

    pub fn new(id: u8) -> Option<PlayerId> {
        (1..=PLAYER_COUNT as u8).contains(&id).then_some(PlayerId(id))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based seat index.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Next seat in increasing id order, wrapping 4 -> 1.
    pub fn next(self) -> PlayerId {
        PlayerId(self.0 % PLAYER_COUNT as u8 + 1)
    }
}

impl TryFrom<u8> for PlayerId {
    type Error = InvalidPlayerId;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        PlayerId::new(value).ok_or(InvalidPlayerId(value))
    }
}

impl From<PlayerId> for u8 {
    fn from(id: PlayerId) -> u8 {
        id.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique piece id, `0..16`.
pub type PieceId = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceState {
    Start,
    InPlay,
    Home,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub owner: PlayerId,
    pub state: PieceState,
    /// `-1` in start, `0..40` on the circuit, `100 * owner + step` on the home path.
    pub position: i32,
}

impl Piece {
    pub fn send_to_start(&mut self) {
        self.state = PieceState::Start;
        self.position = START_POSITION;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    pub pieces: Vec<Piece>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub has_shield: bool,
    #[serde(default)]
    pub is_computer: bool,
}

impl Player {
    /// Fresh player with all pieces in start. Piece ids are `seat_index * 4 + j`.
    pub fn new(id: PlayerId, name: impl Into<String>, color: impl Into<String>) -> Self {
        let base = (id.index() * PIECES_PER_PLAYER) as PieceId;
        let pieces = (0..PIECES_PER_PLAYER as PieceId)
            .map(|j| Piece {
                id: base + j,
                owner: id,
                state: PieceState::Start,
                position: START_POSITION,
            })
            .collect();
        Self {
            id,
            name: name.into(),
            color: color.into(),
            pieces,
            avatar_url: None,
            has_shield: false,
            is_computer: false,
        }
    }

    /// Lobby entry: identity only, pieces are created when the game starts.
    pub fn lobby(id: PlayerId, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            pieces: Vec::new(),
            ..Player::new(id, name, color)
        }
    }

    pub fn with_default_identity(id: PlayerId) -> Self {
        Player::new(id, format!("Player {id}"), seat_config(id).color)
    }

    pub fn all_home(&self) -> bool {
        !self.pieces.is_empty() && self.pieces.iter().all(|p| p.state == PieceState::Home)
    }
}

/// Lifecycle of a game instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Landing,
    Setup,
    Playing,
    GameOver,
}

/// The numbered die: `natural` is the face rolled, `modifier` what abilities added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    pub natural: u8,
    #[serde(default)]
    pub modifier: u8,
}

impl DiceRoll {
    pub fn natural(face: u8) -> Self {
        Self {
            natural: face,
            modifier: 0,
        }
    }

    pub fn value(self) -> i32 {
        i32::from(self.natural) + i32::from(self.modifier)
    }

    pub fn is_natural_six(self) -> bool {
        self.natural == 6
    }
}

/// What must happen next. Exactly one is active while a game is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PendingAction {
    Roll,
    Move {
        #[serde(default)]
        selected_piece_id: Option<PieceId>,
        valid_moves: Vec<i32>,
    },
    UseAbility {
        ability: Ability,
    },
    ShieldDefense {
        attacker_id: PlayerId,
        defender_id: PlayerId,
        position: i32,
    },
    Initializing,
    GameOver,
}

impl PendingAction {
    pub fn move_with(valid_moves: Vec<i32>) -> Self {
        PendingAction::Move {
            selected_piece_id: None,
            valid_moves,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PendingAction::Roll => "roll",
            PendingAction::Move { .. } => "move",
            PendingAction::UseAbility { .. } => "use_ability",
            PendingAction::ShieldDefense { .. } => "shield_defense",
            PendingAction::Initializing => "initializing",
            PendingAction::GameOver => "game_over",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub phase: GamePhase,
    pub players: Vec<Player>,
    pub current_player: PlayerId,
    pub dice: Option<DiceRoll>,
    pub ability: Option<Ability>,
    pub pending: Option<PendingAction>,
    /// Finish order; append-only.
    pub winners: Vec<PlayerId>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::landing()
    }
}

impl GameState {
    pub fn landing() -> Self {
        Self {
            phase: GamePhase::Landing,
            players: Vec::new(),
            current_player: PlayerId::HOST,
            dice: None,
            ability: None,
            pending: None,
            winners: Vec::new(),
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn current(&self) -> Option<&Player> {
        self.player(self.current_player)
    }

    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.players.iter().flat_map(|p| p.pieces.iter())
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces().find(|p| p.id == id)
    }

    pub fn piece_mut(&mut self, id: PieceId) -> Option<&mut Piece> {
        self.players
            .iter_mut()
            .flat_map(|p| p.pieces.iter_mut())
            .find(|p| p.id == id)
    }

    pub fn is_finished(&self, id: PlayerId) -> bool {
        self.winners.contains(&id)
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }
}
