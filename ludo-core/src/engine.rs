//! Turn controller: the single place that mutates `GameState` via rules.
//!
//! Each operation checks the pending action, works on a copy of the state and commits
//! only on success. A rejected operation leaves the state untouched. The returned
//! `SessionPatch` holds exactly the top-level fields that changed, ready to publish.

use thiserror::Error;

use crate::ability::Ability;
use crate::board::{seat_config, BoardLayout, PLAYER_COUNT};
use crate::chance::TurnContext;
use crate::patch::{apply_patch, SessionPatch};
use crate::rules::{self, Contact};
use crate::state::{
    DiceRoll, GamePhase, GameState, PendingAction, PieceId, PieceState, Player, PlayerId,
};

/// Why an input was ignored. The state is unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("game is not in progress")]
    NotPlaying,
    #[error("not allowed in phase {0:?}")]
    WrongPhase(GamePhase),
    #[error("not allowed while pending action is {0}")]
    WrongPending(&'static str),
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    #[error("unknown piece {0}")]
    UnknownPiece(PieceId),
    #[error("piece {piece} does not belong to player {player}")]
    NotOwner { piece: PieceId, player: PlayerId },
    #[error("illegal move")]
    IllegalMove,
    #[error("{0} is not one of the valid moves")]
    NotAValidMove(i32),
    #[error("ability {0:?} is not available")]
    AbilityUnavailable(Ability),
    #[error("ability {0:?} has nothing to act on")]
    NoTarget(Ability),
    #[error("no dice rolled")]
    NoDice,
    #[error("player {0} is not the defender")]
    NotDefender(PlayerId),
    #[error("current player still has legal moves")]
    MovesAvailable,
    #[error("inconsistent state: {0}")]
    Inconsistent(&'static str),
}

/// Per-seat options for a new game; unset fields fall back to seat defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeatSetup {
    pub name: Option<String>,
    pub color: Option<String>,
    pub avatar_url: Option<String>,
    pub is_computer: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameSetup {
    pub seats: [SeatSetup; PLAYER_COUNT],
}

impl GameSetup {
    pub fn seat(&self, id: PlayerId) -> &SeatSetup {
        &self.seats[id.index()]
    }

    pub fn seat_mut(&mut self, id: PlayerId) -> &mut SeatSetup {
        &mut self.seats[id.index()]
    }

    /// Seat 1 human, everybody else a computer.
    pub fn single_player() -> Self {
        let mut setup = GameSetup::default();
        for id in PlayerId::ALL.into_iter().skip(1) {
            setup.seat_mut(id).is_computer = true;
        }
        setup
    }

    pub fn all_computers() -> Self {
        let mut setup = GameSetup::default();
        for seat in &mut setup.seats {
            seat.is_computer = true;
        }
        setup
    }

    fn build_players(&self) -> Vec<Player> {
        PlayerId::ALL
            .into_iter()
            .map(|id| {
                let seat = self.seat(id);
                let mut player = Player::new(
                    id,
                    seat.name.clone().unwrap_or_else(|| format!("Player {id}")),
                    seat.color
                        .clone()
                        .unwrap_or_else(|| seat_config(id).color.to_string()),
                );
                player.avatar_url = seat.avatar_url.clone();
                player.is_computer = seat.is_computer;
                player
            })
            .collect()
    }
}

/// Read-only view handed to renderers and bots.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub state: &'a GameState,
    pub board: &'a BoardLayout,
    pub has_valid_moves: bool,
}

/// The inputs a participant (human UI or computer player) can give.
///
/// Implemented by `Engine` directly and by wrappers that add authority checks and
/// replication, so every caller goes through one rules path.
pub trait PlayerInput {
    type Error;

    fn state(&self) -> &GameState;
    fn board(&self) -> &BoardLayout;
    fn roll(&mut self) -> Result<(), Self::Error>;
    fn select_piece(&mut self, piece: PieceId) -> Result<(), Self::Error>;
    fn select_move(&mut self, piece: PieceId, delta: i32) -> Result<(), Self::Error>;
    fn use_ability(&mut self, ability: Ability) -> Result<(), Self::Error>;
    fn discard_ability(&mut self) -> Result<(), Self::Error>;
    fn answer_shield(&mut self, defender: PlayerId, accept: bool) -> Result<(), Self::Error>;
    fn skip(&mut self) -> Result<(), Self::Error>;
}

pub struct Engine {
    board: BoardLayout,
    state: GameState,
    ctx: TurnContext,
}

impl Engine {
    /// Engine on the landing screen with the standard board.
    pub fn new(ctx: TurnContext) -> Self {
        Self::with_state(GameState::landing(), ctx)
    }

    pub fn with_state(state: GameState, ctx: TurnContext) -> Self {
        Self {
            board: BoardLayout::standard(),
            state,
            ctx,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn board(&self) -> &BoardLayout {
        &self.board
    }

    pub fn context_mut(&mut self) -> &mut TurnContext {
        &mut self.ctx
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            state: &self.state,
            board: &self.board,
            has_valid_moves: self.has_valid_moves(),
        }
    }

    /// True iff the current player can legally play some entry of the active valid moves.
    pub fn has_valid_moves(&self) -> bool {
        has_valid_moves(&self.state, &self.board)
    }

    /// Legal `(piece, delta)` pairs for the current player under the active valid moves.
    pub fn legal_moves(&self) -> Vec<(PieceId, i32)> {
        legal_moves(&self.state, &self.board)
    }

    /// Winners in finish order, then unfinished players in id order.
    pub fn standings(&self) -> Vec<PlayerId> {
        standings(&self.state)
    }

    pub fn begin_setup(&mut self) -> Result<SessionPatch, Rejected> {
        self.transition(|s, _, _| match s.phase {
            GamePhase::Landing => {
                s.phase = GamePhase::Setup;
                Ok(())
            }
            other => Err(Rejected::WrongPhase(other)),
        })
    }

    pub fn initialize(&mut self, setup: &GameSetup) -> Result<SessionPatch, Rejected> {
        self.transition(|s, _, ctx| initialize(s, ctx, setup))
    }

    /// Back to the landing screen from anywhere.
    pub fn reset(&mut self) -> SessionPatch {
        let next = GameState::landing();
        let patch = SessionPatch::diff(&self.state, &next);
        self.state = next;
        patch
    }

    pub fn roll(&mut self) -> Result<SessionPatch, Rejected> {
        self.transition(|s, _, ctx| roll_dice(s, ctx))
    }

    pub fn use_ability(&mut self, ability: Ability) -> Result<SessionPatch, Rejected> {
        self.transition(|s, board, _| use_ability(s, board, ability))
    }

    pub fn discard_ability(&mut self) -> Result<SessionPatch, Rejected> {
        self.transition(|s, _, _| discard_ability(s))
    }

    pub fn select_piece(&mut self, piece: PieceId) -> Result<SessionPatch, Rejected> {
        self.transition(|s, board, _| select_piece(s, board, piece))
    }

    pub fn select_move(&mut self, piece: PieceId, delta: i32) -> Result<SessionPatch, Rejected> {
        self.transition(|s, board, _| select_move(s, board, piece, delta))
    }

    pub fn answer_shield(
        &mut self,
        defender: PlayerId,
        accept: bool,
    ) -> Result<SessionPatch, Rejected> {
        self.transition(|s, _, _| answer_shield(s, defender, accept))
    }

    pub fn skip(&mut self) -> Result<SessionPatch, Rejected> {
        self.transition(|s, board, _| skip(s, board))
    }

    /// Overwrite local state with fields received from another participant.
    pub fn apply_remote(&mut self, patch: &SessionPatch) {
        apply_patch(&mut self.state, patch);
    }

    fn transition<F>(&mut self, f: F) -> Result<SessionPatch, Rejected>
    where
        F: FnOnce(&mut GameState, &BoardLayout, &mut TurnContext) -> Result<(), Rejected>,
    {
        let mut next = self.state.clone();
        f(&mut next, &self.board, &mut self.ctx)?;
        let patch = SessionPatch::diff(&self.state, &next);
        self.state = next;
        Ok(patch)
    }
}

impl PlayerInput for Engine {
    type Error = Rejected;

    fn state(&self) -> &GameState {
        &self.state
    }

    fn board(&self) -> &BoardLayout {
        &self.board
    }

    fn roll(&mut self) -> Result<(), Rejected> {
        Engine::roll(self).map(drop)
    }

    fn select_piece(&mut self, piece: PieceId) -> Result<(), Rejected> {
        Engine::select_piece(self, piece).map(drop)
    }

    fn select_move(&mut self, piece: PieceId, delta: i32) -> Result<(), Rejected> {
        Engine::select_move(self, piece, delta).map(drop)
    }

    fn use_ability(&mut self, ability: Ability) -> Result<(), Rejected> {
        Engine::use_ability(self, ability).map(drop)
    }

    fn discard_ability(&mut self) -> Result<(), Rejected> {
        Engine::discard_ability(self).map(drop)
    }

    fn answer_shield(&mut self, defender: PlayerId, accept: bool) -> Result<(), Rejected> {
        Engine::answer_shield(self, defender, accept).map(drop)
    }

    fn skip(&mut self) -> Result<(), Rejected> {
        Engine::skip(self).map(drop)
    }
}

pub fn has_valid_moves(state: &GameState, board: &BoardLayout) -> bool {
    !legal_moves(state, board).is_empty()
}

pub fn legal_moves(state: &GameState, board: &BoardLayout) -> Vec<(PieceId, i32)> {
    if state.phase != GamePhase::Playing {
        return Vec::new();
    }
    match &state.pending {
        Some(PendingAction::Move { valid_moves, .. }) => {
            rules::legal_moves(board, &state.players, state.current_player, valid_moves)
        }
        _ => Vec::new(),
    }
}

pub fn standings(state: &GameState) -> Vec<PlayerId> {
    let mut out = state.winners.clone();
    for player in &state.players {
        if !out.contains(&player.id) {
            out.push(player.id);
        }
    }
    out
}

fn require_playing(s: &GameState) -> Result<(), Rejected> {
    if s.phase == GamePhase::Playing {
        Ok(())
    } else {
        Err(Rejected::NotPlaying)
    }
}

fn wrong_pending(s: &GameState) -> Rejected {
    Rejected::WrongPending(s.pending.as_ref().map_or("none", PendingAction::name))
}

fn natural_six(s: &GameState) -> bool {
    s.dice.is_some_and(DiceRoll::is_natural_six)
}

fn initialize(s: &mut GameState, ctx: &mut TurnContext, setup: &GameSetup) -> Result<(), Rejected> {
    if !matches!(s.phase, GamePhase::Landing | GamePhase::Setup) {
        return Err(Rejected::WrongPhase(s.phase));
    }
    s.players = setup.build_players();
    s.current_player = ctx.starting_player();
    s.phase = GamePhase::Playing;
    s.pending = Some(PendingAction::Roll);
    s.dice = None;
    s.ability = None;
    s.winners.clear();
    Ok(())
}

fn roll_dice(s: &mut GameState, ctx: &mut TurnContext) -> Result<(), Rejected> {
    require_playing(s)?;
    if s.pending != Some(PendingAction::Roll) {
        return Err(wrong_pending(s));
    }
    let current = s.current_player;
    if s.player(current).is_none() {
        return Err(Rejected::UnknownPlayer(current));
    }

    let r = ctx.roll();
    if let Some(player) = s.player_mut(current) {
        player.has_shield = r.ability == Ability::Shield;
    }
    s.dice = Some(DiceRoll::natural(r.die));
    s.ability = Some(r.ability);
    s.pending = Some(PendingAction::move_with(vec![i32::from(r.die)]));
    Ok(())
}

fn use_ability(s: &mut GameState, board: &BoardLayout, ability: Ability) -> Result<(), Rejected> {
    require_playing(s)?;
    if !matches!(s.pending, Some(PendingAction::Move { .. })) {
        return Err(wrong_pending(s));
    }
    if !ability.is_activatable() || s.ability != Some(ability) {
        return Err(Rejected::AbilityUnavailable(ability));
    }
    let roll = s.dice.ok_or(Rejected::NoDice)?;
    let value = roll.value();
    let current = s.current_player;

    match ability {
        Ability::PlusOne => {
            s.dice = Some(DiceRoll {
                modifier: roll.modifier.saturating_add(1),
                ..roll
            });
            s.pending = Some(PendingAction::move_with(vec![value + 1]));
        }
        Ability::BackForth => {
            s.pending = Some(PendingAction::move_with(vec![value, -value]));
        }
        Ability::Sword => {
            let any_target = s
                .pieces()
                .any(|p| rules::sword_target(&s.players, current, p.id, value).is_some());
            if !any_target {
                return Err(Rejected::NoTarget(ability));
            }
            s.pending = Some(PendingAction::UseAbility { ability });
        }
        Ability::GoldToken => {
            let (piece, entry, enemy) = rules::gold_token_move(board, &s.players, current)
                .ok_or(Rejected::NoTarget(ability))?;
            if let Some(enemy) = enemy.and_then(|id| s.piece_mut(id)) {
                enemy.send_to_start();
            }
            let piece = s.piece_mut(piece).ok_or(Rejected::UnknownPiece(piece))?;
            piece.state = PieceState::InPlay;
            piece.position = entry;
            s.pending = Some(PendingAction::move_with(vec![value]));
        }
        Ability::Shield | Ability::None => return Err(Rejected::AbilityUnavailable(ability)),
    }
    s.ability = None;
    Ok(())
}

fn discard_ability(s: &mut GameState) -> Result<(), Rejected> {
    require_playing(s)?;
    match &s.pending {
        Some(PendingAction::Move { .. }) if s.ability.is_some() => {}
        Some(PendingAction::UseAbility { .. }) => {}
        _ => return Err(wrong_pending(s)),
    }
    let value = s.dice.ok_or(Rejected::NoDice)?.value();
    s.ability = None;
    s.pending = Some(PendingAction::move_with(vec![value]));
    Ok(())
}

fn owned_piece(s: &GameState, piece: PieceId) -> Result<(), Rejected> {
    let p = s.piece(piece).ok_or(Rejected::UnknownPiece(piece))?;
    if p.owner != s.current_player {
        return Err(Rejected::NotOwner {
            piece,
            player: s.current_player,
        });
    }
    Ok(())
}

fn select_piece(s: &mut GameState, board: &BoardLayout, piece: PieceId) -> Result<(), Rejected> {
    require_playing(s)?;
    match s.pending.clone() {
        Some(PendingAction::Move { valid_moves, .. }) => {
            owned_piece(s, piece)?;
            let mut legal: Vec<i32> = valid_moves
                .iter()
                .copied()
                .filter(|&d| rules::is_legal_move(board, &s.players, piece, d))
                .collect();
            legal.dedup();
            match legal.as_slice() {
                [] => Err(Rejected::IllegalMove),
                [delta] => commit_move(s, board, piece, *delta),
                _ => {
                    // Both directions open: remember the piece, the direction comes next.
                    s.pending = Some(PendingAction::Move {
                        selected_piece_id: Some(piece),
                        valid_moves,
                    });
                    Ok(())
                }
            }
        }
        Some(PendingAction::UseAbility {
            ability: Ability::Sword,
        }) => sword_strike(s, piece),
        _ => Err(wrong_pending(s)),
    }
}

fn select_move(
    s: &mut GameState,
    board: &BoardLayout,
    piece: PieceId,
    delta: i32,
) -> Result<(), Rejected> {
    require_playing(s)?;
    let Some(PendingAction::Move { valid_moves, .. }) = &s.pending else {
        return Err(wrong_pending(s));
    };
    if !valid_moves.contains(&delta) {
        return Err(Rejected::NotAValidMove(delta));
    }
    owned_piece(s, piece)?;
    commit_move(s, board, piece, delta)
}

fn commit_move(
    s: &mut GameState,
    board: &BoardLayout,
    piece_id: PieceId,
    delta: i32,
) -> Result<(), Rejected> {
    let outcome =
        rules::apply_move(board, &s.players, piece_id, delta).ok_or(Rejected::IllegalMove)?;

    let piece = s.piece_mut(piece_id).ok_or(Rejected::UnknownPiece(piece_id))?;
    piece.position = outcome.new_position;
    piece.state = outcome.new_state;

    match outcome.contact {
        Contact::Empty => {}
        Contact::Capture { piece, .. } => {
            if let Some(victim) = s.piece_mut(piece) {
                victim.send_to_start();
            }
        }
        Contact::Shielded { defender, .. } => {
            // Suspend: no win check, no bonus, no turn change until the defender answers.
            s.pending = Some(PendingAction::ShieldDefense {
                attacker_id: s.current_player,
                defender_id: defender,
                position: outcome.new_position,
            });
            return Ok(());
        }
    }

    let bonus = outcome.landed_on_bonus || natural_six(s);
    end_of_move(s, bonus);
    Ok(())
}

fn sword_strike(s: &mut GameState, target: PieceId) -> Result<(), Rejected> {
    let steps = s.dice.ok_or(Rejected::NoDice)?.value();
    let dest = rules::sword_target(&s.players, s.current_player, target, steps)
        .ok_or(Rejected::IllegalMove)?;
    let piece = s.piece_mut(target).ok_or(Rejected::UnknownPiece(target))?;
    piece.position = dest;
    s.ability = None;
    // A sword strike always ends the turn, natural six or not.
    end_of_move(s, false);
    Ok(())
}

fn answer_shield(s: &mut GameState, defender: PlayerId, accept: bool) -> Result<(), Rejected> {
    require_playing(s)?;
    let Some(PendingAction::ShieldDefense {
        attacker_id,
        defender_id,
        position,
    }) = s.pending.clone()
    else {
        return Err(wrong_pending(s));
    };
    if defender != defender_id {
        return Err(Rejected::NotDefender(defender));
    }

    let find = |owner: PlayerId| {
        s.pieces()
            .find(|p| p.owner == owner && p.position == position && p.state == PieceState::InPlay)
            .map(|p| p.id)
    };
    let attacker_piece = find(attacker_id).ok_or(Rejected::Inconsistent("attacker piece missing"))?;
    let defender_piece = find(defender_id).ok_or(Rejected::Inconsistent("defender piece missing"))?;

    if let Some(player) = s.player_mut(defender_id) {
        player.has_shield = false;
    }

    if accept {
        let steps = s.dice.map_or(0, DiceRoll::value);
        let retreat = rules::retreat_position(&s.players, attacker_piece, position, steps);
        if let Some(piece) = s.piece_mut(attacker_piece) {
            match retreat {
                Some(pos) => piece.position = pos,
                None => piece.send_to_start(),
            }
        }
    } else if let Some(piece) = s.piece_mut(defender_piece) {
        piece.send_to_start();
    }

    let bonus = natural_six(s);
    end_of_move(s, bonus);
    Ok(())
}

fn skip(s: &mut GameState, board: &BoardLayout) -> Result<(), Rejected> {
    require_playing(s)?;
    if !matches!(s.pending, Some(PendingAction::Move { .. })) {
        return Err(wrong_pending(s));
    }
    if has_valid_moves(s, board) {
        return Err(Rejected::MovesAvailable);
    }
    let bonus = natural_six(s);
    end_of_move(s, bonus);
    Ok(())
}

/// Record newly finished players; returns true if that ended the game.
fn record_winners(s: &mut GameState) -> bool {
    for id in PlayerId::ALL {
        let done = s.player(id).is_some_and(Player::all_home);
        if done && !s.winners.contains(&id) {
            s.winners.push(id);
        }
    }
    if s.winners.len() >= PLAYER_COUNT - 1 {
        s.phase = GamePhase::GameOver;
        s.pending = Some(PendingAction::GameOver);
        true
    } else {
        false
    }
}

fn end_of_move(s: &mut GameState, bonus: bool) {
    if record_winners(s) {
        return;
    }
    if bonus {
        s.ability = None;
        s.pending = Some(PendingAction::Roll);
    } else {
        advance_turn(s);
    }
}

/// Hand the turn to the next unfinished player in increasing id order.
fn advance_turn(s: &mut GameState) {
    s.dice = None;
    s.ability = None;
    let mut next = s.current_player;
    for _ in 0..PLAYER_COUNT {
        next = next.next();
        if !s.is_finished(next) {
            break;
        }
    }
    s.current_player = next;
    s.pending = Some(PendingAction::Roll);
}
