//! Static board topology: the shared 40-cell circuit, four owner-exclusive home paths,
//! paired warps and bonus-turn cells.
//!
//! The layout is built once per game and never mutated; pieces live in `GameState`.

use serde::{Deserialize, Serialize};

use crate::state::PlayerId;

pub const PLAYER_COUNT: usize = 4;
pub const PIECES_PER_PLAYER: usize = 4;
pub const MAIN_CIRCUIT_SIZE: i32 = 40;
pub const HOME_PATH_SIZE: i32 = 4;

/// Position sentinel for a piece still waiting in its start area.
pub const START_POSITION: i32 = -1;

/// Corner cells granting another roll (unless something else already lives there).
pub const GO_AGAIN_POSITIONS: [i32; 4] = [0, 10, 20, 30];

/// Fixed per-seat configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatConfig {
    pub color: &'static str,
    /// Circuit cell a piece lands on when it leaves the start area.
    pub start_position: i32,
    /// Last circuit cell before the owner's home path.
    pub home_entry_position: i32,
}

/// Seat 1 sits on the bottom edge; seats follow clockwise, ten cells apart.
pub const SEAT_CONFIG: [SeatConfig; PLAYER_COUNT] = [
    SeatConfig {
        color: "#ff4141",
        start_position: 6,
        home_entry_position: 4,
    },
    SeatConfig {
        color: "#41a7ff",
        start_position: 16,
        home_entry_position: 14,
    },
    SeatConfig {
        color: "#ffda41",
        start_position: 26,
        home_entry_position: 24,
    },
    SeatConfig {
        color: "#52ff41",
        start_position: 36,
        home_entry_position: 34,
    },
];

pub fn seat_config(player: PlayerId) -> SeatConfig {
    SEAT_CONFIG[player.index()]
}

/// Reduce any integer onto the main circuit.
pub fn wrap(position: i32) -> i32 {
    position.rem_euclid(MAIN_CIRCUIT_SIZE)
}

pub fn is_main_circuit(position: i32) -> bool {
    (0..MAIN_CIRCUIT_SIZE).contains(&position)
}

/// Encoded home-path cell: `100 * owner + step`, `step` in `1..=HOME_PATH_SIZE`.
pub fn home_position(owner: PlayerId, step: i32) -> i32 {
    100 * i32::from(owner.get()) + step
}

/// Step along a home path (1-based), if `position` encodes one.
pub fn home_step(position: i32) -> Option<i32> {
    if position > 100 {
        let step = position % 100;
        (1..=HOME_PATH_SIZE).contains(&step).then_some(step)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceKind {
    Normal,
    Warp,
    GoAgain,
    StartEntry,
    HomePath,
    Home,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSpace {
    pub position: i32,
    pub kind: SpaceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warp_target: Option<i32>,
}

impl BoardSpace {
    fn normal(position: i32) -> Self {
        Self {
            position,
            kind: SpaceKind::Normal,
            owner: None,
            warp_target: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardLayout {
    circuit: Vec<BoardSpace>,
    home_paths: Vec<BoardSpace>,
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self::standard()
    }
}

impl BoardLayout {
    /// Build the fixed four-seat layout.
    ///
    /// Each seat's home entry doubles as a warp to the cell opposite it on the circuit,
    /// which yields two bidirectional pairs (4 <-> 24, 14 <-> 34).
    pub fn standard() -> Self {
        let mut circuit: Vec<BoardSpace> = (0..MAIN_CIRCUIT_SIZE).map(BoardSpace::normal).collect();

        for owner in PlayerId::ALL {
            let seat = seat_config(owner);
            let entry = &mut circuit[seat.start_position as usize];
            entry.kind = SpaceKind::StartEntry;
            entry.owner = Some(owner);
        }

        for owner in PlayerId::ALL {
            let seat = seat_config(owner);
            let warp = &mut circuit[seat.home_entry_position as usize];
            warp.kind = SpaceKind::Warp;
            warp.warp_target = Some(wrap(seat.home_entry_position + MAIN_CIRCUIT_SIZE / 2));
        }

        for pos in GO_AGAIN_POSITIONS {
            let space = &mut circuit[pos as usize];
            if space.kind == SpaceKind::Normal {
                space.kind = SpaceKind::GoAgain;
            }
        }

        let mut home_paths = Vec::with_capacity(PLAYER_COUNT * HOME_PATH_SIZE as usize);
        for owner in PlayerId::ALL {
            for step in 1..=HOME_PATH_SIZE {
                home_paths.push(BoardSpace {
                    position: home_position(owner, step),
                    kind: if step == HOME_PATH_SIZE {
                        SpaceKind::Home
                    } else {
                        SpaceKind::HomePath
                    },
                    owner: Some(owner),
                    warp_target: None,
                });
            }
        }

        Self {
            circuit,
            home_paths,
        }
    }

    /// Look up any cell by its encoded position.
    pub fn space(&self, position: i32) -> Option<&BoardSpace> {
        if is_main_circuit(position) {
            self.circuit.get(position as usize)
        } else {
            self.home_paths.iter().find(|s| s.position == position)
        }
    }

    pub fn circuit(&self) -> &[BoardSpace] {
        &self.circuit
    }

    pub fn home_paths(&self) -> &[BoardSpace] {
        &self.home_paths
    }

    pub fn spaces(&self) -> impl Iterator<Item = &BoardSpace> {
        self.circuit.iter().chain(self.home_paths.iter())
    }

    pub fn warp_target(&self, position: i32) -> Option<i32> {
        self.space(position)
            .filter(|s| s.kind == SpaceKind::Warp)
            .and_then(|s| s.warp_target)
    }

    pub fn is_go_again(&self, position: i32) -> bool {
        self.space(position)
            .is_some_and(|s| s.kind == SpaceKind::GoAgain)
    }

    pub fn start_entry(&self, owner: PlayerId) -> i32 {
        seat_config(owner).start_position
    }

    pub fn home_entry(&self, owner: PlayerId) -> i32 {
        seat_config(owner).home_entry_position
    }
}
