//! ludo-core: board layout, pieces and players, move rules, turn controller, and configuration.

pub mod ability;
pub mod board;
pub mod chance;
pub mod config;
pub mod engine;
pub mod patch;
pub mod rules;
pub mod state;

pub use ability::Ability;
pub use board::{BoardLayout, BoardSpace, SpaceKind, PLAYER_COUNT, PIECES_PER_PLAYER};
pub use chance::{ChanceMode, RollResult, TurnContext};
pub use config::{Config, ConfigError};
pub use engine::{Engine, GameSetup, PlayerInput, Rejected, SeatSetup, Snapshot};
pub use patch::{apply_patch, SessionPatch};
pub use state::{
    DiceRoll, GamePhase, GameState, PendingAction, Piece, PieceId, PieceState, Player, PlayerId,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod engine_tests;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_nonempty() {
        assert!(!VERSION.is_empty());
    }
}
