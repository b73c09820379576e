//! Computer players, paced bot drivers and whole-match runners.

pub mod avatar;
pub mod bot;
pub mod driver;
pub mod runner;

pub use avatar::{resolve_avatars, AvatarError, AvatarGenerator, IdenticonAvatars, NoAvatars};
pub use bot::{apply_intent, decide, BotIntent};
pub use driver::{BotDriver, BotRole};
pub use runner::{
    run_configured_match, run_match, run_online_demo, MatchLoggers, MatchReport, MatchStats,
    OnlineReport, RunError, DEFAULT_MAX_INPUTS,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
