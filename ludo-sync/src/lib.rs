//! ludo-sync: session store contract, lobby flow, and authority/replica replication.

pub mod adapter;
pub mod lobby;
pub mod store;

pub use adapter::{actor, SyncError, SyncedGame};
pub use lobby::{
    claim_seat, fetch_lobby_setup, follow_game, free_seat, host_lobby, lobby_setup,
    normalize_code, start_hosted_game, JoinError, LobbySeat,
};
pub use store::{MemoryStore, Session, SessionStore, StoreError, Subscription};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
