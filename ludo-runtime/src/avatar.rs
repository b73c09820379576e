//! Avatar resolution for new games.
//!
//! Generation may be slow or fail; neither may hold up the game. Each missing avatar is
//! requested on its own thread and whatever has not arrived by the deadline is left empty.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ludo_core::board::seat_config;
use ludo_core::{GameSetup, PlayerId};
use ludo_logging::debug_log;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvatarError {
    #[error("avatar backend error: {0}")]
    Backend(String),
}

pub trait AvatarGenerator: Send + Sync {
    /// Image reference for a player of `color`, or `None` if the backend has nothing.
    fn generate(&self, color: &str) -> Result<Option<String>, AvatarError>;
}

/// Never produces an avatar; the UI shows its placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAvatars;

impl AvatarGenerator for NoAvatars {
    fn generate(&self, _color: &str) -> Result<Option<String>, AvatarError> {
        Ok(None)
    }
}

/// Local, deterministic avatars keyed by color.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdenticonAvatars;

impl AvatarGenerator for IdenticonAvatars {
    fn generate(&self, color: &str) -> Result<Option<String>, AvatarError> {
        let hex = color.trim_start_matches('#');
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AvatarError::Backend(format!("not a hex color: {color}")));
        }
        Ok(Some(format!("identicon:{}", hex.to_ascii_lowercase())))
    }
}

/// Fill every seat that has no avatar yet, waiting at most `timeout` overall.
///
/// Failures and timeouts are logged and leave the avatar empty. Returns how many seats
/// got one.
pub fn resolve_avatars(
    generator: Arc<dyn AvatarGenerator>,
    setup: &mut GameSetup,
    timeout: Duration,
) -> usize {
    let (tx, rx) = mpsc::channel::<(PlayerId, Result<Option<String>, AvatarError>)>();
    let mut waiting = 0usize;
    for id in PlayerId::ALL {
        let seat = setup.seat(id);
        if seat.avatar_url.is_some() {
            continue;
        }
        let color = seat
            .color
            .clone()
            .unwrap_or_else(|| seat_config(id).color.to_string());
        let generator = Arc::clone(&generator);
        let tx = tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("ludo-avatar-{id}"))
            .spawn(move || {
                let _ = tx.send((id, generator.generate(&color)));
            });
        match spawned {
            Ok(_) => waiting += 1,
            Err(e) => debug_log(
                "avatar",
                "spawn failed",
                json!({"seat": id.get(), "error": e.to_string()}),
            ),
        }
    }
    drop(tx);

    let deadline = Instant::now() + timeout;
    let mut resolved = 0usize;
    while waiting > 0 {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok((id, Ok(Some(url)))) => {
                setup.seat_mut(id).avatar_url = Some(url);
                resolved += 1;
                waiting -= 1;
            }
            Ok((_, Ok(None))) => waiting -= 1,
            Ok((id, Err(e))) => {
                debug_log(
                    "avatar",
                    "generation failed",
                    json!({"seat": id.get(), "error": e.to_string()}),
                );
                waiting -= 1;
            }
            Err(_) => {
                debug_log("avatar", "timed out", json!({"missing": waiting}));
                break;
            }
        }
    }
    resolved
}
