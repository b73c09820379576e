//! ludo-logging: NDJSON game events, match summaries, and the env-gated debug log.
//!
//! Event logs are append-only NDJSON for post-mortems of bot matches and online sessions.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Event schema version carried by every event line.
pub const EVENT_SCHEMA_VERSION: u32 = 1;

/// Match summary schema version.
pub const MATCH_SUMMARY_VERSION: u32 = 1;

pub const RULESET_ID: &str = "ludo_warp_abilities_v1";

pub fn now_ms() -> u64 {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    d.as_millis() as u64
}

pub fn hash_config_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

pub fn try_git_hash() -> Option<String> {
    use std::process::Command;

    let out = Command::new("git").args(["rev-parse", "HEAD"]).output().ok()?;
    if !out.status.success() {
        return None;
    }
    let s = String::from_utf8(out.stdout).ok()?;
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

#[derive(Debug, Error)]
pub enum NdjsonError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionInfoV1 {
    pub schema_version: u32,
    pub ruleset_id: &'static str,
    pub engine_version: &'static str,
}

impl VersionInfoV1 {
    pub fn current() -> Self {
        Self {
            schema_version: EVENT_SCHEMA_VERSION,
            ruleset_id: RULESET_ID,
            engine_version: VERSION,
        }
    }
}

/// One committed game mutation.
///
/// `event` is one of `game_start`, `roll`, `move`, `ability`, `shield`, `skip`,
/// `turn`, `winner`, `game_over`, `reset`.
#[derive(Debug, Clone, Serialize)]
pub struct GameEventV1 {
    pub event: &'static str,
    pub ts_ms: u64,
    pub v: VersionInfoV1,

    pub game_code: String,
    pub seq: u64,
    pub player: Option<u8>,
    pub detail: serde_json::Value,
}

impl GameEventV1 {
    pub fn new(
        event: &'static str,
        game_code: impl Into<String>,
        seq: u64,
        player: Option<u8>,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            event,
            ts_ms: now_ms(),
            v: VersionInfoV1::current(),
            game_code: game_code.into(),
            seq,
            player,
            detail,
        }
    }
}

/// End-of-match record written next to the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummaryV1 {
    pub match_summary_version: u32,
    pub game_code: String,
    pub created_ts_ms: u64,
    pub finished_ts_ms: u64,

    pub git_hash: Option<String>,
    pub config_hash: Option<String>,
    pub seed: Option<u64>,

    /// Finish order, then the unfinished players in id order.
    pub standings: Vec<u8>,
    pub winners: Vec<u8>,
    pub completed: bool,

    pub turns: u64,
    pub rolls: u64,
    pub captures: u64,
    pub shield_defenses: u64,
    pub abilities_used: u64,
    pub skips: u64,
}

pub fn read_summary(path: impl AsRef<Path>) -> Result<MatchSummaryV1, NdjsonError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice::<MatchSummaryV1>(&bytes)?)
}

pub fn write_summary_atomic(path: impl AsRef<Path>, m: &MatchSummaryV1) -> Result<(), NdjsonError> {
    let path = path.as_ref();
    let tmp = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(m)?;
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Append-only NDJSON writer.
///
/// Contract: each call writes exactly one JSON object followed by a newline.
pub struct NdjsonWriter {
    w: BufWriter<File>,
    lines_since_flush: u64,
    flush_every_lines: u64,
}

impl NdjsonWriter {
    /// Open a file for append. Creates it if it doesn't exist.
    pub fn open_append(path: impl AsRef<Path>) -> Result<Self, NdjsonError> {
        Self::open_append_with_flush(path, 0)
    }

    /// `flush_every_lines=0` disables periodic flushing.
    pub fn open_append_with_flush(
        path: impl AsRef<Path>,
        flush_every_lines: u64,
    ) -> Result<Self, NdjsonError> {
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            w: BufWriter::new(f),
            lines_since_flush: 0,
            flush_every_lines,
        })
    }

    pub fn write_event<T: Serialize>(&mut self, event: &T) -> Result<(), NdjsonError> {
        let mut buf = serde_json::to_vec(event)?;
        buf.push(b'\n');
        self.w.write_all(&buf)?;
        self.lines_since_flush += 1;
        if self.flush_every_lines > 0 && self.lines_since_flush >= self.flush_every_lines {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), NdjsonError> {
        self.w.flush()?;
        self.lines_since_flush = 0;
        Ok(())
    }
}

// region debug log
static DBG_FORCE: AtomicBool = AtomicBool::new(false);

/// Enable debug logging regardless of `LUDO_DEBUG_LOG` (from `logging.debug_log`).
pub fn force_debug_log(on: bool) {
    DBG_FORCE.store(on, Ordering::Relaxed);
}

pub fn debug_enabled() -> bool {
    static ON: OnceLock<bool> = OnceLock::new();
    DBG_FORCE.load(Ordering::Relaxed)
        || *ON.get_or_init(|| {
            matches!(
                std::env::var("LUDO_DEBUG_LOG").as_deref(),
                Ok("1" | "true" | "yes")
            )
        })
}

/// One JSON line on stderr; dropped unless debug logging is on.
pub fn debug_log(location: &str, message: &str, data: serde_json::Value) {
    if !debug_enabled() {
        return;
    }
    let payload = serde_json::json!({
        "timestamp": now_ms(),
        "location": location,
        "message": message,
        "data": data,
    });
    if let Ok(line) = serde_json::to_string(&payload) {
        let _ = writeln!(io::stderr().lock(), "{line}");
    }
}
// endregion
