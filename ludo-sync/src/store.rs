//! Remote session store contract and an in-process implementation.
//!
//! A session is one shared document keyed by a short code. Updates are typed merge-patches;
//! every accepted update is stamped and fanned out, in order, to all subscribers of that code.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ludo_core::{
    apply_patch, Ability, DiceRoll, GamePhase, GameState, PendingAction, Player, PlayerId,
    SessionPatch,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("session {0} not found")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store lock poisoned")]
    Poisoned,
}

/// The replicated document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub code: String,
    pub players: Vec<Player>,
    pub phase: GamePhase,
    pub current_player: PlayerId,
    pub dice: Option<DiceRoll>,
    pub ability: Option<Ability>,
    pub pending_action: Option<PendingAction>,
    pub winners: Vec<PlayerId>,
    /// Store-stamped, strictly increasing per store.
    pub last_update: u64,
}

impl Session {
    /// Fresh lobby holding only the host.
    pub fn new(code: impl Into<String>, host: Player, stamp: u64) -> Self {
        Self {
            code: code.into(),
            players: vec![host],
            phase: GamePhase::Setup,
            current_player: PlayerId::HOST,
            dice: None,
            ability: None,
            pending_action: None,
            winners: Vec::new(),
            last_update: stamp,
        }
    }

    pub fn game_state(&self) -> GameState {
        GameState {
            phase: self.phase,
            players: self.players.clone(),
            current_player: self.current_player,
            dice: self.dice,
            ability: self.ability,
            pending: self.pending_action.clone(),
            winners: self.winners.clone(),
        }
    }

    /// Every game field, for full-field overwrite on a replica.
    pub fn to_patch(&self) -> SessionPatch {
        SessionPatch::full(&self.game_state())
    }

    pub fn apply(&mut self, patch: &SessionPatch) {
        let mut state = self.game_state();
        apply_patch(&mut state, patch);
        self.phase = state.phase;
        self.players = state.players;
        self.current_player = state.current_player;
        self.dice = state.dice;
        self.ability = state.ability;
        self.pending_action = state.pending;
        self.winners = state.winners;
    }
}

/// Live feed of one session. Dropping it unsubscribes.
pub struct Subscription {
    rx: mpsc::Receiver<Session>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(rx: mpsc::Receiver<Session>, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            rx,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn try_next(&self) -> Option<Session> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Session> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Everything delivered so far, oldest first.
    pub fn drain(&self) -> Vec<Session> {
        self.rx.try_iter().collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

pub trait SessionStore: Send + Sync {
    /// Create a lobby for `host` and return its code.
    fn create(&self, host: Player) -> Result<String, StoreError>;

    fn get(&self, code: &str) -> Result<Option<Session>, StoreError>;

    /// Add `player`, replacing any entry with the same id. `false` if the code is unknown.
    fn join(&self, code: &str, player: Player) -> Result<bool, StoreError>;

    /// Current value first, then one delivery per accepted change.
    fn subscribe(&self, code: &str) -> Result<Subscription, StoreError>;

    /// Merge `patch` into the session and stamp it.
    fn update(&self, code: &str, patch: &SessionPatch) -> Result<(), StoreError>;
}

#[derive(Debug)]
struct Subscriber {
    code: String,
    tx: mpsc::Sender<Session>,
}

#[derive(Debug)]
struct Inner {
    sessions: HashMap<String, Session>,
    subscribers: HashMap<u64, Subscriber>,
    next_subscriber: u64,
    rng: ChaCha8Rng,
    code_len: usize,
    last_stamp: u64,
    offline: bool,
}

impl Inner {
    fn stamp(&mut self) -> u64 {
        self.last_stamp = ludo_logging::now_ms().max(self.last_stamp + 1);
        self.last_stamp
    }

    fn fresh_code(&mut self) -> String {
        loop {
            let code: String = (0..self.code_len)
                .map(|_| CODE_ALPHABET[self.rng.gen_range(0..CODE_ALPHABET.len())] as char)
                .collect();
            if !self.sessions.contains_key(&code) {
                return code;
            }
        }
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline {
            Err(StoreError::Unavailable("store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    /// Fan out the current value of `code`; subscribers that went away are dropped.
    fn notify(&mut self, code: &str) {
        let Some(session) = self.sessions.get(code) else {
            return;
        };
        self.subscribers
            .retain(|_, sub| sub.code != code || sub.tx.send(session.clone()).is_ok());
    }
}

/// Process-local store shared by cloning. Sends happen under the lock so every subscriber
/// sees changes in commit order; receivers consume them on their own schedule.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new(code_len: usize) -> Self {
        Self::with_rng(code_len, ChaCha8Rng::seed_from_u64(rand::random::<u64>()))
    }

    /// Reproducible codes.
    pub fn with_seed(code_len: usize, seed: u64) -> Self {
        Self::with_rng(code_len, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(code_len: usize, rng: ChaCha8Rng) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                sessions: HashMap::new(),
                subscribers: HashMap::new(),
                next_subscriber: 0,
                rng,
                code_len: code_len.max(1),
                last_stamp: 0,
                offline: false,
            })),
        }
    }

    /// Simulate losing the connection: every operation fails until switched back.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.offline = offline;
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.subscribers.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl SessionStore for MemoryStore {
    fn create(&self, host: Player) -> Result<String, StoreError> {
        let mut inner = self.lock()?;
        inner.check_online()?;
        let code = inner.fresh_code();
        let stamp = inner.stamp();
        inner
            .sessions
            .insert(code.clone(), Session::new(code.clone(), host, stamp));
        Ok(code)
    }

    fn get(&self, code: &str) -> Result<Option<Session>, StoreError> {
        let inner = self.lock()?;
        inner.check_online()?;
        Ok(inner.sessions.get(code).cloned())
    }

    fn join(&self, code: &str, player: Player) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        inner.check_online()?;
        let stamp = inner.stamp();
        let Some(session) = inner.sessions.get_mut(code) else {
            return Ok(false);
        };
        match session.players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) => *existing = player,
            None => session.players.push(player),
        }
        session.last_update = stamp;
        inner.notify(code);
        Ok(true)
    }

    fn subscribe(&self, code: &str) -> Result<Subscription, StoreError> {
        let mut inner = self.lock()?;
        inner.check_online()?;
        let current = inner
            .sessions
            .get(code)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;

        let (tx, rx) = mpsc::channel();
        // Receiver is alive: this send cannot fail.
        let _ = tx.send(current);
        let id = inner.next_subscriber;
        inner.next_subscriber += 1;
        inner.subscribers.insert(
            id,
            Subscriber {
                code: code.to_string(),
                tx,
            },
        );

        let store = Arc::downgrade(&self.inner);
        Ok(Subscription::new(rx, move || {
            if let Some(store) = store.upgrade() {
                if let Ok(mut inner) = store.lock() {
                    inner.subscribers.remove(&id);
                }
            }
        }))
    }

    fn update(&self, code: &str, patch: &SessionPatch) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.check_online()?;
        let stamp = inner.stamp();
        let session = inner
            .sessions
            .get_mut(code)
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;
        session.apply(patch);
        session.last_update = stamp;
        inner.notify(code);
        Ok(())
    }
}
