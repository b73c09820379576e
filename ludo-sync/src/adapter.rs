//! Authority and replica roles around one `Engine`.
//!
//! The participant allowed to act for the current actor mutates its local engine and
//! publishes the resulting patch. Everyone else only applies what the store delivers.

use std::sync::Arc;

use ludo_core::{
    Ability, BoardLayout, Engine, GamePhase, GameSetup, GameState, PendingAction, PieceId,
    PlayerId, PlayerInput, Rejected, SessionPatch, TurnContext,
};
use ludo_logging::debug_log;
use serde_json::json;
use thiserror::Error;

use crate::store::{SessionStore, StoreError, Subscription};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("seat {seat} may not act for {actor:?}")]
    NotAuthority {
        seat: PlayerId,
        actor: Option<PlayerId>,
    },
    #[error("rejected: {0}")]
    Rejected(#[from] Rejected),
    #[error("publish failed: {0}")]
    Store(#[from] StoreError),
}

/// The participant whose decision the game is waiting for.
pub fn actor(state: &GameState) -> Option<PlayerId> {
    if state.phase != GamePhase::Playing {
        return None;
    }
    match &state.pending {
        Some(PendingAction::ShieldDefense { defender_id, .. }) => Some(*defender_id),
        Some(
            PendingAction::Roll | PendingAction::Move { .. } | PendingAction::UseAbility { .. },
        ) => Some(state.current_player),
        _ => None,
    }
}

struct Link {
    store: Arc<dyn SessionStore>,
    code: String,
    feed: Subscription,
}

pub struct SyncedGame {
    engine: Engine,
    /// `None` plays hot-seat: every input is local and nothing is published.
    local_seat: Option<PlayerId>,
    link: Option<Link>,
}

impl SyncedGame {
    pub fn offline(engine: Engine) -> Self {
        Self {
            engine,
            local_seat: None,
            link: None,
        }
    }

    pub fn online(
        store: Arc<dyn SessionStore>,
        code: &str,
        seat: PlayerId,
        ctx: TurnContext,
    ) -> Result<Self, StoreError> {
        let feed = store.subscribe(code)?;
        Ok(Self {
            engine: Engine::new(ctx),
            local_seat: Some(seat),
            link: Some(Link {
                store,
                code: code.to_string(),
                feed,
            }),
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn local_seat(&self) -> Option<PlayerId> {
        self.local_seat
    }

    pub fn code(&self) -> Option<&str> {
        self.link.as_ref().map(|l| l.code.as_str())
    }

    /// Hosts (and hot-seat games) run the computer players.
    pub fn is_host(&self) -> bool {
        self.local_seat.map_or(true, |seat| seat == PlayerId::HOST)
    }

    /// Whether a local input would be accepted for the current actor.
    pub fn may_act(&self) -> bool {
        let Some(seat) = self.local_seat else {
            return true;
        };
        let state = self.engine.state();
        match actor(state) {
            Some(actor) if actor == seat => true,
            Some(actor) => {
                seat == PlayerId::HOST && state.player(actor).is_some_and(|p| p.is_computer)
            }
            None => false,
        }
    }

    /// Apply every snapshot delivered since the last call, oldest first.
    pub fn pump(&mut self) -> usize {
        let Some(link) = &self.link else {
            return 0;
        };
        let updates = link.feed.drain();
        for session in &updates {
            self.engine.apply_remote(&session.to_patch());
        }
        updates.len()
    }

    /// Host only: initialize from `setup` and publish the whole state.
    pub fn start(&mut self, setup: &GameSetup) -> Result<SessionPatch, SyncError> {
        self.require_host()?;
        let patch = self.engine.initialize(setup)?;
        self.publish(&SessionPatch::full(self.engine.state()))?;
        Ok(patch)
    }

    /// Host only: back to the landing screen for everyone.
    pub fn reset(&mut self) -> Result<SessionPatch, SyncError> {
        self.require_host()?;
        let patch = self.engine.reset();
        self.publish(&patch)?;
        Ok(patch)
    }

    /// Push the full local state again, e.g. after a failed publish.
    pub fn republish(&self) -> Result<(), SyncError> {
        self.publish(&SessionPatch::full(self.engine.state()))
    }

    pub fn roll(&mut self) -> Result<SessionPatch, SyncError> {
        self.act("roll", Engine::roll)
    }

    pub fn select_piece(&mut self, piece: PieceId) -> Result<SessionPatch, SyncError> {
        self.act("select_piece", |e| e.select_piece(piece))
    }

    pub fn select_move(&mut self, piece: PieceId, delta: i32) -> Result<SessionPatch, SyncError> {
        self.act("select_move", |e| e.select_move(piece, delta))
    }

    pub fn use_ability(&mut self, ability: Ability) -> Result<SessionPatch, SyncError> {
        self.act("use_ability", |e| e.use_ability(ability))
    }

    pub fn discard_ability(&mut self) -> Result<SessionPatch, SyncError> {
        self.act("discard_ability", Engine::discard_ability)
    }

    pub fn answer_shield(
        &mut self,
        defender: PlayerId,
        accept: bool,
    ) -> Result<SessionPatch, SyncError> {
        self.act("answer_shield", |e| e.answer_shield(defender, accept))
    }

    pub fn skip(&mut self) -> Result<SessionPatch, SyncError> {
        self.act("skip", Engine::skip)
    }

    fn require_host(&self) -> Result<(), SyncError> {
        match self.local_seat {
            Some(seat) if seat != PlayerId::HOST => Err(SyncError::NotAuthority {
                seat,
                actor: Some(PlayerId::HOST),
            }),
            _ => Ok(()),
        }
    }

    fn act<F>(&mut self, op: &'static str, f: F) -> Result<SessionPatch, SyncError>
    where
        F: FnOnce(&mut Engine) -> Result<SessionPatch, Rejected>,
    {
        if !self.may_act() {
            let actor = actor(self.engine.state());
            let seat = self.local_seat.unwrap_or(PlayerId::HOST);
            debug_log(
                "sync.act",
                "not authority",
                json!({"op": op, "seat": seat.get(), "actor": actor.map(PlayerId::get)}),
            );
            return Err(SyncError::NotAuthority { seat, actor });
        }
        let patch = f(&mut self.engine).map_err(|reason| {
            debug_log("sync.act", "rejected", json!({"op": op, "reason": reason.to_string()}));
            reason
        })?;
        if !patch.is_empty() {
            self.publish(&patch)?;
        }
        Ok(patch)
    }

    fn publish(&self, patch: &SessionPatch) -> Result<(), SyncError> {
        let Some(link) = &self.link else {
            return Ok(());
        };
        link.store.update(&link.code, patch).map_err(|e| {
            debug_log(
                "sync.publish",
                "publish failed",
                json!({"code": link.code, "error": e.to_string()}),
            );
            SyncError::Store(e)
        })
    }
}

impl PlayerInput for SyncedGame {
    type Error = SyncError;

    fn state(&self) -> &GameState {
        self.engine.state()
    }

    fn board(&self) -> &BoardLayout {
        self.engine.board()
    }

    fn roll(&mut self) -> Result<(), SyncError> {
        SyncedGame::roll(self).map(drop)
    }

    fn select_piece(&mut self, piece: PieceId) -> Result<(), SyncError> {
        SyncedGame::select_piece(self, piece).map(drop)
    }

    fn select_move(&mut self, piece: PieceId, delta: i32) -> Result<(), SyncError> {
        SyncedGame::select_move(self, piece, delta).map(drop)
    }

    fn use_ability(&mut self, ability: Ability) -> Result<(), SyncError> {
        SyncedGame::use_ability(self, ability).map(drop)
    }

    fn discard_ability(&mut self) -> Result<(), SyncError> {
        SyncedGame::discard_ability(self).map(drop)
    }

    fn answer_shield(&mut self, defender: PlayerId, accept: bool) -> Result<(), SyncError> {
        SyncedGame::answer_shield(self, defender, accept).map(drop)
    }

    fn skip(&mut self) -> Result<(), SyncError> {
        SyncedGame::skip(self).map(drop)
    }
}
