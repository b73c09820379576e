//! Paces computer players with one cancellable deadline.
//!
//! The driver never sleeps. Callers feed it the game after every change (`observe`) and
//! the current time (`tick`); an input fires once its deadline has passed and the state
//! it was armed for is still the one being looked at. Any state change re-arms.

use ludo_core::config::BotConfig;
use ludo_core::{BoardLayout, GameState, PlayerId, PlayerInput};
use ludo_sync::actor;

use crate::bot::{apply_intent, decide, BotIntent};

/// Whose turns the driver plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotRole {
    /// Every computer seat; only acts where the local participant runs computers.
    Computers,
    /// Autopilot for one seat, computer or not.
    Seat(PlayerId),
}

#[derive(Debug)]
pub struct BotDriver {
    role: BotRole,
    delays: BotConfig,
    due_ms: Option<u64>,
    last_seen: Option<GameState>,
}

impl BotDriver {
    pub fn new(role: BotRole, delays: BotConfig) -> Self {
        Self {
            role,
            delays,
            due_ms: None,
            last_seen: None,
        }
    }

    pub fn computers(delays: BotConfig) -> Self {
        Self::new(BotRole::Computers, delays)
    }

    pub fn role(&self) -> BotRole {
        self.role
    }

    pub fn next_due(&self) -> Option<u64> {
        self.due_ms
    }

    pub fn is_armed(&self) -> bool {
        self.due_ms.is_some()
    }

    fn should_act(&self, state: &GameState, runs_computers: bool) -> bool {
        let Some(actor) = actor(state) else {
            return false;
        };
        match self.role {
            BotRole::Computers => {
                runs_computers && state.player(actor).is_some_and(|p| p.is_computer)
            }
            BotRole::Seat(seat) => actor == seat,
        }
    }

    /// Arm, re-arm or disarm for `state`. An unchanged state keeps the current deadline.
    pub fn observe(
        &mut self,
        state: &GameState,
        board: &BoardLayout,
        runs_computers: bool,
        now_ms: u64,
    ) {
        if self.last_seen.as_ref() == Some(state) {
            return;
        }
        self.last_seen = Some(state.clone());
        self.due_ms = None;
        if !self.should_act(state, runs_computers) {
            return;
        }
        if let Some(intent) = decide(state, board) {
            self.due_ms = Some(now_ms.saturating_add(intent.delay_ms(&self.delays)));
        }
    }

    /// Fire the armed input if it is due.
    pub fn tick<P: PlayerInput + ?Sized>(
        &mut self,
        input: &mut P,
        now_ms: u64,
    ) -> Option<Result<BotIntent, P::Error>> {
        let due = self.due_ms?;
        if now_ms < due {
            return None;
        }
        self.due_ms = None;
        // Forget the state so the next observe arms again even if nothing changed.
        self.last_seen = None;
        let intent = decide(input.state(), input.board())?;
        Some(apply_intent(input, intent).map(|()| intent))
    }

    /// `observe` then `tick` on the same input.
    pub fn step<P: PlayerInput + ?Sized>(
        &mut self,
        input: &mut P,
        runs_computers: bool,
        now_ms: u64,
    ) -> Option<Result<BotIntent, P::Error>> {
        self.observe(input.state(), input.board(), runs_computers, now_ms);
        self.tick(input, now_ms)
    }

    /// Drop any pending deadline, e.g. on game reset.
    pub fn cancel(&mut self) {
        self.due_ms = None;
        self.last_seen = None;
    }
}
