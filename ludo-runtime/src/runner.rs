//! Whole matches driven by computer players on a virtual clock.
//!
//! The clock jumps straight to the next armed deadline, so paced bots play a full game
//! instantly while still going through the same deadlines a live session would use.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ludo_core::config::{BotConfig, Config};
use ludo_core::{
    Engine, GameSetup, GameState, PendingAction, PieceState, PlayerId, Rejected, TurnContext,
};
use ludo_logging::{
    debug_log, now_ms, try_git_hash, write_summary_atomic, GameEventV1, MatchSummaryV1, NdjsonError,
    NdjsonWriter, MATCH_SUMMARY_VERSION,
};
use ludo_sync::{
    claim_seat, fetch_lobby_setup, follow_game, host_lobby, start_hosted_game, JoinError,
    MemoryStore, SessionStore, StoreError, SyncError, SyncedGame,
};
use serde_json::json;
use thiserror::Error;

use crate::avatar::{resolve_avatars, AvatarGenerator};
use crate::bot::BotIntent;
use crate::driver::{BotDriver, BotRole};

/// Upper bound on bot inputs per match; a healthy game needs a few thousand.
pub const DEFAULT_MAX_INPUTS: u64 = 200_000;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("log error: {0}")]
    Log(#[from] NdjsonError),
    #[error("setup rejected: {0}")]
    Rejected(#[from] Rejected),
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("lobby error: {0}")]
    Join(#[from] JoinError),
}

/// Where a match writes its event log and summary.
pub struct MatchLoggers {
    pub game_code: String,
    pub events: Option<NdjsonWriter>,
    pub summary_path: Option<PathBuf>,
    pub config_hash: Option<String>,
    pub seed: Option<u64>,
}

impl MatchLoggers {
    pub fn new(game_code: impl Into<String>) -> Self {
        Self {
            game_code: game_code.into(),
            events: None,
            summary_path: None,
            config_hash: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub turns: u64,
    pub rolls: u64,
    pub captures: u64,
    pub shield_defenses: u64,
    pub abilities_used: u64,
    pub skips: u64,
    pub failed_inputs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchReport {
    pub winners: Vec<PlayerId>,
    pub standings: Vec<PlayerId>,
    pub completed: bool,
    pub stats: MatchStats,
    /// Virtual time the paced match would have taken.
    pub virtual_ms: u64,
    pub final_state: GameState,
}

fn standing_ids(state: &GameState) -> Vec<u8> {
    ludo_core::engine::standings(state)
        .into_iter()
        .map(PlayerId::get)
        .collect()
}

/// Turns observed inputs into stats and event lines.
struct Recorder<'a> {
    loggers: Option<&'a mut MatchLoggers>,
    seq: u64,
    stats: MatchStats,
    created_ts_ms: u64,
}

impl<'a> Recorder<'a> {
    fn new(loggers: Option<&'a mut MatchLoggers>) -> Self {
        Self {
            loggers,
            seq: 0,
            stats: MatchStats::default(),
            created_ts_ms: now_ms(),
        }
    }

    fn emit(
        &mut self,
        event: &'static str,
        player: Option<PlayerId>,
        detail: serde_json::Value,
    ) -> Result<(), NdjsonError> {
        let Some(loggers) = self.loggers.as_deref_mut() else {
            return Ok(());
        };
        let Some(w) = loggers.events.as_mut() else {
            return Ok(());
        };
        let player = player.map(PlayerId::get);
        let e = GameEventV1::new(event, loggers.game_code.clone(), self.seq, player, detail);
        self.seq += 1;
        w.write_event(&e)
    }

    fn start(&mut self, state: &GameState) -> Result<(), NdjsonError> {
        let players: Vec<_> = state
            .players
            .iter()
            .map(|p| json!({"id": p.id.get(), "name": p.name, "computer": p.is_computer}))
            .collect();
        self.emit("game_start", Some(state.current_player), json!({ "players": players }))
    }

    fn record(
        &mut self,
        before: &GameState,
        after: &GameState,
        intent: BotIntent,
    ) -> Result<(), NdjsonError> {
        let actor = match intent {
            BotIntent::AnswerShield { defender, .. } => defender,
            _ => before.current_player,
        };
        let captured: Vec<u8> = before
            .pieces()
            .filter(|p| p.state != PieceState::Start)
            .filter(|p| after.piece(p.id).is_some_and(|q| q.state == PieceState::Start))
            .map(|p| p.id)
            .collect();
        self.stats.captures += captured.len() as u64;

        let detail = match intent {
            BotIntent::Roll => {
                self.stats.rolls += 1;
                json!({"dice": after.dice.map(|d| d.natural), "ability": after.ability})
            }
            BotIntent::UseAbility(ability) => {
                self.stats.abilities_used += 1;
                json!({"ability": ability, "captured": captured})
            }
            BotIntent::DiscardAbility => json!({}),
            BotIntent::Move { piece, delta } => json!({
                "piece": piece,
                "delta": delta,
                "from": before.piece(piece).map(|p| p.position),
                "to": after.piece(piece).map(|p| p.position),
                "captured": captured,
                "shielded": matches!(after.pending, Some(PendingAction::ShieldDefense { .. })),
            }),
            BotIntent::Skip => {
                self.stats.skips += 1;
                json!({})
            }
            BotIntent::AnswerShield { accept, .. } => {
                self.stats.shield_defenses += 1;
                json!({"accept": accept, "captured": captured})
            }
        };
        self.emit(intent.name(), Some(actor), detail)?;

        for id in after.winners.iter().filter(|id| !before.winners.contains(id)) {
            self.emit("winner", Some(*id), json!({"place": after.winners.len()}))?;
        }
        if after.is_over() && !before.is_over() {
            let standings = standing_ids(after);
            self.emit("game_over", None, json!({ "standings": standings }))?;
        } else if after.current_player != before.current_player {
            self.stats.turns += 1;
            self.emit("turn", Some(after.current_player), json!({}))?;
        }
        Ok(())
    }

    fn finish(mut self, state: &GameState, completed: bool) -> Result<MatchStats, NdjsonError> {
        let stats = self.stats.clone();
        let created_ts_ms = self.created_ts_ms;
        let Some(loggers) = self.loggers.as_deref_mut() else {
            return Ok(stats);
        };
        if let Some(w) = loggers.events.as_mut() {
            w.flush()?;
        }
        if let Some(path) = &loggers.summary_path {
            let summary = MatchSummaryV1 {
                match_summary_version: MATCH_SUMMARY_VERSION,
                game_code: loggers.game_code.clone(),
                created_ts_ms,
                finished_ts_ms: now_ms(),
                git_hash: try_git_hash(),
                config_hash: loggers.config_hash.clone(),
                seed: loggers.seed,
                standings: standing_ids(state),
                winners: state.winners.iter().map(|id| id.get()).collect(),
                completed,
                turns: stats.turns,
                rolls: stats.rolls,
                captures: stats.captures,
                shield_defenses: stats.shield_defenses,
                abilities_used: stats.abilities_used,
                skips: stats.skips,
            };
            write_summary_atomic(path, &summary)?;
        }
        Ok(stats)
    }
}

/// Play one local match with every seat run by the computer.
pub fn run_match(
    ctx: TurnContext,
    setup: &GameSetup,
    delays: &BotConfig,
    max_inputs: u64,
    loggers: Option<&mut MatchLoggers>,
) -> Result<MatchReport, RunError> {
    let mut setup = setup.clone();
    for seat in &mut setup.seats {
        seat.is_computer = true;
    }

    let mut engine = Engine::new(ctx);
    engine.initialize(&setup)?;
    let mut game = SyncedGame::offline(engine);
    let mut recorder = Recorder::new(loggers);
    recorder.start(game.engine().state())?;

    let mut driver = BotDriver::computers(delays.clone());
    let mut clock = 0u64;
    let mut inputs = 0u64;
    while !game.engine().state().is_over() && inputs < max_inputs {
        driver.observe(game.engine().state(), game.engine().board(), game.is_host(), clock);
        let Some(due) = driver.next_due() else {
            debug_log("runner", "nobody to act", json!({"pending": game.engine().state().pending}));
            break;
        };
        clock = clock.max(due);
        let before = game.engine().state().clone();
        match driver.tick(&mut game, clock) {
            Some(Ok(intent)) => recorder.record(&before, game.engine().state(), intent)?,
            Some(Err(e)) => {
                recorder.stats.failed_inputs += 1;
                debug_log("runner", "bot input failed", json!({"error": e.to_string()}));
            }
            None => {}
        }
        inputs += 1;
    }

    let state = game.engine().state().clone();
    let completed = state.is_over();
    let stats = recorder.finish(&state, completed)?;
    Ok(MatchReport {
        winners: state.winners.clone(),
        standings: game.engine().standings(),
        completed,
        stats,
        virtual_ms: clock,
        final_state: state,
    })
}

/// `run_match` with chance and pacing from `cfg`.
pub fn run_configured_match(
    cfg: &Config,
    loggers: Option<&mut MatchLoggers>,
) -> Result<MatchReport, RunError> {
    run_match(
        TurnContext::from_config(&cfg.chance),
        &GameSetup::all_computers(),
        &cfg.bot,
        DEFAULT_MAX_INPUTS,
        loggers,
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineReport {
    pub code: String,
    pub guest_seat: PlayerId,
    pub avatars: usize,
    pub report: MatchReport,
    /// Host and guest ended on identical state.
    pub replicas_agree: bool,
}

struct Participant {
    game: SyncedGame,
    drivers: Vec<BotDriver>,
}

impl Participant {
    fn observe(&mut self, clock: u64) {
        let runs_computers = self.game.is_host();
        let engine = self.game.engine();
        for d in &mut self.drivers {
            d.observe(engine.state(), engine.board(), runs_computers, clock);
        }
    }

    fn next_due(&self) -> Option<u64> {
        self.drivers.iter().filter_map(BotDriver::next_due).min()
    }

    fn fire(&mut self, clock: u64) -> Option<Result<BotIntent, SyncError>> {
        self.drivers
            .iter_mut()
            .find_map(|d| d.tick(&mut self.game, clock))
    }
}

/// Host plus one joined guest over an in-memory store, both on autopilot.
///
/// Seats 3 and 4 are computers run by the host; the guest in seat 2 acts for itself through
/// its own replica, so every turn crosses the store.
pub fn run_online_demo(
    cfg: &Config,
    seed: u64,
    avatars: Arc<dyn AvatarGenerator>,
    max_inputs: u64,
    loggers: Option<&mut MatchLoggers>,
) -> Result<OnlineReport, RunError> {
    let store = Arc::new(MemoryStore::with_seed(cfg.sync.code_len, seed));
    let lobby = host_lobby(store.as_ref(), "Host", None)?;
    let guest_seat = claim_seat(store.as_ref(), &lobby.code, "Guest", None)?;
    let mut setup = fetch_lobby_setup(store.as_ref(), &lobby.code)?;
    let resolved = resolve_avatars(
        avatars,
        &mut setup,
        Duration::from_millis(cfg.sync.avatar_timeout_ms),
    );

    let shared: Arc<dyn SessionStore> = store.clone();
    let host_ctx = TurnContext::new_deterministic(seed);
    let host_game = start_hosted_game(shared.clone(), &lobby, &setup, host_ctx)?;
    let guest_ctx = TurnContext::new_deterministic(seed ^ 0x5EED);
    let guest_game = follow_game(shared, &guest_seat, guest_ctx)?;

    let mut host = Participant {
        game: host_game,
        drivers: vec![
            BotDriver::computers(cfg.bot.clone()),
            BotDriver::new(BotRole::Seat(lobby.seat), cfg.bot.clone()),
        ],
    };
    let mut guest = Participant {
        game: guest_game,
        drivers: vec![BotDriver::new(BotRole::Seat(guest_seat.seat), cfg.bot.clone())],
    };

    let mut recorder = Recorder::new(loggers);
    host.game.pump();
    recorder.start(host.game.engine().state())?;

    let mut clock = 0u64;
    let mut inputs = 0u64;
    while inputs < max_inputs {
        host.game.pump();
        guest.game.pump();
        if host.game.engine().state().is_over() {
            break;
        }
        host.observe(clock);
        guest.observe(clock);

        let (acting, due) = match (host.next_due(), guest.next_due()) {
            (Some(h), Some(g)) if g < h => (&mut guest, g),
            (Some(h), _) => (&mut host, h),
            (None, Some(g)) => (&mut guest, g),
            (None, None) => {
                debug_log("online_demo", "nobody to act", json!({"code": lobby.code}));
                break;
            }
        };
        clock = clock.max(due);
        let before = acting.game.engine().state().clone();
        match acting.fire(clock) {
            Some(Ok(intent)) => recorder.record(&before, acting.game.engine().state(), intent)?,
            Some(Err(e)) => {
                recorder.stats.failed_inputs += 1;
                debug_log("online_demo", "input failed", json!({"error": e.to_string()}));
            }
            None => {}
        }
        inputs += 1;
    }

    host.game.pump();
    guest.game.pump();
    let state = host.game.engine().state().clone();
    let completed = state.is_over();
    let stats = recorder.finish(&state, completed)?;
    Ok(OnlineReport {
        code: lobby.code.clone(),
        guest_seat: guest_seat.seat,
        avatars: resolved,
        replicas_agree: host.game.engine().state() == guest.game.engine().state(),
        report: MatchReport {
            winners: state.winners.clone(),
            standings: host.game.engine().standings(),
            completed,
            stats,
            virtual_ms: clock,
            final_state: state,
        },
    })
}
