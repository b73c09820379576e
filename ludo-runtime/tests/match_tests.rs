use std::sync::Arc;

use ludo_core::board::START_POSITION;
use ludo_core::config::{BotConfig, Config};
use ludo_core::{GamePhase, GameSetup, GameState, PieceState, TurnContext};
use ludo_logging::{read_summary, NdjsonWriter};
use ludo_runtime::{
    run_match, run_online_demo, IdenticonAvatars, MatchLoggers, NoAvatars, DEFAULT_MAX_INPUTS,
};

fn assert_sane(s: &GameState) {
    for a in s.pieces() {
        if a.state == PieceState::Start {
            assert_eq!(a.position, START_POSITION);
            continue;
        }
        for b in s.pieces() {
            if a.id != b.id && a.owner == b.owner {
                assert_ne!(a.position, b.position, "own pieces share a cell");
            }
        }
    }
    for w in &s.winners {
        assert!(s.player(*w).unwrap().all_home(), "winner {w} still has pieces out");
    }
}

#[test]
fn bot_match_runs_to_game_over() {
    for seed in 0..8u64 {
        let r = run_match(
            TurnContext::new_deterministic(seed),
            &GameSetup::all_computers(),
            &BotConfig::instant(),
            DEFAULT_MAX_INPUTS,
            None,
        )
        .unwrap();
        assert!(r.completed, "seed {seed} did not finish");
        assert_eq!(r.final_state.phase, GamePhase::GameOver);
        assert_eq!(r.winners.len(), 3);
        assert_eq!(r.standings.len(), 4);
        assert_eq!(&r.standings[..3], &r.winners[..]);
        assert!(r.stats.rolls > 0);
        assert_eq!(r.stats.failed_inputs, 0);
        assert_sane(&r.final_state);
    }
}

#[test]
fn same_seed_replays_the_same_match() {
    let play = || {
        run_match(
            TurnContext::new_deterministic(42),
            &GameSetup::all_computers(),
            &BotConfig::instant(),
            DEFAULT_MAX_INPUTS,
            None,
        )
        .unwrap()
    };
    assert_eq!(play(), play());
}

#[test]
fn paced_bots_accumulate_virtual_time() {
    let delays = BotConfig::default();
    let r = run_match(
        TurnContext::new_deterministic(3),
        &GameSetup::single_player(),
        &delays,
        DEFAULT_MAX_INPUTS,
        None,
    )
    .unwrap();
    assert!(r.completed);
    assert!(r.virtual_ms >= r.stats.rolls * delays.roll_delay_ms);
}

#[test]
fn input_cap_stops_an_unfinished_match() {
    let r = run_match(
        TurnContext::new_deterministic(5),
        &GameSetup::all_computers(),
        &BotConfig::instant(),
        10,
        None,
    )
    .unwrap();
    assert!(!r.completed);
    assert_eq!(r.final_state.phase, GamePhase::Playing);
}

#[test]
fn match_writes_event_log_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let events = dir.path().join("events.ndjson");
    let summary = dir.path().join("summary.json");

    let mut loggers = MatchLoggers::new("TEST01");
    loggers.events = Some(NdjsonWriter::open_append(&events).unwrap());
    loggers.summary_path = Some(summary.clone());
    loggers.seed = Some(9);

    let r = run_match(
        TurnContext::new_deterministic(9),
        &GameSetup::all_computers(),
        &BotConfig::instant(),
        DEFAULT_MAX_INPUTS,
        Some(&mut loggers),
    )
    .unwrap();
    drop(loggers);

    let text = std::fs::read_to_string(&events).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.first().unwrap()["event"], "game_start");
    assert_eq!(lines.last().unwrap()["event"], "game_over");
    for (i, l) in lines.iter().enumerate() {
        assert_eq!(l["seq"], i as u64);
        assert_eq!(l["game_code"], "TEST01");
    }
    let rolls = lines.iter().filter(|l| l["event"] == "roll").count() as u64;
    assert_eq!(rolls, r.stats.rolls);
    assert_eq!(lines.iter().filter(|l| l["event"] == "winner").count(), 3);

    let s = read_summary(&summary).unwrap();
    assert!(s.completed);
    assert_eq!(s.seed, Some(9));
    assert_eq!(s.game_code, "TEST01");
    assert_eq!(s.rolls, r.stats.rolls);
    assert_eq!(s.captures, r.stats.captures);
    let winners: Vec<u8> = r.winners.iter().map(|w| w.get()).collect();
    assert_eq!(s.winners, winners);
}

#[test]
fn online_demo_keeps_both_replicas_in_step() {
    let mut cfg = Config::default();
    cfg.bot = BotConfig::instant();
    let out =
        run_online_demo(&cfg, 11, Arc::new(IdenticonAvatars), DEFAULT_MAX_INPUTS, None).unwrap();
    assert_eq!(out.code.len(), cfg.sync.code_len);
    assert_eq!(out.guest_seat.get(), 2);
    assert_eq!(out.avatars, 4);
    assert!(out.report.completed);
    assert!(out.replicas_agree);
    assert_eq!(out.report.stats.failed_inputs, 0);
    assert_sane(&out.report.final_state);
    assert!(out
        .report
        .final_state
        .players
        .iter()
        .all(|p| p.avatar_url.is_some()));
}

#[test]
fn online_demo_without_avatars_still_plays() {
    let cfg = Config::default();
    let out = run_online_demo(&cfg, 4, Arc::new(NoAvatars), DEFAULT_MAX_INPUTS, None).unwrap();
    assert_eq!(out.avatars, 0);
    assert!(out.report.completed);
    assert!(out.replicas_agree);
    assert!(out.report.virtual_ms > 0);
}
