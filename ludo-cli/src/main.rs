//! ludo: command-line front end for the warp ludo engine.
//!
//! Subcommands:
//! - simulate      computer-only matches, optionally logged
//! - online-demo   host and guest over an in-memory session store
//! - board         print the board layout

use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use ludo_core::config::{BotConfig, ChanceKind};
use ludo_core::{BoardLayout, Config, GameSetup, SpaceKind, TurnContext};
use ludo_logging::{force_debug_log, hash_config_bytes, NdjsonWriter};
use ludo_runtime::{
    run_match, run_online_demo, IdenticonAvatars, MatchLoggers, MatchReport, DEFAULT_MAX_INPUTS,
};

fn print_help() {
    eprintln!(
        r#"ludo - warp ludo rules engine

USAGE:
    ludo <COMMAND> [OPTIONS]

COMMANDS:
    simulate        Play computer-only matches
    online-demo     Host plus one guest over an in-memory store
    board           Print the board layout

OPTIONS:
    -h, --help      Print this help message
    -V, --version   Print version

Run `ludo <COMMAND> --help` for command options.
"#
    );
}

fn print_version() {
    println!("ludo {}", env!("CARGO_PKG_VERSION"));
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T {
    if i + 1 >= args.len() {
        eprintln!("Missing value for {flag}");
        process::exit(1);
    }
    args[i + 1].parse().unwrap_or_else(|_| {
        eprintln!("Invalid {flag} value: {}", args[i + 1]);
        process::exit(1);
    })
}

/// Config from `--config`, or defaults. Returns the config and the hash of its bytes.
fn load_config(path: Option<&str>) -> (Config, Option<String>) {
    let Some(path) = path else {
        return (Config::default(), None);
    };
    let bytes = std::fs::read(path).unwrap_or_else(|e| {
        eprintln!("Failed to read config file: {e}");
        process::exit(1);
    });
    let text = String::from_utf8_lossy(&bytes);
    let cfg = Config::from_yaml(&text).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}");
        process::exit(1);
    });
    (cfg, Some(hash_config_bytes(&bytes)))
}

fn open_events(path: &str, flush_every: u64) -> NdjsonWriter {
    NdjsonWriter::open_append_with_flush(path, flush_every).unwrap_or_else(|e| {
        eprintln!("Failed to open event log {path}: {e}");
        process::exit(1);
    })
}

fn print_report(label: &str, r: &MatchReport) {
    let standings: Vec<String> = r.standings.iter().map(|p| p.to_string()).collect();
    println!(
        "{label}: {} standings=[{}] turns={} rolls={} captures={} shields={} abilities={} skips={}",
        if r.completed { "finished" } else { "unfinished" },
        standings.join(","),
        r.stats.turns,
        r.stats.rolls,
        r.stats.captures,
        r.stats.shield_defenses,
        r.stats.abilities_used,
        r.stats.skips,
    );
}

fn cmd_simulate(args: &[String]) {
    let mut games: u64 = 1;
    let mut seed: Option<u64> = None;
    let mut config_path: Option<String> = None;
    let mut events: Option<String> = None;
    let mut summary: Option<String> = None;
    let mut paced = false;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"ludo simulate

USAGE:
    ludo simulate [--games N] [--seed S] [--config cfg.yaml] [--events out.ndjson] [--summary out.json] [--paced]

OPTIONS:
    --games N         Number of matches (default: 1)
    --seed S          Base seed; match k uses S + k (default: config chance.seed, else 0)
    --config PATH     YAML config
    --events PATH     Append NDJSON game events (default: config logging.events_path)
    --summary PATH    Write a summary of the last match
    --paced           Use the config bot delays instead of instant bots
"#
                );
                return;
            }
            "--games" => {
                games = parse_value(args, i, "--games");
                i += 2;
            }
            "--seed" => {
                seed = Some(parse_value(args, i, "--seed"));
                i += 2;
            }
            "--config" => {
                config_path = Some(parse_value(args, i, "--config"));
                i += 2;
            }
            "--events" => {
                events = Some(parse_value(args, i, "--events"));
                i += 2;
            }
            "--summary" => {
                summary = Some(parse_value(args, i, "--summary"));
                i += 2;
            }
            "--paced" => {
                paced = true;
                i += 1;
            }
            other => {
                eprintln!("Unknown option for `ludo simulate`: {other}");
                eprintln!("Run `ludo simulate --help` for usage.");
                process::exit(1);
            }
        }
    }

    let (cfg, config_hash) = load_config(config_path.as_deref());
    if cfg.logging.debug_log {
        force_debug_log(true);
    }
    let base_seed = seed.or(cfg.chance.seed).unwrap_or(0);
    let delays = if paced { cfg.bot.clone() } else { BotConfig::instant() };
    let mut writer = events
        .or_else(|| cfg.logging.events_path.clone())
        .map(|p| open_events(&p, cfg.logging.flush_every_lines));

    let mut finished = 0u64;
    let mut wins = [0u64; 4];
    for k in 0..games {
        let match_seed = base_seed.wrapping_add(k);
        let ctx = match cfg.chance.mode {
            ChanceKind::Deterministic => TurnContext::new_deterministic(match_seed),
            ChanceKind::Rng => TurnContext::new_rng(match_seed),
        };

        let mut loggers = MatchLoggers::new(format!("SIM{k:05}"));
        loggers.events = writer.take();
        loggers.config_hash = config_hash.clone();
        loggers.seed = Some(match_seed);
        if k + 1 == games {
            loggers.summary_path = summary.as_ref().map(PathBuf::from);
        }

        let report = run_match(
            ctx,
            &GameSetup::all_computers(),
            &delays,
            DEFAULT_MAX_INPUTS,
            Some(&mut loggers),
        )
        .unwrap_or_else(|e| {
            eprintln!("Match {k} failed: {e}");
            process::exit(1);
        });
        writer = loggers.events.take();

        if report.completed {
            finished += 1;
            if let Some(first) = report.winners.first() {
                wins[first.index()] += 1;
            }
        }
        if games <= 10 {
            print_report(&format!("match {k} seed={match_seed}"), &report);
        }
    }

    println!();
    println!("Matches: {games} ({finished} finished)");
    for (seat, n) in wins.iter().enumerate() {
        let pct = if finished > 0 { 100.0 * *n as f64 / finished as f64 } else { 0.0 };
        println!("  seat {} first place: {n} ({pct:.1}%)", seat + 1);
    }
}

fn cmd_online_demo(args: &[String]) {
    let mut seed: u64 = 0;
    let mut config_path: Option<String> = None;
    let mut events: Option<String> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"ludo online-demo

USAGE:
    ludo online-demo [--seed S] [--config cfg.yaml] [--events out.ndjson]

Hosts a lobby, joins one guest, fills the rest with computers and plays the
match with every participant on autopilot, checking both replicas agree.
"#
                );
                return;
            }
            "--seed" => {
                seed = parse_value(args, i, "--seed");
                i += 2;
            }
            "--config" => {
                config_path = Some(parse_value(args, i, "--config"));
                i += 2;
            }
            "--events" => {
                events = Some(parse_value(args, i, "--events"));
                i += 2;
            }
            other => {
                eprintln!("Unknown option for `ludo online-demo`: {other}");
                process::exit(1);
            }
        }
    }

    let (mut cfg, config_hash) = load_config(config_path.as_deref());
    if cfg.logging.debug_log {
        force_debug_log(true);
    }
    cfg.bot = BotConfig::instant();

    let mut loggers = MatchLoggers::new("DEMO");
    loggers.events = events
        .or_else(|| cfg.logging.events_path.clone())
        .map(|p| open_events(&p, cfg.logging.flush_every_lines));
    loggers.config_hash = config_hash;
    loggers.seed = Some(seed);

    let out = run_online_demo(
        &cfg,
        seed,
        Arc::new(IdenticonAvatars),
        DEFAULT_MAX_INPUTS,
        Some(&mut loggers),
    )
    .unwrap_or_else(|e| {
        eprintln!("Online demo failed: {e}");
        process::exit(1);
    });
    println!("Session {} (guest in seat {}, {} avatars)", out.code, out.guest_seat, out.avatars);
    print_report("match", &out.report);
    if !out.replicas_agree {
        eprintln!("Host and guest replicas diverged");
        process::exit(2);
    }
    println!("Replicas agree.");
}

fn cmd_board(args: &[String]) {
    let json = match args.first().map(String::as_str) {
        None => false,
        Some("--json") => true,
        Some("--help" | "-h") => {
            println!("USAGE:\n    ludo board [--json]");
            return;
        }
        Some(other) => {
            eprintln!("Unknown option for `ludo board`: {other}");
            process::exit(1);
        }
    };

    let board = BoardLayout::standard();
    if json {
        let spaces: Vec<_> = board.spaces().collect();
        match serde_json::to_string_pretty(&spaces) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Failed to serialize board: {e}");
                process::exit(1);
            }
        }
        return;
    }
    for s in board.spaces() {
        let mut line = format!("{:>4}  {:?}", s.position, s.kind);
        if let Some(owner) = s.owner {
            line.push_str(&format!("  seat={owner}"));
        }
        if let Some(t) = s.warp_target {
            line.push_str(&format!("  -> {t}"));
        }
        if s.kind != SpaceKind::Normal {
            println!("{line}");
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        process::exit(0);
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => {
            print_help();
        }
        "-V" | "--version" => {
            print_version();
        }
        "simulate" => {
            cmd_simulate(&args[2..]);
        }
        "online-demo" => {
            cmd_online_demo(&args[2..]);
        }
        "board" => {
            cmd_board(&args[2..]);
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_help();
            process::exit(1);
        }
    }
}
