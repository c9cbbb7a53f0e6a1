//! Echo Runner - headless runner
//!
//! Plays one run with a simple autopilot, then records it.
//!
//! Usage: `echo-runner [seed] [max_seconds]`
//!
//! `ECHO_RUNNER_DATA` picks the directory for settings and scores, and
//! `ECHO_RUNNER_QUALITY` (low, medium, high) overrides and saves the preset.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use echo_runner::consts::SIM_HZ;
use echo_runner::sim::{Action, GamePhase, Intent, UpgradeKind, Viewport, World};
use echo_runner::{HighScores, QualityPreset, Session, Settings};

const SETTINGS_FILE: &str = "echo_runner_settings.json";
const SCORES_FILE: &str = "echo_runner_scores.json";
const DEFAULT_MAX_SECONDS: u64 = 300;

fn main() {
    env_logger::init();
    log::info!("Echo Runner (headless) starting...");

    let mut args = std::env::args().skip(1);
    let seed = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or_else(clock_seed);
    let max_seconds = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_MAX_SECONDS);

    let data_dir = data_dir();
    let settings_path = data_dir.join(SETTINGS_FILE);
    let mut settings = Settings::load(&settings_path);
    if let Some(quality) = std::env::var("ECHO_RUNNER_QUALITY")
        .ok()
        .and_then(|q| QualityPreset::parse(&q))
    {
        settings.quality = quality;
        settings.save(&settings_path);
    }
    let mut session = Session::new(seed, &settings, Viewport::default());
    session.input_mut().set(Intent::Right, true);
    log::info!("Game initialized with seed: {}", seed);

    let max_ticks = max_seconds * SIM_HZ as u64;
    let mut ticks = 0;
    while ticks < max_ticks && session.world().phase != GamePhase::Dead {
        for action in autopilot(session.world()) {
            session.push_action(action);
        }
        session.step();
        ticks += 1;

        for event in session.drain_events() {
            log::debug!("tick {}: {:?}", session.world().time, event);
        }
    }

    let stats = match session.take_finished_run() {
        Some(stats) => stats,
        None => {
            log::info!("Time limit reached after {} ticks", ticks);
            let mut stats = session.world().stats.clone();
            stats.score = session.world().score;
            stats
        }
    };

    // Record the score while the summary is printed; joined before exit so
    // the write is never cut short
    let scores_path = data_dir.join(SCORES_FILE);
    let record = stats.clone();
    let saver = std::thread::spawn(move || {
        let mut scores = HighScores::load(&scores_path);
        let name = std::env::var("USER").unwrap_or_default();
        if let Some(best) = scores.personal_best(&name) {
            log::info!("Previous best for {}: {}", best.name, best.score);
        }
        let Some(rank) = scores.potential_rank(record.score) else {
            log::info!("Score {} did not make the table", record.score);
            return;
        };
        scores.add_run(&name, &record, unix_time());
        log::info!("New high score: rank {}", rank);
        scores.save(&scores_path);
    });

    match serde_json::to_string_pretty(&stats) {
        Ok(json) => println!("{}", json),
        Err(e) => log::warn!("Failed to encode run stats: {}", e),
    }

    if saver.join().is_err() {
        log::warn!("High score writer panicked");
    }
}

/// Keep running right, hop gaps, double-jump when dropping short
fn autopilot(world: &World) -> Vec<Action> {
    let player = &world.player;
    let mut actions = Vec::new();

    if world.phase == GamePhase::LevelUp {
        let pick = UpgradeKind::ALL
            .into_iter()
            .filter(|k| player.upgrades.get(*k) < k.limit())
            .min_by_key(|k| player.upgrades.get(*k));
        if let Some(kind) = pick {
            actions.push(Action::SelectUpgrade(kind));
        }
        return actions;
    }

    let body = player.rect();
    let near_edge = player
        .standing_on
        .and_then(|id| world.platform(id))
        .is_some_and(|p| body.right() > p.rect.right() - 8.0);
    let threat = world
        .enemies
        .iter()
        .any(|e| e.rect.left() > body.right() && e.rect.left() - body.right() < 60.0 && (e.rect.top() - body.top()).abs() < 40.0);

    if player.grounded && (near_edge || threat) {
        actions.push(Action::Jump);
    } else if !player.grounded && player.vel.y > 2.0 && player.air_jumps > 0 {
        actions.push(Action::Jump);
    }
    if player.upgrades.pulse > 0 && threat {
        actions.push(Action::Pulse);
    }
    actions
}

fn data_dir() -> PathBuf {
    std::env::var_os("ECHO_RUNNER_DATA")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
