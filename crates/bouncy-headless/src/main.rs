//! Bouncy-Bombs headless runner
//!
//! Drives the gameplay core with the scripted [`Autopilot`] at one physics
//! step per frame and prints a JSON summary of the session.
//!
//! Usage: `bouncy-headless [config.json] [max_frames]`

use std::path::PathBuf;

use anyhow::Context;
use bouncy_core::{Game, GameConfig, GamePhase, RenderSnapshot};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::pilot::Autopilot;

mod pilot;

/// Frame limit when none is given (five minutes at 60Hz).
const DEFAULT_MAX_FRAMES: u32 = 18_000;

#[derive(Debug, Default, Serialize)]
struct SessionSummary {
    frames: u64,
    elapsed_secs: f32,
    phase: GamePhase,
    health: i32,
    bombs_launched: usize,
    enemies_spawned: usize,
    entities_destroyed: usize,
    damage_taken: i32,
    final_frame: Option<RenderSnapshot>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next().map(PathBuf::from) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            GameConfig::from_json_str(&json)
                .with_context(|| format!("loading config {}", path.display()))?
        }
        None => GameConfig::default(),
    };
    let max_frames = match args.next() {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("invalid frame limit {raw:?}"))?,
        None => DEFAULT_MAX_FRAMES,
    };

    let mut game = Game::new(config)?;
    let mut pilot = Autopilot::new(max_frames);
    let mut summary = SessionSummary::default();

    loop {
        let commands = pilot.commands(&game);
        let report = game.tick(&commands);

        summary.bombs_launched += report.launched.len();
        summary.enemies_spawned += report.spawned.len();
        summary.entities_destroyed += report.collisions.destroyed.len();
        summary.damage_taken += report.collisions.damage_taken;

        if report.quit {
            break;
        }
    }

    summary.frames = game.current_frame();
    summary.elapsed_secs = game.elapsed_secs();
    summary.phase = game.phase();
    summary.health = game.health();
    summary.final_frame = Some(game.snapshot());

    tracing::info!(
        "[headless] {} after {:.1}s",
        game.snapshot().status_line(),
        summary.elapsed_secs
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
