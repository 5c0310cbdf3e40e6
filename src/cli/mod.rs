// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v1.1
// Date Modified: 2026-10-18
// Author: Lukas Bower

//! CLI for running a controlled session. Exports the argument parser and
//! the main entry.

pub mod args;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use clap::ArgMatches;
use log::info;
use serde::Serialize;

use crate::cli::args::build_cli;
use crate::config::SessionConfig;
use crate::controller::DoomController;

/// Outcome of a [`drive`] run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub instance_id: String,
    pub started_at: String,
    pub tics: u32,
    pub final_game_tic: u32,
    pub map_restarts: u32,
    pub restart_reasons: BTreeMap<String, u32>,
    pub kill_count: i32,
    pub item_count: i32,
    pub map_reward: i32,
    pub elapsed_ms: u128,
}

/// Entry point for the CLI. Parses arguments, runs the session and prints
/// a summary.
pub fn run() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();
    let config = load_config(&matches)?;
    let tics = matches.get_one::<u32>("tics").copied().unwrap_or(100);
    let summary = drive(config, tics)?;
    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{}: {} tics, final tic {}, {} map restarts, reward {}",
            summary.instance_id,
            summary.tics,
            summary.final_game_tic,
            summary.map_restarts,
            summary.map_reward
        );
    }
    Ok(())
}

/// Session configuration from the optional file plus command line
/// overrides.
pub fn load_config(matches: &ArgMatches) -> anyhow::Result<SessionConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(engine) = matches.get_one::<PathBuf>("engine") {
        config.game_path = engine.clone();
    }
    if let Some(iwad) = matches.get_one::<PathBuf>("iwad") {
        config.iwad_path = Some(iwad.clone());
    }
    if let Some(map) = matches.get_one::<String>("map") {
        config.map = map.clone();
    }
    if let Some(timeout) = matches.get_one::<u32>("timeout") {
        config.episode.map_timeout = *timeout;
        config.episode.restart_on_timeout = true;
    }
    if matches.get_flag("restart-on-death") {
        config.episode.restart_on_player_death = true;
    }
    if let Some(dir) = matches.get_one::<PathBuf>("ipc-dir") {
        config.ipc.dir = Some(dir.clone());
    }
    if let Some(extra) = matches.get_many::<String>("engine-arg") {
        config.engine_args.extend(extra.cloned());
    }
    config.validate()?;
    Ok(config)
}

/// Run `tics` updates with neutral input and report what happened.
pub fn drive(config: SessionConfig, tics: u32) -> anyhow::Result<RunSummary> {
    let started_at = Utc::now().to_rfc3339();
    let clock = Instant::now();
    let mut controller = DoomController::new(config);
    controller.init().context("starting engine session")?;
    let instance_id = controller.instance_id().unwrap_or_default().to_string();

    let mut restart_reasons = BTreeMap::new();
    for _ in 0..tics {
        if let Some(reason) = controller.update()? {
            *restart_reasons.entry(format!("{reason:?}")).or_insert(0) += 1;
        }
    }
    let summary = RunSummary {
        instance_id,
        started_at,
        tics,
        final_game_tic: controller.game_tic(),
        map_restarts: controller.map_restart_count(),
        restart_reasons,
        kill_count: controller.player_kill_count(),
        item_count: controller.player_item_count(),
        map_reward: controller.map_reward(),
        elapsed_ms: clock.elapsed().as_millis(),
    };
    controller.close();
    info!("run finished in {} ms", summary.elapsed_ms);
    Ok(summary)
}
