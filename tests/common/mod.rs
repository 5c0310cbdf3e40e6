// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use doomctl::{ScreenFormat, SessionConfig};

pub const STUB_ENGINE: &str = env!("CARGO_BIN_EXE_doomctl-stub-engine");

/// Config launching the stub engine with its IPC objects under `dir`.
pub fn stub_config(dir: &Path) -> SessionConfig {
    let mut config = SessionConfig::default();
    config.game_path = PathBuf::from(STUB_ENGINE);
    config.ipc.dir = Some(dir.to_path_buf());
    config.set_screen_resolution(16, 8);
    config.screen.format = ScreenFormat::Gray8;
    config.timeouts.startup_ms = 5_000;
    config.timeouts.tic_ms = 2_000;
    config
}

pub fn script(config: &mut SessionConfig, knob: &str, tic: u32) {
    config.engine_args.push(format!("+stub_{knob}"));
    config.engine_args.push(tic.to_string());
}

pub fn ipc_entries(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}
