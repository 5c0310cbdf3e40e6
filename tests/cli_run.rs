// CLASSIFICATION: COMMUNITY
// Filename: cli_run.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

mod common;

use std::fs;

use common::{ipc_entries, STUB_ENGINE};
use doomctl::cli::args::build_cli;
use doomctl::cli::{drive, load_config};
use serial_test::serial;
use tempfile::tempdir;

#[test]
#[serial]
fn runs_a_configured_session_and_summarises_it() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.yaml");
    fs::write(
        &path,
        concat!(
            "screen:\n  width: 16\n  height: 8\n  format: GRAY8\n",
            "episode:\n  map_timeout: 10\n  restart_on_timeout: true\n",
        ),
    )
    .unwrap();
    let ipc = dir.path().join("ipc");
    fs::create_dir(&ipc).unwrap();

    let matches = build_cli()
        .try_get_matches_from([
            "doomctl",
            "--config",
            path.to_str().unwrap(),
            "--engine",
            STUB_ENGINE,
            "--ipc-dir",
            ipc.to_str().unwrap(),
            "--tics",
            "25",
        ])
        .unwrap();
    let config = load_config(&matches).unwrap();
    let summary = drive(config, 25).unwrap();

    assert_eq!(summary.tics, 25);
    assert_eq!(summary.final_game_tic, 25);
    assert_eq!(summary.map_restarts, 2);
    assert_eq!(summary.restart_reasons.get("Timeout"), Some(&2));
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["final_game_tic"], 25);
    assert_eq!(ipc_entries(&ipc), 0);
}
