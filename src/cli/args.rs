// CLASSIFICATION: COMMUNITY
// Filename: args.rs v1.1
// Date Modified: 2026-10-18
// Author: Lukas Bower

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, Command};

/// Builds and returns the argument parser for the `doomctl` runner.
pub fn build_cli() -> Command {
    Command::new("doomctl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Drive a controlled engine for a number of tics")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Session configuration (.toml, .yaml or .yml)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("engine")
                .short('e')
                .long("engine")
                .value_name("PATH")
                .help("Engine executable")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("iwad")
                .long("iwad")
                .value_name("PATH")
                .help("Base resource archive")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("map")
                .short('m')
                .long("map")
                .value_name("MAP")
                .help("Map to start on"),
        )
        .arg(
            Arg::new("tics")
                .short('n')
                .long("tics")
                .value_name("N")
                .help("Number of tics to run")
                .value_parser(value_parser!(u32))
                .default_value("100"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("TICS")
                .help("Restart the map after this many tics")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("restart-on-death")
                .long("restart-on-death")
                .help("Restart the map when the player dies")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("ipc-dir")
                .long("ipc-dir")
                .value_name("DIR")
                .help("Directory for the shared memory objects")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("engine-arg")
                .long("engine-arg")
                .value_name("ARG")
                .help("Extra engine argument, repeatable")
                .action(ArgAction::Append)
                .allow_hyphen_values(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the run summary as JSON")
                .action(ArgAction::SetTrue),
        )
}
