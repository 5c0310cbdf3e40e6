// CLASSIFICATION: COMMUNITY
// Filename: stub_engine.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Stand-in engine: attaches to the controller's shared memory and queues
//! named on its command line and plays the scripted game.

use std::time::Duration;

use anyhow::Context;
use log::info;
use once_cell::sync::OnceCell;

use doomctl::ipc::Handshake;
use doomctl::shm::EngineRegion;
use doomctl::sim::{EngineArgs, EngineExit, ScriptedEngine};

const SEND_BOUND: Duration = Duration::from_secs(1);

#[cfg(unix)]
static PARENT: OnceCell<libc::pid_t> = OnceCell::new();

#[cfg(unix)]
fn parent_alive() -> bool {
    // SAFETY: getppid has no preconditions.
    let current = unsafe { libc::getppid() };
    PARENT.get().map_or(true, |parent| *parent == current)
}

#[cfg(not(unix))]
fn parent_alive() -> bool {
    true
}

fn run() -> anyhow::Result<EngineExit> {
    #[cfg(unix)]
    {
        // SAFETY: as above.
        let _ = PARENT.set(unsafe { libc::getppid() });
    }
    let args = EngineArgs::parse(std::env::args().skip(1))?;
    if !args.controlled {
        anyhow::bail!("refusing to run without +doomctl_controlled 1");
    }
    let names = args.names()?;
    let view = EngineRegion::attach(&names, args.screen.size())
        .context("attaching shared state region")?;
    let channel = Handshake::attach(&names, SEND_BOUND).context("attaching handshake queues")?;
    info!("stub engine {} attached", names.instance_id());
    let exit = ScriptedEngine::new(channel, view, args)
        .with_supervisor(parent_alive)
        .run()?;
    Ok(exit)
}

fn main() {
    env_logger::init();
    match run() {
        Ok(EngineExit::Closed) | Ok(EngineExit::Interrupted) => {}
        Ok(exit) => {
            eprintln!("stub engine stopped: {exit:?}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}
