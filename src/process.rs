// CLASSIFICATION: COMMUNITY
// Filename: process.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Engine process management.
//!
//! Builds the engine command line from a [`SessionConfig`], spawns the
//! engine with its output forwarded to the log, and terminates it either
//! gracefully or by force.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{ControllerError, Result};
use crate::names::ResourceNames;

const EXIT_POLL: Duration = Duration::from_millis(10);

/// Reports whether the engine is still running.
pub trait Liveness {
    fn is_alive(&mut self) -> bool;
}

/// Lifecycle of the engine process.
pub trait EngineProcess: Liveness {
    /// Start the engine. Does not wait for it to become ready.
    fn launch(&mut self) -> Result<()>;

    fn pid(&self) -> Option<u32>;

    /// Stop the engine, forcibly once `grace` has elapsed. Idempotent.
    fn terminate(&mut self, grace: Duration);
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

/// Engine command line for `config`, addressed at the IPC objects in `names`.
pub fn engine_args(config: &SessionConfig, names: &ResourceNames) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(iwad) = &config.iwad_path {
        args.extend(["-iwad".to_string(), iwad.display().to_string()]);
    }
    if let Some(file) = &config.file_path {
        args.extend(["-file".to_string(), file.display().to_string()]);
    }
    args.extend(["+map".to_string(), config.map.clone()]);
    args.extend(["-skill".to_string(), config.skill.to_string()]);
    if let Some(cfg) = &config.config_path {
        args.extend(["-config".to_string(), cfg.display().to_string()]);
    }
    args.extend(["-width".to_string(), config.screen.width.to_string()]);
    args.extend(["-height".to_string(), config.screen.height.to_string()]);
    args.extend([
        "+doomctl_screen_format".to_string(),
        config.screen.format.id().to_string(),
    ]);
    let render = &config.render;
    for (name, value) in [
        ("hud", render.hud),
        ("weapon", render.weapon),
        ("crosshair", render.crosshair),
        ("decals", render.decals),
        ("particles", render.particles),
    ] {
        args.extend([format!("+doomctl_render_{name}"), flag(value)]);
    }
    if let Some(seed) = config.seed {
        args.extend(["+doomctl_seed".to_string(), seed.to_string()]);
    }
    args.extend(["+doomctl_ipc_base".to_string(), names.base().to_string()]);
    args.extend([
        "+doomctl_ipc_dir".to_string(),
        names.dir().display().to_string(),
    ]);
    args.extend([
        "+doomctl_instance_id".to_string(),
        names.instance_id().to_string(),
    ]);
    args.extend(["+doomctl_controlled".to_string(), flag(true)]);
    args.extend(config.engine_args.iter().cloned());
    args
}

/// Owns the engine child process.
pub struct ProcessManager {
    program: PathBuf,
    args: Vec<String>,
    resources: Vec<PathBuf>,
    label: String,
    child: Option<Child>,
    forwarders: Vec<JoinHandle<()>>,
}

impl ProcessManager {
    pub fn new(config: &SessionConfig, names: &ResourceNames) -> Self {
        let resources = config
            .iwad_path
            .iter()
            .chain(config.file_path.iter())
            .cloned()
            .collect();
        Self {
            program: config.game_path.clone(),
            args: engine_args(config, names),
            resources,
            label: format!("engine-{}", names.instance_id()),
            child: None,
            forwarders: Vec::new(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn launch_failure(&self, reason: impl Into<String>) -> ControllerError {
        ControllerError::LaunchFailure {
            path: self.program.clone(),
            reason: reason.into(),
        }
    }

    fn forward<R: Read + Send + 'static>(&mut self, stream: Option<R>, channel: &'static str) {
        let Some(stream) = stream else { return };
        let label = self.label.clone();
        let spawned = thread::Builder::new()
            .name(format!("{label}-{channel}"))
            .spawn(move || {
                for line in BufReader::new(stream).lines() {
                    match line {
                        Ok(line) => debug!(target: "doomctl::engine", "[{label} {channel}] {line}"),
                        Err(_) => break,
                    }
                }
            });
        match spawned {
            Ok(handle) => self.forwarders.push(handle),
            Err(e) => warn!("cannot forward engine {channel}: {e}"),
        }
    }

    fn reap(&mut self) {
        for handle in self.forwarders.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Liveness for ProcessManager {
    fn is_alive(&mut self) -> bool {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                debug!("{} exited with {}", self.label, status);
                false
            }
            Some(Err(e)) => {
                warn!("cannot query {}: {}", self.label, e);
                false
            }
            None => false,
        }
    }
}

impl EngineProcess for ProcessManager {
    fn launch(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Err(self.launch_failure("engine already launched"));
        }
        if let Some(missing) = self.resources.iter().find(|p| !p.exists()) {
            return Err(self.launch_failure(format!(
                "resource archive {} not found",
                missing.display()
            )));
        }
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.launch_failure(e.to_string()))?;
        info!(
            "launched {} (pid {}) from {}",
            self.label,
            child.id(),
            self.program.display()
        );
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        self.child = Some(child);
        self.forward(stdout, "stdout");
        self.forward(stderr, "stderr");
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    fn terminate(&mut self, grace: Duration) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if matches!(child.try_wait(), Ok(None)) {
            request_stop(&child);
            let deadline = Instant::now() + grace;
            while matches!(child.try_wait(), Ok(None)) && Instant::now() < deadline {
                thread::sleep(EXIT_POLL);
            }
            if matches!(child.try_wait(), Ok(None)) {
                warn!("{} ignored stop request, killing", self.label);
                let _ = child.kill();
            }
        }
        match child.wait() {
            Ok(status) => debug!("{} reaped: {}", self.label, status),
            Err(e) => warn!("failed to reap {}: {}", self.label, e),
        }
        self.reap();
    }
}

impl Drop for ProcessManager {
    fn drop(&mut self) {
        self.terminate(Duration::ZERO);
    }
}

#[cfg(unix)]
fn request_stop(child: &Child) {
    if let Ok(pid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: plain signal delivery to our own unreaped child.
        unsafe {
            libc::kill(pid, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn request_stop(_child: &Child) {}
