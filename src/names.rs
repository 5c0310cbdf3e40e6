// CLASSIFICATION: COMMUNITY
// Filename: names.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Naming of the per-instance IPC objects.
//!
//! Every shared memory block and message queue of a session lives in the IPC
//! directory under `<base>-<kind>-<instance>`, so concurrent sessions never
//! collide and leftovers can be found by name.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{ControllerError, Result};

/// Default prefix of every IPC object name.
pub const DEFAULT_BASE_NAME: &str = "doomctl";

/// Environment override for the directory holding the IPC objects.
pub const IPC_DIR_ENV: &str = "DOOMCTL_IPC_DIR";

static INSTANCE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Kind of shared memory block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Input,
    GameVars,
    Screen,
}

impl BlockKind {
    pub const ALL: [BlockKind; 3] = [BlockKind::Input, BlockKind::GameVars, BlockKind::Screen];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::GameVars => "gamevars",
            Self::Screen => "screen",
        }
    }
}

/// Resolved names of one session's IPC objects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceNames {
    base: String,
    instance_id: String,
    dir: PathBuf,
}

impl ResourceNames {
    pub fn new(base: &str, instance_id: &str, dir: impl Into<PathBuf>) -> Result<Self> {
        validate_component("base name", base)?;
        validate_component("instance id", instance_id)?;
        Ok(Self {
            base: base.to_string(),
            instance_id: instance_id.to_string(),
            dir: dir.into(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn block(&self, kind: BlockKind) -> String {
        format!("{}-{}-{}", self.base, kind.as_str(), self.instance_id)
    }

    /// Queue read by the controller, written by the engine.
    pub fn controller_queue(&self) -> String {
        format!("{}-ctrl-{}", self.base, self.instance_id)
    }

    /// Queue read by the engine, written by the controller.
    pub fn engine_queue(&self) -> String {
        format!("{}-engine-{}", self.base, self.instance_id)
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Paths of every object a session creates.
    pub fn all_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = BlockKind::ALL
            .iter()
            .map(|kind| self.path_of(&self.block(*kind)))
            .collect();
        paths.push(self.path_of(&self.controller_queue()));
        paths.push(self.path_of(&self.engine_queue()));
        paths
    }
}

fn validate_component(what: &str, value: &str) -> Result<()> {
    let ok = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if ok {
        Ok(())
    } else {
        Err(ControllerError::Config(format!(
            "{what} `{value}` must be non-empty ASCII alphanumerics, `_` or `.`"
        )))
    }
}

/// Generate an instance id unique across processes and within this one.
pub fn generate_instance_id() -> String {
    let nanos = chrono::Utc::now().timestamp_subsec_nanos();
    let seq = INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut bytes = [0u8; 10];
    bytes[..4].copy_from_slice(&std::process::id().to_be_bytes());
    bytes[4..8].copy_from_slice(&nanos.to_be_bytes());
    bytes[8..].copy_from_slice(&(seq as u16).to_be_bytes());
    hex::encode(bytes)
}

/// Directory holding IPC objects when the configuration names none.
pub fn default_ipc_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(IPC_DIR_ENV) {
        return PathBuf::from(dir);
    }
    let shm = Path::new("/dev/shm");
    if shm.is_dir() {
        shm.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_the_kind_pattern() {
        let names = ResourceNames::new("doomctl", "abc123", "/tmp").unwrap();
        assert_eq!(names.block(BlockKind::GameVars), "doomctl-gamevars-abc123");
        assert_eq!(names.controller_queue(), "doomctl-ctrl-abc123");
        assert_eq!(names.engine_queue(), "doomctl-engine-abc123");
        assert_eq!(names.all_paths().len(), 5);
    }

    #[test]
    fn separators_are_rejected_in_ids() {
        assert!(ResourceNames::new("doomctl", "a/b", "/tmp").is_err());
        assert!(ResourceNames::new("", "a", "/tmp").is_err());
    }

    #[test]
    fn generated_ids_differ() {
        let a = generate_instance_id();
        let b = generate_instance_id();
        assert_ne!(a, b);
        assert!(ResourceNames::new(DEFAULT_BASE_NAME, &a, "/tmp").is_ok());
    }
}
