// CLASSIFICATION: COMMUNITY
// Filename: error.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Error type shared by every controller subsystem.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::ipc::MessageCode;
use crate::sync::SyncState;

/// Errors surfaced by the controller, its channels and its regions.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The engine executable or one of its resource archives could not be
    /// found, or the process could not be spawned.
    #[error("failed to launch engine `{}`: {reason}", path.display())]
    LaunchFailure { path: PathBuf, reason: String },
    /// The engine did not answer within the bounded wait.
    #[error("timed out after {waited:?} waiting for {expected}")]
    HandshakeTimeout {
        expected: MessageCode,
        waited: Duration,
    },
    /// A bounded send could not enqueue its message.
    #[error("message queue `{queue}` is full")]
    ChannelFull { queue: String },
    /// The engine reported an error, closed unexpectedly or exited.
    #[error("engine crashed: {0}")]
    EngineCrash(String),
    /// A shared memory object could not be created or mapped at its size.
    #[error("failed to map shared memory `{name}`: {reason}")]
    MappingFailure { name: String, reason: String },
    #[error("command is {len} bytes, the limit is {max}")]
    CommandTooLong { len: usize, max: usize },
    #[error("command contains a NUL byte")]
    InvalidCommand,
    #[error("malformed handshake message with code {0}")]
    MalformedMessage(u8),
    #[error("engine is not running")]
    NotRunning,
    #[error("`{op}` is not permitted while {state:?}")]
    InvalidState { op: &'static str, state: SyncState },
    #[error("session configuration is frozen while the engine is running")]
    ConfigFrozen,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ControllerError {
    /// Whether the error ends the current engine session.
    ///
    /// Fatal errors leave the controller in the errored state; the caller
    /// must `close` and may `init` a fresh session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::LaunchFailure { .. }
                | Self::HandshakeTimeout { .. }
                | Self::EngineCrash(_)
                | Self::MappingFailure { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;
