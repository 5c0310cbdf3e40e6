// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v1.1
// Date Modified: 2026-10-18
// Author: Lukas Bower

//! Lock-step controller for an external game engine process.
//!
//! The controller launches the engine, exchanges input and game state with
//! it through shared memory, steps it one tic at a time over a pair of
//! bounded message queues and restarts maps according to a restart policy.

/// Button and game variable identifiers
pub mod catalog;

/// Session configuration and file loading
pub mod config;

/// Public controller facade
pub mod controller;

/// Restart policy and episode bookkeeping
pub mod episode;

/// Error type shared by all modules
pub mod error;

/// Handshake messages and channels
pub mod ipc;

/// IPC object naming
pub mod names;

/// Engine process management
pub mod process;

/// Generic session over channel, region and process backends
pub mod session;

/// Shared state region
pub mod shm;

/// Scripted engine for tests and smoke runs
pub mod sim;

/// Tic synchronization state machine
pub mod sync;

/// CLI interface for the `doomctl` runner
pub mod cli;

pub use catalog::{Button, GameVar};
pub use config::{ScreenFormat, SessionConfig};
pub use controller::DoomController;
pub use episode::{RestartPolicy, RestartReason};
pub use error::{ControllerError, Result};
pub use sync::SyncState;
