// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.3
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Scripted engine used to exercise a controller without the real game.

pub mod args;
pub mod engine;

pub use args::{EngineArgs, EngineScript};
pub use engine::{EngineExit, InProcessEngine, ScriptedEngine, ITEM_INTERVAL};
