// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Data plane: the Input, GameVars and Screen blocks.

pub mod heap;
pub mod layout;
pub mod region;

pub use heap::{heap_region, HeapEngineView, HeapRegion};
pub use layout::{GameVarsBlock, InputBlock, SLOT_COUNT, USER_VAR_COUNT};
pub use region::{EngineRegion, MappedBlock, SharedRegion};

/// Controller side of the state region.
///
/// Game vars and screen are only meaningful after [`StateRegion::acquire`]
/// has been called for a completed tic.
pub trait StateRegion {
    fn write_input(&mut self, input: &InputBlock);

    /// Make the engine's writes for the completed tic visible.
    fn acquire(&mut self);

    fn game_vars(&self) -> GameVarsBlock;

    fn screen(&self) -> &[u8];

    /// Release the blocks. Idempotent.
    fn close(&mut self);
}

/// Engine side of the state region.
pub trait EngineView {
    fn input(&self) -> InputBlock;

    fn screen_mut(&mut self) -> &mut [u8];

    /// Publish the game vars and the frame rendered into `screen_mut`.
    fn publish(&mut self, vars: &GameVarsBlock);
}
