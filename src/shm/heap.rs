// CLASSIFICATION: COMMUNITY
// Filename: heap.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! In-process region pair mirroring the shared memory visibility rules.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::layout::{GameVarsBlock, InputBlock};
use super::{EngineView, StateRegion};

struct Blocks {
    input: InputBlock,
    vars: GameVarsBlock,
    screen: Vec<u8>,
}

fn lock(shared: &Mutex<Blocks>) -> MutexGuard<'_, Blocks> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Controller end. Game vars and screen are copied out on `acquire`, so
/// reads between tics see a stable snapshot.
pub struct HeapRegion {
    shared: Arc<Mutex<Blocks>>,
    vars: GameVarsBlock,
    frame: Vec<u8>,
    closed: bool,
}

/// Engine end. Frames are rendered into a scratch buffer and become visible
/// on `publish`.
pub struct HeapEngineView {
    shared: Arc<Mutex<Blocks>>,
    scratch: Vec<u8>,
}

pub fn heap_region(screen_size: usize) -> (HeapRegion, HeapEngineView) {
    let shared = Arc::new(Mutex::new(Blocks {
        input: InputBlock::default(),
        vars: GameVarsBlock::default(),
        screen: vec![0; screen_size],
    }));
    (
        HeapRegion {
            shared: Arc::clone(&shared),
            vars: GameVarsBlock::default(),
            frame: vec![0; screen_size],
            closed: false,
        },
        HeapEngineView {
            shared,
            scratch: vec![0; screen_size],
        },
    )
}

impl HeapRegion {
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl StateRegion for HeapRegion {
    fn write_input(&mut self, input: &InputBlock) {
        if !self.closed {
            lock(&self.shared).input = *input;
        }
    }

    fn acquire(&mut self) {
        if self.closed {
            return;
        }
        let blocks = lock(&self.shared);
        self.vars = blocks.vars;
        self.frame.copy_from_slice(&blocks.screen);
    }

    fn game_vars(&self) -> GameVarsBlock {
        self.vars
    }

    fn screen(&self) -> &[u8] {
        if self.closed {
            &[]
        } else {
            &self.frame
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.vars = GameVarsBlock::default();
    }
}

impl EngineView for HeapEngineView {
    fn input(&self) -> InputBlock {
        lock(&self.shared).input
    }

    fn screen_mut(&mut self) -> &mut [u8] {
        &mut self.scratch
    }

    fn publish(&mut self, vars: &GameVarsBlock) {
        let mut blocks = lock(&self.shared);
        blocks.vars = *vars;
        blocks.screen.copy_from_slice(&self.scratch);
    }
}
