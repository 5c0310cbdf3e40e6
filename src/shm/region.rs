// CLASSIFICATION: COMMUNITY
// Filename: region.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Named shared memory blocks backed by files in the IPC directory.
//!
//! Each block is a scoped mapping: dropping it unmaps it, and the creating
//! side also unlinks the name, so a failed `init` never leaves objects
//! behind.

use std::fs::{self, OpenOptions};
use std::mem::size_of;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::atomic::{fence, Ordering};

use log::{debug, warn};
use memmap2::MmapMut;

use super::layout::{GameVarsBlock, InputBlock};
use super::{EngineView, StateRegion};
use crate::config::ScreenSettings;
use crate::error::{ControllerError, Result};
use crate::names::{BlockKind, ResourceNames};

/// One mapped shared memory object.
pub struct MappedBlock {
    name: String,
    path: PathBuf,
    map: Option<MmapMut>,
    owner: bool,
}

impl MappedBlock {
    /// Create or truncate `name` in `dir` at exactly `len` bytes.
    pub fn create(dir: &Path, name: &str, len: usize) -> Result<Self> {
        let path = dir.join(name);
        let mapped = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .and_then(|file| {
                file.set_len(len as u64)?;
                // SAFETY: the file is sized above and only this crate's two
                // sides map it, honouring the fixed layout.
                unsafe { MmapMut::map_mut(&file) }
            });
        let map = match mapped {
            Ok(map) if map.len() == len => map,
            Ok(map) => {
                let _ = fs::remove_file(&path);
                return Err(ControllerError::MappingFailure {
                    name: name.to_string(),
                    reason: format!("mapped {} bytes, expected {len}", map.len()),
                });
            }
            Err(e) => {
                let _ = fs::remove_file(&path);
                return Err(ControllerError::MappingFailure {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
            }
        };
        debug!("mapped {} ({} bytes)", name, len);
        Ok(Self {
            name: name.to_string(),
            path,
            map: Some(map),
            owner: true,
        })
    }

    /// Map an existing object, checking it has exactly `len` bytes.
    pub fn open(dir: &Path, name: &str, len: usize) -> Result<Self> {
        let path = dir.join(name);
        let failure = |reason: String| ControllerError::MappingFailure {
            name: name.to_string(),
            reason,
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| failure(e.to_string()))?;
        let actual = file.metadata().map_err(|e| failure(e.to_string()))?.len();
        if actual != len as u64 {
            return Err(failure(format!("object is {actual} bytes, expected {len}")));
        }
        // SAFETY: size checked above; the creator keeps the layout fixed.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|e| failure(e.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            path,
            map: Some(map),
            owner: false,
        })
    }

    /// Mapped bytes; empty once closed.
    pub fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or_default()
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.map.as_deref_mut().unwrap_or_default()
    }

    fn read<T: Copy + Default>(&self) -> T {
        let bytes = self.bytes();
        if bytes.len() < size_of::<T>() {
            return T::default();
        }
        // SAFETY: the mapping is page aligned and at least `size_of::<T>()`
        // bytes long; `T` is a plain `repr(C)` record of integers.
        unsafe { ptr::read_volatile(bytes.as_ptr() as *const T) }
    }

    fn write<T: Copy>(&mut self, value: &T) {
        let bytes = self.bytes_mut();
        if bytes.len() < size_of::<T>() {
            return;
        }
        // SAFETY: as in `read`.
        unsafe { ptr::write_volatile(bytes.as_mut_ptr() as *mut T, *value) }
    }

    /// Unmap, and unlink when this side created the object. Idempotent.
    pub fn close(&mut self) {
        if self.map.take().is_none() || !self.owner {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("removed {}", self.name),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove {}: {}", self.name, e),
        }
    }
}

impl Drop for MappedBlock {
    fn drop(&mut self) {
        self.close();
    }
}

/// Controller-owned Input, GameVars and Screen blocks.
pub struct SharedRegion {
    input: MappedBlock,
    vars: MappedBlock,
    screen: MappedBlock,
}

impl SharedRegion {
    pub fn create(names: &ResourceNames, screen: &ScreenSettings) -> Result<Self> {
        let dir = names.dir();
        let input = MappedBlock::create(
            dir,
            &names.block(BlockKind::Input),
            size_of::<InputBlock>(),
        )?;
        let vars = MappedBlock::create(
            dir,
            &names.block(BlockKind::GameVars),
            size_of::<GameVarsBlock>(),
        )?;
        let screen = MappedBlock::create(dir, &names.block(BlockKind::Screen), screen.size())?;
        Ok(Self {
            input,
            vars,
            screen,
        })
    }
}

impl StateRegion for SharedRegion {
    fn write_input(&mut self, input: &InputBlock) {
        self.input.write(input);
        fence(Ordering::Release);
    }

    fn acquire(&mut self) {
        fence(Ordering::Acquire);
    }

    fn game_vars(&self) -> GameVarsBlock {
        self.vars.read()
    }

    fn screen(&self) -> &[u8] {
        self.screen.bytes()
    }

    fn close(&mut self) {
        self.input.close();
        self.vars.close();
        self.screen.close();
    }
}

/// Engine-side attachment to a controller's region.
pub struct EngineRegion {
    input: MappedBlock,
    vars: MappedBlock,
    screen: MappedBlock,
}

impl EngineRegion {
    pub fn attach(names: &ResourceNames, screen_size: usize) -> Result<Self> {
        let dir = names.dir();
        Ok(Self {
            input: MappedBlock::open(
                dir,
                &names.block(BlockKind::Input),
                size_of::<InputBlock>(),
            )?,
            vars: MappedBlock::open(
                dir,
                &names.block(BlockKind::GameVars),
                size_of::<GameVarsBlock>(),
            )?,
            screen: MappedBlock::open(dir, &names.block(BlockKind::Screen), screen_size)?,
        })
    }
}

impl EngineView for EngineRegion {
    fn input(&self) -> InputBlock {
        fence(Ordering::Acquire);
        self.input.read()
    }

    fn screen_mut(&mut self) -> &mut [u8] {
        self.screen.bytes_mut()
    }

    fn publish(&mut self, vars: &GameVarsBlock) {
        self.vars.write(vars);
        fence(Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Button;
    use tempfile::tempdir;

    fn setup(dir: &Path) -> (ResourceNames, ScreenSettings) {
        let names = ResourceNames::new("doomctl", "rg1", dir).unwrap();
        let screen = ScreenSettings {
            width: 8,
            height: 4,
            ..ScreenSettings::default()
        };
        (names, screen)
    }

    #[test]
    fn engine_sees_input_and_controller_sees_vars() {
        let dir = tempdir().unwrap();
        let (names, screen) = setup(dir.path());
        let mut ctrl = SharedRegion::create(&names, &screen).unwrap();
        let mut engine = EngineRegion::attach(&names, screen.size()).unwrap();

        let mut input = InputBlock::neutral(8, 4);
        input.set_button(Button::MoveForward, true);
        ctrl.write_input(&input);
        assert!(engine.input().is_pressed(Button::MoveForward));

        engine.screen_mut().fill(9);
        engine.publish(&GameVarsBlock {
            game_tic: 3,
            ..GameVarsBlock::default()
        });
        ctrl.acquire();
        assert_eq!(ctrl.game_vars().game_tic, 3);
        assert_eq!(ctrl.screen().len(), screen.size());
        assert!(ctrl.screen().iter().all(|b| *b == 9));
    }

    #[test]
    fn attach_rejects_wrong_screen_size() {
        let dir = tempdir().unwrap();
        let (names, screen) = setup(dir.path());
        let _ctrl = SharedRegion::create(&names, &screen).unwrap();
        assert!(matches!(
            EngineRegion::attach(&names, screen.size() + 1),
            Err(ControllerError::MappingFailure { .. })
        ));
    }

    #[test]
    fn close_unlinks_and_reads_defaults_afterwards() {
        let dir = tempdir().unwrap();
        let (names, screen) = setup(dir.path());
        let mut ctrl = SharedRegion::create(&names, &screen).unwrap();
        ctrl.close();
        ctrl.close();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(ctrl.game_vars(), GameVarsBlock::default());
        assert!(ctrl.screen().is_empty());
    }

    #[test]
    fn failed_create_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent");
        let names = ResourceNames::new("doomctl", "rg2", &missing).unwrap();
        assert!(matches!(
            SharedRegion::create(&names, &ScreenSettings::default()),
            Err(ControllerError::MappingFailure { .. })
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
