// CLASSIFICATION: COMMUNITY
// Filename: config.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Session configuration.
//!
//! A [`SessionConfig`] is assembled before `init`, frozen while the engine
//! runs, and can be loaded from TOML or YAML files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::episode::RestartPolicy;
use crate::error::{ControllerError, Result};
use crate::names::{default_ipc_dir, DEFAULT_BASE_NAME};

/// Pixel formats understood by the engine renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScreenFormat {
    #[default]
    Crcgcb,
    Crcgcbzb,
    Rgb24,
    Rgba32,
    Argb32,
    Cbcgcr,
    Cbcgcrzb,
    Bgr24,
    Bgra32,
    Abgr32,
    Gray8,
    Zbuffer8,
    Doom256Colors,
}

impl ScreenFormat {
    /// Identifier passed to the engine and echoed in the game vars.
    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i32) -> Option<Self> {
        use ScreenFormat::*;
        [
            Crcgcb,
            Crcgcbzb,
            Rgb24,
            Rgba32,
            Argb32,
            Cbcgcr,
            Cbcgcrzb,
            Bgr24,
            Bgra32,
            Abgr32,
            Gray8,
            Zbuffer8,
            Doom256Colors,
        ]
        .get(usize::try_from(id).ok()?)
        .copied()
    }

    /// Bytes per pixel; planar formats count all their planes.
    pub fn bytes_per_pixel(self) -> usize {
        use ScreenFormat::*;
        match self {
            Crcgcb | Cbcgcr | Rgb24 | Bgr24 => 3,
            Crcgcbzb | Cbcgcrzb | Rgba32 | Argb32 | Bgra32 | Abgr32 => 4,
            Gray8 | Zbuffer8 | Doom256Colors => 1,
        }
    }
}

/// Screen geometry negotiated with the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenSettings {
    pub width: u32,
    pub height: u32,
    pub format: ScreenFormat,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            format: ScreenFormat::default(),
        }
    }
}

impl ScreenSettings {
    pub fn pitch(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Size of the screen block in bytes.
    pub fn size(&self) -> usize {
        self.pitch() * self.height as usize
    }
}

/// Render toggles forwarded to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub hud: bool,
    pub weapon: bool,
    pub crosshair: bool,
    pub decals: bool,
    pub particles: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            hud: true,
            weapon: true,
            crosshair: false,
            decals: true,
            particles: true,
        }
    }
}

/// Naming and placement of the IPC objects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcSettings {
    pub base_name: String,
    /// Directory of the named objects; `None` uses `DOOMCTL_IPC_DIR`,
    /// `/dev/shm` or the temp dir, in that order.
    pub dir: Option<PathBuf>,
}

impl Default for IpcSettings {
    fn default() -> Self {
        Self {
            base_name: DEFAULT_BASE_NAME.into(),
            dir: None,
        }
    }
}

impl IpcSettings {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_ipc_dir)
    }
}

/// Protocol time bounds, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub startup_ms: u64,
    pub tic_ms: u64,
    pub close_ack_ms: u64,
    pub send_ms: u64,
    pub terminate_grace_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            startup_ms: 10_000,
            tic_ms: 5_000,
            close_ack_ms: 1_000,
            send_ms: 1_000,
            terminate_grace_ms: 1_000,
        }
    }
}

impl Timeouts {
    pub fn startup(&self) -> Duration {
        Duration::from_millis(self.startup_ms)
    }

    pub fn tic(&self) -> Duration {
        Duration::from_millis(self.tic_ms)
    }

    pub fn close_ack(&self) -> Duration {
        Duration::from_millis(self.close_ack_ms)
    }

    pub fn send(&self) -> Duration {
        Duration::from_millis(self.send_ms)
    }

    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }
}

/// Everything needed to start one engine session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Namespaces the IPC objects; generated at `init` when unset.
    pub instance_id: Option<String>,
    /// Engine executable.
    pub game_path: PathBuf,
    /// Base resource archive.
    pub iwad_path: Option<PathBuf>,
    /// Supplemental resource archive.
    pub file_path: Option<PathBuf>,
    pub map: String,
    pub skill: u8,
    /// Engine settings file.
    pub config_path: Option<PathBuf>,
    pub seed: Option<u32>,
    pub screen: ScreenSettings,
    pub render: RenderSettings,
    pub episode: RestartPolicy,
    pub ipc: IpcSettings,
    pub timeouts: Timeouts,
    /// Extra arguments appended to the engine command line.
    pub engine_args: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            instance_id: None,
            game_path: PathBuf::from("zdoom"),
            iwad_path: None,
            file_path: None,
            map: "map01".into(),
            skill: 3,
            config_path: None,
            seed: None,
            screen: ScreenSettings::default(),
            render: RenderSettings::default(),
            episode: RestartPolicy::default(),
            ipc: IpcSettings::default(),
            timeouts: Timeouts::default(),
            engine_args: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Load from a `.toml`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let config: Self = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&text)
                .map_err(|e| ControllerError::Config(format!("{}: {e}", path.display())))?,
            _ => toml::from_str(&text)
                .map_err(|e| ControllerError::Config(format!("{}: {e}", path.display())))?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.screen.width == 0 || self.screen.height == 0 {
            return Err(ControllerError::Config(
                "screen width and height must be non-zero".into(),
            ));
        }
        if !(1..=5).contains(&self.skill) {
            return Err(ControllerError::Config(format!(
                "skill {} is outside 1..=5",
                self.skill
            )));
        }
        if self.map.trim().is_empty() || self.map.contains(char::is_whitespace) {
            return Err(ControllerError::Config(format!("invalid map `{}`", self.map)));
        }
        Ok(())
    }

    pub fn set_screen_resolution(&mut self, width: u32, height: u32) {
        self.screen.width = width;
        self.screen.height = height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn planar_and_packed_sizes() {
        let mut screen = ScreenSettings::default();
        assert_eq!(screen.pitch(), 960);
        assert_eq!(screen.size(), 960 * 240);
        screen.format = ScreenFormat::Gray8;
        assert_eq!(screen.size(), 320 * 240);
        assert_eq!(ScreenFormat::from_id(ScreenFormat::Bgra32.id()), Some(ScreenFormat::Bgra32));
        assert_eq!(ScreenFormat::from_id(-1), None);
    }

    #[test]
    fn loads_toml_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.toml");
        fs::write(
            &path,
            concat!(
                "map = \"map02\"\nskill = 4\n",
                "[screen]\nwidth = 640\nheight = 480\nformat = \"RGB24\"\n",
                "[episode]\nmap_timeout = 100\nrestart_on_timeout = true\n",
            ),
        )
        .unwrap();
        let cfg = SessionConfig::load(&path).unwrap();
        assert_eq!(cfg.map, "map02");
        assert_eq!(cfg.screen.format, ScreenFormat::Rgb24);
        assert_eq!(cfg.episode.map_timeout, 100);
        assert!(cfg.episode.restart_on_timeout);
        assert_eq!(cfg.timeouts, Timeouts::default());
    }

    #[test]
    fn loads_yaml_and_validates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.yaml");
        fs::write(&path, "skill: 9\n").unwrap();
        assert!(matches!(
            SessionConfig::load(&path),
            Err(ControllerError::Config(_))
        ));
        fs::write(&path, "skill: 2\nrender:\n  hud: false\n").unwrap();
        let cfg = SessionConfig::load(&path).unwrap();
        assert!(!cfg.render.hud);
        assert!(cfg.render.weapon);
    }
}
