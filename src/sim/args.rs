// CLASSIFICATION: COMMUNITY
// Filename: args.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Engine-side reading of the controller's command line.

use std::path::PathBuf;

use log::debug;

use crate::config::{RenderSettings, ScreenFormat, ScreenSettings};
use crate::error::{ControllerError, Result};
use crate::names::{default_ipc_dir, ResourceNames, DEFAULT_BASE_NAME};

/// Deterministic events injected into a scripted run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineScript {
    /// Map tic on which the player dies. Repeats after every map restart.
    pub death_tic: Option<u32>,
    /// Map tic on which the exit is reached.
    pub map_end_tic: Option<u32>,
    /// Game tic on which the engine reports an error and exits.
    pub error_tic: Option<u32>,
    /// Game tic from which TIC requests go unanswered.
    pub hang_tic: Option<u32>,
}

/// Parsed engine invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineArgs {
    pub iwad: Option<PathBuf>,
    pub file: Option<PathBuf>,
    pub map: String,
    pub skill: u8,
    pub config: Option<PathBuf>,
    pub screen: ScreenSettings,
    pub render: RenderSettings,
    pub seed: Option<u32>,
    pub ipc_base: String,
    pub ipc_dir: PathBuf,
    pub instance_id: String,
    pub controlled: bool,
    pub script: EngineScript,
}

impl Default for EngineArgs {
    fn default() -> Self {
        Self {
            iwad: None,
            file: None,
            map: "map01".into(),
            skill: 3,
            config: None,
            screen: ScreenSettings::default(),
            render: RenderSettings::default(),
            seed: None,
            ipc_base: DEFAULT_BASE_NAME.into(),
            ipc_dir: default_ipc_dir(),
            instance_id: String::new(),
            controlled: false,
            script: EngineScript::default(),
        }
    }
}

fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| ControllerError::Config(format!("{key}: invalid value `{value}`")))
}

fn switch(key: &str, value: &str) -> Result<bool> {
    match value {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(ControllerError::Config(format!(
            "{key}: expected 0 or 1, got `{other}`"
        ))),
    }
}

impl EngineArgs {
    /// Parse an argument list, program name excluded. Unknown switches are
    /// skipped so extra engine arguments pass through harmlessly.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = Self::default();
        let mut args = args.into_iter().map(Into::into);
        while let Some(key) = args.next() {
            let takes_value = matches!(
                key.as_str(),
                "-iwad"
                    | "-file"
                    | "+map"
                    | "-skill"
                    | "-config"
                    | "-width"
                    | "-height"
                    | "+doomctl_screen_format"
                    | "+doomctl_render_hud"
                    | "+doomctl_render_weapon"
                    | "+doomctl_render_crosshair"
                    | "+doomctl_render_decals"
                    | "+doomctl_render_particles"
                    | "+doomctl_seed"
                    | "+doomctl_ipc_base"
                    | "+doomctl_ipc_dir"
                    | "+doomctl_instance_id"
                    | "+doomctl_controlled"
                    | "+stub_death_tic"
                    | "+stub_map_end_tic"
                    | "+stub_error_tic"
                    | "+stub_hang_tic"
            );
            if !takes_value {
                debug!("ignoring engine argument `{key}`");
                continue;
            }
            let value = args
                .next()
                .ok_or_else(|| ControllerError::Config(format!("{key}: missing value")))?;
            let v = value.as_str();
            match key.as_str() {
                "-iwad" => parsed.iwad = Some(v.into()),
                "-file" => parsed.file = Some(v.into()),
                "+map" => parsed.map = v.to_string(),
                "-skill" => parsed.skill = number(&key, v)?,
                "-config" => parsed.config = Some(v.into()),
                "-width" => parsed.screen.width = number(&key, v)?,
                "-height" => parsed.screen.height = number(&key, v)?,
                "+doomctl_screen_format" => {
                    parsed.screen.format = ScreenFormat::from_id(number(&key, v)?).ok_or_else(
                        || ControllerError::Config(format!("unknown screen format {v}")),
                    )?
                }
                "+doomctl_render_hud" => parsed.render.hud = switch(&key, v)?,
                "+doomctl_render_weapon" => parsed.render.weapon = switch(&key, v)?,
                "+doomctl_render_crosshair" => parsed.render.crosshair = switch(&key, v)?,
                "+doomctl_render_decals" => parsed.render.decals = switch(&key, v)?,
                "+doomctl_render_particles" => parsed.render.particles = switch(&key, v)?,
                "+doomctl_seed" => parsed.seed = Some(number(&key, v)?),
                "+doomctl_ipc_base" => parsed.ipc_base = v.to_string(),
                "+doomctl_ipc_dir" => parsed.ipc_dir = v.into(),
                "+doomctl_instance_id" => parsed.instance_id = v.to_string(),
                "+doomctl_controlled" => parsed.controlled = switch(&key, v)?,
                "+stub_death_tic" => parsed.script.death_tic = Some(number(&key, v)?),
                "+stub_map_end_tic" => parsed.script.map_end_tic = Some(number(&key, v)?),
                "+stub_error_tic" => parsed.script.error_tic = Some(number(&key, v)?),
                "+stub_hang_tic" => parsed.script.hang_tic = Some(number(&key, v)?),
                _ => {}
            }
        }
        Ok(parsed)
    }

    /// IPC names of the controller that launched this engine.
    pub fn names(&self) -> Result<ResourceNames> {
        ResourceNames::new(&self.ipc_base, &self.instance_id, self.ipc_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::process::engine_args;

    #[test]
    fn reads_back_the_controller_command_line() {
        let mut config = SessionConfig {
            iwad_path: Some("doom2.wad".into()),
            file_path: Some("extra.pk3".into()),
            map: "map07".into(),
            skill: 5,
            seed: Some(1234),
            engine_args: vec![
                "-nomonsters".into(),
                "+stub_death_tic".into(),
                "40".into(),
            ],
            ..SessionConfig::default()
        };
        config.set_screen_resolution(640, 480);
        config.screen.format = ScreenFormat::Bgra32;
        config.render.crosshair = true;
        let names = ResourceNames::new("doomctl", "abc123", "/tmp/ipc").unwrap();

        let parsed = EngineArgs::parse(engine_args(&config, &names)).unwrap();
        assert_eq!(parsed.iwad, Some(PathBuf::from("doom2.wad")));
        assert_eq!(parsed.file, Some(PathBuf::from("extra.pk3")));
        assert_eq!(parsed.map, "map07");
        assert_eq!(parsed.skill, 5);
        assert_eq!(parsed.screen, config.screen);
        assert_eq!(parsed.render, config.render);
        assert_eq!(parsed.seed, Some(1234));
        assert!(parsed.controlled);
        assert_eq!(parsed.script.death_tic, Some(40));
        assert_eq!(parsed.names().unwrap(), names);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(EngineArgs::parse(["-width", "wide"]).is_err());
        assert!(EngineArgs::parse(["+doomctl_render_hud", "yes"]).is_err());
        assert!(EngineArgs::parse(["-skill"]).is_err());
        assert!(EngineArgs::parse(["+doomctl_screen_format", "99"]).is_err());
    }
}
