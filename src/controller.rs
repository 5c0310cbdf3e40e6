// CLASSIFICATION: COMMUNITY
// Filename: controller.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! `DoomController`: the single entry point for driving an engine.
//!
//! The controller holds a [`SessionConfig`] and a staged [`InputBlock`].
//! `init` creates the shared memory blocks and queues, launches the engine
//! and completes the ready handshake; `tic`/`update` step it; `close` (or
//! dropping the controller) releases everything.

use std::path::PathBuf;

use log::{debug, info};

use crate::catalog::{Button, GameVar};
use crate::config::{ScreenFormat, SessionConfig, Timeouts};
use crate::episode::{EpisodeState, RestartPolicy, RestartReason};
use crate::error::{ControllerError, Result};
use crate::ipc::{Handshake, InterruptHandle};
use crate::names::{generate_instance_id, ResourceNames};
use crate::process::ProcessManager;
use crate::session::Session;
use crate::shm::{GameVarsBlock, InputBlock, SharedRegion};
use crate::sync::SyncState;

type LiveSession = Session<Handshake, SharedRegion, ProcessManager>;

pub struct DoomController {
    config: SessionConfig,
    input: InputBlock,
    names: Option<ResourceNames>,
    session: Option<LiveSession>,
}

impl Default for DoomController {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl DoomController {
    pub fn new(config: SessionConfig) -> Self {
        let input = neutral_input(&config);
        Self {
            config,
            input,
            names: None,
            session: None,
        }
    }

    // Lifecycle

    /// Start a session. A previous session that ended in error is closed
    /// first; a running one makes this fail with `InvalidState`.
    pub fn init(&mut self) -> Result<()> {
        if let Some(session) = &self.session {
            if session.is_running() {
                return Err(ControllerError::InvalidState {
                    op: "init",
                    state: session.state(),
                });
            }
        }
        self.close();
        self.config.validate()?;

        let instance_id = self
            .config
            .instance_id
            .clone()
            .unwrap_or_else(generate_instance_id);
        let names = ResourceNames::new(
            &self.config.ipc.base_name,
            &instance_id,
            self.config.ipc.resolved_dir(),
        )?;
        let region = SharedRegion::create(&names, &self.config.screen)?;
        let channel = Handshake::create(&names, self.config.timeouts.send())?;
        let process = ProcessManager::new(&self.config, &names);
        debug!("engine command line: {:?}", process.args());

        self.input = neutral_input(&self.config);
        let session = Session::start(&self.config, channel, region, process)?;
        info!("controller {} initialised", instance_id);
        self.names = Some(names);
        self.session = Some(session);
        Ok(())
    }

    /// Release the engine, channel and shared memory. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        self.names = None;
    }

    /// Advance one tic with the staged input. No restart policy is applied.
    pub fn tic(&mut self) -> Result<()> {
        let input = self.input;
        self.session_mut()?.tic(&input)
    }

    /// Advance one tic and apply the restart policy.
    pub fn update(&mut self) -> Result<Option<RestartReason>> {
        let input = self.input;
        self.session_mut()?.update(&input)
    }

    pub fn restart_map(&mut self) -> Result<()> {
        self.session_mut()?.restart_map()
    }

    /// Reset episode bookkeeping to start at the next tic.
    pub fn reset_map(&mut self) -> Result<()> {
        self.session_mut()?.reset_map();
        Ok(())
    }

    pub fn restart_game(&mut self) -> Result<()> {
        self.session_mut()?.restart_game()
    }

    pub fn is_doom_running(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_running)
    }

    pub fn send_command(&mut self, text: &str) -> Result<()> {
        self.session_mut()?.send_command(text)
    }

    /// Restore the default configuration.
    pub fn reset_config(&mut self) -> Result<()> {
        let config = self.configure()?;
        *config = SessionConfig::default();
        self.input = neutral_input(&self.config);
        Ok(())
    }

    pub fn state(&self) -> SyncState {
        self.session
            .as_ref()
            .map_or(SyncState::Uninitialized, Session::state)
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.names.as_ref().map(ResourceNames::instance_id)
    }

    pub fn pid(&self) -> Option<u32> {
        self.session.as_ref().and_then(Session::pid)
    }

    /// Handle that breaks a blocked `tic`/`update` from another thread.
    pub fn interrupt_handle(&mut self) -> Result<InterruptHandle> {
        let names = self.names.clone().ok_or(ControllerError::NotRunning)?;
        self.session_mut()?.channel_mut().interrupt_handle(&names)
    }

    fn session_mut(&mut self) -> Result<&mut LiveSession> {
        self.session.as_mut().ok_or(ControllerError::NotRunning)
    }

    // Configuration

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Mutable configuration; `ConfigFrozen` while the engine runs.
    pub fn configure(&mut self) -> Result<&mut SessionConfig> {
        if self.is_doom_running() {
            return Err(ControllerError::ConfigFrozen);
        }
        Ok(&mut self.config)
    }

    pub fn set_instance_id(&mut self, id: impl Into<String>) -> Result<()> {
        self.configure()?.instance_id = Some(id.into());
        Ok(())
    }

    pub fn set_game_path(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        self.configure()?.game_path = path.into();
        Ok(())
    }

    pub fn set_iwad_path(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        self.configure()?.iwad_path = Some(path.into());
        Ok(())
    }

    pub fn set_file_path(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        self.configure()?.file_path = Some(path.into());
        Ok(())
    }

    pub fn set_config_path(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        self.configure()?.config_path = Some(path.into());
        Ok(())
    }

    pub fn set_map(&mut self, map: impl Into<String>) -> Result<()> {
        self.configure()?.map = map.into();
        Ok(())
    }

    pub fn set_skill(&mut self, skill: u8) -> Result<()> {
        self.configure()?.skill = skill;
        Ok(())
    }

    pub fn set_seed(&mut self, seed: u32) -> Result<()> {
        self.configure()?.seed = Some(seed);
        Ok(())
    }

    pub fn set_screen_resolution(&mut self, width: u32, height: u32) -> Result<()> {
        self.configure()?.set_screen_resolution(width, height);
        self.input = neutral_input(&self.config);
        Ok(())
    }

    pub fn set_screen_width(&mut self, width: u32) -> Result<()> {
        let height = self.config.screen.height;
        self.set_screen_resolution(width, height)
    }

    pub fn set_screen_height(&mut self, height: u32) -> Result<()> {
        let width = self.config.screen.width;
        self.set_screen_resolution(width, height)
    }

    pub fn set_screen_format(&mut self, format: ScreenFormat) -> Result<()> {
        self.configure()?.screen.format = format;
        Ok(())
    }

    pub fn set_render_hud(&mut self, on: bool) -> Result<()> {
        self.configure()?.render.hud = on;
        Ok(())
    }

    pub fn set_render_weapon(&mut self, on: bool) -> Result<()> {
        self.configure()?.render.weapon = on;
        Ok(())
    }

    pub fn set_render_crosshair(&mut self, on: bool) -> Result<()> {
        self.configure()?.render.crosshair = on;
        Ok(())
    }

    pub fn set_render_decals(&mut self, on: bool) -> Result<()> {
        self.configure()?.render.decals = on;
        Ok(())
    }

    pub fn set_render_particles(&mut self, on: bool) -> Result<()> {
        self.configure()?.render.particles = on;
        Ok(())
    }

    pub fn set_ipc_dir(&mut self, dir: impl Into<PathBuf>) -> Result<()> {
        self.configure()?.ipc.dir = Some(dir.into());
        Ok(())
    }

    pub fn set_timeouts(&mut self, timeouts: Timeouts) -> Result<()> {
        self.configure()?.timeouts = timeouts;
        Ok(())
    }

    pub fn add_engine_arg(&mut self, arg: impl Into<String>) -> Result<()> {
        self.configure()?.engine_args.push(arg.into());
        Ok(())
    }

    // Restart policy; applies immediately, even mid-session.

    pub fn restart_policy(&self) -> RestartPolicy {
        self.config.episode
    }

    fn update_policy(&mut self, change: impl FnOnce(&mut RestartPolicy)) {
        change(&mut self.config.episode);
        if let Some(session) = &mut self.session {
            *session.episode_mut().policy_mut() = self.config.episode;
        }
    }

    pub fn map_timeout(&self) -> u32 {
        self.config.episode.map_timeout
    }

    pub fn set_map_timeout(&mut self, tics: u32) {
        self.update_policy(|p| p.map_timeout = tics);
    }

    /// Enable or disable every automatic restart condition at once.
    pub fn set_auto_map_restart(&mut self, enabled: bool) {
        self.update_policy(|p| p.set_all(enabled));
    }

    pub fn set_auto_map_restart_on_timeout(&mut self, enabled: bool) {
        self.update_policy(|p| p.restart_on_timeout = enabled);
    }

    pub fn set_auto_map_restart_on_player_death(&mut self, enabled: bool) {
        self.update_policy(|p| p.restart_on_player_death = enabled);
    }

    pub fn set_auto_map_restart_on_map_end(&mut self, enabled: bool) {
        self.update_policy(|p| p.restart_on_map_end = enabled);
    }

    // Input

    pub fn input(&self) -> &InputBlock {
        &self.input
    }

    pub fn set_mouse(&mut self, x: i32, y: i32) {
        self.input.set_mouse_x(x);
        self.input.set_mouse_y(y);
    }

    pub fn set_mouse_x(&mut self, x: i32) {
        self.input.set_mouse_x(x);
    }

    pub fn set_mouse_y(&mut self, y: i32) {
        self.input.set_mouse_y(y);
    }

    /// Press or release `button`. Returns false when the button is not
    /// available and so stays released.
    pub fn set_button_state(&mut self, button: Button, pressed: bool) -> bool {
        self.input.set_button(button, pressed)
    }

    pub fn toggle_button_state(&mut self, button: Button) -> bool {
        let pressed = !self.input.is_pressed(button);
        self.input.set_button(button, pressed)
    }

    pub fn is_button_pressed(&self, button: Button) -> bool {
        self.input.is_pressed(button)
    }

    pub fn set_allow_button(&mut self, button: Button, allowed: bool) {
        self.input.set_available(button, allowed);
    }

    pub fn is_allowed(&self, button: Button) -> bool {
        self.input.is_available(button)
    }

    pub fn allow_all_buttons(&mut self) {
        for button in Button::ALL {
            self.input.set_available(*button, true);
        }
    }

    pub fn reset_input(&mut self) {
        self.input = neutral_input(&self.config);
    }

    // Game state

    /// Game vars of the last completed tic; zeroed without a session.
    pub fn game_vars(&self) -> GameVarsBlock {
        self.session
            .as_ref()
            .map(Session::game_vars)
            .unwrap_or_default()
    }

    pub fn game_var(&self, var: GameVar) -> i32 {
        self.game_vars().get(var)
    }

    pub fn game_tic(&self) -> u32 {
        self.game_vars().game_tic
    }

    pub fn game_seed(&self) -> u32 {
        self.game_vars().game_seed
    }

    pub fn game_static_seed(&self) -> u32 {
        self.game_vars().game_static_seed
    }

    pub fn map_reward(&self) -> i32 {
        self.game_vars().map_reward
    }

    pub fn shaping_reward(&self) -> i32 {
        self.game_vars().shaping_reward
    }

    /// User variable `number` (1-based); zero when out of range.
    pub fn map_user_var(&self, number: usize) -> i32 {
        self.game_vars().user_var(number).unwrap_or_default()
    }

    pub fn map_start_tic(&self) -> u32 {
        self.game_vars().map_start_tic
    }

    pub fn map_tic(&self) -> u32 {
        self.game_vars().map_tic
    }

    pub fn map_kill_count(&self) -> i32 {
        self.game_vars().map_kill_count
    }

    pub fn map_item_count(&self) -> i32 {
        self.game_vars().map_item_count
    }

    pub fn map_secret_count(&self) -> i32 {
        self.game_vars().map_secret_count
    }

    pub fn is_map_end(&self) -> bool {
        self.game_vars().is_map_end()
    }

    pub fn is_player_dead(&self) -> bool {
        self.game_vars().is_player_dead()
    }

    pub fn player_kill_count(&self) -> i32 {
        self.game_vars().player_kill_count
    }

    pub fn player_item_count(&self) -> i32 {
        self.game_vars().player_item_count
    }

    pub fn player_secret_count(&self) -> i32 {
        self.game_vars().player_secret_count
    }

    pub fn player_frag_count(&self) -> i32 {
        self.game_vars().player_frag_count
    }

    pub fn is_player_on_ground(&self) -> bool {
        self.game_vars().player_on_ground != 0
    }

    pub fn player_health(&self) -> i32 {
        self.game_vars().player_health
    }

    pub fn player_armor(&self) -> i32 {
        self.game_vars().player_armor
    }

    pub fn player_selected_weapon(&self) -> i32 {
        self.game_vars().player_selected_weapon
    }

    pub fn player_selected_weapon_ammo(&self) -> i32 {
        self.game_vars().player_selected_weapon_ammo
    }

    pub fn player_ammo(&self, slot: usize) -> i32 {
        self.game_vars().ammo(slot).unwrap_or_default()
    }

    pub fn player_has_weapon(&self, slot: usize) -> bool {
        self.game_vars().has_weapon(slot)
    }

    pub fn player_has_key(&self, slot: usize) -> bool {
        self.game_vars().has_key(slot)
    }

    // Screen

    pub fn screen_width(&self) -> u32 {
        self.config.screen.width
    }

    pub fn screen_height(&self) -> u32 {
        self.config.screen.height
    }

    pub fn screen_pitch(&self) -> usize {
        self.config.screen.pitch()
    }

    pub fn screen_size(&self) -> usize {
        self.config.screen.size()
    }

    pub fn screen_format(&self) -> ScreenFormat {
        self.config.screen.format
    }

    /// Frame of the last completed tic.
    pub fn screen(&self) -> Option<&[u8]> {
        self.session
            .as_ref()
            .map(Session::screen)
            .filter(|s| !s.is_empty())
    }

    // Episode

    pub fn episode_state(&self) -> EpisodeState {
        self.session
            .as_ref()
            .map(|s| *s.episode().state())
            .unwrap_or_default()
    }

    pub fn is_map_first_tic(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.episode().is_map_first_tic(&s.game_vars()))
    }

    pub fn is_map_last_tic(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.episode().is_map_last_tic(&s.game_vars()))
    }

    pub fn is_map_ended(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.episode().is_map_ended())
    }

    pub fn map_restart_count(&self) -> u32 {
        self.session
            .as_ref()
            .map_or(0, |s| s.episode().restart_count())
    }
}

impl Drop for DoomController {
    fn drop(&mut self) {
        self.close();
    }
}

fn neutral_input(config: &SessionConfig) -> InputBlock {
    InputBlock::neutral(config.screen.width as i32, config.screen.height as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn getters_are_zero_before_init() {
        let controller = DoomController::default();
        assert!(!controller.is_doom_running());
        assert_eq!(controller.state(), SyncState::Uninitialized);
        assert_eq!(controller.game_tic(), 0);
        assert_eq!(controller.player_health(), 0);
        assert_eq!(controller.game_var(GameVar::Ammo2), 0);
        assert_eq!(controller.map_user_var(31), 0);
        assert!(controller.screen().is_none());
        assert_eq!(controller.map_restart_count(), 0);
        assert!(!controller.is_map_first_tic());
    }

    #[test]
    fn stepping_without_a_session_is_rejected() {
        let mut controller = DoomController::default();
        assert!(matches!(controller.tic(), Err(ControllerError::NotRunning)));
        assert!(matches!(controller.update(), Err(ControllerError::NotRunning)));
        assert!(matches!(
            controller.send_command("map map01"),
            Err(ControllerError::NotRunning)
        ));
        assert!(controller.interrupt_handle().is_err());
    }

    #[test]
    fn input_mutators_respect_availability_and_bounds() {
        let mut controller = DoomController::default();
        controller.set_mouse(1_000, -1_000);
        assert_eq!(controller.input().mouse_x, 320);
        assert_eq!(controller.input().mouse_y, -240);

        assert!(controller.toggle_button_state(Button::Attack));
        assert!(controller.is_button_pressed(Button::Attack));
        controller.set_allow_button(Button::Attack, false);
        assert!(!controller.is_button_pressed(Button::Attack));
        assert!(!controller.set_button_state(Button::Attack, true));
        controller.allow_all_buttons();
        assert!(controller.set_button_state(Button::Attack, true));

        controller.reset_input();
        assert_eq!(*controller.input(), InputBlock::neutral(320, 240));
    }

    #[test]
    fn policy_setters_follow_the_master_switch() {
        let mut controller = DoomController::default();
        controller.set_auto_map_restart(true);
        controller.set_map_timeout(100);
        controller.set_auto_map_restart_on_map_end(false);
        let policy = controller.restart_policy();
        assert!(policy.restart_on_timeout);
        assert!(policy.restart_on_player_death);
        assert!(!policy.restart_on_map_end);
        assert_eq!(controller.map_timeout(), 100);
    }

    #[test]
    fn config_is_editable_while_stopped() {
        let mut controller = DoomController::default();
        controller.set_map("map03").unwrap();
        controller.set_screen_resolution(640, 480).unwrap();
        assert_eq!(controller.screen_size(), 640 * 480 * 3);
        assert_eq!(controller.input().mouse_max_x, 640);
        controller.reset_config().unwrap();
        assert_eq!(controller.config(), &SessionConfig::default());
    }

    #[test]
    fn width_and_height_setters_move_the_mouse_bounds() {
        let mut controller = DoomController::default();
        controller.set_screen_resolution(320, 200).unwrap();
        controller.set_mouse(300, 150);
        controller.set_screen_width(160).unwrap();
        assert_eq!(controller.screen_width(), 160);
        assert_eq!(controller.screen_height(), 200);
        assert_eq!(controller.input().mouse_max_x, 160);
        assert_eq!(controller.input().mouse_x, 0);
        controller.set_screen_height(120).unwrap();
        assert_eq!(controller.screen_height(), 120);
        assert_eq!(controller.input().mouse_max_y, 120);
        assert_eq!(controller.screen_pitch(), 160 * 3);
    }

    #[test]
    fn failed_init_leaves_no_ipc_objects() {
        let dir = tempdir().unwrap();
        let mut controller = DoomController::default();
        controller.set_game_path("/nonexistent/doomctl-engine").unwrap();
        controller.set_ipc_dir(dir.path()).unwrap();
        let err = controller.init().unwrap_err();
        assert!(matches!(err, ControllerError::LaunchFailure { .. }));
        assert!(!controller.is_doom_running());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn invalid_config_fails_before_creating_anything() {
        let dir = tempdir().unwrap();
        let mut controller = DoomController::default();
        controller.set_ipc_dir(dir.path()).unwrap();
        controller.set_skill(0).unwrap();
        assert!(matches!(controller.init(), Err(ControllerError::Config(_))));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
