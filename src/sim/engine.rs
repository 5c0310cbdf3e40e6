// CLASSIFICATION: COMMUNITY
// Filename: engine.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Engine side of the protocol with a tiny deterministic game.
//!
//! Every served tic applies queued console commands, reads the input block,
//! advances the game by one tic, renders a frame whose bytes all equal the
//! low byte of the game tic and publishes the result before answering.

use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::args::EngineArgs;
use crate::catalog::Button;
use crate::error::{ControllerError, Result};
use crate::ipc::{HandshakeChannel, Message, MessageCode};
use crate::process::{EngineProcess, Liveness};
use crate::shm::{EngineView, GameVarsBlock, USER_VAR_COUNT};

const POLL: Duration = Duration::from_millis(50);
const DEFAULT_IDLE_LIMIT: Duration = Duration::from_secs(30);

/// Map tics between item pickups.
pub const ITEM_INTERVAL: u32 = 7;

/// Why a scripted run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineExit {
    /// The controller sent CLOSE and it was acknowledged.
    Closed,
    /// The controller sent ERROR.
    Interrupted,
    /// The script reported an error.
    Failed,
    /// Nothing arrived within the idle limit, or the supervisor gave up.
    Abandoned,
}

pub struct ScriptedEngine<C, V> {
    channel: C,
    view: V,
    args: EngineArgs,
    vars: GameVarsBlock,
    pending: Vec<String>,
    idle_limit: Duration,
    supervisor: Option<fn() -> bool>,
}

impl<C: HandshakeChannel, V: EngineView> ScriptedEngine<C, V> {
    pub fn new(channel: C, view: V, args: EngineArgs) -> Self {
        let vars = initial_vars(&args);
        Self {
            channel,
            view,
            args,
            vars,
            pending: Vec::new(),
            idle_limit: DEFAULT_IDLE_LIMIT,
            supervisor: None,
        }
    }

    pub fn with_idle_limit(mut self, limit: Duration) -> Self {
        self.idle_limit = limit;
        self
    }

    /// Poll `alive` while idle; the run is abandoned once it returns false.
    pub fn with_supervisor(mut self, alive: fn() -> bool) -> Self {
        self.supervisor = Some(alive);
        self
    }

    pub fn run(mut self) -> Result<EngineExit> {
        self.render();
        self.view.publish(&self.vars);
        self.channel.send(&Message::signal(MessageCode::DoomReady))?;
        info!(
            "scripted engine {} ready on {}",
            self.args.instance_id, self.args.map
        );
        let mut last_seen = Instant::now();
        loop {
            let Some(received) = self.channel.receive(POLL)? else {
                let orphaned = self.supervisor.is_some_and(|alive| !alive());
                if orphaned || last_seen.elapsed() >= self.idle_limit {
                    warn!("controller went away at tic {}", self.vars.game_tic);
                    return Ok(EngineExit::Abandoned);
                }
                continue;
            };
            last_seen = Instant::now();
            match received.message.code() {
                MessageCode::Ready => debug!("controller acknowledged ready"),
                MessageCode::Tic => {
                    if let Some(exit) = self.serve_tic()? {
                        return Ok(exit);
                    }
                }
                MessageCode::Command => {
                    if let Some(text) = received.message.text() {
                        self.pending.push(text.to_string());
                    }
                }
                MessageCode::Close => {
                    let _ = self.channel.try_send(&Message::signal(MessageCode::DoomClose));
                    info!("scripted engine closed at tic {}", self.vars.game_tic);
                    return Ok(EngineExit::Closed);
                }
                MessageCode::Error => return Ok(EngineExit::Interrupted),
                other => warn!("scripted engine ignoring {other}"),
            }
        }
    }

    fn serve_tic(&mut self) -> Result<Option<EngineExit>> {
        let next = self.vars.game_tic.saturating_add(1);
        let script = self.args.script;
        if script.error_tic == Some(next) {
            self.channel.send(&Message::signal(MessageCode::DoomError))?;
            return Ok(Some(EngineExit::Failed));
        }
        if script.hang_tic.is_some_and(|t| next >= t) {
            debug!("not answering tic {next}");
            return Ok(None);
        }
        for command in std::mem::take(&mut self.pending) {
            self.apply(&command);
        }
        self.step();
        self.render();
        self.view.publish(&self.vars);
        self.channel.send(&Message::signal(MessageCode::DoomTic))?;
        Ok(None)
    }

    fn apply(&mut self, command: &str) {
        let mut words = command.split_whitespace();
        match (words.next(), words.next()) {
            (Some("map"), Some(map)) => self.load_map(map, false),
            (Some("newgame"), Some(map)) => self.load_map(map, true),
            _ => debug!("scripted engine ignoring command `{command}`"),
        }
    }

    fn load_map(&mut self, map: &str, new_game: bool) {
        let v = &mut self.vars;
        v.map_start_tic = v.game_tic.saturating_add(1);
        v.map_tic = 0;
        v.map_reward = 0;
        v.map_user_vars = [0; USER_VAR_COUNT];
        v.map_kill_count = 0;
        v.map_item_count = 0;
        v.map_secret_count = 0;
        v.map_end = 0;
        v.player_dead = 0;
        v.player_health = 100;
        v.player_kill_count = 0;
        v.player_item_count = 0;
        v.player_secret_count = 0;
        if new_game {
            let fresh = initial_vars(&self.args);
            v.player_frag_count = 0;
            v.player_armor = fresh.player_armor;
            v.player_selected_weapon = fresh.player_selected_weapon;
            v.player_selected_weapon_ammo = fresh.player_selected_weapon_ammo;
            v.player_ammo = fresh.player_ammo;
            v.player_weapon = fresh.player_weapon;
            v.player_key = fresh.player_key;
        }
        debug!("loaded {map} for tic {}", v.map_start_tic);
        self.args.map = map.to_string();
    }

    fn step(&mut self) {
        let input = self.view.input();
        let script = self.args.script;
        let v = &mut self.vars;
        v.game_tic = v.game_tic.saturating_add(1);
        v.map_tic = v.map_tic.saturating_add(1);
        if v.player_dead == 0 && v.map_end == 0 {
            if input.is_pressed(Button::MoveForward) {
                v.map_user_vars[0] += 1;
            }
            if input.is_pressed(Button::MoveBack) {
                v.map_user_vars[0] -= 1;
            }
            if input.is_pressed(Button::Attack) {
                v.map_kill_count += 1;
                v.player_kill_count += 1;
            }
            if v.map_tic % ITEM_INTERVAL == 0 {
                v.map_item_count += 1;
                v.player_item_count += 1;
                v.player_armor += 1;
            }
            v.map_reward = v.map_user_vars[0];
        }
        if script.death_tic == Some(v.map_tic) {
            v.player_dead = 1;
            v.player_health = 0;
        }
        if script.map_end_tic == Some(v.map_tic) {
            v.map_end = 1;
        }
    }

    fn render(&mut self) {
        let shade = self.vars.game_tic as u8;
        self.view.screen_mut().fill(shade);
    }
}

fn initial_vars(args: &EngineArgs) -> GameVarsBlock {
    let seed = args.seed.unwrap_or_default();
    let mut vars = GameVarsBlock {
        game_seed: seed,
        game_static_seed: seed,
        screen_width: args.screen.width,
        screen_height: args.screen.height,
        screen_pitch: args.screen.pitch() as u64,
        screen_size: args.screen.size() as u64,
        screen_format: args.screen.format.id(),
        player_on_ground: 1,
        player_health: 100,
        player_selected_weapon: 2,
        player_selected_weapon_ammo: 50,
        ..GameVarsBlock::default()
    };
    vars.player_ammo[1] = 50;
    vars.player_weapon[1] = 1;
    vars.player_weapon[2] = 1;
    vars
}

/// A [`ScriptedEngine`] run on a thread of the current process, managed
/// through the same trait as a real engine process.
pub struct InProcessEngine<C, V> {
    engine: Option<ScriptedEngine<C, V>>,
    worker: Option<JoinHandle<Result<EngineExit>>>,
}

impl<C, V> InProcessEngine<C, V>
where
    C: HandshakeChannel + Send + 'static,
    V: EngineView + Send + 'static,
{
    pub fn new(channel: C, view: V, args: EngineArgs) -> Self {
        Self {
            engine: Some(ScriptedEngine::new(channel, view, args)),
            worker: None,
        }
    }
}

fn thread_failure(reason: impl Into<String>) -> ControllerError {
    ControllerError::LaunchFailure {
        path: PathBuf::from("<in-process>"),
        reason: reason.into(),
    }
}

impl<C, V> Liveness for InProcessEngine<C, V> {
    fn is_alive(&mut self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }
}

impl<C, V> EngineProcess for InProcessEngine<C, V>
where
    C: HandshakeChannel + Send + 'static,
    V: EngineView + Send + 'static,
{
    fn launch(&mut self) -> Result<()> {
        let engine = self
            .engine
            .take()
            .ok_or_else(|| thread_failure("engine already launched"))?;
        let worker = thread::Builder::new()
            .name("scripted-engine".into())
            .spawn(move || engine.run())
            .map_err(|e| thread_failure(e.to_string()))?;
        self.worker = Some(worker);
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        None
    }

    fn terminate(&mut self, grace: Duration) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let deadline = Instant::now() + grace;
        while !worker.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if !worker.is_finished() {
            warn!("scripted engine still running, detaching");
            return;
        }
        match worker.join() {
            Ok(Ok(exit)) => debug!("scripted engine exited: {exit:?}"),
            Ok(Err(e)) => warn!("scripted engine failed: {e}"),
            Err(_) => warn!("scripted engine panicked"),
        }
    }
}
