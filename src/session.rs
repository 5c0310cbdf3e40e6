// CLASSIFICATION: COMMUNITY
// Filename: session.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! One engine session: a channel, a state region, an engine process, the
//! synchronizer driving them and the episode policy observing the results.
//!
//! The session is generic over its three backends so the protocol can run
//! against in-memory fakes as well as shared memory and a real process.

use log::{debug, info, warn};

use crate::config::{SessionConfig, Timeouts};
use crate::episode::{EpisodePolicy, RestartReason};
use crate::error::Result;
use crate::ipc::HandshakeChannel;
use crate::process::EngineProcess;
use crate::shm::{GameVarsBlock, InputBlock, StateRegion};
use crate::sync::{SyncState, Synchronizer};

pub struct Session<C, R, P> {
    sync: Synchronizer<C>,
    region: R,
    process: P,
    episode: EpisodePolicy,
    map: String,
    timeouts: Timeouts,
}

impl<C, R, P> Session<C, R, P>
where
    C: HandshakeChannel,
    R: StateRegion,
    P: EngineProcess,
{
    /// Launch the engine and complete the ready handshake.
    ///
    /// On failure every backend is released before the error is returned.
    pub fn start(config: &SessionConfig, channel: C, region: R, process: P) -> Result<Self> {
        let mut session = Self {
            sync: Synchronizer::new(channel, config.timeouts),
            region,
            process,
            episode: EpisodePolicy::new(config.episode),
            map: config.map.clone(),
            timeouts: config.timeouts,
        };
        let neutral = InputBlock::neutral(config.screen.width as i32, config.screen.height as i32);
        match session.handshake(&neutral) {
            Ok(()) => Ok(session),
            Err(e) => {
                session.close();
                Err(e)
            }
        }
    }

    fn handshake(&mut self, input: &InputBlock) -> Result<()> {
        self.region.write_input(input);
        self.sync.begin_launch()?;
        if let Err(e) = self.process.launch() {
            return Err(self.sync.fail(e));
        }
        self.sync.mark_spawned()?;
        self.sync.await_ready(&mut self.process)?;
        self.region.acquire();
        let vars = self.region.game_vars();
        self.episode.begin_map(vars.game_tic.saturating_add(1));
        info!(
            "session started on {} at tic {} (pid {:?})",
            self.map,
            vars.game_tic,
            self.process.pid()
        );
        Ok(())
    }

    /// Advance the engine one tic with `input` applied.
    pub fn tic(&mut self, input: &InputBlock) -> Result<()> {
        self.region.write_input(input);
        self.sync.tic(&mut self.process)?;
        self.region.acquire();
        Ok(())
    }

    /// One tic followed by the restart policy. Returns the reason when the
    /// policy restarted the map.
    pub fn update(&mut self, input: &InputBlock) -> Result<Option<RestartReason>> {
        self.tic(input)?;
        let vars = self.region.game_vars();
        let reason = self.episode.observe(&vars);
        if reason.is_some() {
            self.issue_restart("map", &vars)?;
        }
        Ok(reason)
    }

    fn issue_restart(&mut self, verb: &str, vars: &GameVarsBlock) -> Result<()> {
        self.sync.send_command(&format!("{verb} {}", self.map))?;
        self.episode.note_restart(vars);
        debug!(
            "{verb} {} issued at tic {}, restart #{}",
            self.map,
            vars.game_tic,
            self.episode.restart_count()
        );
        Ok(())
    }

    /// Reload the current map; takes effect on the next tic.
    pub fn restart_map(&mut self) -> Result<()> {
        let vars = self.region.game_vars();
        self.issue_restart("map", &vars)
    }

    /// Start a new game on the configured map, resetting the player too.
    pub fn restart_game(&mut self) -> Result<()> {
        let vars = self.region.game_vars();
        self.issue_restart("newgame", &vars)
    }

    /// Reset the episode bookkeeping without touching the engine.
    pub fn reset_map(&mut self) {
        let vars = self.region.game_vars();
        self.episode.begin_map(vars.game_tic.saturating_add(1));
    }

    pub fn send_command(&mut self, text: &str) -> Result<()> {
        self.sync.send_command(text)
    }

    pub fn is_running(&self) -> bool {
        self.sync.is_running()
    }

    pub fn state(&self) -> SyncState {
        self.sync.state()
    }

    pub fn game_vars(&self) -> GameVarsBlock {
        self.region.game_vars()
    }

    pub fn screen(&self) -> &[u8] {
        self.region.screen()
    }

    pub fn episode(&self) -> &EpisodePolicy {
        &self.episode
    }

    pub fn episode_mut(&mut self) -> &mut EpisodePolicy {
        &mut self.episode
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.pid()
    }

    pub fn channel_mut(&mut self) -> &mut C {
        self.sync.channel_mut()
    }

    /// Best-effort shutdown. Every step runs regardless of earlier ones.
    pub fn close(&mut self) {
        if self.sync.state() == SyncState::Closed {
            return;
        }
        self.sync.close(&mut self.process);
        self.process.terminate(self.timeouts.terminate_grace());
        self.region.close();
        if self.process.is_alive() {
            warn!("engine still alive after close");
        }
        info!(
            "session closed after {} tics, {} map restarts",
            self.sync.tics(),
            self.episode.restart_count()
        );
    }
}
