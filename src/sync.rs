// CLASSIFICATION: COMMUNITY
// Filename: sync.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Lock-step synchronization with the engine.
//!
//! ```text
//! Uninitialized -> Launching -> AwaitingReady -> Idle <-> AwaitingTic
//!                                                 |
//!                                                 v
//!                                        Closing -> Closed
//! any non-terminal state -> Errored
//! ```
//!
//! Waits are cut into short slices so the liveness probe runs between
//! receives and a dead engine is noticed before the full timeout.

use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::config::Timeouts;
use crate::error::{ControllerError, Result};
use crate::ipc::{HandshakeChannel, Message, MessageCode};
use crate::process::Liveness;

/// Longest single receive before the liveness probe runs again.
pub const LIVENESS_SLICE: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SyncState {
    Uninitialized,
    Launching,
    AwaitingReady,
    Idle,
    AwaitingTic,
    Closing,
    Closed,
    Errored,
}

impl SyncState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }
}

/// Drives the handshake protocol over a [`HandshakeChannel`].
pub struct Synchronizer<C> {
    channel: C,
    state: SyncState,
    timeouts: Timeouts,
    tics: u64,
}

impl<C: HandshakeChannel> Synchronizer<C> {
    pub fn new(channel: C, timeouts: Timeouts) -> Self {
        Self {
            channel,
            state: SyncState::Uninitialized,
            timeouts,
            tics: 0,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// True while tic cycles are permitted.
    pub fn is_running(&self) -> bool {
        matches!(self.state, SyncState::Idle | SyncState::AwaitingTic)
    }

    /// Completed tic cycles.
    pub fn tics(&self) -> u64 {
        self.tics
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    fn expect_state(&self, op: &'static str, allowed: &[SyncState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ControllerError::InvalidState {
                op,
                state: self.state,
            })
        }
    }

    fn transition(&mut self, next: SyncState) {
        debug!("sync {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    pub fn begin_launch(&mut self) -> Result<()> {
        self.expect_state("begin_launch", &[SyncState::Uninitialized])?;
        self.transition(SyncState::Launching);
        Ok(())
    }

    pub fn mark_spawned(&mut self) -> Result<()> {
        self.expect_state("mark_spawned", &[SyncState::Launching])?;
        self.transition(SyncState::AwaitingReady);
        Ok(())
    }

    /// Move to `Errored`, tell the engine on a best-effort basis and hand
    /// the error back for propagation.
    pub fn fail(&mut self, err: ControllerError) -> ControllerError {
        if !self.state.is_terminal() {
            error!("session failed in {:?}: {}", self.state, err);
            let _ = self.channel.try_send(&Message::signal(MessageCode::Error));
            self.transition(SyncState::Errored);
        }
        err
    }

    /// Wait for the engine's READY and acknowledge it.
    pub fn await_ready(&mut self, probe: &mut impl Liveness) -> Result<()> {
        self.expect_state("await_ready", &[SyncState::AwaitingReady])?;
        self.wait_for(MessageCode::DoomReady, self.timeouts.startup(), probe)?;
        if let Err(e) = self.channel.send(&Message::signal(MessageCode::Ready)) {
            return Err(self.fail(e));
        }
        self.transition(SyncState::Idle);
        info!("engine ready");
        Ok(())
    }

    /// Request one tic and wait for its completion.
    pub fn tic(&mut self, probe: &mut impl Liveness) -> Result<()> {
        self.ensure_running("tic")?;
        self.expect_state("tic", &[SyncState::Idle])?;
        self.poll_errors()?;
        if let Err(e) = self.channel.send(&Message::signal(MessageCode::Tic)) {
            return Err(self.fail(e));
        }
        self.transition(SyncState::AwaitingTic);
        self.wait_tic(probe)
    }

    /// Blocking half of [`Synchronizer::tic`], for a TIC already sent.
    pub fn wait_tic(&mut self, probe: &mut impl Liveness) -> Result<()> {
        self.ensure_running("wait_tic")?;
        self.expect_state("wait_tic", &[SyncState::AwaitingTic])?;
        self.wait_for(MessageCode::DoomTic, self.timeouts.tic(), probe)?;
        self.tics += 1;
        self.transition(SyncState::Idle);
        Ok(())
    }

    /// Drain pending engine messages without blocking. An asynchronous
    /// DOOM_ERROR or DOOM_CLOSE ends the session.
    pub fn poll_errors(&mut self) -> Result<()> {
        loop {
            let received = match self.channel.try_receive() {
                Ok(Some(received)) => received,
                Ok(None) => return Ok(()),
                Err(e) => return Err(self.fail(e)),
            };
            match received.message.code() {
                MessageCode::DoomError => {
                    return Err(self.fail(ControllerError::EngineCrash(
                        "engine reported an error".into(),
                    )))
                }
                MessageCode::DoomClose => {
                    return Err(self.fail(ControllerError::EngineCrash(
                        "engine closed unexpectedly".into(),
                    )))
                }
                other => warn!("discarding stray {} from engine", other),
            }
        }
    }

    /// Send a console command without advancing the tic state.
    pub fn send_command(&mut self, text: &str) -> Result<()> {
        self.ensure_running("send_command")?;
        let message = Message::command(text)?;
        self.channel.send(&message)?;
        debug!("sent command `{}`", text);
        Ok(())
    }

    /// Send CLOSE, wait briefly for the acknowledgement and release the
    /// channel. Idempotent.
    pub fn close(&mut self, probe: &mut impl Liveness) {
        if self.state == SyncState::Closed {
            return;
        }
        let graceful = self.is_running();
        self.transition(SyncState::Closing);
        if graceful {
            match self.channel.try_send(&Message::signal(MessageCode::Close)) {
                Ok(()) => self.await_close_ack(probe),
                Err(e) => warn!("could not send CLOSE: {}", e),
            }
        }
        self.channel.close();
        self.transition(SyncState::Closed);
    }

    fn await_close_ack(&mut self, probe: &mut impl Liveness) {
        let deadline = Instant::now() + self.timeouts.close_ack();
        while Instant::now() < deadline {
            let slice = deadline
                .saturating_duration_since(Instant::now())
                .min(LIVENESS_SLICE);
            match self.channel.receive(slice) {
                Ok(Some(r)) if r.message.code() == MessageCode::DoomClose => {
                    debug!("engine acknowledged CLOSE");
                    return;
                }
                Ok(Some(r)) => debug!("ignoring {} while closing", r.message.code()),
                Ok(None) if !probe.is_alive() => return,
                Ok(None) => {}
                Err(e) => {
                    warn!("receive failed while closing: {}", e);
                    return;
                }
            }
        }
        warn!("engine did not acknowledge CLOSE");
    }

    fn ensure_running(&self, op: &'static str) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        match self.state {
            SyncState::Errored | SyncState::Closed | SyncState::Closing => {
                Err(ControllerError::NotRunning)
            }
            state => Err(ControllerError::InvalidState { op, state }),
        }
    }

    fn wait_for(
        &mut self,
        expected: MessageCode,
        limit: Duration,
        probe: &mut impl Liveness,
    ) -> Result<()> {
        let deadline = Instant::now() + limit;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(self.fail(ControllerError::HandshakeTimeout {
                    expected,
                    waited: limit,
                }));
            }
            let received = match self.channel.receive(left.min(LIVENESS_SLICE)) {
                Ok(received) => received,
                Err(e) => return Err(self.fail(e)),
            };
            let Some(received) = received else {
                if !probe.is_alive() {
                    return Err(self.fail(ControllerError::EngineCrash(format!(
                        "engine exited while waiting for {expected}"
                    ))));
                }
                continue;
            };
            match received.message.code() {
                code if code == expected => return Ok(()),
                MessageCode::DoomError => {
                    return Err(self.fail(ControllerError::EngineCrash(
                        "engine reported an error".into(),
                    )))
                }
                MessageCode::DoomClose => {
                    return Err(self.fail(ControllerError::EngineCrash(
                        "engine closed unexpectedly".into(),
                    )))
                }
                other => warn!("ignoring {} while waiting for {}", other, expected),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::loopback_pair;
    use std::thread;

    struct Alive(bool);

    impl Liveness for Alive {
        fn is_alive(&mut self) -> bool {
            self.0
        }
    }

    fn quick() -> Timeouts {
        Timeouts {
            startup_ms: 200,
            tic_ms: 200,
            close_ack_ms: 100,
            send_ms: 50,
            terminate_grace_ms: 50,
        }
    }

    fn ready_pair() -> (Synchronizer<crate::ipc::LoopbackChannel>, crate::ipc::LoopbackChannel) {
        let (ctrl, mut engine) = loopback_pair(Duration::from_millis(50));
        let mut sync = Synchronizer::new(ctrl, quick());
        sync.begin_launch().unwrap();
        sync.mark_spawned().unwrap();
        engine.send(&Message::signal(MessageCode::DoomReady)).unwrap();
        sync.await_ready(&mut Alive(true)).unwrap();
        let ack = engine.try_receive().unwrap().unwrap();
        assert_eq!(ack.message.code(), MessageCode::Ready);
        (sync, engine)
    }

    #[test]
    fn launch_sequence_reaches_idle() {
        let (sync, _engine) = ready_pair();
        assert_eq!(sync.state(), SyncState::Idle);
        assert!(sync.is_running());
    }

    #[test]
    fn tic_round_trip_returns_to_idle() {
        let (mut sync, mut engine) = ready_pair();
        let responder = thread::spawn(move || {
            for _ in 0..3 {
                let got = engine.receive(Duration::from_secs(1)).unwrap().unwrap();
                assert_eq!(got.message.code(), MessageCode::Tic);
                engine.send(&Message::signal(MessageCode::DoomTic)).unwrap();
            }
            engine
        });
        for _ in 0..3 {
            sync.tic(&mut Alive(true)).unwrap();
        }
        responder.join().unwrap();
        assert_eq!(sync.tics(), 3);
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[test]
    fn missing_ready_times_out_into_errored() {
        let (ctrl, mut engine) = loopback_pair(Duration::from_millis(50));
        let mut sync = Synchronizer::new(ctrl, quick());
        sync.begin_launch().unwrap();
        sync.mark_spawned().unwrap();
        let err = sync.await_ready(&mut Alive(true)).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::HandshakeTimeout {
                expected: MessageCode::DoomReady,
                ..
            }
        ));
        assert_eq!(sync.state(), SyncState::Errored);
        let told = engine.try_receive().unwrap().unwrap();
        assert_eq!(told.message.code(), MessageCode::Error);
    }

    #[test]
    fn error_signal_stops_further_tics() {
        let (mut sync, mut engine) = ready_pair();
        engine.send(&Message::signal(MessageCode::DoomError)).unwrap();
        assert!(matches!(
            sync.tic(&mut Alive(true)),
            Err(ControllerError::EngineCrash(_))
        ));
        assert!(!sync.is_running());
        let started = Instant::now();
        assert!(matches!(
            sync.tic(&mut Alive(true)),
            Err(ControllerError::NotRunning)
        ));
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn dead_engine_is_noticed_before_timeout() {
        let (mut sync, _engine) = ready_pair();
        let started = Instant::now();
        assert!(matches!(
            sync.tic(&mut Alive(false)),
            Err(ControllerError::EngineCrash(_))
        ));
        assert!(started.elapsed() < Duration::from_millis(200));
        assert_eq!(sync.state(), SyncState::Errored);
    }

    #[test]
    fn commands_require_a_running_session() {
        let (ctrl, _engine) = loopback_pair(Duration::from_millis(50));
        let mut sync = Synchronizer::new(ctrl, quick());
        assert!(matches!(
            sync.send_command("map map01"),
            Err(ControllerError::InvalidState { .. })
        ));
        let (mut sync, mut engine) = ready_pair();
        sync.send_command("map map01").unwrap();
        let got = engine.try_receive().unwrap().unwrap();
        assert_eq!(got.message.text(), Some("map map01"));
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[test]
    fn close_is_graceful_and_idempotent() {
        let (mut sync, mut engine) = ready_pair();
        let responder = thread::spawn(move || {
            let got = engine.receive(Duration::from_secs(1)).unwrap().unwrap();
            assert_eq!(got.message.code(), MessageCode::Close);
            engine.send(&Message::signal(MessageCode::DoomClose)).unwrap();
        });
        sync.close(&mut Alive(true));
        responder.join().unwrap();
        assert_eq!(sync.state(), SyncState::Closed);
        sync.close(&mut Alive(true));
        assert_eq!(sync.state(), SyncState::Closed);
        assert!(matches!(
            sync.tic(&mut Alive(true)),
            Err(ControllerError::NotRunning)
        ));
    }
}
