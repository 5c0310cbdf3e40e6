// CLASSIFICATION: COMMUNITY
// Filename: handshake.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Shared-memory handshake channel: one queue per direction.

use std::time::Duration;

use log::debug;

use super::message::{Message, MessageCode, Received};
use super::queue::MessageQueue;
use super::HandshakeChannel;
use crate::error::Result;
use crate::names::ResourceNames;

/// Which end of the channel this process holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Controller,
    Engine,
}

/// Queue pair namespaced by the session's instance id.
pub struct Handshake {
    side: Side,
    inbox: MessageQueue,
    outbox: MessageQueue,
    send_bound: Duration,
}

impl Handshake {
    /// Create both queues. Called by the controller before launching the
    /// engine; the controller owns and unlinks them.
    pub fn create(names: &ResourceNames, send_bound: Duration) -> Result<Self> {
        let inbox = MessageQueue::create(names.dir(), &names.controller_queue())?;
        let outbox = MessageQueue::create(names.dir(), &names.engine_queue())?;
        debug!("handshake channel ready for instance {}", names.instance_id());
        Ok(Self {
            side: Side::Controller,
            inbox,
            outbox,
            send_bound,
        })
    }

    /// Attach to queues created by the controller.
    pub fn attach(names: &ResourceNames, send_bound: Duration) -> Result<Self> {
        let inbox = MessageQueue::open(names.dir(), &names.engine_queue())?;
        let outbox = MessageQueue::open(names.dir(), &names.controller_queue())?;
        Ok(Self {
            side: Side::Engine,
            inbox,
            outbox,
            send_bound,
        })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Post a message into this side's own inbox without blocking.
    pub fn try_send_self(&mut self, message: &Message) -> Result<()> {
        self.inbox.try_send(message)
    }

    /// Handle able to wake a blocked controller from another thread.
    ///
    /// The handle maps the controller's inbox independently, so it stays
    /// valid until the queue file is unlinked.
    pub fn interrupt_handle(&self, names: &ResourceNames) -> Result<InterruptHandle> {
        let queue_name = match self.side {
            Side::Controller => names.controller_queue(),
            Side::Engine => names.engine_queue(),
        };
        Ok(InterruptHandle {
            names: names.clone(),
            queue_name,
        })
    }
}

impl HandshakeChannel for Handshake {
    fn send(&mut self, message: &Message) -> Result<()> {
        self.outbox.send(message, self.send_bound)
    }

    fn try_send(&mut self, message: &Message) -> Result<()> {
        self.outbox.try_send(message)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Received>> {
        self.inbox.receive(timeout)
    }

    fn try_receive(&mut self) -> Result<Option<Received>> {
        self.inbox.try_receive()
    }

    fn close(&mut self) {
        self.outbox.close();
        self.inbox.close();
    }
}

/// Wakes a controller blocked in a handshake wait by self-posting
/// `DOOM_ERROR` into its inbox.
#[derive(Clone, Debug)]
pub struct InterruptHandle {
    names: ResourceNames,
    queue_name: String,
}

impl InterruptHandle {
    /// Post the interrupt. Fails if the session is already gone or the
    /// inbox is full.
    pub fn interrupt(&self) -> Result<()> {
        let queue = MessageQueue::open(self.names.dir(), &self.queue_name)?;
        queue.try_send(&Message::signal(MessageCode::DoomError))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn names(dir: &std::path::Path) -> ResourceNames {
        ResourceNames::new("doomctl", "hs1", dir).unwrap()
    }

    #[test]
    fn directions_are_swapped_on_attach() {
        let dir = tempdir().unwrap();
        let names = names(dir.path());
        let mut ctrl = Handshake::create(&names, Duration::from_millis(50)).unwrap();
        let mut engine = Handshake::attach(&names, Duration::from_millis(50)).unwrap();
        assert_eq!(engine.side(), Side::Engine);

        ctrl.send(&Message::signal(MessageCode::Tic)).unwrap();
        let got = engine.receive(Duration::from_millis(100)).unwrap().unwrap();
        assert_eq!(got.message.code(), MessageCode::Tic);

        engine.send(&Message::signal(MessageCode::DoomTic)).unwrap();
        let got = ctrl.receive(Duration::from_millis(100)).unwrap().unwrap();
        assert_eq!(got.message.code(), MessageCode::DoomTic);
        assert!(ctrl.try_receive().unwrap().is_none());
    }

    #[test]
    fn self_send_lands_in_own_inbox() {
        let dir = tempdir().unwrap();
        let names = names(dir.path());
        let mut ctrl = Handshake::create(&names, Duration::from_millis(50)).unwrap();
        ctrl.try_send_self(&Message::signal(MessageCode::DoomError)).unwrap();
        assert_eq!(
            ctrl.try_receive().unwrap().unwrap().message.code(),
            MessageCode::DoomError
        );
    }

    #[test]
    fn interrupt_handle_reaches_the_controller() {
        let dir = tempdir().unwrap();
        let names = names(dir.path());
        let mut ctrl = Handshake::create(&names, Duration::from_millis(50)).unwrap();
        let handle = ctrl.interrupt_handle(&names).unwrap();
        std::thread::spawn(move || handle.interrupt().unwrap())
            .join()
            .unwrap();
        let got = ctrl.receive(Duration::from_millis(200)).unwrap().unwrap();
        assert_eq!(got.message.code(), MessageCode::DoomError);

        ctrl.close();
        assert!(names.all_paths().iter().all(|p| !p.exists()));
        let handle = ctrl.interrupt_handle(&names).unwrap();
        assert!(handle.interrupt().is_err());
    }
}
