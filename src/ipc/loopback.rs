// CLASSIFICATION: COMMUNITY
// Filename: loopback.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! In-process channel pair with the same bounded semantics as the shared
//! memory queues. Used to run both protocol sides inside one process.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::message::{Message, Received};
use super::queue::QUEUE_CAPACITY;
use super::HandshakeChannel;
use crate::error::{ControllerError, Result};

struct Lane {
    name: &'static str,
    queue: Mutex<VecDeque<Message>>,
    changed: Condvar,
}

impl Lane {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            queue: Mutex::new(VecDeque::with_capacity(QUEUE_CAPACITY as usize)),
            changed: Condvar::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Message>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn full(&self) -> ControllerError {
        ControllerError::ChannelFull {
            queue: self.name.to_string(),
        }
    }
}

/// One end of an in-memory channel pair.
pub struct LoopbackChannel {
    inbox: Arc<Lane>,
    outbox: Arc<Lane>,
    send_bound: Duration,
    closed: bool,
}

/// Build a connected `(controller, engine)` pair.
pub fn loopback_pair(send_bound: Duration) -> (LoopbackChannel, LoopbackChannel) {
    let to_engine = Lane::new("loopback-engine");
    let to_controller = Lane::new("loopback-ctrl");
    (
        LoopbackChannel {
            inbox: Arc::clone(&to_controller),
            outbox: Arc::clone(&to_engine),
            send_bound,
            closed: false,
        },
        LoopbackChannel {
            inbox: to_engine,
            outbox: to_controller,
            send_bound,
            closed: false,
        },
    )
}

impl LoopbackChannel {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(ControllerError::NotRunning)
        } else {
            Ok(())
        }
    }

    /// Number of messages waiting in this end's inbox.
    pub fn pending(&self) -> usize {
        self.inbox.lock().len()
    }
}

impl HandshakeChannel for LoopbackChannel {
    fn send(&mut self, message: &Message) -> Result<()> {
        self.ensure_open()?;
        let deadline = Instant::now() + self.send_bound;
        let mut queue = self.outbox.lock();
        while queue.len() >= QUEUE_CAPACITY as usize {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(self.outbox.full());
            }
            queue = self
                .outbox
                .changed
                .wait_timeout(queue, left)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        queue.push_back(message.clone());
        self.outbox.changed.notify_all();
        Ok(())
    }

    fn try_send(&mut self, message: &Message) -> Result<()> {
        self.ensure_open()?;
        let mut queue = self.outbox.lock();
        if queue.len() >= QUEUE_CAPACITY as usize {
            return Err(self.outbox.full());
        }
        queue.push_back(message.clone());
        self.outbox.changed.notify_all();
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Received>> {
        self.ensure_open()?;
        let deadline = Instant::now() + timeout;
        let mut queue = self.inbox.lock();
        loop {
            if let Some(message) = queue.pop_front() {
                self.inbox.changed.notify_all();
                return Ok(Some(Received {
                    message,
                    priority: 0,
                }));
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Ok(None);
            }
            queue = self
                .inbox
                .changed
                .wait_timeout(queue, left)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn try_receive(&mut self) -> Result<Option<Received>> {
        self.ensure_open()?;
        let message = self.inbox.lock().pop_front();
        if message.is_some() {
            self.inbox.changed.notify_all();
        }
        Ok(message.map(|message| Received {
            message,
            priority: 0,
        }))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
