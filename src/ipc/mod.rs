// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Control plane: handshake messages and the bounded channels carrying them.

use std::time::Duration;

use crate::error::Result;

pub mod handshake;
pub mod loopback;
pub mod message;
pub mod queue;

pub use handshake::{Handshake, InterruptHandle, Side};
pub use loopback::{loopback_pair, LoopbackChannel};
pub use message::{
    Message, MessageCode, Received, COMMAND_FIELD_LEN, MAX_COMMAND_LEN, MESSAGE_SIZE,
};
pub use queue::{MessageQueue, QUEUE_CAPACITY};

/// One endpoint of a bidirectional, bounded message channel.
///
/// Sends go to the peer, receives come from the peer. Implementations are
/// used by a single thread at a time.
pub trait HandshakeChannel {
    /// Enqueue, blocking up to the channel's send bound. Fails with
    /// `ChannelFull` once the bound is exhausted.
    fn send(&mut self, message: &Message) -> Result<()>;

    /// Enqueue only if a slot is free right now.
    fn try_send(&mut self, message: &Message) -> Result<()>;

    /// Wait up to `timeout` for the next message. `Ok(None)` on timeout.
    fn receive(&mut self, timeout: Duration) -> Result<Option<Received>>;

    fn try_receive(&mut self) -> Result<Option<Received>>;

    /// Release both directions. Idempotent.
    fn close(&mut self);
}
