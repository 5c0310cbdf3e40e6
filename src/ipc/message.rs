// CLASSIFICATION: COMMUNITY
// Filename: message.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Handshake message codes and their fixed 33-byte wire record.
//!
//! The record is a `u8` code followed by a NUL-padded 32-byte command field.
//! Commands are limited to 31 bytes so the engine always reads a terminated
//! string.

use core::fmt;

use crate::error::{ControllerError, Result};

/// Size of the command field on the wire, terminator included.
pub const COMMAND_FIELD_LEN: usize = 32;

/// Longest command accepted by [`Message::command`].
pub const MAX_COMMAND_LEN: usize = COMMAND_FIELD_LEN - 1;

/// Size of one encoded message.
pub const MESSAGE_SIZE: usize = 1 + COMMAND_FIELD_LEN;

/// Bounded command text carried by [`MessageCode::Command`].
pub type CommandText = heapless::String<MAX_COMMAND_LEN>;

/// Signal codes exchanged between controller and engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageCode {
    DoomReady = 10,
    DoomTic = 11,
    DoomClose = 12,
    DoomError = 13,
    Ready = 20,
    Tic = 21,
    Close = 22,
    Error = 23,
    Command = 24,
}

impl MessageCode {
    /// True for codes the engine sends to the controller.
    pub fn from_engine(self) -> bool {
        matches!(
            self,
            Self::DoomReady | Self::DoomTic | Self::DoomClose | Self::DoomError
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DoomReady => "DOOM_READY",
            Self::DoomTic => "DOOM_TIC",
            Self::DoomClose => "DOOM_CLOSE",
            Self::DoomError => "DOOM_ERROR",
            Self::Ready => "READY",
            Self::Tic => "TIC",
            Self::Close => "CLOSE",
            Self::Error => "ERROR",
            Self::Command => "COMMAND",
        }
    }
}

impl TryFrom<u8> for MessageCode {
    type Error = ControllerError;

    fn try_from(raw: u8) -> Result<Self> {
        Ok(match raw {
            10 => Self::DoomReady,
            11 => Self::DoomTic,
            12 => Self::DoomClose,
            13 => Self::DoomError,
            20 => Self::Ready,
            21 => Self::Tic,
            22 => Self::Close,
            23 => Self::Error,
            24 => Self::Command,
            other => return Err(ControllerError::MalformedMessage(other)),
        })
    }
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A bare signal or a signal carrying a console command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    code: MessageCode,
    command: Option<CommandText>,
}

impl Message {
    pub fn signal(code: MessageCode) -> Self {
        Self {
            code,
            command: None,
        }
    }

    /// Build a [`MessageCode::Command`] message.
    ///
    /// Text longer than [`MAX_COMMAND_LEN`] bytes or containing NUL is
    /// rejected before anything reaches a queue.
    pub fn command(text: &str) -> Result<Self> {
        if text.len() > MAX_COMMAND_LEN {
            return Err(ControllerError::CommandTooLong {
                len: text.len(),
                max: MAX_COMMAND_LEN,
            });
        }
        if text.as_bytes().contains(&0) {
            return Err(ControllerError::InvalidCommand);
        }
        let mut bounded = CommandText::new();
        bounded
            .push_str(text)
            .map_err(|_| ControllerError::CommandTooLong {
                len: text.len(),
                max: MAX_COMMAND_LEN,
            })?;
        Ok(Self {
            code: MessageCode::Command,
            command: Some(bounded),
        })
    }

    pub fn code(&self) -> MessageCode {
        self.code
    }

    pub fn text(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn encode(&self) -> [u8; MESSAGE_SIZE] {
        let mut raw = [0u8; MESSAGE_SIZE];
        raw[0] = self.code as u8;
        if let Some(text) = &self.command {
            let bytes = text.as_bytes();
            raw[1..1 + bytes.len()].copy_from_slice(bytes);
        }
        raw
    }

    pub fn decode(raw: &[u8; MESSAGE_SIZE]) -> Result<Self> {
        let code = MessageCode::try_from(raw[0])?;
        if code != MessageCode::Command {
            return Ok(Self::signal(code));
        }
        let field = &raw[1..];
        let end = field
            .iter()
            .position(|b| *b == 0)
            .ok_or(ControllerError::MalformedMessage(raw[0]))?;
        let text = core::str::from_utf8(&field[..end])
            .map_err(|_| ControllerError::MalformedMessage(raw[0]))?;
        Self::command(text)
    }
}

/// A dequeued message with the queue's priority tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Received {
    pub message: Message,
    pub priority: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_at_limit_is_accepted() {
        let text = "x".repeat(MAX_COMMAND_LEN);
        let msg = Message::command(&text).unwrap();
        let raw = msg.encode();
        assert_eq!(raw[MESSAGE_SIZE - 1], 0);
        assert_eq!(Message::decode(&raw).unwrap().text(), Some(text.as_str()));
    }

    #[test]
    fn command_over_limit_is_rejected() {
        let text = "x".repeat(MAX_COMMAND_LEN + 1);
        match Message::command(&text) {
            Err(ControllerError::CommandTooLong { len, max }) => {
                assert_eq!(len, MAX_COMMAND_LEN + 1);
                assert_eq!(max, MAX_COMMAND_LEN);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn nul_in_command_is_rejected() {
        assert!(matches!(
            Message::command("map\0map02"),
            Err(ControllerError::InvalidCommand)
        ));
    }

    #[test]
    fn unknown_code_is_malformed() {
        let mut raw = [0u8; MESSAGE_SIZE];
        raw[0] = 99;
        assert!(matches!(
            Message::decode(&raw),
            Err(ControllerError::MalformedMessage(99))
        ));
    }

    #[test]
    fn signals_ignore_the_command_field() {
        let mut raw = Message::signal(MessageCode::Tic).encode();
        raw[5] = b'z';
        assert_eq!(Message::decode(&raw).unwrap(), Message::signal(MessageCode::Tic));
    }
}
