// CLASSIFICATION: COMMUNITY
// Filename: queue.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Named bounded message queue living in a shared memory file.
//!
//! Layout: a [`QueueHeader`] followed by `capacity` [`Slot`]s. Slots carry a
//! sequence number so producers in either process can enqueue without a
//! lock; a producer that dies mid-write only stalls that slot.

use std::fs::{self, OpenOptions};
use std::mem::size_of;
use std::path::{Path, PathBuf};
use std::ptr::{self, addr_of, addr_of_mut, NonNull};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use log::{debug, warn};
use memmap2::MmapMut;

use super::message::{Message, Received, MESSAGE_SIZE};
use crate::error::{ControllerError, Result};

/// Messages held by one queue.
pub const QUEUE_CAPACITY: u32 = 32;

const QUEUE_MAGIC: u32 = 0x444d_5131; // "DMQ1"

#[repr(C)]
struct QueueHeader {
    magic: u32,
    capacity: u32,
    message_size: u32,
    _reserved: u32,
    enqueue_pos: AtomicU32,
    dequeue_pos: AtomicU32,
}

#[repr(C)]
struct Slot {
    sequence: AtomicU32,
    priority: u32,
    payload: [u8; MESSAGE_SIZE],
}

fn queue_len(capacity: u32) -> usize {
    size_of::<QueueHeader>() + size_of::<Slot>() * capacity as usize
}

/// Escalating wait used by the blocking operations.
pub(crate) struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6;
    const YIELD_LIMIT: u32 = 10;
    const MAX_SLEEP: Duration = Duration::from_millis(2);

    pub(crate) fn new() -> Self {
        Self { step: 0 }
    }

    /// Wait a little, never past `deadline`.
    pub(crate) fn snooze(&mut self, deadline: Option<Instant>) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..(1 << self.step) {
                std::hint::spin_loop();
            }
        } else if self.step <= Self::YIELD_LIMIT {
            std::thread::yield_now();
        } else {
            let shift = (self.step - Self::YIELD_LIMIT).min(6);
            let mut nap = (Duration::from_micros(50) * (1 << shift)).min(Self::MAX_SLEEP);
            if let Some(deadline) = deadline {
                nap = nap.min(deadline.saturating_duration_since(Instant::now()));
            }
            std::thread::sleep(nap);
        }
        self.step = self.step.saturating_add(1);
    }
}

/// One direction of the handshake channel.
pub struct MessageQueue {
    name: String,
    path: PathBuf,
    map: Option<MmapMut>,
    base: NonNull<u8>,
    capacity: u32,
    owner: bool,
}

// SAFETY: the mapping is owned by the queue and every access to shared state
// goes through atomics or slot ownership obtained from them.
unsafe impl Send for MessageQueue {}

impl MessageQueue {
    /// Create (or truncate) the named queue in `dir`. The creator unlinks it
    /// on close.
    pub fn create(dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(name);
        let len = queue_len(QUEUE_CAPACITY);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| mapping_failure(name, e))?;
        file.set_len(len as u64).map_err(|e| {
            let _ = fs::remove_file(&path);
            mapping_failure(name, e)
        })?;
        // SAFETY: the file was just sized to `len` and stays open for the
        // lifetime of the mapping.
        let mut map = unsafe { MmapMut::map_mut(&file) }.map_err(|e| {
            let _ = fs::remove_file(&path);
            mapping_failure(name, e)
        })?;
        let base = NonNull::new(map.as_mut_ptr()).ok_or_else(|| ControllerError::MappingFailure {
            name: name.to_string(),
            reason: "null mapping".into(),
        })?;
        let queue = Self {
            name: name.to_string(),
            path,
            map: Some(map),
            base,
            capacity: QUEUE_CAPACITY,
            owner: true,
        };
        queue.initialize();
        debug!("created queue {} ({} bytes)", queue.name, len);
        Ok(queue)
    }

    /// Attach to a queue created by the other side.
    pub fn open(dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| mapping_failure(name, e))?;
        let len = file.metadata().map_err(|e| mapping_failure(name, e))?.len();
        if len < size_of::<QueueHeader>() as u64 {
            return Err(ControllerError::MappingFailure {
                name: name.to_string(),
                reason: format!("file is {len} bytes, too small for a queue header"),
            });
        }
        // SAFETY: the creator sized the file before launching the engine.
        let mut map = unsafe { MmapMut::map_mut(&file) }.map_err(|e| mapping_failure(name, e))?;
        let base = NonNull::new(map.as_mut_ptr()).ok_or_else(|| ControllerError::MappingFailure {
            name: name.to_string(),
            reason: "null mapping".into(),
        })?;
        let mut queue = Self {
            name: name.to_string(),
            path,
            map: Some(map),
            base,
            capacity: 0,
            owner: false,
        };
        let header = queue.header();
        if header.magic != QUEUE_MAGIC || header.message_size as usize != MESSAGE_SIZE {
            return Err(ControllerError::MappingFailure {
                name: name.to_string(),
                reason: "queue header does not match this protocol version".into(),
            });
        }
        let capacity = header.capacity;
        if !capacity.is_power_of_two() || queue_len(capacity) as u64 != len {
            return Err(ControllerError::MappingFailure {
                name: name.to_string(),
                reason: format!("queue of {capacity} slots does not fit {len} bytes"),
            });
        }
        queue.capacity = capacity;
        Ok(queue)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.map.is_none()
    }

    fn initialize(&self) {
        let header = self.base.as_ptr() as *mut QueueHeader;
        // SAFETY: the mapping is private to this process until the engine is
        // launched, and is large enough for the header and every slot.
        unsafe {
            ptr::write(
                header,
                QueueHeader {
                    magic: 0,
                    capacity: self.capacity,
                    message_size: MESSAGE_SIZE as u32,
                    _reserved: 0,
                    enqueue_pos: AtomicU32::new(0),
                    dequeue_pos: AtomicU32::new(0),
                },
            );
            for index in 0..self.capacity {
                let slot = self.slot(index);
                ptr::write(addr_of_mut!((*slot).sequence), AtomicU32::new(index));
                ptr::write(addr_of_mut!((*slot).priority), 0);
                ptr::write(addr_of_mut!((*slot).payload), [0u8; MESSAGE_SIZE]);
            }
            (*header).magic = QUEUE_MAGIC;
        }
    }

    fn header(&self) -> &QueueHeader {
        // SAFETY: the mapping outlives `self` and starts with a header.
        unsafe { &*(self.base.as_ptr() as *const QueueHeader) }
    }

    fn slot(&self, index: u32) -> *mut Slot {
        let offset =
            size_of::<QueueHeader>() + size_of::<Slot>() * (index % self.capacity) as usize;
        // SAFETY: `index % capacity` keeps the offset inside the mapping.
        unsafe { self.base.as_ptr().add(offset) as *mut Slot }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.map.is_none() {
            return Err(ControllerError::NotRunning);
        }
        Ok(())
    }

    /// Enqueue without waiting. Returns `false` when the queue is full.
    fn push(&self, message: &Message, priority: u32) -> bool {
        let header = self.header();
        let raw = message.encode();
        let mut pos = header.enqueue_pos.load(Ordering::Relaxed);
        loop {
            let slot = self.slot(pos);
            // SAFETY: slot points into the live mapping.
            let seq = unsafe { (*slot).sequence.load(Ordering::Acquire) };
            let diff = seq.wrapping_sub(pos) as i32;
            if diff == 0 {
                match header.enqueue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: winning the CAS grants exclusive use of the
                        // slot until its sequence is published.
                        unsafe {
                            ptr::write(addr_of_mut!((*slot).priority), priority);
                            ptr::copy_nonoverlapping(
                                raw.as_ptr(),
                                addr_of_mut!((*slot).payload) as *mut u8,
                                MESSAGE_SIZE,
                            );
                            (*slot).sequence.store(pos.wrapping_add(1), Ordering::Release);
                        }
                        return true;
                    }
                    Err(actual) => pos = actual,
                }
            } else if diff < 0 {
                return false;
            } else {
                pos = header.enqueue_pos.load(Ordering::Relaxed);
            }
        }
    }

    /// Dequeue without waiting.
    fn pop(&self) -> Result<Option<Received>> {
        let header = self.header();
        let mut pos = header.dequeue_pos.load(Ordering::Relaxed);
        loop {
            let slot = self.slot(pos);
            // SAFETY: slot points into the live mapping.
            let seq = unsafe { (*slot).sequence.load(Ordering::Acquire) };
            let diff = seq.wrapping_sub(pos.wrapping_add(1)) as i32;
            if diff == 0 {
                match header.dequeue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let mut raw = [0u8; MESSAGE_SIZE];
                        // SAFETY: the published sequence hands the slot to
                        // this consumer until it is released below.
                        let priority = unsafe {
                            ptr::copy_nonoverlapping(
                                addr_of!((*slot).payload) as *const u8,
                                raw.as_mut_ptr(),
                                MESSAGE_SIZE,
                            );
                            let priority = ptr::read(addr_of!((*slot).priority));
                            (*slot)
                                .sequence
                                .store(pos.wrapping_add(self.capacity), Ordering::Release);
                            priority
                        };
                        let message = Message::decode(&raw)?;
                        return Ok(Some(Received { message, priority }));
                    }
                    Err(actual) => pos = actual,
                }
            } else if diff < 0 {
                return Ok(None);
            } else {
                pos = header.dequeue_pos.load(Ordering::Relaxed);
            }
        }
    }

    pub fn try_send(&self, message: &Message) -> Result<()> {
        self.ensure_open()?;
        if self.push(message, 0) {
            Ok(())
        } else {
            Err(ControllerError::ChannelFull {
                queue: self.name.clone(),
            })
        }
    }

    /// Enqueue, waiting up to `bound` for a free slot.
    pub fn send(&self, message: &Message, bound: Duration) -> Result<()> {
        self.ensure_open()?;
        let deadline = Instant::now() + bound;
        let mut backoff = Backoff::new();
        loop {
            if self.push(message, 0) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!("queue {} stayed full for {:?}", self.name, bound);
                return Err(ControllerError::ChannelFull {
                    queue: self.name.clone(),
                });
            }
            backoff.snooze(Some(deadline));
        }
    }

    pub fn try_receive(&self) -> Result<Option<Received>> {
        self.ensure_open()?;
        self.pop()
    }

    /// Dequeue, waiting up to `timeout`. `Ok(None)` means the wait elapsed.
    pub fn receive(&self, timeout: Duration) -> Result<Option<Received>> {
        self.ensure_open()?;
        let deadline = Instant::now() + timeout;
        let mut backoff = Backoff::new();
        loop {
            if let Some(received) = self.pop()? {
                return Ok(Some(received));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            backoff.snooze(Some(deadline));
        }
    }

    /// Unmap, and unlink when this side created the queue. Idempotent.
    pub fn close(&mut self) {
        if self.map.take().is_none() {
            return;
        }
        if self.owner {
            match fs::remove_file(&self.path) {
                Ok(()) => debug!("removed queue {}", self.name),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("failed to remove queue {}: {}", self.name, e),
            }
        }
    }
}

impl Drop for MessageQueue {
    fn drop(&mut self) {
        self.close();
    }
}

fn mapping_failure(name: &str, err: std::io::Error) -> ControllerError {
    ControllerError::MappingFailure {
        name: name.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::MessageCode;
    use tempfile::tempdir;

    #[test]
    fn fifo_across_two_mappings() {
        let dir = tempdir().unwrap();
        let writer = MessageQueue::create(dir.path(), "q-fifo").unwrap();
        let reader = MessageQueue::open(dir.path(), "q-fifo").unwrap();
        assert_eq!(reader.name(), "q-fifo");
        assert_eq!(reader.capacity(), QUEUE_CAPACITY);
        writer.try_send(&Message::signal(MessageCode::Tic)).unwrap();
        writer.try_send(&Message::command("map map01").unwrap()).unwrap();
        assert_eq!(
            reader.try_receive().unwrap().unwrap().message.code(),
            MessageCode::Tic
        );
        let second = reader.try_receive().unwrap().unwrap();
        assert_eq!(second.message.text(), Some("map map01"));
        assert_eq!(second.priority, 0);
        assert!(reader.try_receive().unwrap().is_none());
    }

    #[test]
    fn full_queue_reports_channel_full_and_recovers() {
        let dir = tempdir().unwrap();
        let queue = MessageQueue::create(dir.path(), "q-full").unwrap();
        for _ in 0..QUEUE_CAPACITY {
            queue.try_send(&Message::signal(MessageCode::Tic)).unwrap();
        }
        assert!(matches!(
            queue.try_send(&Message::signal(MessageCode::Tic)),
            Err(ControllerError::ChannelFull { .. })
        ));
        assert!(matches!(
            queue.send(&Message::signal(MessageCode::Tic), Duration::from_millis(10)),
            Err(ControllerError::ChannelFull { .. })
        ));
        queue.try_receive().unwrap().unwrap();
        queue.try_send(&Message::signal(MessageCode::Close)).unwrap();
        let mut last = None;
        while let Some(received) = queue.try_receive().unwrap() {
            last = Some(received.message.code());
        }
        assert_eq!(last, Some(MessageCode::Close));
    }

    #[test]
    fn receive_times_out_on_empty_queue() {
        let dir = tempdir().unwrap();
        let queue = MessageQueue::create(dir.path(), "q-empty").unwrap();
        let started = Instant::now();
        assert!(queue.receive(Duration::from_millis(20)).unwrap().is_none());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn owner_close_unlinks_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut queue = MessageQueue::create(dir.path(), "q-close").unwrap();
        let mut peer = MessageQueue::open(dir.path(), "q-close").unwrap();
        peer.close();
        assert!(peer.is_closed());
        assert!(dir.path().join("q-close").exists());
        assert!(!queue.is_closed());
        queue.close();
        queue.close();
        assert!(queue.is_closed());
        assert!(!dir.path().join("q-close").exists());
        assert!(matches!(
            queue.try_send(&Message::signal(MessageCode::Tic)),
            Err(ControllerError::NotRunning)
        ));
    }

    #[test]
    fn open_rejects_foreign_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("q-junk"), vec![7u8; 4096]).unwrap();
        assert!(matches!(
            MessageQueue::open(dir.path(), "q-junk"),
            Err(ControllerError::MappingFailure { .. })
        ));
    }
}
