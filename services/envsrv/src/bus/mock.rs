//! Mock bus for testing
//!
//! Records every bus operation and replays scripted frames and faults, so driver and
//! acquisition logic can be exercised without hardware. The connector is cheap to
//! clone; all clones share the same script and event log.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::{BusChannel, BusConnector};
use crate::error::{BusError, TransferOp};

/// One recorded bus operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Channel open attempted for a path
    Open(String),
    /// Address bind attempted
    Bind(u16),
    /// Write attempted with these bytes
    Write(Vec<u8>),
    /// Read attempted for this many bytes
    Read(usize),
    /// Channel released
    Close,
}

#[derive(Debug, Default)]
struct MockBusState {
    events: Vec<BusEvent>,
    reads: VecDeque<Result<Vec<u8>, String>>,
    default_frame: Option<Vec<u8>>,
    open_channels: usize,
    fail_opens: u32,
    fail_binds: u32,
    fail_writes: u32,
    short_writes: u32,
}

/// Scripted bus connector
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockBusState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockBusState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a frame for the next read; a frame shorter than the read is a short read
    pub fn push_frame(&self, frame: impl Into<Vec<u8>>) {
        self.lock().reads.push_back(Ok(frame.into()));
    }

    /// Queue a failing read
    pub fn push_read_error(&self, reason: impl Into<String>) {
        self.lock().reads.push_back(Err(reason.into()));
    }

    /// Frame returned once the queue is empty
    pub fn set_default_frame(&self, frame: impl Into<Vec<u8>>) {
        self.lock().default_frame = Some(frame.into());
    }

    pub fn fail_next_opens(&self, count: u32) {
        self.lock().fail_opens = count;
    }

    pub fn fail_next_binds(&self, count: u32) {
        self.lock().fail_binds = count;
    }

    pub fn fail_next_writes(&self, count: u32) {
        self.lock().fail_writes = count;
    }

    /// Make the next writes transfer one byte less than requested
    pub fn short_next_writes(&self, count: u32) {
        self.lock().short_writes = count;
    }

    /// Snapshot of the event log
    pub fn events(&self) -> Vec<BusEvent> {
        self.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    /// Channels currently held open
    pub fn open_channels(&self) -> usize {
        self.lock().open_channels
    }
}

impl BusConnector for MockConnector {
    type Channel = MockChannel;

    fn open(&mut self, path: &str) -> Result<MockChannel, BusError> {
        let mut state = self.lock();
        state.events.push(BusEvent::Open(path.to_string()));

        if state.fail_opens > 0 {
            state.fail_opens -= 1;
            return Err(BusError::Unavailable {
                path: path.to_string(),
                reason: "mock open failure".to_string(),
            });
        }

        state.open_channels += 1;
        debug!("Mock bus {} opened", path);
        Ok(MockChannel {
            state: Arc::clone(&self.state),
        })
    }
}

/// Channel handed out by [`MockConnector`]
#[derive(Debug)]
pub struct MockChannel {
    state: Arc<Mutex<MockBusState>>,
}

impl MockChannel {
    fn lock(&self) -> MutexGuard<'_, MockBusState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BusChannel for MockChannel {
    fn bind(&mut self, address: u16) -> Result<(), BusError> {
        let mut state = self.lock();
        state.events.push(BusEvent::Bind(address));

        if state.fail_binds > 0 {
            state.fail_binds -= 1;
            return Err(BusError::AddressNak {
                address,
                reason: "mock bind failure".to_string(),
            });
        }
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, BusError> {
        let mut state = self.lock();
        state.events.push(BusEvent::Write(bytes.to_vec()));

        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(BusError::Io {
                op: TransferOp::Write,
                reason: "mock write failure".to_string(),
            });
        }
        if state.short_writes > 0 {
            state.short_writes -= 1;
            return Ok(bytes.len().saturating_sub(1));
        }
        Ok(bytes.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, BusError> {
        let mut state = self.lock();
        state.events.push(BusEvent::Read(buf.len()));

        let next = match state.reads.pop_front() {
            Some(next) => next,
            None => state
                .default_frame
                .clone()
                .ok_or_else(|| "no scripted frame".to_string()),
        };

        match next {
            Ok(frame) => {
                let count = frame.len().min(buf.len());
                buf[..count].copy_from_slice(&frame[..count]);
                Ok(count)
            },
            Err(reason) => Err(BusError::Io {
                op: TransferOp::Read,
                reason,
            }),
        }
    }
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        let mut state = self.lock();
        state.events.push(BusEvent::Close);
        state.open_channels = state.open_channels.saturating_sub(1);
    }
}
