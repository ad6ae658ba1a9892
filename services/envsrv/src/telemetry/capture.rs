//! In-memory sink that records every published payload

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::time::Instant;

use super::TelemetrySink;
use crate::error::TransportError;

#[derive(Debug, Default)]
struct CaptureState {
    sent: Vec<String>,
    sent_at: Vec<Instant>,
    fail_sends: u32,
    attempts: u64,
}

/// Capturing sink; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    state: Arc<Mutex<CaptureState>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CaptureState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Payloads delivered so far
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Runtime clock reading at each delivery
    pub fn sent_at(&self) -> Vec<Instant> {
        self.lock().sent_at.clone()
    }

    /// Publish attempts, including failed ones
    pub fn attempts(&self) -> u64 {
        self.lock().attempts
    }

    /// Make the next `count` publishes fail
    pub fn fail_next_sends(&self, count: u32) {
        self.lock().fail_sends = count;
    }
}

#[async_trait]
impl TelemetrySink for CaptureSink {
    async fn publish(&mut self, payload: &str) -> Result<usize, TransportError> {
        let mut state = self.lock();
        state.attempts += 1;
        if state.fail_sends > 0 {
            state.fail_sends -= 1;
            return Err(TransportError::Send {
                destination: "capture".to_string(),
                reason: "simulated send failure".to_string(),
            });
        }
        state.sent.push(payload.to_string());
        state.sent_at.push(Instant::now());
        Ok(payload.len())
    }

    fn destination(&self) -> String {
        "capture".to_string()
    }
}
