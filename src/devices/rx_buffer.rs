//! Bounded receive buffer for bytes arriving from a host serial bridge.
//!
//! Bytes are queued until the simulated UART reads them. Once the buffer is
//! full, newly arriving bytes are dropped and counted; queued bytes are never
//! overwritten.

use std::collections::VecDeque;

use tracing::{debug, trace};

pub const DEFAULT_CAPACITY: usize = 50_000;

#[derive(Debug, Clone)]
pub struct RxBuffer {
    bytes: VecDeque<u8>,
    capacity: usize,
    dropped: u64,
}

impl RxBuffer {
    pub fn new(capacity: usize) -> Self {
        RxBuffer {
            bytes: VecDeque::new(),
            capacity,
            dropped: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.bytes.len() >= self.capacity
    }

    /// Number of bytes rejected since creation or the last `clear`.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Queue one byte. Returns false if the buffer was full and the byte
    /// was dropped.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            self.dropped += 1;
            if self.dropped == 1 {
                debug!("rx buffer full at {} bytes, dropping input", self.capacity);
            }
            return false;
        }
        self.bytes.push_back(byte);
        trace!("rx <- 0x{:02X}", byte);
        true
    }

    /// Queue as many bytes as fit. Returns the number accepted.
    pub fn extend_from_slice(&mut self, data: &[u8]) -> usize {
        data.iter().filter(|&&byte| self.push(byte)).count()
    }

    pub fn pop(&mut self) -> Option<u8> {
        self.bytes.pop_front()
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes.front().copied()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.dropped = 0;
    }
}

impl Default for RxBuffer {
    fn default() -> Self {
        RxBuffer::new(DEFAULT_CAPACITY)
    }
}
