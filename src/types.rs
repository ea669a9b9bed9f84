use std::fmt;

use serde::{Deserialize, Serialize};

/// Highest number of pins a bus can address.
pub const MAX_PINS: usize = u8::MAX as usize;

/// 1-based index into the pin bus. Index 0 is the "not connected" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PinIndex(u8);

impl PinIndex {
    pub const NC: PinIndex = PinIndex(0);

    pub fn new(value: u8) -> Self {
        PinIndex(value)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_connected(&self) -> bool {
        self.0 != 0
    }

    /// Index of zero-based bus `slot`, `None` past the last addressable pin.
    pub fn from_slot(slot: usize) -> Option<PinIndex> {
        slot.checked_add(1)
            .and_then(|index| u8::try_from(index).ok())
            .map(PinIndex)
    }

    /// Zero-based slot in the bus storage, `None` for NC.
    pub fn slot(&self) -> Option<usize> {
        if self.is_connected() {
            Some(self.0 as usize - 1)
        } else {
            None
        }
    }
}

impl fmt::Display for PinIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_connected() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "NC")
        }
    }
}

impl From<u8> for PinIndex {
    fn from(value: u8) -> Self {
        PinIndex::new(value)
    }
}

impl From<PinIndex> for u8 {
    fn from(value: PinIndex) -> Self {
        value.value()
    }
}

/// Numeric id of a part input or output in the remote-control namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IoId(u16);

impl IoId {
    pub const INVALID: IoId = IoId(0xFFFF);

    pub fn new(value: u16) -> Self {
        IoId(value)
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        *self != IoId::INVALID
    }
}

impl fmt::Display for IoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "INVALID")
        }
    }
}

impl From<u16> for IoId {
    fn from(value: u16) -> Self {
        IoId::new(value)
    }
}

/// Emulated clock configuration shared by every part for one frame.
///
/// `jump_steps` is the number of CPU steps in one frame, each followed by a
/// `process` call; `clocks_per_instruction` comes from the board's CPU model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub jump_steps: u32,
    pub clocks_per_instruction: u32,
}

impl Timing {
    pub fn new(jump_steps: u32, clocks_per_instruction: u32) -> Self {
        Timing {
            jump_steps,
            clocks_per_instruction,
        }
    }

    /// Number of process calls that make up one persistence window.
    pub fn persistence_window(&self) -> i64 {
        let cpi = self.clocks_per_instruction.max(1) as i64;
        (self.jump_steps as i64 * 4) / cpi
    }
}

impl Default for Timing {
    fn default() -> Self {
        Timing::new(1, 4)
    }
}
