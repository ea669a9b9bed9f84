use crate::types::PinIndex;

/// Logical pin slots of a part bound to physical bus indices.
///
/// Slots that were never mapped (or lie past the end) read as NC, so part
/// code can index freely without bounds checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinMap {
    slots: Vec<PinIndex>,
}

impl PinMap {
    pub fn new(count: usize) -> Self {
        PinMap {
            slots: vec![PinIndex::NC; count],
        }
    }

    pub fn from_indices(indices: &[u8]) -> Self {
        PinMap {
            slots: indices.iter().copied().map(PinIndex::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: usize) -> PinIndex {
        self.slots.get(slot).copied().unwrap_or(PinIndex::NC)
    }

    /// Returns false when `slot` does not exist.
    pub fn set(&mut self, slot: usize, pin: PinIndex) -> bool {
        match self.slots.get_mut(slot) {
            Some(entry) => {
                *entry = pin;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = PinIndex> + '_ {
        self.slots.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<PinIndex> {
        self.slots.clone()
    }

    /// Raw byte form used by preference records.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.slots.iter().map(|p| p.value()).collect()
    }

    pub fn load_bytes(&mut self, bytes: &[u8]) {
        for (slot, byte) in self.slots.iter_mut().zip(bytes) {
            *slot = PinIndex::new(*byte);
        }
    }

    pub fn is_connected(&self, slot: usize) -> bool {
        self.get(slot).is_connected()
    }
}
