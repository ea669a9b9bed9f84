//! The board pin bus.
//!
//! Parts never hold references into the bus. They receive a `&mut dyn PinAccess`
//! for the duration of one lifecycle call and address pins by [`PinIndex`].
//! NC and out-of-range indices are handled here, so part code can pass any
//! configured index straight through.

use tracing::{debug, trace};

use crate::pin::{Pin, PinValue};
use crate::types::{PinIndex, MAX_PINS};

/// Pin-level access shared by every part.
pub trait PinAccess {
    /// Number of addressable pins (board pins plus registered IO pins).
    fn pin_count(&self) -> usize;

    fn pin_value(&self, index: PinIndex) -> PinValue;
    fn set_pin(&mut self, index: PinIndex, value: PinValue);
    fn set_pin_pull(&mut self, index: PinIndex, level: PinValue);
    fn pin_analog(&self, index: PinIndex) -> f32;
    fn set_analog_pin(&mut self, index: PinIndex, volts: f32);

    /// Display name of a pin, `None` for NC or unknown indices.
    fn pin_name(&self, index: PinIndex) -> Option<String>;

    /// Allocate (or re-bind) a pin owned by a part.
    ///
    /// With `PinIndex::NC` the next free slot after the board pins is used.
    /// A requested index is honoured only when it is neither a board pin nor
    /// already owned by a part; otherwise the next free slot is used instead.
    fn register_io_pin(&mut self, name: &str, requested: PinIndex) -> PinIndex;
    fn unregister_io_pin(&mut self, index: PinIndex);

    /// Copy of every digital level, taken before a scan pass.
    fn snapshot(&self) -> PinSnapshot;
}

/// Frozen digital levels of the whole bus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinSnapshot {
    values: Vec<PinValue>,
}

impl PinSnapshot {
    pub fn new(values: Vec<PinValue>) -> Self {
        PinSnapshot { values }
    }

    pub fn value(&self, index: PinIndex) -> PinValue {
        index
            .slot()
            .and_then(|slot| self.values.get(slot).copied())
            .unwrap_or(PinValue::Low)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Vector-backed pin bus. Index `n` lives in slot `n - 1`.
#[derive(Debug, Clone)]
pub struct PinBus {
    pins: Vec<Pin>,
    board_pins: usize,
}

impl PinBus {
    /// A bus with `count` board pins named `P1..Pn`.
    pub fn new(count: usize) -> Self {
        let names: Vec<String> = (1..=count).map(|i| format!("P{}", i)).collect();
        Self::with_names(&names)
    }

    /// A bus with one board pin per name. Names past `MAX_PINS` are not
    /// addressable and are dropped.
    pub fn with_names<S: AsRef<str>>(names: &[S]) -> Self {
        if names.len() > MAX_PINS {
            debug!("{} pin names, only {} addressable", names.len(), MAX_PINS);
        }
        let pins = names
            .iter()
            .take(MAX_PINS)
            .map(|name| Pin::new(name.as_ref().to_string()))
            .collect::<Vec<_>>();
        let board_pins = pins.len();

        PinBus { pins, board_pins }
    }

    pub fn board_pin_count(&self) -> usize {
        self.board_pins
    }

    pub fn pin(&self, index: PinIndex) -> Option<&Pin> {
        index.slot().and_then(|slot| self.pins.get(slot))
    }

    pub fn pin_mut(&mut self, index: PinIndex) -> Option<&mut Pin> {
        index.slot().and_then(move |slot| self.pins.get_mut(slot))
    }

    pub fn iter(&self) -> impl Iterator<Item = (PinIndex, &Pin)> {
        self.pins
            .iter()
            .enumerate()
            .filter_map(|(slot, pin)| PinIndex::from_slot(slot).map(|index| (index, pin)))
    }

    fn is_free_io_slot(&self, slot: usize) -> bool {
        slot >= self.board_pins
            && self
                .pins
                .get(slot)
                .map_or(true, |pin| !pin.is_registered_io())
    }

    fn pin_or_trace(&mut self, index: PinIndex) -> Option<&mut Pin> {
        if !index.is_connected() {
            return None;
        }
        let len = self.pins.len();
        let pin = self.pin_mut(index);
        if pin.is_none() {
            trace!("pin {} out of range ({} pins), ignored", index, len);
        }
        pin
    }
}

impl PinAccess for PinBus {
    fn pin_count(&self) -> usize {
        self.pins.len()
    }

    fn pin_value(&self, index: PinIndex) -> PinValue {
        self.pin(index).map(Pin::read).unwrap_or(PinValue::Low)
    }

    fn set_pin(&mut self, index: PinIndex, value: PinValue) {
        if let Some(pin) = self.pin_or_trace(index) {
            pin.drive(value);
        }
    }

    fn set_pin_pull(&mut self, index: PinIndex, level: PinValue) {
        if let Some(pin) = self.pin_or_trace(index) {
            pin.set_pull(level);
        }
    }

    fn pin_analog(&self, index: PinIndex) -> f32 {
        self.pin(index).map(Pin::analog).unwrap_or(0.0)
    }

    fn set_analog_pin(&mut self, index: PinIndex, volts: f32) {
        if let Some(pin) = self.pin_or_trace(index) {
            pin.drive_analog(volts);
        }
    }

    fn pin_name(&self, index: PinIndex) -> Option<String> {
        self.pin(index).map(|pin| pin.name().to_string())
    }

    fn register_io_pin(&mut self, name: &str, requested: PinIndex) -> PinIndex {
        let slot = match requested.slot().filter(|&slot| self.is_free_io_slot(slot)) {
            Some(slot) => slot,
            None => {
                if requested.is_connected() {
                    debug!("pin {} not free for {}, relocating", requested, name);
                }
                // first slot after the board pins that is not already an IO pin
                let free = (self.board_pins..self.pins.len())
                    .find(|&slot| !self.pins[slot].is_registered_io());
                free.unwrap_or(self.pins.len())
            }
        };

        let Some(index) = PinIndex::from_slot(slot) else {
            debug!("no room for IO pin {}", name);
            return PinIndex::NC;
        };

        while self.pins.len() <= slot {
            let placeholder = format!("IO{}", self.pins.len() + 1);
            self.pins.push(Pin::new(placeholder));
        }
        self.pins[slot] = Pin::new_io(name.to_string());

        trace!("registered IO pin {} at {}", name, index);
        index
    }

    fn unregister_io_pin(&mut self, index: PinIndex) {
        let Some(slot) = index.slot() else {
            return;
        };
        match self.pins.get(slot) {
            Some(pin) if pin.is_registered_io() => {
                self.pins[slot] = Pin::new(format!("IO{}", slot + 1));
            }
            _ => return,
        }

        // release trailing slots nobody owns any more
        while self.pins.len() > self.board_pins
            && self.pins.last().map_or(false, |pin| !pin.is_registered_io())
        {
            self.pins.pop();
        }
    }

    fn snapshot(&self) -> PinSnapshot {
        PinSnapshot::new(self.pins.iter().map(Pin::read).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_creation() {
        let bus = PinBus::new(18);
        assert_eq!(bus.pin_count(), 18);
        assert_eq!(bus.board_pin_count(), 18);
        assert_eq!(bus.pin_name(PinIndex::new(1)).as_deref(), Some("P1"));
        assert_eq!(bus.pin_name(PinIndex::NC), None);
    }

    #[test]
    fn test_nc_is_inert() {
        let mut bus = PinBus::new(4);
        bus.set_pin(PinIndex::NC, PinValue::High);
        bus.set_analog_pin(PinIndex::NC, 5.0);
        bus.set_pin_pull(PinIndex::NC, PinValue::High);

        assert_eq!(bus.pin_value(PinIndex::NC), PinValue::Low);
        assert_eq!(bus.pin_analog(PinIndex::NC), 0.0);
        assert!(bus.iter().all(|(_, pin)| pin.read() == PinValue::Low));
    }

    #[test]
    fn test_out_of_range_behaves_like_nc() {
        let mut bus = PinBus::new(4);
        bus.set_pin(PinIndex::new(9), PinValue::High);
        assert_eq!(bus.pin_value(PinIndex::new(9)), PinValue::Low);
        assert_eq!(bus.pin_count(), 4);
    }

    #[test]
    fn test_snapshot_is_frozen() {
        let mut bus = PinBus::new(3);
        bus.set_pin(PinIndex::new(2), PinValue::High);
        let snap = bus.snapshot();
        bus.set_pin(PinIndex::new(2), PinValue::Low);

        assert_eq!(snap.value(PinIndex::new(2)), PinValue::High);
        assert_eq!(snap.value(PinIndex::NC), PinValue::Low);
        assert_eq!(snap.value(PinIndex::new(200)), PinValue::Low);
        assert_eq!(snap.len(), 3);
    }

    #[test]
    fn test_register_io_pins() {
        let mut bus = PinBus::new(4);
        let a = bus.register_io_pin("OAA", PinIndex::NC);
        let b = bus.register_io_pin("OAB", PinIndex::NC);

        assert_eq!(a, PinIndex::new(5));
        assert_eq!(b, PinIndex::new(6));
        assert_eq!(bus.pin_name(b).as_deref(), Some("OAB"));

        bus.set_pin(b, PinValue::High);
        assert_eq!(bus.pin_value(b), PinValue::High);

        bus.unregister_io_pin(b);
        assert_eq!(bus.pin_count(), 5);
        bus.unregister_io_pin(a);
        assert_eq!(bus.pin_count(), 4);
    }

    #[test]
    fn test_register_io_pin_at_requested_index() {
        let mut bus = PinBus::new(4);
        let idx = bus.register_io_pin("CC1", PinIndex::new(10));
        assert_eq!(idx, PinIndex::new(10));
        assert_eq!(bus.pin_count(), 10);
        assert_eq!(bus.pin_name(PinIndex::new(7)).as_deref(), Some("IO7"));

        // board pins are never released
        bus.unregister_io_pin(PinIndex::new(2));
        assert_eq!(bus.pin_name(PinIndex::new(2)).as_deref(), Some("P2"));
    }

    #[test]
    fn test_indices_stop_at_last_addressable_pin() {
        let bus = PinBus::new(300);
        assert_eq!(bus.pin_count(), MAX_PINS);
        let last = bus.iter().last().map(|(index, _)| index);
        assert_eq!(last, Some(PinIndex::new(255)));
        assert!(bus.iter().all(|(index, _)| index.is_connected()));

        let mut full = PinBus::new(MAX_PINS);
        assert_eq!(full.register_io_pin("OAA", PinIndex::NC), PinIndex::NC);
        assert_eq!(full.pin_count(), MAX_PINS);
    }

    #[test]
    fn test_requested_board_pin_is_relocated() {
        let mut bus = PinBus::with_names(&["RA0", "RA1", "RA2"][..]);
        let idx = bus.register_io_pin("OAA", PinIndex::new(2));
        assert_eq!(idx, PinIndex::new(4));
        assert_eq!(bus.pin_name(PinIndex::new(2)).as_deref(), Some("RA1"));

        bus.unregister_io_pin(idx);
        assert_eq!(bus.pin_name(PinIndex::new(2)).as_deref(), Some("RA1"));
        assert_eq!(bus.pin_count(), 3);
    }

    #[test]
    fn test_requested_io_pin_in_use_is_relocated() {
        let mut bus = PinBus::new(2);
        let first = bus.register_io_pin("OAA", PinIndex::new(5));
        let second = bus.register_io_pin("OAB", PinIndex::new(5));
        assert_eq!(first, PinIndex::new(5));
        assert_eq!(second, PinIndex::new(3));
        assert_eq!(bus.pin_name(first).as_deref(), Some("OAA"));
        assert_eq!(bus.pin_name(second).as_deref(), Some("OAB"));
    }

    #[test]
    fn test_pull_settles_input() {
        let mut bus = PinBus::new(2);
        bus.set_pin_pull(PinIndex::new(1), PinValue::High);
        assert_eq!(bus.pin_value(PinIndex::new(1)), PinValue::High);
    }
}
