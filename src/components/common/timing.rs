//! Tick-level helpers shared by the parts.
//!
//! Parts see time only as a sequence of `process` calls. These helpers turn
//! that sequence into edges, periodic scans and sampling strides.

use crate::pin::PinValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    None,
}

/// Remembers the previous level of a strobe line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeDetector {
    prev: PinValue,
}

impl EdgeDetector {
    pub fn new(initial: PinValue) -> Self {
        EdgeDetector { prev: initial }
    }

    pub fn previous(&self) -> PinValue {
        self.prev
    }

    /// Classify `current` against the remembered level without updating it.
    pub fn edge(&self, current: PinValue) -> Edge {
        match (self.prev, current) {
            (PinValue::Low, PinValue::High) => Edge::Rising,
            (PinValue::High, PinValue::Low) => Edge::Falling,
            _ => Edge::None,
        }
    }

    pub fn is_rising(&self, current: PinValue) -> bool {
        self.edge(current) == Edge::Rising
    }

    pub fn is_falling(&self, current: PinValue) -> bool {
        self.edge(current) == Edge::Falling
    }

    pub fn remember(&mut self, current: PinValue) {
        self.prev = current;
    }

    /// Classify and remember in one step.
    pub fn update(&mut self, current: PinValue) -> Edge {
        let edge = self.edge(current);
        self.prev = current;
        edge
    }
}

impl Default for EdgeDetector {
    fn default() -> Self {
        EdgeDetector::new(PinValue::Low)
    }
}

/// Fires once the call count exceeds `threshold`, then starts over.
///
/// The count advances on every call, including the one that fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshCounter {
    count: u32,
    threshold: u32,
}

impl RefreshCounter {
    pub fn new(threshold: u32) -> Self {
        RefreshCounter {
            count: 0,
            threshold,
        }
    }

    pub fn tick(&mut self) -> bool {
        let fire = self.count > self.threshold;
        if fire {
            self.count = 0;
        }
        self.count += 1;
        fire
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Sampling stride over a persistence window.
///
/// Preloading with the window makes the very next tick sample; after a
/// sample the counter restarts at -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleStride {
    counter: i64,
    window: i64,
}

impl SampleStride {
    pub fn preload(&mut self, window: i64) {
        self.window = window;
        self.counter = window;
    }

    pub fn window(&self) -> i64 {
        self.window
    }

    pub fn tick(&mut self) -> bool {
        self.counter += 1;
        if self.counter > self.window {
            self.counter = -1;
            true
        } else {
            false
        }
    }
}
