//! # Rusty Parts Library
//!
//! Pin-level peripheral parts for a microcontroller board simulator.
//!
//! This library provides:
//! - A shared pin bus with NC-safe accessors and per-pass snapshots
//! - The `Part` lifecycle contract (pre-process, process, post-process, redraw)
//! - A matrix keypad scan engine with grid and direct-wire variants
//! - A multiplexed 7-segment display with persistence-of-vision accumulation
//! - The HP display latch column-strobe protocol
//! - An LM35 analog temperature sensor
//! - JSON-configurable workbenches that schedule parts around a CPU step callback

pub mod bus;
pub mod component;
pub mod components;
pub mod connection;
pub mod console;
pub mod devices;
pub mod draw;
pub mod pin;
pub mod preferences;
pub mod properties;
pub mod remote;
pub mod system_config;
pub mod systems;
pub mod types;

// Re-export commonly used items for easier importing
pub use bus::{PinAccess, PinBus, PinSnapshot};
pub use component::{Part, PartKind};
pub use pin::{Pin, PinDirection, PinValue};
pub use types::{IoId, PinIndex, Timing};
