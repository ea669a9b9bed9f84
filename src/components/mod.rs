//! Peripheral parts, grouped the way they appear in part menus.

pub mod common;
pub mod input;
pub mod other;
pub mod output;

pub use input::keypad::Keypad;
pub use input::lm35::Lm35;
pub use other::hp_display_latch::HpDisplayLatch;
pub use output::seven_segment::SevenSegmentDisplay;
