use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bus::PinAccess;
use crate::draw::{Canvas, OutputArea};
use crate::properties::PropertyWindow;
use crate::remote::{Direction, IdTable};
use crate::types::{IoId, PinIndex, Timing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    Keypad,
    SevenSegmentDisplay,
    HpDisplayLatch,
    Lm35,
}

impl PartKind {
    pub const ALL: [PartKind; 4] = [
        PartKind::Keypad,
        PartKind::SevenSegmentDisplay,
        PartKind::HpDisplayLatch,
        PartKind::Lm35,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartKind::Keypad => "keypad",
            PartKind::SevenSegmentDisplay => "seven_segment_display",
            PartKind::HpDisplayLatch => "hp_display_latch",
            PartKind::Lm35 => "lm35",
        }
    }

    /// Name shown in part menus.
    pub fn title(&self) -> &'static str {
        match self {
            PartKind::Keypad => "Keypad",
            PartKind::SevenSegmentDisplay => "7 Segments Display",
            PartKind::HpDisplayLatch => "HP Display Latch",
            PartKind::Lm35 => "Temperature Sensor LM35",
        }
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PartKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown part kind: {}", s))
    }
}

/// One drawable output of a part.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OutputState {
    pub value: u8,
    pub update: bool,
    pub area: OutputArea,
}

impl OutputState {
    pub fn new(area: OutputArea) -> Self {
        OutputState {
            value: 0,
            // everything is painted once after creation
            update: true,
            area,
        }
    }
}

/// Build an output table of `count` entries laid out on a simple grid.
pub fn output_grid(count: usize, columns: usize, size: f32) -> Vec<OutputState> {
    (0..count)
        .map(|i| OutputState::new(OutputArea::cell(i, columns, size)))
        .collect()
}

/// The part lifecycle contract.
///
/// A frame is `pre_process` once, then `process` after every CPU step, then
/// `post_process` once, then `draw_output` for every output whose update flag
/// is set. All pin traffic goes through the `PinAccess` handed to each call.
pub trait Part {
    fn name(&self) -> &str;
    fn kind(&self) -> PartKind;

    /// Number of pin slots the part exposes for mapping.
    fn pin_count(&self) -> usize;
    fn pins(&self) -> Vec<PinIndex>;

    fn picture_file(&self) -> &'static str;
    fn map_file(&self) -> &'static str;

    fn reset(&mut self, _bus: &mut dyn PinAccess) {}

    /// Release bus resources before the part is removed.
    fn detach(&mut self, _bus: &mut dyn PinAccess) {}

    fn pre_process(&mut self, _bus: &mut dyn PinAccess, _timing: &Timing) {}
    fn process(&mut self, _bus: &mut dyn PinAccess) {}
    fn post_process(&mut self, _bus: &mut dyn PinAccess) {}

    /// Parts that redraw every frame regardless of update flags.
    fn always_update(&self) -> bool {
        false
    }

    /// Output table indexed by output id.
    fn outputs(&self) -> &[OutputState];
    fn outputs_mut(&mut self) -> &mut [OutputState];

    fn draw_output(&mut self, id: IoId, bus: &dyn PinAccess, canvas: &mut dyn Canvas);

    fn on_mouse_press(&mut self, _input: IoId, _x: f32, _y: f32) {}
    fn on_mouse_release(&mut self, _input: IoId, _x: f32, _y: f32) {}
    fn on_mouse_move(&mut self, _input: IoId, _x: f32, _y: f32) {}
    fn on_key_press(&mut self, _key: char) {}
    fn on_key_release(&mut self, _key: char) {}

    fn write_preferences(&self) -> String;
    fn read_preferences(&mut self, record: &str, bus: &mut dyn PinAccess);

    fn configure_properties_window(&self, _window: &mut dyn PropertyWindow, _bus: &dyn PinAccess) {}
    fn read_properties_window(&mut self, _window: &dyn PropertyWindow, _bus: &mut dyn PinAccess) {}
    fn combo_change(
        &mut self,
        _combo: &str,
        _value: &str,
        _window: &mut dyn PropertyWindow,
        _bus: &dyn PinAccess,
    ) {
    }

    fn input_table(&self) -> IdTable {
        IdTable::EMPTY
    }

    fn output_table(&self) -> IdTable;

    fn input_id(&self, name: &str) -> IoId {
        self.input_table().lookup(self.name(), Direction::Input, name)
    }

    fn output_id(&self, name: &str) -> IoId {
        self.output_table().lookup(self.name(), Direction::Output, name)
    }

    /// Remote-control read of an input (pressed key, slider position).
    fn input_status(&self, _id: IoId) -> Option<u8> {
        None
    }

    /// Remote-control write of an input. Returns false for unknown ids.
    fn set_input_status(&mut self, _id: IoId, _value: u8) -> bool {
        false
    }

    fn output_status(&self, id: IoId) -> Option<u8> {
        self.outputs().get(id.value() as usize).map(|o| o.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_kind_names() {
        for kind in PartKind::ALL {
            assert_eq!(kind.as_str().parse::<PartKind>(), Ok(kind));
        }
        assert!("mos_6502".parse::<PartKind>().is_err());
        assert_eq!(PartKind::SevenSegmentDisplay.to_string(), "seven_segment_display");
    }

    #[test]
    fn test_output_grid_starts_dirty() {
        let outputs = output_grid(6, 3, 20.0);
        assert_eq!(outputs.len(), 6);
        assert!(outputs.iter().all(|o| o.update && o.value == 0));
        assert_eq!(outputs[4].area.x1, 20.0);
        assert_eq!(outputs[4].area.y1, 20.0);
    }
}
