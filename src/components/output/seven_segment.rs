//! 7-segment display, single digit or 4-digit multiplexed
//!
//! Firmware lights one digit at a time by pulling its select line low while
//! presenting that digit's segment pattern. The part samples the segment
//! pins once per persistence window and lights every segment that was on for
//! at least one sample during the frame.
//!
//! ## Features
//! - Segment active level selectable (HIGH for common cathode, LOW for common anode)
//! - Per-digit, per-segment accumulators cleared every frame
//! - Sampling stride derived from the emulated clock
//! - Digit groups (`SS_1..SS_4`) redrawn only when one of their segments changed

use tracing::debug;

use crate::bus::PinAccess;
use crate::component::{output_grid, OutputState, Part, PartKind};
use crate::components::common::timing::SampleStride;
use crate::connection::PinMap;
use crate::draw::{Canvas, CanvasCmd, Rgb};
use crate::pin::PinValue;
use crate::preferences::{format_fields, scan_fields};
use crate::properties::{read_pin_combo, set_pin_combo, PropertyWindow};
use crate::remote::IdTable;
use crate::types::{IoId, PinIndex, Timing};

pub const SEGMENTS: usize = 8;
pub const DIGITS: usize = 4;
const PIN_SLOTS: usize = SEGMENTS + DIGITS;

/// Brightness before the first frame completes.
const INITIAL_LEVEL: u8 = 30;

/// Each digit group is 8 segments followed by its `SS_k` background.
const GROUP_STRIDE: u16 = 9;
const OUT_SA: u16 = 36;
const OUT_DISP4: u16 = 47;
const OUT_FX1: u16 = 48;
const OUTPUT_COUNT: usize = 49;

const TYPE_ITEMS: &str = "4 Mux.,Single,";
const ACTIVE_ITEMS: &str = "HIGH,LOW,";

static OUTPUT_IDS: [(&str, u16); 49] = [
    ("SS_A1", 0),
    ("SS_B1", 1),
    ("SS_C1", 2),
    ("SS_D1", 3),
    ("SS_E1", 4),
    ("SS_F1", 5),
    ("SS_G1", 6),
    ("SS_P1", 7),
    ("SS_1", 8),
    ("SS_A2", 9),
    ("SS_B2", 10),
    ("SS_C2", 11),
    ("SS_D2", 12),
    ("SS_E2", 13),
    ("SS_F2", 14),
    ("SS_G2", 15),
    ("SS_P2", 16),
    ("SS_2", 17),
    ("SS_A3", 18),
    ("SS_B3", 19),
    ("SS_C3", 20),
    ("SS_D3", 21),
    ("SS_E3", 22),
    ("SS_F3", 23),
    ("SS_G3", 24),
    ("SS_P3", 25),
    ("SS_3", 26),
    ("SS_A4", 27),
    ("SS_B4", 28),
    ("SS_C4", 29),
    ("SS_D4", 30),
    ("SS_E4", 31),
    ("SS_F4", 32),
    ("SS_G4", 33),
    ("SS_P4", 34),
    ("SS_4", 35),
    ("PN_SA", 36),
    ("PN_SB", 37),
    ("PN_SC", 38),
    ("PN_SD", 39),
    ("PN_SE", 40),
    ("PN_SF", 41),
    ("PN_SG", 42),
    ("PN_SP", 43),
    ("PN_DISP1", 44),
    ("PN_DISP2", 45),
    ("PN_DISP3", 46),
    ("PN_DISP4", 47),
    ("PN_FX1", 48),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayType {
    Multiplexed = 0,
    Single = 1,
}

impl DisplayType {
    pub fn from_byte(value: u8) -> Self {
        if value == 0 {
            DisplayType::Multiplexed
        } else {
            DisplayType::Single
        }
    }

    pub fn from_combo(text: &str) -> Self {
        if text == "4 Mux." {
            DisplayType::Multiplexed
        } else {
            DisplayType::Single
        }
    }

    pub fn to_byte(&self) -> u8 {
        *self as u8
    }

    pub fn combo_name(&self) -> &'static str {
        match self {
            DisplayType::Multiplexed => "4 Mux.",
            DisplayType::Single => "Single",
        }
    }

    pub fn digits(&self) -> usize {
        match self {
            DisplayType::Multiplexed => DIGITS,
            DisplayType::Single => 1,
        }
    }
}

/// What a given output id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Segment { digit: usize, segment: usize },
    Group(usize),
    PinLabel(usize),
    Supply,
}

impl Output {
    fn from_id(id: u16) -> Option<Output> {
        match id {
            0..=35 => {
                let digit = (id / GROUP_STRIDE) as usize;
                let offset = (id % GROUP_STRIDE) as usize;
                if offset == SEGMENTS {
                    Some(Output::Group(digit))
                } else {
                    Some(Output::Segment {
                        digit,
                        segment: offset,
                    })
                }
            }
            OUT_SA..=OUT_DISP4 => Some(Output::PinLabel((id - OUT_SA) as usize)),
            OUT_FX1 => Some(Output::Supply),
            _ => None,
        }
    }
}

fn segment_id(digit: usize, segment: usize) -> usize {
    digit * GROUP_STRIDE as usize + segment
}

fn group_id(digit: usize) -> usize {
    digit * GROUP_STRIDE as usize + SEGMENTS
}

pub struct SevenSegmentDisplay {
    name: String,
    pins: PinMap,
    active: PinValue,
    display_type: DisplayType,
    accumulators: [[u32; SEGMENTS]; DIGITS],
    brightness: [[u8; SEGMENTS]; DIGITS],
    stride: SampleStride,
    outputs: Vec<OutputState>,
}

impl SevenSegmentDisplay {
    pub fn new(name: String) -> Self {
        SevenSegmentDisplay {
            name,
            pins: PinMap::new(PIN_SLOTS),
            active: PinValue::High,
            display_type: DisplayType::Multiplexed,
            accumulators: [[0; SEGMENTS]; DIGITS],
            brightness: [[INITIAL_LEVEL; SEGMENTS]; DIGITS],
            stride: SampleStride::default(),
            outputs: output_grid(OUTPUT_COUNT, GROUP_STRIDE as usize, 20.0),
        }
    }

    pub fn display_type(&self) -> DisplayType {
        self.display_type
    }

    pub fn active_level(&self) -> PinValue {
        self.active
    }

    pub fn set_active_level(&mut self, level: PinValue) {
        self.active = level;
    }

    pub fn pin(&self, slot: usize) -> PinIndex {
        self.pins.get(slot)
    }

    pub fn set_pin(&mut self, slot: usize, pin: PinIndex) -> bool {
        self.pins.set(slot, pin)
    }

    /// 0 or 255 after a frame, 30 before the first one.
    pub fn brightness(&self, digit: usize, segment: usize) -> u8 {
        self.brightness
            .get(digit)
            .and_then(|d| d.get(segment))
            .copied()
            .unwrap_or(0)
    }

    pub fn accumulator(&self, digit: usize, segment: usize) -> u32 {
        self.accumulators
            .get(digit)
            .and_then(|d| d.get(segment))
            .copied()
            .unwrap_or(0)
    }

    pub fn change_type(&mut self, display_type: DisplayType) {
        if display_type == self.display_type {
            return;
        }
        debug!(
            "{}: display type {} -> {}",
            self.name,
            self.display_type.combo_name(),
            display_type.combo_name()
        );
        self.display_type = display_type;
        for digit in self.accumulators.iter_mut().skip(1) {
            *digit = [0; SEGMENTS];
        }
    }

    fn sample(&mut self, bus: &dyn PinAccess) {
        let snapshot = bus.snapshot();
        let digits = self.display_type.digits();

        // NC selects never read as selected
        let selected: Vec<bool> = (0..digits)
            .map(|d| {
                let select = self.pins.get(SEGMENTS + d);
                select.is_connected() && snapshot.value(select) == PinValue::Low
            })
            .collect();

        for segment in 0..SEGMENTS {
            let pin = self.pins.get(segment);
            if !pin.is_connected() || snapshot.value(pin) != self.active {
                continue;
            }
            match self.display_type {
                DisplayType::Single => self.accumulators[0][segment] += 1,
                DisplayType::Multiplexed => {
                    for (digit, _) in selected.iter().enumerate().filter(|(_, on)| **on) {
                        self.accumulators[digit][segment] += 1;
                    }
                }
            }
        }
    }
}

impl Part for SevenSegmentDisplay {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PartKind {
        PartKind::SevenSegmentDisplay
    }

    fn pin_count(&self) -> usize {
        PIN_SLOTS
    }

    fn pins(&self) -> Vec<PinIndex> {
        self.pins.to_vec()
    }

    fn picture_file(&self) -> &'static str {
        match self.display_type {
            DisplayType::Multiplexed => "7 Segments Display/part.svg",
            DisplayType::Single => "7 Segments Display/part1.svg",
        }
    }

    fn map_file(&self) -> &'static str {
        match self.display_type {
            DisplayType::Multiplexed => "7 Segments Display/part.map",
            DisplayType::Single => "7 Segments Display/part1.map",
        }
    }

    fn reset(&mut self, _bus: &mut dyn PinAccess) {
        self.accumulators = [[0; SEGMENTS]; DIGITS];
    }

    fn pre_process(&mut self, _bus: &mut dyn PinAccess, timing: &Timing) {
        let digits = self.display_type.digits();
        for digit in self.accumulators.iter_mut().take(digits) {
            *digit = [0; SEGMENTS];
        }
        self.stride.preload(timing.persistence_window());
    }

    fn process(&mut self, bus: &mut dyn PinAccess) {
        if self.stride.tick() {
            self.sample(bus);
        }
    }

    fn post_process(&mut self, _bus: &mut dyn PinAccess) {
        for digit in 0..self.display_type.digits() {
            let mut changed = false;
            for segment in 0..SEGMENTS {
                let level = if self.accumulators[digit][segment] > 0 { 255 } else { 0 };
                self.brightness[digit][segment] = level;

                let out = &mut self.outputs[segment_id(digit, segment)];
                if out.value != level {
                    out.value = level;
                    changed = true;
                }
            }
            if changed {
                self.outputs[group_id(digit)].update = true;
            }
        }
    }

    fn always_update(&self) -> bool {
        true
    }

    fn outputs(&self) -> &[OutputState] {
        &self.outputs
    }

    fn outputs_mut(&mut self) -> &mut [OutputState] {
        &mut self.outputs
    }

    fn draw_output(&mut self, id: IoId, bus: &dyn PinAccess, canvas: &mut dyn Canvas) {
        let Some(out) = self.outputs.get(id.value() as usize).copied() else {
            return;
        };
        let Some(kind) = Output::from_id(id.value()) else {
            return;
        };

        canvas.set_fg_color(Rgb::new(30, 0, 0));

        match kind {
            Output::PinLabel(slot) => {
                canvas.set_color(Rgb::new(49, 61, 99));
                canvas.fill_area(&out.area);
                canvas.set_fg_color(Rgb::new(255, 255, 255));
                let pin = self.pins.get(slot);
                let label = bus
                    .pin_name(pin)
                    .filter(|_| pin.is_connected())
                    .unwrap_or_else(|| "NC".to_string());
                canvas.pin_label(&out.area, &label);
            }
            Output::Supply => {
                canvas.set_color(Rgb::new(49, 61, 99));
                canvas.fill_area(&out.area);
                canvas.set_fg_color(Rgb::new(155, 155, 155));
                let label = if self.active.is_high() { "GND" } else { "+5V" };
                canvas.pin_label(&out.area, label);
            }
            Output::Segment { digit, segment } => {
                canvas.set_color(Rgb::led(self.brightness[digit][segment]));
                if segment == SEGMENTS - 1 {
                    canvas.command(CanvasCmd::Circle {
                        filled: true,
                        x: out.area.x1,
                        y: out.area.y1,
                        radius: out.area.r,
                    });
                } else {
                    canvas.fill_area(&out.area);
                }
            }
            Output::Group(first) => {
                // a group redraw repaints every later group as well
                for digit in first..DIGITS {
                    for segment in 0..SEGMENTS {
                        self.outputs[segment_id(digit, segment)].update = true;
                    }
                    canvas.set_color(Rgb::new(10, 10, 10));
                    canvas.fill_area(&out.area);
                }
            }
        }
    }

    fn write_preferences(&self) -> String {
        let mut fields = self.pins.to_bytes();
        fields.push(self.active.is_high() as u8);
        fields.push(self.display_type.to_byte());
        format_fields(&fields)
    }

    fn read_preferences(&mut self, record: &str, _bus: &mut dyn PinAccess) {
        let mut fields = self.pins.to_bytes();
        fields.push(self.active.is_high() as u8);
        fields.push(self.display_type.to_byte());

        scan_fields(record, &mut fields);

        self.pins.load_bytes(&fields[..PIN_SLOTS]);
        self.active = PinValue::from_bool(fields[PIN_SLOTS] != 0);
        self.change_type(DisplayType::from_byte(fields[PIN_SLOTS + 1]));
    }

    fn configure_properties_window(&self, window: &mut dyn PropertyWindow, bus: &dyn PinAccess) {
        for slot in 0..PIN_SLOTS {
            let combo = format!("combo{}", slot + 1);
            set_pin_combo(window, &combo, bus, self.pins.get(slot));
            if slot >= SEGMENTS {
                window.set_enabled(&combo, self.display_type == DisplayType::Multiplexed);
            }
        }

        window.set_combo_items("combo13", ACTIVE_ITEMS);
        window.set_combo_text("combo13", if self.active.is_high() { "HIGH" } else { "LOW" });

        window.set_combo_items("combo14", TYPE_ITEMS);
        window.set_combo_text("combo14", self.display_type.combo_name());
    }

    fn read_properties_window(&mut self, window: &dyn PropertyWindow, _bus: &mut dyn PinAccess) {
        for slot in 0..PIN_SLOTS {
            let combo = format!("combo{}", slot + 1);
            let pin = read_pin_combo(window, &combo, self.pins.get(slot));
            self.pins.set(slot, pin);
        }

        if let Some(text) = window.combo_text("combo13") {
            self.active = PinValue::from_bool(text == "HIGH");
        }
        if let Some(text) = window.combo_text("combo14") {
            self.change_type(DisplayType::from_combo(&text));
        }
    }

    fn combo_change(
        &mut self,
        combo: &str,
        value: &str,
        window: &mut dyn PropertyWindow,
        bus: &dyn PinAccess,
    ) {
        if combo == "combo14" {
            self.change_type(DisplayType::from_combo(value));
            self.configure_properties_window(window, bus);
        }
    }

    fn output_table(&self) -> IdTable {
        IdTable::new(&OUTPUT_IDS)
    }

    fn output_status(&self, id: IoId) -> Option<u8> {
        match Output::from_id(id.value())? {
            Output::Segment { digit, segment } => Some(self.brightness[digit][segment]),
            _ => self.outputs.get(id.value() as usize).map(|o| o.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::PinBus;
    use crate::properties::PropertySheet;

    fn pin(n: u8) -> PinIndex {
        PinIndex::new(n)
    }

    /// Segments a..p on pins 1..8, selects D1..D4 on pins 9..12.
    fn wired(bus: &mut PinBus, active: u8, dtype: u8) -> SevenSegmentDisplay {
        let mut display = SevenSegmentDisplay::new("disp".to_string());
        let record = format!("1,2,3,4,5,6,7,8,9,10,11,12,{},{}", active, dtype);
        display.read_preferences(&record, bus);
        display
    }

    fn deselect_all(bus: &mut PinBus) {
        for n in 9..=12 {
            bus.set_pin(pin(n), PinValue::High);
        }
    }

    #[test]
    fn test_defaults() {
        let display = SevenSegmentDisplay::new("disp".to_string());
        assert_eq!(display.display_type(), DisplayType::Multiplexed);
        assert_eq!(display.active_level(), PinValue::High);
        assert_eq!(display.brightness(0, 0), 30);
        assert_eq!(display.output_status(IoId::new(0)), Some(30));
        assert_eq!(display.picture_file(), "7 Segments Display/part.svg");
    }

    #[test]
    fn test_single_digit_frame() {
        let mut bus = PinBus::new(12);
        let mut display = wired(&mut bus, 1, 1);
        assert_eq!(display.picture_file(), "7 Segments Display/part1.svg");

        bus.set_pin(pin(1), PinValue::High);
        bus.set_pin(pin(7), PinValue::High);

        display.pre_process(&mut bus, &Timing::new(4, 4));
        for _ in 0..20 {
            display.process(&mut bus);
        }
        display.post_process(&mut bus);

        assert_eq!(display.brightness(0, 0), 255);
        assert_eq!(display.brightness(0, 6), 255);
        assert_eq!(display.brightness(0, 1), 0);
        assert!(display.outputs()[8].update);
    }

    #[test]
    fn test_sample_stride() {
        let mut bus = PinBus::new(12);
        let mut display = wired(&mut bus, 1, 1);
        bus.set_pin(pin(1), PinValue::High);

        // window of 4 calls: samples on calls 1, 7, 13
        display.pre_process(&mut bus, &Timing::new(4, 4));
        for _ in 0..13 {
            display.process(&mut bus);
        }
        assert_eq!(display.accumulator(0, 0), 3);
    }

    #[test]
    fn test_multiplexed_digits() {
        let mut bus = PinBus::new(12);
        let mut display = wired(&mut bus, 1, 0);
        let timing = Timing::new(1, 4);

        display.pre_process(&mut bus, &timing);

        // digit 1 shows segment a
        deselect_all(&mut bus);
        bus.set_pin(pin(9), PinValue::Low);
        bus.set_pin(pin(1), PinValue::High);
        display.process(&mut bus);

        // digit 3 shows segment b, a is off
        deselect_all(&mut bus);
        bus.set_pin(pin(11), PinValue::Low);
        bus.set_pin(pin(1), PinValue::Low);
        bus.set_pin(pin(2), PinValue::High);
        for _ in 0..3 {
            display.process(&mut bus);
        }

        display.post_process(&mut bus);

        assert_eq!(display.brightness(0, 0), 255);
        assert_eq!(display.brightness(0, 1), 0);
        assert_eq!(display.brightness(2, 1), 255);
        assert_eq!(display.brightness(2, 0), 0);
        assert_eq!(display.brightness(1, 1), 0);
        assert_eq!(display.output_status(IoId::new(19)), Some(255));
    }

    #[test]
    fn test_active_low_segments() {
        let mut bus = PinBus::new(12);
        let mut display = wired(&mut bus, 0, 1);
        for n in 1..=8 {
            bus.set_pin(pin(n), PinValue::High);
        }
        bus.set_pin(pin(4), PinValue::Low);

        display.pre_process(&mut bus, &Timing::default());
        display.process(&mut bus);
        display.post_process(&mut bus);

        assert_eq!(display.brightness(0, 3), 255);
        assert_eq!(display.brightness(0, 0), 0);
    }

    #[test]
    fn test_nc_select_never_selects() {
        let mut bus = PinBus::new(12);
        let mut display = SevenSegmentDisplay::new("disp".to_string());
        display.read_preferences("1,2,3,4,5,6,7,8,0,0,0,0,1,0", &mut bus);
        bus.set_pin(pin(1), PinValue::High);

        display.pre_process(&mut bus, &Timing::default());
        display.process(&mut bus);
        display.post_process(&mut bus);

        assert!((0..DIGITS).all(|d| display.brightness(d, 0) == 0));
    }

    #[test]
    fn test_accumulators_reset_each_frame() {
        let mut bus = PinBus::new(12);
        let mut display = wired(&mut bus, 1, 1);
        bus.set_pin(pin(2), PinValue::High);

        display.pre_process(&mut bus, &Timing::default());
        display.process(&mut bus);
        display.post_process(&mut bus);
        assert_eq!(display.brightness(0, 1), 255);

        bus.set_pin(pin(2), PinValue::Low);
        display.pre_process(&mut bus, &Timing::default());
        assert_eq!(display.accumulator(0, 1), 0);
        display.process(&mut bus);
        display.post_process(&mut bus);
        assert_eq!(display.brightness(0, 1), 0);
    }

    #[test]
    fn test_unchanged_frame_sets_no_flag() {
        let mut bus = PinBus::new(12);
        let mut display = wired(&mut bus, 1, 1);

        display.pre_process(&mut bus, &Timing::default());
        display.post_process(&mut bus);
        for out in display.outputs_mut() {
            out.update = false;
        }

        display.pre_process(&mut bus, &Timing::default());
        display.post_process(&mut bus);
        assert!(display.outputs().iter().all(|o| !o.update));
    }

    #[test]
    fn test_group_redraw_falls_through() {
        let bus = PinBus::new(12);
        let mut display = SevenSegmentDisplay::new("disp".to_string());
        for out in display.outputs_mut() {
            out.update = false;
        }

        let mut canvas: Vec<CanvasCmd> = Vec::new();
        display.draw_output(IoId::new(17), &bus, &mut canvas);

        // SS_2 flags groups 2..4, not group 1
        assert!(!display.outputs()[0].update);
        assert!(display.outputs()[9].update);
        assert!(display.outputs()[34].update);
        let backgrounds = canvas
            .iter()
            .filter(|c| matches!(c, CanvasCmd::SetColor(rgb) if *rgb == Rgb::new(10, 10, 10)))
            .count();
        assert_eq!(backgrounds, 3);
    }

    #[test]
    fn test_supply_label_follows_active_level() {
        let bus = PinBus::new(12);
        let mut display = SevenSegmentDisplay::new("disp".to_string());
        let mut canvas: Vec<CanvasCmd> = Vec::new();
        display.draw_output(IoId::new(48), &bus, &mut canvas);
        assert!(canvas
            .iter()
            .any(|c| matches!(c, CanvasCmd::RotatedText { text, .. } if text == "GND")));

        display.set_active_level(PinValue::Low);
        canvas.clear();
        display.draw_output(IoId::new(48), &bus, &mut canvas);
        assert!(canvas
            .iter()
            .any(|c| matches!(c, CanvasCmd::RotatedText { text, .. } if text == "+5V")));
    }

    #[test]
    fn test_ids_and_preferences() {
        let mut bus = PinBus::new(12);
        let display = wired(&mut bus, 0, 1);
        assert_eq!(display.write_preferences(), "1,2,3,4,5,6,7,8,9,10,11,12,0,1");
        assert_eq!(display.output_id("SS_4"), IoId::new(35));
        assert_eq!(display.output_id("PN_DISP1"), IoId::new(44));
        assert_eq!(display.output_id("PN_FX1"), IoId::new(48));
        assert_eq!(display.input_id("SS_A1"), IoId::INVALID);
    }

    #[test]
    fn test_properties_window() {
        let mut bus = PinBus::new(12);
        let mut display = wired(&mut bus, 1, 0);
        let mut sheet = PropertySheet::new();
        display.configure_properties_window(&mut sheet, &bus);

        assert_eq!(sheet.text("combo14"), Some("4 Mux."));
        assert_eq!(sheet.text("combo13"), Some("HIGH"));
        assert!(sheet.is_enabled("combo12"));

        display.combo_change("combo14", "Single", &mut sheet, &bus);
        assert_eq!(display.display_type(), DisplayType::Single);
        assert!(!sheet.is_enabled("combo9"));

        sheet.set_combo_text("combo13", "LOW");
        display.read_properties_window(&sheet, &mut bus);
        assert_eq!(display.active_level(), PinValue::Low);
        assert_eq!(display.display_type(), DisplayType::Single);
    }
}
