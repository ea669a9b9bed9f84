//! HP display latch
//!
//! Drives the LED calculator display of the HP-35 family. Eight active-low
//! anode lines are latched while the firmware presents a digit; every rising
//! edge of STR shifts the latched pattern onto the anode outputs and moves
//! the low cathode strobe to the next of 15 columns. RCD low restarts the
//! column sequence at the next strobe.
//!
//! Column 0 shows the mantissa sign, which the firmware only presents while
//! column 3 (the exponent sign) is latched, so the sign bit is carried over.
//!
//! ## Pins
//! - Inputs `IAA..IAH`, `STR`, `RCD` are mapped by the user
//! - Outputs `OAA..OAH`, `CC1..CC15` are allocated on the bus by the part

use tracing::debug;

use crate::bus::PinAccess;
use crate::component::{OutputState, Part, PartKind};
use crate::components::common::timing::{Edge, EdgeDetector};
use crate::connection::PinMap;
use crate::draw::{Canvas, CanvasCmd, OutputArea, Rgb};
use crate::pin::PinValue;
use crate::preferences::{format_fields, scan_fields};
use crate::properties::{read_pin_combo, set_pin_combo, PropertyWindow};
use crate::remote::IdTable;
use crate::types::{IoId, PinIndex};

pub const INPUT_SLOTS: usize = 10;
pub const OUTPUT_SLOTS: usize = 23;
pub const COLUMNS: usize = 15;

const ANODES: usize = 8;
const SLOT_STR: usize = 8;
const SLOT_RCD: usize = 9;
const FIRST_CATHODE: usize = 8;

const MANTISSA_SIGN_COLUMN: usize = 0;
const EXPONENT_SIGN_COLUMN: usize = 3;
const MANTISSA_SIGN_BIT: u8 = 0x08;
const EXPONENT_SIGN_BIT: u8 = 0x02;

const OUT_FIRST_OUTPUT: u16 = 10;
const OUT_IC: u16 = 33;
const OUTPUT_COUNT: usize = 34;

/// Label of every id below `OUT_IC`, in slot order.
static PIN_NAMES: [&str; 33] = [
    "IAA", "IAB", "IAC", "IAD", "IAE", "IAF", "IAG", "IAH", "STR", "RCD", "OAA", "OAB", "OAC",
    "OAD", "OAE", "OAF", "OAG", "OAH", "CC1", "CC2", "CC3", "CC4", "CC5", "CC6", "CC7", "CC8",
    "CC9", "CC10", "CC11", "CC12", "CC13", "CC14", "CC15",
];

// PN_7/PN_8 and PN_17/PN_18 are swapped on the package
static OUTPUT_IDS: [(&str, u16); 21] = [
    ("IC_20", 33),
    ("PN_1", 0),
    ("PN_2", 1),
    ("PN_3", 2),
    ("PN_4", 3),
    ("PN_5", 4),
    ("PN_6", 5),
    ("PN_7", 6),
    ("PN_8", 7),
    ("PN_9", 8),
    ("PN_10", 9),
    ("PN_11", 10),
    ("PN_12", 11),
    ("PN_13", 12),
    ("PN_14", 13),
    ("PN_15", 14),
    ("PN_16", 15),
    ("PN_17", 17),
    ("PN_18", 16),
    ("PN_19", 28),
    ("PN_20", 29),
];

pub struct HpDisplayLatch {
    name: String,
    inputs: PinMap,
    outputs_pins: PinMap,
    strobe: EdgeDetector,
    anode_latch: u8,
    driven_anodes: u8,
    active_column: usize,
    next_column: usize,
    mantissa_sign: bool,
    outputs: Vec<OutputState>,
}

impl HpDisplayLatch {
    /// Create the latch and allocate its 23 output pins on `bus`.
    pub fn new(name: String, bus: &mut dyn PinAccess) -> Self {
        let outputs = (0..OUTPUT_COUNT)
            .map(|id| {
                if id as u16 == OUT_IC {
                    OutputState::new(OutputArea::new(0.0, 60.0, 180.0, 120.0))
                } else {
                    OutputState::new(OutputArea::cell(id, 17, 12.0))
                }
            })
            .collect();

        let mut latch = HpDisplayLatch {
            name,
            inputs: PinMap::new(INPUT_SLOTS),
            outputs_pins: PinMap::new(OUTPUT_SLOTS),
            strobe: EdgeDetector::new(PinValue::Low),
            anode_latch: 0,
            driven_anodes: 0,
            active_column: 0,
            next_column: 0,
            mantissa_sign: false,
            outputs,
        };
        latch.register_outputs(bus, PinIndex::NC);
        latch
    }

    pub fn input_pin(&self, slot: usize) -> PinIndex {
        self.inputs.get(slot)
    }

    pub fn set_input_pin(&mut self, slot: usize, pin: PinIndex) -> bool {
        self.inputs.set(slot, pin)
    }

    pub fn output_pin(&self, slot: usize) -> PinIndex {
        self.outputs_pins.get(slot)
    }

    pub fn anode_pin(&self, anode: usize) -> PinIndex {
        self.outputs_pins.get(anode)
    }

    pub fn cathode_pin(&self, column: usize) -> PinIndex {
        self.outputs_pins.get(FIRST_CATHODE + column)
    }

    pub fn active_column(&self) -> usize {
        self.active_column
    }

    pub fn next_column(&self) -> usize {
        self.next_column
    }

    pub fn anode_latch(&self) -> u8 {
        self.anode_latch
    }

    /// Pattern shifted onto the anode outputs at the last strobe.
    pub fn driven_anodes(&self) -> u8 {
        self.driven_anodes
    }

    pub fn mantissa_sign(&self) -> bool {
        self.mantissa_sign
    }

    /// Allocate the output pins, consecutively from `first` or wherever the
    /// bus has room when `first` is NC. A range running past the last pin
    /// index is not requested at all.
    fn register_outputs(&mut self, bus: &mut dyn PinAccess, first: PinIndex) {
        let first = if first.value().checked_add(OUTPUT_SLOTS as u8 - 1).is_some() {
            first
        } else {
            debug!("{}: outputs from pin {} do not fit", self.name, first);
            PinIndex::NC
        };

        for slot in 0..OUTPUT_SLOTS {
            let requested = match first.value().checked_add(slot as u8) {
                Some(pin) if first.is_connected() => PinIndex::new(pin),
                _ => PinIndex::NC,
            };
            let name = PIN_NAMES[OUT_FIRST_OUTPUT as usize + slot];
            let pin = bus.register_io_pin(name, requested);
            self.outputs_pins.set(slot, pin);
        }
        debug!(
            "{}: outputs registered from pin {}",
            self.name,
            self.outputs_pins.get(0)
        );
    }

    fn unregister_outputs(&mut self, bus: &mut dyn PinAccess) {
        // highest first so the bus can shrink back
        for slot in (0..OUTPUT_SLOTS).rev() {
            bus.unregister_io_pin(self.outputs_pins.get(slot));
            self.outputs_pins.set(slot, PinIndex::NC);
        }
    }

    fn clear_state(&mut self) {
        self.strobe = EdgeDetector::new(PinValue::Low);
        self.anode_latch = 0;
        self.driven_anodes = 0;
        self.active_column = 0;
        self.next_column = 0;
        self.mantissa_sign = false;
    }

    fn on_strobe(&mut self, rcd: PinValue, bus: &mut dyn PinAccess) {
        if rcd.is_low() {
            self.next_column = 0;
        }

        bus.set_pin(self.cathode_pin(self.active_column), PinValue::High);

        if self.next_column == EXPONENT_SIGN_COLUMN {
            self.mantissa_sign = self.anode_latch & MANTISSA_SIGN_BIT != 0;
            self.anode_latch &= EXPONENT_SIGN_BIT;
        } else if self.next_column == MANTISSA_SIGN_COLUMN {
            self.anode_latch = if self.mantissa_sign { EXPONENT_SIGN_BIT } else { 0 };
        }

        self.driven_anodes = self.anode_latch;
        for anode in 0..ANODES {
            let bit = 0x80 >> anode;
            let level = PinValue::from_bool(self.anode_latch & bit != 0);
            bus.set_pin(self.anode_pin(anode), level);
        }

        self.active_column = self.next_column;
        bus.set_pin(self.cathode_pin(self.active_column), PinValue::Low);
        self.next_column = (self.next_column + 1) % COLUMNS;
        self.anode_latch = 0;
    }

    fn draw_pin_text(&self, id: usize, bus: &dyn PinAccess) -> String {
        let pin = if id < OUT_FIRST_OUTPUT as usize {
            self.inputs.get(id)
        } else {
            self.outputs_pins.get(id - OUT_FIRST_OUTPUT as usize)
        };
        bus.pin_name(pin)
            .filter(|_| pin.is_connected())
            .unwrap_or_else(|| "NC".to_string())
    }
}

impl Part for HpDisplayLatch {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PartKind {
        PartKind::HpDisplayLatch
    }

    fn pin_count(&self) -> usize {
        INPUT_SLOTS
    }

    fn pins(&self) -> Vec<PinIndex> {
        self.inputs.to_vec()
    }

    fn picture_file(&self) -> &'static str {
        "../Common/IC20.svg"
    }

    fn map_file(&self) -> &'static str {
        "../Common/IC20.map"
    }

    fn reset(&mut self, _bus: &mut dyn PinAccess) {
        self.clear_state();
    }

    fn detach(&mut self, bus: &mut dyn PinAccess) {
        self.unregister_outputs(bus);
    }

    fn process(&mut self, bus: &mut dyn PinAccess) {
        let snapshot = bus.snapshot();

        // unconnected control inputs stay inactive
        let str_pin = self.inputs.get(SLOT_STR);
        let rcd_pin = self.inputs.get(SLOT_RCD);
        let strobe = snapshot.value(str_pin);
        let rcd = if rcd_pin.is_connected() {
            snapshot.value(rcd_pin)
        } else {
            PinValue::High
        };

        match self.strobe.edge(strobe) {
            Edge::Rising => {
                self.on_strobe(rcd, bus);
                self.strobe.remember(strobe);
            }
            Edge::Falling => self.strobe.remember(strobe),
            Edge::None => {}
        }

        for anode in 0..ANODES {
            let pin = self.inputs.get(anode);
            if pin.is_connected() && snapshot.value(pin).is_low() {
                self.anode_latch |= 0x80 >> anode;
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

        if id.value() == OUT_IC {
            canvas.set_color(Rgb::new(26, 26, 26));
            canvas.fill_area(&out.area);
            canvas.set_fg_color(Rgb::new(255, 255, 255));
            canvas.command(CanvasCmd::RotatedText {
                text: "HP DispLatch".to_string(),
                x: out.area.x1 + 16.0,
                y: out.area.y2 - 15.0,
                angle: 0.0,
            });
            return;
        }

        let index = id.value() as usize;
        canvas.set_color(Rgb::new(49, 61, 99));
        canvas.fill_area(&out.area);
        canvas.set_fg_color(Rgb::new(255, 255, 255));
        canvas.pin_label(&out.area, PIN_NAMES[index]);
        canvas.command(CanvasCmd::RotatedText {
            text: self.draw_pin_text(index, bus),
            x: out.area.x1,
            y: out.area.y2 - 30.0,
            angle: 90.0,
        });
    }

    fn write_preferences(&self) -> String {
        let mut fields = self.inputs.to_bytes();
        fields.push(self.outputs_pins.get(0).value());
        format_fields(&fields)
    }

    fn read_preferences(&mut self, record: &str, bus: &mut dyn PinAccess) {
        let current_first = self.outputs_pins.get(0);
        let mut fields = self.inputs.to_bytes();
        fields.push(current_first.value());

        scan_fields(record, &mut fields);

        self.inputs.load_bytes(&fields[..INPUT_SLOTS]);

        let first = PinIndex::new(fields[INPUT_SLOTS]);
        if first != current_first {
            self.unregister_outputs(bus);
            self.register_outputs(bus, first);
        }

        self.reset(bus);
    }

    fn configure_properties_window(&self, window: &mut dyn PropertyWindow, bus: &dyn PinAccess) {
        for (i, name) in PIN_NAMES.iter().enumerate() {
            window.set_label(&format!("label{}", i + 1), &format!("{}-{}", i + 1, name));
        }
        for slot in 0..INPUT_SLOTS {
            set_pin_combo(window, &format!("combo{}", slot + 1), bus, self.inputs.get(slot));
        }
    }

    fn read_properties_window(&mut self, window: &dyn PropertyWindow, _bus: &mut dyn PinAccess) {
        for slot in 0..INPUT_SLOTS {
            let pin = read_pin_combo(window, &format!("combo{}", slot + 1), self.inputs.get(slot));
            self.inputs.set(slot, pin);
        }
    }

    fn output_table(&self) -> IdTable {
        IdTable::new(&OUTPUT_IDS)
    }

    fn output_status(&self, id: IoId) -> Option<u8> {
        match id.value() {
            10..=17 => {
                let anode = id.value() as usize - OUT_FIRST_OUTPUT as usize;
                Some((self.driven_anodes >> (7 - anode)) & 1)
            }
            // cathodes are active low
            18..=32 => Some((id.value() as usize - 18 != self.active_column) as u8),
            _ => self.outputs.get(id.value() as usize).map(|o| o.value),
        }
    }
}
