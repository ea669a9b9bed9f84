//! Matrix keypad
//!
//! Models the common membrane keypads wired straight to microcontroller
//! pins. The firmware drives line pins and reads column pins; the keypad
//! copies the level of the line carrying a pressed key onto that key's
//! column.
//!
//! ## Features
//! - 4x4, 4x3 and 2x5 grid layouts sharing 8 pin slots
//! - "NG" direct-wire layouts where every key owns its own pin pair
//! - Pull-up or pull-down idle level
//! - Periodic scan, one pass every 11 `process` calls
//! - Keyboard shortcuts and remote control by key name

use tracing::debug;

use crate::bus::PinAccess;
use crate::component::{output_grid, OutputState, Part, PartKind};
use crate::components::common::timing::RefreshCounter;
use crate::connection::PinMap;
use crate::draw::{Canvas, CanvasCmd, Rgb};
use crate::pin::PinValue;
use crate::preferences::{format_fields, scan_fields};
use crate::properties::{read_pin_combo, set_pin_combo, PropertyWindow};
use crate::remote::IdTable;
use crate::types::{IoId, PinIndex, Timing};

pub const PIN_SLOTS: usize = 32;
const GRID_SLOTS: usize = 8;
const SCAN_THRESHOLD: u32 = 10;

const TYPE_ITEMS: &str = "4x4,4x3,2x5,4x4_NG,4x3_NG,2x5_NG,";
const PULL_ITEMS: &str = "UP,DOWN,";

/// Output ids past the sixteen keys.
const OUT_L1: u16 = 16;
const OUT_C5: u16 = 24;
const OUTPUT_COUNT: usize = 25;

static INPUT_IDS: [(&str, u16); 16] = [
    ("KB_1", 0),
    ("KB_2", 1),
    ("KB_3", 2),
    ("KB_A", 3),
    ("KB_4", 4),
    ("KB_5", 5),
    ("KB_6", 6),
    ("KB_B", 7),
    ("KB_7", 8),
    ("KB_8", 9),
    ("KB_9", 10),
    ("KB_C", 11),
    ("KB_a", 12),
    ("KB_0", 13),
    ("KB_T", 14),
    ("KB_D", 15),
];

static OUTPUT_IDS: [(&str, u16); 25] = [
    ("KB_1", 0),
    ("KB_2", 1),
    ("KB_3", 2),
    ("KB_A", 3),
    ("KB_4", 4),
    ("KB_5", 5),
    ("KB_6", 6),
    ("KB_B", 7),
    ("KB_7", 8),
    ("KB_8", 9),
    ("KB_9", 10),
    ("KB_C", 11),
    ("KB_a", 12),
    ("KB_0", 13),
    ("KB_T", 14),
    ("KB_D", 15),
    ("PN_L1", 16),
    ("PN_L2", 17),
    ("PN_L3", 18),
    ("PN_L4", 19),
    ("PN_C1", 20),
    ("PN_C2", 21),
    ("PN_C3", 22),
    ("PN_C4", 23),
    ("PN_C5", 24),
];

/// Keys in input-id order (line-major on the 4x4 face).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    K1,
    K2,
    K3,
    KA,
    K4,
    K5,
    K6,
    KB,
    K7,
    K8,
    K9,
    KC,
    Star,
    K0,
    Hash,
    KD,
}

impl Key {
    pub const ALL: [Key; 16] = [
        Key::K1,
        Key::K2,
        Key::K3,
        Key::KA,
        Key::K4,
        Key::K5,
        Key::K6,
        Key::KB,
        Key::K7,
        Key::K8,
        Key::K9,
        Key::KC,
        Key::Star,
        Key::K0,
        Key::Hash,
        Key::KD,
    ];

    pub fn id(&self) -> IoId {
        IoId::new(*self as u16)
    }

    pub fn from_id(id: IoId) -> Option<Key> {
        Key::ALL.get(id.value() as usize).copied()
    }

    pub fn name(&self) -> &'static str {
        INPUT_IDS[*self as usize].0
    }

    /// Host keyboard shortcut.
    pub fn from_char(c: char) -> Option<Key> {
        let key = match c.to_ascii_uppercase() {
            '1' => Key::K1,
            '2' => Key::K2,
            '3' => Key::K3,
            '4' => Key::K4,
            '5' => Key::K5,
            '6' => Key::K6,
            '7' => Key::K7,
            '8' => Key::K8,
            '9' => Key::K9,
            '0' => Key::K0,
            'A' => Key::KA,
            'B' => Key::KB,
            'C' => Key::KC,
            'D' => Key::KD,
            '*' => Key::Star,
            '#' => Key::Hash,
            _ => return None,
        };
        Some(key)
    }

    /// Right-hand column and bottom-row symbol keys get the red cap.
    fn is_function_key(&self) -> bool {
        matches!(self, Key::Star | Key::Hash) || (*self as usize + 1) % 4 == 0
    }
}

const LAYOUT_2X5: [[Key; 5]; 2] = [
    [Key::K1, Key::K2, Key::K3, Key::K4, Key::K5],
    [Key::K6, Key::K7, Key::K8, Key::K9, Key::K0],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeypadType {
    Grid4x4 = 1,
    Grid4x3,
    Grid2x5,
    Direct4x4,
    Direct4x3,
    Direct2x5,
}

impl KeypadType {
    pub const ALL: [KeypadType; 6] = [
        KeypadType::Grid4x4,
        KeypadType::Grid4x3,
        KeypadType::Grid2x5,
        KeypadType::Direct4x4,
        KeypadType::Direct4x3,
        KeypadType::Direct2x5,
    ];

    /// Out-of-range bytes (including 0) select the 4x4 grid.
    pub fn from_byte(value: u8) -> Self {
        match value {
            2 => KeypadType::Grid4x3,
            3 => KeypadType::Grid2x5,
            4 => KeypadType::Direct4x4,
            5 => KeypadType::Direct4x3,
            6 => KeypadType::Direct2x5,
            _ => KeypadType::Grid4x4,
        }
    }

    pub fn from_combo(text: &str) -> Self {
        KeypadType::ALL
            .iter()
            .copied()
            .find(|t| t.combo_name() == text)
            .unwrap_or(KeypadType::Grid4x4)
    }

    pub fn to_byte(&self) -> u8 {
        *self as u8
    }

    pub fn combo_name(&self) -> &'static str {
        match self {
            KeypadType::Grid4x4 => "4x4",
            KeypadType::Grid4x3 => "4x3",
            KeypadType::Grid2x5 => "2x5",
            KeypadType::Direct4x4 => "4x4_NG",
            KeypadType::Direct4x3 => "4x3_NG",
            KeypadType::Direct2x5 => "2x5_NG",
        }
    }

    pub fn is_grid(&self) -> bool {
        matches!(
            self,
            KeypadType::Grid4x4 | KeypadType::Grid4x3 | KeypadType::Grid2x5
        )
    }

    pub fn lines(&self) -> usize {
        match self {
            KeypadType::Grid2x5 | KeypadType::Direct2x5 => 2,
            _ => 4,
        }
    }

    pub fn columns(&self) -> usize {
        match self {
            KeypadType::Grid4x4 | KeypadType::Direct4x4 => 4,
            KeypadType::Grid4x3 | KeypadType::Direct4x3 => 3,
            KeypadType::Grid2x5 | KeypadType::Direct2x5 => 5,
        }
    }

    /// Pin slots that carry a signal for this layout.
    pub fn used_slots(&self) -> usize {
        if self.is_grid() {
            self.lines() + self.columns()
        } else {
            2 * self.lines() * self.columns()
        }
    }

    pub fn key_at(&self, line: usize, column: usize) -> Option<Key> {
        if line >= self.lines() || column >= self.columns() {
            return None;
        }
        match self {
            KeypadType::Grid2x5 | KeypadType::Direct2x5 => Some(LAYOUT_2X5[line][column]),
            _ => Key::ALL.get(line * 4 + column).copied(),
        }
    }

    pub fn picture_file(&self) -> &'static str {
        match self {
            KeypadType::Grid4x4 | KeypadType::Direct4x4 => "Keypad/keypad_4x4.svg",
            KeypadType::Grid4x3 | KeypadType::Direct4x3 => "Keypad/keypad_4x3.svg",
            KeypadType::Grid2x5 | KeypadType::Direct2x5 => "Keypad/keypad_2x5.svg",
        }
    }

    pub fn map_file(&self) -> &'static str {
        match self {
            KeypadType::Grid4x4 | KeypadType::Direct4x4 => "Keypad/keypad_4x4.map",
            KeypadType::Grid4x3 | KeypadType::Direct4x3 => "Keypad/keypad_4x3.map",
            KeypadType::Grid2x5 | KeypadType::Direct2x5 => "Keypad/keypad_2x5.map",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    Up,
    Down,
}

impl Pull {
    pub fn from_byte(value: u8) -> Self {
        if value == 0 {
            Pull::Up
        } else {
            Pull::Down
        }
    }

    pub fn to_byte(&self) -> u8 {
        match self {
            Pull::Up => 0,
            Pull::Down => 1,
        }
    }

    /// Level of an undriven line.
    pub fn idle_level(&self) -> PinValue {
        match self {
            Pull::Up => PinValue::High,
            Pull::Down => PinValue::Low,
        }
    }

    fn combo_name(&self) -> &'static str {
        match self {
            Pull::Up => "UP",
            Pull::Down => "DOWN",
        }
    }
}

pub struct Keypad {
    name: String,
    pins: PinMap,
    keypad_type: KeypadType,
    pull: Pull,
    pressed: [bool; 16],
    refresh: RefreshCounter,
    active_key_index: Option<usize>,
    outputs: Vec<OutputState>,
}

impl Keypad {
    pub fn new(name: String) -> Self {
        Keypad {
            name,
            pins: PinMap::new(PIN_SLOTS),
            keypad_type: KeypadType::Grid4x4,
            pull: Pull::Up,
            pressed: [false; 16],
            refresh: RefreshCounter::new(SCAN_THRESHOLD),
            active_key_index: None,
            outputs: output_grid(OUTPUT_COUNT, 4, 40.0),
        }
    }

    pub fn keypad_type(&self) -> KeypadType {
        self.keypad_type
    }

    pub fn pull(&self) -> Pull {
        self.pull
    }

    pub fn set_pull(&mut self, pull: Pull) {
        self.pull = pull;
    }

    pub fn pin(&self, slot: usize) -> PinIndex {
        self.pins.get(slot)
    }

    pub fn set_pin(&mut self, slot: usize, pin: PinIndex) -> bool {
        self.pins.set(slot, pin)
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed[key as usize]
    }

    /// Last "a" slot mirrored by a direct-wire scan.
    pub fn active_key_index(&self) -> Option<usize> {
        self.active_key_index
    }

    /// Switch layout. Pressed keys are released.
    pub fn change_type(&mut self, keypad_type: KeypadType) {
        if keypad_type == self.keypad_type {
            return;
        }
        debug!(
            "{}: keypad type {} -> {}",
            self.name,
            self.keypad_type.combo_name(),
            keypad_type.combo_name()
        );
        self.keypad_type = keypad_type;
        self.release_all();
    }

    pub fn press(&mut self, key: Key) {
        self.set_key(key, true);
    }

    pub fn release(&mut self, key: Key) {
        self.set_key(key, false);
    }

    fn set_key(&mut self, key: Key, down: bool) {
        self.pressed[key as usize] = down;
        let out = &mut self.outputs[key as usize];
        out.value = down as u8;
        out.update = true;
    }

    fn release_all(&mut self) {
        self.active_key_index = None;
        for key in Key::ALL {
            if self.pressed[key as usize] {
                self.release(key);
            }
        }
    }

    /// Drive every driven slot of the layout to the idle level.
    fn drive_idle(&self, bus: &mut dyn PinAccess) {
        let level = self.pull.idle_level();
        if self.keypad_type.is_grid() {
            for slot in 0..GRID_SLOTS {
                bus.set_pin(self.pins.get(slot), level);
            }
        } else {
            for slot in (0..self.keypad_type.used_slots()).step_by(2) {
                bus.set_pin(self.pins.get(slot), level);
            }
        }
    }

    fn scan_grid(&self, bus: &mut dyn PinAccess) {
        let snapshot = bus.snapshot();
        let kt = self.keypad_type;
        let idle = self.pull.idle_level();

        for c in 0..kt.columns() {
            let line = (0..kt.lines()).find(|&l| {
                kt.key_at(l, c)
                    .map_or(false, |key| self.pressed[key as usize])
            });
            let level = match line {
                Some(l) => snapshot.value(self.pins.get(l)),
                None => idle,
            };
            bus.set_pin(self.pins.get(kt.lines() + c), level);
        }
    }

    fn scan_direct(&mut self, bus: &mut dyn PinAccess) {
        let snapshot = bus.snapshot();
        let kt = self.keypad_type;

        for l in 0..kt.lines() {
            for c in 0..kt.columns() {
                let Some(key) = kt.key_at(l, c) else {
                    continue;
                };
                if !self.pressed[key as usize] {
                    continue;
                }
                let a = 2 * (l * kt.columns() + c);
                let level = snapshot.value(self.pins.get(a + 1));
                bus.set_pin(self.pins.get(a), level);
                self.active_key_index = Some(a);
            }
        }
    }

    fn slot_widget(slot: usize, prefix: &str) -> String {
        if slot < GRID_SLOTS {
            format!("{}{}", prefix, slot + 1)
        } else {
            format!("{}{}", prefix, slot + 5)
        }
    }

    /// Package pin number of a slot; pins 9-11 are VCC, GND and the pull select.
    fn package_pin(slot: usize) -> usize {
        if slot < GRID_SLOTS {
            slot + 1
        } else {
            slot + 4
        }
    }

    fn slot_label(&self, slot: usize) -> String {
        let kt = self.keypad_type;
        let pin = Self::package_pin(slot);
        if kt.is_grid() {
            if slot < kt.lines() {
                format!("P{} - L{}", pin, slot + 1)
            } else if slot < kt.used_slots() {
                format!("P{} - C{}", pin, slot - kt.lines() + 1)
            } else {
                format!("P{} - NC", pin)
            }
        } else if slot < kt.used_slots() {
            let key = slot / 2;
            let side = if slot % 2 == 0 { 'a' } else { 'b' };
            format!(
                "P{} L{}C{}{}",
                pin,
                key / kt.columns() + 1,
                key % kt.columns() + 1,
                side
            )
        } else {
            format!("P{} NC", pin)
        }
    }

    fn key_color(key: Key, pressed: bool) -> (u32, Rgb) {
        if pressed {
            (4, Rgb::new(255, 255, 0))
        } else if key.is_function_key() {
            (6, Rgb::new(190, 46, 37))
        } else {
            (6, Rgb::new(50, 118, 179))
        }
    }
}

impl Part for Keypad {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PartKind {
        PartKind::Keypad
    }

    fn pin_count(&self) -> usize {
        PIN_SLOTS
    }

    fn pins(&self) -> Vec<PinIndex> {
        self.pins.to_vec()
    }

    fn picture_file(&self) -> &'static str {
        self.keypad_type.picture_file()
    }

    fn map_file(&self) -> &'static str {
        self.keypad_type.map_file()
    }

    fn reset(&mut self, bus: &mut dyn PinAccess) {
        self.release_all();
        self.drive_idle(bus);
    }

    fn pre_process(&mut self, bus: &mut dyn PinAccess, _timing: &Timing) {
        self.drive_idle(bus);
    }

    fn process(&mut self, bus: &mut dyn PinAccess) {
        if !self.refresh.tick() {
            return;
        }
        if self.keypad_type.is_grid() {
            self.scan_grid(bus);
        } else {
            self.scan_direct(bus);
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

        if let Some(key) = Key::from_id(id) {
            let (width, color) = Self::key_color(key, out.value != 0);
            canvas.set_line_width(width);
            canvas.set_color(color);
            canvas.command(CanvasCmd::Rectangle {
                filled: false,
                x: out.area.x1 + 5.0,
                y: out.area.y1 + 5.0,
                width: out.area.width() - 10.0,
                height: out.area.height() - 10.0,
            });
            canvas.set_line_width(1);
            return;
        }

        if (OUT_L1..=OUT_C5).contains(&id.value()) {
            let mut slot = (id.value() - OUT_L1) as usize;
            // the 2x5 face has no L3/L4, its columns follow L2
            if self.keypad_type == KeypadType::Grid2x5 && slot > 1 {
                slot -= 2;
            }
            canvas.set_color(Rgb::new(49, 61, 99));
            canvas.fill_area(&out.area);
            canvas.set_fg_color(Rgb::new(255, 255, 255));
            let pin = self.pins.get(slot);
            let label = if pin.is_connected() {
                bus.pin_name(pin).unwrap_or_else(|| "NC".to_string())
            } else {
                "NC".to_string()
            };
            canvas.pin_label(&out.area, &label);
        }
    }

    fn on_mouse_press(&mut self, input: IoId, _x: f32, _y: f32) {
        if let Some(key) = Key::from_id(input) {
            self.press(key);
        }
    }

    fn on_mouse_release(&mut self, input: IoId, _x: f32, _y: f32) {
        if let Some(key) = Key::from_id(input) {
            self.release(key);
        }
    }

    fn on_key_press(&mut self, key: char) {
        if let Some(key) = Key::from_char(key) {
            self.press(key);
        }
    }

    fn on_key_release(&mut self, key: char) {
        if let Some(key) = Key::from_char(key) {
            self.release(key);
        }
    }

    fn write_preferences(&self) -> String {
        let pins = self.pins.to_bytes();
        let mut fields = Vec::with_capacity(PIN_SLOTS + 2);
        fields.extend_from_slice(&pins[..GRID_SLOTS]);
        fields.push(self.pull.to_byte());
        fields.push(self.keypad_type.to_byte());
        fields.extend_from_slice(&pins[GRID_SLOTS..]);
        format_fields(&fields)
    }

    fn read_preferences(&mut self, record: &str, bus: &mut dyn PinAccess) {
        let pins = self.pins.to_bytes();
        let mut fields = Vec::with_capacity(PIN_SLOTS + 2);
        fields.extend_from_slice(&pins[..GRID_SLOTS]);
        fields.push(self.pull.to_byte());
        fields.push(self.keypad_type.to_byte());
        fields.extend_from_slice(&pins[GRID_SLOTS..]);

        scan_fields(record, &mut fields);

        let mut pins = fields[..GRID_SLOTS].to_vec();
        pins.extend_from_slice(&fields[GRID_SLOTS + 2..]);
        self.pins.load_bytes(&pins);
        self.pull = Pull::from_byte(fields[GRID_SLOTS]);

        self.release_all();
        self.change_type(KeypadType::from_byte(fields[GRID_SLOTS + 1]));
        self.drive_idle(bus);
    }

    fn configure_properties_window(&self, window: &mut dyn PropertyWindow, bus: &dyn PinAccess) {
        let kt = self.keypad_type;

        for slot in 0..PIN_SLOTS {
            let combo = Self::slot_widget(slot, "combo");
            set_pin_combo(window, &combo, bus, self.pins.get(slot));
            window.set_enabled(&combo, slot < kt.used_slots());
            window.set_label(&Self::slot_widget(slot, "label"), &self.slot_label(slot));
        }

        window.set_combo_items("combo11", PULL_ITEMS);
        window.set_combo_text("combo11", self.pull.combo_name());

        window.set_combo_items("combo12", TYPE_ITEMS);
        window.set_combo_text("combo12", kt.combo_name());
    }

    fn read_properties_window(&mut self, window: &dyn PropertyWindow, _bus: &mut dyn PinAccess) {
        for slot in 0..PIN_SLOTS {
            let combo = Self::slot_widget(slot, "combo");
            let pin = read_pin_combo(window, &combo, self.pins.get(slot));
            self.pins.set(slot, pin);
        }

        if let Some(text) = window.combo_text("combo11") {
            self.pull = if text == "UP" { Pull::Up } else { Pull::Down };
        }
        if let Some(text) = window.combo_text("combo12") {
            self.change_type(KeypadType::from_combo(&text));
        }

        self.release_all();
    }

    fn combo_change(
        &mut self,
        combo: &str,
        value: &str,
        window: &mut dyn PropertyWindow,
        bus: &dyn PinAccess,
    ) {
        if combo == "combo12" {
            self.change_type(KeypadType::from_combo(value));
            self.configure_properties_window(window, bus);
        }
    }

    fn input_table(&self) -> IdTable {
        IdTable::new(&INPUT_IDS)
    }

    fn output_table(&self) -> IdTable {
        IdTable::new(&OUTPUT_IDS)
    }

    fn input_status(&self, id: IoId) -> Option<u8> {
        Key::from_id(id).map(|key| self.pressed[key as usize] as u8)
    }

    fn set_input_status(&mut self, id: IoId, value: u8) -> bool {
        match Key::from_id(id) {
            Some(key) => {
                self.set_key(key, value != 0);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::PinBus;
    use crate::properties::PropertySheet;

    fn grid_keypad(bus: &mut PinBus, record: &str) -> Keypad {
        let mut keypad = Keypad::new("keypad".to_string());
        keypad.read_preferences(record, bus);
        keypad
    }

    fn run_scan(keypad: &mut Keypad, bus: &mut PinBus) {
        // the first scan happens on the twelfth call
        for _ in 0..12 {
            keypad.process(bus);
        }
    }

    fn pin(n: u8) -> PinIndex {
        PinIndex::new(n)
    }

    #[test]
    fn test_defaults() {
        let keypad = Keypad::new("kp".to_string());
        assert_eq!(keypad.keypad_type(), KeypadType::Grid4x4);
        assert_eq!(keypad.pull(), Pull::Up);
        assert_eq!(keypad.pin_count(), 32);
        assert_eq!(keypad.picture_file(), "Keypad/keypad_4x4.svg");
        assert!(keypad.always_update());
    }

    #[test]
    fn test_type_clamp() {
        assert_eq!(KeypadType::from_byte(0), KeypadType::Grid4x4);
        assert_eq!(KeypadType::from_byte(7), KeypadType::Grid4x4);
        assert_eq!(KeypadType::from_byte(255), KeypadType::Grid4x4);
        assert_eq!(KeypadType::from_byte(5), KeypadType::Direct4x3);
        assert_eq!(KeypadType::from_combo("bogus"), KeypadType::Grid4x4);
        assert_eq!(KeypadType::from_combo("2x5_NG"), KeypadType::Direct2x5);
    }

    #[test]
    fn test_grid_scan_copies_line_to_column() {
        let mut bus = PinBus::new(20);
        let mut keypad = grid_keypad(&mut bus, "1,2,3,4,5,6,7,8,0,1");

        keypad.pre_process(&mut bus, &Timing::default());
        // firmware pulls line 2 low
        bus.set_pin(pin(2), PinValue::Low);
        keypad.press(Key::K5);
        run_scan(&mut keypad, &mut bus);

        assert_eq!(bus.pin_value(pin(5)), PinValue::High);
        assert_eq!(bus.pin_value(pin(6)), PinValue::Low);
        assert_eq!(bus.pin_value(pin(7)), PinValue::High);
        assert_eq!(bus.pin_value(pin(8)), PinValue::High);
        // lines are never written by the scan
        assert_eq!(bus.pin_value(pin(2)), PinValue::Low);
    }

    #[test]
    fn test_grid_scan_first_line_wins() {
        let mut bus = PinBus::new(20);
        let mut keypad = grid_keypad(&mut bus, "1,2,3,4,5,6,7,8,0,1");

        bus.set_pin(pin(1), PinValue::High);
        bus.set_pin(pin(3), PinValue::Low);
        keypad.press(Key::K1);
        keypad.press(Key::K7);
        run_scan(&mut keypad, &mut bus);

        assert_eq!(bus.pin_value(pin(5)), PinValue::High);
    }

    #[test]
    fn test_no_scan_before_threshold() {
        let mut bus = PinBus::new(20);
        let mut keypad = grid_keypad(&mut bus, "1,2,3,4,5,6,7,8,0,1");
        bus.set_pin(pin(1), PinValue::Low);
        keypad.press(Key::K1);

        for _ in 0..11 {
            keypad.process(&mut bus);
        }
        assert_eq!(bus.pin_value(pin(5)), PinValue::High);

        keypad.process(&mut bus);
        assert_eq!(bus.pin_value(pin(5)), PinValue::Low);
    }

    #[test]
    fn test_pull_down_idle() {
        let mut bus = PinBus::new(20);
        let mut keypad = grid_keypad(&mut bus, "1,2,3,4,5,6,7,8,1,1");
        assert_eq!(keypad.pull(), Pull::Down);
        for n in 1..=8 {
            assert_eq!(bus.pin_value(pin(n)), PinValue::Low);
        }

        bus.set_pin(pin(5), PinValue::High);
        run_scan(&mut keypad, &mut bus);
        assert_eq!(bus.pin_value(pin(5)), PinValue::Low);
    }

    #[test]
    fn test_2x5_layout() {
        let mut bus = PinBus::new(20);
        let mut keypad = grid_keypad(&mut bus, "1,2,3,4,5,6,7,0,0,3");
        assert_eq!(keypad.keypad_type(), KeypadType::Grid2x5);

        bus.set_pin(pin(2), PinValue::Low);
        keypad.press(Key::K9);
        run_scan(&mut keypad, &mut bus);

        // K9 is line 2, column 4 -> slot 2 + 3
        assert_eq!(bus.pin_value(pin(6)), PinValue::Low);
        assert_eq!(bus.pin_value(pin(3)), PinValue::High);
        // keys outside the face do nothing
        assert_eq!(KeypadType::Grid2x5.key_at(0, 5), None);
    }

    #[test]
    fn test_4x3_ignores_fourth_column() {
        let mut bus = PinBus::new(20);
        let mut keypad = grid_keypad(&mut bus, "1,2,3,4,5,6,7,8,0,2");
        bus.set_pin(pin(1), PinValue::Low);
        bus.set_pin(pin(8), PinValue::High);
        keypad.press(Key::KA);
        run_scan(&mut keypad, &mut bus);
        assert_eq!(bus.pin_value(pin(8)), PinValue::High);
    }

    #[test]
    fn test_direct_scan_mirrors_b_into_a() {
        let mut bus = PinBus::new(40);
        let record = "1,2,3,4,5,6,7,8,0,4,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24,25,26,27,28,29,30,31,32";
        let mut keypad = grid_keypad(&mut bus, record);
        assert_eq!(keypad.keypad_type(), KeypadType::Direct4x4);

        // K6 is line 2, column 3 -> key 6, slots 12/13 -> pins 13/14
        bus.set_pin(pin(14), PinValue::Low);
        keypad.press(Key::K6);
        run_scan(&mut keypad, &mut bus);

        assert_eq!(bus.pin_value(pin(13)), PinValue::Low);
        assert_eq!(keypad.active_key_index(), Some(12));
        assert_eq!(bus.pin_value(pin(1)), PinValue::High);
    }

    #[test]
    fn test_direct_4x3_is_dense() {
        let mut bus = PinBus::new(40);
        let record = "1,2,3,4,5,6,7,8,0,5,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24,25,26,27,28,29,30,31,32";
        let mut keypad = grid_keypad(&mut bus, record);

        // '#' is line 4, column 3 -> key 11, slots 22/23
        bus.set_pin(pin(24), PinValue::Low);
        keypad.press(Key::Hash);
        run_scan(&mut keypad, &mut bus);
        assert_eq!(bus.pin_value(pin(23)), PinValue::Low);
    }

    #[test]
    fn test_nc_pins_untouched() {
        let mut bus = PinBus::new(8);
        let mut keypad = Keypad::new("kp".to_string());
        keypad.pre_process(&mut bus, &Timing::default());
        keypad.press(Key::K1);
        run_scan(&mut keypad, &mut bus);
        assert!(bus.iter().all(|(_, p)| p.read() == PinValue::Low));
    }

    #[test]
    fn test_press_release_outputs() {
        let mut keypad = Keypad::new("kp".to_string());
        for out in keypad.outputs_mut() {
            out.update = false;
        }

        keypad.on_mouse_press(Key::K0.id(), 0.0, 0.0);
        assert!(keypad.is_pressed(Key::K0));
        assert_eq!(keypad.outputs()[13].value, 1);
        assert!(keypad.outputs()[13].update);
        assert_eq!(keypad.output_status(IoId::new(13)), Some(1));

        keypad.on_mouse_release(Key::K0.id(), 0.0, 0.0);
        assert_eq!(keypad.input_status(Key::K0.id()), Some(0));
        assert_eq!(keypad.outputs()[13].value, 0);
    }

    #[test]
    fn test_keyboard_shortcuts() {
        let mut keypad = Keypad::new("kp".to_string());
        keypad.on_key_press('#');
        assert!(keypad.is_pressed(Key::Hash));
        keypad.on_key_release('#');
        assert!(!keypad.is_pressed(Key::Hash));
        keypad.on_key_press('x');
        assert!(Key::ALL.iter().all(|k| !keypad.is_pressed(*k)));
    }

    #[test]
    fn test_ids() {
        let keypad = Keypad::new("kp".to_string());
        assert_eq!(keypad.input_id("KB_a"), IoId::new(12));
        assert_eq!(keypad.input_id("PN_L1"), IoId::INVALID);
        assert_eq!(keypad.output_id("PN_C5"), IoId::new(24));
        assert_eq!(keypad.output_id("KB_D"), IoId::new(15));
        assert_eq!(keypad.output_id("KB_X"), IoId::INVALID);
    }

    #[test]
    fn test_preferences_round_trip() {
        let mut bus = PinBus::new(40);
        let record = "3,4,5,6,7,8,9,10,1,6";
        let keypad = grid_keypad(&mut bus, record);
        let written = keypad.write_preferences();
        assert_eq!(written, format!("{}{}", record, ",0".repeat(24)));

        let mut copy = Keypad::new("copy".to_string());
        copy.read_preferences(&written, &mut bus);
        assert_eq!(copy.pins(), keypad.pins());
        assert_eq!(copy.keypad_type(), KeypadType::Direct2x5);
        assert_eq!(copy.pull(), Pull::Down);
    }

    #[test]
    fn test_short_record_keeps_prior_values() {
        let mut bus = PinBus::new(40);
        let mut keypad = grid_keypad(&mut bus, "1,2,3,4,5,6,7,8,0,3");
        keypad.read_preferences("9,9,oops", &mut bus);
        assert_eq!(keypad.pin(0), pin(9));
        assert_eq!(keypad.pin(1), pin(9));
        assert_eq!(keypad.pin(2), pin(3));
        assert_eq!(keypad.keypad_type(), KeypadType::Grid2x5);
    }

    #[test]
    fn test_read_preferences_releases_keys() {
        let mut bus = PinBus::new(20);
        let mut keypad = Keypad::new("kp".to_string());
        keypad.press(Key::K2);
        keypad.read_preferences("1,2,3,4,5,6,7,8,0,1", &mut bus);
        assert!(!keypad.is_pressed(Key::K2));
    }

    #[test]
    fn test_properties_window() {
        let mut bus = PinBus::new(20);
        let mut keypad = grid_keypad(&mut bus, "1,2,3,4,5,6,7,0,0,2");
        let mut sheet = PropertySheet::new();
        keypad.configure_properties_window(&mut sheet, &bus);

        assert_eq!(sheet.text("combo12"), Some("4x3"));
        assert_eq!(sheet.text("combo11"), Some("UP"));
        assert_eq!(sheet.text("label8"), Some("P8 - NC"));
        assert_eq!(sheet.text("label5"), Some("P5 - C1"));
        assert_eq!(sheet.text("label13"), Some("P12 - NC"));
        assert!(sheet.is_enabled("combo7"));
        assert!(!sheet.is_enabled("combo8"));
        assert!(!sheet.is_enabled("combo13"));

        keypad.combo_change("combo12", "4x4_NG", &mut sheet, &bus);
        assert_eq!(keypad.keypad_type(), KeypadType::Direct4x4);
        assert_eq!(sheet.text("label8"), Some("P8 L1C4b"));
        assert_eq!(sheet.text("label13"), Some("P12 L2C1a"));
        assert_eq!(sheet.text("label36"), Some("P35 L4C4b"));
        assert!(sheet.is_enabled("combo36"));

        sheet.set_combo_text("combo11", "DOWN");
        sheet.set_combo_text("combo1", "12 P12");
        keypad.press(Key::K1);
        keypad.read_properties_window(&sheet, &mut bus);
        assert_eq!(keypad.pull(), Pull::Down);
        assert_eq!(keypad.pin(0), pin(12));
        assert!(!keypad.is_pressed(Key::K1));
    }

    #[test]
    fn test_draw_pin_labels_and_keys() {
        let bus = PinBus::with_names(&["RB0", "RB1"]);
        let mut keypad = Keypad::new("kp".to_string());
        keypad.set_pin(0, pin(2));

        let mut canvas: Vec<CanvasCmd> = Vec::new();
        keypad.draw_output(IoId::new(16), &bus, &mut canvas);
        assert!(canvas.iter().any(
            |cmd| matches!(cmd, CanvasCmd::RotatedText { text, .. } if text == "RB1")
        ));

        canvas.clear();
        keypad.draw_output(IoId::new(17), &bus, &mut canvas);
        assert!(canvas.iter().any(
            |cmd| matches!(cmd, CanvasCmd::RotatedText { text, .. } if text == "NC")
        ));

        canvas.clear();
        keypad.press(Key::KD);
        keypad.draw_output(Key::KD.id(), &bus, &mut canvas);
        assert_eq!(canvas[0], CanvasCmd::SetLineWidth(4));
        assert_eq!(canvas[1], CanvasCmd::SetColor(Rgb::new(255, 255, 0)));
    }
}
