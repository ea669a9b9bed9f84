//! LM35 analog temperature sensor with a slider to set the temperature.

use crate::bus::PinAccess;
use crate::component::{OutputState, Part, PartKind};
use crate::connection::PinMap;
use crate::draw::{Canvas, CanvasCmd, OutputArea, Rgb};
use crate::preferences::{format_fields, scan_fields};
use crate::properties::{read_pin_combo, set_pin_combo, PropertyWindow};
use crate::remote::IdTable;
use crate::types::{IoId, PinIndex};

const OUT_PIN: usize = 0;
const OUT_VCC: usize = 1;
const OUT_GND: usize = 2;
const OUT_SLIDER: usize = 3;

const IN_SLIDER: u16 = 0;

pub const SLIDER_MAX: u8 = 200;

static INPUT_IDS: [(&str, u16); 1] = [("PO_1", 0)];

static OUTPUT_IDS: [(&str, u16); 4] = [("PN_1", 0), ("PN_F1", 1), ("PN_F2", 2), ("PO_1", 3)];

pub struct Lm35 {
    name: String,
    pins: PinMap,
    value: u8,
    dragging: bool,
    outputs: Vec<OutputState>,
}

impl Lm35 {
    pub fn new(name: String) -> Self {
        let outputs = vec![
            OutputState::new(OutputArea::new(0.0, 80.0, 12.0, 120.0)),
            OutputState::new(OutputArea::new(14.0, 80.0, 26.0, 120.0)),
            OutputState::new(OutputArea::new(28.0, 80.0, 40.0, 120.0)),
            OutputState::new(OutputArea::new(50.0, 0.0, 70.0, 121.0)),
        ];

        Lm35 {
            name,
            pins: PinMap::new(1),
            value: 0,
            dragging: false,
            outputs,
        }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn set_value(&mut self, value: u8) {
        self.value = value.min(SLIDER_MAX);
        self.outputs[OUT_SLIDER].update = true;
    }

    pub fn set_output_pin(&mut self, pin: PinIndex) {
        self.pins.set(0, pin);
    }

    /// Degrees Celsius for the current slider position.
    pub fn temperature(&self) -> f32 {
        0.74 * SLIDER_MAX.saturating_sub(self.value) as f32 + 2.0
    }

    /// Sensor output in volts (10 mV/°C).
    pub fn voltage(&self) -> f32 {
        0.0074 * SLIDER_MAX.saturating_sub(self.value) as f32 + 0.02
    }

    fn slider_from_y(&mut self, y: f32) {
        let top = self.outputs[OUT_SLIDER].area.y1;
        let pos = ((y - top).max(0.0) * 1.66) as u32;
        self.set_value(pos.min(SLIDER_MAX as u32) as u8);
    }
}

impl Part for Lm35 {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PartKind {
        PartKind::Lm35
    }

    fn pin_count(&self) -> usize {
        1
    }

    fn pins(&self) -> Vec<PinIndex> {
        self.pins.to_vec()
    }

    fn picture_file(&self) -> &'static str {
        "LM35/part.svg"
    }

    fn map_file(&self) -> &'static str {
        "LM35/part.map"
    }

    fn post_process(&mut self, bus: &mut dyn PinAccess) {
        let pin = self.pins.get(0);
        if pin.is_connected() {
            bus.set_analog_pin(pin, self.voltage());
        }
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

        match id.value() as usize {
            OUT_PIN => {
                canvas.set_color(Rgb::new(49, 61, 99));
                canvas.fill_area(&out.area);
                canvas.set_fg_color(Rgb::new(255, 255, 255));
                let pin = self.pins.get(0);
                let label = bus
                    .pin_name(pin)
                    .filter(|_| pin.is_connected())
                    .unwrap_or_else(|| "NC".to_string());
                canvas.pin_label(&out.area, &label);
            }
            OUT_VCC | OUT_GND => {
                canvas.set_color(Rgb::new(49, 61, 99));
                canvas.fill_area(&out.area);
                canvas.set_fg_color(Rgb::new(155, 155, 155));
                let label = if id.value() as usize == OUT_VCC { "+5V" } else { "GND" };
                canvas.pin_label(&out.area, label);
            }
            OUT_SLIDER => {
                canvas.set_color(Rgb::new(17, 17, 17));
                canvas.fill_area(&out.area);
                let knob = out.area.y1 + self.value as f32 / 1.66;
                canvas.set_color(Rgb::new(200, 200, 200));
                canvas.command(CanvasCmd::Rectangle {
                    filled: true,
                    x: out.area.x1,
                    y: knob,
                    width: out.area.width(),
                    height: 7.0,
                });
                canvas.command(CanvasCmd::SetFontSize(9));
                canvas.set_fg_color(Rgb::new(255, 255, 255));
                canvas.command(CanvasCmd::RotatedText {
                    text: format!("{:5.1}", self.temperature()),
                    x: out.area.x1,
                    y: out.area.y2,
                    angle: 0.0,
                });
            }
            _ => {}
        }
    }

    fn on_mouse_press(&mut self, input: IoId, _x: f32, y: f32) {
        if input.value() == IN_SLIDER {
            self.slider_from_y(y);
            self.dragging = true;
        }
    }

    fn on_mouse_release(&mut self, input: IoId, _x: f32, _y: f32) {
        if input.value() == IN_SLIDER {
            self.dragging = false;
            self.outputs[OUT_SLIDER].update = true;
        }
    }

    fn on_mouse_move(&mut self, input: IoId, _x: f32, y: f32) {
        if input.value() != IN_SLIDER {
            self.dragging = false;
        } else if self.dragging {
            self.slider_from_y(y);
        }
    }

    fn write_preferences(&self) -> String {
        format_fields(&[self.pins.get(0).value(), self.value])
    }

    fn read_preferences(&mut self, record: &str, _bus: &mut dyn PinAccess) {
        let mut fields = [self.pins.get(0).value(), self.value];
        scan_fields(record, &mut fields);
        self.pins.load_bytes(&fields[..1]);
        self.set_value(fields[1]);
    }

    fn configure_properties_window(&self, window: &mut dyn PropertyWindow, bus: &dyn PinAccess) {
        set_pin_combo(window, "combo2", bus, self.pins.get(0));
    }

    fn read_properties_window(&mut self, window: &dyn PropertyWindow, _bus: &mut dyn PinAccess) {
        let pin = read_pin_combo(window, "combo2", self.pins.get(0));
        self.pins.set(0, pin);
    }

    fn input_table(&self) -> IdTable {
        IdTable::new(&INPUT_IDS)
    }

    fn output_table(&self) -> IdTable {
        IdTable::new(&OUTPUT_IDS)
    }

    fn input_status(&self, id: IoId) -> Option<u8> {
        (id.value() == IN_SLIDER).then_some(self.value)
    }

    fn set_input_status(&mut self, id: IoId, value: u8) -> bool {
        if id.value() != IN_SLIDER {
            return false;
        }
        self.set_value(value);
        true
    }
}
