//! Property-window sink.
//!
//! Parts describe their configuration dialog through named widgets
//! (`comboN`, `labelN`). Pin selectors are combos whose text is either
//! `"<index> <pin name>"` or `"NC"`.

use std::collections::HashMap;

use crate::bus::PinAccess;
use crate::types::PinIndex;

pub trait PropertyWindow {
    /// Comma-terminated item list, e.g. `"UP,DOWN,"`.
    fn set_combo_items(&mut self, combo: &str, items: &str);
    fn set_combo_text(&mut self, combo: &str, text: &str);
    fn combo_text(&self, combo: &str) -> Option<String>;
    fn set_enabled(&mut self, widget: &str, enabled: bool);
    fn set_label(&mut self, label: &str, text: &str);
}

/// Combo text for a pin selector.
pub fn pin_combo_text(bus: &dyn PinAccess, pin: PinIndex) -> String {
    match bus.pin_name(pin) {
        Some(name) if pin.is_connected() => format!("{} {}", pin.value(), name),
        _ => "NC".to_string(),
    }
}

/// Parse a pin selector back into an index. Anything unparsable is NC.
pub fn parse_pin_combo(text: &str) -> PinIndex {
    text.split_whitespace()
        .next()
        .and_then(|field| field.parse::<u8>().ok())
        .map(PinIndex::new)
        .unwrap_or(PinIndex::NC)
}

/// Fill a pin selector with every bus pin and select `pin`.
pub fn set_pin_combo(window: &mut dyn PropertyWindow, combo: &str, bus: &dyn PinAccess, pin: PinIndex) {
    let mut items = String::from("NC,");
    for index in (1..=u8::MAX).take(bus.pin_count()).map(PinIndex::new) {
        items.push_str(&pin_combo_text(bus, index));
        items.push(',');
    }
    window.set_combo_items(combo, &items);
    window.set_combo_text(combo, &pin_combo_text(bus, pin));
}

/// Read a pin selector; a missing widget keeps `current`.
pub fn read_pin_combo(window: &dyn PropertyWindow, combo: &str, current: PinIndex) -> PinIndex {
    window
        .combo_text(combo)
        .map(|text| parse_pin_combo(&text))
        .unwrap_or(current)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Widget {
    pub items: Vec<String>,
    pub text: String,
    pub enabled: bool,
}

/// In-memory property window used by hosts without a GUI and by tests.
#[derive(Debug, Clone, Default)]
pub struct PropertySheet {
    widgets: HashMap<String, Widget>,
}

impl PropertySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn widget(&self, name: &str) -> Option<&Widget> {
        self.widgets.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.widgets.get(name).map(|w| w.text.as_str())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.widgets.get(name).map_or(false, |w| w.enabled)
    }

    fn entry(&mut self, name: &str) -> &mut Widget {
        self.widgets.entry(name.to_string()).or_insert_with(|| Widget {
            enabled: true,
            ..Widget::default()
        })
    }
}

impl PropertyWindow for PropertySheet {
    fn set_combo_items(&mut self, combo: &str, items: &str) {
        self.entry(combo).items = items
            .split(',')
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
    }

    fn set_combo_text(&mut self, combo: &str, text: &str) {
        self.entry(combo).text = text.to_string();
    }

    fn combo_text(&self, combo: &str) -> Option<String> {
        self.widgets.get(combo).map(|w| w.text.clone())
    }

    fn set_enabled(&mut self, widget: &str, enabled: bool) {
        self.entry(widget).enabled = enabled;
    }

    fn set_label(&mut self, label: &str, text: &str) {
        self.entry(label).text = text.to_string();
    }
}
