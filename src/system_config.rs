//! # JSON Workbench Configuration
//!
//! Workbenches are described in JSON files and assembled by a `PartFactory`.
//!
//! ## Key Features
//!
//! - **JSON bench definition**: board pins, timing, rx buffer size and parts
//! - **Part factory**: constructor registry keyed by `PartKind`
//! - **Preference records**: each part entry carries the same comma-separated
//!   record the part writes with `write_preferences`
//! - **Round trip**: a running bench can be written back out as configuration
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rusty_parts::system_config::PartFactory;
//!
//! let factory = PartFactory::new();
//! let bench = factory.create_from_json("configs/keypad_display.json").expect("Could not create bench!");
//! println!("Created bench: {} with {} parts", bench.name(), bench.part_count());
//! ```
//!
//! ## Configuration File Format
//!
//! ```json
//! {
//!   "name": "KeypadBench",
//!   "description": "4x4 keypad on port B",
//!   "pins": ["RB0", "RB1", "RB2", "RB3", "RB4", "RB5", "RB6", "RB7"],
//!   "timing": {"jump_steps": 100, "clocks_per_instruction": 4},
//!   "rx_capacity": 50000,
//!   "parts": [
//!     {"kind": "keypad", "name": "keys", "preferences": "1,2,3,4,5,6,7,8"}
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::bus::{PinAccess, PinBus};
use crate::component::{Part, PartKind};
use crate::components::{HpDisplayLatch, Keypad, Lm35, SevenSegmentDisplay};
use crate::devices::rx_buffer::{RxBuffer, DEFAULT_CAPACITY};
use crate::systems::Workbench;
use crate::types::{Timing, MAX_PINS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown part kind: {0}")]
    UnknownPart(String),
    #[error("Duplicate part name: {0}")]
    DuplicatePart(String),
    #[error("Bench '{0}' has no board pins")]
    NoPins(String),
    #[error("Bench '{name}' has {count} board pins, at most {max} are addressable")]
    TooManyPins {
        name: String,
        count: usize,
        max: usize,
    },
}

/// Board pins, either as a count (named `P1..Pn`) or as explicit names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PinsConfig {
    Count(usize),
    Names(Vec<String>),
}

impl PinsConfig {
    pub fn len(&self) -> usize {
        match self {
            PinsConfig::Count(count) => *count,
            PinsConfig::Names(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build_bus(&self) -> PinBus {
        match self {
            PinsConfig::Count(count) => PinBus::new(*count),
            PinsConfig::Names(names) => PinBus::with_names(names),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartConfig {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub preferences: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbenchConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub pins: PinsConfig,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default = "default_rx_capacity")]
    pub rx_capacity: usize,
    #[serde(default)]
    pub parts: Vec<PartConfig>,
}

fn default_rx_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl WorkbenchConfig {
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Capture a running bench, with every part's current preferences.
    /// Board pin names are kept; IO pins registered by parts are not.
    pub fn from_workbench(bench: &Workbench) -> Self {
        let bus = bench.bus();
        let names = bus
            .iter()
            .take(bus.board_pin_count())
            .map(|(_, pin)| pin.name().to_string())
            .collect();

        WorkbenchConfig {
            name: bench.name().to_string(),
            description: bench.description().to_string(),
            pins: PinsConfig::Names(names),
            timing: bench.timing(),
            rx_capacity: bench.rx().capacity(),
            parts: bench
                .parts()
                .map(|part| PartConfig {
                    kind: part.kind().as_str().to_string(),
                    name: part.name().to_string(),
                    preferences: part.write_preferences(),
                })
                .collect(),
        }
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

/// Builds a part. Parts that own IO pins register them on `bus`.
pub type PartConstructor = fn(name: String, bus: &mut dyn PinAccess) -> Box<dyn Part>;

/// Part factory for creating workbenches from JSON configuration
#[derive(Debug)]
pub struct PartFactory {
    part_registry: HashMap<PartKind, PartConstructor>,
}

impl PartFactory {
    pub fn new() -> Self {
        let mut factory = PartFactory {
            part_registry: HashMap::new(),
        };
        factory.register_default_parts();
        factory
    }

    fn register_default_parts(&mut self) {
        self.register(PartKind::Keypad, |name, _bus| Box::new(Keypad::new(name)));
        self.register(PartKind::SevenSegmentDisplay, |name, _bus| {
            Box::new(SevenSegmentDisplay::new(name))
        });
        self.register(PartKind::HpDisplayLatch, |name, bus| {
            Box::new(HpDisplayLatch::new(name, bus))
        });
        self.register(PartKind::Lm35, |name, _bus| Box::new(Lm35::new(name)));
    }

    /// Add or replace the constructor for `kind`.
    pub fn register(&mut self, kind: PartKind, constructor: PartConstructor) {
        self.part_registry.insert(kind, constructor);
    }

    pub fn is_registered(&self, kind: PartKind) -> bool {
        self.part_registry.contains_key(&kind)
    }

    pub fn create_part(
        &self,
        kind: &str,
        name: String,
        bus: &mut dyn PinAccess,
    ) -> Result<Box<dyn Part>, ConfigError> {
        let constructor = kind
            .parse::<PartKind>()
            .ok()
            .and_then(|kind| self.part_registry.get(&kind))
            .ok_or_else(|| ConfigError::UnknownPart(kind.to_string()))?;
        Ok(constructor(name, bus))
    }

    pub fn create_from_json(&self, json_path: impl AsRef<Path>) -> Result<Workbench, ConfigError> {
        let path = json_path.as_ref();
        let config = WorkbenchConfig::load(path)?;
        info!("loaded bench '{}' from {}", config.name, path.display());
        self.build(&config)
    }

    pub fn create_from_str(&self, content: &str) -> Result<Workbench, ConfigError> {
        self.build(&WorkbenchConfig::from_json_str(content)?)
    }

    pub fn build(&self, config: &WorkbenchConfig) -> Result<Workbench, ConfigError> {
        if config.pins.is_empty() {
            return Err(ConfigError::NoPins(config.name.clone()));
        }
        if config.pins.len() > MAX_PINS {
            return Err(ConfigError::TooManyPins {
                name: config.name.clone(),
                count: config.pins.len(),
                max: MAX_PINS,
            });
        }

        let mut bench = Workbench::new(config.name.clone(), config.pins.build_bus(), config.timing)
            .with_description(config.description.clone())
            .with_rx_buffer(RxBuffer::new(config.rx_capacity));

        for part_config in &config.parts {
            if bench.find_part(&part_config.name).is_some() {
                return Err(ConfigError::DuplicatePart(part_config.name.clone()));
            }

            let mut part =
                self.create_part(&part_config.kind, part_config.name.clone(), bench.bus_mut())?;
            if !part_config.preferences.is_empty() {
                part.read_preferences(&part_config.preferences, bench.bus_mut());
            }
            debug!("{} '{}' configured", part_config.kind, part_config.name);
            bench.add_part(part);
        }

        Ok(bench)
    }
}

impl Default for PartFactory {
    fn default() -> Self {
        Self::new()
    }
}
