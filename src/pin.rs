use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinValue {
    Low,
    High,
}

impl PinValue {
    pub fn to_str(&self) -> &'static str {
        match self {
            PinValue::Low => "Low",
            PinValue::High => "High",
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            PinValue::Low => '0',
            PinValue::High => '1',
        }
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            PinValue::High
        } else {
            PinValue::Low
        }
    }

    pub fn is_high(&self) -> bool {
        *self == PinValue::High
    }

    pub fn is_low(&self) -> bool {
        *self == PinValue::Low
    }

    pub fn inverted(&self) -> Self {
        match self {
            PinValue::Low => PinValue::High,
            PinValue::High => PinValue::Low,
        }
    }
}

impl Default for PinValue {
    fn default() -> Self {
        PinValue::Low
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

/// One entry of the pin bus.
#[derive(Debug, Clone)]
pub struct Pin {
    name: String,
    value: PinValue,
    analog: f32,
    direction: PinDirection,
    pull: Option<PinValue>,
    registered_io: bool,
}

impl Pin {
    pub fn new(name: String) -> Self {
        Pin {
            name,
            value: PinValue::Low,
            analog: 0.0,
            direction: PinDirection::Input,
            pull: None,
            registered_io: false,
        }
    }

    /// A pin allocated on demand by a part (latch outputs and similar).
    pub fn new_io(name: String) -> Self {
        Pin {
            direction: PinDirection::Output,
            registered_io: true,
            ..Pin::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read(&self) -> PinValue {
        self.value
    }

    pub fn analog(&self) -> f32 {
        self.analog
    }

    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    pub fn pull(&self) -> Option<PinValue> {
        self.pull
    }

    pub fn is_registered_io(&self) -> bool {
        self.registered_io
    }

    pub fn set_direction(&mut self, direction: PinDirection) {
        self.direction = direction;
    }

    /// Drive the digital level; the analog level follows at logic rails.
    pub fn drive(&mut self, value: PinValue) {
        self.value = value;
        self.analog = if value.is_high() { 5.0 } else { 0.0 };
    }

    /// Drive an analog voltage; the digital level follows a mid-rail threshold.
    pub fn drive_analog(&mut self, volts: f32) {
        self.analog = volts;
        self.value = PinValue::from_bool(volts > 2.5);
    }

    /// Record the pull resistor level. An input pin settles to it immediately.
    pub fn set_pull(&mut self, level: PinValue) {
        self.pull = Some(level);
        if self.direction == PinDirection::Input {
            self.drive(level);
        }
    }
}

impl Default for Pin {
    fn default() -> Self {
        Pin::new("unnamed".to_string())
    }
}

impl fmt::Display for PinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)?;

        if let Some(pull) = self.pull {
            write!(f, " [pull {}]", pull.to_char())?;
        }

        if self.direction == PinDirection::Output {
            write!(f, " (out)")?;
        }

        Ok(())
    }
}
