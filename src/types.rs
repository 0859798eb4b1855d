use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HvacMode {
    Off,
    Heat,
    Cool,
    HeatCool,
    Auto,
    Dry,
    FanOnly,
    /// Some units swap the "auto" and "fan_only" codes.
    AutoFanOnly,
    FanOnlyAuto,
}

impl HvacMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HvacMode::Off => "off",
            HvacMode::Heat => "heat",
            HvacMode::Cool => "cool",
            HvacMode::HeatCool => "heat_cool",
            HvacMode::Auto => "auto",
            HvacMode::Dry => "dry",
            HvacMode::FanOnly => "fan_only",
            HvacMode::AutoFanOnly => "auto_fan_only",
            HvacMode::FanOnlyAuto => "fan_only_auto",
        }
    }

    pub fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "off" => Some(HvacMode::Off),
            "heat" => Some(HvacMode::Heat),
            "cool" => Some(HvacMode::Cool),
            "heat_cool" => Some(HvacMode::HeatCool),
            "auto" => Some(HvacMode::Auto),
            "dry" => Some(HvacMode::Dry),
            "fan_only" => Some(HvacMode::FanOnly),
            "auto_fan_only" => Some(HvacMode::AutoFanOnly),
            "fan_only_auto" => Some(HvacMode::FanOnlyAuto),
            _ => None,
        }
    }

    pub fn is_off(&self) -> bool {
        *self == HvacMode::Off
    }

    pub fn action(&self) -> HvacAction {
        match self {
            HvacMode::Off => HvacAction::Off,
            HvacMode::Heat => HvacAction::Heating,
            HvacMode::Cool => HvacAction::Cooling,
            HvacMode::Dry => HvacAction::Drying,
            HvacMode::FanOnly => HvacAction::Fan,
            _ => HvacAction::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvacAction {
    Off,
    Heating,
    Cooling,
    Drying,
    Fan,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanSpeed {
    Auto,
    Min,
    Low,
    Medium,
    High,
    Max,
    /// Reported as "max" by relabeled units, but really their high setting.
    MaxHigh,
    /// Reported as "auto" by relabeled units, but really their max setting.
    AutoMax,
}

impl FanSpeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            FanSpeed::Auto => "auto",
            FanSpeed::Min => "min",
            FanSpeed::Low => "low",
            FanSpeed::Medium => "medium",
            FanSpeed::High => "high",
            FanSpeed::Max => "max",
            FanSpeed::MaxHigh => "max_high",
            FanSpeed::AutoMax => "auto_max",
        }
    }

    pub fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(FanSpeed::Auto),
            "min" => Some(FanSpeed::Min),
            "low" => Some(FanSpeed::Low),
            "medium" => Some(FanSpeed::Medium),
            "high" => Some(FanSpeed::High),
            "max" => Some(FanSpeed::Max),
            "max_high" => Some(FanSpeed::MaxHigh),
            "auto_max" => Some(FanSpeed::AutoMax),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingMode {
    Off,
    Vertical,
    Horizontal,
    Both,
}

impl SwingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwingMode::Off => "off",
            SwingMode::Vertical => "vertical",
            SwingMode::Horizontal => "horizontal",
            SwingMode::Both => "both",
        }
    }

    pub fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "off" => Some(SwingMode::Off),
            "vertical" => Some(SwingMode::Vertical),
            "horizontal" => Some(SwingMode::Horizontal),
            "both" => Some(SwingMode::Both),
            _ => None,
        }
    }

    /// Derives the swing summary from the two louver positions. An axis counts
    /// as sweeping only when its position is `auto`.
    pub fn from_positions(vertical: VerticalPosition, horizontal: HorizontalPosition) -> Self {
        if vertical == VerticalPosition::Auto {
            if horizontal == HorizontalPosition::Auto {
                SwingMode::Both
            } else {
                SwingMode::Vertical
            }
        } else if horizontal == HorizontalPosition::Auto {
            SwingMode::Horizontal
        } else {
            SwingMode::Off
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalPosition {
    Off,
    Highest,
    High,
    Middle,
    Low,
    Lowest,
    Auto,
}

impl VerticalPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerticalPosition::Off => "off",
            VerticalPosition::Highest => "highest",
            VerticalPosition::High => "high",
            VerticalPosition::Middle => "middle",
            VerticalPosition::Low => "low",
            VerticalPosition::Lowest => "lowest",
            VerticalPosition::Auto => "auto",
        }
    }

    pub fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "off" => Some(VerticalPosition::Off),
            "highest" => Some(VerticalPosition::Highest),
            "high" => Some(VerticalPosition::High),
            "middle" => Some(VerticalPosition::Middle),
            "low" => Some(VerticalPosition::Low),
            "lowest" => Some(VerticalPosition::Lowest),
            "auto" => Some(VerticalPosition::Auto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalPosition {
    Off,
    MaxLeft,
    Left,
    Center,
    Right,
    MaxRight,
    Auto,
}

impl HorizontalPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            HorizontalPosition::Off => "off",
            HorizontalPosition::MaxLeft => "maxleft",
            HorizontalPosition::Left => "left",
            HorizontalPosition::Center => "center",
            HorizontalPosition::Right => "right",
            HorizontalPosition::MaxRight => "maxright",
            HorizontalPosition::Auto => "auto",
        }
    }

    pub fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "off" => Some(HorizontalPosition::Off),
            "maxleft" => Some(HorizontalPosition::MaxLeft),
            "left" => Some(HorizontalPosition::Left),
            "center" => Some(HorizontalPosition::Center),
            "right" => Some(HorizontalPosition::Right),
            "maxright" => Some(HorizontalPosition::MaxRight),
            "auto" => Some(HorizontalPosition::Auto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Power {
    On,
    Off,
}

impl Power {
    pub fn as_str(&self) -> &'static str {
        match self {
            Power::On => "on",
            Power::Off => "off",
        }
    }

    pub fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "on" => Some(Power::On),
            "off" => Some(Power::Off),
            _ => None,
        }
    }
}

/// Target temperature step. Deserialises from the numeric step value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum Precision {
    #[default]
    Whole,
    Halves,
    Tenths,
}

impl Precision {
    pub fn step(&self) -> f64 {
        match self {
            Precision::Whole => 1.0,
            Precision::Halves => 0.5,
            Precision::Tenths => 0.1,
        }
    }

    /// Round half away from zero to the nearest step.
    pub fn quantize(&self, value: f64) -> f64 {
        match self {
            Precision::Whole => value.round(),
            Precision::Halves => (value * 2.0).round() / 2.0,
            Precision::Tenths => (value * 10.0).round() / 10.0,
        }
    }
}

impl TryFrom<f64> for Precision {
    type Error = String;

    fn try_from(step: f64) -> std::result::Result<Self, Self::Error> {
        const EPS: f64 = 1e-9;
        if (step - 1.0).abs() < EPS {
            Ok(Precision::Whole)
        } else if (step - 0.5).abs() < EPS {
            Ok(Precision::Halves)
        } else if (step - 0.1).abs() < EPS {
            Ok(Precision::Tenths)
        } else {
            Err(format!("unsupported precision {step} (expected 1, 0.5 or 0.1)"))
        }
    }
}

impl From<Precision> for f64 {
    fn from(p: Precision) -> f64 {
        p.step()
    }
}

/// Vendor feature switches carried alongside the main HVAC state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toggle {
    Quiet,
    Turbo,
    Econo,
    Light,
    Filter,
    Clean,
    Beep,
    Sleep,
    Celsius,
}

impl Toggle {
    pub const ALL: [Toggle; 9] = [
        Toggle::Quiet,
        Toggle::Turbo,
        Toggle::Econo,
        Toggle::Light,
        Toggle::Filter,
        Toggle::Clean,
        Toggle::Beep,
        Toggle::Sleep,
        Toggle::Celsius,
    ];

    /// Attribute name exposed to observers.
    pub fn attribute(&self) -> &'static str {
        match self {
            Toggle::Quiet => "quiet",
            Toggle::Turbo => "turbo",
            Toggle::Econo => "econo",
            Toggle::Light => "light",
            Toggle::Filter => "filters",
            Toggle::Clean => "clean",
            Toggle::Beep => "beep",
            Toggle::Sleep => "sleep",
            Toggle::Celsius => "celsius",
        }
    }

    pub fn from_attribute(s: &str) -> Option<Self> {
        Toggle::ALL.into_iter().find(|t| t.attribute() == s)
    }

    /// Sleep carries a free-form (usually numeric) value, all others are on/off.
    pub fn is_switch(&self) -> bool {
        *self != Toggle::Sleep
    }
}

/// Events emitted when the diff engine sees the climate state change.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ModeChanged { mode: HvacMode },
    PowerChanged { power: Power },
    TargetTemperatureChanged { temperature: f64 },
    FanModeChanged { fan: FanSpeed },
    SwingModeChanged { swing: SwingMode },
    SwingPositionChanged { vertical: VerticalPosition, horizontal: HorizontalPosition },
    ToggleChanged { toggle: Toggle, value: String },
    CurrentTemperatureChanged { temperature: f64 },
    CurrentHumidityChanged { humidity: f64 },
}

/// A user-facing request against the climate entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetHvacMode(HvacMode),
    TurnOn,
    TurnOff,
    SetTemperature(f64),
    SetFanMode(FanSpeed),
    SetSwingMode(SwingMode),
    SetSwingVertical(VerticalPosition),
    SetSwingHorizontal(HorizontalPosition),
    SetToggle(Toggle, String),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetHvacMode(_) => "set_hvac_mode",
            Command::TurnOn => "turn_on",
            Command::TurnOff => "turn_off",
            Command::SetTemperature(_) => "set_temperature",
            Command::SetFanMode(_) => "set_fan_mode",
            Command::SetSwingMode(_) => "set_swing_mode",
            Command::SetSwingVertical(_) => "set_swingv",
            Command::SetSwingHorizontal(_) => "set_swingh",
            Command::SetToggle(..) => "set_toggle",
        }
    }
}

/// What a command ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// State changed and a command was published.
    Sent,
    /// State changed, but the unit is off so nothing was transmitted.
    Stored,
    /// Nothing to do (turn-on with no usable mode).
    Ignored,
}

/// What happened to an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    Applied,
    /// No `IRHVAC` object in the payload.
    Unrelated,
    /// `IRHVAC` addressed to a different vendor profile.
    ForeignVendor,
    Malformed,
}

macro_rules! wire_from_str {
    ($ty:ty, $kind:literal) => {
        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                <$ty>::from_wire_str(&s.to_lowercase()).ok_or_else(|| Error::UnsupportedValue {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_from_str!(HvacMode, "hvac mode");
wire_from_str!(FanSpeed, "fan mode");
wire_from_str!(SwingMode, "swing mode");
wire_from_str!(VerticalPosition, "vertical swing position");
wire_from_str!(HorizontalPosition, "horizontal swing position");
wire_from_str!(Power, "power state");
