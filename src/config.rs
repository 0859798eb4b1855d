use serde::Deserialize;

use crate::types::*;
use crate::{Error, Result};

pub const DEFAULT_NAME: &str = "IR Air Conditioner";

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}
fn default_min_temp() -> f64 {
    20.0
}
fn default_max_temp() -> f64 {
    30.0
}
fn default_target_temp() -> f64 {
    26.0
}
fn default_modes() -> Vec<HvacMode> {
    vec![
        HvacMode::Off,
        HvacMode::Heat,
        HvacMode::Cool,
        HvacMode::Auto,
        HvacMode::Dry,
        HvacMode::FanOnly,
    ]
}
fn default_fan_speeds() -> Vec<FanSpeed> {
    vec![FanSpeed::AutoMax, FanSpeed::Medium, FanSpeed::Min]
}
fn default_swing_list() -> Vec<SwingMode> {
    vec![SwingMode::Off, SwingMode::Vertical]
}
fn default_operation_mode() -> HvacMode {
    HvacMode::Off
}
fn default_fan_mode() -> FanSpeed {
    FanSpeed::Auto
}
fn default_swing_mode() -> SwingMode {
    SwingMode::Both
}
fn default_vertical_position() -> VerticalPosition {
    VerticalPosition::Auto
}
fn default_horizontal_position() -> HorizontalPosition {
    HorizontalPosition::Auto
}
fn off() -> String {
    "off".to_string()
}
fn on() -> String {
    "on".to_string()
}
fn default_sleep() -> String {
    "-1".to_string()
}
fn default_model() -> i32 {
    -1
}

/// Static description of one emulated air conditioner. Field names match the
/// YAML/JSON platform keys hosts already use.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    /// Legacy spelling of `vendor`; the two are mutually exclusive.
    #[serde(default)]
    pub protocol: Option<String>,
    pub command_topic: String,
    pub state_topic: String,
    #[serde(default)]
    pub temperature_sensor: Option<String>,
    #[serde(default)]
    pub humidity_sensor: Option<String>,
    #[serde(default = "default_min_temp")]
    pub min_temp: f64,
    #[serde(default = "default_max_temp")]
    pub max_temp: f64,
    #[serde(default = "default_target_temp")]
    pub target_temp: f64,
    #[serde(default)]
    pub precision: Precision,
    #[serde(default = "default_modes")]
    pub supported_modes: Vec<HvacMode>,
    #[serde(default = "default_fan_speeds")]
    pub supported_fan_speeds: Vec<FanSpeed>,
    #[serde(default = "default_swing_list")]
    pub supported_swing_list: Vec<SwingMode>,
    #[serde(default = "default_operation_mode")]
    pub initial_operation_mode: HvacMode,
    #[serde(default = "default_fan_mode")]
    pub initial_fan_mode: FanSpeed,
    #[serde(default = "default_swing_mode")]
    pub initial_swing_mode: SwingMode,
    #[serde(default = "default_vertical_position")]
    pub initial_vertical_swing_position: VerticalPosition,
    #[serde(default = "default_horizontal_position")]
    pub initial_horizontal_swing_position: HorizontalPosition,
    #[serde(default = "off")]
    pub default_quiet_mode: String,
    #[serde(default = "off")]
    pub default_turbo_mode: String,
    #[serde(default = "off")]
    pub default_econo_mode: String,
    #[serde(default = "off")]
    pub default_light_mode: String,
    #[serde(default = "off")]
    pub default_filter_mode: String,
    #[serde(default = "off")]
    pub default_clean_mode: String,
    #[serde(default = "off")]
    pub default_beep_mode: String,
    #[serde(default = "default_sleep")]
    pub default_sleep_mode: String,
    #[serde(default = "on")]
    pub celsius_mode: String,
    #[serde(default = "default_model")]
    pub hvac_model: i32,
}

impl Config {
    pub fn new(command_topic: impl Into<String>, state_topic: impl Into<String>) -> Self {
        Self {
            name: default_name(),
            unique_id: None,
            vendor: None,
            protocol: None,
            command_topic: command_topic.into(),
            state_topic: state_topic.into(),
            temperature_sensor: None,
            humidity_sensor: None,
            min_temp: default_min_temp(),
            max_temp: default_max_temp(),
            target_temp: default_target_temp(),
            precision: Precision::default(),
            supported_modes: default_modes(),
            supported_fan_speeds: default_fan_speeds(),
            supported_swing_list: default_swing_list(),
            initial_operation_mode: default_operation_mode(),
            initial_fan_mode: default_fan_mode(),
            initial_swing_mode: default_swing_mode(),
            initial_vertical_swing_position: default_vertical_position(),
            initial_horizontal_swing_position: default_horizontal_position(),
            default_quiet_mode: off(),
            default_turbo_mode: off(),
            default_econo_mode: off(),
            default_light_mode: off(),
            default_filter_mode: off(),
            default_clean_mode: off(),
            default_beep_mode: off(),
            default_sleep_mode: default_sleep(),
            celsius_mode: on(),
            hvac_model: default_model(),
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    pub fn temperature_range(mut self, min: f64, max: f64) -> Self {
        self.min_temp = min;
        self.max_temp = max;
        self
    }

    pub fn precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn modes(mut self, modes: impl Into<Vec<HvacMode>>) -> Self {
        self.supported_modes = modes.into();
        self
    }

    pub fn fan_speeds(mut self, fans: impl Into<Vec<FanSpeed>>) -> Self {
        self.supported_fan_speeds = fans.into();
        self
    }

    pub fn swing_modes(mut self, swings: impl Into<Vec<SwingMode>>) -> Self {
        self.supported_swing_list = swings.into();
        self
    }

    pub fn initial_mode(mut self, mode: HvacMode) -> Self {
        self.initial_operation_mode = mode;
        self
    }

    pub fn sensors(mut self, temperature: Option<&str>, humidity: Option<&str>) -> Self {
        self.temperature_sensor = temperature.map(str::to_string);
        self.humidity_sensor = humidity.map(str::to_string);
        self
    }

    /// The identifier every IRHVAC body must carry to be ours.
    pub fn resolve_vendor(&self) -> Result<String> {
        let vendor = self.vendor.as_deref().filter(|v| !v.is_empty());
        let protocol = self.protocol.as_deref().filter(|p| !p.is_empty());
        match (vendor, protocol) {
            (Some(_), Some(_)) => Err(Error::Configuration(
                "vendor and protocol are mutually exclusive".to_string(),
            )),
            (Some(v), None) | (None, Some(v)) => Ok(v.to_string()),
            (None, None) => Err(Error::Configuration(format!(
                "neither vendor nor protocol provided for \"{}\"",
                self.unique_id.as_deref().unwrap_or(&self.name)
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.resolve_vendor()?;
        for (key, value) in [
            ("min_temp", self.min_temp),
            ("max_temp", self.max_temp),
            ("target_temp", self.target_temp),
        ] {
            if !value.is_finite() {
                return Err(Error::Configuration(format!("{key} must be a finite number, got {value}")));
            }
        }
        if self.min_temp > self.max_temp {
            return Err(Error::Configuration(format!(
                "min_temp {} is above max_temp {}",
                self.min_temp, self.max_temp
            )));
        }
        if self.supported_fan_speeds.is_empty() {
            return Err(Error::Configuration("supported_fan_speeds is empty".to_string()));
        }
        Ok(())
    }

    /// `initial_operation_mode`, or `off` when that mode isn't supported.
    pub fn starting_mode(&self) -> HvacMode {
        if self.supports_mode(self.initial_operation_mode) {
            self.initial_operation_mode
        } else {
            HvacMode::Off
        }
    }

    /// `initial_fan_mode`, or the first supported speed when it isn't supported.
    pub fn starting_fan(&self) -> FanSpeed {
        if self.supports_fan(self.initial_fan_mode) {
            return self.initial_fan_mode;
        }
        self.supported_fan_speeds
            .first()
            .copied()
            .unwrap_or(self.initial_fan_mode)
    }

    /// `initial_swing_mode`, or the first entry of `supported_swing_list`
    /// when it isn't listed. `off` for units without swing.
    pub fn starting_swing(&self) -> SwingMode {
        if self.supported_swing_list.contains(&self.initial_swing_mode) {
            return self.initial_swing_mode;
        }
        self.supported_swing_list
            .first()
            .copied()
            .unwrap_or(SwingMode::Off)
    }

    pub fn supports_mode(&self, mode: HvacMode) -> bool {
        mode.is_off() || self.supported_modes.contains(&mode)
    }

    pub fn supports_fan(&self, fan: FanSpeed) -> bool {
        self.supported_fan_speeds.contains(&fan)
    }

    pub fn supports_swing(&self) -> bool {
        !self.supported_swing_list.is_empty()
    }

    pub fn supports_vertical_swing(&self) -> bool {
        self.supported_swing_list
            .iter()
            .any(|s| matches!(s, SwingMode::Vertical | SwingMode::Both))
    }

    pub fn supports_horizontal_swing(&self) -> bool {
        self.supported_swing_list
            .iter()
            .any(|s| matches!(s, SwingMode::Horizontal | SwingMode::Both))
    }

    /// Units that report their top speed as "auto" and their high speed as "max".
    pub fn has_relabeled_fan_speeds(&self) -> bool {
        self.supports_fan(FanSpeed::MaxHigh) && self.supports_fan(FanSpeed::AutoMax)
    }

    pub fn default_toggle(&self, toggle: Toggle) -> &str {
        match toggle {
            Toggle::Quiet => &self.default_quiet_mode,
            Toggle::Turbo => &self.default_turbo_mode,
            Toggle::Econo => &self.default_econo_mode,
            Toggle::Light => &self.default_light_mode,
            Toggle::Filter => &self.default_filter_mode,
            Toggle::Clean => &self.default_clean_mode,
            Toggle::Beep => &self.default_beep_mode,
            Toggle::Sleep => &self.default_sleep_mode,
            Toggle::Celsius => &self.celsius_mode,
        }
    }
}
