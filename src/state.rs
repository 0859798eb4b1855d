use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::restore::RestoredState;
use crate::types::*;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toggles {
    pub quiet: String,
    pub turbo: String,
    pub econo: String,
    pub light: String,
    pub filter: String,
    pub clean: String,
    pub beep: String,
    pub sleep: String,
    pub celsius: String,
}

impl Toggles {
    fn from_config(config: &Config) -> Self {
        Self {
            quiet: config.default_toggle(Toggle::Quiet).to_string(),
            turbo: config.default_toggle(Toggle::Turbo).to_string(),
            econo: config.default_toggle(Toggle::Econo).to_string(),
            light: config.default_toggle(Toggle::Light).to_string(),
            filter: config.default_toggle(Toggle::Filter).to_string(),
            clean: config.default_toggle(Toggle::Clean).to_string(),
            beep: config.default_toggle(Toggle::Beep).to_string(),
            sleep: config.default_toggle(Toggle::Sleep).to_string(),
            celsius: config.default_toggle(Toggle::Celsius).to_string(),
        }
    }

    pub fn get(&self, toggle: Toggle) -> &str {
        match toggle {
            Toggle::Quiet => &self.quiet,
            Toggle::Turbo => &self.turbo,
            Toggle::Econo => &self.econo,
            Toggle::Light => &self.light,
            Toggle::Filter => &self.filter,
            Toggle::Clean => &self.clean,
            Toggle::Beep => &self.beep,
            Toggle::Sleep => &self.sleep,
            Toggle::Celsius => &self.celsius,
        }
    }

    fn slot(&mut self, toggle: Toggle) -> &mut String {
        match toggle {
            Toggle::Quiet => &mut self.quiet,
            Toggle::Turbo => &mut self.turbo,
            Toggle::Econo => &mut self.econo,
            Toggle::Light => &mut self.light,
            Toggle::Filter => &mut self.filter,
            Toggle::Clean => &mut self.clean,
            Toggle::Beep => &mut self.beep,
            Toggle::Sleep => &mut self.sleep,
            Toggle::Celsius => &mut self.celsius,
        }
    }
}

/// Desired and observed state of one IR-controlled unit.
///
/// Invariants kept by every mutator:
/// - `power` is off exactly when `mode` is off
/// - `last_on_mode`, once set, is never cleared
/// - `target_temperature` is quantized and inside the configured range
/// - the swing mode is always derived from the two louver positions
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateState {
    power: Power,
    mode: HvacMode,
    last_on_mode: Option<HvacMode>,
    enabled: bool,
    target_temperature: f64,
    fan_mode: FanSpeed,
    swing_vertical: VerticalPosition,
    swing_horizontal: HorizontalPosition,
    toggles: Toggles,
    current_temperature: Option<f64>,
    current_humidity: Option<f64>,
}

impl ClimateState {
    /// Starting state from the configured initial values, each checked
    /// against its supported set.
    pub(crate) fn new(config: &Config) -> Self {
        let mode = config.starting_mode();
        let mut state = Self {
            power: if mode.is_off() { Power::Off } else { Power::On },
            mode,
            last_on_mode: None,
            enabled: !mode.is_off(),
            target_temperature: clamp(
                config,
                config.precision.quantize(config.target_temp),
            ),
            fan_mode: config.starting_fan(),
            swing_vertical: config.initial_vertical_swing_position,
            swing_horizontal: config.initial_horizontal_swing_position,
            toggles: Toggles::from_config(config),
            current_temperature: None,
            current_humidity: None,
        };
        state.align_positions(config.starting_swing());
        state
    }

    pub fn power(&self) -> Power {
        self.power
    }

    pub fn mode(&self) -> HvacMode {
        self.mode
    }

    pub fn last_on_mode(&self) -> Option<HvacMode> {
        self.last_on_mode
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn hvac_action(&self) -> HvacAction {
        self.mode.action()
    }

    pub fn target_temperature(&self) -> f64 {
        self.target_temperature
    }

    pub fn fan_mode(&self) -> FanSpeed {
        self.fan_mode
    }

    pub fn swing_mode(&self) -> SwingMode {
        SwingMode::from_positions(self.swing_vertical, self.swing_horizontal)
    }

    pub fn swing_vertical(&self) -> VerticalPosition {
        self.swing_vertical
    }

    pub fn swing_horizontal(&self) -> HorizontalPosition {
        self.swing_horizontal
    }

    pub fn toggles(&self) -> &Toggles {
        &self.toggles
    }

    pub fn toggle(&self, toggle: Toggle) -> &str {
        self.toggles.get(toggle)
    }

    pub fn current_temperature(&self) -> Option<f64> {
        self.current_temperature
    }

    pub fn current_humidity(&self) -> Option<f64> {
        self.current_humidity
    }

    // -- Command-side setters: validate, then mutate --

    /// Changes mode and couples power to it. Leaving `off` records the new
    /// mode as the last on-mode.
    pub fn set_mode(&mut self, config: &Config, mode: HvacMode) -> Result<()> {
        if !config.supports_mode(mode) {
            return Err(unsupported("hvac mode", mode.as_str()));
        }
        self.mode = mode;
        if mode.is_off() {
            self.power = Power::Off;
            self.enabled = false;
        } else {
            self.last_on_mode = Some(mode);
            self.power = Power::On;
            self.enabled = true;
        }
        Ok(())
    }

    /// Rejects values outside the configured range; in-range values are
    /// quantized to the configured precision.
    pub fn set_target_temperature(&mut self, config: &Config, value: f64) -> Result<()> {
        if !(config.min_temp..=config.max_temp).contains(&value) {
            return Err(Error::OutOfRange {
                value,
                min: config.min_temp,
                max: config.max_temp,
            });
        }
        self.target_temperature = clamp(config, config.precision.quantize(value));
        Ok(())
    }

    pub fn set_fan_mode(&mut self, config: &Config, fan: FanSpeed) -> Result<()> {
        if !config.supports_fan(fan) {
            return Err(unsupported("fan mode", fan.as_str()));
        }
        self.fan_mode = fan;
        Ok(())
    }

    pub fn set_swing_mode(&mut self, config: &Config, swing: SwingMode) -> Result<()> {
        if !config.supported_swing_list.contains(&swing) {
            return Err(unsupported("swing mode", swing.as_str()));
        }
        self.align_positions(swing);
        Ok(())
    }

    pub fn set_swing_vertical(&mut self, config: &Config, position: VerticalPosition) -> Result<()> {
        if !config.supports_vertical_swing() {
            return Err(unsupported("vertical swing position", position.as_str()));
        }
        self.swing_vertical = position;
        Ok(())
    }

    pub fn set_swing_horizontal(
        &mut self,
        config: &Config,
        position: HorizontalPosition,
    ) -> Result<()> {
        if !config.supports_horizontal_swing() {
            return Err(unsupported("horizontal swing position", position.as_str()));
        }
        self.swing_horizontal = position;
        Ok(())
    }

    /// Switch toggles take on/off in any case and are stored lower-cased.
    /// `sleep` takes any value.
    pub fn set_toggle(&mut self, toggle: Toggle, value: &str) -> Result<()> {
        let value = value.to_lowercase();
        if toggle.is_switch() && value != "on" && value != "off" {
            return Err(unsupported(toggle.attribute(), &value));
        }
        *self.toggles.slot(toggle) = value;
        Ok(())
    }

    // -- Feedback-side mutators: the device is authoritative, no range checks --

    pub(crate) fn observe_power(&mut self, power: Power) {
        self.power = power;
    }

    pub(crate) fn observe_mode(&mut self, mode: HvacMode) {
        self.mode = mode;
    }

    pub(crate) fn observe_target_temperature(&mut self, config: &Config, value: f64) {
        self.target_temperature = clamp(config, config.precision.quantize(value));
    }

    pub(crate) fn observe_fan_mode(&mut self, fan: FanSpeed) {
        self.fan_mode = fan;
    }

    pub(crate) fn observe_swing(&mut self, vertical: VerticalPosition, horizontal: HorizontalPosition) {
        self.swing_vertical = vertical;
        self.swing_horizontal = horizontal;
    }

    pub(crate) fn observe_toggle(&mut self, toggle: Toggle, value: String) {
        *self.toggles.slot(toggle) = value;
    }

    pub(crate) fn observe_current_temperature(&mut self, value: f64) {
        self.current_temperature = Some(value);
    }

    pub(crate) fn observe_current_humidity(&mut self, value: f64) {
        self.current_humidity = Some(value);
    }

    /// Off wins: a powered-off unit is in mode `off` whatever mode was
    /// reported alongside it. An on unit in mode `off` is treated as off too.
    pub(crate) fn reconcile_power(&mut self) {
        if self.power == Power::Off || self.mode.is_off() {
            self.power = Power::Off;
            self.mode = HvacMode::Off;
            self.enabled = false;
        } else {
            self.enabled = true;
            self.last_on_mode = Some(self.mode);
        }
    }

    /// Seeds mode, fan, target and swing from a persisted snapshot, then
    /// re-derives power from the restored mode. Unknown or unsupported
    /// values leave the configured default in place.
    pub fn restore(&mut self, config: &Config, snapshot: &RestoredState) {
        if let Some(mode) = snapshot.mode.as_deref().and_then(HvacMode::from_wire_str)
            && config.supports_mode(mode)
        {
            self.mode = mode;
        }
        if let Some(fan) = snapshot.fan_mode.as_deref().and_then(FanSpeed::from_wire_str)
            && config.supports_fan(fan)
        {
            self.fan_mode = fan;
        }
        if let Some(temp) = snapshot.temperature {
            self.target_temperature = clamp(config, config.precision.quantize(temp));
        }
        if config.supports_swing() {
            if let Some(v) = snapshot.swingv.as_deref().and_then(VerticalPosition::from_wire_str) {
                self.swing_vertical = v;
            }
            if let Some(h) = snapshot.swingh.as_deref().and_then(HorizontalPosition::from_wire_str) {
                self.swing_horizontal = h;
            }
            if let Some(swing) = snapshot.swing_mode.as_deref().and_then(SwingMode::from_wire_str) {
                self.align_positions(swing);
            }
        }
        self.power = if self.mode.is_off() { Power::Off } else { Power::On };
        self.reconcile_power();
    }

    pub fn snapshot(&self) -> RestoredState {
        RestoredState {
            mode: Some(self.mode.as_str().to_string()),
            fan_mode: Some(self.fan_mode.as_str().to_string()),
            temperature: Some(self.target_temperature),
            swing_mode: Some(self.swing_mode().as_str().to_string()),
            swingv: Some(self.swing_vertical.as_str().to_string()),
            swingh: Some(self.swing_horizontal.as_str().to_string()),
        }
    }

    /// Vendor attributes as exposed next to the standard climate attributes.
    pub fn extra_attributes(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        attrs.insert("swingv".to_string(), json!(self.swing_vertical.as_str()));
        attrs.insert("swingh".to_string(), json!(self.swing_horizontal.as_str()));
        for toggle in Toggle::ALL {
            if toggle != Toggle::Celsius {
                attrs.insert(toggle.attribute().to_string(), json!(self.toggles.get(toggle)));
            }
        }
        attrs
    }

    /// Flat JSON view used for change detection.
    pub(crate) fn to_json(&self) -> Value {
        let mut toggles = Map::new();
        for toggle in Toggle::ALL {
            toggles.insert(toggle.attribute().to_string(), json!(self.toggles.get(toggle)));
        }
        json!({
            "power": self.power.as_str(),
            "mode": self.mode.as_str(),
            "last_on_mode": self.last_on_mode.map(|m| m.as_str()),
            "target_temperature": self.target_temperature,
            "fan_mode": self.fan_mode.as_str(),
            "swing_mode": self.swing_mode().as_str(),
            "swingv": self.swing_vertical.as_str(),
            "swingh": self.swing_horizontal.as_str(),
            "toggles": toggles,
            "current_temperature": self.current_temperature,
            "current_humidity": self.current_humidity,
        })
    }

    /// Moves the louver positions so that the derived swing mode equals
    /// `swing`. A sweeping axis is set to `auto`; a fixed axis keeps its
    /// stored position unless that position is `auto`, which becomes `off`.
    fn align_positions(&mut self, swing: SwingMode) {
        let sweep_v = matches!(swing, SwingMode::Vertical | SwingMode::Both);
        let sweep_h = matches!(swing, SwingMode::Horizontal | SwingMode::Both);
        if sweep_v {
            self.swing_vertical = VerticalPosition::Auto;
        } else if self.swing_vertical == VerticalPosition::Auto {
            self.swing_vertical = VerticalPosition::Off;
        }
        if sweep_h {
            self.swing_horizontal = HorizontalPosition::Auto;
        } else if self.swing_horizontal == HorizontalPosition::Auto {
            self.swing_horizontal = HorizontalPosition::Off;
        }
    }
}

// f64::clamp panics on NaN bounds
fn clamp(config: &Config, value: f64) -> f64 {
    value.max(config.min_temp).min(config.max_temp)
}

fn unsupported(kind: &'static str, value: &str) -> Error {
    Error::UnsupportedValue {
        kind,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::new("cmnd/ir/IRhvac", "tele/ir/RESULT")
            .vendor("COOLIX")
            .temperature_range(16.0, 30.0)
            .swing_modes([
                SwingMode::Off,
                SwingMode::Vertical,
                SwingMode::Horizontal,
                SwingMode::Both,
            ])
    }

    #[test]
    fn initial_state_from_defaults() {
        let state = ClimateState::new(&config());
        assert_eq!(state.mode(), HvacMode::Off);
        assert_eq!(state.power(), Power::Off);
        assert!(!state.is_enabled());
        assert_eq!(state.last_on_mode(), None);
        assert_eq!(state.target_temperature(), 26.0);
        assert_eq!(state.fan_mode(), FanSpeed::AutoMax);
        assert_eq!(state.swing_mode(), SwingMode::Both);
        assert_eq!(state.toggle(Toggle::Celsius), "on");
        assert_eq!(state.toggle(Toggle::Sleep), "-1");
    }

    #[test]
    fn initial_non_off_mode_powers_on() {
        let config = config().initial_mode(HvacMode::Cool);
        let state = ClimateState::new(&config);
        assert_eq!(state.power(), Power::On);
        assert!(state.is_enabled());
    }

    #[test]
    fn initial_swing_mode_aligns_positions() {
        let mut config = config();
        config.initial_swing_mode = SwingMode::Vertical;
        config.initial_horizontal_swing_position = HorizontalPosition::Center;
        let state = ClimateState::new(&config);
        assert_eq!(state.swing_vertical(), VerticalPosition::Auto);
        assert_eq!(state.swing_horizontal(), HorizontalPosition::Center);
        assert_eq!(state.swing_mode(), SwingMode::Vertical);
    }

    #[test]
    fn set_mode_couples_power_and_last_on() {
        let config = config();
        let mut state = ClimateState::new(&config);
        state.set_mode(&config, HvacMode::Heat).unwrap();
        assert_eq!(state.power(), Power::On);
        assert_eq!(state.last_on_mode(), Some(HvacMode::Heat));

        state.set_mode(&config, HvacMode::Off).unwrap();
        assert_eq!(state.power(), Power::Off);
        assert!(!state.is_enabled());
        assert_eq!(state.last_on_mode(), Some(HvacMode::Heat));
    }

    #[test]
    fn set_mode_rejects_unsupported() {
        let config = config().modes([HvacMode::Cool]);
        let mut state = ClimateState::new(&config);
        let before = state.clone();
        let err = state.set_mode(&config, HvacMode::Heat).unwrap_err();
        assert!(matches!(err, Error::UnsupportedValue { kind: "hvac mode", .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn temperature_out_of_range_leaves_state() {
        let config = config();
        let mut state = ClimateState::new(&config);
        let before = state.clone();
        for value in [15.9, 30.1, -5.0, 100.0] {
            assert!(matches!(
                state.set_target_temperature(&config, value),
                Err(Error::OutOfRange { .. })
            ));
        }
        assert_eq!(state, before);
    }

    #[test]
    fn temperature_quantized_per_precision() {
        let config = config().precision(Precision::Halves);
        let mut state = ClimateState::new(&config);
        state.set_target_temperature(&config, 22.3).unwrap();
        assert_eq!(state.target_temperature(), 22.5);

        let config = config.precision(Precision::Tenths);
        state.set_target_temperature(&config, 22.34).unwrap();
        assert_eq!(state.target_temperature(), 22.3);

        let config = config.precision(Precision::Whole);
        state.set_target_temperature(&config, 22.5).unwrap();
        assert_eq!(state.target_temperature(), 23.0);
    }

    #[test]
    fn quantized_value_clamped_to_range() {
        let config = config().temperature_range(16.3, 30.0);
        let mut state = ClimateState::new(&config);
        state.set_target_temperature(&config, 16.4).unwrap();
        assert_eq!(state.target_temperature(), 16.3);
    }

    #[test]
    fn set_swing_mode_moves_positions() {
        let config = config();
        let mut state = ClimateState::new(&config);
        state.set_swing_horizontal(&config, HorizontalPosition::Left).unwrap();
        assert_eq!(state.swing_mode(), SwingMode::Vertical);

        state.set_swing_mode(&config, SwingMode::Horizontal).unwrap();
        assert_eq!(state.swing_vertical(), VerticalPosition::Off);
        assert_eq!(state.swing_horizontal(), HorizontalPosition::Auto);
        assert_eq!(state.swing_mode(), SwingMode::Horizontal);

        state.set_swing_mode(&config, SwingMode::Off).unwrap();
        assert_eq!(state.swing_mode(), SwingMode::Off);

        state.set_swing_mode(&config, SwingMode::Both).unwrap();
        assert_eq!(state.swing_mode(), SwingMode::Both);
    }

    #[test]
    fn swing_position_requires_axis() {
        let config = config().swing_modes([SwingMode::Off, SwingMode::Vertical]);
        let mut state = ClimateState::new(&config);
        assert!(state.set_swing_vertical(&config, VerticalPosition::High).is_ok());
        assert!(matches!(
            state.set_swing_horizontal(&config, HorizontalPosition::Left),
            Err(Error::UnsupportedValue { .. })
        ));
        assert!(matches!(
            state.set_swing_mode(&config, SwingMode::Both),
            Err(Error::UnsupportedValue { .. })
        ));
    }

    #[test]
    fn toggles_accept_on_off_any_case() {
        let mut state = ClimateState::new(&config());
        state.set_toggle(Toggle::Turbo, "ON").unwrap();
        assert_eq!(state.toggle(Toggle::Turbo), "on");
        state.set_toggle(Toggle::Quiet, "Off").unwrap();
        assert_eq!(state.toggle(Toggle::Quiet), "off");
        assert!(state.set_toggle(Toggle::Econo, "maybe").is_err());
        state.set_toggle(Toggle::Sleep, "3").unwrap();
        assert_eq!(state.toggle(Toggle::Sleep), "3");
    }

    #[test]
    fn reconcile_power_off_wins() {
        let config = config();
        let mut state = ClimateState::new(&config);
        state.observe_power(Power::Off);
        state.observe_mode(HvacMode::Cool);
        state.reconcile_power();
        assert_eq!(state.mode(), HvacMode::Off);
        assert!(!state.is_enabled());

        state.observe_power(Power::On);
        state.observe_mode(HvacMode::Dry);
        state.reconcile_power();
        assert_eq!(state.mode(), HvacMode::Dry);
        assert_eq!(state.last_on_mode(), Some(HvacMode::Dry));
        assert!(state.is_enabled());
    }

    #[test]
    fn restore_seeds_fields_and_power() {
        let config = config();
        let mut state = ClimateState::new(&config);
        let snapshot = RestoredState {
            mode: Some("cool".to_string()),
            fan_mode: Some("medium".to_string()),
            temperature: Some(22.0),
            swing_mode: Some("horizontal".to_string()),
            swingv: Some("low".to_string()),
            swingh: Some("auto".to_string()),
        };
        state.restore(&config, &snapshot);
        assert_eq!(state.mode(), HvacMode::Cool);
        assert_eq!(state.power(), Power::On);
        assert_eq!(state.last_on_mode(), Some(HvacMode::Cool));
        assert_eq!(state.fan_mode(), FanSpeed::Medium);
        assert_eq!(state.target_temperature(), 22.0);
        assert_eq!(state.swing_vertical(), VerticalPosition::Low);
        assert_eq!(state.swing_mode(), SwingMode::Horizontal);
    }

    #[test]
    fn restore_off_mode_powers_off() {
        let config = config().initial_mode(HvacMode::Heat);
        let mut state = ClimateState::new(&config);
        let snapshot = RestoredState {
            mode: Some("off".to_string()),
            ..Default::default()
        };
        state.restore(&config, &snapshot);
        assert_eq!(state.power(), Power::Off);
        assert!(!state.is_enabled());
        assert_eq!(state.last_on_mode(), None);
    }

    #[test]
    fn snapshot_restores_to_equal_state() {
        let config = config().initial_mode(HvacMode::Cool);
        let mut state = ClimateState::new(&config);
        state.set_fan_mode(&config, FanSpeed::Medium).unwrap();
        state.set_swing_vertical(&config, VerticalPosition::Middle).unwrap();
        state.set_swing_mode(&config, SwingMode::Horizontal).unwrap();
        state.set_mode(&config, HvacMode::Cool).unwrap();

        let mut restored = ClimateState::new(&config);
        restored.restore(&config, &state.snapshot());
        assert_eq!(restored, state);
    }
}
