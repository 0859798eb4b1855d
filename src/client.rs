use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::diff::state_events;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{accepts, apply_feedback, encode_command, extract_irhvac, IrHvacFeedback};
use crate::restore::RestoredState;
use crate::sensor::{SensorKind, SensorReading};
use crate::state::ClimateState;
use crate::transport::Publisher;
use crate::types::*;
use crate::Result;

type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;
type SnapshotCallback = Box<dyn Fn(&ClimateState) + Send + Sync>;

pub struct IrHvacClientBuilder {
    config: Config,
    event_callbacks: Vec<EventCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl IrHvacClientBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            event_callbacks: Vec::new(),
            snapshot_callbacks: Vec::new(),
            log_mode: None,
            log_path: None,
        }
    }

    pub fn on_event(mut self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.event_callbacks.push(Box::new(f));
        self
    }

    pub fn on_snapshot(mut self, f: impl Fn(&ClimateState) + Send + Sync + 'static) -> Self {
        self.snapshot_callbacks.push(Box::new(f));
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    /// Fails with [`Error::Configuration`] when no vendor can be resolved.
    pub fn build<P: Publisher>(self, publisher: P) -> Result<IrHvacClient<P>> {
        self.config.validate()?;
        let vendor = self.config.resolve_vendor()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(Mutex::new(MessageLogger::new(mode, &path)?)),
            _ => None,
        };

        let unique_id = self
            .config
            .unique_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(IrHvacClient {
            state: Mutex::new(ClimateState::new(&self.config)),
            config: self.config,
            vendor,
            unique_id,
            send_lock: tokio::sync::Mutex::new(()),
            publisher,
            event_callbacks: self.event_callbacks,
            snapshot_callbacks: self.snapshot_callbacks,
            logger,
        })
    }
}

/// What a command does to the unit once the state has been updated.
enum Effect {
    Transmit,
    /// Unit is off: keep the change locally, don't wake it up.
    TransmitIfOn,
    Nothing,
}

/// Keeps one IR-emulated air conditioner in sync with its bridge.
///
/// Commands serialise on a single-slot send guard held from state mutation
/// through publish and notification. Inbound feedback and sensor readings
/// never take the guard and apply as soon as they arrive.
pub struct IrHvacClient<P> {
    config: Config,
    vendor: String,
    unique_id: String,
    state: Mutex<ClimateState>,
    send_lock: tokio::sync::Mutex<()>,
    publisher: P,
    event_callbacks: Vec<EventCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
    logger: Option<Mutex<MessageLogger>>,
}

impl IrHvacClient<()> {
    pub fn builder(config: Config) -> IrHvacClientBuilder {
        IrHvacClientBuilder::new(config)
    }
}

impl<P: Publisher> IrHvacClient<P> {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn state(&self) -> ClimateState {
        self.state.lock().clone()
    }

    /// Vendor attributes (`swingv`, `swingh` and the toggles) for hosts that
    /// expose them next to the standard climate attributes.
    pub fn extra_attributes(&self) -> Map<String, Value> {
        self.state.lock().extra_attributes()
    }

    // -- Command methods --

    pub async fn set_hvac_mode(&self, mode: HvacMode) -> Result<Outcome> {
        self.submit(Command::SetHvacMode(mode)).await
    }

    /// Turns on in the last on-mode, or the configured initial mode if the
    /// unit has never been on. `Outcome::Ignored` when neither is usable.
    pub async fn turn_on(&self) -> Result<Outcome> {
        self.submit(Command::TurnOn).await
    }

    pub async fn turn_off(&self) -> Result<Outcome> {
        self.submit(Command::TurnOff).await
    }

    pub async fn set_temperature(&self, temperature: f64) -> Result<Outcome> {
        self.submit(Command::SetTemperature(temperature)).await
    }

    pub async fn set_fan_mode(&self, fan: FanSpeed) -> Result<Outcome> {
        self.submit(Command::SetFanMode(fan)).await
    }

    pub async fn set_swing_mode(&self, swing: SwingMode) -> Result<Outcome> {
        self.submit(Command::SetSwingMode(swing)).await
    }

    /// Stores the vertical louver position. The position only reaches the
    /// unit while the horizontal axis is the sweeping one (swing mode
    /// `horizontal`); in `off` the body carries `SwingV=off`, and in
    /// `vertical` or `both` it carries `auto`.
    pub async fn set_swingv(&self, position: VerticalPosition) -> Result<Outcome> {
        self.submit(Command::SetSwingVertical(position)).await
    }

    /// Horizontal counterpart of [`set_swingv`](Self::set_swingv): sent only
    /// in swing mode `vertical`.
    pub async fn set_swingh(&self, position: HorizontalPosition) -> Result<Outcome> {
        self.submit(Command::SetSwingHorizontal(position)).await
    }

    pub async fn set_toggle(&self, toggle: Toggle, value: &str) -> Result<Outcome> {
        self.submit(Command::SetToggle(toggle, value.to_string())).await
    }

    /// Applies `command` to the state and, when the unit should hear about
    /// it, publishes the full resulting state as one IRHVAC command.
    /// Rejected commands leave the state untouched and publish nothing.
    pub async fn submit(&self, command: Command) -> Result<Outcome> {
        let _guard = self.send_lock.lock().await;

        let (events, snapshot, message) = {
            let mut state = self.state.lock();
            let before = state.to_json();

            let effect = match self.apply_command(&mut state, &command) {
                Ok(effect) => effect,
                Err(e) => {
                    warn!(command = command.name(), error = %e, "command rejected");
                    return Err(e);
                }
            };

            let transmit = match effect {
                Effect::Nothing => return Ok(Outcome::Ignored),
                Effect::Transmit => true,
                Effect::TransmitIfOn => !state.mode().is_off(),
            };
            let message = if transmit {
                Some(serde_json::to_value(encode_command(&self.vendor, &self.config, &state))?)
            } else {
                None
            };
            (state_events(&before, &state), state.clone(), message)
        };

        let outcome = match message {
            Some(body) => {
                let payload = body.to_string();
                debug!(topic = %self.config.command_topic, payload = %payload, "publishing IRHVAC command");
                if let Some(logger) = &self.logger {
                    logger.lock().log_command(command.name(), &self.config.command_topic, &body);
                }
                let published = self.publisher.publish(&self.config.command_topic, &payload).await;
                self.notify(&events, &snapshot);
                published?;
                Outcome::Sent
            }
            None => {
                trace!(command = command.name(), "unit is off, not transmitting");
                self.notify(&events, &snapshot);
                Outcome::Stored
            }
        };
        Ok(outcome)
    }

    fn apply_command(&self, state: &mut ClimateState, command: &Command) -> Result<Effect> {
        let config = &self.config;
        match command {
            Command::SetHvacMode(mode) => {
                state.set_mode(config, *mode)?;
                Ok(Effect::Transmit)
            }
            Command::TurnOff => {
                state.set_mode(config, HvacMode::Off)?;
                Ok(Effect::Transmit)
            }
            Command::TurnOn => {
                let fallback = Some(config.starting_mode()).filter(|m| !m.is_off());
                match state.last_on_mode().or(fallback) {
                    Some(mode) => {
                        state.set_mode(config, mode)?;
                        Ok(Effect::Transmit)
                    }
                    None => {
                        debug!("turn on requested with no last or default mode, ignoring");
                        Ok(Effect::Nothing)
                    }
                }
            }
            Command::SetTemperature(value) => {
                state.set_target_temperature(config, *value)?;
                Ok(Effect::TransmitIfOn)
            }
            Command::SetFanMode(fan) => {
                state.set_fan_mode(config, *fan)?;
                Ok(Effect::TransmitIfOn)
            }
            Command::SetSwingMode(swing) => {
                state.set_swing_mode(config, *swing)?;
                Ok(Effect::TransmitIfOn)
            }
            Command::SetSwingVertical(position) => {
                state.set_swing_vertical(config, *position)?;
                Ok(Effect::TransmitIfOn)
            }
            Command::SetSwingHorizontal(position) => {
                state.set_swing_horizontal(config, *position)?;
                Ok(Effect::TransmitIfOn)
            }
            Command::SetToggle(toggle, value) => {
                state.set_toggle(*toggle, value)?;
                Ok(Effect::TransmitIfOn)
            }
        }
    }

    // -- Inbound --

    /// Reconciles one state-topic payload. Never publishes.
    pub fn handle_message(&self, payload: &str) -> Reconcile {
        let (outcome, body) = self.reconcile(payload);
        if let Some(logger) = &self.logger {
            let label = match outcome {
                Reconcile::Applied => "applied",
                Reconcile::Unrelated => "unrelated",
                Reconcile::ForeignVendor => "foreign_vendor",
                Reconcile::Malformed => "malformed",
            };
            let body = body.unwrap_or_else(|| Value::String(payload.to_string()));
            logger.lock().log_feedback(label, &body);
        }
        outcome
    }

    fn reconcile(&self, payload: &str) -> (Reconcile, Option<Value>) {
        let body = match extract_irhvac(payload) {
            Ok(Some(body)) => body,
            Ok(None) => {
                trace!("no IRHVAC object, ignoring");
                return (Reconcile::Unrelated, None);
            }
            Err(e) => {
                debug!(error = %e, "unparsable state payload");
                return (Reconcile::Malformed, None);
            }
        };

        let feedback: IrHvacFeedback = match serde_json::from_value(body.clone()) {
            Ok(feedback) => feedback,
            Err(e) => {
                debug!(error = %e, "malformed IRHVAC object");
                return (Reconcile::Malformed, Some(body));
            }
        };

        if !accepts(&self.vendor, &feedback) {
            trace!(vendor = %feedback.vendor, "IRHVAC for another vendor");
            return (Reconcile::ForeignVendor, Some(body));
        }

        debug!(payload = %body, "applying IRHVAC feedback");
        self.mutate(|state| apply_feedback(&self.config, &feedback, state));
        (Reconcile::Applied, Some(body))
    }

    /// Drains inbound payloads in delivery order until the sender goes away.
    pub async fn run_feedback(&self, mut inbound: mpsc::Receiver<String>) {
        while let Some(payload) = inbound.recv().await {
            self.handle_message(&payload);
        }
        debug!("inbound channel closed");
    }

    // -- Sensors --

    /// Absorbs an observation from an external source. Readings from sources
    /// other than the configured ones, "unavailable" markers and unparsable
    /// values leave the previous reading in place.
    pub fn update_sensor(&self, source: &str, reading: &SensorReading) {
        let kind = if self.config.temperature_sensor.as_deref() == Some(source) {
            SensorKind::Temperature
        } else if self.config.humidity_sensor.as_deref() == Some(source) {
            SensorKind::Humidity
        } else {
            trace!(source, "reading from unconfigured sensor");
            return;
        };

        let value = match reading.parse() {
            Ok(Some(value)) => value,
            Ok(None) => return,
            Err(e) => {
                debug!(source, error = %e, "unable to update from sensor");
                return;
            }
        };

        self.mutate(|state| match kind {
            SensorKind::Temperature => state.observe_current_temperature(value),
            SensorKind::Humidity => state.observe_current_humidity(value),
        });
    }

    // -- Restore --

    /// Seeds the state from the host's last known snapshot. `None` keeps the
    /// configured defaults.
    pub fn restore(&self, snapshot: Option<&RestoredState>) {
        let Some(snapshot) = snapshot else {
            return;
        };
        self.mutate(|state| state.restore(&self.config, snapshot));
    }

    // -- Helpers --

    fn mutate(&self, f: impl FnOnce(&mut ClimateState)) {
        let (events, snapshot) = {
            let mut state = self.state.lock();
            let before = state.to_json();
            f(&mut state);
            (state_events(&before, &state), state.clone())
        };
        self.notify(&events, &snapshot);
    }

    fn notify(&self, events: &[Event], snapshot: &ClimateState) {
        for event in events {
            for cb in &self.event_callbacks {
                cb(event);
            }
        }
        for cb in &self.snapshot_callbacks {
            cb(snapshot);
        }
        if !events.is_empty() {
            debug!(count = events.len(), "state changed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelPublisher;
    use crate::Error;

    fn config() -> Config {
        Config::new("cmnd/ir/IRhvac", "tele/ir/RESULT")
            .vendor("FOO")
            .temperature_range(16.0, 30.0)
    }

    #[test]
    fn build_requires_vendor() {
        let (publisher, _rx) = ChannelPublisher::new(1);
        let result = IrHvacClient::builder(Config::new("c", "s")).build(publisher);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn build_uses_protocol_as_vendor() {
        let (publisher, _rx) = ChannelPublisher::new(1);
        let mut config = Config::new("c", "s");
        config.protocol = Some("COOLIX".to_string());
        let client = IrHvacClient::builder(config).build(publisher).unwrap();
        assert_eq!(client.vendor(), "COOLIX");
    }

    #[test]
    fn unique_id_generated_when_missing() {
        let (publisher, _rx) = ChannelPublisher::new(1);
        let client = IrHvacClient::builder(config()).build(publisher).unwrap();
        assert_eq!(client.unique_id().len(), 36);

        let (publisher, _rx) = ChannelPublisher::new(1);
        let mut with_id = config();
        with_id.unique_id = Some("living_room_ac".to_string());
        let client = IrHvacClient::builder(with_id).build(publisher).unwrap();
        assert_eq!(client.unique_id(), "living_room_ac");
    }

    #[tokio::test]
    async fn mode_change_publishes_full_state() {
        let (publisher, mut rx) = ChannelPublisher::new(4);
        let client = IrHvacClient::builder(config()).build(publisher).unwrap();

        let outcome = client.set_hvac_mode(HvacMode::Cool).await.unwrap();
        assert_eq!(outcome, Outcome::Sent);

        let publication = rx.try_recv().unwrap();
        assert_eq!(publication.topic, "cmnd/ir/IRhvac");
        let body: Value = serde_json::from_str(&publication.payload).unwrap();
        assert_eq!(body["Vendor"], "FOO");
        assert_eq!(body["Power"], "on");
        assert_eq!(body["Mode"], "cool");
    }

    #[tokio::test]
    async fn rejected_command_publishes_nothing() {
        let (publisher, mut rx) = ChannelPublisher::new(4);
        let client = IrHvacClient::builder(config()).build(publisher).unwrap();
        client.set_hvac_mode(HvacMode::Heat).await.unwrap();
        rx.try_recv().unwrap();

        let before = client.state();
        assert!(matches!(
            client.set_fan_mode(FanSpeed::High).await,
            Err(Error::UnsupportedValue { .. })
        ));
        assert!(matches!(
            client.set_temperature(31.0).await,
            Err(Error::OutOfRange { .. })
        ));
        assert_eq!(client.state(), before);
        assert!(rx.try_recv().is_err());
    }
}
