use serde::{Deserialize, Serialize};

/// Last known state as persisted by the host between restarts. Keys match the
/// host's stored climate attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestoredState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fan_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swing_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swingv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swingh: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_attributes() {
        let snapshot: RestoredState = serde_json::from_str(
            r#"{"mode": "heat", "fan_mode": "min", "temperature": 21.5,
                "swing_mode": "off", "swingv": "off", "swingh": "off", "friendly_name": "AC"}"#,
        )
        .unwrap();
        assert_eq!(snapshot.mode.as_deref(), Some("heat"));
        assert_eq!(snapshot.temperature, Some(21.5));
        assert_eq!(snapshot.swingh.as_deref(), Some("off"));
    }

    #[test]
    fn missing_keys_are_none() {
        let snapshot: RestoredState = serde_json::from_str(r#"{"mode": "off"}"#).unwrap();
        assert_eq!(snapshot.fan_mode, None);
        assert_eq!(serde_json::to_string(&snapshot).unwrap(), r#"{"mode":"off"}"#);
    }
}
