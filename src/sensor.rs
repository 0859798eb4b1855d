use crate::{Error, Result};

const UNAVAILABLE_STATES: &[&str] = &["unavailable", "unknown"];

/// One observation from an external temperature or humidity source.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub value: String,
    pub unavailable: bool,
}

impl SensorReading {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            value: String::new(),
            unavailable: true,
        }
    }

    /// Builds a reading from a raw host state string, treating the host's
    /// "unavailable"/"unknown" markers as no reading.
    pub fn from_state(state: &str) -> Self {
        if UNAVAILABLE_STATES.contains(&state) {
            Self::unavailable()
        } else {
            Self::new(state)
        }
    }

    /// `Ok(None)` when the source has no reading to offer.
    pub fn parse(&self) -> Result<Option<f64>> {
        if self.unavailable {
            return Ok(None);
        }
        self.value
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| Error::Parse(format!("sensor value {:?}: {e}", self.value)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SensorKind {
    Temperature,
    Humidity,
}
