mod client;
mod config;
mod diff;
mod error;
mod logger;
mod protocol;
mod restore;
mod sensor;
mod state;
mod transport;
mod types;

pub use client::{IrHvacClient, IrHvacClientBuilder};
pub use config::{Config, DEFAULT_NAME};
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use protocol::{
    accepts, apply_feedback, decode_fan, encode_command, encode_fan, extract_irhvac, IrHvacCommand,
    IrHvacFeedback, ENVELOPE_KEY, IRHVAC_KEY,
};
pub use restore::RestoredState;
pub use sensor::SensorReading;
pub use state::{ClimateState, Toggles};
pub use transport::{ChannelPublisher, HttpPublisher, Publication, Publisher};
pub use types::*;
