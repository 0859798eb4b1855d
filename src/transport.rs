use std::future::Future;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::{Error, Result};

/// Outbound half of the message channel. Delivery is fire-and-forget: an `Ok`
/// means the message was handed over, not that the unit acted on it.
pub trait Publisher: Send + Sync {
    fn publish(&self, topic: &str, payload: &str) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub topic: String,
    pub payload: String,
}

/// Hands every publication to a channel, for hosts that own the broker
/// connection themselves.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<Publication>,
}

impl ChannelPublisher {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Publication>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl Publisher for ChannelPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        self.tx
            .send(Publication {
                topic: topic.to_string(),
                payload: payload.to_string(),
            })
            .await
            .map_err(|_| Error::ChannelClosed)
    }
}

/// Sends commands straight to a Tasmota bridge through its HTTP command API.
/// The Tasmota command is the last segment of the topic
/// (`cmnd/ir_bridge/IRhvac` runs `IRhvac`).
pub struct HttpPublisher {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl HttpPublisher {
    pub fn new(host: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base_url: format!("http://{}", host.into()),
            credentials: None,
        })
    }

    pub fn protocol(mut self, proto: &str) -> Self {
        if let Some((_, rest)) = self.base_url.split_once("://") {
            self.base_url = format!("{proto}://{rest}");
        }
        self
    }

    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }
}

pub(crate) fn command_name(topic: &str) -> &str {
    topic.rsplit('/').next().unwrap_or(topic)
}

impl Publisher for HttpPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        let url = format!("{}/cm", self.base_url);
        let cmnd = format!("{} {payload}", command_name(topic));
        debug!(url = %url, command = command_name(topic), "publishing over HTTP");

        let mut request = self.http.get(&url).query(&[("cmnd", cmnd.as_str())]);
        if let Some((user, password)) = &self.credentials {
            request = request.query(&[("user", user.as_str()), ("password", password.as_str())]);
        }
        let resp = request.send().await?.error_for_status()?;
        trace!(status = resp.status().as_u16(), "bridge accepted command");
        Ok(())
    }
}
