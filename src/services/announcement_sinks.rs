//! Destinations for rendered announcements.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{dto::sse::ServerEvent, services::announcer::AnnouncerConfig, state::SseHub};

const EVENT_ANNOUNCEMENT: &str = "announcement";

/// Failure to hand an announcement to one sink.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Building the HTTP client for a webhook failed.
    #[cfg(feature = "webhook-sink")]
    #[error("failed to build HTTP client for `{sink}`")]
    ClientBuilder {
        /// Sink name.
        sink: String,
        /// Client error.
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent.
    #[cfg(feature = "webhook-sink")]
    #[error("failed to send announcement to `{sink}`")]
    RequestSend {
        /// Sink name.
        sink: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The receiving end answered with a non-success status.
    #[error("`{sink}` rejected announcement with status {status}")]
    RequestStatus {
        /// Sink name.
        sink: String,
        /// HTTP status returned.
        status: u16,
    },
}

/// An outbound announcement channel.
pub trait AnnouncementSink: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;
    /// Deliver one rendered message.
    fn announce(&self, message: String) -> BoxFuture<'static, Result<(), DeliveryError>>;
}

/// Writes announcements to the application log.
pub struct LogSink;

impl AnnouncementSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn announce(&self, message: String) -> BoxFuture<'static, Result<(), DeliveryError>> {
        Box::pin(async move {
            info!(%message, "announcement");
            Ok(())
        })
    }
}

/// Fans announcements out to SSE subscribers of `/v1/announcements`.
pub struct BroadcastSink {
    hub: SseHub,
}

impl BroadcastSink {
    /// Publish announcements on `hub`.
    pub fn new(hub: SseHub) -> Self {
        Self { hub }
    }
}

impl AnnouncementSink for BroadcastSink {
    fn name(&self) -> &str {
        "sse"
    }

    fn announce(&self, message: String) -> BoxFuture<'static, Result<(), DeliveryError>> {
        // Nobody listening is not a delivery failure.
        self.hub.broadcast(ServerEvent::new(
            Some(EVENT_ANNOUNCEMENT.to_string()),
            message,
        ));
        Box::pin(async { Ok(()) })
    }
}

fn default_body_field() -> String {
    "content".to_string()
}

/// Webhook target read from the announcer configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Name used in logs.
    pub name: String,
    /// URL receiving a JSON `POST` per announcement.
    pub url: String,
    /// JSON field carrying the message (`content` for Discord, `text` for Slack).
    #[serde(default = "default_body_field")]
    pub body_field: String,
}

/// Posts announcements as JSON to a chat webhook.
#[cfg(feature = "webhook-sink")]
pub struct WebhookSink {
    name: String,
    url: Arc<str>,
    body_field: Arc<str>,
    client: reqwest::Client,
}

#[cfg(feature = "webhook-sink")]
impl WebhookSink {
    /// Build a sink for the given webhook target.
    pub fn new(config: &WebhookConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|source| DeliveryError::ClientBuilder {
                sink: config.name.clone(),
                source,
            })?;

        Ok(Self {
            name: config.name.clone(),
            url: Arc::from(config.url.as_str()),
            body_field: Arc::from(config.body_field.as_str()),
            client,
        })
    }
}

#[cfg(feature = "webhook-sink")]
impl AnnouncementSink for WebhookSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn announce(&self, message: String) -> BoxFuture<'static, Result<(), DeliveryError>> {
        let mut body = serde_json::Map::new();
        body.insert(
            self.body_field.to_string(),
            serde_json::Value::String(message),
        );
        let request = self.client.post(self.url.as_ref()).json(&body);
        let sink = self.name.clone();

        Box::pin(async move {
            let response = request
                .send()
                .await
                .map_err(|source| DeliveryError::RequestSend {
                    sink: sink.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(DeliveryError::RequestStatus {
                    sink,
                    status: response.status().as_u16(),
                })
            }
        })
    }
}

/// Assemble the sinks enabled by `config`; the SSE sink is always present.
pub fn build_sinks(config: &AnnouncerConfig, hub: &SseHub) -> Vec<Arc<dyn AnnouncementSink>> {
    let mut sinks: Vec<Arc<dyn AnnouncementSink>> =
        vec![Arc::new(BroadcastSink::new(hub.clone()))];
    if config.log {
        sinks.push(Arc::new(LogSink));
    }

    for webhook in &config.webhooks {
        #[cfg(feature = "webhook-sink")]
        match WebhookSink::new(webhook) {
            Ok(sink) => sinks.push(Arc::new(sink)),
            Err(err) => warn!(webhook = %webhook.name, error = %err, "skipping webhook sink"),
        }

        #[cfg(not(feature = "webhook-sink"))]
        warn!(
            webhook = %webhook.name,
            "webhook sinks are disabled in this build; skipping"
        );
    }

    sinks
}
