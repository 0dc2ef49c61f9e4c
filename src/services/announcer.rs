//! Rate-limited consumer turning score events into announcements.
//!
//! A single background task drains both event queues, waiting on a
//! [`TokenBucket`] before each event so bursts of store mutations never turn
//! into bursts of outbound messages. Each admitted event is rendered once and
//! handed to every registered [`AnnouncementSink`].

use std::sync::Arc;

use serde::Deserialize;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    services::{
        announcement_sinks::{AnnouncementSink, WebhookConfig},
        notifier::{OverflowPolicy, ScoreEvent, ScoreEventReceivers},
        rate_limit::TokenBucket,
    },
    state::shutdown_requested,
};

/// Placeholder replaced by the announcement text in [`AnnouncerConfig::template`].
pub const MESSAGE_PLACEHOLDER: &str = "{message}";

/// Announcement pipeline settings, injected at construction.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnnouncerConfig {
    /// Announcements admitted per second.
    pub per_second: u32,
    /// Announcements that may go out back to back after a quiet period.
    pub burst: u32,
    /// Message template; `{message}` is replaced by the announcement text.
    pub template: String,
    /// Queue slots per event kind between the store and the announcer.
    pub queue_capacity: usize,
    /// What the store does when a queue is full.
    pub overflow: OverflowPolicy,
    /// Whether announcements are also written to the log.
    pub log: bool,
    /// Chat webhooks receiving every announcement.
    pub webhooks: Vec<WebhookConfig>,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            per_second: 1,
            burst: 1,
            template: MESSAGE_PLACEHOLDER.to_string(),
            queue_capacity: 64,
            overflow: OverflowPolicy::default(),
            log: true,
            webhooks: Vec::new(),
        }
    }
}

/// Human readable text for an event, before templating.
pub fn announcement_text(event: &ScoreEvent) -> String {
    match event {
        ScoreEvent::NewTeam(id) => format!("A challenger appears! ({id})"),
        ScoreEvent::NewLeader(id) => format!("{id} is now in the lead!"),
    }
}

/// Substitute `message` into `template` and escape the result for HTML contexts.
pub fn render_announcement(template: &str, message: &str) -> String {
    escape_html(&template.replace(MESSAGE_PLACEHOLDER, message))
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Background consumer of [`ScoreEventReceivers`].
pub struct Announcer {
    events: ScoreEventReceivers,
    limiter: TokenBucket,
    template: String,
    sinks: Vec<Arc<dyn AnnouncementSink>>,
}

impl Announcer {
    /// Build an announcer draining `events` into `sinks`.
    pub fn new(
        config: &AnnouncerConfig,
        events: ScoreEventReceivers,
        sinks: Vec<Arc<dyn AnnouncementSink>>,
    ) -> Self {
        Self {
            events,
            limiter: TokenBucket::per_second(config.per_second, config.burst),
            template: config.template.clone(),
            sinks,
        }
    }

    /// Run the loop on a dedicated task.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Consume events until `shutdown` turns `true` (or its sender is dropped)
    /// or both event queues are closed.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(sinks = self.sinks.len(), "announcer started");

        loop {
            tokio::select! {
                _ = self.limiter.acquire() => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }

            let event = tokio::select! {
                event = next_event(&mut self.events) => event,
                _ = shutdown_requested(&mut shutdown) => break,
            };
            let Some(event) = event else {
                debug!("event queues closed");
                break;
            };

            let message = render_announcement(&self.template, &announcement_text(&event));
            deliver(&self.sinks, &event, message).await;
        }

        info!("announcer stopped");
    }
}

/// Hand `message` to every sink; a failing sink never stops the others.
async fn deliver(sinks: &[Arc<dyn AnnouncementSink>], event: &ScoreEvent, message: String) {
    for sink in sinks {
        if let Err(err) = sink.announce(message.clone()).await {
            warn!(
                sink = sink.name(),
                kind = event.kind(),
                team_id = %event.team_id(),
                error = %err,
                "failed to send announcement"
            );
        }
    }
}

/// Next event from either queue, with no priority between them.
async fn next_event(events: &mut ScoreEventReceivers) -> Option<ScoreEvent> {
    tokio::select! {
        Some(id) = events.new_team.recv() => Some(ScoreEvent::NewTeam(id)),
        Some(id) = events.new_leader.recv() => Some(ScoreEvent::NewLeader(id)),
        else => None,
    }
}
