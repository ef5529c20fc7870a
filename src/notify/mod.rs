// src/notify/mod.rs
pub mod discord;
pub mod email;
pub mod slack;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;

use crate::ingest::types::Listing;

/// A delivery channel for newly detected listings.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, new_items: &[Listing]) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Plain-text digest shared by the chat channels and the log fallback.
pub fn render_text(items: &[Listing]) -> String {
    let mut out = format!("New listings ({}):\n", items.len());
    for it in items {
        out.push_str(&format!("- {} | {} | {}\n", it.name, it.price, it.link));
    }
    out
}

/// Writes new listings to the log; used when nothing else is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, new_items: &[Listing]) -> Result<()> {
        for it in new_items {
            tracing::info!(
                target: "notify",
                name = %it.name,
                price = %it.price,
                link = %it.link,
                source = %it.source,
                "new listing"
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Fans one batch out to every configured channel.
pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Email, Slack and Discord as configured in the environment; log-only when none are.
    pub fn from_env() -> Self {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();

        match email::EmailNotifier::from_env() {
            Ok(Some(e)) => channels.push(Box::new(e)),
            Ok(None) => tracing::debug!(target: "notify", "email disabled (EMAIL_USER/EMAIL_PASS unset)"),
            Err(e) => tracing::error!(target: "notify", error = ?e, "email misconfigured, disabled"),
        }
        if let Some(s) = slack::SlackNotifier::from_env() {
            channels.push(Box::new(s));
        }
        if let Some(d) = discord::DiscordNotifier::from_env() {
            channels.push(Box::new(d));
        }
        if channels.is_empty() {
            channels.push(Box::new(LogNotifier));
        }
        Self { channels }
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// True when every channel delivered. Failures are logged, never raised.
    pub async fn notify(&self, new_items: &[Listing]) -> bool {
        let mut all_ok = true;
        for ch in &self.channels {
            match ch.send(new_items).await {
                Ok(()) => {
                    tracing::info!(target: "notify", channel = ch.name(), count = new_items.len(), "notification sent");
                }
                Err(e) => {
                    tracing::error!(target: "notify", channel = ch.name(), error = ?e, "notification failed");
                    all_ok = false;
                }
            }
        }
        if !all_ok {
            counter!("watch_notify_failures_total").increment(1);
        }
        all_ok
    }
}
