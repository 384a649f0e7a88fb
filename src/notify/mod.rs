//! Fire-and-forget notification delivery. Trip state transitions must never
//! fail because a notification could not be sent, so delivery happens on a
//! detached task and errors are only logged.

use serde_json::json;
use uuid::Uuid;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    TripAccepted,
    TripStarted,
    TripCompleted,
    TripCancelled,
}

impl Event {
    fn as_str(self) -> &'static str {
        match self {
            Event::TripAccepted => "trip_accepted",
            Event::TripStarted => "trip_started",
            Event::TripCompleted => "trip_completed",
            Event::TripCancelled => "trip_cancelled",
        }
    }
}

#[derive(Clone)]
pub enum Notifier {
    /// POSTs events to an external messaging service.
    Webhook {
        client: reqwest::Client,
        url: String,
    },
    /// Drops events (no webhook configured, or under test).
    Noop,
}

impl Notifier {
    pub fn from_config(config: &Config) -> Self {
        match &config.notify_webhook_url {
            Some(url) => Notifier::Webhook {
                client: reqwest::Client::new(),
                url: url.clone(),
            },
            None => Notifier::Noop,
        }
    }

    /// Queue a notification for a user. Returns immediately; the send runs on
    /// its own task and a failed send is logged, never propagated.
    pub fn notify(&self, user_id: Uuid, event: Event, payload: serde_json::Value) {
        tracing::debug!(user_id = %user_id, event = event.as_str(), "notify");

        let Notifier::Webhook { client, url } = self else {
            return;
        };

        let client = client.clone();
        let url = url.clone();
        let body = json!({
            "user_id": user_id,
            "event": event.as_str(),
            "payload": payload,
        });

        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(response) if !response.status().is_success() => {
                    tracing::warn!(
                        status = %response.status(),
                        user_id = %user_id,
                        "notification webhook rejected event"
                    );
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, user_id = %user_id, "notification delivery failed");
                }
            }
        });
    }
}
