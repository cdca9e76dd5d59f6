use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Local;
use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

use crate::agenda::model::Event;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("webhook endpoint returned status {0}")]
    Status(u16),
    #[error("webhook request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Serialize)]
struct NotifyPayload {
    title: String,
    description: String,
    category: &'static str,
    date: Option<String>,
    time: String,
    location: String,
    timestamp: String,
}

pub struct Notifier {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl Notifier {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    // The caller's store mutation is already complete when this returns; the
    // POST runs on its own thread and can only report, never undo.
    pub fn dispatch(&self, event: &Event) -> NotifyHandle {
        let payload = NotifyPayload {
            title: event.title.clone(),
            description: event.description.clone(),
            category: event.category.as_str(),
            date: event.date.map(|date| date.format("%Y-%m-%d").to_string()),
            time: event.time.to_string(),
            location: event.location.clone(),
            timestamp: Local::now().to_rfc3339(),
        };
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let join = thread::spawn(move || {
            let result = post_payload(&client, &endpoint, &payload);
            match &result {
                Ok(()) => debug!("notified {endpoint} about '{}'", payload.title),
                Err(err) => warn!("webhook notification for '{}' failed: {err}", payload.title),
            }
            result
        });
        NotifyHandle { join }
    }
}

#[derive(Debug)]
pub struct NotifyHandle {
    join: JoinHandle<Result<(), NotifyError>>,
}

impl NotifyHandle {
    #[allow(dead_code)]
    pub fn is_pending(&self) -> bool {
        !self.join.is_finished()
    }

    pub fn outcome(self) -> Result<(), NotifyError> {
        self.join
            .join()
            .unwrap_or_else(|_| Err(NotifyError::Transport("notifier thread panicked".to_string())))
    }
}

fn post_payload(
    client: &reqwest::blocking::Client,
    endpoint: &str,
    payload: &NotifyPayload,
) -> Result<(), NotifyError> {
    let response = client
        .post(endpoint)
        .json(payload)
        .send()
        .map_err(|err| NotifyError::Transport(err.to_string()))?;
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(NotifyError::Status(status.as_u16()))
    }
}
