// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::event::RawEvent;

pub(crate) const DEFAULT_TITLE: &str = "Notification";

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Kind {
    Success,
    Error,
    Warning,
    #[default]
    #[serde(other)]
    Info,
}

impl Kind {
    pub(crate) const fn icon(self) -> &'static str {
        match self {
            Self::Success => "check-circle",
            Self::Error => "exclamation-circle",
            Self::Warning => "exclamation-triangle",
            Self::Info => "info-circle",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Notification {
    pub(crate) kind: Kind,
    pub(crate) title: String,
    pub(crate) message: String,
}

impl Notification {
    fn plain(message: &str) -> Self {
        Self {
            kind: Kind::Info,
            title: DEFAULT_TITLE.to_owned(),
            message: message.to_owned(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.title, self.message)
    }
}

#[derive(Deserialize)]
struct Wire {
    #[serde(default, rename = "type")]
    kind: Option<Kind>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl From<Wire> for Notification {
    fn from(wire: Wire) -> Self {
        Self {
            kind: wire.kind.unwrap_or_default(),
            title: wire
                .title
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_owned()),
            message: wire.message.unwrap_or_default(),
        }
    }
}

/// Interpret a notification payload.
///
/// Publishers sometimes encode the object twice, so a JSON string is
/// decoded once more. Anything that is not a notification object is shown
/// as plain text. Empty payloads carry nothing to show.
pub(crate) fn parse(data: &str) -> Option<Notification> {
    if data.is_empty() {
        return None;
    }

    let value = match serde_json::from_str::<Value>(data) {
        Ok(Value::String(inner)) => serde_json::from_str::<Value>(&inner).ok(),
        Ok(value @ Value::Object(_)) => Some(value),
        Ok(_) | Err(_) => None,
    };

    let parsed = value
        .filter(Value::is_object)
        .and_then(|value| serde_json::from_value::<Wire>(value).ok());
    Some(match parsed {
        Some(wire) => wire.into(),
        None => {
            debug!("Treating notification payload as plain text");
            Notification::plain(data)
        }
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Event {
    Open(String),
    Message(String),
    Notification(Notification),
}

impl Event {
    /// Sort a raw stream event into something the channel acts on. Events
    /// with other names, and notifications without a payload, are dropped.
    pub(crate) fn classify(raw: RawEvent) -> Option<Self> {
        match raw.name.as_str() {
            "open" => Some(Self::Open(raw.data)),
            "message" => Some(Self::Message(raw.data)),
            "notification" => parse(&raw.data).map(Self::Notification),
            other => {
                debug!("Ignoring {:?} event", other);
                None
            }
        }
    }
}
