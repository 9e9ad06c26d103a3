// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{mem, time::Duration};

use log::debug;
use tokio_util::bytes::BytesMut;

use crate::error::{self, Result};

const DEFAULT_EVENT: &str = "message";

/// One dispatched `text/event-stream` event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct RawEvent {
    pub(crate) name: String,
    pub(crate) data: String,
    pub(crate) id: Option<String>,
    pub(crate) retry: Option<Duration>,
}

/// A codec for server-sent events. Lines accumulate into an event until a
/// blank line dispatches it.
#[derive(Debug, Default)]
pub(crate) struct EventCodec {
    name: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
    retry: Option<Duration>,
}

impl EventCodec {
    fn field(&mut self, field: &str, value: &str) {
        match field {
            "event" => self.name = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_owned()),
            "retry" => match value.parse() {
                Ok(millis) => self.retry = Some(Duration::from_millis(millis)),
                Err(_) => debug!("Ignoring bad retry value {:?}", value),
            },
            _ => debug!("Ignoring event field {:?}", field),
        }
    }

    fn dispatch(&mut self) -> Option<RawEvent> {
        let name = self.name.take();
        let retry = self.retry.take();
        if self.data.is_empty() {
            return None;
        }

        Some(RawEvent {
            name: name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT.to_owned()),
            data: mem::take(&mut self.data).join("\n"),
            id: self.last_id.clone(),
            retry,
        })
    }
}

impl tokio_util::codec::Decoder for EventCodec {
    type Item = RawEvent;
    type Error = error::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(end) = buf.iter().position(|b| *b == b'\n') {
            let mut line = buf.split_to(end + 1);
            line.truncate(end);
            if line.last() == Some(&b'\r') {
                line.truncate(end - 1);
            }

            let line = std::str::from_utf8(&line)
                .map_err(|e| error::Api::MalformedEvent(e.to_string()))?;

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    debug!("Received {} event ({} bytes)", event.name, event.data.len());
                    return Ok(Some(event));
                }
            } else if !line.starts_with(':') {
                let (field, value) = line.split_once(':').map_or((line, ""), |(field, value)| {
                    (field, value.strip_prefix(' ').unwrap_or(value))
                });
                self.field(field, value);
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(event) = self.decode(buf)? {
            return Ok(Some(event));
        }

        // An event cut off by the end of the stream is never dispatched.
        buf.clear();
        self.name = None;
        self.data.clear();
        Ok(None)
    }
}
