// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{io, result};

use reqwest::StatusCode;
use thiserror::Error;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("API error: {0}")]
    Api(#[from] Api),
    #[error("credential error: {0}")]
    Credential(#[from] Credential),
    #[error("password retrieval error: {0}")]
    Password(#[from] Password),
    #[error("internal communication error: {0}")]
    Internal(#[from] Internal),
    #[error("command execution failed")]
    Command,
    #[error("operation cancelled")]
    Cancelled,
    #[error(r#"navigation to "{}" did not settle after {} redirects"#, .target.escape_default(), .hops)]
    RedirectLoop { target: String, hops: usize },
    #[error(r#"no route matches "{}""#, .0.escape_default())]
    NoRoute(String),
}

impl Error {
    /// Whether the server rejected the call because the caller is not
    /// (or is no longer) authenticated.
    pub(crate) fn is_unauthorized(&self) -> bool {
        matches!(
            *self,
            Self::Api(Api::Status { status, .. }) if status == StatusCode::UNAUTHORIZED
        ) || matches!(*self, Self::Api(Api::RefreshFailed))
    }
}

impl From<pinentry::Error> for Error {
    fn from(value: pinentry::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(
            clippy::wildcard_enum_match_arm,
            clippy::match_wildcard_for_single_variants
        )]
        match value {
            pinentry::Error::Cancelled | pinentry::Error::Timeout => Self::Cancelled,
            pinentry::Error::Io(e) => Self::Io(e),
            _ => Self::Password(Password::Pinentry(value)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Io(value.into())
    }
}

#[derive(Error, Debug)]
pub(crate) enum Api {
    #[error("server responded with {status}: {}", .body.escape_default())]
    Status { status: StatusCode, body: String },
    #[error("event stream terminated")]
    StreamEnded,
    #[error("malformed event stream: {0}")]
    MalformedEvent(String),
    #[error("session ended while waiting for a credential refresh")]
    RefreshFailed,
}

#[derive(Error, Debug)]
pub(crate) enum Credential {
    #[error("token is not a three-part JWT")]
    NotJwt,
    #[error("token payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("token payload is not a JSON claim set: {0}")]
    Claims(serde_json::Error),
    #[error("token has no subject claim")]
    MissingSubject,
}

#[derive(Error, Debug)]
pub(crate) enum Password {
    #[error("no password prompt available")]
    NoPrompt,
    #[error("Pinentry implementation error: {0}")]
    Pinentry(pinentry::Error),
}

#[derive(Error, Debug)]
pub(crate) enum Internal {
    #[error("channel is closed")]
    ChannelClosed,
}
