// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use secrecy::{ExposeSecret as _, SecretString};
use serde::{de::DeserializeOwned, Deserialize};
use tabled::Tabled;

use crate::{error::Result, menu, notification};

use super::{Pipeline, Request, Response, Transport};

/// A typed API call.
pub(crate) trait Endpoint {
    type Response: DeserializeOwned + Send;

    fn request(&self) -> Request;

    fn parse(resp: &Response) -> Result<Self::Response> {
        resp.json()
    }
}

#[async_trait]
pub(crate) trait Executor: Endpoint {
    /// Run the call through the pipeline, with credential refresh.
    async fn execute(self, pipeline: &Pipeline) -> Result<Self::Response>
    where
        Self: Sized + Send,
    {
        let resp = pipeline.send(self.request()).await?;
        Self::parse(&resp)
    }

    /// Run the call directly against the transport. Calls that issue
    /// credentials go this way so that they never recurse into the refresh
    /// protocol.
    async fn execute_unintercepted(self, transport: &dyn Transport) -> Result<Self::Response>
    where
        Self: Sized + Send,
    {
        let resp = transport.send(&self.request(), None).await?.into_result()?;
        Self::parse(&resp)
    }
}

impl<T: Endpoint> Executor for T {}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Tokens {
    pub(crate) access_token: SecretString,
}

#[derive(Clone, Debug)]
pub(crate) struct Refresh;

impl Endpoint for Refresh {
    type Response = Tokens;

    fn request(&self) -> Request {
        Request::post("/auth/refresh")
    }
}

pub(crate) struct Login {
    pub(crate) username: String,
    pub(crate) password: SecretString,
}

impl Endpoint for Login {
    type Response = Tokens;

    fn request(&self) -> Request {
        Request::post("/auth/login").with_json(serde_json::json!({
            "username": self.username,
            "password": self.password.expose_secret(),
        }))
    }
}

/// Account creation. The server answers with a plain-text greeting, not
/// with tokens, so a new account still has to sign in.
pub(crate) struct Signup {
    pub(crate) username: String,
    pub(crate) password: SecretString,
}

impl Endpoint for Signup {
    type Response = ();

    fn request(&self) -> Request {
        Request::post("/auth/signup").with_json(serde_json::json!({
            "username": self.username,
            "password": self.password.expose_secret(),
        }))
    }

    fn parse(_: &Response) -> Result<Self::Response> {
        Ok(())
    }
}

/// Identity providers the server can exchange an authorization code with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Provider {
    Kakao,
    Google,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kakao => write!(f, "kakao"),
            Self::Google => write!(f, "google"),
        }
    }
}

/// Trade the code an OAuth provider redirected back with for tokens.
#[derive(Clone, Debug)]
pub(crate) struct OAuthExchange {
    pub(crate) provider: Provider,
    pub(crate) code: String,
}

impl Endpoint for OAuthExchange {
    type Response = Tokens;

    fn request(&self) -> Request {
        Request::post(format!("/auth/{}", self.provider))
            .with_json(serde_json::json!({ "code": self.code }))
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Logout;

impl Endpoint for Logout {
    type Response = ();

    fn request(&self) -> Request {
        Request::post("/auth/logout")
    }

    fn parse(_: &Response) -> Result<Self::Response> {
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub(crate) struct Profile {
    #[serde(default)]
    pub(crate) username: Option<String>,
}

#[derive(Clone, Debug)]
pub(crate) struct GetProfile;

impl Endpoint for GetProfile {
    type Response = Profile;

    fn request(&self) -> Request {
        Request::get("/auth/me")
    }
}

#[derive(Clone, Debug)]
pub(crate) struct GetMenus;

impl Endpoint for GetMenus {
    type Response = Vec<menu::Record>;

    fn request(&self) -> Request {
        Request::get("/menus")
    }
}

/// A stored notification, as listed by `GET /notifications`.
#[derive(Clone, Debug, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredNotification {
    #[tabled(rename = "ID")]
    pub(crate) id: i64,
    #[serde(default, rename = "type")]
    #[tabled(rename = "Type")]
    pub(crate) kind: notification::Kind,
    #[serde(default)]
    #[tabled(rename = "Title", display_with = "display_optional")]
    pub(crate) title: Option<String>,
    #[serde(default)]
    #[tabled(rename = "Message", display_with = "display_optional")]
    pub(crate) message: Option<String>,
    #[serde(default)]
    #[tabled(rename = "Read")]
    pub(crate) is_read: bool,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    #[tabled(rename = "Created", display_with = "display_timestamp")]
    pub(crate) created_at: Option<NaiveDateTime>,
}

fn display_optional(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn display_timestamp(value: &Option<NaiveDateTime>) -> String {
    value.map(|t| t.to_string()).unwrap_or_default()
}

/// The server formats notification timestamps as `yyyy-MM-dd HH:mm:ss`.
mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize as _, Deserializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Page<T> {
    pub(crate) content: Vec<T>,
    #[serde(default)]
    pub(crate) total_elements: u64,
    #[serde(default)]
    pub(crate) number: u32,
}

#[derive(Clone, Debug)]
pub(crate) struct ListNotifications {
    pub(crate) page: u32,
    pub(crate) size: u32,
}

impl Endpoint for ListNotifications {
    type Response = Page<StoredNotification>;

    fn request(&self) -> Request {
        Request::get("/notifications")
            .with_query("page", self.page)
            .with_query("size", self.size)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct MarkRead {
    pub(crate) id: i64,
}

impl Endpoint for MarkRead {
    type Response = ();

    fn request(&self) -> Request {
        Request::patch(format!("/notifications/{}/read", self.id))
    }

    fn parse(_: &Response) -> Result<Self::Response> {
        Ok(())
    }
}

/// Store a notification and fan it out to every subscriber.
#[derive(Clone, Debug)]
pub(crate) struct SendNotification {
    pub(crate) kind: notification::Kind,
    pub(crate) title: String,
    pub(crate) message: String,
}

impl Endpoint for SendNotification {
    type Response = ();

    fn request(&self) -> Request {
        Request::post("/notifications/send").with_json(serde_json::json!({
            "type": self.kind,
            "title": self.title,
            "message": self.message,
        }))
    }

    fn parse(_: &Response) -> Result<Self::Response> {
        Ok(())
    }
}
