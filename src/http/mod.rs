// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod api;
mod pipeline;

use async_trait::async_trait;
use log::debug;
use reqwest::{header, Method, StatusCode};
use secrecy::{ExposeSecret as _, SecretString};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{self, Result};

pub(crate) use pipeline::Pipeline;

/// An outbound API call, kept as plain data so it can be reissued.
#[derive(Clone, Debug)]
pub(crate) struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<serde_json::Value>,
    retried: bool,
}

impl Request {
    pub(crate) fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub(crate) fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub(crate) fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub(crate) fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub(crate) fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub(crate) fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    pub(crate) const fn retried(&self) -> bool {
        self.retried
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Response {
    pub(crate) status: StatusCode,
    pub(crate) body: Vec<u8>,
}

impl Response {
    pub(crate) fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub(crate) fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn any non-success status into an error carrying the body.
    pub(crate) fn into_result(self) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(error::Api::Status {
                status: self.status,
                body: String::from_utf8_lossy(&self.body).into_owned(),
            }
            .into())
        }
    }
}

/// The raw, un-intercepted way of putting a request on the wire.
#[async_trait]
pub(crate) trait Transport: Send + Sync {
    async fn send(&self, req: &Request, bearer: Option<&SecretString>) -> Result<Response>;
}

pub(crate) struct Reqwest {
    base: Url,
    client: reqwest::Client,
}

impl Reqwest {
    pub(crate) fn new(base: &Url) -> Result<Self> {
        // Paths are joined relative to the base, so it has to look like a
        // directory.
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            base,
            client: reqwest::Client::builder().cookie_store(true).build()?,
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl Transport for Reqwest {
    async fn send(&self, req: &Request, bearer: Option<&SecretString>) -> Result<Response> {
        let url = self.endpoint(&req.path)?;
        debug!("Sending {} {}", req.method, url);

        let mut builder = self.client.request(req.method.clone(), url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(token) = bearer {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            );
        }
        if let Some(body) = req.body.as_ref() {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?.to_vec();
        debug!("Received {} ({} bytes)", status, body.len());
        Ok(Response::new(status, body))
    }
}
