// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::time;

use chrono::{DateTime, Duration, Utc};
use futures_util::lock::Mutex;
use log::{debug, info, warn};
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};

use crate::{
    error::{self, Result},
    storage::Storage,
};

pub(crate) const RECORD_NAME: &str = "accessToken";

/// Lifetime used when the token does not carry a readable expiry claim.
pub(crate) const DEFAULT_LIFETIME: Duration = Duration::minutes(30);

/// Shortest lifetime a record is ever persisted with, even for tokens that
/// claim to have expired already.
pub(crate) const MINIMUM_LIFETIME: Duration = Duration::minutes(1);

/// The persisted, domain-scoped, time-limited record holding the bearer
/// token.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Cookie {
    pub(crate) name: String,
    pub(crate) value: String,
    pub(crate) domain: String,
    pub(crate) expires_at: DateTime<Utc>,
}

impl Cookie {
    fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Unverified claims read from a JWT payload.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub(crate) struct Claims {
    #[serde(default)]
    pub(crate) sub: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<String>,
    #[serde(default)]
    pub(crate) exp: Option<i64>,
}

impl Claims {
    pub(crate) fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

pub(crate) fn decode_claims(token: &str) -> Result<Claims> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(error::Credential::NotJwt.into()),
    };

    let bytes = base64::decode_config(payload, base64::URL_SAFE_NO_PAD)
        .map_err(error::Credential::from)?;
    serde_json::from_slice(&bytes).map_err(|e| error::Credential::Claims(e).into())
}

/// How long a record for this token should be kept, measured from `now`.
pub(crate) fn lifetime(token: &str, now: DateTime<Utc>) -> Duration {
    match decode_claims(token).map(|claims| claims.expires_at()) {
        Ok(Some(expires_at)) => (expires_at - now).max(MINIMUM_LIFETIME),
        Ok(None) => DEFAULT_LIFETIME,
        Err(e) => {
            debug!("Could not read expiry from token, using default lifetime: {}", e);
            DEFAULT_LIFETIME
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Credential {
    token: SecretString,
    expires_at: DateTime<Utc>,
}

impl Credential {
    pub(crate) fn token(&self) -> &SecretString {
        &self.token
    }

    pub(crate) const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub(crate) fn same_token(&self, other: &SecretString) -> bool {
        self.token.expose_secret() == other.expose_secret()
    }
}

/// Owner of the single live credential.
pub(crate) struct Store {
    domain: String,
    storage: Mutex<Box<dyn Storage<Cookie>>>,
}

impl Store {
    pub(crate) fn new(domain: &str, storage: Box<dyn Storage<Cookie>>) -> Self {
        let placement = storage.placement();
        if placement.survives_exit() {
            debug!("Credentials for {} are kept in {}", domain, placement);
        } else {
            info!("Credentials for {} will only be kept for this process", domain);
        }

        Self {
            domain: domain.to_owned(),
            storage: Mutex::new(storage),
        }
    }

    pub(crate) async fn get(&self) -> Result<Option<Credential>> {
        let mut storage = self.storage.lock().await;
        let cookie = match storage.load().await {
            Ok(Some(cookie)) if cookie.name == RECORD_NAME && cookie.domain == self.domain => {
                cookie
            }
            Ok(Some(cookie)) => {
                warn!(
                    "Ignoring stored record {} for domain {}",
                    cookie.name, cookie.domain
                );
                return Ok(None);
            }
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!("Failed to decode stored credential, so it is discarded: {}", e);
                storage.discard().await?;
                return Ok(None);
            }
        };

        if !cookie.is_live_at(Utc::now()) {
            debug!("Stored credential expired at {}", cookie.expires_at);
            storage.discard().await?;
            return Ok(None);
        }

        Ok(Some(Credential {
            token: SecretString::new(cookie.value),
            expires_at: cookie.expires_at,
        }))
    }

    /// Persist `token`, replacing any existing credential.
    ///
    /// The record lives as long as the token claims to be valid (at least
    /// [`MINIMUM_LIFETIME`]). `ttl` can only shorten that.
    pub(crate) async fn set(
        &self,
        token: SecretString,
        ttl: Option<time::Duration>,
    ) -> Result<Credential> {
        let now = Utc::now();
        let mut kept_for = lifetime(token.expose_secret(), now);
        if let Some(cap) = ttl.and_then(|ttl| Duration::from_std(ttl).ok()) {
            kept_for = kept_for.min(cap);
        }

        let cookie = Cookie {
            name: RECORD_NAME.to_owned(),
            value: token.expose_secret().clone(),
            domain: self.domain.clone(),
            expires_at: now + kept_for,
        };
        self.storage.lock().await.save(&cookie).await?;
        debug!("Stored credential until {}", cookie.expires_at);

        Ok(Credential {
            token,
            expires_at: cookie.expires_at,
        })
    }

    pub(crate) async fn clear(&self) -> Result<()> {
        self.storage.lock().await.discard().await
    }
}
