// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use futures_util::lock::Mutex;
use log::{debug, error, info, warn};
use reqwest::StatusCode;
use secrecy::SecretString;
use tokio::sync::watch;

use crate::{
    error::{self, Result},
    router::Location,
    session,
};

use super::{
    api::{self, Executor as _},
    Request, Response, Transport,
};

/// The most recent refresh attempt. Only read or written under the lock.
#[derive(Default)]
struct LastRefresh {
    generation: u64,
    failed: bool,
}

/// Every API call goes through here. The current credential is attached,
/// and a 401 triggers one refresh followed by one replay of the call.
pub(crate) struct Pipeline {
    transport: Arc<dyn Transport>,
    session: Arc<session::Context>,
    refresh_lock: Mutex<LastRefresh>,
    generation: AtomicU64,
    redirect_tx: watch::Sender<Option<Location>>,
}

impl Pipeline {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        session: Arc<session::Context>,
        redirect_tx: watch::Sender<Option<Location>>,
    ) -> Self {
        Self {
            transport,
            session,
            refresh_lock: Mutex::new(LastRefresh::default()),
            generation: AtomicU64::new(0),
            redirect_tx,
        }
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(crate) async fn send(&self, mut req: Request) -> Result<Response> {
        loop {
            let generation = self.generation.load(Ordering::Acquire);
            let bearer = self
                .session
                .credentials()
                .get()
                .await?
                .map(|credential| credential.token().clone());

            let resp = self.transport.send(&req, bearer.as_ref()).await?;
            if resp.status != StatusCode::UNAUTHORIZED {
                return resp.into_result();
            }

            if req.retried() {
                warn!(
                    "{} {} was rejected again after refreshing; logging out",
                    req.method, req.path
                );
                self.force_login().await;
                return resp.into_result();
            }
            req.retried = true;

            info!("{} {} was rejected; refreshing credential", req.method, req.path);
            if let Err(e) = self.refresh(generation, bearer.as_ref()).await {
                error!("Credential refresh failed: {}", e);
                self.force_login().await;
                return Err(e);
            }

            debug!("Replaying {} {}", req.method, req.path);
        }
    }

    /// Obtain a new credential unless a concurrent call already replaced
    /// the one `sent` carried. `seen` is the refresh generation observed
    /// before the rejected call went out; if a refresh finished since then,
    /// its outcome is shared instead of refreshing again.
    async fn refresh(&self, seen: u64, sent: Option<&SecretString>) -> Result<()> {
        let mut last = self.refresh_lock.lock().await;

        if last.generation != seen {
            if last.failed {
                debug!("A concurrent refresh failed; not refreshing again");
                return Err(error::Api::RefreshFailed.into());
            }
            debug!("Credential was already refreshed by a concurrent call");
            return Ok(());
        }

        if let Some(current) = self.session.credentials().get().await? {
            if sent.map_or(true, |sent| !current.same_token(sent)) {
                debug!("Credential was replaced while the call was in flight");
                return Ok(());
            }
        }

        let outcome = self.renew().await;
        last.generation += 1;
        last.failed = outcome.is_err();
        self.generation.store(last.generation, Ordering::Release);
        outcome
    }

    async fn renew(&self) -> Result<()> {
        let tokens = api::Refresh
            .execute_unintercepted(self.transport.as_ref())
            .await?;
        let _credential = self
            .session
            .credentials()
            .set(tokens.access_token, None)
            .await?;
        info!("Stored refreshed credential");
        Ok(())
    }

    async fn force_login(&self) {
        if let Err(e) = self.session.logout().await {
            warn!("Failed to clear session while logging out: {}", e);
        }
        _ = self.redirect_tx.send_replace(Some(Location::login()));
    }
}
