// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};
use secrecy::{ExposeSecret as _, SecretString};
use tokio::sync::RwLock;

use crate::{
    credential,
    error::{self, Result},
    http::{
        api::{self, Executor as _},
        Pipeline,
    },
    menu,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) role: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct State {
    pub(crate) user: Option<User>,
    pub(crate) username: Option<String>,
    pub(crate) profile_loaded: bool,
    pub(crate) raw_menus: Vec<menu::Record>,
    pub(crate) menus: Vec<menu::Node>,
}

impl State {
    pub(crate) const fn authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// The shared session: credential, user, menus, and whether dynamic routes
/// have been generated for it.
pub(crate) struct Context {
    credentials: credential::Store,
    state: RwLock<State>,
    routes_generated: AtomicBool,
}

impl Context {
    pub(crate) fn new(credentials: credential::Store) -> Self {
        Self {
            credentials,
            state: RwLock::new(State::default()),
            routes_generated: AtomicBool::new(false),
        }
    }

    pub(crate) const fn credentials(&self) -> &credential::Store {
        &self.credentials
    }

    pub(crate) async fn snapshot(&self) -> State {
        self.state.read().await.clone()
    }

    /// Whether a live credential exists. This is what navigation and the
    /// request pipeline agree on.
    pub(crate) async fn is_authenticated(&self) -> Result<bool> {
        Ok(self.credentials.get().await?.is_some())
    }

    pub(crate) fn routes_generated(&self) -> bool {
        self.routes_generated.load(Ordering::Acquire)
    }

    pub(crate) fn mark_routes_generated(&self) {
        self.routes_generated.store(true, Ordering::Release);
    }

    /// Pick up a credential persisted by an earlier run.
    pub(crate) async fn restore(&self) -> Result<bool> {
        match self.credentials.get().await? {
            Some(credential) => {
                self.restore_from_token(credential.token()).await;
                Ok(self.state.read().await.authenticated())
            }
            None => Ok(false),
        }
    }

    pub(crate) async fn restore_from_token(&self, token: &SecretString) {
        let decoded = credential::decode_claims(token.expose_secret()).and_then(|claims| {
            Ok(User {
                id: claims.sub.ok_or(error::Credential::MissingSubject)?,
                role: claims.role,
            })
        });

        let mut state = self.state.write().await;
        match decoded {
            Ok(user) => {
                info!("Restored session for {}", user.id);
                state.user = Some(user);
            }
            Err(e) => {
                warn!("Could not read user from credential: {}", e);
                state.user = None;
                state.username = None;
            }
        }
    }

    /// Store a freshly issued credential and adopt its user.
    pub(crate) async fn login(&self, token: SecretString) -> Result<()> {
        let credential = self.credentials.set(token, None).await?;
        self.restore_from_token(credential.token()).await;
        Ok(())
    }

    pub(crate) async fn load_profile(&self, api: &Pipeline) {
        match api::GetProfile.execute(api).await {
            Ok(profile) => {
                let mut state = self.state.write().await;
                state.username = profile.username;
                state.profile_loaded = true;
            }
            Err(e) => {
                warn!("Failed to load user profile: {}", e);
                {
                    let mut state = self.state.write().await;
                    state.username = None;
                    state.profile_loaded = true;
                }
                if e.is_unauthorized() {
                    if let Err(e) = self.logout().await {
                        warn!("Failed to clear session: {}", e);
                    }
                }
            }
        }
    }

    pub(crate) async fn logout(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if state.authenticated() {
                info!("Logging out");
            }
            state.user = None;
            state.username = None;
            state.raw_menus.clear();
            state.menus.clear();
            state.profile_loaded = true;
        }
        self.routes_generated.store(false, Ordering::Release);
        self.credentials.clear().await
    }

    pub(crate) async fn set_menus(&self, raw: Vec<menu::Record>) {
        let tree = menu::build_tree(&raw);
        let mut state = self.state.write().await;
        state.raw_menus = raw;
        state.menus = tree;
    }

    /// Fetch and store the menu list. Authorization failures propagate;
    /// anything else leaves an empty menu.
    pub(crate) async fn fetch_menus(&self, api: &Pipeline) -> Result<Vec<menu::Record>> {
        match api::GetMenus.execute(api).await {
            Ok(raw) => {
                self.set_menus(raw.clone()).await;
                Ok(raw)
            }
            Err(e) if e.is_unauthorized() => {
                self.set_menus(Vec::new()).await;
                Err(e)
            }
            Err(e) => {
                warn!("Failed to fetch menus: {}", e);
                self.set_menus(Vec::new()).await;
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use reqwest::StatusCode;
    use tokio::sync::watch;

    use super::*;
    use crate::{
        credential::tests::{memory_store, token_expiring_in, token_with},
        http::{tests::Scripted, Transport},
    };

    fn context_with_pipeline() -> (Arc<Scripted>, Arc<Context>, Pipeline) {
        let transport = Arc::new(Scripted::default());
        let session = Arc::new(Context::new(memory_store()));
        let (redirect_tx, _) = watch::channel(None);
        let wire: Arc<dyn Transport> = Arc::<Scripted>::clone(&transport);
        let pipeline = Pipeline::new(
            wire,
            Arc::clone(&session),
            redirect_tx,
        );
        (transport, session, pipeline)
    }

    #[tokio::test]
    async fn restore_from_valid_token() -> Result<()> {
        let session = Context::new(memory_store());
        let token = token_expiring_in("alice", Duration::minutes(5));
        let _credential = session
            .credentials()
            .set(SecretString::new(token), None)
            .await?;

        assert!(session.restore().await?);
        let state = session.snapshot().await;
        assert_eq!(
            state.user,
            Some(User {
                id: "alice".to_owned(),
                role: Some("ROLE_USER".to_owned()),
            })
        );
        assert!(!state.profile_loaded);
        Ok(())
    }

    #[tokio::test]
    async fn restore_from_garbage_token() {
        let session = Context::new(memory_store());
        session
            .restore_from_token(&SecretString::new("garbage".to_owned()))
            .await;
        assert!(!session.snapshot().await.authenticated());

        session
            .restore_from_token(&SecretString::new(token_with(
                &serde_json::json!({"role": "ROLE_USER"}),
            )))
            .await;
        assert!(!session.snapshot().await.authenticated());
    }

    #[tokio::test]
    async fn logout_is_idempotent() -> Result<()> {
        let session = Context::new(memory_store());
        session
            .login(SecretString::new(token_expiring_in("alice", Duration::minutes(5))))
            .await?;
        session.set_menus(vec![menu::tests::record(1, None, 0, "/a")]).await;
        session.mark_routes_generated();

        session.logout().await?;
        session.logout().await?;

        let state = session.snapshot().await;
        assert!(!state.authenticated());
        assert!(state.profile_loaded);
        assert!(state.menus.is_empty() && state.raw_menus.is_empty());
        assert!(!session.routes_generated());
        assert!(!session.is_authenticated().await?);
        Ok(())
    }

    #[tokio::test]
    async fn load_profile_success() -> Result<()> {
        let (transport, session, pipeline) = context_with_pipeline();
        session
            .login(SecretString::new(token_expiring_in("alice", Duration::minutes(5))))
            .await?;
        transport
            .answer("/auth/me", StatusCode::OK, r#"{"username":"Alice"}"#)
            .await;

        session.load_profile(&pipeline).await;
        let state = session.snapshot().await;
        assert_eq!(state.username.as_deref(), Some("Alice"));
        assert!(state.profile_loaded);
        Ok(())
    }

    #[tokio::test]
    async fn load_profile_failure_still_completes() -> Result<()> {
        let (transport, session, pipeline) = context_with_pipeline();
        session
            .login(SecretString::new(token_expiring_in("alice", Duration::minutes(5))))
            .await?;
        transport
            .answer("/auth/me", StatusCode::INTERNAL_SERVER_ERROR, "")
            .await;

        session.load_profile(&pipeline).await;
        let state = session.snapshot().await;
        assert!(state.username.is_none());
        assert!(state.profile_loaded);
        assert!(state.authenticated());
        Ok(())
    }

    #[tokio::test]
    async fn load_profile_unauthorized_logs_out() -> Result<()> {
        let (transport, session, pipeline) = context_with_pipeline();
        session
            .login(SecretString::new(token_expiring_in("alice", Duration::minutes(5))))
            .await?;
        transport.answer("/auth/me", StatusCode::UNAUTHORIZED, "").await;
        transport
            .answer("/auth/refresh", StatusCode::UNAUTHORIZED, "")
            .await;

        session.load_profile(&pipeline).await;
        let state = session.snapshot().await;
        assert!(!state.authenticated());
        assert!(state.profile_loaded);
        assert!(!session.is_authenticated().await?);
        Ok(())
    }

    #[tokio::test]
    async fn fetch_menus_builds_tree_and_degrades() -> Result<()> {
        let (transport, session, pipeline) = context_with_pipeline();
        session
            .login(SecretString::new(token_expiring_in("alice", Duration::minutes(5))))
            .await?;
        transport
            .answer(
                "/menus",
                StatusCode::OK,
                r#"[
                    {"id": 2, "parentId": 1, "menuOrder": 0, "path": "/a/b", "name": "B"},
                    {"id": 1, "parentId": null, "menuOrder": 0, "path": "/a", "name": "A"}
                ]"#,
            )
            .await;
        transport
            .answer("/menus", StatusCode::SERVICE_UNAVAILABLE, "")
            .await;

        let raw = session.fetch_menus(&pipeline).await?;
        assert_eq!(raw.len(), 2);
        let state = session.snapshot().await;
        assert_eq!(state.menus.len(), 1);
        assert_eq!(state.menus[0].children.len(), 1);

        assert!(session.fetch_menus(&pipeline).await?.is_empty());
        assert!(session.snapshot().await.menus.is_empty());
        Ok(())
    }
}
