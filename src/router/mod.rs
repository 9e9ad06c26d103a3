// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod guard;
mod location;

use std::sync::Arc;

use futures_util::lock::Mutex;
use log::{debug, error, info};
use tokio::sync::{watch, RwLock};

use crate::{
    error::{Error, Result},
    http::Pipeline,
    route::{self, RouteEntry, RouteTable},
    session, view,
};

use guard::Decision;
pub(crate) use location::Location;

const MAX_HOPS: usize = 8;

/// Where a navigation ended up.
#[derive(Clone, Debug)]
pub(crate) struct Resolution {
    pub(crate) location: Location,
    pub(crate) entry: RouteEntry,
    pub(crate) params: Vec<(String, String)>,
    pub(crate) redirects: Vec<Location>,
}

pub(crate) struct Router {
    session: Arc<session::Context>,
    pipeline: Arc<Pipeline>,
    views: view::Registry,
    table: RwLock<RouteTable>,
    build_lock: Mutex<()>,
    redirect_rx: Mutex<watch::Receiver<Option<Location>>>,
}

impl Router {
    pub(crate) fn new(
        session: Arc<session::Context>,
        pipeline: Arc<Pipeline>,
        views: view::Registry,
        redirect_rx: watch::Receiver<Option<Location>>,
    ) -> Self {
        Self {
            session,
            pipeline,
            views,
            table: RwLock::new(RouteTable::new()),
            build_lock: Mutex::new(()),
            redirect_rx: Mutex::new(redirect_rx),
        }
    }

    pub(crate) async fn routes(&self) -> Vec<RouteEntry> {
        self.table.read().await.entries().to_vec()
    }

    /// Evaluate the guard for `target` and follow its redirects until a
    /// route is allowed.
    pub(crate) async fn navigate(&self, target: &str) -> Result<Resolution> {
        let mut location = Location::parse(target);
        let mut redirects = Vec::new();

        for _ in 0..MAX_HOPS {
            debug!("Evaluating navigation to {}", location);
            let authenticated = self.session.is_authenticated().await?;
            let access = self.table.read().await.classify(&location.path);

            match guard::decide(
                &location,
                access,
                authenticated,
                self.session.routes_generated(),
            ) {
                Decision::Allow => return self.resolve(location, redirects).await,
                Decision::Redirect(next) => {
                    redirects.push(next.clone());
                    location = next;
                }
                Decision::ClearAndRedirect(next) => {
                    self.session.logout().await?;
                    redirects.push(next.clone());
                    location = next;
                }
                Decision::BuildRoutes => {
                    if let Err(e) = self.ensure_routes().await {
                        error!("Failed to generate routes: {}", e);
                        self.session.logout().await?;
                        let next = Location::login();
                        redirects.push(next.clone());
                        location = next;
                    }
                }
            }
        }

        Err(Error::RedirectLoop {
            target: target.to_owned(),
            hops: redirects.len(),
        })
    }

    async fn resolve(&self, location: Location, redirects: Vec<Location>) -> Result<Resolution> {
        let table = self.table.read().await;
        let matched = table
            .resolve(&location.path)
            .ok_or_else(|| Error::NoRoute(location.path.clone()))?;

        Ok(Resolution {
            entry: matched.entry.clone(),
            params: matched.params,
            location,
            redirects,
        })
    }

    /// Fetch the menus and register their routes, at most once for the
    /// session even when several navigations race here.
    async fn ensure_routes(&self) -> Result<()> {
        let _guard = self.build_lock.lock().await;
        if self.session.routes_generated() {
            return Ok(());
        }

        let menus = self.session.fetch_menus(&self.pipeline).await?;
        let mut table = self.table.write().await;
        let registered = route::build_routes(&mut table, &self.session, &self.views, &menus);
        info!(
            "Route table now has {} entries ({} from menus)",
            table.entries().len(),
            registered
        );
        Ok(())
    }

    /// The login redirect requested by the request pipeline after it gave
    /// up on the session, if one is pending.
    pub(crate) async fn take_redirect(&self) -> Option<Location> {
        let mut rx = self.redirect_rx.lock().await;
        if !rx.has_changed().unwrap_or(false) {
            return None;
        }
        let pending = rx.borrow_and_update().clone();
        pending
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use reqwest::StatusCode;
    use secrecy::SecretString;

    use super::*;
    use crate::{
        credential,
        http::{tests::Scripted, Transport},
        route::{Access, Layout},
    };

    const DASHBOARD_MENU: &str = r#"[
        {"id": 1, "parentId": null, "menuOrder": 0, "path": "/dashboard",
         "name": "Dashboard", "component": "views/Dashboard.vue"}
    ]"#;

    struct Fixture {
        transport: Arc<Scripted>,
        session: Arc<session::Context>,
        router: Arc<Router>,
    }

    fn fixture() -> Fixture {
        let transport = Arc::new(Scripted::default());
        let session = Arc::new(session::Context::new(credential::tests::memory_store()));
        let (redirect_tx, redirect_rx) = watch::channel(None);
        let wire: Arc<dyn Transport> = Arc::<Scripted>::clone(&transport);
        let pipeline = Arc::new(Pipeline::new(
            wire,
            Arc::clone(&session),
            redirect_tx,
        ));
        let router = Arc::new(Router::new(
            Arc::clone(&session),
            pipeline,
            view::Registry::default(),
            redirect_rx,
        ));
        Fixture {
            transport,
            session,
            router,
        }
    }

    async fn login(session: &session::Context) -> Result<()> {
        session
            .login(SecretString::new(credential::tests::token_expiring_in(
                "alice",
                Duration::minutes(10),
            )))
            .await
    }

    #[tokio::test]
    async fn unauthenticated_protected_redirects_to_login() -> Result<()> {
        let f = fixture();

        let resolution = f.router.navigate("/users").await?;
        assert_eq!(resolution.location, Location::login_with_redirect("/users"));
        assert_eq!(resolution.entry.name, "LoginPage");
        assert_eq!(resolution.redirects.len(), 1);
        assert!(!f.session.snapshot().await.authenticated());
        Ok(())
    }

    #[tokio::test]
    async fn unauthenticated_public_is_allowed() -> Result<()> {
        let f = fixture();

        let resolution = f.router.navigate("/oauth2/redirect/google").await?;
        assert_eq!(resolution.entry.name, "OAuthRedirectPage");
        assert_eq!(
            resolution.params,
            vec![("provider".to_owned(), "google".to_owned())]
        );
        assert!(resolution.redirects.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn first_authenticated_navigation_builds_routes() -> Result<()> {
        let f = fixture();
        login(&f.session).await?;
        f.transport.answer("/menus", StatusCode::OK, DASHBOARD_MENU).await;

        let resolution = f.router.navigate("/dashboard").await?;
        assert_eq!(resolution.location, Location::landing());
        assert_eq!(resolution.entry.name, "Dashboard");
        assert_eq!(resolution.entry.access, Access::Protected);
        assert_eq!(resolution.entry.layout, Layout::Full);
        assert!(resolution.redirects.is_empty());
        assert!(f.session.routes_generated());
        assert_eq!(f.session.snapshot().await.menus.len(), 1);

        let routes = f.router.routes().await;
        assert_eq!(
            routes.last().map(|entry| entry.name.as_str()),
            Some(route::NOT_FOUND)
        );
        Ok(())
    }

    #[tokio::test]
    async fn authenticated_public_goes_to_landing() -> Result<()> {
        let f = fixture();
        login(&f.session).await?;
        f.transport.answer("/menus", StatusCode::OK, DASHBOARD_MENU).await;

        let resolution = f.router.navigate("/login").await?;
        assert_eq!(resolution.location, Location::landing());
        assert_eq!(resolution.redirects, vec![Location::landing()]);
        assert_eq!(resolution.entry.name, "Dashboard");
        Ok(())
    }

    #[tokio::test]
    async fn rejected_menu_fetch_sends_to_login() -> Result<()> {
        let f = fixture();
        login(&f.session).await?;
        f.transport.answer("/menus", StatusCode::UNAUTHORIZED, "").await;
        f.transport
            .answer("/auth/refresh", StatusCode::UNAUTHORIZED, "")
            .await;

        let resolution = f.router.navigate("/dashboard").await?;
        assert_eq!(resolution.location, Location::login());
        assert_eq!(resolution.entry.name, "LoginPage");
        assert!(!f.session.routes_generated());
        assert!(!f.session.is_authenticated().await?);
        assert_eq!(f.router.take_redirect().await, Some(Location::login()));
        assert_eq!(f.router.take_redirect().await, None);
        Ok(())
    }

    #[tokio::test]
    async fn unavailable_menus_still_settle() -> Result<()> {
        let f = fixture();
        login(&f.session).await?;
        f.transport
            .answer("/menus", StatusCode::SERVICE_UNAVAILABLE, "")
            .await;

        let resolution = f.router.navigate("/dashboard").await?;
        assert_eq!(resolution.entry.name, route::NOT_FOUND);
        assert!(f.session.routes_generated());
        assert!(f.session.is_authenticated().await?);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_first_navigations_build_once() -> Result<()> {
        let f = fixture();
        login(&f.session).await?;
        f.transport.answer("/menus", StatusCode::OK, DASHBOARD_MENU).await;
        f.transport.answer("/menus", StatusCode::OK, DASHBOARD_MENU).await;

        let (first, second) = tokio::join!(
            f.router.navigate("/dashboard"),
            f.router.navigate("/users"),
        );
        assert_eq!(first?.entry.name, "Dashboard");
        assert_eq!(second?.entry.name, "UsersPage");
        assert_eq!(f.transport.count("/menus").await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn logout_resets_route_generation() -> Result<()> {
        let f = fixture();
        login(&f.session).await?;
        f.transport.answer("/menus", StatusCode::OK, DASHBOARD_MENU).await;
        f.transport.answer("/menus", StatusCode::OK, DASHBOARD_MENU).await;

        let _resolution = f.router.navigate("/dashboard").await?;
        f.session.logout().await?;
        assert!(!f.session.routes_generated());

        login(&f.session).await?;
        let resolution = f.router.navigate("/dashboard").await?;
        assert_eq!(resolution.entry.name, "Dashboard");
        assert_eq!(f.transport.count("/menus").await, 2);
        Ok(())
    }
}
