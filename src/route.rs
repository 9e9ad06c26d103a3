// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use log::{debug, info, warn};
use tabled::Tabled;

use crate::{menu, session, view};

pub(crate) const NOT_FOUND: &str = "NotFound";
const CATCH_ALL: &str = "/:pathMatch(.*)*";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Access {
    Public,
    Protected,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Protected => write!(f, "protected"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Layout {
    Simple,
    Default,
    Full,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "SimpleLayout"),
            Self::Default => write!(f, "DefaultLayout"),
            Self::Full => write!(f, "FullLayout"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Pattern {
    Segments(Vec<Segment>),
    CatchAll,
}

impl Pattern {
    pub(crate) fn parse(pattern: &str) -> Self {
        if pattern == CATCH_ALL {
            return Self::CatchAll;
        }

        Self::Segments(
            split(pattern)
                .map(|segment| match segment.strip_prefix(':') {
                    Some(name) => Segment::Param(name.to_owned()),
                    None => Segment::Literal(segment.to_owned()),
                })
                .collect(),
        )
    }

    /// Match a path, returning the captured parameters.
    pub(crate) fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let Self::Segments(segments) = self else {
            return Some(vec![("pathMatch".to_owned(), path.to_owned())]);
        };

        let parts: Vec<&str> = split(path).collect();
        if parts.len() != segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (segment, part) in segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.push((name.clone(), part.to_owned())),
            }
        }
        Some(params)
    }

    pub(crate) const fn is_catch_all(&self) -> bool {
        matches!(self, Self::CatchAll)
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CatchAll => write!(f, "{CATCH_ALL}"),
            Self::Segments(segments) if segments.is_empty() => write!(f, "/"),
            Self::Segments(segments) => {
                for segment in segments {
                    match segment {
                        Segment::Literal(literal) => write!(f, "/{literal}")?,
                        Segment::Param(name) => write!(f, "/:{name}")?,
                    }
                }
                Ok(())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Tabled)]
pub(crate) struct RouteEntry {
    #[tabled(rename = "Path")]
    pub(crate) pattern: Pattern,
    #[tabled(rename = "Name")]
    pub(crate) name: String,
    #[tabled(rename = "View")]
    pub(crate) view: String,
    #[tabled(rename = "Access")]
    pub(crate) access: Access,
    #[tabled(rename = "Layout")]
    pub(crate) layout: Layout,
}

impl RouteEntry {
    pub(crate) fn new(
        pattern: &str,
        name: &str,
        view: &str,
        access: Access,
        layout: Layout,
    ) -> Self {
        Self {
            pattern: Pattern::parse(pattern),
            name: name.to_owned(),
            view: view.to_owned(),
            access,
            layout,
        }
    }

    fn not_found() -> Self {
        Self::new(
            CATCH_ALL,
            NOT_FOUND,
            view::NOT_FOUND,
            Access::Protected,
            Layout::Simple,
        )
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Match<'a> {
    pub(crate) entry: &'a RouteEntry,
    pub(crate) params: Vec<(String, String)>,
}

/// Ordered routes. The catch-all is consulted only when nothing else
/// matches.
#[derive(Clone, Debug)]
pub(crate) struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub(crate) fn new() -> Self {
        let mut table = Self {
            entries: vec![
                RouteEntry::new("/", "Home", view::LOGIN, Access::Public, Layout::Simple),
                RouteEntry::new("/login", "LoginPage", view::LOGIN, Access::Public, Layout::Simple),
                RouteEntry::new(
                    "/signup",
                    "SignupPage",
                    view::SIGNUP,
                    Access::Public,
                    Layout::Simple,
                ),
                RouteEntry::new(
                    "/oauth2/redirect/:provider",
                    "OAuthRedirectPage",
                    view::OAUTH_REDIRECT,
                    Access::Public,
                    Layout::Simple,
                ),
                RouteEntry::new(
                    "/users",
                    "UsersPage",
                    view::USERS,
                    Access::Protected,
                    Layout::Default,
                ),
            ],
        };
        table.install_not_found();
        table
    }

    pub(crate) fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    #[cfg(test)]
    pub(crate) fn get(&self, name: &str) -> Option<&RouteEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Add an entry, replacing any existing entry of the same name in
    /// place.
    pub(crate) fn register(&mut self, entry: RouteEntry) {
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => {
                debug!("Replacing route {}", entry.name);
                *existing = entry;
            }
            None => self.entries.push(entry),
        }
    }

    /// Move the catch-all to the end of the table.
    pub(crate) fn install_not_found(&mut self) {
        self.entries.retain(|entry| entry.name != NOT_FOUND);
        self.entries.push(RouteEntry::not_found());
    }

    pub(crate) fn resolve(&self, path: &str) -> Option<Match<'_>> {
        let (specific, fallback): (Vec<_>, Vec<_>) = self
            .entries
            .iter()
            .partition(|entry| !entry.pattern.is_catch_all());

        specific
            .into_iter()
            .chain(fallback)
            .find_map(|entry| {
                entry
                    .pattern
                    .matches(path)
                    .map(|params| Match { entry, params })
            })
    }

    /// The access class of whatever `path` resolves to. Paths that only
    /// hit the catch-all, or nothing at all, are protected.
    pub(crate) fn classify(&self, path: &str) -> Access {
        self.resolve(path)
            .map_or(Access::Protected, |m| m.entry.access)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Register a protected route for every menu entry whose component is a
/// known view. Does nothing once routes were generated for the session.
pub(crate) fn build_routes(
    table: &mut RouteTable,
    session: &session::Context,
    views: &view::Registry,
    menus: &[menu::Record],
) -> usize {
    if session.routes_generated() {
        debug!("Routes already generated");
        return 0;
    }

    let mut registered = 0;
    for record in menus {
        let Some(view) = record
            .component
            .as_deref()
            .and_then(|component| views.resolve(component))
        else {
            warn!(
                "No view found for menu {:?} (component {:?})",
                record.name, record.component
            );
            continue;
        };

        table.register(RouteEntry::new(
            &record.path,
            &record.name,
            view,
            Access::Protected,
            Layout::Full,
        ));
        registered += 1;
    }

    session.mark_routes_generated();
    table.install_not_found();
    info!("Registered {} menu routes", registered);
    registered
}
