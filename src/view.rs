// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

pub(crate) const LOGIN: &str = "views/user/LoginPage.vue";
pub(crate) const SIGNUP: &str = "views/user/SignupPage.vue";
pub(crate) const OAUTH_REDIRECT: &str = "views/user/OAuthRedirectPage.vue";
pub(crate) const USERS: &str = "views/Users.vue";
pub(crate) const NOT_FOUND: &str = "views/NotFound.vue";

const BUILTIN: &[&str] = &[
    LOGIN,
    SIGNUP,
    OAUTH_REDIRECT,
    USERS,
    NOT_FOUND,
    "views/Dashboard.vue",
    "views/admin/MenuManagement.vue",
    "views/admin/UserManagement.vue",
    "views/notification/NotificationList.vue",
];

/// The set of view modules menu components may refer to.
#[derive(Clone, Debug)]
pub(crate) struct Registry {
    known: BTreeSet<String>,
}

impl Registry {
    pub(crate) fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let known = BUILTIN
            .iter()
            .map(|view| (*view).to_owned())
            .chain(extra.into_iter().map(|view| normalize(view.as_ref())))
            .collect();
        Self { known }
    }

    /// Look up a component reference such as `views/Dashboard.vue` or
    /// `/src/views/Dashboard.vue`.
    pub(crate) fn resolve(&self, component: &str) -> Option<&str> {
        self.known.get(&normalize(component)).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = &str> {
        self.known.iter().map(String::as_str)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

fn normalize(component: &str) -> String {
    let trimmed = component.trim();
    trimmed
        .strip_prefix("/src/")
        .or_else(|| trimmed.strip_prefix("src/"))
        .unwrap_or(trimmed)
        .trim_start_matches('/')
        .to_owned()
}
