// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use url::form_urlencoded;

pub(crate) const LOGIN: &str = "/login";
pub(crate) const LANDING: &str = "/dashboard";

/// A navigation target: a path plus its query parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Location {
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
}

impl Location {
    pub(crate) fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub(crate) fn parse(target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let path = if path.starts_with('/') {
            path.to_owned()
        } else {
            format!("/{path}")
        };

        Self {
            path,
            query: form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    pub(crate) fn login() -> Self {
        Self::new(LOGIN)
    }

    /// The login page, remembering where the user was headed.
    pub(crate) fn login_with_redirect(full_path: &str) -> Self {
        Self {
            path: LOGIN.to_owned(),
            query: vec![("redirect".to_owned(), full_path.to_owned())],
        }
    }

    pub(crate) fn landing() -> Self {
        Self::new(LANDING)
    }

    pub(crate) fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn full_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }

        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.query)
            .finish();
        format!("{}?{}", self.path, query)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_path())
    }
}
