// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use crate::route::Access;

use super::Location;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Decision {
    Allow,
    Redirect(Location),
    /// Drop whatever is left of the session before redirecting.
    ClearAndRedirect(Location),
    /// Generate the menu routes, then evaluate the same target again.
    BuildRoutes,
}

pub(crate) fn decide(
    target: &Location,
    access: Access,
    authenticated: bool,
    routes_generated: bool,
) -> Decision {
    match (access, authenticated) {
        (Access::Public, true) => Decision::Redirect(Location::landing()),
        (Access::Protected, false) => {
            Decision::ClearAndRedirect(Location::login_with_redirect(&target.full_path()))
        }
        (_, true) if !routes_generated => Decision::BuildRoutes,
        _ => Decision::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATHS: &[&str] = &["/", "/login", "/users", "/dashboard", "/a/b?c=d"];

    #[test]
    fn never_allows_across_the_boundary() {
        for path in PATHS {
            let target = Location::parse(path);
            for generated in [false, true] {
                assert_ne!(
                    decide(&target, Access::Protected, false, generated),
                    Decision::Allow
                );
                assert_ne!(
                    decide(&target, Access::Public, true, generated),
                    Decision::Allow
                );
                assert_eq!(
                    decide(&target, Access::Public, false, generated),
                    Decision::Allow
                );
            }
        }
    }

    #[test]
    fn unauthenticated_protected_goes_to_login() {
        assert_eq!(
            decide(&Location::parse("/users"), Access::Protected, false, false),
            Decision::ClearAndRedirect(Location::login_with_redirect("/users"))
        );
    }

    #[test]
    fn authenticated_public_goes_to_landing() {
        assert_eq!(
            decide(&Location::login(), Access::Public, true, false),
            Decision::Redirect(Location::landing())
        );
    }

    #[test]
    fn builds_routes_before_allowing() {
        let target = Location::landing();
        assert_eq!(
            decide(&target, Access::Protected, true, false),
            Decision::BuildRoutes
        );
        assert_eq!(
            decide(&target, Access::Protected, true, true),
            Decision::Allow
        );
    }
}
