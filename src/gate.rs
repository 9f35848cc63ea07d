//! Access gate: request-time routing decisions for the three storefront
//! areas. The decision function is pure and total; the middleware only
//! feeds it the path and the two session-identity cookies.
//!
//! `role` is a coarse, low-trust personalization signal; `client_access` is
//! the actual wholesale gate, set by the password exchange and deliberately
//! decoupled from `role` so a wholesale password alone unlocks the catalog.
//! Admins bypass both checks.

use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

pub const CLIENT_GATE_PATH: &str = "/client";
pub const LOGIN_PATH: &str = "/login";

pub const ROLE_COOKIE: &str = "role";
pub const CLIENT_ACCESS_COOKIE: &str = "client_access";
pub const CLIENT_ACCESS_GRANTED: &str = "granted";
/// 30 days, matching the password-exchange grant duration.
pub const CLIENT_ACCESS_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

/// Session role, parsed from an untrusted cookie at the boundary. Unknown
/// values collapse to `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Retail,
    Client,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "retail" => Some(Self::Retail),
            "client" => Some(Self::Client),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(String),
}

/// First matching rule wins:
/// 1. the client gate page itself is always reachable (no redirect loops);
/// 2. `/admin` area: admin only, else login;
/// 3. `/retail` area: retail or admin, else login;
/// 4. `/client/...`: admin bypass or a granted client access, else back to
///    the gate page carrying the original path in `?redirect=`;
/// 5. everything else passes.
pub fn decide(path: &str, role: Option<Role>, client_access: bool) -> GateDecision {
    if path == CLIENT_GATE_PATH {
        return GateDecision::Allow;
    }
    if path == "/admin" || path.starts_with("/admin/") {
        return match role {
            Some(Role::Admin) => GateDecision::Allow,
            _ => GateDecision::Redirect(LOGIN_PATH.to_string()),
        };
    }
    if path == "/retail" || path.starts_with("/retail/") {
        return match role {
            Some(Role::Retail) | Some(Role::Admin) => GateDecision::Allow,
            _ => GateDecision::Redirect(LOGIN_PATH.to_string()),
        };
    }
    if path.starts_with("/client/") {
        return if role == Some(Role::Admin) || client_access {
            GateDecision::Allow
        } else {
            GateDecision::Redirect(format!("{CLIENT_GATE_PATH}?redirect={path}"))
        };
    }
    GateDecision::Allow
}

/// Reads a cookie value out of the `Cookie` header, if present.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(axum::http::header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

/// Router layer: applies [`decide`] before any handler runs. Redirects are
/// normal control flow, never errors.
pub async fn access_gate(req: Request, next: Next) -> Response {
    let role = cookie_value(req.headers(), ROLE_COOKIE).and_then(Role::parse);
    let client_access =
        cookie_value(req.headers(), CLIENT_ACCESS_COOKIE).is_some_and(|v| v == CLIENT_ACCESS_GRANTED);
    match decide(req.uri().path(), role, client_access) {
        GateDecision::Allow => next.run(req).await,
        GateDecision::Redirect(target) => {
            tracing::debug!(path = req.uri().path(), target = %target, "gate redirect");
            Redirect::temporary(&target).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use GateDecision::{Allow, Redirect};

    const ROLES: [Option<Role>; 4] = [None, Some(Role::Retail), Some(Role::Client), Some(Role::Admin)];

    #[test]
    fn test_gate_page_always_allowed() {
        for role in ROLES {
            for access in [false, true] {
                assert_eq!(decide("/client", role, access), Allow);
            }
        }
    }

    #[test]
    fn test_admin_area_requires_admin_role() {
        for path in ["/admin", "/admin/x"] {
            for role in ROLES {
                for access in [false, true] {
                    let expected = if role == Some(Role::Admin) { Allow } else { Redirect("/login".into()) };
                    assert_eq!(decide(path, role, access), expected, "path={path} role={role:?} access={access}");
                }
            }
        }
    }

    #[test]
    fn test_retail_area_requires_retail_or_admin() {
        for path in ["/retail", "/retail/x"] {
            for role in ROLES {
                for access in [false, true] {
                    let expected = match role {
                        Some(Role::Retail) | Some(Role::Admin) => Allow,
                        _ => Redirect("/login".into()),
                    };
                    assert_eq!(decide(path, role, access), expected, "path={path} role={role:?} access={access}");
                }
            }
        }
    }

    #[test]
    fn test_client_area_admin_bypass_or_granted_access() {
        for role in ROLES {
            for access in [false, true] {
                let expected = if role == Some(Role::Admin) || access {
                    Allow
                } else {
                    Redirect("/client?redirect=/client/x".into())
                };
                assert_eq!(decide("/client/x", role, access), expected, "role={role:?} access={access}");
            }
        }
    }

    #[test]
    fn test_client_role_does_not_grant_retail_access() {
        assert_eq!(decide("/retail/x", Some(Role::Client), false), Redirect("/login".into()));
        // Nor does a granted wholesale password.
        assert_eq!(decide("/retail/x", None, true), Redirect("/login".into()));
    }

    #[test]
    fn test_unmatched_paths_pass() {
        for path in ["/", "/health", "/api/v1/tokens", "/clientele"] {
            assert_eq!(decide(path, None, false), Allow, "path={path}");
        }
    }

    #[test]
    fn test_role_parse_is_closed() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("retail"), Some(Role::Retail));
        assert_eq!(Role::parse("client"), Some(Role::Client));
        assert_eq!(Role::parse("ADMIN"), None);
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn test_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            "role=admin; client_access=granted".parse().unwrap(),
        );
        assert_eq!(cookie_value(&headers, "role"), Some("admin"));
        assert_eq!(cookie_value(&headers, "client_access"), Some("granted"));
        assert_eq!(cookie_value(&headers, "theme"), None);
    }
}
