//! Access gate for admin pages and mutating API calls.
//!
//! Every request is classified by path and method. Protected requests are
//! admitted only for the configured administrator; everything else passes
//! through untouched. The decision needs only the session token and
//! configuration, never a store round-trip.
//!
//! [`is_admin`] is the one authorization predicate. The edge middleware,
//! the [`AdminSession`] page guard and the session endpoint all go through it.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRef, FromRequestParts, State},
    http::{request::Parts, HeaderMap, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;

use crate::config::AccessConfig;
use crate::observability::metrics;
use crate::security::session::{emails_match, token_from_headers, Principal, SessionSigner};

/// Prefix shared by all programmatic endpoints.
pub const API_PREFIX: &str = "/api";

/// Menu writes need the administrator whatever `write_protected_prefixes`
/// says. Configuration can only add prefixes.
pub const MENU_PREFIX: &str = "/api/menu";

/// The only authorization check. An empty configured email admits nobody.
pub fn is_admin(principal: Option<&Principal>, admin_email: &str) -> bool {
    principal.is_some_and(|p| emails_match(&p.email, admin_email))
}

/// `path` equals `prefix` or lies below it, segment-wise.
pub fn under(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Who is making the request, as far as the gate is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Unauthenticated,
    AuthenticatedNonAdmin,
    AuthenticatedAdmin,
}

/// Why a request needs the administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    None,
    AdminPage,
    ApiWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectMode {
    Redirect,
    Error,
}

/// Outcome of [`AccessGate::authorize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Admit,
    /// `target` is the redirect location, or the rejected path for errors.
    Reject { mode: RejectMode, target: String },
}

impl GateDecision {
    pub fn is_admit(&self) -> bool {
        matches!(self, GateDecision::Admit)
    }

    /// Rejection response, or `None` when the request is admitted.
    pub fn rejection(&self) -> Option<Response> {
        match self {
            GateDecision::Admit => None,
            GateDecision::Reject {
                mode: RejectMode::Error,
                ..
            } => Some(unauthorized()),
            GateDecision::Reject {
                mode: RejectMode::Redirect,
                target,
            } => Some(Redirect::to(target).into_response()),
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
        .into_response()
}

struct GateInner {
    admin_email: String,
    cookie_name: String,
    policy: AccessConfig,
    signer: SessionSigner,
}

/// Shared, immutable gate configuration.
#[derive(Clone)]
pub struct AccessGate {
    inner: Arc<GateInner>,
}

impl AccessGate {
    pub fn new(
        admin_email: impl Into<String>,
        cookie_name: impl Into<String>,
        policy: AccessConfig,
        signer: SessionSigner,
    ) -> Self {
        Self {
            inner: Arc::new(GateInner {
                admin_email: admin_email.into(),
                cookie_name: cookie_name.into(),
                policy,
                signer,
            }),
        }
    }

    pub fn admin_email(&self) -> &str {
        &self.inner.admin_email
    }

    pub fn login_path(&self) -> &str {
        &self.inner.policy.login_path
    }

    /// Classify a request by method and path.
    pub fn classify(&self, method: &Method, path: &str) -> Protection {
        let policy = &self.inner.policy;

        if under(path, &policy.login_path) {
            return Protection::None;
        }
        if under(path, &policy.admin_prefix) {
            return Protection::AdminPage;
        }
        if is_mutating(method)
            && (under(path, MENU_PREFIX)
                || policy
                    .write_protected_prefixes
                    .iter()
                    .any(|prefix| under(path, prefix)))
        {
            return Protection::ApiWrite;
        }
        Protection::None
    }

    /// Resolve the session carried by `headers`.
    ///
    /// Missing, malformed and expired tokens all yield `None`.
    pub fn principal(&self, headers: &HeaderMap) -> Option<Principal> {
        let token = token_from_headers(headers, &self.inner.cookie_name)?;
        match self.inner.signer.verify(token) {
            Ok(principal) => Some(principal),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring invalid session token");
                None
            }
        }
    }

    pub fn viewer(&self, principal: Option<&Principal>) -> Viewer {
        match principal {
            None => Viewer::Unauthenticated,
            Some(_) if is_admin(principal, &self.inner.admin_email) => Viewer::AuthenticatedAdmin,
            Some(_) => Viewer::AuthenticatedNonAdmin,
        }
    }

    /// Decide whether a request may proceed.
    pub fn authorize(&self, method: &Method, path: &str, headers: &HeaderMap) -> GateDecision {
        let protection = self.classify(method, path);
        if protection == Protection::None {
            return GateDecision::Admit;
        }

        let principal = self.principal(headers);
        if self.viewer(principal.as_ref()) == Viewer::AuthenticatedAdmin {
            return GateDecision::Admit;
        }

        self.reject(path)
    }

    /// Rejection shape for `path`: JSON error for the API, redirect for pages.
    pub fn reject(&self, path: &str) -> GateDecision {
        if under(path, API_PREFIX) {
            GateDecision::Reject {
                mode: RejectMode::Error,
                target: path.to_string(),
            }
        } else {
            GateDecision::Reject {
                mode: RejectMode::Redirect,
                target: self.inner.policy.login_path.clone(),
            }
        }
    }
}

/// Edge middleware enforcing the gate on every request.
pub async fn access_gate_middleware(
    State(gate): State<AccessGate>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let decision = gate.authorize(request.method(), request.uri().path(), request.headers());

    match decision.rejection() {
        None => next.run(request).await,
        Some(response) => {
            let kind = match decision {
                GateDecision::Reject {
                    mode: RejectMode::Error,
                    ..
                } => "api",
                _ => "page",
            };
            tracing::info!(
                method = %request.method(),
                path = %request.uri().path(),
                kind,
                "Access gate rejected request"
            );
            metrics::record_gate_rejection(kind);
            response
        }
    }
}

/// Page-level guard yielding the administrator's principal.
///
/// Rejects exactly like the edge gate, so handlers stay protected even when
/// mounted outside the gated paths.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Principal);

impl<S> FromRequestParts<S> for AdminSession
where
    AccessGate: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = AccessGate::from_ref(state);
        let principal = gate.principal(&parts.headers);

        if is_admin(principal.as_ref(), gate.admin_email()) {
            if let Some(principal) = principal {
                return Ok(AdminSession(principal));
            }
        }

        Err(gate
            .reject(parts.uri.path())
            .rejection()
            .unwrap_or_else(unauthorized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};
    use std::time::Duration;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn gate() -> AccessGate {
        let signer = SessionSigner::new(SECRET, Duration::from_secs(3600)).unwrap();
        AccessGate::new("owner@cafe.test", "session", AccessConfig::default(), signer)
    }

    fn headers_for(gate: &AccessGate, email: &str) -> HeaderMap {
        let token = gate
            .inner
            .signer
            .issue(&Principal::for_email(email, gate.admin_email()));
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("session={token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_classify() {
        let gate = gate();
        assert_eq!(gate.classify(&Method::GET, "/admin/login"), Protection::None);
        assert_eq!(gate.classify(&Method::POST, "/admin/login"), Protection::None);
        assert_eq!(gate.classify(&Method::GET, "/admin"), Protection::AdminPage);
        assert_eq!(gate.classify(&Method::GET, "/admin/menu/new"), Protection::AdminPage);
        assert_eq!(gate.classify(&Method::GET, "/administrator"), Protection::None);
        assert_eq!(gate.classify(&Method::GET, "/api/menu"), Protection::None);
        assert_eq!(gate.classify(&Method::POST, "/api/menu"), Protection::ApiWrite);
        assert_eq!(gate.classify(&Method::DELETE, "/api/menu/4"), Protection::ApiWrite);
        assert_eq!(gate.classify(&Method::PATCH, "/api/menu/4"), Protection::ApiWrite);
        assert_eq!(gate.classify(&Method::POST, "/api/contact"), Protection::None);
        assert_eq!(gate.classify(&Method::POST, "/api/menuitems"), Protection::None);
    }

    #[test]
    fn test_owner_scenario() {
        let gate = gate();
        let none = HeaderMap::new();

        assert_eq!(
            gate.authorize(&Method::GET, "/admin/menu/new", &none),
            GateDecision::Reject {
                mode: RejectMode::Redirect,
                target: "/admin/login".into()
            }
        );
        assert!(gate.authorize(&Method::GET, "/admin/login", &none).is_admit());
        assert!(gate
            .authorize(&Method::POST, "/api/menu", &headers_for(&gate, "OWNER@cafe.test"))
            .is_admit());
        assert_eq!(
            gate.authorize(&Method::POST, "/api/menu", &headers_for(&gate, "guest@cafe.test")),
            GateDecision::Reject {
                mode: RejectMode::Error,
                target: "/api/menu".into()
            }
        );
        assert!(gate.authorize(&Method::GET, "/api/menu", &none).is_admit());
    }

    #[test]
    fn test_viewer_states() {
        let gate = gate();
        assert_eq!(gate.viewer(None), Viewer::Unauthenticated);
        let guest = Principal::for_email("guest@cafe.test", "owner@cafe.test");
        assert_eq!(gate.viewer(Some(&guest)), Viewer::AuthenticatedNonAdmin);
        let owner = Principal::for_email("Owner@Cafe.Test", "owner@cafe.test");
        assert_eq!(gate.viewer(Some(&owner)), Viewer::AuthenticatedAdmin);
    }

    #[test]
    fn test_malformed_token_is_unauthenticated() {
        let gate = gate();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session=garbage"));

        assert!(gate.principal(&headers).is_none());
        assert_eq!(
            gate.authorize(&Method::GET, "/admin", &headers),
            GateDecision::Reject {
                mode: RejectMode::Redirect,
                target: "/admin/login".into()
            }
        );
    }

    #[test]
    fn test_empty_admin_email_fails_closed() {
        let signer = SessionSigner::new(SECRET, Duration::from_secs(3600)).unwrap();
        let gate = AccessGate::new("", "session", AccessConfig::default(), signer);
        let headers = headers_for(&gate, "");
        assert!(!gate.authorize(&Method::GET, "/admin", &headers).is_admit());
    }

    #[test]
    fn test_menu_writes_protected_without_configured_prefix() {
        let signer = SessionSigner::new(SECRET, Duration::from_secs(3600)).unwrap();
        let policy = AccessConfig {
            write_protected_prefixes: vec!["/api/upload".into()],
            ..AccessConfig::default()
        };
        let gate = AccessGate::new("owner@cafe.test", "session", policy, signer);

        assert_eq!(gate.classify(&Method::POST, "/api/menu"), Protection::ApiWrite);
        assert_eq!(gate.classify(&Method::DELETE, "/api/menu/3"), Protection::ApiWrite);
        assert_eq!(gate.classify(&Method::POST, "/api/upload"), Protection::ApiWrite);
        assert_eq!(gate.classify(&Method::PUT, "/api/social-links"), Protection::None);
        assert!(!gate
            .authorize(&Method::POST, "/api/menu", &HeaderMap::new())
            .is_admit());
    }

    #[test]
    fn test_under_is_segment_aware() {
        assert!(under("/admin", "/admin"));
        assert!(under("/admin/login", "/admin/"));
        assert!(!under("/administrator/login", "/admin"));
    }

    #[test]
    fn test_is_admin_ignores_role_claim() {
        let forged = Principal {
            email: "guest@cafe.test".into(),
            role: crate::security::session::Role::Admin,
        };
        assert!(!is_admin(Some(&forged), "owner@cafe.test"));
    }
}
