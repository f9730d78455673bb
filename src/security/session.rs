//! Signed session tokens.
//!
//! Token format: `base64url(claims json) "." base64url(hmac-sha256)`.
//! Tokens travel in the session cookie or as a Bearer token.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::{header, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::config::SessionConfig;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// The authenticated identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub email: String,
    pub role: Role,
}

impl Principal {
    /// Build a principal, deriving its role from the configured admin email.
    pub fn for_email(email: impl Into<String>, admin_email: &str) -> Self {
        let email = email.into();
        let role = if emails_match(&email, admin_email) {
            Role::Admin
        } else {
            Role::User
        };
        Self { email, role }
    }
}

/// Case-insensitive email comparison. An empty side never matches.
pub fn emails_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && !b.is_empty() && a.to_lowercase() == b.to_lowercase()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session signing key rejected")]
    InvalidKey,
    #[error("malformed session token")]
    Malformed,
    #[error("session token signature mismatch")]
    BadSignature,
    #[error("session expired")]
    Expired,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: Role,
    /// Expiry, seconds since the Unix epoch.
    exp: u64,
    jti: String,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Issues and verifies session tokens with a shared HMAC key.
#[derive(Clone)]
pub struct SessionSigner {
    mac: HmacSha256,
    ttl: Duration,
}

impl SessionSigner {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, SessionError> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SessionError::InvalidKey)?;
        Ok(Self { mac, ttl })
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        Self::new(&config.secret, Duration::from_secs(config.ttl_secs))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, principal: &Principal) -> String {
        self.issue_at(principal, now_secs())
    }

    pub fn issue_at(&self, principal: &Principal, now: u64) -> String {
        let claims = Claims {
            sub: principal.email.clone(),
            role: principal.role,
            exp: now.saturating_add(self.ttl.as_secs()),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        // Serializing a struct of strings and integers cannot fail.
        let payload = serde_json::to_vec(&claims).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(payload);

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{payload}.{signature}")
    }

    pub fn verify(&self, token: &str) -> Result<Principal, SessionError> {
        self.verify_at(token, now_secs())
    }

    pub fn verify_at(&self, token: &str, now: u64) -> Result<Principal, SessionError> {
        let (payload, signature) = token.split_once('.').ok_or(SessionError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SessionError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::BadSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SessionError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| SessionError::Malformed)?;

        if now >= claims.exp {
            return Err(SessionError::Expired);
        }

        Ok(Principal {
            email: claims.sub,
            role: claims.role,
        })
    }
}

/// Pull a session token from `Authorization: Bearer` or the session cookie.
pub fn token_from_headers<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value)
        .filter(|t| !t.is_empty())
}

/// `Set-Cookie` value carrying a fresh session.
pub fn session_cookie(config: &SessionConfig, token: &str) -> Option<HeaderValue> {
    let secure = if config.secure_cookie { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        config.cookie_name, token, config.ttl_secs, secure
    ))
    .ok()
}

/// `Set-Cookie` value that removes the session.
pub fn clear_session_cookie(config: &SessionConfig) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        config.cookie_name
    ))
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn signer() -> SessionSigner {
        SessionSigner::new(SECRET, Duration::from_secs(3600)).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let signer = signer();
        let principal = Principal::for_email("Owner@Cafe.test", "owner@cafe.test");
        assert_eq!(principal.role, Role::Admin);

        let token = signer.issue(&principal);
        assert_eq!(signer.verify(&token).unwrap(), principal);
    }

    #[test]
    fn test_expired_token() {
        let signer = signer();
        let principal = Principal::for_email("owner@cafe.test", "owner@cafe.test");
        let token = signer.issue_at(&principal, 1_000);

        assert!(signer.verify_at(&token, 1_000 + 3599).is_ok());
        assert_eq!(
            signer.verify_at(&token, 1_000 + 3600),
            Err(SessionError::Expired)
        );
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let signer = SessionSigner::new(SECRET, Duration::from_secs(u64::MAX)).unwrap();
        let principal = Principal::for_email("owner@cafe.test", "owner@cafe.test");
        let token = signer.issue_at(&principal, 1_000);
        assert_eq!(signer.verify_at(&token, 1_000 + 3600), Ok(principal));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let signer = signer();
        let token = signer.issue(&Principal::for_email("guest@cafe.test", "owner@cafe.test"));
        let (_, signature) = token.split_once('.').unwrap();

        let forged = URL_SAFE_NO_PAD.encode(
            br#"{"sub":"owner@cafe.test","role":"admin","exp":99999999999,"jti":"x"}"#,
        );
        assert_eq!(
            signer.verify(&format!("{forged}.{signature}")),
            Err(SessionError::BadSignature)
        );
    }

    #[test]
    fn test_other_key_rejected() {
        let token = signer().issue(&Principal::for_email("owner@cafe.test", "owner@cafe.test"));
        let other = SessionSigner::new("another-secret-another-secret-xx", Duration::from_secs(60)).unwrap();
        assert_eq!(other.verify(&token), Err(SessionError::BadSignature));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let signer = signer();
        assert_eq!(signer.verify("not-a-token"), Err(SessionError::Malformed));
        assert_eq!(signer.verify("a.!!!"), Err(SessionError::Malformed));
    }

    #[test]
    fn test_empty_admin_email_never_matches() {
        assert!(!emails_match("", ""));
        assert_eq!(Principal::for_email("owner@cafe.test", "").role, Role::User);
    }

    #[test]
    fn test_token_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(token_from_headers(&headers, "session").is_none());

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc.def"),
        );
        assert_eq!(token_from_headers(&headers, "session"), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz.uvw"));
        assert_eq!(token_from_headers(&headers, "session"), Some("xyz.uvw"));
    }
}
