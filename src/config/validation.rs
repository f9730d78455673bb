//! Configuration validation.
//!
//! Semantic checks on top of what serde already enforces. Returns every
//! problem found, not just the first. A deployment without an administrator
//! email, password or signing secret is rejected outright.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{QuotaConfig, ServerConfig};
use crate::security::access_control::under;

/// Minimum length of the session signing secret in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted rate limit window: one day.
pub const MAX_WINDOW_MS: u64 = 24 * 60 * 60 * 1000;

/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("admin.email must be set")]
    MissingAdminEmail,

    #[error("admin.email `{0}` is not an email address")]
    InvalidAdminEmail(String),

    #[error("admin.password must be set")]
    MissingAdminPassword,

    #[error("session.secret must be at least {} bytes", MIN_SECRET_LEN)]
    WeakSessionSecret,

    #[error("session.ttl_secs must be greater than zero")]
    ZeroSessionTtl,

    #[error("session.ttl_secs must be at most {}", MAX_SESSION_TTL_SECS)]
    SessionTtlTooLong,

    #[error("rate_limit.{0}: window and quota must be greater than zero")]
    EmptyQuota(&'static str),

    #[error("rate_limit.{0}: window_ms must be at most {max}", max = MAX_WINDOW_MS)]
    WindowTooLong(&'static str),

    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("access.login_path must lie under access.admin_prefix")]
    LoginOutsideAdmin,

    #[error("access.{0} must start with `/`")]
    RelativePath(&'static str),
}

/// Validate a configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let email = config.admin.email.trim();
    if email.is_empty() {
        errors.push(ValidationError::MissingAdminEmail);
    } else if !email.contains('@') {
        errors.push(ValidationError::InvalidAdminEmail(email.to_string()));
    }
    if config.admin.password.is_empty() {
        errors.push(ValidationError::MissingAdminPassword);
    }

    if config.session.secret.len() < MIN_SECRET_LEN {
        errors.push(ValidationError::WeakSessionSecret);
    }
    if config.session.ttl_secs == 0 {
        errors.push(ValidationError::ZeroSessionTtl);
    } else if config.session.ttl_secs > MAX_SESSION_TTL_SECS {
        errors.push(ValidationError::SessionTtlTooLong);
    }

    let quotas: [(&'static str, &QuotaConfig); 3] = [
        ("contact", &config.rate_limit.contact),
        ("admin", &config.rate_limit.admin),
        ("general", &config.rate_limit.general),
    ];
    for (name, quota) in quotas {
        if quota.window_ms == 0 || quota.max_requests == 0 {
            errors.push(ValidationError::EmptyQuota(name));
        } else if quota.window_ms > MAX_WINDOW_MS {
            errors.push(ValidationError::WindowTooLong(name));
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let access = &config.access;
    if !access.admin_prefix.starts_with('/') {
        errors.push(ValidationError::RelativePath("admin_prefix"));
    }
    if !access.login_path.starts_with('/') {
        errors.push(ValidationError::RelativePath("login_path"));
    }
    if access
        .write_protected_prefixes
        .iter()
        .any(|p| !p.starts_with('/'))
    {
        errors.push(ValidationError::RelativePath("write_protected_prefixes"));
    }
    if !under(&access.login_path, &access.admin_prefix) {
        errors.push(ValidationError::LoginOutsideAdmin);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.admin.email = "owner@cafe.test".into();
        config.admin.password = "correct horse".into();
        config.session.secret = "x".repeat(MIN_SECRET_LEN);
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_default_config_fails_closed() {
        let errors = validate_config(&ServerConfig::default()).unwrap_err();
        assert!(errors.contains(&ValidationError::MissingAdminEmail));
        assert!(errors.contains(&ValidationError::MissingAdminPassword));
        assert!(errors.contains(&ValidationError::WeakSessionSecret));
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = valid_config();
        config.rate_limit.contact.max_requests = 0;
        config.rate_limit.general.window_ms = 0;
        config.listener.bind_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::EmptyQuota("contact")));
        assert!(errors.contains(&ValidationError::EmptyQuota("general")));
    }

    #[test]
    fn test_login_must_be_under_admin() {
        let mut config = valid_config();
        config.access.login_path = "/login".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::LoginOutsideAdmin]);
    }

    #[test]
    fn test_login_prefix_match_is_segment_aware() {
        let mut config = valid_config();
        config.access.login_path = "/administrator/login".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::LoginOutsideAdmin]);

        config.access.admin_prefix = "/admin/".into();
        config.access.login_path = "/admin/login".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_overlong_window_and_ttl_rejected() {
        let mut config = valid_config();
        config.rate_limit.admin.window_ms = u64::MAX;
        config.rate_limit.general.window_ms = MAX_WINDOW_MS;
        config.session.ttl_secs = u64::MAX;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::SessionTtlTooLong,
                ValidationError::WindowTooLong("admin"),
            ]
        );
    }
}
