//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root configuration for the café server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// The single administrator account.
    pub admin: AdminConfig,

    /// Session token signing.
    pub session: SessionConfig,

    /// Per-class rate limiting quotas.
    pub rate_limit: RateLimitConfig,

    /// Access gate path policy.
    pub access: AccessConfig,

    /// Contact form recipients.
    pub contact: ContactConfig,

    /// Outbound mail delivery.
    pub mail: MailConfig,

    /// Menu data and upload storage.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Security hardening.
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Timeout for outbound mail delivery in seconds.
    pub mail_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            mail_secs: 10,
        }
    }
}

/// Administrator credentials.
///
/// Exactly one administrator exists per deployment. Both values are usually
/// provided through `ADMIN_EMAIL` / `ADMIN_PASSWORD`.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Session token configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// HMAC key for signing session tokens.
    pub secret: String,

    /// Session lifetime in seconds.
    pub ttl_secs: u64,

    /// Cookie carrying the session token.
    pub cookie_name: String,

    /// Add the `Secure` attribute to the session cookie.
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_secs: 60 * 60 * 24 * 7,
            cookie_name: "session".to_string(),
            secure_cookie: false,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .field("cookie_name", &self.cookie_name)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

/// Quota for one rate limiting class.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct QuotaConfig {
    /// Length of one fixed window in milliseconds.
    pub window_ms: u64,

    /// Requests admitted per key within one window.
    pub max_requests: u32,
}

impl QuotaConfig {
    pub const fn per_minute(max_requests: u32) -> Self {
        Self {
            window_ms: 60_000,
            max_requests,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting. When disabled every request is admitted.
    pub enabled: bool,

    /// Contact form submissions.
    pub contact: QuotaConfig,

    /// Admin write operations.
    pub admin: QuotaConfig,

    /// Public read endpoints.
    pub general: QuotaConfig,

    /// Interval between expired-entry sweeps in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            contact: QuotaConfig::per_minute(5),
            admin: QuotaConfig::per_minute(30),
            general: QuotaConfig::per_minute(100),
            sweep_interval_secs: 5 * 60,
        }
    }
}

/// Access gate path policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Root of the admin page section.
    pub admin_prefix: String,

    /// Admin login page, reachable without a session.
    pub login_path: String,

    /// API prefixes where mutating methods require the administrator.
    pub write_protected_prefixes: Vec<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            admin_prefix: "/admin".to_string(),
            login_path: "/admin/login".to_string(),
            write_protected_prefixes: vec![
                "/api/menu".to_string(),
                "/api/social-links".to_string(),
                "/api/upload".to_string(),
            ],
        }
    }
}

/// Contact form configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContactConfig {
    /// Address receiving submission notifications.
    pub notify_email: String,

    /// Sender address used for outbound messages.
    pub from_email: String,

    /// Business name used in the auto-reply.
    pub business_name: String,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            notify_email: "hello@solis.com.au".to_string(),
            from_email: "hello@solis.com.au".to_string(),
            business_name: "Solis Espresso".to_string(),
        }
    }
}

/// Mail delivery configuration.
///
/// With no endpoint configured, messages are only logged.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MailConfig {
    /// HTTP endpoint of the mail API.
    pub endpoint: Option<String>,

    /// Bearer key for the mail API.
    pub api_key: String,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Persistence and upload storage.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot of the data store. `None` keeps data in memory only.
    pub data_path: Option<String>,

    /// Seed example menu items when the store starts empty.
    pub seed_examples: bool,

    /// Directory receiving uploaded files.
    pub upload_dir: String,

    /// Public URL prefix under which `upload_dir` is served.
    pub public_base_url: String,

    /// Maximum upload size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            seed_examples: true,
            upload_dir: "uploads".to_string(),
            public_base_url: "/uploads".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 6 * 1024 * 1024, // uploads plus multipart framing
        }
    }
}
