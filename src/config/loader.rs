//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServerConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay secrets and deployment values from the environment.
///
/// `lookup` is injected so tests do not touch the process environment.
pub fn apply_env_overrides<F>(config: &mut ServerConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let set = |key: &str, target: &mut String| {
        if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(key, "Configuration value taken from environment");
            *target = value;
        }
    };

    set("ADMIN_EMAIL", &mut config.admin.email);
    set("ADMIN_PASSWORD", &mut config.admin.password);
    set("SESSION_SECRET", &mut config.session.secret);
    set("CONTACT_EMAIL", &mut config.contact.notify_email);
    set("MAIL_FROM", &mut config.contact.from_email);
    set("MAIL_API_KEY", &mut config.mail.api_key);
    set("BIND_ADDRESS", &mut config.listener.bind_address);

    if let Some(endpoint) = lookup("MAIL_ENDPOINT").filter(|v| !v.trim().is_empty()) {
        config.mail.endpoint = Some(endpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_env_overrides_secrets() {
        let env: HashMap<&str, &str> = [
            ("ADMIN_EMAIL", "owner@cafe.test"),
            ("ADMIN_PASSWORD", "pw"),
            ("SESSION_SECRET", "0123456789abcdef0123456789abcdef"),
            ("MAIL_ENDPOINT", ""),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.admin.email, "owner@cafe.test");
        assert_eq!(config.admin.password, "pw");
        assert!(config.mail.endpoint.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [admin]
            email = "owner@cafe.test"
            password = "correct horse"

            [session]
            secret = "0123456789abcdef0123456789abcdef"
            "#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.session.ttl_secs, 60 * 60 * 24 * 7);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[admin").unwrap();
        assert!(matches!(
            load_config(Some(file.path())),
            Err(ConfigError::Parse(_))
        ));
    }
}
