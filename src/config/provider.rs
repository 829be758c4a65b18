//! Provider block resolution.
//!
//! Every attribute of the provider block falls back to an environment
//! variable when it is null. Credentials are resolved per capability: a
//! missing API token only disables the handlers that need it.

use super::{parse_bool, process_env};
use crate::constants::{env, ROOT_USER};
use crate::model::Attr;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Resolution has to wait until the value is known
    #[error("Cannot use unknown value as {attribute}")]
    UnknownValue { attribute: &'static str },

    #[error("Unable to find base_url: URL cannot be an empty string")]
    MissingBaseUrl,

    #[error("Unable to parse {variable}: {variable} needs to be convertible to boolean, got '{value}'")]
    InvalidBool {
        variable: &'static str,
        value: String,
    },
}

/// String that is wiped from memory on drop and never printed
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(<redacted>)")
    }
}

/// Provider block as declared
#[derive(Clone, Default, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub base_url: Attr<String>,
    #[serde(default)]
    pub token_id: Attr<String>,
    #[serde(default)]
    pub secret: Attr<String>,
    #[serde(default)]
    pub root_password: Attr<String>,
    #[serde(default)]
    pub totp_seed: Attr<String>,
    #[serde(default)]
    pub tls_insecure: Attr<bool>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("token_id", &self.token_id)
            .field("tls_insecure", &self.tls_insecure)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: String,
    pub tls_insecure: bool,
}

#[derive(Debug, Clone)]
pub struct TokenCredentials {
    pub token_id: String,
    pub secret: SecretString,
}

#[derive(Debug, Clone)]
pub struct SessionCredentials {
    pub user: String,
    pub password: SecretString,
    /// Seed for generating one-time passwords when the user has TOTP enabled
    pub totp_seed: Option<SecretString>,
}

/// Resolved provider configuration
///
/// Credentials that could not be resolved keep the reason so the handler
/// needing them can report it.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub endpoint: Endpoint,
    pub token: Result<TokenCredentials, String>,
    pub session: Result<SessionCredentials, String>,
}

impl ProviderConfig {
    /// Resolve against the process environment
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub fn resolve(self) -> Result<ProviderSettings, ConfigError> {
        self.resolve_with(process_env)
    }

    /// Resolve with `lookup` standing in for the environment
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnknownValue`] when `base_url` is not known yet
    /// - [`ConfigError::MissingBaseUrl`] when neither the attribute nor
    ///   `PROXMOXVE_BASE_URL` supply a URL
    /// - [`ConfigError::InvalidBool`] when `PROXMOXVE_TLS_INSECURE` is set to
    ///   something that is not a boolean
    pub fn resolve_with<F>(self, lookup: F) -> Result<ProviderSettings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.base_url.is_unknown() {
            return Err(ConfigError::UnknownValue {
                attribute: "base_url",
            });
        }
        let base_url = fallback(&self.base_url, &lookup, env::BASE_URL)
            .ok_or(ConfigError::MissingBaseUrl)?;

        let tls_insecure = match self.tls_insecure {
            Attr::Known(value) => value,
            Attr::Null | Attr::Unknown => match lookup(env::TLS_INSECURE) {
                Some(raw) if !raw.trim().is_empty() => {
                    parse_bool(&raw).ok_or(ConfigError::InvalidBool {
                        variable: env::TLS_INSECURE,
                        value: raw,
                    })?
                }
                _ => false,
            },
        };

        let token = resolve_token(&self.token_id, &self.secret, &lookup);
        let session = resolve_session(&self.root_password, &self.totp_seed, &lookup);

        Ok(ProviderSettings {
            endpoint: Endpoint {
                base_url,
                tls_insecure,
            },
            token,
            session,
        })
    }
}

/// Declared value, or the environment when the attribute is null; empty is absent
fn fallback<F>(attr: &Attr<String>, lookup: &F, variable: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    match attr {
        Attr::Known(value) => Some(value.clone()),
        Attr::Null => lookup(variable),
        Attr::Unknown => None,
    }
    .filter(|value| !value.is_empty())
}

fn resolve_token<F>(
    token_id: &Attr<String>,
    secret: &Attr<String>,
    lookup: &F,
) -> Result<TokenCredentials, String>
where
    F: Fn(&str) -> Option<String>,
{
    let token_id =
        fallback(token_id, lookup, env::TOKEN_ID).ok_or_else(|| "token_id cannot be empty".to_string())?;
    let secret =
        fallback(secret, lookup, env::SECRET).ok_or_else(|| "secret cannot be empty".to_string())?;
    Ok(TokenCredentials {
        token_id,
        secret: SecretString::new(secret),
    })
}

fn resolve_session<F>(
    root_password: &Attr<String>,
    totp_seed: &Attr<String>,
    lookup: &F,
) -> Result<SessionCredentials, String>
where
    F: Fn(&str) -> Option<String>,
{
    let password = fallback(root_password, lookup, env::ROOT_PASSWORD)
        .ok_or_else(|| "root_password cannot be empty".to_string())?;
    Ok(SessionCredentials {
        user: ROOT_USER.to_string(),
        password: SecretString::new(password),
        totp_seed: fallback(totp_seed, lookup, env::TOTP_SEED).map(SecretString::new),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_environment_fills_null_attributes() {
        let settings = ProviderConfig::default()
            .resolve_with(lookup_from(&[
                ("PROXMOXVE_BASE_URL", "https://pve.example:8006"),
                ("PROXMOXVE_TOKEN_ID", "terraform@pve!ci"),
                ("PROXMOXVE_SECRET", "s3cret"),
                ("PROXMOXVE_ROOT_PASSWORD", "hunter2"),
                ("PROXMOXVE_TOTPSEED", "JBSWY3DPEHPK3PXP"),
                ("PROXMOXVE_TLS_INSECURE", "true"),
            ]))
            .unwrap();

        assert_eq!(settings.endpoint.base_url, "https://pve.example:8006");
        assert!(settings.endpoint.tls_insecure);
        let token = settings.token.unwrap();
        assert_eq!(token.token_id, "terraform@pve!ci");
        assert_eq!(token.secret.expose(), "s3cret");
        let session = settings.session.unwrap();
        assert_eq!(session.user, "root@pam");
        assert_eq!(session.totp_seed.unwrap().expose(), "JBSWY3DPEHPK3PXP");
    }

    #[test]
    fn test_declared_values_win_over_environment() {
        let config = ProviderConfig {
            base_url: "https://declared:8006".into(),
            tls_insecure: Attr::Known(false),
            ..ProviderConfig::default()
        };
        let settings = config
            .resolve_with(lookup_from(&[
                ("PROXMOXVE_BASE_URL", "https://env:8006"),
                ("PROXMOXVE_TLS_INSECURE", "1"),
            ]))
            .unwrap();
        assert_eq!(settings.endpoint.base_url, "https://declared:8006");
        assert!(!settings.endpoint.tls_insecure);
    }

    #[test]
    fn test_missing_credentials_are_reported_per_capability() {
        let settings = ProviderConfig::default()
            .resolve_with(lookup_from(&[
                ("PROXMOXVE_BASE_URL", "https://pve:8006"),
                ("PROXMOXVE_TOKEN_ID", "terraform@pve!ci"),
            ]))
            .unwrap();
        assert_eq!(settings.token.unwrap_err(), "secret cannot be empty");
        assert_eq!(settings.session.unwrap_err(), "root_password cannot be empty");
        assert!(!settings.endpoint.tls_insecure);
    }

    #[test]
    fn test_base_url_errors() {
        assert_eq!(
            ProviderConfig::default()
                .resolve_with(lookup_from(&[]))
                .unwrap_err(),
            ConfigError::MissingBaseUrl
        );

        let unknown = ProviderConfig {
            base_url: Attr::Unknown,
            ..ProviderConfig::default()
        };
        assert_eq!(
            unknown.resolve_with(lookup_from(&[])).unwrap_err(),
            ConfigError::UnknownValue {
                attribute: "base_url"
            }
        );
    }

    #[test]
    fn test_invalid_tls_insecure_is_rejected() {
        let err = ProviderConfig::default()
            .resolve_with(lookup_from(&[
                ("PROXMOXVE_BASE_URL", "https://pve:8006"),
                ("PROXMOXVE_TLS_INSECURE", "maybe"),
            ]))
            .unwrap_err();
        assert!(err.to_string().contains("needs to be convertible to boolean"));
    }

    #[test]
    fn test_debug_never_prints_secrets() {
        let config = ProviderConfig {
            secret: "s3cret".into(),
            root_password: "hunter2".into(),
            ..ProviderConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("hunter2"));
        assert_eq!(format!("{:?}", SecretString::new("x")), "SecretString(<redacted>)");
    }
}
