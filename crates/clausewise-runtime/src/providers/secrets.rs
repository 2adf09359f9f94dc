//! API keys for hosted providers.
//!
//! A key is wrapped in [`ApiCredential`] the moment it is read. It is zeroed
//! on drop, never rendered by `Debug` or `Display`, and only handed out by
//! [`ApiCredential::expose`] where a request is built.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use super::ProviderError;

const REDACTED: &str = "[REDACTED]";

/// Where a credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    Programmatic,
}

impl CredentialSource {
    fn label(self) -> &'static str {
        match self {
            CredentialSource::Environment => "environment",
            CredentialSource::Programmatic => "programmatic",
        }
    }
}

/// A provider API key held as a secret.
pub struct ApiCredential {
    secret: SecretString,
    source: CredentialSource,
    label: &'static str,
}

impl ApiCredential {
    pub fn new(secret: impl Into<String>, source: CredentialSource, label: &'static str) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            source,
            label,
        }
    }

    /// Read `env_var`. Unset or blank is [`ProviderError::NotConfigured`].
    pub fn from_env(env_var: &str, label: &'static str) -> Result<Self, ProviderError> {
        Self::from_lookup(env_var, label, |key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        env_var: &str,
        label: &'static str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ProviderError> {
        match lookup(env_var) {
            Some(value) if !value.trim().is_empty() => {
                Ok(Self::new(value, CredentialSource::Environment, label))
            }
            _ => Err(ProviderError::NotConfigured(format!(
                "{} missing; set {}",
                label, env_var
            ))),
        }
    }

    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.label
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("label", &self.label)
            .field("source", &self.source)
            .field("secret", &REDACTED)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}", self.label, self.source.label(), REDACTED)
    }
}
