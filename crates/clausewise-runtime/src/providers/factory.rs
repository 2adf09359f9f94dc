//! Provider construction from configuration.
//!
//! The provider is chosen by the `ProviderKind` in [`LlmSettings`], once, at
//! process start. A kind whose cargo feature is disabled fails with
//! `NotConfigured` rather than silently falling back.

use std::sync::Arc;

use super::{LlmProvider, ProviderError};
use crate::config::{LlmSettings, ProviderKind};

/// Build the provider selected by `settings`.
pub fn build_provider(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    if let Some(url) = settings.endpoint.as_deref() {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ProviderError::NotConfigured(
                "endpoint must start with http:// or https://".to_string(),
            ));
        }
    }

    let provider = match settings.provider {
        ProviderKind::OpenAi => build_openai(settings)?,
        ProviderKind::Local => build_local(settings)?,
    };

    tracing::info!(
        provider = provider.name(),
        model = %settings.model,
        "LLM provider configured"
    );
    Ok(provider)
}

#[cfg(feature = "openai")]
fn build_openai(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    let mut provider = super::OpenAiProvider::from_env()?;
    if let Some(url) = settings.endpoint.as_deref() {
        provider = provider.with_base_url(url);
    }
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "openai"))]
fn build_openai(_settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    Err(ProviderError::NotConfigured(
        "OpenAI provider requires the 'openai' feature".to_string(),
    ))
}

#[cfg(feature = "local")]
fn build_local(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    let url = settings
        .endpoint
        .as_deref()
        .unwrap_or(super::local::DEFAULT_BASE_URL);
    Ok(Arc::new(super::LocalProvider::new(url)?))
}

#[cfg(not(feature = "local"))]
fn build_local(_settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    Err(ProviderError::NotConfigured(
        "Local provider requires the 'local' feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_endpoint() {
        let settings = LlmSettings {
            endpoint: Some("localhost:11434".to_string()),
            ..Default::default()
        };
        let result = build_provider(&settings);
        assert!(matches!(result, Err(ProviderError::NotConfigured(msg)) if msg.contains("endpoint")));
    }

    #[cfg(feature = "local")]
    #[test]
    fn test_builds_local_with_endpoint() {
        let settings = LlmSettings {
            provider: ProviderKind::Local,
            endpoint: Some("http://gpu-box:11434".to_string()),
            ..Default::default()
        };
        let provider = build_provider(&settings).unwrap();
        assert_eq!(provider.name(), "local");
    }

    #[cfg(not(feature = "local"))]
    #[test]
    fn test_local_without_feature() {
        let settings = LlmSettings {
            provider: ProviderKind::Local,
            ..Default::default()
        };
        assert!(matches!(
            build_provider(&settings),
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
