//! Adapter construction by provider name

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use shared::{CredentialSource, FaithfulPromptBuilder, PromptBuilder};
use crate::adapters::{FashnTryonAdapter, ImagenAdapter, OpenAiAdapter, StabilityAdapter, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{ProviderError, ProviderResult};
use crate::traits::ProviderAdapter;

/// Known backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Stability,
    Imagen,
    Fashn,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Stability,
        ProviderKind::Imagen,
        ProviderKind::Fashn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Stability => "stability",
            ProviderKind::Imagen => "imagen",
            ProviderKind::Fashn => "fashn",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "dall-e-3" | "dalle" => Ok(ProviderKind::OpenAi),
            "stability" | "sd3" => Ok(ProviderKind::Stability),
            "imagen" | "google" | "gemini" => Ok(ProviderKind::Imagen),
            "fashn" | "tryon" => Ok(ProviderKind::Fashn),
            other => Err(ProviderError::configuration(format!(
                "unknown provider '{other}', expected one of openai, stability, imagen, fashn"
            ))),
        }
    }
}

/// Build an adapter with the default prompt builder
pub fn build_adapter(kind: ProviderKind, credentials: &dyn CredentialSource) -> ProviderResult<Arc<dyn ProviderAdapter>> {
    build_adapter_with_prompts(kind, credentials, Arc::new(FaithfulPromptBuilder::new()))
}

/// Build an adapter with a caller-supplied prompt builder
pub fn build_adapter_with_prompts(
    kind: ProviderKind,
    credentials: &dyn CredentialSource,
    prompts: Arc<dyn PromptBuilder>,
) -> ProviderResult<Arc<dyn ProviderAdapter>> {
    build_adapter_with_timeout(kind, credentials, prompts, DEFAULT_REQUEST_TIMEOUT)
}

/// Build an adapter whose HTTP client uses the given per-request timeout
pub fn build_adapter_with_timeout(
    kind: ProviderKind,
    credentials: &dyn CredentialSource,
    prompts: Arc<dyn PromptBuilder>,
    timeout: Duration,
) -> ProviderResult<Arc<dyn ProviderAdapter>> {
    let key = credentials
        .api_key(kind.as_str())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ProviderError::configuration(format!("no API key configured for {kind}")))?;

    let adapter: Arc<dyn ProviderAdapter> = match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiAdapter::with_timeout(&key, prompts, timeout)?),
        ProviderKind::Stability => Arc::new(StabilityAdapter::with_timeout(&key, prompts, timeout)?),
        ProviderKind::Imagen => Arc::new(ImagenAdapter::with_timeout(&key, prompts, timeout)?),
        ProviderKind::Fashn => Arc::new(FashnTryonAdapter::with_timeout(&key, prompts, timeout)?),
    };
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{MockCredentialSource, StaticCredentials};

    #[test]
    fn test_parse_kinds() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Imagen);
        assert!("midjourney".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_build_adapter_reports_capabilities() {
        let creds = StaticCredentials::new()
            .with_key("openai", "sk")
            .with_key("stability", "st")
            .with_key("imagen", "gk")
            .with_key("fashn", "fa");

        let expectations = [
            (ProviderKind::OpenAi, false, false),
            (ProviderKind::Stability, true, false),
            (ProviderKind::Imagen, true, true),
            (ProviderKind::Fashn, true, true),
        ];
        for (kind, seed, multi) in expectations {
            let adapter = build_adapter(kind, &creds).unwrap();
            assert_eq!(adapter.name(), kind.as_str());
            assert_eq!(adapter.supports_seed(), seed, "{kind}");
            assert_eq!(adapter.supports_multi_output(), multi, "{kind}");
        }
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let mut creds = MockCredentialSource::new();
        creds.expect_api_key().return_const(None::<String>);

        let err = build_adapter(ProviderKind::Imagen, &creds).err().unwrap();
        assert!(matches!(err, ProviderError::Configuration { .. }));
    }
}
