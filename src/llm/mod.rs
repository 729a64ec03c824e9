//! Model construction from [`AppConfig`](crate::config::AppConfig).
//!
//! Completions go through rig-core's Anthropic or OpenAI client wrapped in
//! [`RigAdapter`]. Seed-passage embeddings are optional and OpenAI-only; they
//! are wrapped in [`RigEmbedder`] for [`EmbeddedDocs`](crate::knowledge::EmbeddedDocs).

pub mod json;
pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::{RigAdapter, RigEmbedder};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rig::client::{CompletionClient, EmbeddingsClient};
use rig::providers::{anthropic, openai};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::error::LlmError;
use crate::knowledge::Embedder;

/// Which hosted API serves completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

impl LlmBackend {
    /// Environment variable holding this backend's API key.
    pub fn key_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        })
    }
}

impl FromStr for LlmBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(format!(
                "unknown backend '{other}' (expected openai or anthropic)"
            )),
        }
    }
}

/// Model settings resolved from `WELLNESS_*` variables.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: SecretString,
    pub model: String,
    /// Embedding model for seed passages; keyword ranking when unset.
    pub embedding_model: Option<String>,
}

fn client_error(backend: LlmBackend, e: impl fmt::Display) -> LlmError {
    LlmError::RequestFailed {
        provider: backend.to_string(),
        reason: format!("client construction failed: {e}"),
    }
}

/// Completion provider for the configured backend and model.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let key = config.api_key.expose_secret();
    let provider: Arc<dyn LlmProvider> = match config.backend {
        LlmBackend::Anthropic => {
            let client: rig::client::Client<anthropic::client::AnthropicExt> =
                anthropic::Client::new(key).map_err(|e| client_error(config.backend, e))?;
            Arc::new(RigAdapter::new(
                client.completion_model(&config.model),
                &config.model,
            ))
        }
        LlmBackend::OpenAi => {
            let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
                openai::Client::new(key).map_err(|e| client_error(config.backend, e))?;
            Arc::new(RigAdapter::new(
                client.completion_model(&config.model),
                &config.model,
            ))
        }
    };
    info!(backend = %config.backend, model = %config.model, "LLM provider ready");
    Ok(provider)
}

/// Embedder for seed passages, if one is configured and the backend has one.
pub fn create_embedder(config: &LlmConfig) -> Result<Option<Arc<dyn Embedder>>, LlmError> {
    let Some(model) = config.embedding_model.as_deref() else {
        return Ok(None);
    };
    match config.backend {
        LlmBackend::OpenAi => {
            let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
                openai::Client::new(config.api_key.expose_secret())
                    .map_err(|e| client_error(config.backend, e))?;
            info!(model = %model, "Embedding model ready");
            Ok(Some(Arc::new(RigEmbedder::new(
                client.embedding_model(model),
                model,
            ))))
        }
        LlmBackend::Anthropic => {
            warn!(model = %model, "Anthropic has no embeddings API, using keyword retrieval");
            Ok(None)
        }
    }
}
