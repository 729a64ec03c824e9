//! Configuration types.
//!
//! Everything is read from the environment (optionally seeded from a `.env`
//! file by the binary). Only the API key for the selected backend is required.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_RETRIEVAL_K: usize = 3;
pub const DEFAULT_MAX_STEPS: usize = 16;
pub const DEFAULT_USER: &str = "local-user";

/// Dispatch graph tuning.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Passages requested from the knowledge base per responder call.
    pub retrieval_k: usize,
    /// Hard cap on node executions per request.
    pub max_steps: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            retrieval_k: DEFAULT_RETRIEVAL_K,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// Application configuration for the binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub graph: GraphConfig,
    pub db_path: PathBuf,
    pub knowledge_dir: PathBuf,
    pub http_port: u16,
    pub cli_user: String,
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Build configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend: LlmBackend = lookup("WELLNESS_LLM_BACKEND")
            .as_deref()
            .unwrap_or("openai")
            .parse()
            .map_err(|message| ConfigError::InvalidValue {
                key: "WELLNESS_LLM_BACKEND".into(),
                message,
            })?;

        let key_var = backend.key_var();
        let api_key = lookup(key_var)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(key_var.to_string()))?;

        let model = lookup("WELLNESS_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let graph = GraphConfig {
            retrieval_k: parse_or(&lookup, "WELLNESS_RETRIEVAL_K", DEFAULT_RETRIEVAL_K)?,
            max_steps: parse_or(&lookup, "WELLNESS_MAX_STEPS", DEFAULT_MAX_STEPS)?,
        };
        if graph.max_steps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "WELLNESS_MAX_STEPS".into(),
                message: "must be at least 1".into(),
            });
        }

        Ok(Self {
            llm: LlmConfig {
                backend,
                api_key: SecretString::from(api_key),
                model,
                embedding_model: lookup("WELLNESS_EMBEDDING_MODEL")
                    .filter(|m| !m.trim().is_empty()),
            },
            graph,
            db_path: lookup("WELLNESS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/wellness.db")),
            knowledge_dir: lookup("WELLNESS_KNOWLEDGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/seed_docs")),
            http_port: parse_or(&lookup, "WELLNESS_HTTP_PORT", DEFAULT_HTTP_PORT)?,
            cli_user: lookup("WELLNESS_USER").unwrap_or_else(|| DEFAULT_USER.to_string()),
            log_dir: lookup("WELLNESS_LOG_DIR").map(PathBuf::from),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
