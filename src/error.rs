//! Error types for the wellness agent.

use crate::graph::NodeId;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Knowledge base error: {0}")]
    Knowledge(#[from] KnowledgeError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Retrieval errors.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("Search failed: {reason}")]
    SearchFailed { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Dispatch graph configuration faults.
///
/// These are programming errors in the edge table or in a node, never
/// recoverable runtime conditions.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("No transition defined from {from} to {to}")]
    UndefinedTransition { from: NodeId, to: NodeId },

    #[error("Node {node} finished without a routing decision and has no default edge")]
    MissingRoute { node: NodeId },

    #[error("Graph exceeded {limit} steps without reaching terminal")]
    StepLimitExceeded { limit: usize },

    #[error("Graph terminated without an assistant reply")]
    NoReply,
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;
