//! Retrieval over a directory of seed documents.
//!
//! Documents (`.md` / `.txt`) are split into passages on blank lines. The
//! keyword index scores each passage by the fraction of query terms it
//! contains. When an embedding model is configured, [`EmbeddedDocs`] ranks the
//! same passages by cosine similarity and falls back to keyword scoring if the
//! query cannot be embedded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::KnowledgeError;

/// Retrieval collaborator used for prompt augmentation.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Up to `k` passages relevant to `query`. An empty result is valid.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, KnowledgeError>;
}

/// Turns texts into vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f64>>, KnowledgeError>;
}

/// In-memory passage index built from seed documents.
#[derive(Debug, Clone, Default)]
pub struct SeedDocs {
    passages: Vec<String>,
}

impl SeedDocs {
    /// An index with no passages.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from raw passages (tests, embedded content).
    pub fn from_passages<I, S>(passages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            passages: passages.into_iter().map(Into::into).collect(),
        }
    }

    /// Load every `.md` / `.txt` file directly under `dir`.
    ///
    /// A missing directory yields an empty index.
    pub async fn load_dir(dir: &Path) -> Result<Self, KnowledgeError> {
        if !dir.exists() {
            info!(dir = %dir.display(), "Knowledge directory missing, retrieval disabled");
            return Ok(Self::empty());
        }

        let mut files: Vec<PathBuf> = Vec::new();
        let mut read_dir = fs::read_dir(dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if entry.metadata().await?.is_file()
                && matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("md" | "txt")
                )
            {
                files.push(path);
            }
        }
        // Stable passage order regardless of directory iteration order.
        files.sort();

        let mut passages = Vec::new();
        for path in &files {
            let content = fs::read_to_string(path).await?;
            let split = split_passages(&content);
            debug!(file = %path.display(), passages = split.len(), "Seed document split");
            passages.extend(split);
        }

        info!(dir = %dir.display(), files = files.len(), passages = passages.len(), "Knowledge base loaded");
        Ok(Self { passages })
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    fn rank(&self, query: &str, k: usize) -> Vec<String> {
        let query_lower = query.to_lowercase();
        let terms: Vec<&str> = query_lower.split_whitespace().collect();
        if terms.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(f32, &String)> = self
            .passages
            .iter()
            .filter_map(|p| {
                let text_lower = p.to_lowercase();
                let matched = terms.iter().filter(|t| text_lower.contains(*t)).count();
                (matched > 0).then(|| (matched as f32 / terms.len() as f32, p))
            })
            .collect();

        // Stable sort keeps load order among ties.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        debug!(query = %query, hits = scored.len(), "Knowledge search");
        scored.into_iter().map(|(_, p)| p.clone()).collect()
    }
}

#[async_trait]
impl KnowledgeBase for SeedDocs {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, KnowledgeError> {
        Ok(self.rank(query, k))
    }
}

/// Seed passages ranked by embedding similarity.
///
/// Passage vectors are computed once in [`EmbeddedDocs::build`]. A query the
/// embedder rejects is answered by keyword scoring over the same passages.
pub struct EmbeddedDocs {
    docs: SeedDocs,
    vectors: Vec<Vec<f64>>,
    embedder: Arc<dyn Embedder>,
}

impl EmbeddedDocs {
    pub async fn build(docs: SeedDocs, embedder: Arc<dyn Embedder>) -> Result<Self, KnowledgeError> {
        let vectors = if docs.is_empty() {
            Vec::new()
        } else {
            embedder.embed(docs.passages.clone()).await?
        };
        if vectors.len() != docs.len() {
            return Err(KnowledgeError::SearchFailed {
                reason: format!(
                    "embedder returned {} vectors for {} passages",
                    vectors.len(),
                    docs.len()
                ),
            });
        }
        info!(passages = docs.len(), "Seed passages embedded");
        Ok(Self {
            docs,
            vectors,
            embedder,
        })
    }

    async fn nearest(&self, query: &str, k: usize) -> Result<Vec<String>, KnowledgeError> {
        let query_vec = self
            .embedder
            .embed(vec![query.to_string()])
            .await?
            .pop()
            .ok_or_else(|| KnowledgeError::SearchFailed {
                reason: "embedder returned no vector for the query".into(),
            })?;

        let mut scored: Vec<(f64, &String)> = self
            .vectors
            .iter()
            .zip(&self.docs.passages)
            .filter_map(|(vec, text)| cosine(&query_vec, vec).map(|score| (score, text)))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        debug!(query = %query, hits = scored.len(), "Embedding search");
        Ok(scored.into_iter().map(|(_, text)| text.clone()).collect())
    }
}

#[async_trait]
impl KnowledgeBase for EmbeddedDocs {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, KnowledgeError> {
        if query.trim().is_empty() || k == 0 || self.docs.is_empty() {
            return Ok(Vec::new());
        }
        match self.nearest(query, k).await {
            Ok(hits) => Ok(hits),
            Err(e) => {
                warn!(error = %e, "Query embedding failed, using keyword ranking");
                Ok(self.docs.rank(query, k))
            }
        }
    }
}

/// `None` for mismatched lengths or a zero vector.
fn cosine(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    let score = dot / (norm_a * norm_b);
    score.is_finite().then_some(score)
}

fn split_passages(content: &str) -> Vec<String> {
    content
        .replace("\r\n", "\n")
        .split("\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect()
}
