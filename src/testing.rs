//! Test doubles shared by the unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{DatabaseError, KnowledgeError, LlmError};
use crate::knowledge::KnowledgeBase;
use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider};
use crate::store::model::{ActivityCounts, ActivityKind, UserProfile};
use crate::store::WellnessStore;

/// LLM that answers by matching prompt substrings against scripted rules.
///
/// Rules are checked in insertion order; the first needle found in the
/// concatenated request text wins. `None` as a response simulates a
/// provider failure for that prompt.
pub struct ScriptedLlm {
    rules: Vec<(String, Option<String>)>,
    default: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default: Some("ok".to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn on(mut self, needle: &str, response: &str) -> Self {
        self.rules.push((needle.to_string(), Some(response.to_string())));
        self
    }

    pub fn fail_on(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), None));
        self
    }

    pub fn fail_by_default(mut self) -> Self {
        self.default = None;
        self
    }

    /// Every prompt seen so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn prompts_containing(&self, needle: &str) -> usize {
        self.prompts().iter().filter(|p| p.contains(needle)).count()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let text: String = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(text.clone());

        let answer = self
            .rules
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.default.clone());

        match answer {
            Some(content) => Ok(CompletionResponse {
                content,
                input_tokens: 10,
                output_tokens: 5,
            }),
            None => Err(LlmError::RequestFailed {
                provider: "scripted".into(),
                reason: "scripted failure".into(),
            }),
        }
    }
}

/// Knowledge base that always fails.
pub struct BrokenKnowledge;

#[async_trait]
impl KnowledgeBase for BrokenKnowledge {
    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<String>, KnowledgeError> {
        Err(KnowledgeError::SearchFailed {
            reason: "index offline".into(),
        })
    }
}

/// Store whose every call fails.
pub struct BrokenStore;

#[async_trait]
impl WellnessStore for BrokenStore {
    async fn get_profile(&self, _user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
        Err(DatabaseError::Query("store offline".into()))
    }

    async fn upsert_profile(&self, _profile: &UserProfile) -> Result<(), DatabaseError> {
        Err(DatabaseError::Query("store offline".into()))
    }

    async fn record_activity(
        &self,
        _user_id: &str,
        _kind: ActivityKind,
        _description: &str,
    ) -> Result<(), DatabaseError> {
        Err(DatabaseError::Query("store offline".into()))
    }

    async fn activity_counts(&self, _user_id: &str) -> Result<ActivityCounts, DatabaseError> {
        Err(DatabaseError::Query("store offline".into()))
    }
}
