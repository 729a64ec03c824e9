//! Specialist responders.
//!
//! Every responder turns a message into exactly one reply string and never
//! fails outward:
//! - generation failure → `<badge>\n<apology>` plus a warning
//! - retrieval failure → empty context
//! - profile lookup failure → no profile
//! - activity log failure → logged, reply still returned

mod prompts;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::classifier::DomainLabel;
use crate::knowledge::KnowledgeBase;
use crate::llm::provider::{CompletionRequest, LlmProvider};
use crate::lookup::NutritionFacts;
use crate::store::model::{ActivityKind, UserProfile};
use crate::store::WellnessStore;

use prompts::ProfileView;

pub const FITNESS_BADGE: &str = "🏋️ *[Fitness Coach]*";
pub const NUTRITION_BADGE: &str = "🍎 *[Nutrition Coach]*";
pub const NUTRITION_DATA_BADGE: &str = "🍎 *[Nutrition Coach + Database]*";
pub const HEALTH_BADGE: &str = "🩺 *[Doctor]*";
pub const TRACKING_BADGE: &str = "📊 *[Progress Tracker]*";
pub const DOMAIN_HELPER_BADGE: &str = "🤖 *[Domain Helper]*";

const DEGRADED_APOLOGY: &str =
    "Sorry, I'm having trouble putting an answer together right now. Please try again in a moment.";

/// Health answers run cooler than the rest.
const HEALTH_TEMPERATURE: f32 = 0.3;

/// Tag prepended to a reply that reached its responder through the
/// miscellaneous re-route.
pub fn rerouted_tag(domain: DomainLabel) -> String {
    format!("🔄 *[Re-routed to {}]*\n", domain.title())
}

/// Reply used when a responder cannot generate.
pub fn degraded_reply(badge: &str) -> String {
    format!("{badge}\n{DEGRADED_APOLOGY}")
}

/// Canned reply for genuinely out-of-domain messages.
pub fn out_of_domain(message: &str) -> String {
    format!(
        "{DOMAIN_HELPER_BADGE}\n\
         I'm specialized in fitness 🏋️, nutrition 🍎, and health 🩺 topics. \
         Your question about '{message}' seems to be outside these areas. \
         Could you ask me something related to workouts, meals, or health instead? \
         I'd be happy to help with those topics!"
    )
}

/// The domain responders, sharing one set of collaborators.
pub struct Specialists {
    llm: Arc<dyn LlmProvider>,
    knowledge: Arc<dyn KnowledgeBase>,
    store: Arc<dyn WellnessStore>,
    retrieval_k: usize,
}

impl Specialists {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        knowledge: Arc<dyn KnowledgeBase>,
        store: Arc<dyn WellnessStore>,
        retrieval_k: usize,
    ) -> Self {
        Self {
            llm,
            knowledge,
            store,
            retrieval_k,
        }
    }

    pub async fn fitness(&self, user_id: &str, message: &str) -> String {
        let profile = self.profile(user_id).await;
        let context = self.context(&format!("fitness {message}")).await;
        let prompt = prompts::fitness_prompt(
            message,
            &prompts::profile_context(profile.as_ref(), ProfileView::Fitness),
            &context,
        );

        let reply = self.generate(FITNESS_BADGE, prompt, None).await;
        self.log_activity(user_id, ActivityKind::Workout, message.trim())
            .await;
        reply
    }

    pub async fn nutrition(&self, user_id: &str, message: &str) -> String {
        let profile = self.profile(user_id).await;
        let context = self.context(&format!("nutrition {message}")).await;
        let prompt = prompts::nutrition_prompt(
            message,
            &prompts::profile_context(profile.as_ref(), ProfileView::Nutrition),
            &context,
        );

        let reply = self.generate(NUTRITION_BADGE, prompt, None).await;
        self.log_activity(user_id, ActivityKind::Meal, message.trim())
            .await;
        reply
    }

    /// Nutrition reply grounded on a lookup record. Always ends with the
    /// record's source so fallback data is visible to the user.
    pub async fn nutrition_with_data(
        &self,
        user_id: &str,
        message: &str,
        facts: &NutritionFacts,
    ) -> String {
        let profile = self.profile(user_id).await;
        let prompt = prompts::nutrition_data_prompt(
            message,
            &prompts::profile_context(profile.as_ref(), ProfileView::Goals),
            facts,
        );

        let body = match self.complete(prompt, None).await {
            Some(text) => text,
            None => format!("{DEGRADED_APOLOGY}\n\n{}", prompts::food_summary(facts)),
        };

        let description = format!("{} - {}", message.trim(), facts.name);
        self.log_activity(user_id, ActivityKind::Meal, &description)
            .await;

        format!("{NUTRITION_DATA_BADGE}\n{body}\n\n_Source: {}_", facts.source)
    }

    pub async fn health(&self, user_id: &str, message: &str) -> String {
        let profile = self.profile(user_id).await;
        let context = self.context(message).await;
        let prompt = prompts::health_prompt(
            message,
            &prompts::profile_context(profile.as_ref(), ProfileView::Health),
            &context,
        );

        self.generate(HEALTH_BADGE, prompt, Some(HEALTH_TEMPERATURE))
            .await
    }

    /// Progress summary from the activity log. No LLM call.
    pub async fn tracking(&self, user_id: &str) -> String {
        match self.store.activity_counts(user_id).await {
            Ok(counts) => format!(
                "{TRACKING_BADGE}\nYou've logged {} meals and {} workouts so far.\nKeep going strong! 💪",
                counts.meals, counts.workouts
            ),
            Err(e) => {
                warn!(user_id = user_id, error = %e, "Activity counts unavailable");
                degraded_reply(TRACKING_BADGE)
            }
        }
    }

    // ── Shared plumbing ─────────────────────────────────────────────

    async fn generate(&self, badge: &str, prompt: String, temperature: Option<f32>) -> String {
        match self.complete(prompt, temperature).await {
            Some(text) => format!("{badge}\n{text}"),
            None => degraded_reply(badge),
        }
    }

    /// One generation attempt. `None` on error or an empty answer.
    async fn complete(&self, prompt: String, temperature: Option<f32>) -> Option<String> {
        let mut request = CompletionRequest::prompt(prompt);
        if let Some(t) = temperature {
            request = request.with_temperature(t);
        }

        match self.llm.complete(request).await {
            Ok(response) => {
                debug!(
                    model = self.llm.model_name(),
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "Responder generation finished"
                );
                let text = response.content.trim();
                if text.is_empty() {
                    warn!("Responder generation returned empty text");
                    None
                } else {
                    Some(text.to_string())
                }
            }
            Err(e) => {
                warn!(error = %e, "Responder generation failed, using degraded reply");
                None
            }
        }
    }

    async fn profile(&self, user_id: &str) -> Option<UserProfile> {
        match self.store.get_profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = user_id, error = %e, "Profile lookup failed, continuing without");
                None
            }
        }
    }

    async fn context(&self, query: &str) -> String {
        match self.knowledge.search(query, self.retrieval_k).await {
            Ok(passages) => {
                debug!(passages = passages.len(), "Retrieved context");
                passages.join("\n")
            }
            Err(e) => {
                warn!(error = %e, "Retrieval failed, continuing without context");
                String::new()
            }
        }
    }

    async fn log_activity(&self, user_id: &str, kind: ActivityKind, description: &str) {
        if let Err(e) = self.store.record_activity(user_id, kind, description).await {
            warn!(user_id = user_id, kind = %kind, error = %e, "Failed to log activity");
        }
    }
}
