//! Domain classification for inbound messages.
//!
//! Two tiers:
//! 1. LLM classification (low temperature, one-word answer)
//! 2. `KeywordClassifier`: deterministic fallback when the LLM call fails or
//!    answers outside the label set
//!
//! `Classifier::classify` never fails outward.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::llm::json::normalize_label;
use crate::llm::provider::{CompletionRequest, LlmProvider};

/// Temperature for classification calls (deterministic-ish).
const CLASSIFY_TEMPERATURE: f32 = 0.1;

/// One-word answers only.
const CLASSIFY_MAX_TOKENS: u32 = 16;

const FITNESS_KEYWORDS: &[&str] = &[
    "workout", "working out", "exercise", "gym", "run", "running", "steps", "pushups",
    "training", "cardio", "strength", "muscle", "fitness", "active", "sport", "lift", "lifting",
];

const NUTRITION_KEYWORDS: &[&str] = &[
    "meal", "eat", "eating", "breakfast", "lunch", "dinner", "snack", "calorie", "calories",
    "food", "hungry", "nutrition", "diet", "protein", "carbs", "fat",
];

const HEALTH_KEYWORDS: &[&str] = &[
    "symptom", "pain", "doctor", "health", "medicine", "sick", "illness", "anxious", "anxiety",
    "stress", "depression", "mental", "mood", "sleep", "tired", "fatigue", "headache", "ache",
    "aching", "hurt", "sore",
];

/// Domain a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainLabel {
    Fitness,
    Nutrition,
    Health,
    Tracking,
    Miscellaneous,
}

impl DomainLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fitness => "fitness",
            Self::Nutrition => "nutrition",
            Self::Health => "health",
            Self::Tracking => "tracking",
            Self::Miscellaneous => "miscellaneous",
        }
    }

    /// Capitalized name for user-facing tags.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Fitness => "Fitness",
            Self::Nutrition => "Nutrition",
            Self::Health => "Health",
            Self::Tracking => "Tracking",
            Self::Miscellaneous => "Miscellaneous",
        }
    }

    /// The three specialist domains a miscellaneous message can be re-routed to.
    pub fn is_specialist(&self) -> bool {
        matches!(self, Self::Fitness | Self::Nutrition | Self::Health)
    }
}

impl fmt::Display for DomainLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fitness" => Ok(Self::Fitness),
            "nutrition" => Ok(Self::Nutrition),
            "health" => Ok(Self::Health),
            "tracking" => Ok(Self::Tracking),
            "misc" | "miscellaneous" | "general" | "out_of_domain" => Ok(Self::Miscellaneous),
            other => Err(format!("unknown domain label: '{other}'")),
        }
    }
}

/// A keyword set compiled to a single case-insensitive alternation.
#[derive(Debug, Clone)]
struct KeywordRule {
    label: DomainLabel,
    regex: Regex,
}

impl KeywordRule {
    fn new(label: DomainLabel, keywords: &[&str]) -> Self {
        let alternation = keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        Self {
            label,
            regex: Regex::new(&format!("(?i)(?:{alternation})"))
                .expect("escaped keyword alternation is a valid regex"),
        }
    }
}

/// Deterministic keyword classifier.
///
/// Rules are checked in priority order (fitness, nutrition, health) and the
/// first rule with any substring hit wins, so a message mentioning both a run
/// and a banana is fitness.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<KeywordRule>,
}

impl KeywordClassifier {
    pub fn default_rules() -> Self {
        Self {
            rules: vec![
                KeywordRule::new(DomainLabel::Fitness, FITNESS_KEYWORDS),
                KeywordRule::new(DomainLabel::Nutrition, NUTRITION_KEYWORDS),
                KeywordRule::new(DomainLabel::Health, HEALTH_KEYWORDS),
            ],
        }
    }

    pub fn classify(&self, text: &str) -> DomainLabel {
        for rule in &self.rules {
            if let Some(hit) = rule.regex.find(text) {
                debug!(label = %rule.label, keyword = hit.as_str(), "Keyword match");
                return rule.label;
            }
        }
        debug!("No keyword match, defaulting to miscellaneous");
        DomainLabel::Miscellaneous
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::default_rules()
    }
}

/// LLM-backed classifier with keyword fallback.
pub struct Classifier {
    llm: Arc<dyn LlmProvider>,
    keywords: KeywordClassifier,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            keywords: KeywordClassifier::default_rules(),
        }
    }

    /// Classify a message into a domain. Never fails.
    pub async fn classify(&self, text: &str) -> DomainLabel {
        let request = CompletionRequest::prompt(build_classify_prompt(text))
            .with_temperature(CLASSIFY_TEMPERATURE)
            .with_max_tokens(CLASSIFY_MAX_TOKENS);

        match self.llm.complete(request).await {
            Ok(response) => match normalize_label(&response.content).parse::<DomainLabel>() {
                Ok(label) => {
                    info!(label = %label, "LLM classification");
                    label
                }
                Err(e) => {
                    warn!(
                        raw_response = %response.content,
                        error = %e,
                        "Invalid classification, falling back to keywords"
                    );
                    self.keywords.classify(text)
                }
            },
            Err(e) => {
                warn!(error = %e, "Classification call failed, falling back to keywords");
                self.keywords.classify(text)
            }
        }
    }

    /// Second-opinion check for messages the router sent to miscellaneous.
    ///
    /// Returns the specialist domain the message actually belongs to, or
    /// `None` when it is genuinely out of domain.
    pub async fn detect_specialist_domain(&self, text: &str) -> Option<DomainLabel> {
        let request = CompletionRequest::prompt(build_domain_check_prompt(text))
            .with_temperature(CLASSIFY_TEMPERATURE)
            .with_max_tokens(CLASSIFY_MAX_TOKENS);

        let label = match self.llm.complete(request).await {
            Ok(response) => match normalize_label(&response.content).parse::<DomainLabel>() {
                Ok(label) => label,
                Err(e) => {
                    debug!(error = %e, "Unrecognized domain check answer, treating as out of domain");
                    DomainLabel::Miscellaneous
                }
            },
            Err(e) => {
                warn!(error = %e, "Domain check failed, falling back to keywords");
                self.keywords.classify(text)
            }
        };

        label.is_specialist().then_some(label)
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_classify_prompt(text: &str) -> String {
    format!(
        "Classify this user message into one of these categories:\n\n\
         User message: '{text}'\n\n\
         Categories:\n\
         - FITNESS: Exercise, workouts, physical activity, sports, training, gym, running, strength, cardio, muscle building\n\
         - NUTRITION: Food, meals, eating, diet, calories, hunger, snacks, cooking, meal planning, supplements\n\
         - HEALTH: Medical concerns, symptoms, pain, illness, mental health, anxiety, stress, sleep issues, headaches, body aches\n\
         - TRACKING: Requests to review logged meals, logged workouts, or overall progress\n\
         - MISC: Everything else not related to fitness, nutrition, or health\n\n\
         Respond with ONLY one word: fitness, nutrition, health, tracking, or misc"
    )
}

fn build_domain_check_prompt(text: &str) -> String {
    format!(
        "Analyze this user message: '{text}'\n\n\
         Could this message be related to:\n\
         - FITNESS (workouts, exercise, physical activity, sports, training)\n\
         - NUTRITION (food, meals, eating, diet, calories, hunger)\n\
         - HEALTH (medical concerns, symptoms, mental health, anxiety, stress, sleep)\n\n\
         If YES, respond with just: fitness, nutrition, or health\n\
         If NO, respond with: out_of_domain"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;

    fn classifier(llm: ScriptedLlm) -> Classifier {
        Classifier::new(Arc::new(llm))
    }

    // ── Keyword fallback ────────────────────────────────────────────

    #[test]
    fn keyword_fitness_beats_nutrition() {
        let kc = KeywordClassifier::default_rules();
        assert_eq!(
            kc.classify("I went for a run and then ate a banana"),
            DomainLabel::Fitness
        );
    }

    #[test]
    fn keyword_nutrition_beats_health() {
        let kc = KeywordClassifier::default_rules();
        assert_eq!(
            kc.classify("I'm anxious and skipped breakfast"),
            DomainLabel::Nutrition
        );
    }

    #[test]
    fn keyword_is_case_insensitive() {
        let kc = KeywordClassifier::default_rules();
        assert_eq!(kc.classify("HEADACHE all day"), DomainLabel::Health);
        assert_eq!(kc.classify("Gym later?"), DomainLabel::Fitness);
    }

    #[test]
    fn keyword_matches_substrings() {
        let kc = KeywordClassifier::default_rules();
        // "brunch" contains "run"
        assert_eq!(kc.classify("Sunday brunch plans"), DomainLabel::Fitness);
    }

    #[test]
    fn keyword_no_match_is_miscellaneous() {
        let kc = KeywordClassifier::default_rules();
        assert_eq!(kc.classify("What's the capital of Peru?"), DomainLabel::Miscellaneous);
    }

    #[test]
    fn keyword_is_idempotent() {
        let kc = KeywordClassifier::default_rules();
        for text in ["lunch ideas", "my back is sore", "hello there", "lifting tips"] {
            assert_eq!(kc.classify(text), kc.classify(text));
        }
    }

    // ── Label parsing ───────────────────────────────────────────────

    #[test]
    fn label_parses_aliases() {
        assert_eq!("misc".parse::<DomainLabel>().unwrap(), DomainLabel::Miscellaneous);
        assert_eq!("OUT_OF_DOMAIN".parse::<DomainLabel>().unwrap(), DomainLabel::Miscellaneous);
        assert_eq!(" Health ".parse::<DomainLabel>().unwrap(), DomainLabel::Health);
        assert!("sports".parse::<DomainLabel>().is_err());
    }

    #[test]
    fn label_display_and_title() {
        assert_eq!(DomainLabel::Nutrition.to_string(), "nutrition");
        assert_eq!(DomainLabel::Fitness.title(), "Fitness");
        assert!(DomainLabel::Health.is_specialist());
        assert!(!DomainLabel::Tracking.is_specialist());
    }

    // ── LLM path ────────────────────────────────────────────────────

    #[tokio::test]
    async fn llm_label_is_used() {
        let c = classifier(ScriptedLlm::new().on("Classify this user message", "Health"));
        // Keywords would say fitness; the LLM wins.
        assert_eq!(c.classify("my knee hurts after running").await, DomainLabel::Health);
    }

    #[tokio::test]
    async fn llm_tracking_label_is_accepted() {
        let c = classifier(ScriptedLlm::new().on("Classify this user message", "tracking"));
        assert_eq!(c.classify("how am I doing this week?").await, DomainLabel::Tracking);
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_keywords() {
        let c = classifier(ScriptedLlm::new().fail_by_default());
        let text = "I went for a run and then ate a banana";
        let first = c.classify(text).await;
        let second = c.classify(text).await;
        assert_eq!(first, DomainLabel::Fitness);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn llm_garbage_falls_back_to_keywords() {
        let c = classifier(
            ScriptedLlm::new().on("Classify this user message", "I think this is about food"),
        );
        assert_eq!(c.classify("what should I eat for dinner").await, DomainLabel::Nutrition);
    }

    #[tokio::test]
    async fn domain_check_returns_specialist() {
        let c = classifier(ScriptedLlm::new().on("Analyze this user message", "HEALTH"));
        assert_eq!(
            c.detect_specialist_domain("exam nerves").await,
            Some(DomainLabel::Health)
        );
    }

    #[tokio::test]
    async fn domain_check_out_of_domain_is_none() {
        let c = classifier(ScriptedLlm::new().on("Analyze this user message", "out_of_domain"));
        assert_eq!(c.detect_specialist_domain("tell me a joke").await, None);
    }

    #[tokio::test]
    async fn domain_check_never_returns_tracking() {
        let c = classifier(ScriptedLlm::new().on("Analyze this user message", "tracking"));
        assert_eq!(c.detect_specialist_domain("my stats").await, None);
    }

    #[tokio::test]
    async fn domain_check_failure_uses_keywords() {
        let c = classifier(ScriptedLlm::new().fail_by_default());
        assert_eq!(
            c.detect_specialist_domain("skipped breakfast again").await,
            Some(DomainLabel::Nutrition)
        );
        assert_eq!(c.detect_specialist_domain("tell me a joke").await, None);
    }
}
