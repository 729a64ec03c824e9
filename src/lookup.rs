//! Food lookup: trigger detection, query extraction, and the lookup stage.
//!
//! Nothing in here fails outward. Extraction falls back to the raw message and
//! lookup falls back to a zero-valued record tagged with [`FALLBACK_SOURCE`].

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::llm::json::extract_json_object;
use crate::llm::provider::{CompletionRequest, LlmProvider};

/// `source` value marking a record that did not come from a real lookup.
pub const FALLBACK_SOURCE: &str = "fallback";

/// Low temperature for extraction and lookup.
const LOOKUP_TEMPERATURE: f32 = 0.1;

const LOOKUP_MAX_TOKENS: u32 = 400;

/// Phrases that mean the user wants precise nutrition numbers.
const LOOKUP_TRIGGERS: &[&str] = &[
    "how many calories",
    "calories in",
    "nutrition facts",
    "macros",
    "protein in",
    "carbs in",
    "fat in",
    "nutritional value",
    "nutrition info",
];

/// Structured nutrition data for a food query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    #[serde(alias = "food_name", default)]
    pub name: String,
    #[serde(default)]
    pub serving_size: String,
    #[serde(alias = "calories_per_serving", default, deserialize_with = "lenient_f64")]
    pub calories: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub protein_g: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub carbs_g: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fat_g: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fiber_g: f64,
    #[serde(default)]
    pub source: String,
}

impl NutritionFacts {
    /// Zero-valued record returned when resolution fails.
    pub fn fallback(query: &str) -> Self {
        Self {
            name: query.to_string(),
            serving_size: "1 serving".to_string(),
            calories: 0.0,
            protein_g: 0.0,
            carbs_g: 0.0,
            fat_g: 0.0,
            fiber_g: 0.0,
            source: FALLBACK_SOURCE.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == FALLBACK_SOURCE
    }
}

/// Accept numbers, numeric strings ("95", "0.5g"), or null.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => parse_numeric_prefix(&s),
        _ => 0.0,
    })
}

/// Leading number of a string such as "1,200 kcal" or "0.5g".
///
/// Thousands separators are dropped. A malformed tail ("1.2.3") keeps the
/// longest prefix that parses; zero only when no digits were read.
fn parse_numeric_prefix(raw: &str) -> f64 {
    let numeric: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '_'))
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    (1..=numeric.len())
        .rev()
        .find_map(|end| numeric[..end].parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Parse a lookup response into facts, filling in gaps.
fn parse_lookup_response(raw: &str, query: &str) -> Result<NutritionFacts, String> {
    let json_str = extract_json_object(raw);
    let mut facts: NutritionFacts =
        serde_json::from_str(&json_str).map_err(|e| format!("JSON parse error: {e}"))?;
    if facts.name.trim().is_empty() {
        facts.name = query.to_string();
    }
    if facts.serving_size.trim().is_empty() {
        facts.serving_size = "1 serving".to_string();
    }
    if facts.source.trim().is_empty() {
        facts.source = "Food Database".to_string();
    }
    Ok(facts)
}

/// Whether a message is asking for precise nutrition data.
#[derive(Debug, Clone)]
pub struct LookupTrigger {
    regex: Regex,
}

impl LookupTrigger {
    pub fn default_phrases() -> Self {
        let alternation = LOOKUP_TRIGGERS
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");
        Self {
            regex: Regex::new(&format!("(?i)(?:{alternation})"))
                .expect("escaped trigger alternation is a valid regex"),
        }
    }

    pub fn needs_lookup(&self, message: &str) -> bool {
        self.regex.is_match(message)
    }
}

impl Default for LookupTrigger {
    fn default() -> Self {
        Self::default_phrases()
    }
}

/// Auxiliary lookup collaborator.
#[async_trait]
pub trait FoodLookup: Send + Sync {
    /// Resolve a food query. Always returns a record.
    async fn lookup(&self, query: &str) -> NutritionFacts;
}

/// Food lookup backed by the LLM acting as a food database API.
pub struct LlmFoodLookup {
    llm: Arc<dyn LlmProvider>,
}

impl LlmFoodLookup {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl FoodLookup for LlmFoodLookup {
    async fn lookup(&self, query: &str) -> NutritionFacts {
        info!(query = %query, "Looking up food data");
        let request = CompletionRequest::prompt(build_lookup_prompt(query))
            .with_temperature(LOOKUP_TEMPERATURE)
            .with_max_tokens(LOOKUP_MAX_TOKENS);

        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Food lookup call failed, using fallback record");
                return NutritionFacts::fallback(query);
            }
        };

        match parse_lookup_response(&response.content, query) {
            Ok(facts) => {
                info!(food = %facts.name, calories = facts.calories, "Food lookup complete");
                facts
            }
            Err(e) => {
                warn!(
                    raw_response = %response.content,
                    error = %e,
                    "Malformed food lookup response, using fallback record"
                );
                NutritionFacts::fallback(query)
            }
        }
    }
}

/// Turns a message into a short comma-separated food list.
pub struct QueryExtractor {
    llm: Arc<dyn LlmProvider>,
}

impl QueryExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Best-effort extraction; returns the message unchanged on failure.
    pub async fn extract_query(&self, message: &str) -> String {
        let request = CompletionRequest::prompt(build_extract_prompt(message))
            .with_temperature(LOOKUP_TEMPERATURE)
            .with_max_tokens(LOOKUP_MAX_TOKENS);

        match self.llm.complete(request).await {
            Ok(response) => {
                let query = clean_extracted_items(&response.content);
                if query.is_empty() {
                    debug!("Extraction returned nothing, using original message");
                    message.to_string()
                } else {
                    debug!(query = %query, "Extracted food query");
                    query
                }
            }
            Err(e) => {
                warn!(error = %e, "Food extraction failed, using original message");
                message.to_string()
            }
        }
    }
}

/// Collapse bullet or line lists into one comma-separated line.
fn clean_extracted_items(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim()
                .trim_matches('"')
                .trim()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_lookup_prompt(query: &str) -> String {
    format!(
        "You are a food database API. Return realistic nutrition data for: \"{query}\"\n\n\
         Respond with this exact JSON format:\n\
         {{\n\
         \x20 \"food_name\": \"standardized food name\",\n\
         \x20 \"serving_size\": \"1 medium apple, 2 slices, etc.\",\n\
         \x20 \"calories_per_serving\": <number>,\n\
         \x20 \"protein_g\": <number>,\n\
         \x20 \"carbs_g\": <number>,\n\
         \x20 \"fat_g\": <number>,\n\
         \x20 \"fiber_g\": <number>,\n\
         \x20 \"source\": \"USDA Food Database\"\n\
         }}\n\n\
         Use realistic nutrition values. For example:\n\
         - 1 medium apple: 95 calories, 0.5g protein, 25g carbs, 0.3g fat, 4g fiber\n\
         - 2 pizza slices: 570 calories, 24g protein, 72g carbs, 20g fat, 4g fiber"
    )
}

fn build_extract_prompt(message: &str) -> String {
    format!(
        "Extract the food items from this message for database lookup: \"{message}\"\n\n\
         Return just the food items in a simple format, like:\n\
         - \"2 slices pizza\"\n\
         - \"1 medium apple\"\n\
         - \"chicken breast 6oz\"\n\n\
         If multiple items, separate with commas."
    )
}
