//! Helpers for pulling structured data out of free-form model output.

/// Extract a JSON object from LLM output (handles markdown wrapping).
pub fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    // Outermost braces, greedy like `\{.*\}`.
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

/// Normalize a one-word label answer: lowercase, strip punctuation and
/// markdown emphasis.
pub fn normalize_label(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_direct_object() {
        let input = r#"{"food_name": "apple"}"#;
        assert_eq!(extract_json_object(input), input);
    }

    #[test]
    fn extract_json_from_markdown_block() {
        let input = "```json\n{\"food_name\": \"pizza\"}\n```";
        let result = extract_json_object(input);
        assert!(result.starts_with('{'));
        assert!(result.contains("pizza"));
    }

    #[test]
    fn extract_json_embedded_in_text() {
        let input = "Here you go: {\"calories_per_serving\": 95} enjoy.";
        let result = extract_json_object(input);
        assert!(result.starts_with('{'));
        assert!(result.ends_with('}'));
    }

    #[test]
    fn extract_json_no_object_returns_trimmed() {
        assert_eq!(extract_json_object("  nothing here "), "nothing here");
    }

    #[test]
    fn normalize_label_strips_noise() {
        assert_eq!(normalize_label("  **Fitness**.\n"), "fitness");
        assert_eq!(normalize_label("OUT_OF_DOMAIN"), "out_of_domain");
        assert_eq!(normalize_label("'misc'"), "misc");
    }
}
