//! Keyword search mode (§4.1): tokenize on non-alphanumeric boundaries plus
//! camel/underscore splits, score by normalized overlap across
//! `name`/`description`/`tags` with weights `{name: 3, tags: 2, description: 1}`.

use std::collections::BTreeSet;
use ucp_core::ToolSchema;

const NAME_WEIGHT: f64 = 3.0;
const TAGS_WEIGHT: f64 = 2.0;
const DESCRIPTION_WEIGHT: f64 = 1.0;

/// Split on non-alphanumeric boundaries and camelCase/underscore transitions.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    let mut current = String::new();
    let mut prev_lower = false;

    let mut flush = |current: &mut String, tokens: &mut BTreeSet<String>| {
        if !current.is_empty() {
            tokens.insert(std::mem::take(current).to_lowercase());
        }
    };

    for c in text.chars() {
        if !c.is_alphanumeric() {
            flush(&mut current, &mut tokens);
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            flush(&mut current, &mut tokens);
        }
        prev_lower = c.is_lowercase();
        current.push(c);
    }
    flush(&mut current, &mut tokens);
    tokens
}

fn overlap_fraction(query_tokens: &BTreeSet<String>, field_tokens: &BTreeSet<String>) -> f64 {
    if query_tokens.is_empty() || field_tokens.is_empty() {
        return 0.0;
    }
    let hits = query_tokens.intersection(field_tokens).count();
    hits as f64 / query_tokens.len() as f64
}

/// Weighted, normalized keyword score in `[0, 1]` (clamped after weighting).
pub fn score(query: &str, schema: &ToolSchema) -> f64 {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return 0.0;
    }
    let name_tokens = tokenize(&schema.name);
    let desc_tokens = tokenize(&schema.description);
    let tag_tokens: BTreeSet<String> = schema
        .tags
        .iter()
        .flat_map(|t| tokenize(t))
        .collect();

    let weighted = NAME_WEIGHT * overlap_fraction(&query_tokens, &name_tokens)
        + TAGS_WEIGHT * overlap_fraction(&query_tokens, &tag_tokens)
        + DESCRIPTION_WEIGHT * overlap_fraction(&query_tokens, &desc_tokens);

    (weighted / (NAME_WEIGHT + TAGS_WEIGHT + DESCRIPTION_WEIGHT)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_camel_case_and_underscores() {
        let tokens = tokenize("listDirectory list_directory");
        assert!(tokens.contains("list"));
        assert!(tokens.contains("directory"));
    }

    #[test]
    fn name_match_scores_higher_than_description_only_match() {
        let schema_name_match = ToolSchema::new(
            "fs",
            "list_directory",
            "Do something unrelated",
            serde_json::json!({}),
            Default::default(),
        );
        let schema_desc_match = ToolSchema::new(
            "fs",
            "frobnicate",
            "List the directory contents",
            serde_json::json!({}),
            Default::default(),
        );
        let a = score("list directory", &schema_name_match);
        let b = score("list directory", &schema_desc_match);
        assert!(a > b);
    }

    #[test]
    fn empty_query_scores_zero() {
        let schema = ToolSchema::new("fs", "list_directory", "List files", serde_json::json!({}), Default::default());
        assert_eq!(score("", &schema), 0.0);
    }
}
