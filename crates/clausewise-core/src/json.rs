//! Locating the JSON document inside free-form model output.
//!
//! Models asked for JSON still wrap it in Markdown fences or a sentence of
//! prose now and then. We take the first fenced block if there is one,
//! otherwise the outermost `{ ... }` span.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n?(.*?)```").expect("Invalid regex");
}

/// Return the slice of `text` that most likely holds the JSON document.
///
/// Returns `None` when no object-looking span exists.
pub fn extract_json_block(text: &str) -> Option<&str> {
    if let Some(inner) = FENCED_BLOCK
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
    {
        if !inner.is_empty() {
            return Some(inner);
        }
    }

    let trimmed = text.trim();
    if (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
    {
        return Some(trimmed);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bare_json() {
        assert_eq!(extract_json_block("  {\"a\": 1}\n"), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_fenced_json() {
        let text = "Here you go:\n```json\n{\"compliant\": true}\n```\nThanks";
        assert_eq!(extract_json_block(text), Some("{\"compliant\": true}"));
    }

    #[test]
    fn test_unlabelled_fence() {
        let text = "```\n{\"compliant\": false}\n```";
        assert_eq!(extract_json_block(text), Some("{\"compliant\": false}"));
    }

    #[test]
    fn test_prose_around_object() {
        let text = "Result: {\"x\": {\"y\": 2}} -- end";
        assert_eq!(extract_json_block(text), Some("{\"x\": {\"y\": 2}}"));
    }

    #[test]
    fn test_no_json() {
        assert_eq!(extract_json_block("I cannot help with that."), None);
    }

    proptest! {
        #[test]
        fn prop_prose_wrapped_object_is_recovered(
            prefix in "[a-zA-Z .,:]{0,40}",
            suffix in "[a-zA-Z .,:]{0,40}",
            note in "[a-zA-Z ]{0,30}",
            compliant in any::<bool>(),
        ) {
            let body = serde_json::json!({"compliant": compliant, "notes": note}).to_string();
            let text = format!("{}{}{}", prefix, body, suffix);
            let block = extract_json_block(&text).unwrap();
            let parsed: serde_json::Value = serde_json::from_str(block).unwrap();
            prop_assert_eq!(parsed["compliant"].as_bool(), Some(compliant));
        }
    }
}
