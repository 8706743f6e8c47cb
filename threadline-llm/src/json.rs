//! Best-effort recovery of a JSON object embedded in model prose.

use serde_json::Value;

/// Slice from the first `{` to the last `}` (inclusive) and parse it.
///
/// Returns `None` when either brace is missing, they are out of order, or the
/// slice is not valid JSON. Never panics; this is deliberately not a parser
/// for malformed output.
///
/// ```
/// use threadline_llm::json::extract_json;
///
/// let v = extract_json("Sure! {\"steps\": []} Hope that helps.").unwrap();
/// assert!(v["steps"].is_array());
/// assert!(extract_json("no braces here").is_none());
/// ```
pub fn extract_json(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recovers_object_from_fenced_reply() {
        let reply = "Here is the trace:\n```json\n{\"steps\":[{\"line\":1,\"note\":\"x = 1\"}]}\n```";
        assert_eq!(
            extract_json(reply),
            Some(json!({"steps": [{"line": 1, "note": "x = 1"}]}))
        );
    }

    #[test]
    fn stable_on_already_extracted_output() {
        let reply = "prefix {\"a\": {\"b\": 2}} suffix";
        let once = extract_json(reply).unwrap();
        let twice = extract_json(&once.to_string()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn unbalanced_or_absent_braces_yield_none() {
        assert_eq!(extract_json(""), None);
        assert_eq!(extract_json("{\"a\": 1"), None);
        assert_eq!(extract_json("\"a\": 1}"), None);
        assert_eq!(extract_json("} backwards {"), None);
        assert_eq!(extract_json("{\"a\": 1} and {\"b\": 2}"), None);
    }
}
