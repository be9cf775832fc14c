//! JSON recovery from model replies.
//!
//! Models asked for JSON still wrap it in code fences or surround it with
//! prose. We try, in order: the reply as-is, the contents of the first code
//! fence, and the span from the first `{` to the last `}`.

use serde_json::Value;

/// Pull a JSON object out of a model reply.
pub fn extract_json(reply: &str) -> Option<Value> {
    let trimmed = reply.trim();

    parse_object(trimmed)
        .or_else(|| fenced_block(trimmed).and_then(parse_object))
        .or_else(|| brace_span(trimmed).and_then(parse_object))
}

fn parse_object(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate.trim())
        .ok()
        .filter(Value::is_object)
}

/// Contents of the first ``` fence, minus an optional language tag.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let body_start = after.find('\n').map_or(0, |i| i + 1);
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_object() {
        assert_eq!(extract_json(r#"{"a": 1}"#), Some(json!({"a": 1})));
    }

    #[test]
    fn fenced_object() {
        let reply = "Here you go:\n```json\n{\"competitors\": []}\n```\nAnything else?";
        assert_eq!(extract_json(reply), Some(json!({"competitors": []})));
    }

    #[test]
    fn object_inside_prose() {
        let reply = "Sure! {\"rating\": 4, \"text\": \"ok {fine}\"} Hope that helps.";
        assert_eq!(extract_json(reply), Some(json!({"rating": 4, "text": "ok {fine}"})));
    }

    #[test]
    fn rejects_non_objects() {
        assert_eq!(extract_json("[1, 2, 3]"), None);
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }
}
