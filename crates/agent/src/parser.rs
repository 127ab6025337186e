//! Model reply parsing.
//!
//! The model answers with a JSON blob `{"action": ..., "action_input": ...}`,
//! possibly inside a ```json fence and possibly after a `Thought:` line.
//! A reply with no blob at all is a final answer: the text after a
//! `Final Answer:` marker when there is one, otherwise the whole reply.

use crate::context::prompt::FINAL_ANSWER_ACTION;
use crate::context::working_memory::Action;
use edupolicy_core::tool::ToolName;
use thiserror::Error;

const FINAL_ANSWER_MARKER: &str = "Final Answer:";

/// What a reply asks the loop to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedReply {
    Action(Action),
    FinalAnswer(String),
}

/// A reply the loop cannot act on. Recoverable by re-prompting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty reply")]
    Empty,

    #[error("JSON blob does not parse: {0}")]
    InvalidJson(String),

    #[error("JSON blob has no \"action\" field")]
    MissingAction,
}

/// The body of a ```json fence, when it holds an object.
fn fenced_blob(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    let end = after.find("```")?;
    let inner = after[..end].trim();
    inner.starts_with('{').then_some(inner)
}

/// First complete JSON value at the start of `text`; trailing text is ignored.
fn leading_value(text: &str) -> Result<serde_json::Value, serde_json::Error> {
    match serde_json::Deserializer::from_str(text).into_iter::<serde_json::Value>().next() {
        Some(result) => result,
        None => serde_json::from_str(text),
    }
}

fn final_answer_from_prose(text: &str) -> Result<ParsedReply, ParseError> {
    let answer = match text.rfind(FINAL_ANSWER_MARKER) {
        Some(idx) => text[idx + FINAL_ANSWER_MARKER.len()..].trim(),
        None => text.trim(),
    };
    if answer.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(ParsedReply::FinalAnswer(answer.to_string()))
}

/// Parse one model reply.
///
/// A fenced blob must be a well-formed action. Without a fence, the first
/// object carrying an `action` key is used; objects without one and
/// braces that are not JSON belong to the prose.
pub fn parse_reply(reply: &str) -> Result<ParsedReply, ParseError> {
    let text = reply.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(blob) = fenced_blob(text) {
        let value = leading_value(blob).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
        return interpret(&value);
    }

    let mut broken_action = None;
    for (idx, _) in text.match_indices('{') {
        let candidate = &text[idx..];
        match leading_value(candidate) {
            Ok(value) if value.get("action").is_some() => return interpret(&value),
            Ok(_) => {}
            Err(e) => {
                if broken_action.is_none() && candidate.contains("\"action\"") {
                    broken_action = Some(e.to_string());
                }
            }
        }
    }

    match broken_action {
        Some(reason) => Err(ParseError::InvalidJson(reason)),
        None => final_answer_from_prose(text),
    }
}

fn interpret(value: &serde_json::Value) -> Result<ParsedReply, ParseError> {
    let action = value
        .get("action")
        .and_then(|a| a.as_str())
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or(ParseError::MissingAction)?;

    let input = match value.get("action_input") {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    };

    if action.eq_ignore_ascii_case(FINAL_ANSWER_ACTION) {
        if input.is_empty() {
            return Err(ParseError::Empty);
        }
        return Ok(ParsedReply::FinalAnswer(input));
    }

    // Canonical spelling for known tools; unknown names pass through as-is.
    let tool = action
        .parse::<ToolName>()
        .map(|t| t.as_str().to_string())
        .unwrap_or_else(|_| action.to_string());

    Ok(ParsedReply::Action(Action::new(tool, input)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(tool: &str, input: &str) -> ParsedReply {
        ParsedReply::Action(Action::new(tool, input))
    }

    #[test]
    fn bare_blob() {
        assert_eq!(
            parse_reply(r#"{"action": "rag_tool", "action_input": "học bổng"}"#),
            Ok(action("rag_tool", "học bổng"))
        );
    }

    #[test]
    fn fenced_blob_with_thought() {
        let reply = "Thought: cần tra cứu quy định\n```json\n{\"action\": \"RAG_TOOL\", \"action_input\": \"điều kiện học bổng\"}\n```";
        assert_eq!(parse_reply(reply), Ok(action("rag_tool", "điều kiện học bổng")));
    }

    #[test]
    fn final_answer_blob() {
        let reply = r#"```json
{"action": "Final Answer", "action_input": "Sinh viên cần GPA từ 3.2 trở lên."}
```"#;
        assert_eq!(
            parse_reply(reply),
            Ok(ParsedReply::FinalAnswer("Sinh viên cần GPA từ 3.2 trở lên.".into()))
        );
    }

    #[test]
    fn final_answer_marker_without_blob() {
        let reply = "Thought: đã đủ thông tin\nFinal Answer: Bạn cần nộp hồ sơ trước ngày 15.";
        assert_eq!(
            parse_reply(reply),
            Ok(ParsedReply::FinalAnswer("Bạn cần nộp hồ sơ trước ngày 15.".into()))
        );
    }

    #[test]
    fn plain_prose_is_final_answer() {
        assert_eq!(
            parse_reply("  Xin chào! Tôi có thể giúp gì cho bạn?  "),
            Ok(ParsedReply::FinalAnswer("Xin chào! Tôi có thể giúp gì cho bạn?".into()))
        );
        // Braces without an action field are still prose.
        assert!(matches!(parse_reply("Tập hợp {A, B} gồm hai môn."), Ok(ParsedReply::FinalAnswer(_))));
    }

    #[test]
    fn malformed_replies() {
        assert_eq!(parse_reply("   "), Err(ParseError::Empty));
        assert!(matches!(
            parse_reply(r#"{"action": "rag_tool", "action_input": }"#),
            Err(ParseError::InvalidJson(_))
        ));
        assert_eq!(
            parse_reply("```json\n{\"action_input\": \"x\"}\n```"),
            Err(ParseError::MissingAction)
        );
        assert_eq!(parse_reply(r#"{"action": "  "}"#), Err(ParseError::MissingAction));
        assert_eq!(parse_reply(r#"{"action": "Final Answer", "action_input": ""}"#), Err(ParseError::Empty));
    }

    #[test]
    fn action_followed_by_braced_prose() {
        let reply = "{\"action\": \"rag_tool\", \"action_input\": \"học bổng\"}\nTôi sẽ xem mục {2}.";
        assert_eq!(parse_reply(reply), Ok(action("rag_tool", "học bổng")));

        let reply = "Xem mục {2} trước. {\"action\": \"sql_tool\", \"action_input\": \"số tín chỉ\"}";
        assert_eq!(parse_reply(reply), Ok(action("sql_tool", "số tín chỉ")));
    }

    #[test]
    fn json_object_without_action_in_prose() {
        let reply = "Bạn hãy gửi biểu mẫu theo dạng {\"mssv\": \"2021001\"} cho phòng đào tạo.";
        assert_eq!(parse_reply(reply), Ok(ParsedReply::FinalAnswer(reply.into())));
    }

    #[test]
    fn unknown_tool_passes_through() {
        assert_eq!(
            parse_reply(r#"{"action": "calculator", "action_input": "1+1"}"#),
            Ok(action("calculator", "1+1"))
        );
    }

    #[test]
    fn non_string_input_is_serialized() {
        assert_eq!(
            parse_reply(r#"{"action": "web_tool", "action_input": {"query": "học phí"}}"#),
            Ok(action("web_tool", r#"{"query":"học phí"}"#))
        );
    }
}
