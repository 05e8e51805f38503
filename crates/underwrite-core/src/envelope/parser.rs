//! Response parsing: fence stripping and JSON decoding.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use super::coerce::kind_name;
use super::model::Envelope;
use crate::types::Response;

lazy_static! {
    /// Opening ```json marker and the whitespace after it
    static ref LEADING_FENCE: Regex = Regex::new(r"^\s*```json\s*").unwrap();

    /// Closing ``` marker at the very end, with surrounding whitespace
    static ref TRAILING_FENCE: Regex = Regex::new(r"\s*```\s*$").unwrap();
}

/// The response cannot be scored at all.
#[derive(Error, Debug)]
pub enum MalformedResponse {
    #[error("Response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Response parsed to {0}, expected an object")]
    NotAnObject(&'static str),
}

/// Remove a surrounding ```` ```json ... ``` ```` fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let start = LEADING_FENCE.find(text).map(|m| m.end()).unwrap_or(0);
    let body = &text[start..];
    let end = TRAILING_FENCE
        .find(body)
        .map(|m| m.start())
        .unwrap_or(body.len());
    &body[..end]
}

/// Turns raw model output into an [`Envelope`], or reports it malformed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, response: &Response) -> Result<Envelope, MalformedResponse> {
        match response {
            Response::Text(text) => self.parse_text(text),
            Response::Structured(value) => self.parse_value(value.clone()),
        }
    }

    /// Parse model text, tolerating a ```` ```json ```` fence.
    pub fn parse_text(&self, text: &str) -> Result<Envelope, MalformedResponse> {
        let value: Value = serde_json::from_str(strip_code_fence(text))?;
        self.parse_value(value)
    }

    /// Accept an already-decoded value if it is an object.
    pub fn parse_value(&self, value: Value) -> Result<Envelope, MalformedResponse> {
        match value {
            Value::Object(map) => Ok(Envelope::from_map(map)),
            other => Err(MalformedResponse::NotAnObject(kind_name(&other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_fenced_json() {
        let text = "```json\n{\"decision\": \"APPROVED\"}\n```";
        assert_eq!(strip_code_fence(text), "{\"decision\": \"APPROVED\"}");
    }

    #[test]
    fn test_strip_tolerates_whitespace() {
        let text = "  \n```json   {\"a\": 1}  ```  \n";
        assert_eq!(strip_code_fence(text), "{\"a\": 1}");
    }

    #[test]
    fn test_unfenced_text_untouched() {
        let text = "{\"a\": 1}";
        assert_eq!(strip_code_fence(text), text);
    }

    #[test]
    fn test_parse_fenced_envelope() {
        let parser = ResponseParser::new();
        let envelope = parser
            .parse_text("```json\n{\"trajectory_id\": \"abc\", \"decision\": \"DENIED\"}\n```")
            .unwrap();

        assert_eq!(envelope.trajectory_id(), Some("abc"));
        assert!(envelope.decision().unwrap().is_denied());
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let parser = ResponseParser::new();
        let result = parser.parse_text("The loan should be approved.");
        assert!(matches!(result, Err(MalformedResponse::InvalidJson(_))));
    }

    #[test]
    fn test_non_object_is_malformed() {
        let parser = ResponseParser::new();

        let result = parser.parse_text("[1, 2, 3]");
        assert!(matches!(result, Err(MalformedResponse::NotAnObject("an array"))));

        let result = parser.parse(&Response::Structured(json!("APPROVED")));
        assert!(matches!(result, Err(MalformedResponse::NotAnObject("a string"))));
    }

    #[test]
    fn test_structured_object_accepted() {
        let parser = ResponseParser::new();
        let envelope = parser
            .parse(&Response::Structured(json!({"decision": "APPROVED"})))
            .unwrap();
        assert!(envelope.decision().unwrap().is_approved());
    }
}
