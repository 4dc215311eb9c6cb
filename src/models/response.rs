use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// One candidate answer as submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub question_id: i32,
    #[serde(default, deserialize_with = "answer_as_string")]
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Response {
    pub fn new(question_id: i32, answer: impl Into<String>) -> Self {
        Self {
            question_id,
            answer: answer.into(),
            category: None,
        }
    }
}

// Clients send scale answers as numbers as often as strings.
fn answer_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    Ok(match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s,
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        other => other.to_string(),
    })
}
