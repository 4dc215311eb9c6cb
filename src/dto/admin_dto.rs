use crate::models::question::QuestionType;
use crate::models::test::TestType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionPayload {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    pub question_type: QuestionType,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub order_index: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTestPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub test_type: TestType,
    pub description: Option<String>,
    pub instructions: Option<String>,
    #[validate(range(min = 1, max = 600, message = "Time limit must be between 1 and 600 minutes"))]
    pub time_limit_minutes: Option<i32>,
    pub is_active: Option<bool>,
    pub questions: Option<Vec<CreateQuestionPayload>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTestPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    #[validate(length(max = 200))]
    pub name: Option<String>,

    pub test_type: Option<TestType>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub instructions: Option<String>,

    #[validate(range(min = 1, max = 600, message = "Time limit must be between 1 and 600 minutes"))]
    pub time_limit_minutes: Option<i32>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateQuestionPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    #[validate(length(max = 2000))]
    pub question_text: Option<String>,
    pub question_type: Option<QuestionType>,
    pub options: Option<Vec<String>>,
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub correct_answer: Option<String>,
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub category: Option<String>,
    pub order_index: Option<i32>,
}

// Trims strings and turns empty ones into None so PATCH bodies can't blank a column.
fn trim_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ListTestsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub is_active: Option<bool>,
    pub test_type: Option<TestType>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ListAttemptsQuery {
    pub test_id: Option<Uuid>,
    pub candidate_email: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_payload_drops_blank_strings() {
        let payload: UpdateTestPayload = serde_json::from_value(json!({
            "name": "  ",
            "description": " Big five inventory ",
            "is_active": false
        }))
        .unwrap();

        assert!(payload.name.is_none());
        assert_eq!(payload.description.as_deref(), Some("Big five inventory"));
        assert_eq!(payload.is_active, Some(false));
    }

    #[test]
    fn create_payload_rejects_unknown_test_type() {
        let parsed = serde_json::from_value::<CreateTestPayload>(json!({
            "name": "Horoscope",
            "test_type": "astrology"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn create_payload_validates_time_limit() {
        let payload: CreateTestPayload = serde_json::from_value(json!({
            "name": "Reasoning",
            "test_type": "cognitive",
            "time_limit_minutes": 0
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }
}
