use crate::models::question::PublicQuestion;
use crate::models::response::Response;
use crate::models::test::Test;
use crate::models::test_attempt::{AttemptStatus, TestAttempt};
use crate::services::scoring_service::AttemptResults;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicTestSummary {
    pub id: Uuid,
    pub name: String,
    pub test_type: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub time_limit_minutes: Option<i32>,
    pub total_questions: i32,
}

impl From<&Test> for PublicTestSummary {
    fn from(test: &Test) -> Self {
        Self {
            id: test.id,
            name: test.name.clone(),
            test_type: test.test_type.clone(),
            description: test.description.clone(),
            instructions: test.instructions.clone(),
            time_limit_minutes: test.time_limit_minutes,
            total_questions: test.total_questions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicTestResponse {
    pub test: PublicTestSummary,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartAttemptRequest {
    #[validate(length(min = 1, max = 200))]
    pub candidate_name: String,
    #[validate(email)]
    pub candidate_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAttemptResponse {
    pub attempt_id: Uuid,
    pub access_token: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub test: PublicTestSummary,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    #[validate(length(max = 500))]
    pub responses: Vec<Response>,
    pub completed_at: Option<DateTime<Utc>>,
    #[validate(range(min = 0))]
    pub time_spent_seconds: Option<i32>,
    /// `completed` (default) or `abandoned`.
    pub status: Option<AttemptStatus>,
    pub onboarding_item_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAttemptResponse {
    pub attempt_id: Uuid,
    pub status: String,
    pub total_score: Option<i32>,
    pub percentage_score: Option<i32>,
    pub results: Option<AttemptResults>,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_spent_seconds: Option<i32>,
}

impl From<TestAttempt> for SubmitAttemptResponse {
    fn from(attempt: TestAttempt) -> Self {
        Self {
            attempt_id: attempt.id,
            status: attempt.status,
            total_score: attempt.total_score,
            percentage_score: attempt.percentage_score,
            results: attempt.results.and_then(|raw| {
                serde_json::from_value(raw)
                    .map_err(|e| {
                        tracing::warn!(
                            attempt_id = %attempt.id,
                            error = %e,
                            "stored results of attempt are unreadable"
                        )
                    })
                    .ok()
            }),
            completed_at: attempt.completed_at,
            time_spent_seconds: attempt.time_spent_seconds,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptStatusResponse {
    pub attempt_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_limit_minutes: Option<i32>,
    pub time_remaining_seconds: Option<i64>,
}
