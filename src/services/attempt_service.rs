use crate::dto::public_dto::{StartAttemptRequest, SubmitAttemptRequest};
use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::models::response::Response;
use crate::models::test::Test;
use crate::models::test_attempt::{AttemptStatus, TestAttempt};
use crate::services::onboarding_service::OnboardingService;
use crate::services::scoring_service::{ScoreOutcome, ScoringService};
use crate::services::test_service::TestService;
use crate::utils::pagination::page_offset;
use crate::utils::time::elapsed_seconds;
use crate::utils::token::generate_access_token;
use chrono::Utc;
use std::collections::HashMap;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default)]
pub struct AttemptFilter {
    pub test_id: Option<Uuid>,
    pub candidate_email: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
    tests: TestService,
    scoring: ScoringService,
    onboarding: OnboardingService,
}

impl AttemptService {
    pub fn new(
        pool: PgPool,
        tests: TestService,
        scoring: ScoringService,
        onboarding: OnboardingService,
    ) -> Self {
        Self {
            pool,
            tests,
            scoring,
            onboarding,
        }
    }

    /// Opens an `in_progress` attempt for an active test.
    pub async fn start_attempt(
        &self,
        test_id: Uuid,
        req: StartAttemptRequest,
    ) -> Result<(TestAttempt, Test, Vec<Question>)> {
        req.validate()?;
        let test = self.tests.get_test_by_id(test_id).await?;
        if !test.is_active {
            return Err(Error::BadRequest("This test is not currently available".to_string()));
        }
        let questions = self.tests.list_questions(test_id).await?;

        let attempt = sqlx::query_as::<_, TestAttempt>(
            r#"
            INSERT INTO test_attempts (test_id, candidate_name, candidate_email, access_token, status, started_at)
            VALUES ($1, $2, $3, $4, 'in_progress', NOW())
            RETURNING *
            "#,
        )
        .bind(test.id)
        .bind(req.candidate_name.trim())
        .bind(req.candidate_email.trim().to_lowercase())
        .bind(generate_access_token())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(attempt_id = %attempt.id, test_id = %test.id, "attempt started");
        Ok((attempt, test, questions))
    }

    pub async fn get_attempt_by_token(&self, token: &str) -> Result<TestAttempt> {
        sqlx::query_as::<_, TestAttempt>("SELECT * FROM test_attempts WHERE access_token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Attempt not found".to_string()))
    }

    pub async fn get_attempt_by_id(&self, attempt_id: Uuid) -> Result<TestAttempt> {
        sqlx::query_as::<_, TestAttempt>("SELECT * FROM test_attempts WHERE id = $1")
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Attempt {} not found", attempt_id)))
    }

    /// Records the candidate's final responses and scores them.
    ///
    /// Only `in_progress` attempts accept a submission. A submission with status
    /// `abandoned` stores the responses without scoring.
    pub async fn submit_attempt(&self, token: &str, req: SubmitAttemptRequest) -> Result<TestAttempt> {
        req.validate()?;
        let attempt = self.get_attempt_by_token(token).await?;
        if !attempt.is_in_progress() {
            return Err(Error::Conflict(format!(
                "Attempt is already {}",
                attempt.status
            )));
        }

        let status = req.status.unwrap_or(AttemptStatus::Completed);
        if status == AttemptStatus::InProgress {
            return Err(Error::BadRequest(
                "status must be completed or abandoned".to_string(),
            ));
        }

        let completed_at = req.completed_at.unwrap_or_else(Utc::now);
        let time_spent = req
            .time_spent_seconds
            .unwrap_or_else(|| elapsed_seconds(attempt.started_at, completed_at));
        let responses_json = serde_json::to_value(&req.responses)?;

        let outcome = match status {
            AttemptStatus::Completed => self.score(&attempt, &req.responses).await?,
            _ => None,
        };

        let updated = sqlx::query_as::<_, TestAttempt>(
            r#"
            UPDATE test_attempts
            SET status = $2,
                responses = $3,
                completed_at = $4,
                time_spent_seconds = $5,
                total_score = $6,
                percentage_score = $7,
                results = $8,
                scoring_diagnostics = $9,
                onboarding_item_id = $10,
                updated_at = NOW()
            WHERE id = $1 AND status = 'in_progress'
            RETURNING *
            "#,
        )
        .bind(attempt.id)
        .bind(status.as_str())
        .bind(responses_json)
        .bind(completed_at)
        .bind(time_spent)
        .bind(outcome.as_ref().map(|o| o.total_score))
        .bind(outcome.as_ref().map(|o| o.percentage_score))
        .bind(outcome.as_ref().map(|o| serde_json::to_value(&o.results)).transpose()?)
        .bind(outcome.as_ref().map(|o| serde_json::to_value(&o.diagnostics)).transpose()?)
        .bind(req.onboarding_item_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::Conflict("Attempt was submitted concurrently".to_string()))?;

        tracing::info!(
            attempt_id = %updated.id,
            status = %updated.status,
            total_score = ?updated.total_score,
            percentage_score = ?updated.percentage_score,
            "attempt submitted"
        );

        if status == AttemptStatus::Completed {
            if let Some(item_id) = req.onboarding_item_id {
                self.link_onboarding(item_id, updated.id).await;
            }
        }

        Ok(updated)
    }

    pub async fn abandon_attempt(&self, token: &str) -> Result<TestAttempt> {
        let updated = sqlx::query_as::<_, TestAttempt>(
            r#"
            UPDATE test_attempts
            SET status = 'abandoned',
                completed_at = NOW(),
                time_spent_seconds = GREATEST(0, ROUND(EXTRACT(EPOCH FROM (NOW() - started_at))))::integer,
                updated_at = NOW()
            WHERE access_token = $1 AND status = 'in_progress'
            RETURNING *
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(attempt) => {
                tracing::info!(attempt_id = %attempt.id, "attempt abandoned");
                Ok(attempt)
            }
            None => {
                let existing = self.get_attempt_by_token(token).await?;
                Err(Error::Conflict(format!("Attempt is already {}", existing.status)))
            }
        }
    }

    /// Marks attempts that outlived their test's time limit plus `grace_minutes`
    /// as abandoned. Tests without a time limit are never swept.
    pub async fn abandon_expired(&self, grace_minutes: i32) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE test_attempts ta
            SET status = 'abandoned',
                completed_at = $1,
                updated_at = $1
            FROM tests t
            WHERE ta.test_id = t.id
              AND ta.status = 'in_progress'
              AND t.time_limit_minutes IS NOT NULL
              AND ta.started_at + make_interval(mins => t.time_limit_minutes + $2) < $1
            "#,
        )
        .bind(Utc::now())
        .bind(grace_minutes)
        .execute(&self.pool)
        .await?;

        let swept = result.rows_affected();
        if swept > 0 {
            tracing::info!(swept, "expired attempts marked abandoned");
        }
        Ok(swept)
    }

    /// Re-scores a completed attempt against the test's current question bank.
    pub async fn rescore_attempt(&self, attempt_id: Uuid) -> Result<TestAttempt> {
        let attempt = self.get_attempt_by_id(attempt_id).await?;
        if attempt.status != AttemptStatus::Completed.as_str() {
            return Err(Error::Conflict(format!(
                "Only completed attempts can be rescored (status is {})",
                attempt.status
            )));
        }

        let responses: Vec<Response> = match attempt.responses.clone() {
            Some(raw) => serde_json::from_value(raw).map_err(|e| {
                Error::Internal(format!("Stored responses of attempt {} are unreadable: {}", attempt_id, e))
            })?,
            None => Vec::new(),
        };
        let outcome = self.score(&attempt, &responses).await?;

        let updated = sqlx::query_as::<_, TestAttempt>(
            r#"
            UPDATE test_attempts
            SET total_score = $2,
                percentage_score = $3,
                results = $4,
                scoring_diagnostics = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(attempt.id)
        .bind(outcome.as_ref().map(|o| o.total_score))
        .bind(outcome.as_ref().map(|o| o.percentage_score))
        .bind(outcome.as_ref().map(|o| serde_json::to_value(&o.results)).transpose()?)
        .bind(outcome.as_ref().map(|o| serde_json::to_value(&o.diagnostics)).transpose()?)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(attempt_id = %updated.id, total_score = ?updated.total_score, "attempt rescored");
        Ok(updated)
    }

    pub async fn list_attempts(
        &self,
        filter: AttemptFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<TestAttempt>, i64)> {
        let offset = page_offset(page, limit)?;
        let email = filter.candidate_email.map(|e| e.trim().to_lowercase());

        let rows = sqlx::query_as::<_, TestAttempt>(
            r#"
            SELECT * FROM test_attempts
            WHERE ($1::uuid IS NULL OR test_id = $1)
              AND ($2::text IS NULL OR candidate_email = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.test_id)
        .bind(email.clone())
        .bind(filter.status.clone())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM test_attempts
            WHERE ($1::uuid IS NULL OR test_id = $1)
              AND ($2::text IS NULL OR candidate_email = $2)
              AND ($3::text IS NULL OR status = $3)
            "#,
        )
        .bind(filter.test_id)
        .bind(email)
        .bind(filter.status)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Every attempt of a test, most recently completed first.
    pub async fn attempts_for_test(&self, test_id: Uuid) -> Result<Vec<TestAttempt>> {
        let rows = sqlx::query_as::<_, TestAttempt>(
            r#"
            SELECT * FROM test_attempts
            WHERE test_id = $1
            ORDER BY completed_at DESC NULLS LAST, created_at DESC
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn status_distribution(&self) -> Result<HashMap<String, i64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM test_attempts GROUP BY status")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    async fn score(&self, attempt: &TestAttempt, responses: &[Response]) -> Result<Option<ScoreOutcome>> {
        let test = self.tests.find_test(attempt.test_id).await?;
        let questions = match &test {
            Some(t) => self.tests.list_questions(t.id).await?,
            None => Vec::new(),
        };

        let outcome = self.scoring.score(responses, test.as_ref(), &questions);
        match &outcome {
            Some(o) => {
                if o.diagnostics.has_unmatched() {
                    tracing::warn!(
                        attempt_id = %attempt.id,
                        test_id = %attempt.test_id,
                        unmatched = ?o.diagnostics.unmatched_question_ids,
                        matched = o.diagnostics.matched_responses,
                        "responses reference unknown questions"
                    );
                }
                if o.diagnostics.has_duplicates() {
                    tracing::warn!(
                        attempt_id = %attempt.id,
                        test_id = %attempt.test_id,
                        duplicates = ?o.diagnostics.duplicate_question_ids,
                        "questions answered more than once; first answer kept"
                    );
                }
            }
            None => tracing::warn!(
                attempt_id = %attempt.id,
                test_id = %attempt.test_id,
                "test or question bank missing; attempt left unscored"
            ),
        }
        Ok(outcome)
    }

    async fn link_onboarding(&self, item_id: Uuid, attempt_id: Uuid) {
        match self.onboarding.link_attempt(item_id, attempt_id).await {
            Ok(Some(_)) => {
                tracing::info!(%item_id, %attempt_id, "onboarding item completed")
            }
            Ok(None) => {
                tracing::warn!(%item_id, %attempt_id, "onboarding item not found")
            }
            Err(e) => {
                tracing::error!(error = ?e, %item_id, %attempt_id, "failed to link onboarding item")
            }
        }
    }
}
