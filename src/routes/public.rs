use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::public_dto::{
    AttemptStatusResponse, PublicTestResponse, PublicTestSummary, StartAttemptRequest,
    StartAttemptResponse, SubmitAttemptRequest, SubmitAttemptResponse,
};
use crate::error::{Error, Result};
use crate::models::question::PublicQuestion;
use crate::services::test_service::TestFilter;
use crate::utils::time::remaining_seconds;
use crate::AppState;

const PUBLIC_LIST_LIMIT: i64 = 100;

pub async fn list_active_tests(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let page = state
        .test_service
        .list_tests(
            1,
            PUBLIC_LIST_LIMIT,
            TestFilter {
                is_active: Some(true),
                ..TestFilter::default()
            },
        )
        .await?;
    let items: Vec<PublicTestSummary> = page.tests.iter().map(PublicTestSummary::from).collect();
    Ok(Json(items))
}

#[axum::debug_handler]
pub async fn get_public_test(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let test = state.test_service.get_test_by_id(test_id).await?;
    if !test.is_active {
        return Err(Error::NotFound(format!("Test {} not found", test_id)));
    }
    let questions = state.test_service.list_questions(test_id).await?;
    Ok(Json(PublicTestResponse {
        test: PublicTestSummary::from(&test),
        questions: questions.iter().map(PublicQuestion::from).collect(),
    }))
}

#[axum::debug_handler]
pub async fn start_attempt(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
    Json(req): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse> {
    req.validate()?;
    let (attempt, test, questions) = state.attempt_service.start_attempt(test_id, req).await?;

    let response = StartAttemptResponse {
        attempt_id: attempt.id,
        access_token: attempt.access_token,
        status: attempt.status,
        started_at: attempt.started_at,
        test: PublicTestSummary::from(&test),
        questions: questions.iter().map(PublicQuestion::from).collect(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

#[axum::debug_handler]
pub async fn get_attempt_status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse> {
    let attempt = state.attempt_service.get_attempt_by_token(&token).await?;
    let time_limit = state
        .test_service
        .find_test(attempt.test_id)
        .await?
        .and_then(|t| t.time_limit_minutes);
    let time_remaining = if attempt.is_in_progress() {
        remaining_seconds(attempt.started_at, time_limit, Utc::now())
    } else {
        None
    };

    Ok(Json(AttemptStatusResponse {
        attempt_id: attempt.id,
        status: attempt.status,
        started_at: attempt.started_at,
        completed_at: attempt.completed_at,
        time_limit_minutes: time_limit,
        time_remaining_seconds: time_remaining,
    }))
}

#[axum::debug_handler]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse> {
    req.validate()?;
    let attempt = state.attempt_service.submit_attempt(&token, req).await?;
    Ok(Json(SubmitAttemptResponse::from(attempt)))
}

#[axum::debug_handler]
pub async fn abandon_attempt(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse> {
    let attempt = state.attempt_service.abandon_attempt(&token).await?;
    Ok(Json(SubmitAttemptResponse::from(attempt)))
}
