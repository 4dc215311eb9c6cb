use crate::{
    dto::admin_dto::{
        CreateQuestionPayload, CreateTestPayload, ListAttemptsQuery, ListTestsQuery,
        UpdateQuestionPayload, UpdateTestPayload,
    },
    error::{Error, Result},
    models::test_attempt::AttemptStatus,
    services::{attempt_service::AttemptFilter, test_service::TestFilter},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

#[axum::debug_handler]
pub async fn create_test(
    State(state): State<AppState>,
    Json(payload): Json<CreateTestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let created = state.test_service.create_test(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_tests(
    State(state): State<AppState>,
    Query(query): Query<ListTestsQuery>,
) -> Result<impl IntoResponse> {
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let filter = TestFilter {
        is_active: query.is_active,
        test_type: query.test_type,
        search: query.search,
    };
    let result = state.test_service.list_tests(page, per_page, filter).await?;
    Ok(Json(result))
}

pub async fn get_test(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let test = state.test_service.get_test_by_id(test_id).await?;
    let questions = state.test_service.list_questions(test_id).await?;
    Ok(Json(json!({
        "test": test,
        "questions": questions,
    })))
}

#[axum::debug_handler]
pub async fn update_test(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
    Json(payload): Json<UpdateTestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let test = state.test_service.update_test(test_id, payload).await?;
    Ok(Json(test))
}

pub async fn delete_test(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.test_service.delete_test(test_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_questions(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.test_service.get_test_by_id(test_id).await?;
    let questions = state.test_service.list_questions(test_id).await?;
    Ok(Json(questions))
}

#[axum::debug_handler]
pub async fn add_question(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
    Json(payload): Json<CreateQuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let question = state.test_service.add_question(test_id, payload).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Path(question_id): Path<i32>,
    Json(payload): Json<UpdateQuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let question = state
        .test_service
        .update_question(question_id, payload)
        .await?;
    Ok(Json(question))
}

pub async fn delete_question(
    State(state): State<AppState>,
    Path(question_id): Path<i32>,
) -> Result<impl IntoResponse> {
    state.test_service.delete_question(question_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_attempts(
    State(state): State<AppState>,
    Query(q): Query<ListAttemptsQuery>,
) -> Result<impl IntoResponse> {
    if let Some(status) = q.status.as_deref() {
        status
            .parse::<AttemptStatus>()
            .map_err(Error::BadRequest)?;
    }
    let page = q.page.unwrap_or(1).max(1);
    let limit = q.limit.unwrap_or(20).clamp(1, 100);
    let filter = AttemptFilter {
        test_id: q.test_id,
        candidate_email: q.candidate_email,
        status: q.status,
    };
    let (items, total) = state.attempt_service.list_attempts(filter, page, limit).await?;
    let total_pages = ((total as f64) / (limit as f64)).ceil() as i64;
    Ok(Json(json!({
        "items": items,
        "total": total,
        "page": page,
        "limit": limit,
        "total_pages": total_pages,
    })))
}

pub async fn get_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let attempt = state.attempt_service.get_attempt_by_id(attempt_id).await?;
    Ok(Json(attempt))
}

pub async fn rescore_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let attempt = state.attempt_service.rescore_attempt(attempt_id).await?;
    Ok(Json(attempt))
}

pub async fn attempt_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let by_status = state.attempt_service.status_distribution().await?;
    let total: i64 = by_status.values().sum();
    Ok(Json(json!({
        "total": total,
        "by_status": by_status,
    })))
}

pub async fn get_onboarding_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let item = state
        .onboarding_service
        .get_item(item_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Onboarding item {} not found", item_id)))?;
    Ok(Json(item))
}

pub async fn recommendation_rules(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scoring_service.rules().clone())
}
