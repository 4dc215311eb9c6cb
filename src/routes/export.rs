use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::services::export_service::ExportService;
use crate::{error::Result, AppState};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Results of every attempt at one test as an XLSX workbook.
pub async fn export_test_attempts(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let test = state.test_service.get_test_by_id(test_id).await?;
    let attempts = state.attempt_service.attempts_for_test(test_id).await?;

    let buffer = ExportService::generate_attempts_xlsx(&test, &attempts)?;
    let slug: String = test
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let disposition = format!(
        "attachment; filename=\"{}_{}.xlsx\"",
        slug,
        chrono::Utc::now().format("%Y%m%d")
    );
    tracing::info!(test_id = %test_id, attempts = attempts.len(), "attempts exported");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}
