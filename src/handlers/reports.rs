use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::report::{
    FeedbackRequest, GenerateReportRequest, GenerationStatusResponse, Report, ReportListQuery,
    ReportListResponse, ReportPeriod,
};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 10;

pub async fn list_reports(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ReportListQuery>,
) -> AppResult<Json<ReportListResponse>> {
    let listing = state
        .reports
        .list_reports(
            auth_user.id,
            query.kind,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(Json(listing))
}

pub async fn latest_report(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Report>> {
    state
        .reports
        .get_latest(auth_user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No reports yet".into()))
}

pub async fn generation_status(State(state): State<AppState>) -> Json<GenerationStatusResponse> {
    let generator = state.pipeline.generator();
    Json(GenerationStatusResponse {
        ai_enabled: generator.is_generation_enabled(),
        model: generator.model().to_string(),
    })
}

/// Opening a report marks it viewed; the first view time is kept.
pub async fn get_report(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<Report>> {
    let report = state
        .reports
        .mark_viewed(auth_user.id, report_id, Utc::now())
        .await?;
    Ok(Json(report))
}

/// A request without a JSON body asks for the default period; a body that
/// does not parse is rejected.
pub async fn generate_report(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    body: Result<Json<GenerateReportRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Report>)> {
    let period = match body {
        Ok(Json(request)) => request.period,
        Err(JsonRejection::MissingJsonContentType(_)) => ReportPeriod::default(),
        Err(rejection) => return Err(AppError::Validation(rejection.body_text())),
    };

    let report = state
        .pipeline
        .generate_on_demand(auth_user.id, period, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(report_id): Path<Uuid>,
    Json(body): Json<FeedbackRequest>,
) -> AppResult<Json<Value>> {
    body.validate()?;

    state
        .reports
        .submit_feedback(auth_user.id, report_id, body.helpful, body.comment, Utc::now())
        .await?;
    Ok(Json(json!({ "message": "Feedback recorded" })))
}

pub async fn delete_report(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(report_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.reports.delete_report(auth_user.id, report_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
