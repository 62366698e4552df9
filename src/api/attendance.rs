//! Attendance endpoints.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::{success, ApiResponse, ApiResult};
use crate::errors::AppError;
use crate::models::{AttendanceEvent, RecordAttendanceRequest};
use crate::roster::attendance::export_csv;
use crate::AppState;

/// GET /api/admin/attendance - List attendance events in creation order.
pub async fn list_attendance(State(state): State<AppState>) -> ApiResult<Vec<AttendanceEvent>> {
    success(state.roster.attendance().await)
}

/// POST /api/admin/attendance - Mark attendance by employee ID.
pub async fn record_attendance(
    State(state): State<AppState>,
    Json(request): Json<RecordAttendanceRequest>,
) -> ApiResult<AttendanceEvent> {
    let employee_id = request.employee_id.trim();
    if employee_id.is_empty() {
        return Err(AppError::Validation("Employee ID is required".to_string()));
    }

    let committed = state.roster.record_attendance(employee_id).await?;
    Ok(ApiResponse::new(committed.value).with_warnings(committed.persistence_warning))
}

/// GET /api/admin/attendance/export - Download the attendance log as CSV.
pub async fn export_attendance(State(state): State<AppState>) -> Result<Response, AppError> {
    let csv = export_csv(&state.roster.attendance().await)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"attendance_records.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}
