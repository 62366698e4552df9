//! Employee and card endpoints.

use axum::{
    extract::{Path, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;

use super::{sanitize_filename, success, ApiResponse, ApiResult};
use crate::card::ImageInput;
use crate::errors::AppError;
use crate::models::{CreateEmployeeRequest, EmployeeRecord, NewEmployee};
use crate::roster::Uploads;
use crate::AppState;

/// Header carrying one non-fatal card warning.
pub const CARD_WARNING_HEADER: &str = "x-card-warning";

/// POST /api/employees - Enroll an employee and render their card.
pub async fn create_employee(
    State(state): State<AppState>,
    Json(request): Json<CreateEmployeeRequest>,
) -> ApiResult<EmployeeRecord> {
    let employee = NewEmployee::validate(&request).map_err(AppError::Validation)?;
    let uploads = Uploads {
        logo: decode_upload("logo", request.logo.as_deref())?,
        photo: decode_upload("photo", request.photo.as_deref())?,
    };

    // Decode and resize uploads before the roster lock is taken
    let compositor = state.compositor.clone();
    let (uploads, images) = tokio::task::spawn_blocking(move || {
        let images = compositor.prepare(
            uploads.logo.as_deref().map(ImageInput::Bytes),
            uploads.photo.as_deref().map(ImageInput::Bytes),
        );
        (uploads, images)
    })
    .await
    .map_err(join_error)?;

    let committed = state
        .roster
        .enroll(employee, uploads, |record, _| {
            let card = state.compositor.compose_prepared(record, &images)?;
            Ok(card.warnings)
        })
        .await?;

    let (record, card_warnings) = committed.value;
    let warnings = card_warnings
        .iter()
        .map(ToString::to_string)
        .chain(committed.persistence_warning);

    Ok(ApiResponse::new(record).with_warnings(warnings))
}

/// GET /api/employees/:id/card - Download the card as PNG.
pub async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let record = state
        .roster
        .find_by_id(&id)
        .await
        .ok_or_else(|| AppError::EmployeeNotFound(id.clone()))?;

    let logo = fetch_blob(&state, record.logo_ref.as_deref()).await;
    let photo = fetch_blob(&state, record.photo_ref.as_deref()).await;
    let filename = sanitize_filename(&format!("{}_{}_employee_card.png", record.id, record.name));

    let compositor = state.compositor.clone();
    let (warnings, png) = tokio::task::spawn_blocking(move || -> Result<_, AppError> {
        let card = compositor.compose(
            &record,
            logo.as_ref().map(StoredImage::input),
            photo.as_ref().map(StoredImage::input),
        )?;
        let png = card.to_png()?;
        Ok((card.warnings, png))
    })
    .await
    .map_err(join_error)??;

    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/png".to_string())],
        png,
    )
        .into_response();

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    for warning in &warnings {
        if let Ok(value) = HeaderValue::from_str(&warning.to_string()) {
            headers.append(HeaderName::from_static(CARD_WARNING_HEADER), value);
        }
    }

    Ok(response)
}

/// GET /api/admin/employees - List the roster in creation order.
pub async fn list_employees(State(state): State<AppState>) -> ApiResult<Vec<EmployeeRecord>> {
    success(state.roster.roster().await)
}

/// GET /api/admin/employees/:id - Get a single employee.
pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<EmployeeRecord> {
    match state.roster.find_by_id(&id).await {
        Some(record) => success(record),
        None => Err(AppError::EmployeeNotFound(id)),
    }
}

fn join_error(err: tokio::task::JoinError) -> AppError {
    tracing::error!("Card rendering task failed: {:?}", err);
    AppError::Internal(format!("Card rendering failed: {}", err))
}

/// An uploaded image looked up by its reference.
struct StoredImage {
    key: String,
    data: Option<Vec<u8>>,
}

impl StoredImage {
    fn input(&self) -> ImageInput<'_> {
        match &self.data {
            Some(data) => ImageInput::Bytes(data),
            None => ImageInput::Missing(&self.key),
        }
    }
}

async fn fetch_blob(state: &AppState, key: Option<&str>) -> Option<StoredImage> {
    let key = key?;
    let data = state.roster.blob(key).await.unwrap_or_else(|e| {
        tracing::warn!("Cannot read image {}: {}", key, e);
        None
    });

    Some(StoredImage {
        key: key.to_string(),
        data,
    })
}

/// Decode a base64 upload, accepting an optional `data:` URL prefix. Blank means absent.
fn decode_upload(field: &str, encoded: Option<&str>) -> Result<Option<Vec<u8>>, AppError> {
    let Some(encoded) = encoded.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let body = match encoded.split_once(',') {
        Some((prefix, body)) if prefix.starts_with("data:") => body,
        _ => encoded,
    };

    base64::engine::general_purpose::STANDARD
        .decode(body)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("Invalid base64 in {}: {}", field, e)))
}
