use super::error::ApiResult;
use super::{ApiState, TaskView};
use crate::error::PrepError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use bytes::Bytes;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct UploadQuery {
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RemoveQuery {
    reference: Option<String>,
}

/// Raw request body is the image; its name comes from `?filename=`.
pub(super) async fn upload(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let filename = query
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| PrepError::Validation("'filename' is required".to_owned()))?;
    if body.is_empty() {
        return Err(PrepError::Validation("no file uploaded".to_owned()).into());
    }

    let view = state.store.with(|store| {
        let task = store.attach_photo(&id, &filename, &body)?;
        Ok(TaskView::new(task, &store.now()))
    })?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub(super) async fn remove(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(query): Query<RemoveQuery>,
) -> ApiResult<Json<TaskView>> {
    let reference = query
        .reference
        .ok_or_else(|| PrepError::Validation("'reference' is required".to_owned()))?;
    let view = state.store.with(|store| {
        let task = store.detach_photo(&id, &reference)?;
        Ok(TaskView::new(task, &store.now()))
    })?;
    Ok(Json(view))
}
