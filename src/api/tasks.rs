use super::error::ApiResult;
use super::extract::ApiJson;
use super::{ApiState, TaskView};
use crate::error::PrepError;
use crate::model::{NewTask, TaskPatch, UserId};
use crate::time::Stamp;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

/// Body of the readiness endpoints.
#[derive(Debug, Deserialize)]
pub(super) struct Responder {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub(super) struct RangeQuery {
    from: Option<String>,
    to: Option<String>,
}

fn parse_bound(raw: Option<&str>, name: &str) -> crate::Result<Stamp> {
    let raw = raw
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| PrepError::Validation(format!("'{name}' is required")))?;
    Stamp::parse(raw).map_err(|e| PrepError::Validation(format!("'{name}': {e}")))
}

pub(super) async fn list(State(state): State<ApiState>) -> ApiResult<Json<Vec<TaskView>>> {
    let views: Vec<TaskView> = state.store.with(|store| {
        let now = store.now();
        Ok(store
            .active_tasks()
            .into_iter()
            .map(|t| TaskView::new(t, &now))
            .collect())
    })?;
    Ok(Json(views))
}

pub(super) async fn create(
    State(state): State<ApiState>,
    ApiJson(body): ApiJson<NewTask>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let view = state.store.with(|store| {
        let task = store.create_task(body)?;
        Ok(TaskView::new(task, &store.now()))
    })?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub(super) async fn search(
    State(state): State<ApiState>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let from = parse_bound(range.from.as_deref(), "from")?;
    let to = parse_bound(range.to.as_deref(), "to")?;
    let views: Vec<TaskView> = state.store.with(|store| {
        let tz = store.timezone();
        let now = store.now();
        Ok(store
            .tasks_in_range(&from.resolve(tz), &to.resolve(tz))?
            .into_iter()
            .map(|t| TaskView::new(t, &now))
            .collect())
    })?;
    Ok(Json(views))
}

pub(super) async fn list_deleted(State(state): State<ApiState>) -> ApiResult<Json<Vec<TaskView>>> {
    let views: Vec<TaskView> = state.store.with(|store| {
        let now = store.now();
        Ok(store
            .deleted_tasks()
            .into_iter()
            .map(|t| TaskView::new(t, &now))
            .collect())
    })?;
    Ok(Json(views))
}

pub(super) async fn list_completed(
    State(state): State<ApiState>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let views: Vec<TaskView> = state.store.with(|store| {
        let now = store.now();
        Ok(store
            .completed_tasks()
            .iter()
            .cloned()
            .map(|t| TaskView::new(t, &now))
            .collect())
    })?;
    Ok(Json(views))
}

pub(super) async fn get_one(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskView>> {
    let view = state.store.with(|store| {
        let task = store
            .task(&id)
            .cloned()
            .ok_or_else(|| PrepError::task_not_found(&id))?;
        Ok(TaskView::new(task, &store.now()))
    })?;
    Ok(Json(view))
}

pub(super) async fn update(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> ApiResult<Json<TaskView>> {
    let view = state.store.with(|store| {
        let task = store.update_task(&id, patch)?;
        Ok(TaskView::new(task, &store.now()))
    })?;
    Ok(Json(view))
}

pub(super) async fn delete(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskView>> {
    let view = state.store.with(|store| {
        let task = store.delete_task(&id)?;
        Ok(TaskView::new(task, &store.now()))
    })?;
    Ok(Json(view))
}

pub(super) async fn complete(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskView>> {
    let view = state.store.with(|store| {
        let task = store.complete_task(&id)?;
        Ok(TaskView::new(task, &store.now()))
    })?;
    Ok(Json(view))
}

pub(super) async fn restore(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskView>> {
    let view = state.store.with(|store| {
        let task = store.restore_task(&id)?;
        Ok(TaskView::new(task, &store.now()))
    })?;
    Ok(Json(view))
}

pub(super) async fn restore_completed(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskView>> {
    let view = state.store.with(|store| {
        let task = store.restore_completed_task(&id)?;
        Ok(TaskView::new(task, &store.now()))
    })?;
    Ok(Json(view))
}

pub(super) async fn ready(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Responder>,
) -> ApiResult<Json<TaskView>> {
    let view = state.store.with(|store| {
        let task = store.mark_ready(&id, body.user_id)?;
        Ok(TaskView::new(task, &store.now()))
    })?;
    Ok(Json(view))
}

pub(super) async fn not_going(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Responder>,
) -> ApiResult<Json<TaskView>> {
    let view = state.store.with(|store| {
        let task = store.mark_not_going(&id, body.user_id)?;
        Ok(TaskView::new(task, &store.now()))
    })?;
    Ok(Json(view))
}
