use super::error::ApiResult;
use super::extract::ApiJson;
use super::tasks::Responder;
use super::{ApiState, TaskView};
use crate::model::ChecklistItem;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct ItemText {
    #[serde(default)]
    text: String,
}

pub(super) async fn add(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ItemText>,
) -> ApiResult<(StatusCode, Json<ChecklistItem>)> {
    let item = state
        .store
        .with(|store| store.add_checklist_item(&id, &body.text))?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub(super) async fn edit(
    State(state): State<ApiState>,
    Path((id, item_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<ItemText>,
) -> ApiResult<Json<ChecklistItem>> {
    let item = state
        .store
        .with(|store| store.edit_checklist_item(&id, &item_id, &body.text))?;
    Ok(Json(item))
}

pub(super) async fn toggle(
    State(state): State<ApiState>,
    Path((id, item_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<Responder>,
) -> ApiResult<Json<ChecklistItem>> {
    let item = state
        .store
        .with(|store| store.toggle_checklist_item(&id, &item_id, body.user_id))?;
    Ok(Json(item))
}

pub(super) async fn remove(
    State(state): State<ApiState>,
    Path((id, item_id)): Path<(String, String)>,
) -> ApiResult<Json<TaskView>> {
    let view = state.store.with(|store| {
        let task = store.remove_checklist_item(&id, &item_id)?;
        Ok(TaskView::new(task, &store.now()))
    })?;
    Ok(Json(view))
}
