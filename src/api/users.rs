use super::ApiState;
use super::error::ApiResult;
use super::extract::ApiJson;
use crate::error::PrepError;
use crate::model::{NewUser, User, UserId, UserPatch};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;

pub(super) async fn create(
    State(state): State<ApiState>,
    ApiJson(body): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.store.with(|store| store.add_user(body))?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(super) async fn list(State(state): State<ApiState>) -> ApiResult<Json<Vec<User>>> {
    let users = state.store.with(|store| Ok(store.users()))?;
    Ok(Json(users))
}

pub(super) async fn get_one(
    State(state): State<ApiState>,
    Path(id): Path<UserId>,
) -> ApiResult<Json<User>> {
    let user = state.store.with(|store| {
        store
            .user(id)
            .cloned()
            .ok_or_else(|| PrepError::user_not_found(id))
    })?;
    Ok(Json(user))
}

pub(super) async fn update(
    State(state): State<ApiState>,
    Path(id): Path<UserId>,
    ApiJson(patch): ApiJson<UserPatch>,
) -> ApiResult<Json<User>> {
    let user = state.store.with(|store| store.update_user(id, patch))?;
    Ok(Json(user))
}
