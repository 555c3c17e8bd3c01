use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{extractors::CurrentUser, password},
    error::ApiError,
    state::AppState,
    users::{
        dto::{DeleteMeRequest, Pagination, PublicUser, UpdateMeRequest},
        repo::User,
    },
};

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(user))
}

#[instrument(skip(state, user, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    if payload.password.is_some() {
        return Err(ApiError::Validation(
            "This route is not for password updates. Please use /users/update-password".into(),
        ));
    }

    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::Validation("Nothing to update".into()))?;

    let updated = User::update_name(&state.db, user.id, name)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(PublicUser::from(updated)))
}

#[instrument(skip(state, user, payload))]
pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<DeleteMeRequest>,
) -> Result<StatusCode, ApiError> {
    let Some(confirm) = payload.password else {
        return Err(ApiError::Validation(
            "Please enter your password to confirm account deletion".into(),
        ));
    };

    let ok = password::verify_blocking(confirm, user.password_hash.clone()).await?;
    if !ok {
        warn!(user_id = %user.id, "account deletion with wrong password");
        return Err(ApiError::IncorrectPassword);
    }

    User::deactivate(&state.db, user.id).await?;
    info!(user_id = %user.id, "account deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = User::list(&state.db, p.limit, p.offset).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !User::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("User"));
    }
    info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
