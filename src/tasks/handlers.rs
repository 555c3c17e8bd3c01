use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::CurrentUser,
    error::ApiError,
    state::AppState,
    tasks::{
        dto::{CreateTaskRequest, UpdateTaskRequest},
        repo::Task,
    },
    users::dto::Pagination,
};

#[instrument(skip(state, user, payload))]
pub async fn create_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Title is required".into()));
    }

    let task = Task::create(&state.db, user.id, title, payload.description.as_deref()).await?;
    info!(user_id = %user.id, task_id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

#[instrument(skip(state, user))]
pub async fn list_tasks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = Task::list_by_user(&state.db, user.id, p.limit, p.offset).await?;
    Ok(Json(tasks))
}

#[instrument(skip(state, user))]
pub async fn get_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = Task::find_by_id(&state.db, user.id, id)
        .await?
        .ok_or(ApiError::NotFound("Task"))?;
    Ok(Json(task))
}

#[instrument(skip(state, user, payload))]
pub async fn update_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let task = Task::update(
        &state.db,
        user.id,
        id,
        payload.title.as_deref(),
        payload.description.as_deref(),
        payload.completed,
    )
    .await?
    .ok_or(ApiError::NotFound("Task"))?;
    Ok(Json(task))
}

#[instrument(skip(state, user))]
pub async fn mark_complete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = Task::mark_complete(&state.db, user.id, id)
        .await?
        .ok_or(ApiError::NotFound("Task"))?;
    info!(user_id = %user.id, task_id = %task.id, "task completed");
    Ok(Json(task))
}

#[instrument(skip(state, user))]
pub async fn delete_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !Task::delete(&state.db, user.id, id).await? {
        return Err(ApiError::NotFound("Task"));
    }
    Ok(StatusCode::NO_CONTENT)
}
