use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateTaskRequest, ReorderRequest, TaskListQuery, UpdateTaskRequest},
    export::to_csv,
    repo,
    repo_types::Task,
    services,
    stats::TaskStats,
};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    response::{ApiResponse, PageMeta},
    state::AppState,
    validation::ValidatedJson,
};

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/stats", get(task_stats))
        .route("/tasks/export", get(export_tasks))
        .route("/tasks/reorder", patch(reorder_task))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/:id/toggle", patch(toggle_task))
}

#[instrument(skip(state, user))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Query(q), _): WithRejection<Query<TaskListQuery>, AppError>,
) -> AppResult<Json<ApiResponse<Vec<Task>>>> {
    let filter = q.filter()?;
    let page = q.page();
    let (tasks, total) = repo::list_page(&state.db, user.id, &filter, q.sort(), page).await?;
    Ok(Json(
        ApiResponse::ok(tasks).with_pagination(PageMeta::new(page.page, page.limit, total)),
    ))
}

#[instrument(skip(state, user))]
pub async fn get_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ApiResponse<Task>>> {
    let task = repo::find_owned(&state.db, user.id, id)
        .await?
        .ok_or_else(services::task_not_found)?;
    Ok(Json(ApiResponse::ok(task)))
}

#[instrument(skip_all)]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateTaskRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Task>>)> {
    let draft = payload.into_draft()?;
    let task = services::create_task(&state.db, user.id, draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(task).with_message("Task created successfully")),
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    ValidatedJson(payload): ValidatedJson<UpdateTaskRequest>,
) -> AppResult<Json<ApiResponse<Task>>> {
    let patch = payload.into_patch()?;
    let task =
        services::update_task(&state.db, user.id, id, patch, OffsetDateTime::now_utc()).await?;
    Ok(Json(
        ApiResponse::ok(task).with_message("Task updated successfully"),
    ))
}

#[instrument(skip(state, user))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ApiResponse<()>>> {
    services::delete_task(&state.db, user.id, id).await?;
    Ok(Json(ApiResponse::message("Task deleted successfully")))
}

#[instrument(skip(state, user))]
pub async fn toggle_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ApiResponse<Task>>> {
    let task = services::toggle_task(&state.db, user.id, id, OffsetDateTime::now_utc()).await?;
    let message = if task.completed {
        "Task marked as completed"
    } else {
        "Task marked as pending"
    };
    Ok(Json(ApiResponse::ok(task).with_message(message)))
}

#[instrument(skip_all)]
pub async fn task_stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<ApiResponse<TaskStats>>> {
    let counts = repo::stats_counts(&state.db, user.id).await?;
    Ok(Json(ApiResponse::ok(TaskStats::from_counts(counts))))
}

#[instrument(skip(state, user))]
pub async fn export_tasks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Query(q), _): WithRejection<Query<TaskListQuery>, AppError>,
) -> AppResult<impl IntoResponse> {
    let filter = q.filter()?;
    let tasks = repo::list_all(&state.db, user.id, &filter, q.sort()).await?;
    info!(user_id = %user.id, rows = tasks.len(), "tasks exported");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"tasks.csv\""),
        ],
        to_csv(&tasks),
    ))
}

#[instrument(skip_all)]
pub async fn reorder_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(payload): ValidatedJson<ReorderRequest>,
) -> AppResult<Json<ApiResponse<Vec<Task>>>> {
    let tasks =
        services::reorder_task(&state.db, user.id, payload.task_id, payload.position).await?;
    Ok(Json(
        ApiResponse::ok(tasks).with_message("Task order updated successfully"),
    ))
}
