use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateCategoryRequest, UpdateCategoryRequest},
    repo,
    repo_types::{Category, CategoryStat},
};
use crate::{
    auth::AuthUser,
    db::is_unique_violation,
    error::{AppError, AppResult},
    response::ApiResponse,
    state::AppState,
    validation::ValidatedJson,
};

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/stats", get(category_stats))
        .route(
            "/categories/:id",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}

fn duplicate_name() -> AppError {
    AppError::Conflict("Category with this name already exists".into())
}

fn not_found() -> AppError {
    AppError::NotFound("Category not found".into())
}

#[instrument(skip_all)]
pub async fn list_categories(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<ApiResponse<Vec<Category>>>> {
    let categories = repo::list_by_owner(&state.db, user.id).await?;
    Ok(Json(ApiResponse::ok(categories)))
}

#[instrument(skip(state, user))]
pub async fn get_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let category = repo::find_owned(&state.db, user.id, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(ApiResponse::ok(category)))
}

#[instrument(skip_all)]
pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateCategoryRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Category>>)> {
    if repo::name_taken(&state.db, user.id, &payload.name, None).await? {
        warn!(user_id = %user.id, name = %payload.name, "duplicate category name");
        return Err(duplicate_name());
    }

    let description = payload.description.unwrap_or_default();
    let category =
        match repo::insert(&state.db, user.id, &payload.name, &payload.color, &description).await {
            Ok(c) => c,
            Err(e) if is_unique_violation(&e) => return Err(duplicate_name()),
            Err(e) => return Err(e.into()),
        };

    info!(user_id = %user.id, category_id = %category.id, "category created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(category).with_message("Category created successfully")),
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    ValidatedJson(payload): ValidatedJson<UpdateCategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let mut category = repo::find_owned(&state.db, user.id, id)
        .await?
        .ok_or_else(not_found)?;

    if let Some(name) = payload.name.as_deref() {
        if name != category.name && repo::name_taken(&state.db, user.id, name, Some(id)).await? {
            return Err(duplicate_name());
        }
    }

    let old_name = category.name.clone();
    if let Some(name) = payload.name {
        category.name = name;
    }
    if let Some(color) = payload.color {
        category.color = color;
    }
    if let Some(description) = payload.description {
        category.description = description;
    }

    let updated = match repo::update(&state.db, &category).await {
        Ok(c) => c,
        Err(e) if is_unique_violation(&e) => return Err(duplicate_name()),
        Err(e) => return Err(e.into()),
    };

    if updated.name != old_name {
        info!(user_id = %user.id, category_id = %id, from = %old_name, to = %updated.name, "category renamed");
    }
    Ok(Json(
        ApiResponse::ok(updated).with_message("Category updated successfully"),
    ))
}

#[instrument(skip(state, user))]
pub async fn delete_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ApiResponse<()>>> {
    if !repo::delete(&state.db, user.id, id).await? {
        return Err(not_found());
    }
    info!(user_id = %user.id, category_id = %id, "category deleted");
    Ok(Json(ApiResponse::message("Category deleted successfully")))
}

#[instrument(skip_all)]
pub async fn category_stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<ApiResponse<Vec<CategoryStat>>>> {
    let stats = repo::stats_by_owner(&state.db, user.id)
        .await?
        .into_iter()
        .map(CategoryStat::from)
        .collect();
    Ok(Json(ApiResponse::ok(stats)))
}
