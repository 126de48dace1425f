use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use tracing::{debug, instrument};

use super::{
    dto::{PublicUser, SearchQuery},
    repo,
};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    response::ApiResponse,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/search", get(search_users))
        .route("/users/by-email/:email", get(get_user_by_email))
}

#[instrument(skip(state, user))]
pub async fn search_users(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Query(q), _): WithRejection<Query<SearchQuery>, AppError>,
) -> AppResult<Json<ApiResponse<Vec<PublicUser>>>> {
    let term = q.term()?;
    let users = repo::search(&state.db, user.id, term).await?;
    debug!(user_id = %user.id, hits = users.len(), "user search");
    Ok(Json(ApiResponse::ok(users)))
}

#[instrument(skip(state, _user))]
pub async fn get_user_by_email(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    WithRejection(Path(email), _): WithRejection<Path<String>, AppError>,
) -> AppResult<Json<ApiResponse<PublicUser>>> {
    let user = repo::find_active_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(ApiResponse::ok(user)))
}
