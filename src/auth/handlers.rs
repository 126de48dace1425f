use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthData, LoginRequest, ProfileData, RegisterRequest, UpdateProfileRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::User,
    },
    db::is_unique_violation,
    error::{AppError, AppResult},
    response::ApiResponse,
    state::AppState,
    validation::ValidatedJson,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/auth/profile", get(get_profile).put(update_profile))
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthData>>)> {
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("User already exists".into()));
    }

    let hash = hash_password(&payload.password)?;

    let user = match User::create(&state.db, &payload.name, &payload.email, &hash).await {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, "email registered concurrently");
            return Err(AppError::Conflict("User already exists".into()));
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(e.into());
        }
    };

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(
            ApiResponse::ok(AuthData {
                id: user.id,
                name: user.name,
                email: user.email,
                token,
            })
            .with_message("User registered successfully"),
        ),
    ))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthData>>> {
    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) if u.is_active => u,
        Some(u) => {
            warn!(user_id = %u.id, "login to inactive account");
            return Err(invalid());
        }
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(invalid());
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    User::touch_last_login(&state.db, user.id).await?;
    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(
        ApiResponse::ok(AuthData {
            id: user.id,
            name: user.name,
            email: user.email,
            token,
        })
        .with_message("Login successful"),
    ))
}

#[instrument(skip_all)]
pub async fn get_profile(AuthUser(user): AuthUser) -> Json<ApiResponse<ProfileData>> {
    Json(ApiResponse::ok(ProfileData::from(&user)))
}

#[instrument(skip_all)]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(payload): ValidatedJson<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<ProfileData>>> {
    let name = payload.name.unwrap_or_else(|| user.name.clone());
    let email = payload.email.unwrap_or_else(|| user.email.clone());

    if email != user.email && User::email_taken_by_other(&state.db, &email, user.id).await? {
        return Err(AppError::Conflict("Email already in use".into()));
    }

    let updated = match User::update_profile(&state.db, user.id, &name, &email).await {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict("Email already in use".into()))
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(
        ApiResponse::ok(ProfileData::from(&updated)).with_message("Profile updated successfully"),
    ))
}
