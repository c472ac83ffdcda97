use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        extractors::AuthUser,
        services::{hash_off_thread, validate_new_user},
    },
    config::PasswordCheck,
    error::AppError,
    extract::{AppJson, AppPath},
    state::AppState,
    users::{
        dto::CreateUserRequest,
        repo_types::{NewUser, UserRecord},
    },
};

const USER_NOT_FOUND: &str = "Could not find the user";

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user).delete(delete_user))
}

#[instrument(skip(state, _caller))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<Vec<UserRecord>>, AppError> {
    Ok(Json(UserRecord::list(&state.store).await?))
}

#[instrument(skip(state, _caller))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    AppPath(id): AppPath<u64>,
) -> Result<Json<UserRecord>, AppError> {
    UserRecord::find_by_id(&state.store, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.into()))
}

/// Stores the password as submitted unless hashed login checks are enabled.
#[instrument(skip(state, caller, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserRecord>), AppError> {
    validate_new_user(&payload.name, &payload.email, &payload.password)?;

    let password = match state.config.password_check {
        PasswordCheck::Literal => payload.password,
        PasswordCheck::Hashed => hash_off_thread(payload.password, state.config.bcrypt_cost).await?,
    };
    let user = UserRecord::insert(
        &state.store,
        NewUser {
            name: payload.name,
            email: payload.email,
            password,
        },
    )
    .await?;

    info!(user_id = user.id, caller_id = caller.id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, _caller))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    AppPath(id): AppPath<u64>,
) -> Result<Json<UserRecord>, AppError> {
    UserRecord::delete_by_id(&state.store, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.into()))
}
