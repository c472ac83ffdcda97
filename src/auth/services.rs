use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, SignUpRequest, TokenResponse},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    config::PasswordCheck,
    error::AppError,
    state::AppState,
    users::repo_types::{NewUser, UserRecord},
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

/// Body checks shared by signup and create-user.
pub(crate) fn validate_new_user(name: &str, email: &str, password: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("name should not be empty".into()));
    }
    if !is_valid_email(email) {
        return Err(AppError::Validation("email must be an email".into()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("password should not be empty".into()));
    }
    Ok(())
}

/// bcrypt is CPU bound, so it runs off the async workers.
pub(crate) async fn hash_off_thread(plain: String, cost: u32) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&plain, cost))
        .await
        .map_err(anyhow::Error::from)??;
    Ok(hash)
}

/// Compares a submitted login password with the stored value.
pub fn passwords_match(check: PasswordCheck, submitted: &str, stored: &str) -> bool {
    match check {
        PasswordCheck::Literal => submitted == stored,
        PasswordCheck::Hashed => verify_password(submitted, stored),
    }
}

fn issue_token(keys: &JwtKeys, user: &UserRecord) -> Result<TokenResponse, AppError> {
    let token = keys.sign(user.id)?;
    Ok(TokenResponse { token })
}

/// Registers a user with a hashed password and returns a token for them.
pub async fn sign_up(state: &AppState, payload: SignUpRequest) -> Result<TokenResponse, AppError> {
    validate_new_user(&payload.name, &payload.email, &payload.password)?;

    if UserRecord::find_by_email(&state.store, &payload.email)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("Email already exists".into()));
    }

    let password = hash_off_thread(payload.password, state.config.bcrypt_cost).await?;
    let user = UserRecord::insert(
        &state.store,
        NewUser {
            name: payload.name,
            email: payload.email,
            password,
        },
    )
    .await?;

    info!(user_id = user.id, email = %user.email, "user signed up");
    issue_token(&state.keys, &user)
}

/// Looks the user up by email and compares passwords per the configured mode.
pub async fn log_in(state: &AppState, payload: LoginRequest) -> Result<TokenResponse, AppError> {
    if !is_valid_email(&payload.email) {
        return Err(AppError::Validation("email must be an email".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("password should not be empty".into()));
    }

    let Some(user) = UserRecord::find_by_email(&state.store, &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    let check = state.config.password_check;
    let stored = user.password.clone();
    let matched = tokio::task::spawn_blocking(move || {
        passwords_match(check, &payload.password, &stored)
    })
    .await
    .map_err(anyhow::Error::from)?;

    if !matched {
        warn!(user_id = user.id, "login password mismatch");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    info!(user_id = user.id, "user logged in");
    issue_token(&state.keys, &user)
}
