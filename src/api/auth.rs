use super::helper;
use crate::Settings;
use crate::auth::{bearer_token, verify_password};
use crate::errors::AppError;
use crate::model::principal::{LoginResponse, NewSession, Principal, Role};
use crate::payloads::auth::{AuthPayload, LoginPayload};
use crate::response::ApiResponse;
use crate::schema::sessions;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use deadpool_diesel::postgres::Pool;
use diesel::dsl::now;
use diesel::prelude::*;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Dispatches `POST /auth` by its `action`.
#[instrument(skip(pool, settings, headers, payload))]
pub async fn auth(
    State(pool): State<Pool>,
    State(settings): State<Arc<Settings>>,
    headers: HeaderMap,
    Json(payload): Json<AuthPayload>,
) -> Result<Response, AppError> {
    match payload {
        AuthPayload::Login(login) => Ok(login_user(&pool, &settings, login).await?.into_response()),
        AuthPayload::Logout => Ok(logout_user(&pool, &headers).await?.into_response()),
    }
}

/// Authenticates a user of the given type and opens a session.
///
/// Returns (wrapped in `ApiResponse`)
/// * `LoginResponse`: the principal (without password), bearer token and expiry (200 OK).
/// * `400 Bad Request`: If `userType` is not one of student, coordinator, hod, admin.
/// * `401 Unauthorized`: If the password does not match.
/// * `404 Not Found`: If no user with that identifier exists.
/// * `500 Internal Server Error`: If a database or hashing error occurs.
async fn login_user(
    pool: &Pool,
    settings: &Settings,
    login: LoginPayload,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    let role = login
        .user_type
        .trim()
        .parse::<Role>()
        .map_err(|_| AppError::BadRequest("Invalid user type".to_string()))?;
    let username = login.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::BadRequest(
            "Missing required field 'username'".to_string(),
        ));
    }
    info!("Login attempt for {} {}", role, username);

    let found = helper::run_query(pool, {
        let username = username.clone();
        move |conn| Principal::find_with_hash(conn, role, &username)
    })
    .await?;

    let Some((principal, password_hash)) = found else {
        warn!("Login failed: {} {} does not exist", role, username);
        return Err(AppError::NotFound("User not found".to_string()));
    };

    if !verify_password(login.password.expose().to_string(), password_hash).await? {
        warn!("Login failed: wrong password for {} {}", role, username);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let new_session = NewSession {
        token: Uuid::new_v4(),
        role: role.as_str().to_string(),
        principal_id: principal.key(),
        expires_at: Utc::now() + settings.session_ttl,
    };
    let token = new_session.token;
    let expires_at = new_session.expires_at;

    let purged = helper::run_query(pool, move |conn| {
        conn.transaction(|tx| {
            let purged = diesel::delete(sessions::table.filter(sessions::expires_at.le(now)))
                .execute(tx)?;
            diesel::insert_into(sessions::table)
                .values(&new_session)
                .execute(tx)?;
            Ok(purged)
        })
    })
    .await?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }

    info!("{} {} logged in", role, principal.key());
    Ok(ApiResponse::ok(LoginResponse {
        user: principal,
        token,
        expires_at,
    })
    .with_message("Login successful"))
}

/// Ends the session named by the bearer token.
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true once the session is gone (200 OK).
/// * `401 Unauthorized`: If no token, a malformed token or an unknown token is presented.
/// * `500 Internal Server Error`: If a database error occurs.
async fn logout_user(pool: &Pool, headers: &HeaderMap) -> Result<ApiResponse<bool>, AppError> {
    let token = bearer_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))??;

    let deleted = helper::run_query(pool, move |conn| {
        diesel::delete(sessions::table.find(token)).execute(conn)
    })
    .await?;

    if deleted == 0 {
        warn!("Logout with unknown session token");
        return Err(AppError::Unauthorized(
            "Session is invalid or has expired".to_string(),
        ));
    }

    info!("Session closed");
    Ok(ApiResponse::ok(true).with_message("Logged out successfully"))
}
