//! Credential verification, session cookies, and the request extractors that
//! gate authenticated and admin-only routes.

pub mod password;
pub mod session;

use axum::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, RequestPartsExt, Router};
use serde::Deserialize;
use std::sync::Arc;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};
use tracing::info;

use crate::shared::error::{ApiError, FieldError};
use crate::shared::models::{NewUser, User};
use crate::shared::state::AppState;
use session::SESSION_COOKIE;

pub fn configure_auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/user", get(current_user))
}

/// Resolves the session cookie to a user, if any.
pub async fn user_from_cookies(
    state: &AppState,
    cookies: &Cookies,
) -> Result<Option<User>, ApiError> {
    let Some(cookie) = cookies.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let Some(user_id) = state.sessions.resolve(cookie.value()).await else {
        return Ok(None);
    };
    Ok(state.storage.get_user(user_id).await?)
}

/// Passes when the session resolves to a user; otherwise 401.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let cookies = parts
            .extract::<Cookies>()
            .await
            .map_err(|_| ApiError::Unauthorized)?;
        let user = user_from_cookies(state, &cookies)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        Ok(CurrentUser(user))
    }
}

/// Passes for admin users; 401 when unauthenticated, 403 otherwise.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

fn session_cookie(token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

fn validate_register(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if req.username.trim().is_empty() {
        errors.push(FieldError::new("username", "username is required"));
    }
    if req.password.is_empty() {
        errors.push(FieldError::new("password", "password is required"));
    }
    if req.full_name.trim().is_empty() {
        errors.push(FieldError::new("fullName", "full name is required"));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

async fn register(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    validate_register(&req)?;

    if state
        .storage
        .get_user_by_username(&req.username)
        .await?
        .is_some()
    {
        return Err(ApiError::BadRequest("Username already exists".to_string()));
    }

    // The admin flag from the client is honored only while the user table is
    // empty (bootstrap) or when the caller is already an admin.
    let caller = user_from_cookies(&state, &cookies).await?;
    let is_admin = req.is_admin
        && (state.storage.count_users().await? == 0 || caller.map_or(false, |u| u.is_admin));

    let hashed = password::hash_password(&req.password)
        .map_err(|e| ApiError::BadRequest(format!("Failed to hash password: {e}")))?;
    let user = state
        .storage
        .create_user(NewUser {
            username: req.username,
            password: hashed,
            full_name: req.full_name,
            is_admin,
            kpi_iframe_url: None,
        })
        .await?;

    let token = state.sessions.create(user.id).await;
    cookies.add(session_cookie(token));
    info!(username = %user.username, "user registered");

    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Json(req): Json<LoginRequest>,
) -> Result<Json<User>, ApiError> {
    // Unknown username and wrong password must be indistinguishable.
    let user = state
        .storage
        .get_user_by_username(&req.username)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let valid = password::verify_password(&req.password, &user.password)
        .map_err(|_| ApiError::InvalidCredentials)?;
    if !valid {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.sessions.create(user.id).await;
    cookies.add(session_cookie(token));
    info!(username = %user.username, "user logged in");

    Ok(Json(user))
}

async fn logout(State(state): State<Arc<AppState>>, cookies: Cookies) -> Json<serde_json::Value> {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value()).await;
    }
    cookies.remove(removal_cookie());
    Json(serde_json::json!({ "message": "Logged out" }))
}

async fn current_user(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
