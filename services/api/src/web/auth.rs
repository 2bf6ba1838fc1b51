//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, logout and the current user.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use qalamflow_core::domain::User;
use qalamflow_core::ports::PortError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::{session_id_from_headers, SESSION_COOKIE};
use crate::web::port_error;
use crate::web::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.user_id,
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Trimmed name and lowercased email, or the reason the registration is rejected.
fn validate_registration(req: &RegisterRequest) -> Result<(String, String), String> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    let email = normalize_email(&req.email);
    if !EMAIL_SHAPE.is_match(&email) {
        return Err("A valid email is required".to_string());
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    Ok((name.to_string(), email))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn session_cookie(session_id: &str, max_age: Duration) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        session_id,
        max_age.num_seconds()
    )
}

/// Opens a new auth session for the user and returns the `Set-Cookie` value.
async fn start_session(state: &AppState, user_id: Uuid) -> Result<String, (StatusCode, String)> {
    let auth_session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);

    state
        .db
        .create_auth_session(&auth_session_id, user_id, Utc::now() + ttl)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
        })?;

    Ok(session_cookie(&auth_session_id, ttl))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (name, email) =
        validate_registration(&req).map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })?
        .to_string();

    let user = state
        .db
        .create_user(&name, &email, &password_hash)
        .await
        .map_err(|e| port_error("User", e))?;

    let cookie = start_session(&state, user.user_id).await?;
    info!("Registered user {}", user.user_id);

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse { user: user.into() }),
    ))
}

/// POST /api/auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let invalid = || (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string());

    let user_creds = state
        .db
        .get_user_by_email(&normalize_email(&req.email))
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => invalid(),
            other => port_error("User", other),
        })?;

    let parsed_hash = PasswordHash::new(&user_creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    let cookie = start_session(&state, user_creds.user.user_id).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user: user_creds.user.into(),
        }),
    ))
}

/// POST /api/auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let auth_session_id = session_id_from_headers(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .db
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
        })?;

    let cookie = session_cookie("", Duration::zero());
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

/// GET /api/auth/me - The user owning the current session
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state
        .db
        .get_user_by_id(user_id)
        .await
        .map_err(|e| port_error("User", e))?;
    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_registration_normalizes_input() {
        let (name, email) =
            validate_registration(&register("  Amina ", " Amina@Example.COM ", "secret1")).unwrap();
        assert_eq!(name, "Amina");
        assert_eq!(email, "amina@example.com");
    }

    #[test]
    fn test_registration_rejects_bad_input() {
        assert!(validate_registration(&register(" ", "a@b.co", "secret1")).is_err());
        assert!(validate_registration(&register("A", "not-an-email", "secret1")).is_err());
        assert!(validate_registration(&register("A", "a@b", "secret1")).is_err());
        assert!(validate_registration(&register("A", "a@b.co", "short")).is_err());
    }

    #[test]
    fn test_session_cookie_format() {
        let cookie = session_cookie("abc", Duration::days(7));
        assert!(cookie.starts_with("session=abc;"));
        assert!(cookie.ends_with("Max-Age=604800"));
        assert!(session_cookie("", Duration::zero()).ends_with("Max-Age=0"));
    }

    #[test]
    fn test_user_response_shape() {
        let id = Uuid::new_v4();
        let body = serde_json::to_value(UserResponse::from(User {
            user_id: id,
            name: "Amina".to_string(),
            email: "amina@example.com".to_string(),
        }))
        .unwrap();
        assert_eq!(body["id"], id.to_string());
        assert_eq!(body["name"], "Amina");
    }
}
