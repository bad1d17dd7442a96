/// Customer authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register a new customer
/// - `POST /api/auth/login` - Login and get a token
/// - `GET /api/auth/customers` - List all customers
/// - `GET /api/auth/me` - Current customer (requires `Authorization: Bearer`)

use crate::{
    app::{AppState, AuthUser},
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use shopfront_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, User},
};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[serde(default)]
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

impl RegisterRequest {
    /// Trims the identity fields; passwords are taken verbatim
    fn normalized(mut self) -> Self {
        for field in [
            &mut self.first_name,
            &mut self.last_name,
            &mut self.email,
            &mut self.phone,
        ] {
            *field = field.trim().to_string();
        }
        self
    }
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Returned by register and login
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,

    /// Signed session token
    pub token: String,
}

impl AuthResponse {
    fn new(user: User, token: String) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            token,
        }
    }
}

/// Argon2id on the blocking pool
async fn hash_password(plaintext: String) -> ApiResult<String> {
    let hash = tokio::task::spawn_blocking(move || password::hash_password(&plaintext))
        .await
        .map_err(|e| ApiError::InternalError(format!("Password hashing task failed: {}", e)))??;
    Ok(hash)
}

/// Argon2id verification on the blocking pool
async fn verify_password(plaintext: String, hash: String) -> ApiResult<bool> {
    let matches = tokio::task::spawn_blocking(move || password::verify_password(&plaintext, &hash))
        .await
        .map_err(|e| ApiError::InternalError(format!("Password check task failed: {}", e)))??;
    Ok(matches)
}

fn issue_token(state: &AppState, user_id: Uuid) -> ApiResult<String> {
    let claims = jwt::Claims::with_expiration(
        user_id,
        chrono::Duration::hours(state.config.jwt.expiration_hours),
    );
    Ok(jwt::create_token(&claims, state.jwt_secret())?)
}

/// Register a new customer
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "firstName": "Ada",
///   "lastName": "Lovelace",
///   "email": "ada@example.com",
///   "phone": "+44 20 7946 0000",
///   "password": "analytical",
///   "confirmPassword": "analytical"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: missing field, password mismatch or email taken
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let Json(req) = payload?;
    let req = req.normalized();
    req.validate()?;

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    let password_hash = hash_password(req.password.clone()).await?;

    let user = User::create(
        &state.db,
        CreateUser {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone: req.phone,
            password_hash,
        },
    )
    .await?;

    info!(user_id = %user.id, "Customer registered");

    let token = issue_token(&state, user.id)?;
    Ok((StatusCode::CREATED, Json(AuthResponse::new(user, token))))
}

/// Login with email and password
///
/// Unknown email and wrong password produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let Some(user) = User::find_by_email(&state.db, req.email.trim()).await? else {
        // Same Argon2 cost as a real check, so timing does not reveal registered emails
        hash_password(req.password).await?;
        return Err(invalid());
    };

    if !verify_password(req.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "Failed login attempt");
        return Err(invalid());
    }

    info!(user_id = %user.id, "Customer logged in");

    let token = issue_token(&state, user.id)?;
    Ok(Json(AuthResponse::new(user, token)))
}

/// List every registered customer, oldest first
pub async fn list_customers(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    let users = User::list(&state.db).await?;
    Ok(Json(require_customers(users)?))
}

/// An empty customer list is reported as 404
fn require_customers(users: Vec<User>) -> ApiResult<Vec<User>> {
    if users.is_empty() {
        return Err(ApiError::NotFound("No customers found".to_string()));
    }

    Ok(users)
}

/// The customer the bearer token belongs to
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}
