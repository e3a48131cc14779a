use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, Json};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand_core::OsRng;

use crate::{
    config::JwtConfig,
    db,
    error::AppError,
    models::{non_empty, Claims, LoginRequest, LoginResponse, RegisterRequest},
    state::AppState,
};

pub const MIN_PASSWORD_LENGTH: usize = 6;

fn duplicate_username() -> AppError {
    AppError::Conflict("Username already exists".to_string())
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered and logged in", body = LoginResponse),
        (status = 400, description = "Missing username or password too short"),
        (status = 409, description = "Username already exists")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    // 1. Validar la entrada
    let username = payload.username.trim();
    if username.is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Username and password are required".to_string(),
        ));
    }

    if payload.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    // 2. Verificar si el usuario ya existe
    if db::get_user_by_username(&state.pool, username).await?.is_some() {
        return Err(duplicate_username());
    }

    // 3. Hash de contraseña
    let password_hash = hash_password(&payload.password)?;

    // 4. Insertar usuario; otro registro concurrente puede haber ganado la carrera
    let id = db::insert_user(
        &state.pool,
        username,
        &password_hash,
        non_empty(payload.email),
        non_empty(payload.phone_number),
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => duplicate_username(),
        e => AppError::SqlxError(e),
    })?;

    tracing::info!(user_id = id, "registered new user");

    // 5. Retornar el token
    Ok(Json(issue_token(&state.config.jwt, id, username, Utc::now())?))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let invalid = || AppError::AuthError("Invalid username or password".to_string());

    // 1. Buscar usuario
    let user = db::get_user_by_username(&state.pool, &payload.username)
        .await?
        .ok_or_else(invalid)?;

    // 2. Verificar password
    if !verify_password(&payload.password, &user.password_hash) {
        return Err(invalid());
    }

    // 3. Generar JWT
    Ok(Json(issue_token(
        &state.config.jwt,
        user.id,
        &user.username,
        Utc::now(),
    )?))
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Invalid password hash in DB: {}", e);
            false
        }
    }
}

pub fn issue_token(
    jwt: &JwtConfig,
    user_id: i64,
    username: &str,
    now: DateTime<Utc>,
) -> Result<LoginResponse, AppError> {
    let expires_at = now + Duration::days(jwt.ttl_days);

    let claims = Claims {
        sub: user_id.to_string(),
        name: username.to_string(),
        iss: jwt.issuer.clone(),
        aud: jwt.audience.clone(),
        exp: expires_at.timestamp().max(0) as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalError(format!("Token creation failed: {}", e)))?;

    Ok(LoginResponse {
        token,
        username: username.to_string(),
        expires_at,
    })
}
