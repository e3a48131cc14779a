use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::{
    config::JwtConfig,
    db,
    error::AppError,
    models::{Claims, User},
    state::AppState,
};

pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Extraer el token del header Authorization
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::AuthError("Missing Authorization header".to_string()))?
            .to_str()
            .map_err(|_| AppError::AuthError("Invalid Authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::AuthError("Invalid token format".to_string()))?;

        // 2. Decodificar el token con la configuración del estado
        let state = AppState::from_ref(state);
        let claims = decode_token(&state.config.jwt, token)?;

        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

        // 3. Obtener el usuario de la DB
        match db::get_user_by_id(&state.pool, user_id).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => Err(AppError::AuthError("User not found".to_string())),
        }
    }
}

pub fn decode_token(jwt: &JwtConfig, token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&jwt.issuer]);
    validation.set_audience(&[&jwt.audience]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::AuthError(format!("Invalid token: {}", e)))
}
