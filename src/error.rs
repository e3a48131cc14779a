use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errores de los handlers. El cuerpo de la respuesta siempre es `{"error": mensaje}`;
/// los fallos de base de datos e internos se registran y no exponen detalles.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("unauthorized: {0}")]
    AuthError(String),
    #[error("storage failure: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("{0}")]
    NotFound(String),
    #[error("rejected request: {0}")]
    ValidationError(String),
    #[error("already exists: {0}")]
    Conflict(String),
    #[error("internal failure: {0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::SqlxError(e) => {
                tracing::error!(error = %e, "storage query failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_and_body() {
        let response = AppError::Conflict("Username already exists".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({ "error": "Username already exists" }));
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let response = AppError::InternalError("argon2 exploded".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(!String::from_utf8_lossy(&body).contains("argon2"));
    }
}
