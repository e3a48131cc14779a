use axum::{extract::State, Json};
use sqlx::SqlitePool;

use crate::{
    db,
    error::AppError,
    middleware::CurrentUser,
    models::{non_empty, UpdateUserSettingsRequest, UserSettingsResponse},
};

#[utoipa::path(
    get,
    path = "/api/user/settings",
    responses(
        (status = 200, description = "Notification settings", body = UserSettingsResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer" = [])),
    tag = "user"
)]
pub async fn get_settings(CurrentUser(user): CurrentUser) -> Json<UserSettingsResponse> {
    Json(user.into())
}

#[utoipa::path(
    put,
    path = "/api/user/settings",
    request_body = UpdateUserSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = UserSettingsResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer" = [])),
    tag = "user"
)]
pub async fn update_settings(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateUserSettingsRequest>,
) -> Result<Json<UserSettingsResponse>, AppError> {
    sqlx::query(
        "UPDATE users SET email = ?, phone_number = ?, sms_notifications_enabled = ? WHERE id = ?",
    )
    .bind(non_empty(payload.email))
    .bind(non_empty(payload.phone_number))
    .bind(payload.sms_notifications_enabled)
    .bind(user.id)
    .execute(&pool)
    .await?;

    let updated = db::get_user_by_id(&pool, user.id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(updated.into()))
}
