use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::SqlitePool;

use crate::{
    db,
    error::AppError,
    middleware::CurrentUser,
    models::{non_empty, CreateReminderTypeRequest, ReminderTypeDto},
};

pub const DEFAULT_ICON: &str = "default";
pub const DEFAULT_COLOR: &str = "#6366f1";

fn not_found() -> AppError {
    AppError::NotFound("Reminder type not found".to_string())
}

/// Nombre obligatorio; icono y color toman sus valores por defecto.
fn normalize(payload: CreateReminderTypeRequest) -> Result<(String, String, String), AppError> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::ValidationError("Name is required".to_string()));
    }

    Ok((
        name,
        non_empty(payload.icon).unwrap_or_else(|| DEFAULT_ICON.to_string()),
        non_empty(payload.color).unwrap_or_else(|| DEFAULT_COLOR.to_string()),
    ))
}

#[utoipa::path(
    get,
    path = "/api/remindertypes",
    responses((status = 200, description = "All reminder types", body = Vec<ReminderTypeDto>)),
    security(("bearer" = [])),
    tag = "reminder types"
)]
pub async fn get_reminder_types(
    State(pool): State<SqlitePool>,
    CurrentUser(_user): CurrentUser,
) -> Result<Json<Vec<ReminderTypeDto>>, AppError> {
    let types = db::all_reminder_types(&pool).await?;
    Ok(Json(types.into_iter().map(ReminderTypeDto::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/remindertypes/{id}",
    params(("id" = i64, Path, description = "Reminder type ID")),
    responses(
        (status = 200, description = "Reminder type", body = ReminderTypeDto),
        (status = 404, description = "Reminder type not found")
    ),
    security(("bearer" = [])),
    tag = "reminder types"
)]
pub async fn get_reminder_type(
    State(pool): State<SqlitePool>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ReminderTypeDto>, AppError> {
    let reminder_type = db::get_reminder_type(&pool, id).await?.ok_or_else(not_found)?;
    Ok(Json(reminder_type.into()))
}

#[utoipa::path(
    post,
    path = "/api/remindertypes",
    request_body = CreateReminderTypeRequest,
    responses(
        (status = 201, description = "Reminder type created", body = ReminderTypeDto),
        (status = 400, description = "Name is required")
    ),
    security(("bearer" = [])),
    tag = "reminder types"
)]
pub async fn create_reminder_type(
    State(pool): State<SqlitePool>,
    CurrentUser(_user): CurrentUser,
    Json(payload): Json<CreateReminderTypeRequest>,
) -> Result<(StatusCode, Json<ReminderTypeDto>), AppError> {
    let (name, icon, color) = normalize(payload)?;

    let id = sqlx::query(
        "INSERT INTO reminder_types (name, icon, color, is_default) VALUES (?, ?, ?, 0)",
    )
    .bind(&name)
    .bind(&icon)
    .bind(&color)
    .execute(&pool)
    .await?
    .last_insert_rowid();

    Ok((
        StatusCode::CREATED,
        Json(ReminderTypeDto {
            id,
            name,
            icon,
            color,
            is_default: false,
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/remindertypes/{id}",
    params(("id" = i64, Path, description = "Reminder type ID")),
    request_body = CreateReminderTypeRequest,
    responses(
        (status = 200, description = "Reminder type updated", body = ReminderTypeDto),
        (status = 400, description = "Name is required"),
        (status = 404, description = "Reminder type not found")
    ),
    security(("bearer" = [])),
    tag = "reminder types"
)]
pub async fn update_reminder_type(
    State(pool): State<SqlitePool>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<CreateReminderTypeRequest>,
) -> Result<Json<ReminderTypeDto>, AppError> {
    let (name, icon, color) = normalize(payload)?;

    let result = sqlx::query("UPDATE reminder_types SET name = ?, icon = ?, color = ? WHERE id = ?")
        .bind(&name)
        .bind(&icon)
        .bind(&color)
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found());
    }

    let updated = db::get_reminder_type(&pool, id).await?.ok_or_else(not_found)?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/remindertypes/{id}",
    params(("id" = i64, Path, description = "Reminder type ID")),
    responses(
        (status = 204, description = "Reminder type deleted"),
        (status = 400, description = "Default types cannot be deleted"),
        (status = 404, description = "Reminder type not found")
    ),
    security(("bearer" = [])),
    tag = "reminder types"
)]
pub async fn delete_reminder_type(
    State(pool): State<SqlitePool>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let reminder_type = db::get_reminder_type(&pool, id).await?.ok_or_else(not_found)?;

    if reminder_type.is_default {
        return Err(AppError::ValidationError(
            "Cannot delete default reminder types".to_string(),
        ));
    }

    sqlx::query("DELETE FROM reminder_types WHERE id = ? AND is_default = 0")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
