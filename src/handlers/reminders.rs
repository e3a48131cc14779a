use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    db,
    error::AppError,
    middleware::CurrentUser,
    models::{non_empty, CreateReminderRequest, UpdateReminderRequest},
    reminders::{build_reminder_views, build_reminder_views_for_vehicle, ReminderView},
    state::AppState,
};

fn not_found() -> AppError {
    AppError::NotFound("Reminder not found".to_string())
}

/// Carga un recordatorio visible para el usuario y lo proyecta a su vista.
async fn load_view(state: &AppState, user_id: i64, id: i64) -> Result<ReminderView, AppError> {
    let today = state.clock.today();

    let reminder = db::get_reminder(&state.pool, id).await?.ok_or_else(not_found)?;
    let vehicle = db::accessible_vehicle(&state.pool, user_id, reminder.vehicle_id)
        .await?
        .ok_or_else(not_found)?;

    build_reminder_views_for_vehicle(Some(&vehicle), std::slice::from_ref(&reminder), today)
        .pop()
        .ok_or_else(not_found)
}

/// 404 salvo que el recordatorio exista y su vehículo sea accesible.
async fn ensure_access(state: &AppState, user_id: i64, id: i64) -> Result<(), AppError> {
    let reminder = db::get_reminder(&state.pool, id).await?.ok_or_else(not_found)?;

    if !db::user_has_access(&state.pool, user_id, reminder.vehicle_id).await? {
        return Err(not_found());
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/reminders",
    responses(
        (status = 200, description = "Reminders with derived status", body = Vec<ReminderView>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
pub async fn get_reminders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ReminderView>>, AppError> {
    let today = state.clock.today();
    let snapshot = db::snapshot_for_user(&state.pool, user.id).await?;

    Ok(Json(build_reminder_views(
        &snapshot.reminders,
        &snapshot.vehicles,
        today,
    )))
}

#[utoipa::path(
    get,
    path = "/api/reminders/{id}",
    params(("id" = i64, Path, description = "Reminder ID")),
    responses(
        (status = 200, description = "Reminder details", body = ReminderView),
        (status = 404, description = "Reminder not found")
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
pub async fn get_reminder(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ReminderView>, AppError> {
    Ok(Json(load_view(&state, user.id, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/reminders",
    request_body = CreateReminderRequest,
    responses(
        (status = 201, description = "Reminder created", body = ReminderView),
        (status = 400, description = "Unknown vehicle or reminder type")
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
pub async fn create_reminder(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateReminderRequest>,
) -> Result<(StatusCode, Json<ReminderView>), AppError> {
    // 1. El vehículo debe existir y ser accesible
    if db::accessible_vehicle(&state.pool, user.id, payload.vehicle_id)
        .await?
        .is_none()
    {
        return Err(AppError::ValidationError("Vehicle not found".to_string()));
    }

    // 2. Validar el tipo sin distinguir mayúsculas; se guarda el nombre canónico
    let reminder_types = db::all_reminder_types(&state.pool).await?;
    let wanted = payload.reminder_type.trim().to_lowercase();
    let valid_type = reminder_types
        .iter()
        .find(|t| t.name.to_lowercase() == wanted)
        .ok_or_else(|| {
            let valid_names: Vec<&str> = reminder_types.iter().map(|t| t.name.as_str()).collect();
            AppError::ValidationError(format!(
                "Invalid reminder type. Valid types: {}",
                valid_names.join(", ")
            ))
        })?;

    // 3. Insertar
    let id = sqlx::query(
        "INSERT INTO reminders (vehicle_id, type, due_date, notes, is_completed)
         VALUES (?, ?, ?, ?, 0)",
    )
    .bind(payload.vehicle_id)
    .bind(&valid_type.name)
    .bind(payload.due_date)
    .bind(non_empty(payload.notes))
    .execute(&state.pool)
    .await?
    .last_insert_rowid();

    Ok((StatusCode::CREATED, Json(load_view(&state, user.id, id).await?)))
}

#[utoipa::path(
    put,
    path = "/api/reminders/{id}",
    params(("id" = i64, Path, description = "Reminder ID")),
    request_body = UpdateReminderRequest,
    responses(
        (status = 200, description = "Reminder updated", body = ReminderView),
        (status = 404, description = "Reminder not found")
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
pub async fn update_reminder(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateReminderRequest>,
) -> Result<Json<ReminderView>, AppError> {
    ensure_access(&state, user.id, id).await?;

    sqlx::query("UPDATE reminders SET due_date = ?, notes = ?, is_completed = ? WHERE id = ?")
        .bind(payload.due_date)
        .bind(non_empty(payload.notes))
        .bind(payload.is_completed)
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(Json(load_view(&state, user.id, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/reminders/{id}/complete",
    params(("id" = i64, Path, description = "Reminder ID")),
    responses(
        (status = 200, description = "Reminder marked as completed", body = ReminderView),
        (status = 404, description = "Reminder not found")
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
pub async fn complete_reminder(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ReminderView>, AppError> {
    ensure_access(&state, user.id, id).await?;

    sqlx::query("UPDATE reminders SET is_completed = 1 WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(Json(load_view(&state, user.id, id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/reminders/{id}",
    params(("id" = i64, Path, description = "Reminder ID")),
    responses(
        (status = 204, description = "Reminder deleted"),
        (status = 404, description = "Reminder not found")
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
pub async fn delete_reminder(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    ensure_access(&state, user.id, id).await?;

    let result = sqlx::query("DELETE FROM reminders WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}
