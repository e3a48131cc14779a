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
    models::{
        non_empty, CreateVehicleRequest, Owner, ShareVehicleRequest, SharedUserDto, Vehicle,
        VehicleDto, UNKNOWN_NAME,
    },
    reminders::{build_reminder_views_for_vehicle, ReminderView},
    state::AppState,
};

fn not_found() -> AppError {
    AppError::NotFound("Vehicle not found".to_string())
}

fn validate(payload: &CreateVehicleRequest) -> Result<(), AppError> {
    if payload.make.trim().is_empty()
        || payload.model.trim().is_empty()
        || payload.license_plate.trim().is_empty()
    {
        return Err(AppError::ValidationError(
            "Make, model and license plate are required".to_string(),
        ));
    }
    Ok(())
}

async fn to_dto(pool: &SqlitePool, vehicle: Vehicle, current_user_id: i64) -> Result<VehicleDto, AppError> {
    let owner_name = match vehicle.owner() {
        Owner::Public => None,
        Owner::User(owner_id) => db::get_user_by_id(pool, owner_id).await?.map(|u| u.username),
    };
    let shared_with = db::shared_users_for_vehicle(pool, vehicle.id).await?;
    let is_owner = vehicle.is_managed_by(current_user_id);

    Ok(VehicleDto {
        id: vehicle.id,
        make: vehicle.make,
        model: vehicle.model,
        year: vehicle.year,
        license_plate: vehicle.license_plate,
        vin: vehicle.vin,
        color: vehicle.color,
        notes: vehicle.notes,
        is_owner,
        owner_name: owner_name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        shared_with,
    })
}

/// Vehículo que el usuario puede gestionar (dueño o público); si no, 404.
async fn managed_vehicle(pool: &SqlitePool, user_id: i64, id: i64) -> Result<Vehicle, AppError> {
    db::get_vehicle(pool, id)
        .await?
        .filter(|v| v.is_managed_by(user_id))
        .ok_or_else(not_found)
}

#[utoipa::path(
    get,
    path = "/api/vehicles",
    responses(
        (status = 200, description = "Vehicles the user can access", body = Vec<VehicleDto>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer" = [])),
    tag = "vehicles"
)]
pub async fn get_vehicles(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<VehicleDto>>, AppError> {
    let vehicles = db::vehicles_for_user(&pool, user.id).await?;

    let mut dtos = Vec::with_capacity(vehicles.len());
    for vehicle in vehicles {
        dtos.push(to_dto(&pool, vehicle, user.id).await?);
    }

    Ok(Json(dtos))
}

#[utoipa::path(
    get,
    path = "/api/vehicles/{id}",
    params(("id" = i64, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Vehicle details", body = VehicleDto),
        (status = 404, description = "Vehicle not found")
    ),
    security(("bearer" = [])),
    tag = "vehicles"
)]
pub async fn get_vehicle(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<VehicleDto>, AppError> {
    let vehicle = db::accessible_vehicle(&pool, user.id, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(to_dto(&pool, vehicle, user.id).await?))
}

#[utoipa::path(
    get,
    path = "/api/vehicles/{id}/reminders",
    params(("id" = i64, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Reminders of the vehicle", body = Vec<ReminderView>),
        (status = 404, description = "Vehicle not found")
    ),
    security(("bearer" = [])),
    tag = "vehicles"
)]
pub async fn get_vehicle_reminders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ReminderView>>, AppError> {
    let today = state.clock.today();
    let vehicle = db::accessible_vehicle(&state.pool, user.id, id)
        .await?
        .ok_or_else(not_found)?;
    let reminders = db::reminders_for_vehicle(&state.pool, id).await?;

    Ok(Json(build_reminder_views_for_vehicle(
        Some(&vehicle),
        &reminders,
        today,
    )))
}

#[utoipa::path(
    post,
    path = "/api/vehicles",
    request_body = CreateVehicleRequest,
    responses(
        (status = 201, description = "Vehicle created", body = VehicleDto),
        (status = 400, description = "Missing required fields")
    ),
    security(("bearer" = [])),
    tag = "vehicles"
)]
pub async fn create_vehicle(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<VehicleDto>), AppError> {
    validate(&payload)?;

    let id = sqlx::query(
        "INSERT INTO vehicles (user_id, make, model, year, license_plate, vin, color, notes)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user.id)
    .bind(payload.make.trim())
    .bind(payload.model.trim())
    .bind(payload.year)
    .bind(payload.license_plate.trim())
    .bind(non_empty(payload.vin))
    .bind(non_empty(payload.color))
    .bind(non_empty(payload.notes))
    .execute(&pool)
    .await?
    .last_insert_rowid();

    let vehicle = db::get_vehicle(&pool, id).await?.ok_or_else(not_found)?;

    Ok((StatusCode::CREATED, Json(to_dto(&pool, vehicle, user.id).await?)))
}

#[utoipa::path(
    put,
    path = "/api/vehicles/{id}",
    params(("id" = i64, Path, description = "Vehicle ID")),
    request_body = CreateVehicleRequest,
    responses(
        (status = 200, description = "Vehicle updated", body = VehicleDto),
        (status = 400, description = "Missing required fields"),
        (status = 404, description = "Vehicle not found")
    ),
    security(("bearer" = [])),
    tag = "vehicles"
)]
pub async fn update_vehicle(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<CreateVehicleRequest>,
) -> Result<Json<VehicleDto>, AppError> {
    // Primero verificamos que exista y que el usuario tenga acceso
    if !db::user_has_access(&pool, user.id, id).await? {
        return Err(not_found());
    }
    validate(&payload)?;

    sqlx::query(
        "UPDATE vehicles SET
            make = ?, model = ?, year = ?, license_plate = ?,
            vin = ?, color = ?, notes = ?
        WHERE id = ?",
    )
    .bind(payload.make.trim())
    .bind(payload.model.trim())
    .bind(payload.year)
    .bind(payload.license_plate.trim())
    .bind(non_empty(payload.vin))
    .bind(non_empty(payload.color))
    .bind(non_empty(payload.notes))
    .bind(id)
    .execute(&pool)
    .await?;

    let vehicle = db::get_vehicle(&pool, id).await?.ok_or_else(not_found)?;

    Ok(Json(to_dto(&pool, vehicle, user.id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/vehicles/{id}",
    params(("id" = i64, Path, description = "Vehicle ID")),
    responses(
        (status = 204, description = "Vehicle and its reminders deleted"),
        (status = 404, description = "Vehicle not found or not owned")
    ),
    security(("bearer" = [])),
    tag = "vehicles"
)]
pub async fn delete_vehicle(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    managed_vehicle(&pool, user.id, id).await?;

    if !db::delete_vehicle_cascade(&pool, id).await? {
        return Err(not_found());
    }

    tracing::info!(vehicle_id = id, user_id = user.id, "vehicle deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/vehicles/{id}/share",
    params(("id" = i64, Path, description = "Vehicle ID")),
    request_body = ShareVehicleRequest,
    responses(
        (status = 200, description = "Vehicle shared", body = SharedUserDto),
        (status = 400, description = "Unknown user or sharing with yourself"),
        (status = 404, description = "Vehicle not found or not owned")
    ),
    security(("bearer" = [])),
    tag = "vehicles"
)]
pub async fn share_vehicle(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<ShareVehicleRequest>,
) -> Result<Json<SharedUserDto>, AppError> {
    managed_vehicle(&pool, user.id, id).await?;

    let target = db::get_user_by_username(&pool, &payload.username)
        .await?
        .ok_or(AppError::ValidationError("User not found".to_string()))?;

    if target.id == user.id {
        return Err(AppError::ValidationError(
            "Cannot share with yourself".to_string(),
        ));
    }

    // Compartir dos veces no duplica el permiso
    sqlx::query("INSERT OR IGNORE INTO vehicle_shares (vehicle_id, user_id) VALUES (?, ?)")
        .bind(id)
        .bind(target.id)
        .execute(&pool)
        .await?;

    Ok(Json(SharedUserDto {
        user_id: target.id,
        username: target.username,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/vehicles/{id}/share/{user_id}",
    params(
        ("id" = i64, Path, description = "Vehicle ID"),
        ("user_id" = i64, Path, description = "User to remove")
    ),
    responses(
        (status = 204, description = "Share removed"),
        (status = 404, description = "Vehicle not found or not owned")
    ),
    security(("bearer" = [])),
    tag = "vehicles"
)]
pub async fn unshare_vehicle(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    Path((id, target_user_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    managed_vehicle(&pool, user.id, id).await?;

    sqlx::query("DELETE FROM vehicle_shares WHERE vehicle_id = ? AND user_id = ?")
        .bind(id)
        .bind(target_user_id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/vehicles/users",
    responses(
        (status = 200, description = "Other users a vehicle can be shared with", body = Vec<SharedUserDto>)
    ),
    security(("bearer" = [])),
    tag = "vehicles"
)]
pub async fn get_share_candidates(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<SharedUserDto>>, AppError> {
    let users: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, username FROM users WHERE id <> ? ORDER BY id")
            .bind(user.id)
            .fetch_all(&pool)
            .await?;

    Ok(Json(
        users
            .into_iter()
            .map(|(user_id, username)| SharedUserDto { user_id, username })
            .collect(),
    ))
}
