use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::models::{Reminder, ReminderType, SharedUserDto, User, Vehicle, UNKNOWN_NAME};

pub async fn establish_connection(database_url: &str) -> anyhow::Result<SqlitePool> {
    // Crear el archivo de base de datos si no existe
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Ejecutar migraciones
    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Migrations executed successfully");

    Ok(pool)
}

/// Base en memoria con las migraciones aplicadas. Una sola conexión que no
/// se recicla, porque cada conexión `:memory:` es una base distinta.
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

// Condición de acceso: vehículo propio, público (user_id = 0) o compartido.
const ACCESSIBLE_VEHICLES: &str = "SELECT id FROM vehicles \
     WHERE user_id = ?1 OR user_id = 0 \
     OR id IN (SELECT vehicle_id FROM vehicle_shares WHERE user_id = ?1)";

// --- Users ---

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Clave de búsqueda de un nombre de usuario. `to_lowercase` pliega también
/// letras fuera de ASCII, cosa que `COLLATE NOCASE` no hace.
pub fn username_key(username: &str) -> String {
    username.trim().to_lowercase()
}

pub async fn get_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username_key = ?")
        .bind(username_key(username))
        .fetch_optional(pool)
        .await
}

/// Inserta un usuario y devuelve su id. Un nombre repetido falla con una
/// violación de unicidad sobre `username_key`.
pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
    email: Option<String>,
    phone_number: Option<String>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO users (username, username_key, password_hash, email, phone_number)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(username.trim())
    .bind(username_key(username))
    .bind(password_hash)
    .bind(email)
    .bind(phone_number)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn users_with_email(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE email IS NOT NULL AND email <> '' ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

pub async fn users_with_sms_enabled(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users
         WHERE sms_notifications_enabled = 1
           AND phone_number IS NOT NULL AND phone_number <> ''
         ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

// --- Vehicles ---

pub async fn get_vehicle(pool: &SqlitePool, id: i64) -> Result<Option<Vehicle>, sqlx::Error> {
    sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn vehicles_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Vehicle>, sqlx::Error> {
    sqlx::query_as::<_, Vehicle>(&format!(
        "SELECT * FROM vehicles WHERE id IN ({}) ORDER BY id",
        ACCESSIBLE_VEHICLES
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn user_has_access(
    pool: &SqlitePool,
    user_id: i64,
    vehicle_id: i64,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT 1 FROM vehicles WHERE id = ?2 AND id IN ({})",
        ACCESSIBLE_VEHICLES
    ))
    .bind(user_id)
    .bind(vehicle_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

/// Vehículo si existe y el usuario tiene acceso.
pub async fn accessible_vehicle(
    pool: &SqlitePool,
    user_id: i64,
    vehicle_id: i64,
) -> Result<Option<Vehicle>, sqlx::Error> {
    if !user_has_access(pool, user_id, vehicle_id).await? {
        return Ok(None);
    }
    get_vehicle(pool, vehicle_id).await
}

pub async fn shared_users_for_vehicle(
    pool: &SqlitePool,
    vehicle_id: i64,
) -> Result<Vec<SharedUserDto>, sqlx::Error> {
    let rows: Vec<(i64, Option<String>)> = sqlx::query_as(
        "SELECT s.user_id, u.username
         FROM vehicle_shares s
         LEFT JOIN users u ON u.id = s.user_id
         WHERE s.vehicle_id = ?
         ORDER BY s.id",
    )
    .bind(vehicle_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(user_id, username)| SharedUserDto {
            user_id,
            username: username.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        })
        .collect())
}

/// Borra el vehículo junto con sus recordatorios y permisos compartidos.
pub async fn delete_vehicle_cascade(pool: &SqlitePool, vehicle_id: i64) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM reminders WHERE vehicle_id = ?")
        .bind(vehicle_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM vehicle_shares WHERE vehicle_id = ?")
        .bind(vehicle_id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM vehicles WHERE id = ?")
        .bind(vehicle_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(result.rows_affected() > 0)
}

// --- Reminders ---

pub async fn get_reminder(pool: &SqlitePool, id: i64) -> Result<Option<Reminder>, sqlx::Error> {
    sqlx::query_as::<_, Reminder>("SELECT * FROM reminders WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn reminders_for_vehicle(
    pool: &SqlitePool,
    vehicle_id: i64,
) -> Result<Vec<Reminder>, sqlx::Error> {
    sqlx::query_as::<_, Reminder>("SELECT * FROM reminders WHERE vehicle_id = ? ORDER BY id")
        .bind(vehicle_id)
        .fetch_all(pool)
        .await
}

pub async fn reminders_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Reminder>, sqlx::Error> {
    sqlx::query_as::<_, Reminder>(&format!(
        "SELECT * FROM reminders WHERE vehicle_id IN ({}) ORDER BY id",
        ACCESSIBLE_VEHICLES
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Foto de los vehículos y recordatorios visibles para un usuario.
pub struct UserSnapshot {
    pub vehicles: Vec<Vehicle>,
    pub reminders: Vec<Reminder>,
}

pub async fn snapshot_for_user(pool: &SqlitePool, user_id: i64) -> Result<UserSnapshot, sqlx::Error> {
    Ok(UserSnapshot {
        vehicles: vehicles_for_user(pool, user_id).await?,
        reminders: reminders_for_user(pool, user_id).await?,
    })
}

// --- Reminder types ---

pub async fn all_reminder_types(pool: &SqlitePool) -> Result<Vec<ReminderType>, sqlx::Error> {
    sqlx::query_as::<_, ReminderType>("SELECT * FROM reminder_types ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn get_reminder_type(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<ReminderType>, sqlx::Error> {
    sqlx::query_as::<_, ReminderType>("SELECT * FROM reminder_types WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}
