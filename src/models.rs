use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::dates::deserialize_due_date;

/// `user_id` reservado para vehículos visibles por todos los usuarios.
pub const PUBLIC_OWNER_ID: i64 = 0;

pub const UNKNOWN_NAME: &str = "Unknown";

// --- Domain Models (Mapped to DB) ---

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub sms_notifications_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Public,
    User(i64),
}

impl Owner {
    pub fn from_user_id(user_id: i64) -> Self {
        if user_id == PUBLIC_OWNER_ID {
            Owner::Public
        } else {
            Owner::User(user_id)
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Vehicle {
    pub id: i64,
    pub user_id: i64,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub license_plate: String,
    pub vin: Option<String>,
    pub color: Option<String>,
    pub notes: Option<String>,
}

impl Vehicle {
    pub fn owner(&self) -> Owner {
        Owner::from_user_id(self.user_id)
    }

    /// Solo el dueño puede borrar o compartir; los vehículos públicos los gestiona cualquiera.
    pub fn is_managed_by(&self, user_id: i64) -> bool {
        match self.owner() {
            Owner::Public => true,
            Owner::User(owner_id) => owner_id == user_id,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {} ({})", self.make, self.model, self.license_plate)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Reminder {
    pub id: i64,
    pub vehicle_id: i64,
    #[sqlx(rename = "type")]
    pub reminder_type: String,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub is_completed: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReminderType {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub is_default: bool,
}

// --- Request/Response DTOs ---

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SharedUserDto {
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDto {
    pub id: i64,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub license_plate: String,
    pub vin: Option<String>,
    pub color: Option<String>,
    pub notes: Option<String>,
    pub is_owner: bool,
    pub owner_name: String,
    pub shared_with: Vec<SharedUserDto>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateVehicleRequest {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub license_plate: String,
    pub vin: Option<String>,
    pub color: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShareVehicleRequest {
    pub username: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReminderRequest {
    pub vehicle_id: i64,
    #[serde(rename = "type")]
    pub reminder_type: String,
    #[serde(deserialize_with = "deserialize_due_date")]
    pub due_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReminderRequest {
    #[serde(deserialize_with = "deserialize_due_date")]
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReminderTypeDto {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub is_default: bool,
}

impl From<ReminderType> for ReminderTypeDto {
    fn from(t: ReminderType) -> Self {
        Self {
            id: t.id,
            name: t.name,
            icon: t.icon,
            color: t.color,
            is_default: t.is_default,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateReminderTypeRequest {
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSettingsResponse {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub sms_notifications_enabled: bool,
}

impl From<User> for UserSettingsResponse {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            phone_number: user.phone_number,
            sms_notifications_enabled: user.sms_notifications_enabled,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserSettingsRequest {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub sms_notifications_enabled: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CarImageQuery {
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarImageResponse {
    pub image_url: Option<String>,
    pub attribution: Option<String>,
    pub photographer_url: Option<String>,
}

// Claims para JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Id del usuario
    pub name: String,
    pub iss: String,
    pub aud: String,
    pub exp: usize,
}

/// Convierte cadenas vacías en `None`.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
