//! Estado y agregación de recordatorios.
//!
//! Todo lo de este módulo es puro: recibe una foto de vehículos y
//! recordatorios junto con la fecha de "hoy" y devuelve vistas derivadas.
//! Nada se persiste ni se cachea; el estado se recalcula en cada lectura.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::dates::last_day_of_month;
use crate::models::{Reminder, Vehicle, UNKNOWN_NAME};

pub const URGENT_WITHIN_DAYS: i64 = 7;
pub const WARNING_WITHIN_DAYS: i64 = 30;
pub const UPCOMING_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Overdue,
    Urgent,
    Warning,
    Ok,
    Completed,
}

impl ReminderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderStatus::Overdue => "overdue",
            ReminderStatus::Urgent => "urgent",
            ReminderStatus::Warning => "warning",
            ReminderStatus::Ok => "ok",
            ReminderStatus::Completed => "completed",
        }
    }
}

/// Días de calendario entre `today` y `due_date`; negativo si ya venció.
pub fn days_until_due(due_date: NaiveDate, today: NaiveDate) -> i64 {
    (due_date - today).num_days()
}

pub fn classify(due_date: NaiveDate, is_completed: bool, today: NaiveDate) -> ReminderStatus {
    if is_completed {
        return ReminderStatus::Completed;
    }

    match days_until_due(due_date, today) {
        d if d < 0 => ReminderStatus::Overdue,
        d if d <= URGENT_WITHIN_DAYS => ReminderStatus::Urgent,
        d if d <= WARNING_WITHIN_DAYS => ReminderStatus::Warning,
        _ => ReminderStatus::Ok,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReminderView {
    pub id: i64,
    pub vehicle_id: i64,
    pub vehicle_name: String,
    #[serde(rename = "type")]
    pub reminder_type: String,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub is_completed: bool,
    pub days_until_due: i64,
    pub status: ReminderStatus,
}

enum VehicleLookup<'a> {
    Found(&'a Vehicle),
    Missing,
}

impl<'a> From<Option<&'a Vehicle>> for VehicleLookup<'a> {
    fn from(vehicle: Option<&'a Vehicle>) -> Self {
        vehicle.map_or(VehicleLookup::Missing, VehicleLookup::Found)
    }
}

impl VehicleLookup<'_> {
    fn display_name(&self) -> String {
        match self {
            VehicleLookup::Found(vehicle) => vehicle.display_name(),
            VehicleLookup::Missing => UNKNOWN_NAME.to_string(),
        }
    }
}

fn to_view(reminder: &Reminder, vehicle: VehicleLookup<'_>, today: NaiveDate) -> ReminderView {
    ReminderView {
        id: reminder.id,
        vehicle_id: reminder.vehicle_id,
        vehicle_name: vehicle.display_name(),
        reminder_type: reminder.reminder_type.clone(),
        due_date: reminder.due_date,
        notes: reminder.notes.clone(),
        is_completed: reminder.is_completed,
        days_until_due: days_until_due(reminder.due_date, today),
        status: classify(reminder.due_date, reminder.is_completed, today),
    }
}

/// Une cada recordatorio con su vehículo. Conserva el orden de entrada.
pub fn build_reminder_views(
    reminders: &[Reminder],
    vehicles: &[Vehicle],
    today: NaiveDate,
) -> Vec<ReminderView> {
    let by_id: HashMap<i64, &Vehicle> = vehicles.iter().map(|v| (v.id, v)).collect();

    reminders
        .iter()
        .map(|r| to_view(r, by_id.get(&r.vehicle_id).copied().into(), today))
        .collect()
}

/// Igual que [`build_reminder_views`] pero contra un único vehículo ya cargado.
pub fn build_reminder_views_for_vehicle(
    vehicle: Option<&Vehicle>,
    reminders: &[Reminder],
    today: NaiveDate,
) -> Vec<ReminderView> {
    reminders
        .iter()
        .map(|r| to_view(r, vehicle.into(), today))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_vehicles: usize,
    pub overdue_reminders: usize,
    pub upcoming_this_month: usize,
    // Cuenta todos los completados, no solo los del año: no se guarda la fecha de completado
    pub completed_this_year: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub stats: DashboardStats,
    pub upcoming_reminders: Vec<ReminderView>,
    pub overdue_reminders: Vec<ReminderView>,
}

pub fn build_dashboard(
    reminders: &[Reminder],
    vehicles: &[Vehicle],
    today: NaiveDate,
) -> DashboardSummary {
    let all = build_reminder_views(reminders, vehicles, today);
    let month_end = last_day_of_month(today);

    let mut overdue: Vec<ReminderView> = all
        .iter()
        .filter(|r| r.status == ReminderStatus::Overdue)
        .cloned()
        .collect();
    overdue.sort_by_key(|r| r.due_date);

    let mut upcoming: Vec<ReminderView> = all
        .iter()
        .filter(|r| !r.is_completed && r.due_date <= month_end && r.due_date >= today)
        .cloned()
        .collect();
    upcoming.sort_by_key(|r| r.due_date);
    upcoming.truncate(UPCOMING_LIMIT);

    DashboardSummary {
        stats: DashboardStats {
            total_vehicles: vehicles.len(),
            overdue_reminders: overdue.len(),
            // Se cuenta después de recortar a UPCOMING_LIMIT
            upcoming_this_month: upcoming.len(),
            completed_this_year: all.iter().filter(|r| r.is_completed).count(),
        },
        upcoming_reminders: upcoming,
        overdue_reminders: overdue,
    }
}
