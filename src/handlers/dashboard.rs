use axum::{extract::State, Json};

use crate::{
    db,
    error::AppError,
    middleware::CurrentUser,
    reminders::{build_dashboard, DashboardSummary},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Summary of the user's vehicles and reminders", body = DashboardSummary),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer" = [])),
    tag = "dashboard"
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<DashboardSummary>, AppError> {
    let today = state.clock.today();
    let snapshot = db::snapshot_for_user(&state.pool, user.id).await?;

    Ok(Json(build_dashboard(
        &snapshot.reminders,
        &snapshot.vehicles,
        today,
    )))
}
