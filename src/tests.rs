use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt; // for `oneshot`

use crate::{clock::FixedClock, config::Config, create_app, db, state::AppState};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

async fn setup_app() -> Router {
    setup_app_with_pool().await.0
}

async fn setup_app_with_pool() -> (Router, SqlitePool) {
    // Base SQLite en memoria con las migraciones aplicadas
    let pool = db::memory_pool().await;

    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("sqlite::memory:".to_string()),
        "SECRET_KEY" => Some("test-secret-key-with-enough-length".to_string()),
        _ => None,
    })
    .unwrap();

    let app = create_app(AppState::new(pool.clone(), config, Arc::new(FixedClock(today()))));
    (app, pool)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body_json = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, body_json)
}

async fn register(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": username, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    body["token"].as_str().unwrap().to_string()
}

async fn create_vehicle(app: &Router, token: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/vehicles",
        Some(token),
        Some(json!({
            "make": "Volvo",
            "model": "XC60",
            "year": 2021,
            "licensePlate": "ABC 123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    body["id"].as_i64().unwrap()
}

async fn create_reminder(app: &Router, token: &str, vehicle_id: i64, kind: &str, due: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/reminders",
        Some(token),
        Some(json!({ "vehicleId": vehicle_id, "type": kind, "dueDate": due })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    body
}

#[tokio::test]
async fn test_register_user() {
    let app = setup_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": "alice",
            "password": "password123",
            "email": "alice@example.com"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert!(body["token"].is_string());
    assert!(body["expiresAt"].is_string());
}

#[tokio::test]
async fn test_register_rejects_short_password_and_duplicates() {
    let app = setup_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "bob", "password": "12345" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at least 6"));

    register(&app, "bob").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "BOB", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_concurrent_registration_of_same_username() {
    let app = setup_app().await;
    let payload = || Some(json!({ "username": "race", "password": "password123" }));

    let ((status_a, _), (status_b, body_b)) = tokio::join!(
        send(&app, "POST", "/api/auth/register", None, payload()),
        send(&app, "POST", "/api/auth/register", None, payload()),
    );

    let mut statuses = vec![status_a.as_u16(), status_b.as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, vec![200, 409], "second body: {}", body_b);
}

#[tokio::test]
async fn test_username_uniqueness_ignores_unicode_case() {
    let app = setup_app().await;
    register(&app, "Ärne").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "ärne", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Username already exists");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "ÄRNE", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "Ärne");
}

#[tokio::test]
async fn test_login_user() {
    let app = setup_app().await;

    // 1. Register
    register(&app, "carol").await;

    // 2. Login
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "carol", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("token").is_some());

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "carol", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = setup_app().await;

    let (status, body) = send(&app, "GET", "/api/dashboard", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, "GET", "/api/vehicles", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_vehicle_crud() {
    let app = setup_app().await;
    let token = register(&app, "dave").await;

    let id = create_vehicle(&app, &token).await;

    let (status, body) = send(&app, "GET", &format!("/api/vehicles/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["licensePlate"], "ABC 123");
    assert_eq!(body["isOwner"], true);
    assert_eq!(body["ownerName"], "dave");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/vehicles/{}", id),
        Some(&token),
        Some(json!({
            "make": "Volvo",
            "model": "XC90",
            "year": 2022,
            "licensePlate": "ABC 123",
            "color": "Blue"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "XC90");
    assert_eq!(body["color"], "Blue");

    let (status, _) = send(
        &app,
        "POST",
        "/api/vehicles",
        Some(&token),
        Some(json!({ "make": "Volvo", "model": "", "licensePlate": "X" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/api/vehicles", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_private_vehicle_is_hidden_from_other_users() {
    let app = setup_app().await;
    let owner = register(&app, "erin").await;
    let stranger = register(&app, "frank").await;

    let id = create_vehicle(&app, &owner).await;

    let (status, _) = send(&app, "GET", &format!("/api/vehicles/{}", id), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", "/api/vehicles", Some(&stranger), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_reminders_of_private_vehicle_are_hidden_from_other_users() {
    let app = setup_app().await;
    let owner = register(&app, "quentin").await;
    let stranger = register(&app, "rupert").await;

    let vehicle_id = create_vehicle(&app, &owner).await;
    let reminder = create_reminder(&app, &owner, vehicle_id, "Insurance", "2024-06-05").await;
    create_reminder(&app, &owner, vehicle_id, "Service", "2024-06-20").await;
    let reminder_uri = format!("/api/reminders/{}", reminder["id"]);

    let (status, body) = send(&app, "GET", "/api/reminders", Some(&stranger), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = send(&app, "GET", &reminder_uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PUT",
        &reminder_uri,
        Some(&stranger),
        Some(json!({ "dueDate": "2024-12-01", "isCompleted": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("{}/complete", reminder_uri),
        Some(&stranger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &reminder_uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/reminders",
        Some(&stranger),
        Some(json!({ "vehicleId": vehicle_id, "type": "Service", "dueDate": "2024-07-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/api/dashboard", Some(&stranger), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "stats": {
                "totalVehicles": 0,
                "overdueReminders": 0,
                "upcomingThisMonth": 0,
                "completedThisYear": 0
            },
            "upcomingReminders": [],
            "overdueReminders": []
        })
    );

    // Nada de lo anterior tocó el recordatorio del dueño
    let (status, body) = send(&app, "GET", &reminder_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dueDate"], "2024-06-05");
    assert_eq!(body["status"], "overdue");
}

#[tokio::test]
async fn test_share_and_unshare_vehicle() {
    let app = setup_app().await;
    let owner = register(&app, "grace").await;
    let friend = register(&app, "heidi").await;

    let id = create_vehicle(&app, &owner).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/vehicles/{}/share", id),
        Some(&owner),
        Some(json!({ "username": "heidi" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let friend_id = body["userId"].as_i64().unwrap();

    let (status, body) = send(&app, "GET", &format!("/api/vehicles/{}", id), Some(&friend), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isOwner"], false);
    assert_eq!(body["sharedWith"][0]["username"], "heidi");

    // Compartido no es dueño: no puede borrar
    let (status, _) = send(&app, "DELETE", &format!("/api/vehicles/{}", id), Some(&friend), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/vehicles/{}/share", id),
        Some(&owner),
        Some(json!({ "username": "grace" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/vehicles/{}/share/{}", id, friend_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/vehicles/{}", id), Some(&friend), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", "/api/vehicles/users", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["username"], "heidi");
}

#[tokio::test]
async fn test_create_reminder_normalizes_type() {
    let app = setup_app().await;
    let token = register(&app, "ivan").await;
    let vehicle_id = create_vehicle(&app, &token).await;

    let body = create_reminder(&app, &token, vehicle_id, "insurance", "2024-06-13").await;

    assert_eq!(body["type"], "Insurance");
    assert_eq!(body["vehicleName"], "Volvo XC60 (ABC 123)");
    assert_eq!(body["dueDate"], "2024-06-13");
    assert_eq!(body["daysUntilDue"], 3);
    assert_eq!(body["status"], "urgent");
    assert_eq!(body["isCompleted"], false);
}

#[tokio::test]
async fn test_create_reminder_rejects_unknown_type_and_vehicle() {
    let app = setup_app().await;
    let token = register(&app, "judy").await;
    let vehicle_id = create_vehicle(&app, &token).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/reminders",
        Some(&token),
        Some(json!({ "vehicleId": vehicle_id, "type": "Parking", "dueDate": "2024-07-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Valid types: Insurance"));

    let (status, body) = send(
        &app,
        "POST",
        "/api/reminders",
        Some(&token),
        Some(json!({ "vehicleId": 999, "type": "Service", "dueDate": "2024-07-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Vehicle not found");

    let (status, _) = send(
        &app,
        "POST",
        "/api/reminders",
        Some(&token),
        Some(json!({ "vehicleId": vehicle_id, "type": "Service", "dueDate": "not-a-date" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_due_date_with_time_counts_as_calendar_day() {
    let app = setup_app().await;
    let token = register(&app, "ken").await;
    let vehicle_id = create_vehicle(&app, &token).await;

    let body = create_reminder(&app, &token, vehicle_id, "Service", "2024-06-10T23:30:00Z").await;

    assert_eq!(body["dueDate"], "2024-06-10");
    assert_eq!(body["daysUntilDue"], 0);
    assert_eq!(body["status"], "urgent");
}

#[tokio::test]
async fn test_update_complete_and_delete_reminder() {
    let app = setup_app().await;
    let token = register(&app, "laura").await;
    let vehicle_id = create_vehicle(&app, &token).await;

    let reminder = create_reminder(&app, &token, vehicle_id, "RoadTax", "2024-06-01").await;
    let id = reminder["id"].as_i64().unwrap();
    assert_eq!(reminder["status"], "overdue");
    assert_eq!(reminder["daysUntilDue"], -9);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/reminders/{}", id),
        Some(&token),
        Some(json!({ "dueDate": "2024-08-01", "notes": "Pay online" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["notes"], "Pay online");

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/reminders/{}/complete", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["isCompleted"], true);

    let (status, _) = send(&app, "DELETE", &format!("/api/reminders/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/reminders/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vehicle_reminders_and_cascade_delete() {
    let (app, pool) = setup_app_with_pool().await;
    let token = register(&app, "mallory").await;
    let friend = register(&app, "oscar").await;
    let vehicle_id = create_vehicle(&app, &token).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/vehicles/{}/share", vehicle_id),
        Some(&token),
        Some(json!({ "username": "oscar" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    create_reminder(&app, &token, vehicle_id, "Insurance", "2024-06-20").await;
    create_reminder(&app, &token, vehicle_id, "Inspection", "2024-09-01").await;

    let uri = format!("/api/vehicles/{}/reminders", vehicle_id);
    let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let statuses: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["warning", "ok"]);

    let (status, body) = send(&app, "GET", &uri, Some(&friend), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "DELETE", &format!("/api/vehicles/{}", vehicle_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // El permiso compartido desaparece con el vehículo
    let (shares,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vehicle_shares WHERE vehicle_id = ?")
        .bind(vehicle_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(shares, 0);

    let (status, body) = send(&app, "GET", "/api/reminders", Some(&friend), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = send(&app, "GET", &uri, Some(&friend), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", "/api/reminders", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_summary() {
    let app = setup_app().await;
    let token = register(&app, "niaj").await;
    let vehicle_id = create_vehicle(&app, &token).await;

    create_reminder(&app, &token, vehicle_id, "Insurance", "2024-06-05").await;
    create_reminder(&app, &token, vehicle_id, "Inspection", "2024-06-13").await;
    create_reminder(&app, &token, vehicle_id, "RoadTax", "2024-06-25").await;
    create_reminder(&app, &token, vehicle_id, "Service", "2024-07-25").await;
    let done = create_reminder(&app, &token, vehicle_id, "Service", "2024-06-12").await;
    send(
        &app,
        "PATCH",
        &format!("/api/reminders/{}/complete", done["id"]),
        Some(&token),
        None,
    )
    .await;

    let (status, body) = send(&app, "GET", "/api/dashboard", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        body["stats"],
        json!({
            "totalVehicles": 1,
            "overdueReminders": 1,
            "upcomingThisMonth": 2,
            "completedThisYear": 1
        })
    );
    assert_eq!(body["overdueReminders"][0]["dueDate"], "2024-06-05");
    assert_eq!(body["overdueReminders"][0]["daysUntilDue"], -5);
    assert_eq!(body["upcomingReminders"][0]["type"], "Inspection");
    assert_eq!(body["upcomingReminders"][1]["type"], "RoadTax");
}

#[tokio::test]
async fn test_reminder_types() {
    let app = setup_app().await;
    let token = register(&app, "olivia").await;

    let (status, body) = send(&app, "GET", "/api/remindertypes", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 4);
    let default_id = body[0]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/remindertypes/{}", default_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/remindertypes",
        Some(&token),
        Some(json!({ "name": "Parking" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["icon"], "default");
    assert_eq!(body["color"], "#6366f1");
    assert_eq!(body["isDefault"], false);

    // El tipo nuevo ya es válido para recordatorios
    let vehicle_id = create_vehicle(&app, &token).await;
    let reminder = create_reminder(&app, &token, vehicle_id, "parking", "2024-07-01").await;
    assert_eq!(reminder["type"], "Parking");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/remindertypes/{}", body["id"]),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_user_settings() {
    let app = setup_app().await;
    let token = register(&app, "peggy").await;

    let (status, body) = send(&app, "GET", "/api/user/settings", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["smsNotificationsEnabled"], false);
    assert_eq!(body["email"], Value::Null);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/user/settings",
        Some(&token),
        Some(json!({
            "email": "peggy@example.com",
            "phoneNumber": "+46701234567",
            "smsNotificationsEnabled": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "peggy@example.com");
    assert_eq!(body["phoneNumber"], "+46701234567");
    assert_eq!(body["smsNotificationsEnabled"], true);
}

#[tokio::test]
async fn test_car_image_without_api_key() {
    let app = setup_app().await;

    let (status, body) = send(&app, "GET", "/api/carimages?make=Volvo&model=XC60&year=2021", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imageUrl"], Value::Null);
}
