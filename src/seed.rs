use chrono::{Duration, NaiveDate};
use sqlx::SqlitePool;

use crate::{db, handlers::auth::hash_password, models::PUBLIC_OWNER_ID};

/// Datos de demostración: usuario `demo` y dos vehículos públicos con
/// recordatorios repartidos alrededor de `today`. No hace nada si ya hay vehículos.
pub async fn seed_demo_data(pool: &SqlitePool, today: NaiveDate) -> anyhow::Result<()> {
    let (vehicle_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vehicles")
        .fetch_one(pool)
        .await?;
    if vehicle_count > 0 {
        return Ok(());
    }

    if db::get_user_by_username(pool, "demo").await?.is_none() {
        let password_hash = hash_password("demo123")?;
        db::insert_user(
            pool,
            "demo",
            &password_hash,
            Some("demo@example.com".to_string()),
            None,
        )
        .await?;
    }

    let vehicles = [
        ("Volvo", "XC60", 2021, "ABC 123", "YV1UZ8256N1234567", "Black", "Family SUV"),
        ("Tesla", "Model 3", 2023, "EV 456", "5YJ3E1EA1NF123456", "White", "Daily commuter"),
    ];
    let reminders = [
        [
            ("Insurance", -5, "Annual insurance renewal"),
            ("Inspection", 10, "Yearly inspection"),
            ("RoadTax", 45, "Road tax due"),
            ("Service", 90, "30,000 km service"),
        ],
        [
            ("Insurance", 3, "Insurance expires soon"),
            ("Inspection", -10, "Overdue inspection!"),
            ("RoadTax", 120, "Quarterly road tax"),
            ("Service", 25, "Tire rotation"),
        ],
    ];

    let mut tx = pool.begin().await?;
    for ((make, model, year, plate, vin, color, notes), vehicle_reminders) in
        vehicles.into_iter().zip(reminders)
    {
        let vehicle_id = sqlx::query(
            "INSERT INTO vehicles (user_id, make, model, year, license_plate, vin, color, notes)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(PUBLIC_OWNER_ID)
        .bind(make)
        .bind(model)
        .bind(year)
        .bind(plate)
        .bind(vin)
        .bind(color)
        .bind(notes)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for (reminder_type, due_in_days, notes) in vehicle_reminders {
            sqlx::query(
                "INSERT INTO reminders (vehicle_id, type, due_date, notes, is_completed)
                 VALUES (?, ?, ?, ?, 0)",
            )
            .bind(vehicle_id)
            .bind(reminder_type)
            .bind(today + Duration::days(due_in_days))
            .bind(notes)
            .execute(&mut *tx)
            .await?;
        }
    }
    tx.commit().await?;

    tracing::info!("Development seed data added");
    Ok(())
}
