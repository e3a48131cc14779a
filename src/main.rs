use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{delete, get, patch, post},
    Router,
};
use dotenvy::dotenv;
use std::env;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

mod clock;
mod config;
mod dates;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod notify;
mod reminders;
mod seed;
mod state;

#[cfg(test)]
mod tests;

use clock::{Clock, SystemClock};
use config::Config;
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::vehicles::get_vehicles,
        handlers::vehicles::get_vehicle,
        handlers::vehicles::get_vehicle_reminders,
        handlers::vehicles::create_vehicle,
        handlers::vehicles::update_vehicle,
        handlers::vehicles::delete_vehicle,
        handlers::vehicles::share_vehicle,
        handlers::vehicles::unshare_vehicle,
        handlers::vehicles::get_share_candidates,
        handlers::reminders::get_reminders,
        handlers::reminders::get_reminder,
        handlers::reminders::create_reminder,
        handlers::reminders::update_reminder,
        handlers::reminders::complete_reminder,
        handlers::reminders::delete_reminder,
        handlers::reminder_types::get_reminder_types,
        handlers::reminder_types::get_reminder_type,
        handlers::reminder_types::create_reminder_type,
        handlers::reminder_types::update_reminder_type,
        handlers::reminder_types::delete_reminder_type,
        handlers::dashboard::get_dashboard,
        handlers::users::get_settings,
        handlers::users::update_settings,
        handlers::car_images::get_car_image
    ),
    components(
        schemas(
            models::RegisterRequest,
            models::LoginRequest,
            models::LoginResponse,
            models::VehicleDto,
            models::SharedUserDto,
            models::CreateVehicleRequest,
            models::ShareVehicleRequest,
            models::CreateReminderRequest,
            models::UpdateReminderRequest,
            models::ReminderTypeDto,
            models::CreateReminderTypeRequest,
            models::UserSettingsResponse,
            models::UpdateUserSettingsRequest,
            models::CarImageResponse,
            reminders::ReminderView,
            reminders::ReminderStatus,
            reminders::DashboardStats,
            reminders::DashboardSummary
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "vehicles", description = "Vehicle management and sharing"),
        (name = "reminders", description = "Reminder management with derived status"),
        (name = "reminder types", description = "Reminder type catalogue"),
        (name = "dashboard", description = "Dashboard summary"),
        (name = "user", description = "Notification settings of the current user")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Inicializar tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info,car_monitor=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Conectar a base de datos
    let pool = db::establish_connection(&config.database_url).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    if config.seed_demo_data {
        seed::seed_demo_data(&pool, clock.today()).await?;
    }

    let addr = config.bind_addr;
    let state = AppState::new(pool, config, clock);

    notify::jobs::spawn_scheduled_jobs(state.clone());

    let app = create_app(state);

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let api = Router::new()
        // Rutas públicas
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/carimages", get(handlers::car_images::get_car_image))
        // Rutas protegidas
        .route(
            "/vehicles",
            get(handlers::vehicles::get_vehicles).post(handlers::vehicles::create_vehicle),
        )
        .route("/vehicles/users", get(handlers::vehicles::get_share_candidates))
        .route(
            "/vehicles/:id",
            get(handlers::vehicles::get_vehicle)
                .put(handlers::vehicles::update_vehicle)
                .delete(handlers::vehicles::delete_vehicle),
        )
        .route(
            "/vehicles/:id/reminders",
            get(handlers::vehicles::get_vehicle_reminders),
        )
        .route("/vehicles/:id/share", post(handlers::vehicles::share_vehicle))
        .route(
            "/vehicles/:id/share/:user_id",
            delete(handlers::vehicles::unshare_vehicle),
        )
        .route(
            "/reminders",
            get(handlers::reminders::get_reminders).post(handlers::reminders::create_reminder),
        )
        .route(
            "/reminders/:id",
            get(handlers::reminders::get_reminder)
                .put(handlers::reminders::update_reminder)
                .delete(handlers::reminders::delete_reminder),
        )
        .route(
            "/reminders/:id/complete",
            patch(handlers::reminders::complete_reminder),
        )
        .route(
            "/remindertypes",
            get(handlers::reminder_types::get_reminder_types)
                .post(handlers::reminder_types::create_reminder_type),
        )
        .route(
            "/remindertypes/:id",
            get(handlers::reminder_types::get_reminder_type)
                .put(handlers::reminder_types::update_reminder_type)
                .delete(handlers::reminder_types::delete_reminder_type),
        )
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .route(
            "/user/settings",
            get(handlers::users::get_settings).put(handlers::users::update_settings),
        );

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(|| async { "CarMonitor API is running!" }))
        .nest("/api", api)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
