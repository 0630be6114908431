use std::net::SocketAddr;

use anyhow::Context;
use storage::Database;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod features;
mod middleware;
mod routes;
mod state;

use config::Config;
use features::{health, workouts};
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        workouts::handlers::create_workout,
        workouts::handlers::list_workouts,
        workouts::handlers::get_workout,
        workouts::handlers::delete_workout,
        health::handlers::health_check,
    ),
    components(
        schemas(
            storage::dto::workout::CreateWorkoutRequest,
            storage::dto::workout::MessageResponse,
            storage::models::Workout,
            storage::models::SwingStyle,
            storage::models::SwingWorkoutType,
            storage::models::GetupWorkoutType,
            health::handlers::HealthResponse,
        )
    ),
    tags(
        (name = "workouts", description = "Workout log endpoints"),
        (name = "health", description = "Liveness probe"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting workout tracker API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    tracing::info!("Configuration loaded successfully");

    config.ensure_database_dir()?;
    tracing::info!("Connecting to database at: {}", config.database_url);
    let db = Database::with_options(&config.database_url, &config.database_options())
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    // Startup continues on a failed migration; store errors surface per request.
    match db.run_migrations().await {
        Ok(report) => tracing::info!(
            from_version = report.from_version,
            to_version = report.to_version,
            "Database migrations completed successfully"
        ),
        Err(e) => tracing::error!("Database migration failed: {}", e),
    }

    let state = AppState::new(db, config.rate_limits);

    let app = routes::router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let bind_address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;

    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
