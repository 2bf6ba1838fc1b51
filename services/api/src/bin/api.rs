//! services/api/src/bin/api.rs

use api_lib::{
    adapters::DbAdapter,
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, me_handler, register_handler},
        books::{
            create_book_handler, delete_book_handler, get_book_handler, list_books_handler,
            update_book_handler,
        },
        forecast::{
            book_forecast_handler, clear_pace_override_handler, overall_forecast_handler,
            set_pace_override_handler, what_if_handler,
        },
        progress::{
            create_progress_handler, delete_progress_handler, list_book_progress_handler,
            list_progress_handler, update_progress_handler,
        },
        require_auth,
        rest::{health_handler, ApiDoc},
        schedule::{
            create_schedule_handler, delete_schedule_handler, get_schedule_handler,
            list_schedule_handler, update_schedule_handler,
        },
        state::AppState,
    },
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
    });

    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(health_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/auth/me", get(me_handler))
        .route("/api/books", get(list_books_handler).post(create_book_handler))
        .route(
            "/api/books/{id}",
            get(get_book_handler)
                .put(update_book_handler)
                .delete(delete_book_handler),
        )
        .route("/api/progress", get(list_progress_handler).post(create_progress_handler))
        .route("/api/progress/book/{book_id}", get(list_book_progress_handler))
        .route(
            "/api/progress/{id}",
            axum::routing::put(update_progress_handler).delete(delete_progress_handler),
        )
        .route("/api/schedule", get(list_schedule_handler).post(create_schedule_handler))
        .route(
            "/api/schedule/{id}",
            get(get_schedule_handler)
                .put(update_schedule_handler)
                .delete(delete_schedule_handler),
        )
        .route("/api/forecast", get(overall_forecast_handler))
        .route("/api/forecast/{book_id}", get(book_forecast_handler))
        .route("/api/forecast/{book_id}/whatif", post(what_if_handler))
        .route(
            "/api/forecast/{book_id}/pace-override",
            axum::routing::put(set_pace_override_handler).delete(clear_pace_override_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
