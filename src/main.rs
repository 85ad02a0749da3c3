use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use talent_event_api::{config::Config, db, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::init_schema(&pool).await?;
    info!("Database connected and schema provisioned");

    let state = AppState {
        db: pool,
        config: config.clone(),
    };

    // Allow the configured base URL; localhost always passes for development.
    let base_url = config.app_base_url.clone();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let o = match origin.to_str() {
            Ok(s) => s,
            Err(_) => return false,
        };
        o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") || o == base_url
    });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static("x-admin-key"),
        ]))
        .allow_origin(cors_origin);

    let app = Router::new()
        // Public registration flow
        .route("/", get(routes::pages::registration_form))
        .route("/submit", post(routes::registration::submit_registration))
        .route("/confirmation", get(routes::pages::confirmation))
        .route("/health", get(routes::health::health_check))
        // Admin API
        .route("/admin-api/stats", get(routes::stats::registration_stats))
        .route("/admin-api/stats/daily", get(routes::stats::daily_stats))
        .route("/admin-api/registrations", get(routes::admin::list_registrations))
        .route(
            "/admin-api/registrations/{id}/activities",
            get(routes::admin::registration_activities),
        )
        .route("/admin-api/registrations/bulk", post(routes::admin::bulk_action))
        .route("/admin-api/export/csv", post(routes::admin::export_csv))
        .route("/admin-api/export/xlsx", post(routes::admin::export_xlsx))
        .route("/admin-api/export/photos", post(routes::admin::export_photos))
        .route("/admin-api/photos/{*path}", get(routes::admin::serve_photo))
        .route("/admin-api/config", get(routes::admin::site_config))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Global body size limit of 100 MB (covers photo uploads)
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("talent-event API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
