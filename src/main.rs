use anyhow::Context;
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;

use config::Config;
use services::aggregator::Aggregator;
use services::generator::ContentGenerator;
use services::lifecycle::ReportService;
use services::pipeline::ReportPipeline;
use services::scheduler::ReportScheduler;
use services::store::JournalStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub journal: Arc<dyn JournalStore>,
    pub reports: ReportService,
    pub pipeline: ReportPipeline,
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz));

    let protected_routes = Router::new()
        // Journal
        .route("/api/moods", post(handlers::journal::upsert_mood))
        .route("/api/ratings", post(handlers::journal::upsert_rating))
        .route("/api/victories", post(handlers::journal::create_victory))
        // Reports
        .route("/api/reports", get(handlers::reports::list_reports))
        .route("/api/reports/latest", get(handlers::reports::latest_report))
        .route("/api/reports/status", get(handlers::reports::generation_status))
        .route(
            "/api/reports/generate",
            post(handlers::reports::generate_report),
        )
        .route("/api/reports/:id", get(handlers::reports::get_report))
        .route("/api/reports/:id", delete(handlers::reports::delete_report))
        .route(
            "/api/reports/:id/feedback",
            post(handlers::reports::submit_feedback),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodarc_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations applied");

    let journal = Arc::new(db::PgJournal::new(pool.clone()));
    let reports = ReportService::new(
        Arc::new(db::PgReportStore::new(pool)),
        config.report_daily_quota,
    );
    let generator = ContentGenerator::from_config(&config);
    tracing::info!(
        external_model = generator.is_generation_enabled(),
        model = generator.model(),
        "Report generation configured"
    );
    let pipeline = ReportPipeline::new(Aggregator::new(journal.clone()), generator, reports.clone());

    if config.report_scheduler_enabled {
        ReportScheduler::new(
            pipeline.clone(),
            journal.clone(),
            config.report_schedule_hour_utc,
        )
        .spawn();
    }

    let state = AppState {
        config: config.clone(),
        journal,
        reports,
        pipeline,
    };

    let mut origins = vec![config
        .frontend_url
        .parse::<axum::http::HeaderValue>()
        .context("FRONTEND_URL is not a valid origin")?];
    if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
        for o in extra.split(',') {
            if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                origins.push(hv);
            }
        }
    }
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true);

    let app = router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
