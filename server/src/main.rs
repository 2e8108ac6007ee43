use std::net::SocketAddr;

use app_http::{AppHandlers, AppServices};
use axum::{
    Router, http::StatusCode, response::IntoResponse, routing::get,
};
use event_enrichment::Enricher;
use events_http::{EventHandlers, EventServices};
use redis_connection::{CacheConnect, config::RedisDbConfig, connect_redis_db};
use sql_connection::{
    SqlConnect, config::PostgresDbConfig, connect_postgres_db,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Initializing connection pools...");

    let db_config = PostgresDbConfig::from_env();
    let pg_pool = connect_postgres_db(&db_config).await?;
    let db = SqlConnect::new(pg_pool);
    info!("PostgreSQL connection pool initialized");

    let redis_config = RedisDbConfig::from_env();
    let redis_pool = connect_redis_db(&redis_config).await?;
    let cache = CacheConnect::new(redis_pool);
    info!("Redis connection pool initialized");

    let app_services = AppServices::new(db.clone());
    let event_services =
        EventServices::new(db.clone(), cache, Enricher::default());

    let api_routes = Router::new()
        .nest("/apps", AppHandlers::routes().with_state(app_services))
        .merge(EventHandlers::routes().with_state(event_services));

    let app = Router::new()
        .route("/", get(health_check))
        .with_state(db)
        .nest("/api", api_routes)
        .merge(RapiDoc::new("/api-docs/openapi.json").path("/docs"))
        .route(
            "/api-docs/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8880);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Beacon server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        app_http::register_app,
        app_http::revoke_app,
        app_http::regenerate_key,
        events_http::track::track_event,
        events_http::stats::event_stats,
        events_http::stats::user_stats,
        events_http::stats::app_stats,
        events_http::stats::realtime_stats,
    ),
    components(
        schemas(
            app_models::RegisterAppRequest,
            app_models::AppResponse,
            app_models::IssuedAppResponse,
            app_models::AppKind,
            app_http::OwnerRequest,
            events_models::TrackRequest,
            events_models::DeviceClass,
            events_models::EnrichmentMetadata,
            events_command_handlers::TrackEventResponse,
            analytics_models::EventSummary,
            analytics_models::DeviceBreakdown,
            analytics_models::Trend,
            analytics_models::UserStats,
            analytics_models::AppAnalytics,
            analytics_models::RealtimeWindow,
            common_errors::ApiErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "apps", description = "Application registration and key lifecycle"),
        (name = "events", description = "Event ingestion"),
        (name = "stats", description = "Aggregated statistics")
    ),
    info(
        title = "Beacon API",
        description = "Authenticated event ingestion and aggregation service",
        version = "1.0.0"
    )
)]
struct ApiDoc;

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check with connection pool status", body = String)
    ),
    tag = "health"
)]
async fn health_check(
    axum::extract::State(db): axum::extract::State<SqlConnect>,
) -> impl IntoResponse {
    let (available, size) = db.pool_status();
    (StatusCode::OK, format!("OK - Pool: {available}/{size} available"))
}
