mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header::{AUTHORIZATION, CONTENT_TYPE}},
    middleware,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use neighborly_ai::{AiService, GeminiClient};
use neighborly_api::middleware::attach_user;
use neighborly_api::schema::{build_schema, graphiql, graphql_handler};
use neighborly_api::state::{AppState, AppStateInner};
use neighborly_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "neighborly=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.gemini.api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; community AI queries will fail");
    }

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);
    info!("Database ready at {}", config.db_path.display());

    let model = Arc::new(GeminiClient::new(config.gemini.clone())?);
    let app_state: AppState = Arc::new(AppStateInner {
        ai: AiService::from_database(db.clone(), model),
        db,
        jwt_secret: config.jwt_secret.clone(),
    });
    let schema = build_schema(app_state.clone());

    let origins = config
        .cors_origins
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let graphql_routes = Router::new()
        .route("/graphql", post(graphql_handler).get(graphiql))
        .layer(middleware::from_fn_with_state(app_state, attach_user))
        .with_state(schema);

    let app = Router::new()
        .merge(graphql_routes)
        .route("/health", get(|| async { "ok" }))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Neighborly server listening on {}", addr);
    info!("GraphiQL available at http://{}/graphql", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
