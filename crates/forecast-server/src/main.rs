mod api;
mod config;
mod db;
mod error;
mod prediction;
mod session;
mod workflow;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use forecast_core::{CredentialVerifier, ForecastKind, StaticCredentialVerifier};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::db::{create_store, ForecastStore};
use crate::prediction::{HttpPredictionClient, PredictionInvoker};
use crate::session::SessionRegistry;
use crate::workflow::ForecastWorkflow;

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<ForecastWorkflow>,
    pub store: Arc<dyn ForecastStore>,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub sessions: SessionRegistry,
}

/// Used when `RUST_LOG` is unset. Covers the domain crate so builder warnings show.
const DEFAULT_LOG_FILTER: &str = "forecast_desk=info,forecast_core=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();

    println!("================================================");
    println!("         FORECAST DESK - Starting Up            ");
    println!("================================================");

    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    println!("[CONFIG] Server: {}:{}", config.server.host, config.server.port);
    println!(
        "[CONFIG] Database: {:?} {}:{}/{}",
        config.database.backend, config.database.host, config.database.port, config.database.database
    );
    println!("[CONFIG] Prediction API: {}", config.prediction.api_url);

    for kind in ForecastKind::ALL {
        match config.prediction.route(kind) {
            None => {
                println!("[CONFIG] {} deployment: *** NOT CONFIGURED ***", kind.label());
                tracing::warn!(kind = %kind, "No deployment route configured");
            }
            Some(route) if route.deployment_token.is_empty() => {
                println!(
                    "[CONFIG] {} deployment: {} (token *** EMPTY - PLEASE SET FORECAST__PREDICTION__ROUTES__{}__DEPLOYMENT_TOKEN ***)",
                    kind.label(),
                    route.deployment_id,
                    kind.slug().to_uppercase()
                );
                tracing::warn!(kind = %kind, "Deployment token is empty");
            }
            Some(route) => {
                println!("[CONFIG] {} deployment: {}", kind.label(), route.deployment_id);
            }
        }
    }

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting Forecast Desk"
    );

    // Initialize store
    println!("[DB] Initializing {:?} store...", config.database.backend);
    let store = create_store(&config.database);

    match store.health_check().await {
        Ok(_) => {
            println!("[DB] {} connected successfully", store.backend_name());
            tracing::info!(backend = store.backend_name(), "Connected to store");
        }
        Err(e) => {
            println!("[DB] WARNING: {} not available - {}", store.backend_name(), e);
            tracing::warn!(error = %e, "Store not available, tables will be provisioned on first submission");
        }
    }

    // Prediction client and workflow
    let client = HttpPredictionClient::new(&config.prediction)
        .map_err(|e| anyhow::anyhow!("Failed to build prediction client: {}", e))?;
    let invoker = PredictionInvoker::new(Arc::new(client), config.prediction.routes.clone());
    let workflow = Arc::new(ForecastWorkflow::new(invoker, Arc::clone(&store)));

    println!("[DB] Provisioning forecast tables...");
    for (kind, outcome) in workflow.provisioner().ensure_all().await {
        match outcome {
            Ok(outcome) => {
                tracing::info!(table = %kind.table_name(), outcome = ?outcome, "Table ready");
            }
            Err(e) => {
                println!("[DB] WARNING: could not provision {} - {}", kind.table_name(), e);
                tracing::warn!(table = %kind.table_name(), error = %e, "Table provisioning deferred");
            }
        }
    }

    // Operator authentication
    let verifier = StaticCredentialVerifier::new(config.auth.users.clone());
    if verifier.user_count() == 0 {
        println!("[AUTH] *** NO USERS CONFIGURED - PLEASE SET auth.users IN config/local.toml ***");
        tracing::warn!("No operator accounts configured, every login will be rejected");
    } else {
        println!("[AUTH] {} operator account(s) loaded", verifier.user_count());
    }

    let state = AppState {
        workflow,
        store,
        verifier: Arc::new(verifier),
        sessions: SessionRegistry::new(&config.session),
    };

    println!("[ROUTER] Setting up API routes...");
    let app = Router::new()
        .merge(api::create_router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    println!("[ROUTER] Routes configured: /health, /api/v1/login, /api/v1/logout, /api/v1/forecasts/*");

    let addr: SocketAddr = config.server_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("================================================");
    println!("  Server listening on http://{}", addr);
    println!("================================================");
    println!();

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
