mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use nagarsur_api::auth::{AppState, AppStateInner};
use nagarsur_db::{Database, SqliteStore};
use nagarsur_functions::{DisabledPush, FcmClient, ReactionContext, Runtime};
use nagarsur_types::PushGateway;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nagarsur=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);
    let store = SqliteStore::new(db.clone());

    // Push gateway
    let push: Arc<dyn PushGateway> = match &config.fcm_server_key {
        Some(key) => {
            info!("Push delivery via {}", config.fcm_endpoint);
            Arc::new(FcmClient::new(key.clone(), Some(config.fcm_endpoint.clone())))
        }
        None => {
            warn!("NAGARSUR_FCM_SERVER_KEY not set, push delivery disabled");
            Arc::new(DisabledPush)
        }
    };

    // Reactions, subscribed before any request can write
    let ctx = ReactionContext::new(Arc::new(store.clone()), push, Arc::new(store))
        .with_settings(config.notifications.clone());
    let runtime = Runtime::new(ctx)?;
    tokio::spawn(runtime.run(db.feed()));

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner::new(
        db,
        config.jwt_secret.clone(),
        config.admin_users.clone(),
    ));

    let app = nagarsur_api::router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Nagarsur server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
