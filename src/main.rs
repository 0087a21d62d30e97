use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vote_ledger::api::{self, AppState};
use vote_ledger::config::AppConfig;
use vote_ledger::database::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vote_ledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting vote ledger");

    // Load configuration
    let config = AppConfig::load()?;
    info!("Configuration loaded (election {})", config.election_id);

    // Initialize database
    let database = Database::connect(&config.database_url, config.max_connections).await?;
    info!("Database connected");

    database.run_migrations().await?;
    info!("Database migrations completed");

    let state = AppState::new(config.clone(), database);

    // Genesis is created once; later starts find it and do nothing.
    let genesis = state.ledger().initialize().await?;
    info!("Ledger ready, genesis {}", genesis.hash);

    let app = api::router(state);

    let addr = config.bind_address();
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
