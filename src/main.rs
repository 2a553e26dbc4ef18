use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use drinks_api::auth::JwtVerifier;
use drinks_api::config::{self, AppConfig};
use drinks_api::database::{DatabaseManager, DrinkRepository};
use drinks_api::is_development;
use drinks_api::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "drinks-api")]
#[command(about = "Drinks menu REST API", long_about = None)]
#[command(version)]
struct Args {
    /// Port to listen on (overrides DRINKS_API_PORT / PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Interface to bind (overrides DRINKS_API_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Drop the drinks table, recreate it and seed a sample drink
    #[arg(long)]
    reset_db: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up AUTH0_DOMAIN, API_AUDIENCE, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drinks_api=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let config = apply_args(config::config().clone(), &args);
    config.validate().context("invalid configuration")?;

    tracing::info!("Starting Drinks API in {:?} mode", config.environment);
    if is_development!() {
        tracing::debug!("Configuration: {:?}", config);
    }

    let pool = DatabaseManager::connect(&config.database)
        .await
        .with_context(|| format!("failed to open database {}", config.database.url))?;
    if config.database.reset_on_startup {
        tracing::warn!("Resetting drinks table");
        DatabaseManager::reset(&pool).await.context("failed to reset database")?;
    } else {
        DatabaseManager::ensure_schema(&pool).await.context("failed to create schema")?;
    }

    let verifier = JwtVerifier::from_config(&config.auth).context("invalid auth configuration")?;
    // Warm the key cache; tokens still verify later once the provider is reachable
    if let Err(e) = verifier.keys().refresh().await {
        tracing::warn!("Could not prefetch signing keys: {}", e);
    }

    let state = AppState::new(DrinkRepository::new(pool), verifier);
    let app = drinks_api::app(state, &config.api, &config.security);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Drinks API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Drinks API stopped");
    Ok(())
}

fn apply_args(mut config: AppConfig, args: &Args) -> AppConfig {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(url) = &args.database_url {
        config.database.url = url.clone();
    }
    if args.reset_db {
        config.database.reset_on_startup = true;
    }
    config
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
