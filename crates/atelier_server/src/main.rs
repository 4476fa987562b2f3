use anyhow::Result;
use atelier_error::{ServerError, ServerErrorKind};
use atelier_rate_limit::AtelierConfig;
use atelier_server::{
    AppState, ObservabilityConfig, StoreBackend, build_admission, build_orchestrator,
    build_uploader, init_observability, router, shutdown_observability,
};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const ADMISSION_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(author, version, about = "Atelier generation server", long_about = None)]
struct Args {
    /// Configuration file layered over the bundled defaults
    /// (default: ~/.config/atelier/atelier.toml, then ./atelier.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding `server.bind`
    #[arg(short, long)]
    bind: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,

    /// Store tasks and usage in PostgreSQL (reads DATABASE_URL)
    #[cfg(feature = "postgres")]
    #[arg(long)]
    postgres: bool,

    /// Maximum pooled database connections
    #[cfg(feature = "postgres")]
    #[arg(long, default_value = "8")]
    pool_size: u32,
}

impl Args {
    #[cfg(feature = "postgres")]
    fn store_backend(&self) -> Result<StoreBackend> {
        if !self.postgres {
            return Ok(StoreBackend::Memory);
        }
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("--postgres requires DATABASE_URL to be set"))?;
        Ok(StoreBackend::Postgres {
            database_url,
            pool_size: self.pool_size,
        })
    }

    #[cfg(not(feature = "postgres"))]
    fn store_backend(&self) -> Result<StoreBackend> {
        Ok(StoreBackend::Memory)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_observability(
        &ObservabilityConfig::default()
            .with_log_level(args.log_level.clone())
            .with_json_logs(args.json_logs),
    )?;

    let config = match &args.config {
        Some(path) => AtelierConfig::from_file(path)?,
        None => AtelierConfig::load()?,
    };
    let backend = args.store_backend()?;

    let (uploader, cdn) = build_uploader(&config)?;
    let admission = build_admission(&config)?;
    let orchestrator = build_orchestrator(&config, &backend, uploader, admission.clone())?;

    let pruner = tokio::spawn(async move {
        let mut interval = tokio::time::interval(ADMISSION_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            admission.prune();
        }
    });

    let state = AppState::new(Arc::new(orchestrator))
        .with_cdn(cdn)
        .with_bot_users(config.server.bot_users.clone());
    let app = router(state);
    let bind = args.bind.clone().unwrap_or_else(|| config.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&bind).await.map_err(|e| {
        ServerError::new(ServerErrorKind::Bind {
            address: bind.clone(),
            message: e.to_string(),
        })
    })?;

    info!(
        address = %bind,
        public_url = %config.server.public_base_url,
        "Atelier server listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| ServerError::new(ServerErrorKind::Serve(e.to_string())))?;

    pruner.abort();
    shutdown_observability();
    Ok(())
}
