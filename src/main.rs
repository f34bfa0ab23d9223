use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use sqlx::migrate::Migrator;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clearing_core::adapters::{
    self, PostgresAccountRepository, PostgresBankRepository, PostgresTransactionRepository,
};
use clearing_core::cli::{self, Cli, Commands};
use clearing_core::config::Config;
use clearing_core::ports::{AccountRepository, BankRepository, TransactionRepository};
use clearing_core::services::{
    BankDirectoryClient, JwsSigner, RemoteBankClient, Scheduler, TransactionProcessor,
};
use clearing_core::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let config = Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(Commands::Config) = args.command {
        return cli::handle_config_validate(&config);
    }

    // Database pool
    let pool = adapters::create_pool(&config).await?;

    // Run migrations
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    // Signing key is loaded once; a broken key blocks startup.
    let signer = Arc::new(
        JwsSigner::from_pem_file(&config.signing_key_path)
            .context("failed to load transaction signing key")?,
    );
    tracing::info!("Transaction signing key loaded from {}", config.signing_key_path);

    let transactions: Arc<dyn TransactionRepository> =
        Arc::new(PostgresTransactionRepository::new(pool.clone()));
    let accounts: Arc<dyn AccountRepository> =
        Arc::new(PostgresAccountRepository::new(pool.clone()));
    let banks: Arc<dyn BankRepository> = Arc::new(PostgresBankRepository::new(pool.clone()));

    let http_timeout = Duration::from_secs(config.http_timeout_secs);
    let directory = BankDirectoryClient::new(
        config.central_bank_url.clone(),
        config.central_bank_api_key.clone(),
        http_timeout,
        banks.clone(),
    );
    let remote = RemoteBankClient::new(http_timeout);

    let processor = Arc::new(TransactionProcessor::new(
        transactions,
        accounts,
        banks,
        directory.clone(),
        remote,
        signer,
    ));

    match args.command {
        Some(Commands::ProcessOnce) => return cli::handle_process_once(&processor).await,
        Some(Commands::RefreshBanks) => return cli::handle_refresh_banks(&directory).await,
        Some(Commands::Serve) | None => {}
        Some(Commands::Config) => unreachable!("handled before startup"),
    }

    Scheduler::new(Duration::from_millis(config.process_interval_ms), processor).spawn();

    // Operational surface only; the product API lives elsewhere.
    let app = create_app(AppState { db: pool });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
