use shaparak_gateway::config::AppConfig;
use shaparak_gateway::repo::in_memory::InMemoryTransactionStore;
use shaparak_gateway::repo::transactions_repo::{TransactionStore, TransactionsRepo};
use shaparak_gateway::resolver::GatewayResolver;
use shaparak_gateway::service::payment_service::PaymentService;
use shaparak_gateway::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let store: Arc<dyn TransactionStore> = if cfg.database_url == "memory" {
        tracing::warn!("DATABASE_URL=memory, transactions will not survive a restart");
        Arc::new(InMemoryTransactionStore::new())
    } else {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&cfg.database_url)
            .await?;
        let repo = TransactionsRepo::new(pool, &cfg.gateways.table)?;
        repo.ensure_schema().await?;
        Arc::new(repo)
    };

    let resolver = GatewayResolver::new(cfg.gateways.clone(), store);
    let state = AppState {
        payment_service: PaymentService { resolver },
    };

    let app = shaparak_gateway::router(state, cfg.internal_api_key.clone());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
