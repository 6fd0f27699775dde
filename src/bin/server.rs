use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use opspro::agent::{AgentLifecycle, SshAgentClient};
use opspro::config::AppConfig;
use opspro::monitoring::MetricsRegistry;
use opspro::orchestrator::{
    DecommissionOrchestrator, OnboardingOrchestrator, PgResourceStore, ResourceStore,
};
use opspro::probe::{Prober, SshProber};
use opspro::services::encryption_service::CredentialCipher;
use opspro::services::token_service::TokenIssuer;
use opspro::web::{run_http_server, AppState};

#[derive(Parser, Debug)]
#[command(name = "opspro-server", about = "Resource onboarding and monitoring server")]
struct Args {
    /// Address the HTTP server binds to.
    #[arg(long, default_value = "0.0.0.0:8000")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;

    let cipher = CredentialCipher::new(&config.secret_key)?;
    let tokens = TokenIssuer::new(&config.jwt_secret);

    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db_pool).await?;
    info!("database connected, migrations applied");

    let registry = MetricsRegistry::new()?;

    let store: Arc<dyn ResourceStore> = Arc::new(PgResourceStore::new(Arc::new(db_pool.clone())));
    let prober: Arc<dyn Prober> = Arc::new(SshProber::new());
    let agent: Arc<dyn AgentLifecycle> = Arc::new(SshAgentClient::new());

    let onboarding = Arc::new(OnboardingOrchestrator::new(
        store.clone(),
        prober,
        agent.clone(),
        tokens.clone(),
        cipher,
        config.agent_callback_url.clone(),
    ));
    let decommission = Arc::new(DecommissionOrchestrator::new(store, agent));

    let app_state = Arc::new(AppState {
        db_pool,
        tokens,
        registry,
        onboarding,
        decommission,
    });

    run_http_server(app_state, args.listen).await
}
