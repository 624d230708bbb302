use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use authgate::identity::HttpIdentityClient;
use authgate::store::{self, MemoryStore, RevocationStore};
use authgate::tokens::TokenManager;
use authgate::{api, config, AppState};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port).await,
        Some(cli::Commands::Token { command }) => handle_token_command(&cfg, command).await,
        Some(cli::Commands::Health) => run_health_check(&cfg).await,
        None => run_server(cfg, None).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    opentelemetry::global::shutdown_tracer_provider();
    result
}

/// Logging: env filter, plain or JSON fmt layer, and an OTLP exporter when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
fn init_tracing() -> anyhow::Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "authgate"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    let json = std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "authgate=info,tower_http=info".into()),
        ))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .with(telemetry_layer)
        .try_init()
        .context("failed to initialise tracing")?;
    Ok(())
}

async fn build_state(cfg: &config::Config) -> anyhow::Result<Arc<AppState>> {
    tracing::info!("Connecting to revocation store...");
    let store = store::connect(&cfg.redis_url)
        .await
        .context("failed to connect to revocation store")?;

    let identity = Arc::new(
        HttpIdentityClient::new(cfg.user_service_url.clone(), cfg.dependency_timeout)
            .context("failed to build user service client")?,
    );

    Ok(Arc::new(AppState::new(cfg, store, identity)?))
}

async fn run_server(cfg: config::Config, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(cfg.port);
    let state = build_state(&cfg).await?;

    // Startup probe is informational only; /healthz reports the live state.
    let status = state.health.check().await;
    tracing::info!(%status, "initial dependency health");

    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("authgate listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("authgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining connections");
}

async fn run_health_check(cfg: &config::Config) -> anyhow::Result<()> {
    let state = build_state(cfg).await?;
    let status = state.health.check().await;
    println!("{}", status);
    if !status.is_serving() {
        anyhow::bail!("service is {}", status);
    }
    Ok(())
}

async fn handle_token_command(
    cfg: &config::Config,
    cmd: cli::TokenCommands,
) -> anyhow::Result<()> {
    // Minting never touches the store.
    let store: Arc<dyn RevocationStore> = match cmd {
        cli::TokenCommands::Issue { .. } => Arc::new(MemoryStore::new()),
        _ => store::connect(&cfg.redis_url)
            .await
            .context("failed to connect to revocation store")?,
    };
    let tokens = TokenManager::new(
        cfg.jwt_secret.as_bytes(),
        cfg.jwt_expiry,
        store,
        cfg.dependency_timeout,
    );

    match cmd {
        cli::TokenCommands::Issue { id, label } => {
            let token = tokens.issue(id, &label)?;
            println!("{}", token);
        }
        cli::TokenCommands::Inspect { token } => {
            let claims = tokens.validate(&token).context("token is not valid")?;
            let revoked = tokens.is_revoked(&claims.jti).await?;
            let expires = chrono::DateTime::from_timestamp(claims.exp, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| claims.exp.to_string());
            println!("ID:       {}", claims.id);
            println!("Username: {}", claims.username);
            println!("JTI:      {}", claims.jti);
            println!("Expires:  {}", expires);
            println!("Revoked:  {}", revoked);
        }
        cli::TokenCommands::Revoke { token } => {
            let claims = tokens.validate(&token).context("token is not valid")?;
            tokens.revoke(&claims.jti, claims.exp).await?;
            println!("Token {} revoked.", claims.jti);
        }
    }
    Ok(())
}
