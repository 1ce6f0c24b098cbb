use clap::Parser;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use labmate::{
    cli::{self, Cli, Command},
    config::Config,
    create_router, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "labmate=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    match args.command {
        Some(Command::Types) => {
            cli::list_types();
            Ok(())
        }
        Some(Command::Optimize(optimize_args)) => cli::run_optimize(config, optimize_args).await,
        Some(Command::Serve { port }) => {
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        None => serve(config).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(models = ?config.llm.models, "Completion fallback sequence");
    if config.llm.active_api_key().is_none() {
        warn!("OPENAI_API_KEY is not set; optimize requests will be rejected");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid HOST/PORT: {}", e))?;

    let idle_ttl = config.server.session_idle_ttl();

    // Create shared state
    let state = AppState::new(config);
    if let Some(idle_ttl) = idle_ttl {
        info!(idle_secs = idle_ttl.as_secs(), "Idle session expiry enabled");
        state.sessions.spawn_expiry(idle_ttl);
    }

    // Create router
    let app = create_router(state);

    // Start server
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
