use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use wellness_assist::agent::WellnessAgent;
use wellness_assist::cli::run_cli;
use wellness_assist::config::{AppConfig, RunMode};
use wellness_assist::language::WhatlangDetector;
use wellness_assist::llm::create_provider;
use wellness_assist::routes::api_routes;
use wellness_assist::service::WellnessService;
use wellness_assist::session::{SessionStore, spawn_idle_sweep};
use wellness_assist::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    config.validate()?;

    // Held for the life of the process so buffered log lines are flushed.
    let _log_guard = init_tracing(&config);

    eprintln!("🩺 Wellness Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {} @ {}", config.llm.model, config.llm.base_url);
    eprintln!("   Database: {}", config.db_path.display());
    if config.mode == RunMode::Server {
        eprintln!("   API: http://0.0.0.0:{}/api", config.port);
    }

    let llm = create_provider(&config.llm).await?;

    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Failed to open database at {}: {}",
                    config.db_path.display(),
                    e
                )
            })?,
    );
    tracing::info!("Database opened at {}", config.db_path.display());

    let agent = WellnessAgent::new(llm, Some(db), config.agent_table.clone());
    let sessions = Arc::new(SessionStore::new());
    let _sweep = spawn_idle_sweep(Arc::clone(&sessions), config.session_idle_timeout);

    let service = Arc::new(WellnessService::new(
        agent,
        Box::new(WhatlangDetector),
        sessions,
        &config,
    ));

    match config.mode {
        RunMode::Server => {
            let addr = format!("0.0.0.0:{}", config.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Wellness API listening on {}", addr);
            axum::serve(listener, api_routes(service)).await?;
        }
        RunMode::Cli => run_cli(service).await?,
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "wellness-assist.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .init();
            None
        }
    }
}
