mod api;
mod collaborators;
mod config;
mod inspect_cmd;
mod terminal_output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use altforge_config::{
    config_file_path, load_config, prepare, process_env, AltForgeConfig, VisionCredentials,
};
use altforge_engine::PipelineOptions;
use altforge_logging::{init_console_logger, init_logger};
use altforge_scheduler::{
    RunLog, Scheduler, SchedulerSettings, SheetsCycle, TableRegistry, TableStatus,
};
use altforge_vision::HttpImageFetcher;

use api::AppState;
use collaborators::{generator_from, LiveCollaborators};
use config::RuntimeConfig;
use terminal_output::{note_error, note_success, note_warn};

#[derive(Parser)]
#[command(name = "altforge")]
#[command(about = "AltForge: alt text for the images in your spreadsheets")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $ALTFORGE_CONFIG, ./altforge.yaml, or ~/.altforge/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP upload server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind the HTTP server to
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Run the scheduler over the configured sheets
    Watch {
        /// Run a single cycle immediately, then exit
        #[arg(long)]
        now: bool,
    },
    /// Show which rows of a local CSV still need descriptions
    Inspect {
        file: PathBuf,
        /// Maximum number of rows to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = config_file_path(cli.config.as_deref());
    let raw = load_config(&path).await?;
    let mut env = process_env();
    if matches!(cli.command, Commands::Watch { now: true }) {
        env.insert(altforge_config::env::SCHEDULE_TIME_VAR.to_string(), "now".to_string());
    }

    let bootstrap = RuntimeConfig::from_config(&raw);
    let _guard = match &cli.command {
        Commands::Inspect { .. } => {
            init_console_logger("warn");
            None
        }
        _ => Some(init_logger(&bootstrap.log_dir, &bootstrap.log_level)?),
    };

    let config = prepare(raw, &env)?;
    let runtime = RuntimeConfig::from_config(&config).with_env_overrides(&env);
    info!(path = %path.display(), "Configuration loaded");

    let result = match cli.command {
        Commands::Serve { port, bind } => {
            let runtime = RuntimeConfig {
                port: port.unwrap_or(runtime.port),
                bind_address: bind.unwrap_or(runtime.bind_address),
                ..runtime
            };
            run_server(&config, runtime).await
        }
        Commands::Watch { .. } => run_watch(config, runtime).await,
        Commands::Inspect { file, limit } => inspect_cmd::run(&file, limit).await,
    };

    if let Err(e) = &result {
        note_error(&format!("{e:#}"));
    }
    result
}

async fn run_server(config: &AltForgeConfig, runtime: RuntimeConfig) -> Result<()> {
    info!(
        port = runtime.port,
        bind = %runtime.bind_address,
        uploads = %runtime.upload_dir.display(),
        "Starting altforge server"
    );

    for dir in [&runtime.upload_dir, &runtime.output_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let generator = VisionCredentials::resolve(config, &process_env())
        .and_then(|vision| generator_from(&vision))
        .map_err(|e| e.to_string());
    match &generator {
        Ok(g) => info!(provider = g.name(), "Vision provider ready"),
        Err(reason) => warn!(reason = %reason, "Description generation disabled"),
    }

    let state = Arc::new(AppState {
        upload_dir: runtime.upload_dir.clone(),
        output_dir: runtime.output_dir.clone(),
        policy: runtime.policy,
        fetcher: Arc::new(HttpImageFetcher::new()),
        generator,
    });

    let app = api::build_router(state, runtime.max_upload_bytes).layer(CorsLayer::permissive());
    let addr = format!("{}:{}", runtime.bind_address, runtime.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "HTTP API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn run_watch(config: AltForgeConfig, runtime: RuntimeConfig) -> Result<()> {
    let registry = TableRegistry::from_config(&config.sheets);
    if registry.is_empty() {
        note_warn("No sheets configured; add entries under `sheets:`");
    }
    let settings = SchedulerSettings::from_config(&config.schedule.clone().unwrap_or_default())?;
    let options = PipelineOptions::scheduled(runtime.pacing).with_policy(runtime.policy);

    let mut cycle = SheetsCycle::new(LiveCollaborators::new(config), options)
        .with_max_parallel(runtime.max_parallel_tables);
    if let Some(path) = &runtime.run_log_path {
        let run_log = RunLog::open(path)?;
        let pruned = run_log.prune(i64::from(runtime.run_log_retain_days) * 86_400)?;
        info!(path = %path, pruned, "Run log opened");
        cycle = cycle.with_run_log(run_log);
    }

    let mut scheduler = Scheduler::new(registry, cycle, settings);
    tokio::select! {
        _ = scheduler.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            info!("Interrupted, stopping scheduler");
        }
    }

    if let Some(report) = scheduler.last_report() {
        let failed = report.tables_with_status(TableStatus::Error);
        let summary = format!(
            "Last cycle: {} tables, {} descriptions written, {failed} failed",
            report.outcomes.len(),
            report.total_written(),
        );
        if failed == 0 {
            note_success(&summary);
        } else {
            note_warn(&summary);
        }
    }
    Ok(())
}
