use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use profile_sync::config::ProfileSyncConfig;
use profile_sync::module::MODULE_NAME;
use profile_sync::ProfileSync;
use runtime::{AppConfig, CliArgs};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod http;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// CourseHub Server - profile sync and enrollment backend
#[derive(Parser)]
#[command(name = "coursehub-server")]
#[command(about = "CourseHub Server - profile sync and enrollment backend")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use in-memory store and identity provider
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // home_dir is normalized inside
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("CourseHub Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let module_cfg = load_module_config(&config, args.mock)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, module_cfg).await,
        Commands::Check => check_config(config, module_cfg),
    }
}

fn load_module_config(config: &AppConfig, mock: bool) -> Result<ProfileSyncConfig> {
    let cfg = config
        .module_config::<ProfileSyncConfig>(MODULE_NAME)
        .with_context(|| format!("invalid '{MODULE_NAME}' module configuration"))?
        .unwrap_or_default();
    if mock {
        tracing::info!("--mock: using in-memory store and identity provider");
        return Ok(cfg.into_mock());
    }
    Ok(cfg)
}

async fn run_server(config: AppConfig, module_cfg: ProfileSyncConfig) -> Result<()> {
    tracing::info!("Initializing modules...");
    let module = ProfileSync::new();
    module.init(&module_cfg)?;

    let routes = module.register_rest(axum::Router::new())?;
    let timeout = (config.server.timeout_sec > 0)
        .then(|| Duration::from_secs(config.server.timeout_sec));
    let router = http::build_router(routes, timeout);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid bind address '{}:{}'",
                config.server.host, config.server.port
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("HTTP server bound on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = runtime::wait_for_shutdown().await {
                tracing::warn!(error = %e, "shutdown signal handler failed");
            }
        })
        .await?;
    tracing::info!("HTTP server stopped");
    Ok(())
}

fn check_config(config: AppConfig, module_cfg: ProfileSyncConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    // adapters are built, nothing is contacted
    ProfileSync::new().init(&module_cfg)?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_yaml()?);
    Ok(())
}
