use clap::{Parser, Subcommand};
use opsmcp_app::bootstrap::is_root;
use opsmcp_app::commands;
use opsmcp_app::config::{load_env_file, AgentConfig, DEFAULT_ENV_FILE};
use opsmcp_app::logging;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "opsmcp", version, about = "Natural-language DevOps agent")]
struct Cli {
    /// YAML config file (defaults to /etc/opsmcp.yaml when present)
    #[arg(long, env = "OPSMCP_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// KEY=VALUE file; variables already set take precedence
    #[arg(long, default_value = DEFAULT_ENV_FILE, global = true)]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive session
    Cli,
    /// Handle one request and print the JSON response
    Run {
        #[arg(long)]
        text: String,
    },
    /// Keep the heartbeat fresh until terminated
    Serve,
    /// Stop the service once the heartbeat goes stale
    IdleWatch,
    /// Exit 0 when the heartbeat is fresh, 1 otherwise
    Health,
    /// Run startup diagnostics and write the boot report
    BootCheck,
}

impl Command {
    fn needs_root(&self) -> bool {
        matches!(self, Command::Cli | Command::Run { .. })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_loaded = load_env_file(&cli.env_file);

    let (config, notices) = match AgentConfig::load(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(Some(&config.error_log_path()));
    if env_loaded {
        info!(path = %cli.env_file.display(), "Loaded env file");
    }
    for notice in &notices {
        warn!("{}", notice);
    }

    if cli.command.needs_root() && config.require_root && !is_root() {
        eprintln!("❌ opsmcp must run as root (set `require_root: false` to override)");
        return ExitCode::SUCCESS;
    }

    let token = CancellationToken::new();
    spawn_signal_handler(token.clone());

    let result = match cli.command {
        Command::Cli => commands::cli::run(&config, token).await,
        Command::Run { text } => commands::run::run(&config, &text).await,
        Command::Serve => commands::serve::run(&config, token).await,
        Command::IdleWatch => commands::idle_watch::run(&config, token).await,
        Command::Health => {
            return if commands::health::run(&config).await {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            };
        }
        Command::BootCheck => commands::boot_check::run(&config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Command failed");
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Ctrl-C or SIGTERM cancels `token`.
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Cannot install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        info!("Shutdown requested");
        token.cancel();
    });
}
