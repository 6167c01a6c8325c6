//! zkauth daemon: entry point for running the sign-in verifier.

mod app;
mod config;

use app::App;
use clap::Parser;
use config::ServerConfig;
use std::path::PathBuf;
use zkauth_utils::{init_logging, LogFormat, ShutdownController};
use zkauth_verification::ReissuePolicy;

#[derive(Parser)]
#[command(name = "zkauth-daemon", about = "Zero-knowledge sign-in verifier")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "ZKAUTH_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind, e.g. "0.0.0.0:8080".
    #[arg(long, env = "ZKAUTH_LISTEN")]
    listen: Option<String>,

    /// Externally reachable base URL used to build the wallet callback.
    #[arg(long, env = "ZKAUTH_PUBLIC_URL")]
    public_url: Option<String>,

    /// Verifier DID presented to wallets.
    #[arg(long, env = "ZKAUTH_AUDIENCE")]
    audience: Option<String>,

    /// Directory with `{circuitId}/verification_key.json` files.
    #[arg(long, env = "ZKAUTH_KEY_DIR")]
    key_dir: Option<PathBuf>,

    /// Front-end directory served at `/`.
    #[arg(long, env = "ZKAUTH_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    #[arg(long, env = "ZKAUTH_PROOF_ENGINE_URL")]
    proof_engine_url: Option<String>,

    #[arg(long, env = "ZKAUTH_IPFS_GATEWAY")]
    ipfs_gateway: Option<String>,

    #[arg(long, env = "ZKAUTH_SESSION_TTL_SECS")]
    session_ttl_secs: Option<u64>,

    /// "reject" or "supersede".
    #[arg(long, env = "ZKAUTH_REISSUE", value_parser = parse_reissue)]
    reissue: Option<ReissuePolicy>,

    /// Accept caller-chosen session ids on sign-in.
    #[arg(long, env = "ZKAUTH_ALLOW_CLIENT_SESSION_IDS")]
    allow_client_session_ids: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "ZKAUTH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "ZKAUTH_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, clap::Subcommand)]
enum Command {
    /// Run the HTTP server.
    Run,
    /// Print the effective configuration as TOML and exit.
    PrintConfig,
}

fn parse_reissue(s: &str) -> Result<ReissuePolicy, String> {
    match s.to_ascii_lowercase().as_str() {
        "reject" => Ok(ReissuePolicy::Reject),
        "supersede" => Ok(ReissuePolicy::Supersede),
        other => Err(format!("unknown reissue policy {other:?}")),
    }
}

impl Cli {
    /// Layer flags and env vars over the file (or default) config.
    fn apply(self, mut config: ServerConfig) -> ServerConfig {
        if let Some(v) = self.listen {
            config.listen_addr = v;
        }
        if let Some(v) = self.public_url {
            config.public_url = v;
        }
        if let Some(v) = self.audience {
            config.audience = v;
        }
        if let Some(v) = self.key_dir {
            config.key_dir = v;
        }
        if let Some(v) = self.static_dir {
            config.rpc.static_dir = Some(v);
        }
        if let Some(v) = self.proof_engine_url {
            config.proof_engine_url = v;
        }
        if let Some(v) = self.ipfs_gateway {
            config.ipfs_gateway = v;
        }
        if let Some(v) = self.session_ttl_secs {
            config.session_ttl_secs = v;
        }
        if let Some(v) = self.reissue {
            config.reissue = v;
        }
        if self.allow_client_session_ids {
            config.rpc.allow_client_session_ids = true;
        }
        if let Some(v) = self.log_level {
            config.log_level = v;
        }
        if let Some(v) = self.log_format {
            config.log_format = v;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => ServerConfig::from_toml_file(path)?,
        None => ServerConfig::default(),
    };
    let command = cli.command;
    let config_path = cli.config.clone();
    let config = cli.apply(base);

    if let Command::PrintConfig = command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    init_logging(config.log_format, &config.log_level)?;
    if let Some(path) = config_path {
        tracing::info!(path = %path.display(), "loaded config");
    }

    let app = App::from_config(&config)?;

    let shutdown = ShutdownController::new();
    let signals = shutdown.clone();
    tokio::spawn(async move { signals.wait_for_signal().await });

    app.run(&config, shutdown).await?;
    tracing::info!("zkauth stopped");
    Ok(())
}
