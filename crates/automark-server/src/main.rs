use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use automark_core::{BundleArtifact, GradingContext, ServerConfig};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "automark-server",
    version,
    about = "AutoMark grading service"
)]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root of the data layout (assignments/ and users/)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve(ServeArgs),
    /// Print the digest of the deployed fixture bundle
    Digest,
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Listen address, e.g. 0.0.0.0:1234
    #[arg(long)]
    bind: Option<String>,

    /// Seconds a user must wait after submitting an answer
    #[arg(long)]
    cooldown_secs: Option<u64>,

    /// Emit JSON log lines
    #[arg(long)]
    log_json: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?.apply_env(),
        None => ServerConfig::from_env(),
    };
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    Ok(config)
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.cmd {
        Command::Digest => {
            let artifact = BundleArtifact::load(&config.bundle_path())?;
            println!("{}", artifact.digest());
            Ok(())
        }
        Command::Serve(args) => {
            if let Some(bind) = args.bind {
                config = config.with_bind(bind);
            }
            if let Some(secs) = args.cooldown_secs {
                config = config.with_cooldown_secs(secs);
            }
            config.log_json |= args.log_json;
            automark_server::init_tracing(config.log_json);

            let ctx = Arc::new(GradingContext::load(&config)?);
            let listener = tokio::net::TcpListener::bind(&config.bind)
                .await
                .with_context(|| format!("failed to bind {}", config.bind))?;

            automark_server::serve(listener, ctx, shutdown_signal()).await
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for ctrl-c, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
