use std::path::PathBuf;

use automark_client::{format_progress, Automark, ClientConfig, ClientError};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "automark", version, about = "AutoMark learner client")]
struct Cli {
    /// Server base URL
    #[arg(long, global = true, env = "AUTOMARK_URL")]
    url: Option<String>,

    /// Local test cache directory
    #[arg(long, global = true, env = "AUTOMARK_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a user's progress table
    Progress { user: String },
    /// Make sure the cached local tests are current
    Sync { user: String },
    /// Print the digest of the cached local tests
    Digest,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.url {
        config = config.with_url(url);
    }
    if let Some(dir) = cli.cache_dir {
        config = config.with_cache_dir(dir);
    }
    let automark = Automark::new(&config)?;

    match cli.cmd {
        Command::Progress { user } => {
            let report = automark.client().get_progress(&user).await?;
            print!("{}", format_progress(&report));
        }
        Command::Sync { user } => {
            if automark.cache().ensure_current(automark.client(), &user).await? {
                println!("Local tests are downloaded.");
            } else {
                println!("Local tests are up to date.");
            }
        }
        Command::Digest => match automark.cache().digest().await {
            Some(digest) => println!("{}", digest),
            None => {
                return Err(ClientError::Cache {
                    message: format!(
                        "no cached tests at {}",
                        automark.cache().artifact_path().display()
                    ),
                })
            }
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}
