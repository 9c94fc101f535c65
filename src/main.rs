use std::path::PathBuf;
use std::sync::Arc;

use cert_check::chrome::ChromeFetcher;
use cert_check::{extract_claim_from_path, CertificateChecker, Config, PageNameFetcher};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cert_check")]
#[command(about = "Checks course certificates against their verification page")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the upload form and the /validate endpoint.
    Serve {
        /// Overrides CERT_CHECK_ADDR.
        #[arg(long)]
        addr: Option<std::net::SocketAddr>,
    },
    /// Check certificate PDFs on disk.
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    let fetcher = ChromeFetcher::new(config.chrome_path.clone(), config.chrome_sandbox);

    match cli.cmd.unwrap_or(Command::Serve { addr: None }) {
        Command::Serve { addr } => {
            if let Some(addr) = addr {
                config.addr = addr;
            }
            let fetcher: Arc<dyn PageNameFetcher> = Arc::new(fetcher);
            cert_check::server::serve(&config, fetcher).await
        }
        Command::Check { files } => {
            tokio::task::spawn_blocking(move || check_files(&config, fetcher, &files)).await?;
            Ok(())
        }
    }
}

fn check_files(config: &Config, fetcher: ChromeFetcher, files: &[PathBuf]) {
    let checker = CertificateChecker::new(&config.upload_dir, config.element_timeout, fetcher);
    for file in files {
        println!("processing {}", file.display());
        let claim = extract_claim_from_path(file);
        println!("  name: {}", claim.name.as_deref().unwrap_or("-"));
        println!("  url: {}", claim.url.as_deref().unwrap_or("-"));
        match checker.check_claim(&claim) {
            Some(outcome) => println!("  status: {outcome}"),
            None => println!("  status: could not extract name or URL"),
        }
    }
}
