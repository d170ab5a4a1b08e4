//! prefix-list-source
//!
//! Loads a managed prefix list, keeps it refreshed and logs every change.
//!
//! ```text
//! --config file ─▶ AppConfig ─▶ RefreshConfig ─▶ PrefixSource::start
//!                                                   │
//!                     SIGHUP ─▶ refresh_now ────────┤
//!              SIGINT/SIGTERM ─▶ shutdown ──────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use prefix_list_source::config::{self, AppConfig, RefreshConfig};
use prefix_list_source::lifecycle::{LifecycleEvent, SignalListener};
use prefix_list_source::observability::{logging, metrics};
use prefix_list_source::{CredentialResolver, PrefixSource};

#[derive(Parser)]
#[command(name = "prefix-list-source")]
#[command(about = "Keeps a refreshed copy of a managed prefix list", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single refresh pass, print the prefixes as JSON and exit
    #[arg(long)]
    once: bool,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let app = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig::default(),
    };

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&app.observability.log_level);
    logging::init_logging(level)?;

    tracing::info!("prefix-list-source v{} starting", env!("CARGO_PKG_VERSION"));

    if app.observability.metrics_enabled && !cli.once {
        let addr = app.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let refresh = RefreshConfig::from_source(&app.source);
    tracing::info!(
        region = %refresh.region,
        list = ?refresh.primary,
        include_ipv6 = refresh.include_ipv6(),
        refresh = ?refresh.refresh,
        "Configuration loaded"
    );

    let source = PrefixSource::start(refresh, credential_resolver()?).await?;

    if cli.once {
        let prefixes: Vec<String> = source
            .current_prefixes()
            .iter()
            .map(ToString::to_string)
            .collect();
        println!("{}", serde_json::to_string_pretty(&prefixes)?);
        source.shutdown().await;
        return Ok(());
    }

    let mut signals = SignalListener::new()?;
    loop {
        match signals.next().await {
            LifecycleEvent::Shutdown => break,
            LifecycleEvent::Refresh => match source.refresh_now().await {
                Ok(outcome) => tracing::info!(
                    outcome = outcome.label(),
                    count = source.snapshot().len(),
                    "Manual refresh complete"
                ),
                Err(e) => tracing::error!(error = %e, "Manual refresh failed"),
            },
        }
    }

    source.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(feature = "aws")]
fn credential_resolver() -> Result<Arc<dyn CredentialResolver>, Box<dyn std::error::Error>> {
    Ok(Arc::new(prefix_list_source::provider::aws::AwsCredentials::new()))
}

#[cfg(not(feature = "aws"))]
fn credential_resolver() -> Result<Arc<dyn CredentialResolver>, Box<dyn std::error::Error>> {
    Err("built without the `aws` feature; no provider available".into())
}
