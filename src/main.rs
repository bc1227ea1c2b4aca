use anyhow::{bail, Context, Result};
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use reqwest::Client;
use std::{fs, path::PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use wbfetch::{
    catalog::refresh_requests,
    config::{DEFAULT_API_BASE, DEFAULT_CONFIG_DIR},
    is_staged, transform, Catalog, DownloadEvent, DownloadManager, DownloadRequest, ReportKind,
    Selection, Settings,
};

#[derive(Parser)]
#[command(name = "wbfetch", about = "Download World Bank indicators as ;-separated reports")]
struct Cli {
    /// Indicator API endpoint
    #[arg(long, env = "WBFETCH_API_BASE", default_value = DEFAULT_API_BASE, global = true)]
    api_base: String,

    /// Folder holding topics.xml, indicator.xml and countries.xml
    #[arg(long, env = "WBFETCH_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR, global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Re-download the reference files
    Update,
    /// List topics, or the indicators filed under one topic
    Topics {
        #[arg(long)]
        topic: Option<String>,
    },
    /// List countries and their ISO-2 codes
    Countries,
    /// Download one indicator for a set of countries
    Fetch {
        #[arg(long)]
        topic: String,
        /// Indicator name or id
        #[arg(long)]
        indicator: String,
        /// ISO-2 code, repeatable
        #[arg(long = "country", required = true)]
        countries: Vec<String>,
        #[arg(long)]
        from: i32,
        /// Defaults to the current year
        #[arg(long)]
        till: Option<i32>,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Keep the raw XML instead of building a report
        #[arg(long)]
        xml: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) settings ─────────────────────────────────────────────────
    let cli = Cli::parse();
    let settings = Settings::new(cli.api_base, cli.config_dir);

    match cli.command {
        Command::Update => {
            fs::create_dir_all(&settings.config_dir).with_context(|| {
                format!("creating config dir {}", settings.config_dir.display())
            })?;
            let requests = refresh_requests(&settings)?;
            run_batch(requests).await?;
            info!(dir = %settings.config_dir.display(), "reference files updated");
        }

        Command::Topics { topic } => {
            let catalog = load_catalog(&settings)?;
            match topic {
                None => {
                    for t in catalog.topics() {
                        println!("{}", t.name);
                    }
                }
                Some(topic) => {
                    let indicators = catalog.indicators_for(&topic);
                    if indicators.is_empty() {
                        bail!("no indicators filed under {topic:?}");
                    }
                    for i in indicators {
                        println!("{}\t{}", i.id, i.name);
                    }
                }
            }
        }

        Command::Countries => {
            let catalog = load_catalog(&settings)?;
            for c in catalog.countries() {
                println!("{}\t{}", c.iso2, c.name);
            }
        }

        Command::Fetch {
            topic,
            indicator,
            countries,
            from,
            till,
            out_dir,
            xml,
        } => {
            let catalog = load_catalog(&settings)?;
            let selection = Selection {
                topic,
                indicator,
                countries,
                from,
                till: till.unwrap_or_else(|| Utc::now().year()),
                kind: if xml {
                    ReportKind::RawXml
                } else {
                    ReportKind::Report
                },
                out_dir,
            };
            let request = catalog.request(&settings, &selection)?;
            run_batch(vec![request]).await?;
        }
    }

    info!("all done");
    Ok(())
}

fn load_catalog(settings: &Settings) -> Result<Catalog> {
    Catalog::load(&settings.config_dir).with_context(|| {
        format!(
            "loading reference files from {} (run `wbfetch update` first)",
            settings.config_dir.display()
        )
    })
}

/// Submit `requests`, turn every staged download into a report and wait for
/// the batch to end. Ctrl-C cancels whatever is still in flight.
async fn run_batch(requests: Vec<DownloadRequest>) -> Result<()> {
    let (manager, mut rx) = DownloadManager::new(Client::new());
    for request in &requests {
        info!(url = %request.url, dest = %request.destination.display(), "downloading");
    }
    manager.submit_batch(requests);

    let failures = drive(&manager, &mut rx).await?;
    if failures > 0 {
        bail!("{failures} item(s) failed");
    }
    Ok(())
}

async fn drive(
    manager: &DownloadManager,
    rx: &mut mpsc::UnboundedReceiver<DownloadEvent>,
) -> Result<usize> {
    let mut failures = 0;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let event = tokio::select! {
            _ = &mut ctrl_c => {
                let cancelled = manager.cancel_all();
                warn!(cancelled, "interrupted");
                bail!("interrupted with {cancelled} download(s) in flight");
            }
            event = rx.recv() => event,
        };

        match event {
            Some(DownloadEvent::Progress { id, percent }) => debug!(id = %id, percent, "progress"),
            Some(DownloadEvent::Failed { id, message }) => {
                error!(id = %id, "{message}");
                failures += 1;
            }
            Some(DownloadEvent::Finished { id, destination }) => {
                if !is_staged(&destination) {
                    info!(id = %id, path = %destination.display(), "saved");
                    continue;
                }
                // offload the parse + pivot to the blocking pool
                let result = tokio::task::spawn_blocking(move || transform(&destination)).await?;
                match result {
                    Ok(report) => info!(id = %id, report = %report.display(), "report ready"),
                    Err(err) => {
                        error!(id = %id, "transform failed: {err}");
                        failures += 1;
                    }
                }
            }
            Some(DownloadEvent::AllFinished) | None => break,
        }
    }

    Ok(failures)
}
