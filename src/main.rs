use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use siteprobe::config::{ConfigLoader, ProbeConfig};
use siteprobe::metrics::snapshot::StatsSnapshot;
use siteprobe::probe::{MetricSource, SiteProbe};
use std::path::PathBuf;
use std::sync::Arc;
use validator::Validate;

#[derive(Parser)]
#[command(name = "siteprobe")]
#[command(version = "0.1.0")]
#[command(about = "Point-in-time page and resource load probe for WordPress sites", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Time every page of a site
    Run {
        /// Path to the configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Site base address, overrides the config file
        #[arg(short, long)]
        site: Option<String>,

        /// Namespace prefix for reported metrics
        #[arg(long)]
        vendor: Option<String>,

        /// Per-request timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Show a progress bar (stderr)
        #[arg(short, long)]
        progress: bool,
    },
    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info"); }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let level = logger.filter();
    let multi = Arc::new(indicatif::MultiProgress::new());

    match cli.command {
        Commands::Run { config, site, vendor, timeout, progress } => {
            if progress {
                indicatif_log_bridge::LogWrapper::new((*multi).clone(), logger).try_init()?;
            } else {
                log::set_boxed_logger(Box::new(logger))?;
            }
            log::set_max_level(level);

            let mut probe_config = match config {
                Some(path) => {
                    log::info!("Loading config from {:?}", path);
                    ConfigLoader::load_unvalidated(&path)?
                }
                None => ProbeConfig::default(),
            };
            if let Some(site) = site {
                probe_config.site = site;
            }
            if let Some(vendor) = vendor {
                probe_config.vendor = vendor;
            }
            if let Some(timeout) = timeout {
                probe_config.timeout_secs = timeout;
            }
            probe_config.validate()?;

            let output_multi = if progress { Some(multi.clone()) } else { None };
            let mut output = ConfigLoader::create_output(&probe_config, output_multi)?;
            let probe = SiteProbe::new(probe_config)?;
            log::info!("Probing {} as {}", probe.config().site, probe.name());

            let cancel = probe.cancel_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("Shutting down...");
                    cancel.cancel();
                }
            });

            let mut progress_bar: Option<ProgressBar> = None;
            let mut progress_task = None;
            if progress {
                let pb = multi.add(ProgressBar::new(0));
                pb.set_style(ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages {msg}")?
                    .progress_chars("#>-"));

                let mut stats_rx = probe.watch_stats();
                let pb_clone = pb.clone();
                progress_bar = Some(pb);
                progress_task = Some(tokio::spawn(async move {
                    while stats_rx.changed().await.is_ok() {
                        let snapshot: StatsSnapshot = stats_rx.borrow().clone();
                        pb_clone.set_length(snapshot.pages_total);
                        pb_clone.set_position(snapshot.pages_timed);
                        pb_clone.set_message(format!(
                            "Resources: {} | Success: {:.1}% | Active: {}",
                            snapshot.resources_fetched,
                            snapshot.resource_success_rate,
                            snapshot.active_pages
                        ));
                    }
                }));
            }

            let result = probe.collect_metrics().await;

            if let Some(task) = progress_task {
                task.abort();
            }
            if let Some(pb) = progress_bar {
                pb.finish_and_clear();
            }

            let report = result?;
            output.write_report(&report).await?;
            output.close().await?;

            let stats = probe.stats();
            println!("\n✅ Probe Completed:");
            println!("   Site: {}", report.site);
            println!("   Availability: {}", report.availability);
            println!("   Pages Timed: {}", report.metrics.len());
            println!("   Resources Fetched: {} ({} failed)", stats.resources_fetched, stats.resources_failed);
            println!("   Total Time: {:.1}s", report.elapsed_ms / 1e3);
        }
        Commands::Check { config } => {
            match ConfigLoader::load(&config) {
                Ok(cfg) => {
                    println!("✅ Config is valid:");
                    println!("   Site: {}", cfg.site);
                    println!("   Vendor: {}", cfg.vendor);
                    println!("   Timeout: {}s", cfg.timeout_secs);
                    println!("   Max Concurrent Fetches: {}", cfg.max_concurrent_fetches);
                }
                Err(e) => {
                    eprintln!("❌ Config error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
