use clap::Parser;
use detect_meter::{
    pipeline::{MetricsDisplay, SimulatedDetector},
    Configuration, CoordinatorBuilder, MeterError,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};

/// Runs a simulated detection pipeline and reports smoothed performance metrics.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "DETECTMETER_CONFIG")]
    config: Option<PathBuf>,
    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[arg(long)]
    run_for: Option<u64>,
    /// Report metrics as JSON.
    #[arg(long)]
    json: bool,
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), MeterError> {
    let cli = Cli::parse();
    let mut configuration = Configuration::load(cli.config.as_deref())?;
    if cli.run_for.is_some() {
        configuration.run_for_secs = cli.run_for;
    }
    configuration.json_report |= cli.json;
    init_logging(configuration.max_log_level()?);

    let metrics_display = Arc::new(MetricsDisplay::new(
        configuration.json_report,
        configuration.report_every_frames,
    ));
    let detector = SimulatedDetector::from_configuration(&configuration);
    let run_for = configuration.run_for_secs;
    let coordinator = CoordinatorBuilder::new(configuration)
        .detector(Box::new(detector))
        .listener(&metrics_display)
        .build()?;
    info!("Pipeline started.");

    match run_for {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!("Failed to listen for Ctrl-C: {}", e);
                    }
                }
            }
        }
        None => {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
        }
    }

    let stats = coordinator.shutdown().await?;
    info!(
        captured = stats.captured,
        dropped = stats.dropped,
        rendered = stats.rendered,
        "Pipeline stopped."
    );
    if let Some(metrics) = metrics_display.latest() {
        let report = metrics_display.render(&metrics);
        info!("Final metrics: {}", report);
    }
    Ok(())
}
