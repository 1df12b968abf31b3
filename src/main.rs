use anyhow::Context;
use clap::Parser;
use std::path::Path;
use tracing::info;

use rentbuy::chart::{ChartData, render_svg_charts};
use rentbuy::cli::{Cli, Command, ReportArgs, ServeArgs};
use rentbuy::config::ModelConfig;
use rentbuy::core::aggregate_with_seed;
use rentbuy::{api, report, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Report(args) => run_report(args),
        Command::Serve(args) => run_serve(args).await,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ModelConfig> {
    match path {
        Some(path) => ModelConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(ModelConfig::default()),
    }
}

fn run_report(args: ReportArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    telemetry::init_logging(&config.logging.level)?;
    args.apply(&mut config);

    let inputs = config.build_inputs().context("invalid model inputs")?;
    let result = aggregate_with_seed(&inputs).context("simulation failed")?;

    for line in report::render(&result) {
        println!("{line}");
    }

    if !args.no_charts {
        let data = ChartData::from_result(&result);
        let paths = render_svg_charts(&data, &args.output_dir).with_context(|| {
            format!("writing charts to {}", args.output_dir.display())
        })?;
        for path in paths {
            info!(path = %path.display(), "chart written");
        }
    }
    Ok(())
}

async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    telemetry::init_logging(&config.logging.level)?;
    // Fail at startup on an invalid config.
    config.build_inputs().context("invalid model inputs")?;

    api::run_http_server(args.port, config)
        .await
        .context("HTTP server failed")
}
