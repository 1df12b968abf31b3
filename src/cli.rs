use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ModelConfig;

#[derive(Parser, Debug)]
#[command(
    name = "rentbuy",
    about = "Monte Carlo rent-versus-buy model (mortgage, PMI, taxes, investing the difference)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the model, print the report and write the charts
    Report(ReportArgs),
    /// Serve the JSON API and the web page
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[arg(long, help = "TOML config file; built-in defaults when omitted")]
    pub config: Option<PathBuf>,
    #[arg(long, help = "Simulations in addition to the baseline run")]
    pub simulations: Option<u32>,
    #[arg(long, help = "Sampler seed for reproducible runs")]
    pub seed: Option<u64>,
    #[arg(long, default_value = "output", help = "Directory for the SVG charts")]
    pub output_dir: PathBuf,
    #[arg(long, default_value_t = false)]
    pub no_charts: bool,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    #[arg(long, help = "TOML config file supplying the request defaults")]
    pub config: Option<PathBuf>,
}

impl ReportArgs {
    /// Applies the command-line overrides on top of a loaded config.
    pub fn apply(&self, config: &mut ModelConfig) {
        if let Some(v) = self.simulations {
            config.simulation.additional_simulations = v;
        }
        if let Some(v) = self.seed {
            config.simulation.seed = Some(v);
        }
    }
}
