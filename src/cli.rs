//! CLI argument parsing for sodium-uncertainty

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sodium-uncertainty")]
#[command(version)]
#[command(about = "Measurement-uncertainty statistics for paired sodium results", long_about = None)]
pub struct Cli {
    /// Variability defaults document (uses the bundled table if omitted)
    #[arg(long = "defaults", value_name = "PATH", global = true)]
    pub defaults: Option<PathBuf>,

    /// Enable trace-level diagnostics on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a JSON request and print the JSON response
    Compute {
        /// Request file (reads stdin if omitted)
        #[arg(short, long, value_name = "FILE")]
        request: Option<PathBuf>,

        /// Pretty-print the response
        #[arg(long)]
        pretty: bool,
    },

    /// List each context/method with its resolved sigma
    Defaults,

    /// Convert between a 95% LoA half-width and a measurement sigma
    #[command(group(ArgGroup::new("source").required(true).args(["loa_half", "sigma"])))]
    Convert {
        /// 95% limits-of-agreement half-width
        #[arg(long = "loa-half", value_name = "LOA")]
        loa_half: Option<f64>,

        /// Single-measurement standard deviation
        #[arg(long, value_name = "SIGMA")]
        sigma: Option<f64>,
    },
}
