use std::io::Read;

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use sodium_uncertainty::{
    cli::{Cli, Command},
    load_defaults, request, resolve_sigma, variability, DefaultsDocument,
};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for diagnostics on stderr
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_request(path: Option<&std::path::Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read request from stdin")?;
            Ok(buf)
        }
    }
}

fn run_compute(doc: &DefaultsDocument, payload: &str, pretty: bool) -> Result<()> {
    let response = request::respond(payload, Some(&doc.defaults));
    let out = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{out}");
    Ok(())
}

fn print_defaults(doc: &DefaultsDocument) -> Result<()> {
    println!("Variability defaults (version {}, {})", doc.version, doc.units);
    for (context, method, entry) in doc.defaults.iter() {
        let sigma = resolve_sigma(&doc.defaults, context, method)?;
        let source = if entry.override_used() {
            "sigma override".to_string()
        } else {
            format!("LoA ±{}", entry.loa_half_pair.unwrap_or_default())
        };
        println!("{context:<24} {method:<28} sigma = {sigma:.4} ({source})");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Command::Compute { request, pretty } => {
            let doc = load_defaults(cli.defaults.as_deref())?;
            let payload = read_request(request.as_deref())?;
            run_compute(&doc, &payload, pretty)
        }
        Command::Defaults => {
            let doc = load_defaults(cli.defaults.as_deref())?;
            print_defaults(&doc)
        }
        Command::Convert { loa_half, sigma } => {
            if let Some(loa_half) = loa_half {
                let sigma = variability::loa_half_to_sigma(loa_half)?;
                println!("sigma = {sigma:.6}");
            } else if let Some(sigma) = sigma {
                let loa_half = variability::sigma_to_loa_half(sigma)?;
                println!("loa_half_pair = {loa_half:.6}");
            } else {
                bail!("Provide --loa-half or --sigma");
            }
            Ok(())
        }
    }
}
