//! signal-cli: run the signal engine over JSON requests.
//!
//! Usage:
//!   signal-cli analyze <request.json> [--data-dir DIR] [--since YYYY-MM-DD] [--pretty]
//!   signal-cli validate <request.json> [--pretty]
//!   signal-cli portfolio <request.json> [--pretty]
//!
//! Results are written to stdout as JSON; logs go to stderr.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use composite_scorer::{hydrate, AssetPipeline, AssetRequest};
use serde::{Deserialize, Serialize};
use signal_core::{LtpiSystem, SdcaSystem};
use validation::ValidationResult;

mod config;
mod provider;

use provider::CsvDirectoryProvider;

const DEFAULT_SINCE: &str = "2010-01-01";

/// Systems to check without scoring.
#[derive(Debug, Deserialize)]
struct ValidateRequest {
    #[serde(default)]
    sdca: Option<SdcaSystem>,
    #[serde(default)]
    ltpi: Option<LtpiSystem>,
}

#[derive(Debug, Serialize)]
struct ValidateResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    sdca: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ltpi: Option<ValidationResult>,
}

#[derive(Debug, Deserialize)]
struct PortfolioEntry {
    sdca: SdcaSystem,
    ltpi: LtpiSystem,
}

#[derive(Debug, Deserialize)]
struct PortfolioRequest {
    assets: Vec<PortfolioEntry>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let args: Vec<String> = std::env::args().collect();
    let (Some(command), Some(request_path)) = (args.get(1), args.get(2)) else {
        print_usage();
        std::process::exit(1);
    };
    let pretty = args.iter().any(|a| a == "--pretty");
    let data_dir = option_value(&args, "--data-dir");
    let since: NaiveDate = option_value(&args, "--since")
        .unwrap_or(DEFAULT_SINCE)
        .parse()
        .context("--since must be YYYY-MM-DD")?;

    let config = config::from_env().context("loading engine configuration")?;
    let pipeline = AssetPipeline::new(config).context("building pipeline")?;
    let raw = std::fs::read_to_string(request_path)
        .with_context(|| format!("reading request {}", request_path))?;

    let output = match command.as_str() {
        "analyze" => {
            let mut request: AssetRequest = serde_json::from_str(&raw)
                .with_context(|| format!("parsing analyze request {}", request_path))?;
            if let Some(dir) = data_dir {
                let provider = CsvDirectoryProvider::new(dir);
                hydrate(&mut request, &provider, since)
                    .await
                    .with_context(|| format!("loading histories from {}", dir))?;
            }
            to_json(&pipeline.run(request), pretty)?
        }
        "validate" => {
            let request: ValidateRequest = serde_json::from_str(&raw)
                .with_context(|| format!("parsing validate request {}", request_path))?;
            if request.sdca.is_none() && request.ltpi.is_none() {
                bail!("validate request needs an 'sdca' or 'ltpi' system");
            }
            let response = ValidateResponse {
                sdca: request.sdca.as_ref().map(|s| pipeline.validate_sdca(s)),
                ltpi: request.ltpi.as_ref().map(|s| pipeline.validate_ltpi(s)),
            };
            to_json(&response, pretty)?
        }
        "portfolio" => {
            let request: PortfolioRequest = serde_json::from_str(&raw)
                .with_context(|| format!("parsing portfolio request {}", request_path))?;
            let systems: Vec<(SdcaSystem, LtpiSystem)> = request
                .assets
                .into_iter()
                .map(|entry| (entry.sdca, entry.ltpi))
                .collect();
            to_json(&pipeline.portfolio(&systems), pretty)?
        }
        other => {
            print_usage();
            bail!("unknown command '{}'", other);
        }
    };

    println!("{}", output);
    Ok(())
}

fn option_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  signal-cli analyze <request.json>    Score one asset and attach diagnostics");
    eprintln!("  signal-cli validate <request.json>   Check SDCA and/or LTPI systems");
    eprintln!("  signal-cli portfolio <request.json>  Allocation across {{\"assets\": [...]}}");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --data-dir DIR      Load missing histories from DIR/<symbol>/<metric>.csv");
    eprintln!("  --since YYYY-MM-DD  First date loaded from --data-dir (default: {})", DEFAULT_SINCE);
    eprintln!("  --pretty            Pretty-print the JSON output");
}
