use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use oai_set_scan::endpoint::Endpoint;
use oai_set_scan::mode::{OperationMode, DEFAULT_METADATA_PREFIX};
use oai_set_scan::request::validate_datestamp;
use oai_set_scan::scanner::{scan_repository, ScanOptions};
use oai_set_scan::transport::{HttpTransport, DEFAULT_TIMEOUT_MS};
use oai_set_scan::types::Report;

/// oai-set-scan — discover the sets of an OAI-PMH repository and report how big each one is.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "oai-set-scan",
    version,
    about = "Discover the sets of an OAI-PMH repository and report how many items each holds.",
    long_about = None
)]
struct Cli {
    /// OAI-PMH repository base URL, e.g. https://example.org/oai
    #[arg(value_name = "REPOSITORY_BASE_URL")]
    base_url: String,

    /// Enumeration verb used to size each set.
    #[arg(long, value_enum, default_value_t = OperationMode::Identifiers)]
    mode: OperationMode,

    /// Metadata format requested for every set.
    #[arg(long = "metadata-prefix", default_value = DEFAULT_METADATA_PREFIX)]
    metadata_prefix: String,

    /// Only count items changed on or after this datestamp (YYYY-MM-DD or YYYY-MM-DDThh:mm:ssZ).
    #[arg(long)]
    from: Option<String>,

    /// Request timeout in milliseconds for ListSets and ListIdentifiers. ListRecords never times out.
    #[arg(long = "timeout-ms", default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Max set requests in flight at once. Unbounded when omitted.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Also write the report as JSON to this path.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => {
            println!("{}", e.render());
            return Ok(ExitCode::from(1));
        }
    };

    let endpoint = match Endpoint::parse(&cli.base_url) {
        Ok(ep) => ep,
        Err(e) => return Ok(usage_error(e)),
    };
    if let Some(from) = cli.from.as_deref() {
        if let Err(e) = validate_datestamp(from) {
            return Ok(usage_error(e));
        }
    }

    init_logging();

    let options = ScanOptions {
        mode: cli.mode,
        metadata_prefix: cli.metadata_prefix.clone(),
        from: cli.from.clone(),
        concurrency: cli.concurrency,
    };
    info!(
        base_url = %endpoint,
        mode = ?options.mode,
        metadata_prefix = %options.metadata_prefix,
        timeout_ms = cli.timeout_ms,
        "starting scan"
    );

    let transport = Arc::new(HttpTransport::new(cli.timeout_ms).context("failed to build HTTP client")?);
    let report = match scan_repository(transport, &endpoint, &options).await {
        Ok(report) => report,
        Err(e) => {
            error!(base_url = %endpoint, error = %e, "set discovery failed, no report produced");
            return Err(e).context("scan aborted");
        }
    };

    println!("{}", report.to_json_pretty()?);

    if let Some(path) = cli.output.as_deref() {
        write_report_json(path, &report)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "wrote report");
    }

    Ok(ExitCode::SUCCESS)
}

fn usage_error(reason: impl Display) -> ExitCode {
    println!("error: {reason}\n\n{}", Cli::command().render_usage());
    ExitCode::from(1)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("oai_set_scan=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn write_report_json(path: &Path, report: &Report) -> Result<()> {
    let mut json = report.to_json_pretty()?;
    json.push('\n');
    std::fs::write(path, json)?;
    Ok(())
}
