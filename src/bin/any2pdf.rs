//! CLI binary for any2pdf.
//!
//! A thin shim over the library crate: converts one local file to PDF using
//! the same dispatch engine the chat session uses. Handy for testing a
//! host's LibreOffice install without wiring up a transport.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use any2pdf::{convert_to_pdf, sanitize_name, Config};

#[derive(Parser, Debug)]
#[command(name = "any2pdf", version, about = "Convert a file to PDF")]
struct Cli {
    /// Input file (any format; unknown formats are tried via LibreOffice)
    input: PathBuf,

    /// Output PDF path. Defaults to `<sanitised stem>.pdf` beside the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Office conversion timeout in seconds
    #[arg(long, default_value_t = 90)]
    timeout: u64,

    /// Explicit path to the soffice binary
    #[arg(long, env = "ANY2PDF_OFFICE_ENGINE")]
    engine: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if !cli.input.is_file() {
        bail!("input file not found: {}", cli.input.display());
    }

    let mut builder = Config::builder().office_timeout_secs(cli.timeout);
    if let Some(engine) = &cli.engine {
        builder = builder.office_engine(engine);
    }
    let config = builder.build()?;
    tracing::debug!("effective config: {}", config.snapshot());

    let output = cli.output.unwrap_or_else(|| {
        let stem = cli
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        cli.input
            .with_file_name(format!("{}.pdf", sanitize_name(&stem, config.max_name_len)))
    });

    let work_dir = tempfile::Builder::new()
        .prefix("any2pdf_")
        .tempdir()
        .context("failed to create work directory")?;

    let pdf = convert_to_pdf(&cli.input, work_dir.path(), &config)
        .await
        .with_context(|| format!("converting {}", cli.input.display()))?;

    std::fs::copy(&pdf, &output)
        .with_context(|| format!("writing {}", output.display()))?;

    println!("{}", output.display());
    Ok(())
}
