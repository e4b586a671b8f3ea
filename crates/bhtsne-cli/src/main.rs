//! bhtsne - Barnes-Hut t-SNE from the command line
//!
//! Reads one sample per line (tab or space separated), runs the `bh_tsne` engine and
//! writes one embedding row per line in input order.
//!
//! Usage:
//!     echo -e '1.0\t0.0\n0.0\t1.0' | bhtsne -d 2 -p 0.1
//!     bhtsne -i samples.tsv -o embedding.json --format json --normalize

mod tsv;

use bhtsne::{BhTsne, CancelToken, EngineConfig, Request, TsneParams};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Tsv,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "bhtsne")]
#[command(about = "Barnes-Hut t-SNE wrapper around the bh_tsne engine")]
#[command(version)]
struct Args {
    /// Output dimensionality
    #[arg(
        short = 'd',
        long,
        alias = "no_dims",
        default_value_t = bhtsne::config::DEFAULT_OUTPUT_DIMS
    )]
    no_dims: usize,

    /// Perplexity (effective number of neighbours)
    #[arg(short, long, default_value_t = bhtsne::config::DEFAULT_PERPLEXITY)]
    perplexity: f64,

    /// Barnes-Hut accuracy, 0.0 runs exact t-SNE
    #[arg(short, long, default_value_t = bhtsne::config::DEFAULT_THETA)]
    theta: f64,

    /// Random seed passed to the engine
    #[arg(short = 'r', long, allow_negative_numbers = true)]
    randseed: Option<i32>,

    /// Forward engine progress output to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Input file (defaults to stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to the bh_tsne engine binary (default: $BH_TSNE_BIN, then next to this binary)
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Kill the engine after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value = "tsv")]
    format: OutputFormat,

    /// Scale every output column to [0, 1]
    #[arg(long)]
    normalize: bool,

    /// Log level (debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    bhtsne::tracing::init_with_filter(&args.log_level);

    info!("bhtsne {}", env!("CARGO_PKG_VERSION"));

    let samples = match &args.input {
        Some(path) => tsv::read_samples(BufReader::new(File::open(path).map_err(|e| {
            format!("failed to open input {}: {}", path.display(), e)
        })?))?,
        None => tsv::read_samples(io::stdin().lock())?,
    };

    let params = TsneParams {
        output_dims: args.no_dims,
        perplexity: args.perplexity,
        theta: args.theta,
        seed: args.randseed,
    };

    // Reject bad input before looking for the engine
    let request = Request::new(&samples, &params)?;

    let mut config = EngineConfig::discover(args.engine.as_deref())?;
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    let tsne = BhTsne::new(config).verbose(args.verbose);
    let cancel = CancelToken::new();

    info!(
        "Embedding {} samples of dimension {} (perplexity {}, theta {})",
        request.n_samples(),
        request.dims(),
        request.perplexity(),
        request.theta()
    );

    let run_cancel = cancel.clone();
    let mut run = tokio::task::spawn_blocking(move || {
        tsne.embed_request_with(&request, &run_cancel)
            .map(|embedding| (embedding.dims(), embedding.collect::<Vec<_>>()))
    });

    let (dims, mut rows) = tokio::select! {
        joined = &mut run => joined??,
        _ = shutdown_signal() => {
            cancel.cancel();
            // Wait for the engine to be killed and the workspace removed
            run.await??
        }
    };

    if args.normalize {
        tsv::normalize(&mut rows);
    }

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|e| {
            format!("failed to create output {}: {}", path.display(), e)
        })?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    match args.format {
        OutputFormat::Tsv => tsv::write_rows(&mut writer, &rows)?,
        OutputFormat::Json => tsv::write_json(&mut writer, dims, &rows)?,
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping engine");
        }
        _ = terminate => {
            info!("Received terminate signal, stopping engine");
        }
    }
}
