//! Main entry point for the rangefile CLI.
//!
//! Fetches a byte slice of a remote (or local) resource through the caching
//! reader and writes it to stdout or a file.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::SeekFrom;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use rangefile::{Cli, HttpRangeFetcher, LocalFileFetcher, RangeFetcher, RangeReader};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if cli.is_http_url() {
        let url = cli.source.parse().context("invalid URL")?;
        let mut reader = build_reader(HttpRangeFetcher::new(url)?, &cli);

        let written = copy_slice(&mut reader, &cli).await?;

        // Report how much actually crossed the network; the cache and
        // request coalescing usually keep it close to the slice size.
        if !cli.quiet {
            let transferred = reader.fetcher().transferred_bytes();
            eprintln!(
                "{} written, {} transferred",
                format_size(written),
                format_size(transferred)
            );
        }
    } else {
        let fetcher = LocalFileFetcher::open(Path::new(&cli.source))
            .with_context(|| format!("cannot open {}", cli.source))?;
        let mut reader = build_reader(fetcher, &cli);

        copy_slice(&mut reader, &cli).await?;
    }

    Ok(())
}

fn build_reader<F: RangeFetcher>(fetcher: F, cli: &Cli) -> RangeReader<F> {
    match cli.block_size {
        Some(block_size) => RangeReader::with_block_size(fetcher, block_size),
        None => RangeReader::new(fetcher),
    }
}

/// Seek to the requested offset and stream the slice to the output.
async fn copy_slice<F: RangeFetcher>(reader: &mut RangeReader<F>, cli: &Cli) -> Result<u64> {
    let length = reader.length().await?;

    reader.seek(SeekFrom::Start(cli.offset)).await?;
    let mut remaining = match cli.length {
        Some(n) => n.min(length - cli.offset),
        None => length - cli.offset,
    };

    let mut out: Box<dyn AsyncWrite + Unpin> = match &cli.output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    let mut written = 0u64;
    let mut buf = vec![0u8; 64 * 1024];
    while remaining > 0 {
        let want = buf.len().min(remaining as usize);
        let n = reader.read(&mut buf[..want]).await?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).await?;
        written += n as u64;
        remaining -= n as u64;
    }
    out.flush().await?;

    Ok(written)
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}

/// Logs go to stderr so stdout stays clean for the payload.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::builder().parse_lossy(
        std::env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV)
            .unwrap_or_else(|_| "warn".to_string()),
    );

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
