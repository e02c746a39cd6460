//! Command-line front end: acquire a MeCab dictionary into the local cache
//! and optionally unpack it.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use mecab_worker::dictionary::{DictionaryFiles, Origin, ProgressEvent};
use mecab_worker::{Cli, DictionaryAcquirer, DiskCache, HttpFetcher, SourceFetcher};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let dict = cli
        .dictionary()
        .context("no dictionary source given")?;

    let fetcher = Arc::new(SourceFetcher::new(HttpFetcher::with_timeout(cli.timeout())?));
    let cache = Arc::new(DiskCache::new(&cli.cache_dir).await?);
    let acquirer = DictionaryAcquirer::new(fetcher.clone(), cache);

    let quiet = cli.is_quiet();
    let files = acquirer
        .acquire(&dict.cache_name, &dict.url, cli.no_cache, |event| {
            if !quiet {
                print_progress(event);
            }
        })
        .await
        .with_context(|| format!("failed to acquire {}", dict.url))?;

    if cli.list || cli.verbose {
        list_files(&files, cli.verbose);
    }

    if let Some(ref dir) = cli.extract_dir {
        let dicdir = files.materialize(dir).await?;
        if !cli.is_very_quiet() {
            println!("dictionary directory: {}", dicdir.display());
        }
    }

    // Display network transfer statistics for HTTP sources
    if cli.is_http_source() && !quiet && files.source.origin == Origin::Network {
        eprintln!(
            "\nTotal bytes transferred: {}",
            format_size(fetcher.http().transferred_bytes())
        );
    }

    Ok(())
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.is_very_quiet() {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn print_progress(event: &ProgressEvent) {
    let verb = match event.origin {
        Origin::Network => "extracting",
        Origin::Cache => "  restoring",
    };
    match event.total {
        Some(total) => println!(
            "{}: {} ({} of {})",
            verb,
            event.name,
            format_size(event.size),
            format_size(total)
        ),
        None => println!("{}: {} ({})", verb, event.name, format_size(event.size)),
    }
}

/// List acquired files.
///
/// `-l` prints names only; `-v` adds sizes and a summary line.
fn list_files(files: &DictionaryFiles, verbose: bool) {
    if verbose {
        println!("{:>10}  Name", "Length");
        println!("{}", "-".repeat(40));
    }

    for file in files {
        if verbose {
            println!("{:>10}  {}", file.size(), file.name);
        } else {
            println!("{}", file.name);
        }
    }

    if verbose {
        println!("{}", "-".repeat(40));
        println!("{:>10}  {} files", files.total_size(), files.len());
    }
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
        format!("{} bytes", size)
    }
}
