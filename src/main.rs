// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging to stderr
// 3. Crawl the site, streaming every page URL to stdout
// 4. Print the total (even if the crawl stopped with an error)
// 5. Exit with proper code (0 = crawled, 2 = could not start)
// =============================================================================

mod cli;
mod logging;

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use site_mapper::crawl::{CrawlError, Crawler, HttpTransport, TracingLog};

use cli::Cli;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Final line(s) of output, printed after the URL stream
#[derive(Debug, Serialize)]
struct CrawlReport<'a> {
    seed: &'a str,
    pages_crawled: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::setup_logging()?;

    let seed = cli.seed_url();
    let user_agent = cli
        .user_agent
        .clone()
        .unwrap_or_else(HttpTransport::default_user_agent);
    let transport = HttpTransport::new(&user_agent).context("failed to build HTTP client")?;

    let mut crawler = Crawler::new(transport, cli.max_pages).with_error_log(TracingLog);

    let stdout = std::io::stdout();
    let mut sink = stdout.lock();
    let outcome = crawler.run(&seed, &mut sink).await;

    if let Err(err) = &outcome {
        tracing::error!(error = %err, "crawl stopped");
    }

    let report = CrawlReport {
        seed: &seed,
        pages_crawled: crawler.count(),
        error: outcome.as_ref().err().map(ToString::to_string),
    };
    print_report(&mut sink, &report, cli.json)?;

    Ok(exit_code(&outcome))
}

fn print_report<W: Write>(out: &mut W, report: &CrawlReport<'_>, json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(report)?)?;
    } else {
        writeln!(out, "Total pages: {}", report.pages_crawled)?;
    }
    out.flush()?;
    Ok(())
}

// Hitting the page cap is a normal way for a crawl to end
fn exit_code(outcome: &Result<usize, CrawlError>) -> i32 {
    match outcome {
        Ok(_) | Err(CrawlError::PageLimitReached(_)) => 0,
        Err(_) => 2,
    }
}
