// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
// =============================================================================

use clap::Parser;

// This struct represents our entire CLI application
//
// #[derive(Parser)] tells clap to automatically generate parsing code
#[derive(Parser, Debug)]
#[command(
    name = "site-mapper",
    version,
    about = "Crawl a web site and print the URL of every page on it",
    long_about = "site-mapper starts from a URL, follows every link that stays on the same \
                  scheme, host and port, and prints each page it finds exactly once."
)]
pub struct Cli {
    /// URL to start crawling from (e.g., https://example.com)
    ///
    /// http:// is assumed when no scheme is given
    pub url: String,

    /// Maximum number of pages to process
    #[arg(long, default_value_t = 1_000)]
    pub max_pages: usize,

    /// Print the final summary as JSON instead of "Total pages: N"
    #[arg(long)]
    pub json: bool,

    /// User-Agent header sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,
}

impl Cli {
    // The seed URL, with http:// added if the user left the scheme off
    pub fn seed_url(&self) -> String {
        if self.url.contains("://") {
            self.url.clone()
        } else {
            format!("http://{}", self.url)
        }
    }
}
