//! # site-mapper
//!
//! Crawls a single web site from a seed URL and streams every same-site page
//! it finds to a writer, one URL per line.
//!
//! ```rust,no_run
//! use site_mapper::crawl::{Crawler, HttpTransport, TracingLog};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new(&HttpTransport::default_user_agent())?;
//! let mut crawler = Crawler::new(transport, 100).with_error_log(TracingLog);
//! let pages = crawler.run("https://example.com", &mut std::io::stdout()).await?;
//! println!("Total pages: {pages}");
//! # Ok(())
//! # }
//! ```

pub mod crawl;
