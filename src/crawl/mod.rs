// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Submodules:
// - urls:      normalises URLs and decides what counts as "same site"
// - links:     streams anchor hrefs out of HTML as it arrives
// - transport: fetches page bodies (reqwest in production)
// - session:   the Crawler itself, coordinating one task per page
// - error:     error types and the error log
//
// Features:
// - Concurrent crawling, one task per discovered page
// - Same-site restriction (scheme, host and port must match the seed)
// - Every page is fetched and reported at most once
// - Configurable cap on the number of pages
// =============================================================================

mod error;
mod links;
mod session;
mod transport;
mod urls;

// Re-export the public API so callers can write `crawl::Crawler`
pub use error::{CrawlError, ErrorLog, TracingLog};
pub use links::{extract_hrefs, Hrefs, LinkExtractor};
pub use session::Crawler;
pub use transport::{Body, HttpTransport, Transport, TransportError};
pub use urls::{normalize, normalize_seed, Scope, UrlRef};
