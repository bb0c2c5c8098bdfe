// src/crawl/error.rs
// =============================================================================
// Error types for the crawler, plus the error log that receives everything
// the crawl contains instead of returning.
//
// Two kinds of errors flow through a crawl:
// - Seed-time errors (bad sink, bad seed URL, empty host, page cap on the
//   seed) are returned from Crawler::run and abort the session
// - Errors hit while pages are being fetched are handed to an ErrorLog and
//   the crawl carries on
//
// Rust concepts:
// - thiserror: derives Display and Error for our enum
// - Trait objects: Box<dyn ErrorLog> lets callers plug in any logger
// =============================================================================

use std::io;

use thiserror::Error;

use super::transport::TransportError;

/// Everything that can go wrong during a crawl
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The output sink refused to flush before the crawl started
    #[error("invalid sink: {0}")]
    InvalidSink(#[source] io::Error),

    /// A URL string could not be parsed
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The seed URL has no host to scope the crawl to
    #[error("empty host in URL {0:?}")]
    EmptyHost(String),

    /// The site map already holds the maximum number of pages
    #[error("reached maximum pages limit ({0})")]
    PageLimitReached(usize),

    /// Fetching a registered page failed
    #[error("failed to fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    /// Writing a registered page to the sink failed
    #[error("failed to write {url} to sink: {source}")]
    Sink {
        url: String,
        #[source]
        source: io::Error,
    },
}

impl CrawlError {
    pub(crate) fn invalid_url(url: &str, reason: impl ToString) -> Self {
        CrawlError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

// Receives the errors a crawl contains rather than returns
//
// Logging is best effort: a crawl without an ErrorLog just drops them.
pub trait ErrorLog {
    fn log(&mut self, error: &CrawlError);
}

/// Forwards contained errors to `tracing` at warn level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl ErrorLog for TracingLog {
    fn log(&mut self, error: &CrawlError) {
        tracing::warn!(%error, "crawl error");
    }
}

// Any closure taking an error works as a log, handy for collecting them
impl<F> ErrorLog for F
where
    F: FnMut(&CrawlError),
{
    fn log(&mut self, error: &CrawlError) {
        self(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_message() {
        let err = CrawlError::invalid_url("http://unknown/\x03", "invalid control character in URL");
        assert_eq!(
            err.to_string(),
            r#"invalid URL "http://unknown/\u{3}": invalid control character in URL"#
        );
    }

    #[test]
    fn test_closure_log_collects_errors() {
        let mut seen = Vec::new();
        {
            let mut log = |err: &CrawlError| seen.push(err.to_string());
            log.log(&CrawlError::PageLimitReached(3));
            log.log(&CrawlError::EmptyHost("nothing".to_string()));
        }
        assert_eq!(
            seen,
            vec![
                "reached maximum pages limit (3)".to_string(),
                r#"empty host in URL "nothing""#.to_string(),
            ]
        );
    }
}
