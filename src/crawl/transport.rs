// src/crawl/transport.rs
// =============================================================================
// This module fetches page bodies.
//
// The crawler only needs "give me the body of this URL, piece by piece", so
// that is all the Transport trait asks for. HttpTransport is the real
// implementation on top of reqwest; tests plug in their own.
//
// Notes:
// - No retries and no timeouts: a slow server just makes its task slow
// - A non-2xx status counts as a failed fetch
//
// Rust concepts:
// - async-trait: async fn in a trait used behind Box<dyn ...>
// - ?Send: crawl tasks run on a LocalSet, so nothing here has to be Send
// =============================================================================

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// A response body being received
#[async_trait(?Send)]
pub trait Body {
    /// Next piece of the body, or None once it is complete
    async fn chunk(&mut self) -> Result<Option<Bytes>, TransportError>;
}

/// Something that can fetch a page body for a URL
#[async_trait(?Send)]
pub trait Transport {
    async fn fetch(&self, url: &Url) -> Result<Box<dyn Body>, TransportError>;
}

// Plain HTTP(S) transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    pub fn default_user_agent() -> String {
        format!("site-mapper/{}", env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait(?Send)]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<Box<dyn Body>, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!(%url, status = %response.status(), "response received");
        Ok(Box::new(HttpBody(response)))
    }
}

struct HttpBody(Response);

#[async_trait(?Send)]
impl Body for HttpBody {
    async fn chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        Ok(self.0.chunk().await?)
    }
}
