// src/crawl/urls.rs
// =============================================================================
// URL normalisation and same-site resolution.
//
// Every URL the crawler touches goes through `normalize` first, so two links
// to the same page always end up as the same string:
// - fragments are dropped (they point inside a page, not at a new page)
// - an empty path becomes "/"
// - anything containing an ASCII control character is rejected
//
// `Scope` holds the crawl's base URL and decides whether an href found on a
// page belongs to the site being crawled.
//
// Rust concepts:
// - Enums with data: UrlRef is either a parsed absolute URL or a reference
// - Option: a rejected link is just None, not an error
// =============================================================================

use std::fmt;

use url::{ParseError, Url};

use super::error::CrawlError;

/// A normalised URL string: either absolute or a reference that still needs
/// a base to resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlRef {
    Absolute(Url),
    Relative(String),
}

impl UrlRef {
    pub fn is_absolute(&self) -> bool {
        matches!(self, UrlRef::Absolute(_))
    }
}

impl fmt::Display for UrlRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlRef::Absolute(url) => f.write_str(url.as_str()),
            UrlRef::Relative(reference) => f.write_str(reference),
        }
    }
}

// Parses the given URL and normalises its components
//
// Returns CrawlError::InvalidUrl (or EmptyHost for "scheme://" with nothing
// after it) when the string cannot be parsed.
pub fn normalize(input: &str) -> Result<UrlRef, CrawlError> {
    if input.bytes().any(|b| b.is_ascii_control()) {
        return Err(CrawlError::invalid_url(input, "invalid control character in URL"));
    }

    match Url::parse(input) {
        Ok(mut url) => {
            url.set_fragment(None);
            if url.path().is_empty() && !url.cannot_be_a_base() {
                url.set_path("/");
            }
            Ok(UrlRef::Absolute(url))
        }
        Err(ParseError::RelativeUrlWithoutBase) => Ok(UrlRef::Relative(normalize_reference(input))),
        Err(ParseError::EmptyHost) => Err(CrawlError::EmptyHost(input.to_string())),
        Err(err) => Err(CrawlError::invalid_url(input, err)),
    }
}

fn normalize_reference(reference: &str) -> String {
    let reference = reference
        .split_once('#')
        .map_or(reference, |(before, _)| before);

    if reference.is_empty() || reference.starts_with('?') {
        format!("/{reference}")
    } else {
        reference.to_string()
    }
}

// Normalises a seed URL and checks it has a host the crawl can be scoped to
pub fn normalize_seed(input: &str) -> Result<Url, CrawlError> {
    match normalize(input)? {
        UrlRef::Absolute(url) if url.host_str().is_some_and(|host| !host.is_empty()) => Ok(url),
        _ => Err(CrawlError::EmptyHost(input.to_string())),
    }
}

/// The same-site boundary of one crawl
#[derive(Debug, Clone)]
pub struct Scope {
    base: Url,
}

impl Scope {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    // Turns an href into an absolute same-site URL
    //
    // Returns None for unparseable hrefs and for anything pointing at another
    // scheme, host or port. References (including "//host/path") are joined
    // onto the base first and then checked like any other URL.
    pub fn resolve(&self, href: &str) -> Option<Url> {
        let url = match normalize(href).ok()? {
            UrlRef::Absolute(url) => url,
            UrlRef::Relative(reference) => {
                let mut url = self.base.join(&reference).ok()?;
                url.set_fragment(None);
                url
            }
        };

        self.is_same_site(&url).then_some(url)
    }

    pub fn is_same_site(&self, url: &Url) -> bool {
        url.scheme() == self.base.scheme()
            && url.host_str() == self.base.host_str()
            && url.port() == self.base.port()
    }
}
