// src/crawl/links.rs
// =============================================================================
// This module pulls anchor hrefs out of HTML as it streams in.
//
// We use the `lol_html` crate which:
// - Tokenizes HTML incrementally, one chunk at a time
// - Runs a handler as soon as a matching start tag has been seen
// - Never builds a DOM, so a page is never held in memory as a whole
//
// The handler only reads `href` and queues it; the rewritten output is
// thrown away. Hrefs can be drained after every chunk, long before the
// response body has finished arriving.
//
// Rust concepts:
// - Rc<RefCell<...>>: shared, mutable queue between the handler and us
// - Iterator: Hrefs turns any std::io::Read into a lazy sequence of hrefs
// =============================================================================

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::rc::Rc;

use lol_html::{element, HtmlRewriter, Settings};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Incremental `<a href>` scanner.
///
/// Feed it body chunks with [`LinkExtractor::feed`] and take the hrefs found
/// so far with [`LinkExtractor::next_href`]. The first tokenizer error ends
/// the scan; hrefs queued before it are kept.
pub struct LinkExtractor {
    rewriter: Option<HtmlRewriter<'static, fn(&[u8])>>,
    found: Rc<RefCell<VecDeque<String>>>,
}

impl LinkExtractor {
    pub fn new() -> Self {
        let found = Rc::new(RefCell::new(VecDeque::new()));
        let queue = Rc::clone(&found);

        let rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![element!("a[href]", move |el| {
                    // lol_html hands back the first href when there are several
                    if let Some(href) = el.get_attribute("href") {
                        let href = decode_attribute(&href);
                        queue.borrow_mut().push_back(href);
                    }
                    Ok(())
                })],
                ..Settings::default()
            },
            discard as fn(&[u8]),
        );

        Self {
            rewriter: Some(rewriter),
            found,
        }
    }

    // Scans the next chunk of the document
    //
    // Returns false once scanning has stopped, either because of an earlier
    // call to finish() or because the tokenizer gave up on the markup.
    pub fn feed(&mut self, chunk: &[u8]) -> bool {
        let Some(rewriter) = self.rewriter.as_mut() else {
            return false;
        };

        if let Err(error) = rewriter.write(chunk) {
            tracing::debug!(%error, "stopped scanning malformed document");
            self.rewriter = None;
            return false;
        }
        true
    }

    /// Flushes whatever the tokenizer still holds; no more input is accepted.
    pub fn finish(&mut self) {
        if let Some(rewriter) = self.rewriter.take() {
            if let Err(error) = rewriter.end() {
                tracing::debug!(%error, "document ended with a tokenizer error");
            }
        }
    }

    /// Stops scanning without flushing; queued hrefs stay available.
    pub fn abandon(&mut self) {
        self.rewriter = None;
    }

    pub fn is_finished(&self) -> bool {
        self.rewriter.is_none()
    }

    pub fn next_href(&mut self) -> Option<String> {
        self.found.borrow_mut().pop_front()
    }
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn discard(_: &[u8]) {}

// Decodes character references in an attribute value
//
// html-escape leaves references to C0 control characters (`&#x3;`) as they
// are. Those are decoded here first, so the href carries the real control
// character and the resolver rejects it, instead of the `#` being taken for
// a fragment.
fn decode_attribute(value: &str) -> String {
    let value = decode_control_references(value);
    html_escape::decode_html_entities(&value).into_owned()
}

fn decode_control_references(value: &str) -> Cow<'_, str> {
    if !value.contains("&#") {
        return Cow::Borrowed(value);
    }

    let mut decoded = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find("&#") {
        decoded.push_str(&rest[..pos]);
        let reference = &rest[pos + 2..];
        match control_reference(reference) {
            Some((ch, len)) => {
                decoded.push(ch);
                rest = &reference[len..];
            }
            None => {
                decoded.push_str("&#");
                rest = reference;
            }
        }
    }
    decoded.push_str(rest);
    Cow::Owned(decoded)
}

// Parses the part of a numeric reference after "&#" when it names a control
// character; returns the character and how many bytes it spans
fn control_reference(reference: &str) -> Option<(char, usize)> {
    let (radix, start) = match reference.as_bytes().first() {
        Some(b'x' | b'X') => (16, 1),
        _ => (10, 0),
    };
    let digits = reference[start..]
        .bytes()
        .take_while(|b| b.is_ascii_digit() || (radix == 16 && b.is_ascii_hexdigit()))
        .count();
    if digits == 0 {
        return None;
    }

    let code = u32::from_str_radix(&reference[start..start + digits], radix).ok()?;
    let ch = match code {
        0 => char::REPLACEMENT_CHARACTER,
        _ => char::from_u32(code).filter(|c| c.is_ascii_control() && !c.is_ascii_whitespace())?,
    };

    let mut len = start + digits;
    if reference[len..].starts_with(';') {
        len += 1;
    }
    Some((ch, len))
}

/// Lazy sequence of hrefs read from a blocking source.
///
/// Reads only as much input as it takes to produce the next href.
pub struct Hrefs<R> {
    reader: R,
    extractor: LinkExtractor,
    buf: Box<[u8]>,
}

pub fn extract_hrefs<R: Read>(reader: R) -> Hrefs<R> {
    Hrefs {
        reader,
        extractor: LinkExtractor::new(),
        buf: vec![0; READ_CHUNK_SIZE].into_boxed_slice(),
    }
}

impl<R: Read> Iterator for Hrefs<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(href) = self.extractor.next_href() {
                return Some(href);
            }
            if self.extractor.is_finished() {
                return None;
            }

            match self.reader.read(&mut self.buf) {
                Ok(0) => self.extractor.finish(),
                Ok(n) => {
                    self.extractor.feed(&self.buf[..n]);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(error) => {
                    // a broken stream ends the document where it stopped
                    tracing::debug!(%error, "stopped reading document");
                    self.extractor.abandon();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::Scope;
    use std::io;

    fn hrefs(html: &str) -> Vec<String> {
        extract_hrefs(html.as_bytes()).collect()
    }

    // Hands out the input a few bytes at a time, then optionally fails
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
        fail_at_end: bool,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                if self.fail_at_end {
                    return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
                }
                return Ok(0);
            }
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_empty_document() {
        assert!(hrefs("").is_empty());
    }

    #[test]
    fn test_no_anchor_elements() {
        assert!(hrefs("<html><body><h1>Test</h1><p>Content</p></body></html>").is_empty());
    }

    #[test]
    fn test_anchor_without_href() {
        assert!(hrefs("<html><a>Anchor</a><a name=\"top\">Top</a></html>").is_empty());
    }

    #[test]
    fn test_anchor_with_many_href_attributes() {
        let links = hrefs(r#"<html><a href="link1.html" href="link2.html">Anchor</a></html>"#);
        assert_eq!(links, vec!["link1.html"]);
    }

    #[test]
    fn test_many_anchor_elements_in_document_order() {
        let links = hrefs(
            r#"<html>
                <a href="/">Anchor 1</a>
                <a href="link2.html">Anchor 2</a>
                <link href="/style.css" rel="stylesheet">
                <a href="http://external.com/link7.html">Anchor 7</a>
            </html>"#,
        );
        assert_eq!(links, vec!["/", "link2.html", "http://external.com/link7.html"]);
    }

    #[test]
    fn test_entities_are_decoded() {
        let links = hrefs(r#"<a href="/search?q=rust&amp;page=2">Search</a>"#);
        assert_eq!(links, vec!["/search?q=rust&page=2"]);
    }

    #[test]
    fn test_control_character_passes_through() {
        // the resolver is the one that rejects it
        let links = hrefs("<html><a href=\"/link\x02.html\">Anchor</a><a href=\"ok.html\">Ok</a></html>");
        assert_eq!(links, vec!["/link\x02.html", "ok.html"]);
    }

    #[test]
    fn test_control_character_reference_is_decoded() {
        let links = hrefs(r#"<a href="/x&#x3;y">X</a><a href="/z&#7;">Z</a><a href="/nul&#0;">N</a>"#);
        assert_eq!(links, vec!["/x\x03y", "/z\x07", "/nul\u{FFFD}"]);

        let scope = Scope::new(url::Url::parse("http://example.com/").unwrap());
        assert_eq!(scope.resolve(&links[0]), None);
        assert_eq!(scope.resolve(&links[1]), None);
    }

    #[test]
    fn test_escaped_reference_text_is_left_alone() {
        let links = hrefs(r#"<a href="/a&amp;#x3;b">A</a><a href="/p&#47;q&#x2F;r">P</a>"#);
        assert_eq!(links, vec!["/a&#x3;b", "/p/q/r"]);
    }

    #[test]
    fn test_tags_split_across_chunks() {
        let html = r#"<p>intro</p><a class="nav" href="first.html">1</a><a href="second.html">2</a>"#;
        let reader = Trickle {
            data: html.as_bytes(),
            step: 3,
            fail_at_end: false,
        };
        let links: Vec<_> = extract_hrefs(reader).collect();
        assert_eq!(links, vec!["first.html", "second.html"]);
    }

    #[test]
    fn test_read_error_keeps_earlier_hrefs() {
        let reader = Trickle {
            data: br#"<a href="one.html">One</a> <p>more text"#,
            step: 64,
            fail_at_end: true,
        };
        let links: Vec<_> = extract_hrefs(reader).collect();
        assert_eq!(links, vec!["one.html"]);
    }

    #[test]
    fn test_yields_before_reading_everything() {
        let html = r#"<a href="early.html">Early</a>"#.to_string() + &" ".repeat(64 * 1024);
        let mut reader = Trickle {
            data: html.as_bytes(),
            step: 16,
            fail_at_end: false,
        };
        let mut iter = extract_hrefs(&mut reader);
        assert_eq!(iter.next().as_deref(), Some("early.html"));
        drop(iter);
        assert!(!reader.data.is_empty());
    }

    #[test]
    fn test_feed_after_finish_is_rejected() {
        let mut extractor = LinkExtractor::new();
        assert!(extractor.feed(b"<a href=\"a.html\">"));
        extractor.finish();
        assert!(!extractor.feed(b"<a href=\"b.html\">"));
        assert_eq!(extractor.next_href().as_deref(), Some("a.html"));
        assert_eq!(extractor.next_href(), None);
    }
}
