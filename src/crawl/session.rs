// src/crawl/session.rs
// =============================================================================
// This module runs a crawl: one coordinator plus one task per page.
//
// How it works:
// 1. Validate the sink and the seed URL before anything is spawned
// 2. Register the seed: write it to the sink, add it to the site map and
//    spawn a task that fetches the page and streams its links back
// 3. The coordinator loop handles three kinds of events, one at a time:
//    - Discovered(url): register it unless it is known or the cap is hit
//    - Failed(error):   hand it to the error log, keep going
//    - Completed:       one task fewer; when none are left, we are done
// 4. Return the number of registered pages
//
// Only the coordinator touches the site map and the task counter. Tasks
// talk to it through an unbounded channel, so no locks are needed.
// Once the page cap is hit, running tasks are not cancelled: they finish
// and whatever they find is dropped.
//
// Rust concepts:
// - LocalSet / spawn_local: tasks that don't need to be Send
// - mpsc channels: one-way messages from tasks to the coordinator
// - Drop guards: run code when a value goes out of scope, no matter how
// =============================================================================

use std::collections::HashSet;
use std::io::Write;
use std::rc::Rc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::LocalSet;
use url::Url;

use super::error::{CrawlError, ErrorLog};
use super::links::LinkExtractor;
use super::transport::{Transport, TransportError};
use super::urls::{normalize_seed, Scope};

// Messages from page tasks to the coordinator
#[derive(Debug)]
enum Event {
    Discovered(Url),
    Failed(CrawlError),
    Completed,
}

// Live state of one run that only the coordinator needs
struct Session {
    scope: Rc<Scope>,
    events: UnboundedSender<Event>,
    outstanding: usize,
    truncated: bool,
}

/// Crawls one site at a time, writing every page it registers to a sink.
pub struct Crawler<T> {
    transport: Rc<T>,
    max_pages: usize,
    site_map: HashSet<String>,
    error_log: Option<Box<dyn ErrorLog>>,
}

impl<T: Transport + 'static> Crawler<T> {
    pub fn new(transport: T, max_pages: usize) -> Self {
        Self {
            transport: Rc::new(transport),
            max_pages,
            site_map: HashSet::with_capacity(max_pages.min(4096)),
            error_log: None,
        }
    }

    /// Installs the log that receives errors the crawl carries on past
    pub fn with_error_log(mut self, log: impl ErrorLog + 'static) -> Self {
        self.error_log = Some(Box::new(log));
        self
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Number of pages registered by the current or most recent run
    pub fn count(&self) -> usize {
        self.site_map.len()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.site_map.contains(url)
    }

    // Crawls the site behind `seed`, writing each registered URL to `sink`
    //
    // Returns the number of pages registered. Only problems with the sink
    // or the seed are returned as errors, plus PageLimitReached if the cap
    // cut the crawl short; in that case count() still has the page total.
    pub async fn run<W: Write>(&mut self, seed: &str, sink: &mut W) -> Result<usize, CrawlError> {
        self.site_map.clear();

        sink.flush().map_err(CrawlError::InvalidSink)?;
        let base = normalize_seed(seed)?;

        tracing::info!(seed = %base, max_pages = self.max_pages, "crawl started");

        let tasks = LocalSet::new();
        let result = tasks.run_until(self.coordinate(base, sink)).await;

        tracing::info!(pages = self.count(), "crawl finished");
        result.map(|()| self.count())
    }

    async fn coordinate<W: Write>(&mut self, base: Url, sink: &mut W) -> Result<(), CrawlError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = Session {
            scope: Rc::new(Scope::new(base.clone())),
            events: tx,
            outstanding: 0,
            truncated: false,
        };

        // the seed is the one registration whose failure ends the crawl
        self.register(base, sink, &mut session)?;

        self.drain(&mut rx, sink, &mut session).await;

        if session.truncated {
            return Err(CrawlError::PageLimitReached(self.max_pages));
        }
        Ok(())
    }

    async fn drain<W: Write>(
        &mut self,
        rx: &mut UnboundedReceiver<Event>,
        sink: &mut W,
        session: &mut Session,
    ) {
        while let Some(event) = rx.recv().await {
            match event {
                Event::Discovered(url) => {
                    if self.site_map.contains(url.as_str()) {
                        continue;
                    }
                    if let Err(err) = self.register(url, sink, session) {
                        tracing::debug!(error = %err, "dropping discovered page");
                        session.truncated = true;
                    }
                }
                Event::Failed(err) => self.report(&err),
                Event::Completed => {
                    session.outstanding -= 1;
                    if session.outstanding == 0 {
                        break;
                    }
                }
            }
        }
    }

    fn register<W: Write>(
        &mut self,
        url: Url,
        sink: &mut W,
        session: &mut Session,
    ) -> Result<(), CrawlError> {
        if self.site_map.len() >= self.max_pages {
            return Err(CrawlError::PageLimitReached(self.max_pages));
        }

        if let Err(source) = writeln!(sink, "{url}") {
            self.report(&CrawlError::Sink {
                url: url.to_string(),
                source,
            });
        }
        self.site_map.insert(url.to_string());
        session.outstanding += 1;

        tracing::debug!(%url, outstanding = session.outstanding, "page registered");
        tokio::task::spawn_local(crawl_page(
            Rc::clone(&self.transport),
            Rc::clone(&session.scope),
            url,
            session.events.clone(),
        ));
        Ok(())
    }

    fn report(&mut self, err: &CrawlError) {
        if let Some(log) = self.error_log.as_mut() {
            log.log(err);
        }
    }
}

// Sends Completed when the task is over, however it ends
struct CompletionGuard(UnboundedSender<Event>);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let _ = self.0.send(Event::Completed);
    }
}

// Body of one page task: fetch, extract, resolve, report
async fn crawl_page<T: Transport>(
    transport: Rc<T>,
    scope: Rc<Scope>,
    url: Url,
    events: UnboundedSender<Event>,
) {
    let _done = CompletionGuard(events.clone());

    if let Err(source) = scan_page(&*transport, &scope, &url, &events).await {
        let _ = events.send(Event::Failed(CrawlError::Transport {
            url: url.to_string(),
            source,
        }));
    }
}

async fn scan_page<T: Transport>(
    transport: &T,
    scope: &Scope,
    url: &Url,
    events: &UnboundedSender<Event>,
) -> Result<(), TransportError> {
    let mut body = transport.fetch(url).await?;
    let mut extractor = LinkExtractor::new();

    let outcome = loop {
        match body.chunk().await {
            Ok(Some(chunk)) => {
                let scanning = extractor.feed(&chunk);
                publish(&mut extractor, scope, events);
                if !scanning {
                    break Ok(());
                }
            }
            Ok(None) => {
                extractor.finish();
                break Ok(());
            }
            Err(err) => break Err(err),
        }
    };

    // links found before a broken body still count
    publish(&mut extractor, scope, events);
    outcome
}

fn publish(extractor: &mut LinkExtractor, scope: &Scope, events: &UnboundedSender<Event>) {
    while let Some(href) = extractor.next_href() {
        if let Some(url) = scope.resolve(&href) {
            let _ = events.send(Event::Discovered(url));
        }
    }
}
