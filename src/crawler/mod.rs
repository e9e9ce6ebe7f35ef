//! # Site Crawler Module
//!
//! Breadth-first traversal of one host, bounded by link depth and by the
//! number of records produced. Pages are visited strictly one at a time with
//! a fixed delay between fetches. A failing page is logged and skipped, so one
//! bad page never aborts the crawl.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: depth, page and politeness settings
//! - `Frontier` / `CrawlTask`: FIFO queue with a visited set
//! - `PageVisitor`: runs the single-page sequence and returns discovered links
//! - `CrawlMonitor`: receives progress and answers stop requests
//! - `crawl`: the traversal loop

mod config;
mod frontier;

pub use config::{CrawlerConfig, CrawlerConfigBuilder};
pub use frontier::{CrawlTask, Frontier};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// What visiting one page produced
#[derive(Debug)]
pub struct Visit<T> {
    /// URL the page was served from after redirects
    pub final_url: Url,

    /// Result for this page; `None` when the page was skipped (e.g. too short)
    pub output: Option<T>,

    /// Outbound links, already resolved against `final_url`
    pub links: Vec<Url>,
}

/// Runs the single-page sequence for one crawl task
#[async_trait]
pub trait PageVisitor<T: Send>: Send + Sync {
    async fn visit(&self, task: &CrawlTask) -> crate::Result<Visit<T>>;
}

/// Progress sink and stop source for a crawl
#[async_trait]
pub trait CrawlMonitor: Send + Sync {
    async fn report(&self, percent: u8);
    async fn should_stop(&self) -> bool;
}

/// Summary of a finished crawl
#[derive(Debug)]
pub struct CrawlOutcome<T> {
    pub results: Vec<T>,
    /// Pages visited, including failed and skipped ones
    pub processed: usize,
    pub failed: usize,
    /// Whether the crawl ended on a stop request
    pub stopped: bool,
}

/// Progress estimate: processed share of processed plus queued, capped at 99
pub fn estimate_progress(processed: usize, queued: usize) -> u8 {
    let total = (processed + queued).max(1);
    (processed * 100 / total).min(99) as u8
}

/// Crawl from `seed`, visiting same-host pages breadth-first
#[instrument(skip(config, visitor, monitor), fields(seed = %seed))]
pub async fn crawl<T, V, M>(seed: Url, config: &CrawlerConfig, visitor: &V, monitor: &M) -> CrawlOutcome<T>
where
    T: Send,
    V: PageVisitor<T> + ?Sized,
    M: CrawlMonitor + ?Sized,
{
    let mut frontier = Frontier::new(seed, config.max_depth);
    let mut outcome = CrawlOutcome {
        results: Vec::new(),
        processed: 0,
        failed: 0,
        stopped: false,
    };

    loop {
        if outcome.results.len() >= config.max_pages {
            info!(max_pages = config.max_pages, "Page limit reached");
            break;
        }
        if monitor.should_stop().await {
            info!(processed = outcome.processed, "Stop requested, ending crawl");
            outcome.stopped = true;
            break;
        }
        let Some(task) = frontier.next_task() else {
            break;
        };

        if outcome.processed > 0 {
            tokio::time::sleep(config.rate_limit()).await;
        }

        debug!(url = %task.url, depth = task.depth, "Visiting page");
        match visitor.visit(&task).await {
            Ok(visit) => {
                frontier.mark_visited(&visit.final_url);
                if frontier.is_within_depth(task.depth) {
                    let discovered = visit.links.len();
                    let queued = visit
                        .links
                        .into_iter()
                        .filter(|link| frontier.enqueue(link.clone(), task.depth + 1))
                        .count();
                    debug!(discovered, queued, "Enqueued links");
                }
                if let Some(output) = visit.output {
                    outcome.results.push(output);
                }
            }
            Err(e) => {
                warn!(url = %task.url, error = %e, "Page failed, continuing crawl");
                outcome.failed += 1;
            }
        }

        outcome.processed += 1;
        monitor
            .report(estimate_progress(outcome.processed, frontier.queued()))
            .await;
    }

    monitor.report(100).await;
    info!(
        trained = outcome.results.len(),
        processed = outcome.processed,
        failed = outcome.failed,
        stopped = outcome.stopped,
        "Crawl finished"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::extractor::extract_links;

    /// Serves canned HTML per URL and records visit order
    struct FakeSite {
        pages: HashMap<String, String>,
        visited: Mutex<Vec<(String, u32)>>,
    }

    impl FakeSite {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.to_string()))
                    .collect(),
                visited: Mutex::new(Vec::new()),
            }
        }

        fn visited(&self) -> Vec<(String, u32)> {
            self.visited.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageVisitor<String> for FakeSite {
        async fn visit(&self, task: &CrawlTask) -> crate::Result<Visit<String>> {
            self.visited
                .lock()
                .unwrap()
                .push((task.url.to_string(), task.depth));
            let html = self
                .pages
                .get(task.url.as_str())
                .ok_or_else(|| crate::Error::Fetch(format!("404 for {}", task.url)))?;
            Ok(Visit {
                final_url: task.url.clone(),
                output: (!html.contains("tiny")).then(|| task.url.to_string()),
                links: extract_links(html, &task.url),
            })
        }
    }

    #[derive(Default)]
    struct Recorder {
        progress: Mutex<Vec<u8>>,
        stop_after_first: bool,
        stop: AtomicBool,
    }

    #[async_trait]
    impl CrawlMonitor for Recorder {
        async fn report(&self, percent: u8) {
            self.progress.lock().unwrap().push(percent);
            if self.stop_after_first {
                self.stop.store(true, Ordering::SeqCst);
            }
        }

        async fn should_stop(&self) -> bool {
            self.stop.load(Ordering::SeqCst)
        }
    }

    fn config(max_depth: u32, max_pages: usize) -> CrawlerConfig {
        CrawlerConfig::builder()
            .max_depth(max_depth)
            .max_pages(max_pages)
            .rate_limit_ms(1)
            .build()
    }

    #[tokio::test]
    async fn test_seed_scenario() {
        let site = FakeSite::new(&[
            (
                "https://example.org/a",
                r##"<a href="/a/b">b</a><a href="https://other.org/x">x</a><a href="#frag">f</a>"##,
            ),
            ("https://example.org/a/b", r#"<a href="/a/c">c</a>"#),
        ]);
        let monitor = Recorder::default();
        let seed = Url::parse("https://example.org/a").unwrap();

        let outcome = crawl(seed, &config(1, 100), &site, &monitor).await;

        assert_eq!(
            outcome.results,
            vec!["https://example.org/a", "https://example.org/a/b"]
        );
        assert_eq!(outcome.processed, 2);
        assert!(!outcome.stopped);
        let progress = monitor.progress.lock().unwrap().clone();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last(), Some(&100));
    }

    #[tokio::test]
    async fn test_depth_bound_and_containment() {
        let site = FakeSite::new(&[
            ("https://example.org/", r#"<a href="/1">1</a><a href="https://evil.org/">e</a>"#),
            ("https://example.org/1", r#"<a href="/2">2</a>"#),
            ("https://example.org/2", r#"<a href="/3">3</a>"#),
            ("https://example.org/3", ""),
        ]);
        let seed = Url::parse("https://example.org/").unwrap();
        crawl(seed, &config(2, 100), &site, &Recorder::default()).await;

        let visited = site.visited();
        assert_eq!(visited.len(), 3);
        assert!(visited.iter().all(|(url, depth)| {
            *depth <= 2 && Url::parse(url).unwrap().host_str() == Some("example.org")
        }));
    }

    #[tokio::test]
    async fn test_failures_and_skips_do_not_abort() {
        let site = FakeSite::new(&[
            (
                "https://example.org/",
                r#"<a href="/missing">m</a><a href="/short">s</a><a href="/ok">ok</a>"#,
            ),
            ("https://example.org/short", r#"tiny <a href="/from-short">x</a>"#),
            ("https://example.org/ok", ""),
            ("https://example.org/from-short", ""),
        ]);
        let seed = Url::parse("https://example.org/").unwrap();
        let outcome = crawl(seed, &config(3, 100), &site, &Recorder::default()).await;

        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.processed, 5);
        // The short page yields no record but its links are followed
        assert_eq!(
            outcome.results,
            vec![
                "https://example.org/",
                "https://example.org/ok",
                "https://example.org/from-short"
            ]
        );
    }

    #[tokio::test]
    async fn test_max_pages() {
        let site = FakeSite::new(&[
            ("https://example.org/", r#"<a href="/1">1</a><a href="/2">2</a>"#),
            ("https://example.org/1", ""),
            ("https://example.org/2", ""),
        ]);
        let seed = Url::parse("https://example.org/").unwrap();
        let outcome = crawl(seed, &config(5, 2), &site, &Recorder::default()).await;
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(site.visited().len(), 2);
    }

    #[tokio::test]
    async fn test_stop_is_honoured_within_one_page() {
        let site = FakeSite::new(&[
            ("https://example.org/", r#"<a href="/1">1</a><a href="/2">2</a>"#),
            ("https://example.org/1", ""),
            ("https://example.org/2", ""),
        ]);
        let monitor = Recorder {
            stop_after_first: true,
            ..Default::default()
        };
        let seed = Url::parse("https://example.org/").unwrap();
        let outcome = crawl(seed, &config(5, 100), &site, &monitor).await;

        assert!(outcome.stopped);
        assert_eq!(outcome.results, vec!["https://example.org/"]);
        assert_eq!(site.visited().len(), 1);
    }

    #[test]
    fn test_estimate_progress() {
        assert_eq!(estimate_progress(0, 0), 0);
        assert_eq!(estimate_progress(1, 1), 50);
        assert_eq!(estimate_progress(10, 0), 99);
        assert_eq!(estimate_progress(1, 2), 33);
    }
}
