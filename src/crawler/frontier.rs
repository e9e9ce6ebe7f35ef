//! Breadth-first crawl frontier

use std::collections::{HashSet, VecDeque};

use url::Url;

/// A URL waiting to be visited and its distance from the seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: Url,
    pub depth: u32,
}

/// FIFO queue of same-host URLs with a visited set
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<CrawlTask>,
    visited: HashSet<String>,
    host: Option<String>,
    max_depth: u32,
}

fn visit_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

impl Frontier {
    /// A frontier holding only `seed` at depth 0
    pub fn new(seed: Url, max_depth: u32) -> Self {
        let host = seed.host_str().map(str::to_string);
        let mut queue = VecDeque::new();
        queue.push_back(CrawlTask {
            url: seed,
            depth: 0,
        });
        Self {
            queue,
            visited: HashSet::new(),
            host,
            max_depth,
        }
    }

    /// Next unvisited task, which becomes visited
    pub fn next_task(&mut self) -> Option<CrawlTask> {
        while let Some(task) = self.queue.pop_front() {
            if self.visited.insert(visit_key(&task.url)) {
                return Some(task);
            }
        }
        None
    }

    /// Record a URL as visited without queueing it, e.g. a redirect target
    pub fn mark_visited(&mut self, url: &Url) {
        self.visited.insert(visit_key(url));
    }

    /// Queue `url` at `depth` if it is on the seed host, within depth and not yet visited
    pub fn enqueue(&mut self, url: Url, depth: u32) -> bool {
        if depth > self.max_depth
            || url.host_str() != self.host.as_deref()
            || self.visited.contains(&visit_key(&url))
        {
            return false;
        }
        self.queue.push_back(CrawlTask { url, depth });
        true
    }

    /// Number of queued tasks, including ones that turn out visited
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_within_depth(&self, depth: u32) -> bool {
        depth < self.max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_fifo_order_and_visited_skip() {
        let mut frontier = Frontier::new(url("https://example.org/"), 2);
        let seed = frontier.next_task().unwrap();
        assert_eq!(seed.depth, 0);

        assert!(frontier.enqueue(url("https://example.org/a"), 1));
        assert!(frontier.enqueue(url("https://example.org/b"), 1));
        // Queued twice, visited once
        assert!(frontier.enqueue(url("https://example.org/a#top"), 1));

        assert_eq!(frontier.next_task().unwrap().url.path(), "/a");
        assert_eq!(frontier.next_task().unwrap().url.path(), "/b");
        assert!(frontier.next_task().is_none());
    }

    #[test]
    fn test_containment_and_depth() {
        let mut frontier = Frontier::new(url("https://example.org/"), 1);
        frontier.next_task();

        assert!(!frontier.enqueue(url("https://other.org/x"), 1));
        assert!(!frontier.enqueue(url("https://sub.example.org/x"), 1));
        assert!(!frontier.enqueue(url("https://example.org/deep"), 2));
        assert!(!frontier.enqueue(url("https://example.org/"), 1));
        assert!(frontier.enqueue(url("http://example.org/plain"), 1));
        assert!(frontier.is_within_depth(0));
        assert!(!frontier.is_within_depth(1));
    }

    #[test]
    fn test_mark_visited() {
        let mut frontier = Frontier::new(url("https://example.org/"), 3);
        frontier.next_task();
        frontier.mark_visited(&url("https://example.org/home"));
        assert!(!frontier.enqueue(url("https://example.org/home"), 1));
    }
}
