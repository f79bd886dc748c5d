use std::collections::{HashSet, VecDeque};
use url::Url;

/// A page waiting to be rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: Url,
    /// Number of links followed from the seed
    pub depth: usize,
}

/// Bounded first-in first-out set of pages to visit.
///
/// A URL is admitted at most once and the number of admitted URLs never
/// exceeds `max_pages`.
#[derive(Debug)]
pub struct Frontier {
    seen: HashSet<String>,
    pending: VecDeque<FrontierEntry>,
    max_pages: usize,
    max_depth: Option<usize>,
}

impl Frontier {
    pub fn new(max_pages: usize, max_depth: Option<usize>) -> Self {
        Self {
            seen: HashSet::new(),
            pending: VecDeque::new(),
            max_pages,
            max_depth,
        }
    }

    /// Queue `url`, returning false if it was already seen or a bound was hit
    pub fn push(&mut self, url: Url, depth: usize) -> bool {
        if self.seen.len() >= self.max_pages {
            ::log::trace!("Page limit {} reached, not queuing {}", self.max_pages, url);
            return false;
        }
        if self.max_depth.is_some_and(|max| depth > max) {
            ::log::trace!("Depth {} exceeds limit, not queuing {}", depth, url);
            return false;
        }
        if !self.seen.insert(url.as_str().to_string()) {
            return false;
        }
        self.pending.push_back(FrontierEntry { url, depth });
        true
    }

    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.pending.pop_front()
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.seen.contains(url.as_str())
    }

    /// Whether the page budget is used up
    pub fn is_full(&self) -> bool {
        self.seen.len() >= self.max_pages
    }

    /// URLs admitted so far, visited or pending
    pub fn admitted(&self) -> usize {
        self.seen.len()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://example.test/").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::new(10, None);
        assert!(frontier.push(url("/"), 0));
        assert!(frontier.push(url("/a"), 1));
        assert!(frontier.push(url("/b"), 1));

        assert_eq!(frontier.pop().unwrap().url, url("/"));
        assert_eq!(frontier.pop().unwrap().url, url("/a"));
        assert_eq!(frontier.pop().unwrap().url, url("/b"));
        assert!(frontier.pop().is_none());
    }

    #[test]
    fn test_url_admitted_once() {
        let mut frontier = Frontier::new(10, None);
        assert!(frontier.push(url("/a"), 0));
        frontier.pop();
        assert!(!frontier.push(url("/a"), 1));
        assert!(frontier.contains(&url("/a")));
        assert_eq!(frontier.pending(), 0);
    }

    #[test]
    fn test_page_bound() {
        let mut frontier = Frontier::new(3, None);
        for i in 0..10 {
            frontier.push(url(&format!("/p{}", i)), 1);
        }
        assert_eq!(frontier.admitted(), 3);
        assert_eq!(frontier.pending(), 3);
        assert!(frontier.is_full());
    }

    #[test]
    fn test_depth_bound() {
        let mut frontier = Frontier::new(10, Some(1));
        assert!(frontier.push(url("/"), 0));
        assert!(frontier.push(url("/a"), 1));
        assert!(!frontier.push(url("/a/b"), 2));
        assert_eq!(frontier.admitted(), 2);
    }
}
