use regex::Regex;
use serde::{Deserialize, Serialize};
use url::{Origin, Url};

/// Extensions that mark a link as a file rather than a page to render
const ASSET_LINK_PATTERN: &str =
    r"(?i)\.(jpg|jpeg|png|gif|webp|svg|ico|css|js|woff|woff2|ttf|eot|pdf|zip|mp4|mp3)$";

/// Configuration for which links the mirror follows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlFilterConfig {
    /// Regex patterns for URLs to include (if empty, all URLs are included unless excluded)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Regex patterns for URLs to exclude (these take precedence over include patterns)
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Decides whether a discovered link belongs to the site being mirrored
#[derive(Debug)]
pub struct UrlFilter {
    origin: Origin,
    include_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl UrlFilter {
    /// Create a filter scoped to the origin of `seed`
    pub fn new(seed: &Url, config: &UrlFilterConfig) -> Result<Self, regex::Error> {
        let include_regexes = config
            .include_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let mut exclude_regexes = vec![Regex::new(ASSET_LINK_PATTERN)?];
        for pattern in &config.exclude_patterns {
            exclude_regexes.push(Regex::new(pattern)?);
        }

        Ok(Self {
            origin: seed.origin(),
            include_regexes,
            exclude_regexes,
        })
    }

    /// Whether `url` shares scheme, host and port with the seed
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }

    /// Determine if a link should be rendered as a page
    pub fn should_crawl(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        if !self.is_same_origin(url) {
            return false;
        }

        // Exclusions are checked against the path so a query like ?file=a.js does not count
        let path = url.path();
        if self.exclude_regexes.iter().any(|regex| regex.is_match(path)) {
            return false;
        }

        if !self.include_regexes.is_empty() {
            let url_str = url.as_str();
            return self
                .include_regexes
                .iter()
                .any(|regex| regex.is_match(url_str));
        }

        true
    }

    /// Canonical form used for frontier and resource keys (fragment removed)
    pub fn normalize_url(url: &Url) -> Url {
        let mut normalized = url.clone();
        normalized.set_fragment(None);
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn test_default_filter() {
        let filter = UrlFilter::new(&seed(), &UrlFilterConfig::default()).unwrap();

        // Assets are downloaded, not crawled
        let image_url = Url::parse("https://example.com/image.JPG").unwrap();
        assert!(!filter.should_crawl(&image_url));

        let page_url = Url::parse("https://example.com/about").unwrap();
        assert!(filter.should_crawl(&page_url));

        let html_url = Url::parse("https://example.com/page.html").unwrap();
        assert!(filter.should_crawl(&html_url));
    }

    #[test]
    fn test_origin_restriction() {
        let filter = UrlFilter::new(&seed(), &UrlFilterConfig::default()).unwrap();

        let other_host = Url::parse("https://other.com/page").unwrap();
        assert!(!filter.should_crawl(&other_host));

        let other_scheme = Url::parse("http://example.com/page").unwrap();
        assert!(!filter.should_crawl(&other_scheme));

        let other_port = Url::parse("https://example.com:8443/page").unwrap();
        assert!(!filter.should_crawl(&other_port));

        let mail = Url::parse("mailto:someone@example.com").unwrap();
        assert!(!filter.should_crawl(&mail));
    }

    #[test]
    fn test_regex_patterns() {
        let config = UrlFilterConfig {
            include_patterns: vec![r"/docs/".to_string()],
            exclude_patterns: vec![r"/docs/draft/".to_string()],
        };
        let filter = UrlFilter::new(&seed(), &config).unwrap();

        let included = Url::parse("https://example.com/docs/page").unwrap();
        assert!(filter.should_crawl(&included));

        let not_included = Url::parse("https://example.com/blog/post").unwrap();
        assert!(!filter.should_crawl(&not_included));

        // Exclusions take precedence over inclusions
        let excluded = Url::parse("https://example.com/docs/draft/page").unwrap();
        assert!(!filter.should_crawl(&excluded));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let config = UrlFilterConfig {
            include_patterns: vec!["(".to_string()],
            exclude_patterns: vec![],
        };
        assert!(UrlFilter::new(&seed(), &config).is_err());
    }

    #[test]
    fn test_normalize_removes_fragment() {
        let url = Url::parse("https://example.com/about#team").unwrap();
        assert_eq!(
            UrlFilter::normalize_url(&url).as_str(),
            "https://example.com/about"
        );
    }
}
