//! Turns raw document references into absolute, classified URLs.

use crate::filter::UrlFilter;
use crate::parsers::RawResources;
use crate::parsers::style::css_urls;
use crate::results::ResourceKind;
use url::Url;

/// Script evaluated in the live page. It returns a JSON object matching
/// [`RawResources`]; element properties (`src`, `href`) are already absolute.
pub const DISCOVERY_SCRIPT: &str = r#"
const result = {
    base: document.baseURI,
    images: [],
    backgrounds: [],
    scripts: [],
    stylesheets: [],
    links: []
};

const text = value => typeof value === 'string' && value.length > 0;

document.querySelectorAll('img[src]').forEach(img => {
    if (text(img.src)) result.images.push(img.src);
});

document.querySelectorAll('*').forEach(el => {
    try {
        const bg = window.getComputedStyle(el).backgroundImage;
        if (text(bg) && bg !== 'none') result.backgrounds.push(bg);
    } catch (e) {}
});

document.querySelectorAll('script[src]').forEach(script => {
    if (text(script.src)) result.scripts.push(script.src);
});

document.querySelectorAll('link[rel~="stylesheet" i]').forEach(link => {
    if (text(link.href)) result.stylesheets.push(link.href);
});

document.querySelectorAll('a[href]').forEach(a => {
    if (text(a.href)) result.links.push(a.href);
});

return result;
"#;

/// What one page references, resolved and filtered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovered {
    pub images: Vec<Url>,
    pub scripts: Vec<Url>,
    pub stylesheets: Vec<Url>,
    /// Same-origin page links, fragment removed
    pub links: Vec<Url>,
}

impl Discovered {
    /// All resources tagged with their kind, in stylesheet, script, image order
    pub fn resources(&self) -> impl Iterator<Item = (ResourceKind, &Url)> {
        self.stylesheets
            .iter()
            .map(|url| (ResourceKind::Stylesheet, url))
            .chain(self.scripts.iter().map(|url| (ResourceKind::Script, url)))
            .chain(self.images.iter().map(|url| (ResourceKind::Image, url)))
    }
}

/// Resolves `raw` against the document base and splits it into resource
/// lists and crawlable links. Values that do not resolve to an HTTP(S) URL
/// are skipped. Duplicates are kept.
pub fn discover(raw: &RawResources, page_url: &Url, filter: &UrlFilter) -> Discovered {
    let base = raw
        .base
        .as_deref()
        .and_then(|base| page_url.join(base).ok())
        .unwrap_or_else(|| page_url.clone());

    let resolve_all = |values: &[String]| -> Vec<Url> {
        values
            .iter()
            .filter_map(|value| resolve(&base, value))
            .collect()
    };

    let mut images = resolve_all(&raw.images);
    for background in &raw.backgrounds {
        images.extend(
            css_urls(background)
                .iter()
                .filter_map(|value| resolve(&base, value)),
        );
    }

    let links = raw
        .links
        .iter()
        .filter_map(|value| resolve(&base, value))
        .map(|url| UrlFilter::normalize_url(&url))
        .filter(|url| filter.should_crawl(url))
        .collect();

    Discovered {
        images,
        scripts: resolve_all(&raw.scripts),
        stylesheets: resolve_all(&raw.stylesheets),
        links,
    }
}

fn resolve(base: &Url, value: &str) -> Option<Url> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    match base.join(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(url) => {
            ::log::trace!("Skipping non-HTTP reference {}", url.scheme());
            None
        }
        Err(e) => {
            ::log::debug!("Skipping unparsable reference {:?}: {}", value, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::UrlFilterConfig;

    fn page() -> Url {
        Url::parse("https://example.test/").unwrap()
    }

    fn filter() -> UrlFilter {
        UrlFilter::new(&page(), &UrlFilterConfig::default()).unwrap()
    }

    fn urls(list: &[Url]) -> Vec<&str> {
        list.iter().map(|u| u.as_str()).collect()
    }

    #[test]
    fn test_background_images_join_images() {
        let raw = RawResources {
            images: vec!["https://example.test/img/b.png".to_string()],
            backgrounds: vec![r#"url("https://example.test/img/b.png")"#.to_string()],
            ..RawResources::default()
        };

        let found = discover(&raw, &page(), &filter());
        // Not deduplicated within a page
        assert_eq!(
            urls(&found.images),
            vec![
                "https://example.test/img/b.png",
                "https://example.test/img/b.png"
            ]
        );
    }

    #[test]
    fn test_relative_values_resolve_against_base() {
        let raw = RawResources {
            base: Some("/assets/".to_string()),
            scripts: vec!["app.js".to_string()],
            stylesheets: vec!["//cdn.example.test/site.css".to_string()],
            ..RawResources::default()
        };

        let found = discover(&raw, &page(), &filter());
        assert_eq!(urls(&found.scripts), vec!["https://example.test/assets/app.js"]);
        assert_eq!(
            urls(&found.stylesheets),
            vec!["https://cdn.example.test/site.css"]
        );
    }

    #[test]
    fn test_only_same_origin_links() {
        let raw = RawResources {
            links: vec![
                "/about".to_string(),
                "https://example.test/contact#form".to_string(),
                "https://elsewhere.test/".to_string(),
                "mailto:hi@example.test".to_string(),
                "javascript:void(0)".to_string(),
                "/brochure.pdf".to_string(),
            ],
            ..RawResources::default()
        };

        let found = discover(&raw, &page(), &filter());
        assert_eq!(
            urls(&found.links),
            vec!["https://example.test/about", "https://example.test/contact"]
        );
    }

    #[test]
    fn test_unusable_values_are_skipped() {
        let raw = RawResources {
            images: vec![
                "data:image/png;base64,AAAA".to_string(),
                "blob:https://example.test/1234".to_string(),
                "   ".to_string(),
                "http://[broken".to_string(),
                "/ok.png".to_string(),
            ],
            ..RawResources::default()
        };

        let found = discover(&raw, &page(), &filter());
        assert_eq!(urls(&found.images), vec!["https://example.test/ok.png"]);
    }

    #[test]
    fn test_resources_are_tagged() {
        let raw = RawResources {
            images: vec!["/b.png".to_string()],
            stylesheets: vec!["/a.css".to_string()],
            ..RawResources::default()
        };

        let found = discover(&raw, &page(), &filter());
        let kinds: Vec<ResourceKind> = found.resources().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, vec![ResourceKind::Stylesheet, ResourceKind::Image]);
    }
}
