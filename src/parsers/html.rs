use crate::parsers::RawResources;
use crate::parsers::style::background_declarations;
use scraper::{Html, Selector};

/// Reads resource references from serialized HTML.
///
/// Used when in-page evaluation is unavailable. Only inline `style`
/// attributes are seen here; backgrounds set by stylesheets need the live DOM.
pub fn parse(html: &str) -> RawResources {
    let doc = Html::parse_document(html);

    let base = select_attr(&doc, "base[href]", "href").into_iter().next();
    let images = select_attr(&doc, "img[src]", "src");
    let scripts = select_attr(&doc, "script[src]", "src");
    let stylesheets = select_attr(&doc, r#"link[rel~="stylesheet" i][href]"#, "href");
    let links = select_attr(&doc, "a[href]", "href");

    let backgrounds = select_attr(&doc, "[style]", "style")
        .iter()
        .flat_map(|style| background_declarations(style))
        .collect();

    let raw = RawResources {
        base,
        images,
        backgrounds,
        scripts,
        stylesheets,
        links,
    };

    ::log::debug!("HTML parser found {} references", raw.len());
    raw
}

fn select_attr(doc: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        ::log::warn!("Skipping invalid selector {}", selector);
        return Vec::new();
    };

    doc.select(&selector)
        .filter_map(|e| e.value().attr(attr))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_references() {
        let html = r#"<html><head>
            <link rel="stylesheet" href="/css/a.css">
            <link rel="icon" href="/favicon.ico">
            <script src="/js/app.js"></script>
            <script>inline()</script>
        </head><body>
            <img src="/img/b.png">
            <div style="background-image: url('/img/b.png')"></div>
            <a href="/about">About</a>
            <a>No href</a>
        </body></html>"#;

        let raw = parse(html);
        assert_eq!(raw.stylesheets, vec!["/css/a.css"]);
        assert_eq!(raw.scripts, vec!["/js/app.js"]);
        assert_eq!(raw.images, vec!["/img/b.png"]);
        assert_eq!(raw.backgrounds, vec!["url('/img/b.png')"]);
        assert_eq!(raw.links, vec!["/about"]);
        assert_eq!(raw.base, None);
    }

    #[test]
    fn test_rel_with_multiple_tokens() {
        let html = r#"<link rel="Alternate StyleSheet" href="/alt.css">"#;
        assert_eq!(parse(html).stylesheets, vec!["/alt.css"]);
    }

    #[test]
    fn test_base_href() {
        let html = r#"<head><base href="https://example.test/sub/"></head>"#;
        assert_eq!(
            parse(html).base.as_deref(),
            Some("https://example.test/sub/")
        );
    }

    #[test]
    fn test_empty_document() {
        assert!(parse("").is_empty());
    }
}
