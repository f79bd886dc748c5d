use regex::Regex;
use std::sync::LazyLock;

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?([^'")]+?)['"]?\s*\)"#).expect("CSS url() pattern is valid")
});

/// Extracts every `url(...)` target from a CSS value such as a computed
/// `background-image`. `none` and empty values yield nothing.
pub fn css_urls(value: &str) -> Vec<String> {
    CSS_URL
        .captures_iter(value)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

/// Pulls the `background`/`background-image` declarations out of an inline style attribute
pub fn background_declarations(style: &str) -> Vec<String> {
    style
        .split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .filter(|(property, _)| {
            let property = property.trim().to_ascii_lowercase();
            property == "background" || property == "background-image"
        })
        .map(|(_, value)| value.trim().to_string())
        .collect()
}
