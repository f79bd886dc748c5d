pub mod html;
pub mod style;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Unresolved references read from a document.
///
/// Values may be relative; [`crate::discovery`] resolves them against `base`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResources {
    /// Document base URI, if the document declared or reported one
    #[serde(default, deserialize_with = "string_or_none")]
    pub base: Option<String>,

    /// `img[src]` values
    #[serde(default, deserialize_with = "string_entries")]
    pub images: Vec<String>,

    /// `background-image` style values, still wrapped in `url(...)`
    #[serde(default, deserialize_with = "string_entries")]
    pub backgrounds: Vec<String>,

    /// `script[src]` values
    #[serde(default, deserialize_with = "string_entries")]
    pub scripts: Vec<String>,

    /// `link[rel=stylesheet]` hrefs
    #[serde(default, deserialize_with = "string_entries")]
    pub stylesheets: Vec<String>,

    /// `a[href]` values
    #[serde(default, deserialize_with = "string_entries")]
    pub links: Vec<String>,
}

impl RawResources {
    /// Number of references of all kinds
    pub fn len(&self) -> usize {
        self.images.len()
            + self.backgrounds.len()
            + self.scripts.len()
            + self.stylesheets.len()
            + self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps the string entries of a list and drops anything else, such as the
/// `SVGAnimatedString` objects SVG anchors report for `href`
fn string_entries<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    let total = values.len();
    let strings: Vec<String> = values
        .into_iter()
        .filter_map(|value| match value {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect();

    if strings.len() < total {
        ::log::debug!("Dropped {} non-string references", total - strings.len());
    }
    Ok(strings)
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}
