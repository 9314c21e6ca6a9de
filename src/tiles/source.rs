use crate::core::geo::TileCoord;
use crate::{MapError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// Kinds of placeholders for a `UrlTemplate`
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
enum Placeholder {
    X,
    Y,
    Z,
}

/// Matches `%d` (positional: zoom, x, y in that order) and `{x}`, `{y}`, `{z}`.
static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%d|\{([a-z]+)\}").expect("placeholder pattern is valid"));

/// A tile URL template such as `https://tile.openstreetmap.org/%d/%d/%d.png`
/// or `https://tiles.example.com/{z}/{x}/{y}.png`.
#[derive(Debug, Clone)]
pub struct UrlTemplate {
    /// The template string that includes placeholders between static parts
    template: String,
    /// Ranges into `template` for static parts; always one more than placeholders
    static_parts: Vec<Range<usize>>,
    placeholders: Vec<Placeholder>,
}

impl UrlTemplate {
    pub fn new<S: Into<String>>(template: S) -> Result<Self> {
        let template = template.into();
        let mut static_parts = vec![];
        let mut placeholders = vec![];
        let mut positional = [Placeholder::Z, Placeholder::X, Placeholder::Y].into_iter();

        let mut offset = 0;
        for cap in PLACEHOLDER_RE.captures_iter(&template) {
            let Some(whole) = cap.get(0) else { continue };
            static_parts.push(offset..whole.start());

            let placeholder = match cap.get(1).map(|m| m.as_str()) {
                None => positional.next().ok_or_else(|| {
                    MapError::InvalidTemplate(format!("too many %d placeholders in {:?}", template))
                })?,
                Some("x") => Placeholder::X,
                Some("y") => Placeholder::Y,
                Some("z") => Placeholder::Z,
                Some(other) => {
                    return Err(MapError::InvalidTemplate(format!(
                        "unknown placeholder {{{}}} in {:?}",
                        other, template
                    )))
                }
            };
            placeholders.push(placeholder);
            offset = whole.end();
        }
        static_parts.push(offset..template.len());

        let complete = [Placeholder::X, Placeholder::Y, Placeholder::Z]
            .iter()
            .all(|p| placeholders.contains(p));
        if !complete {
            return Err(MapError::InvalidTemplate(format!(
                "template needs zoom, x and y placeholders: {:?}",
                template
            )));
        }

        Ok(Self {
            template,
            static_parts,
            placeholders,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    pub fn fill(&self, coord: TileCoord) -> String {
        let mut url = String::with_capacity(self.template.len() + 16);
        url.push_str(&self.template[self.static_parts[0].clone()]);

        for (placeholder, part) in self.placeholders.iter().zip(self.static_parts.iter().skip(1)) {
            let value = match placeholder {
                Placeholder::X => coord.x,
                Placeholder::Y => coord.y,
                Placeholder::Z => coord.z as u32,
            };
            url.push_str(&value.to_string());
            url.push_str(&self.template[part.clone()]);
        }
        url
    }
}

impl TileSource for UrlTemplate {
    fn url(&self, coord: TileCoord) -> String {
        self.fill(coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_templ(template: &str, coord: TileCoord, result: &str) {
        let t = UrlTemplate::new(template).unwrap();
        assert_eq!(t.url(coord), result);
    }

    #[test]
    fn check_new() {
        assert!(UrlTemplate::new("").is_err());
        assert!(UrlTemplate::new("abc").is_err());
        assert!(UrlTemplate::new("{x}").is_err());
        assert!(UrlTemplate::new("{z}{y}").is_err());
        assert!(UrlTemplate::new("%d/%d").is_err());
        assert!(UrlTemplate::new("%d/%d/%d/%d").is_err());
        assert!(UrlTemplate::new("{x}{z}{q}").is_err());
        assert!(UrlTemplate::new("{x}{z}{y}").is_ok());
        assert!(UrlTemplate::new("%d/%d/%d").is_ok());
    }

    #[test]
    fn check_fill() {
        check_templ(
            "https://tile.openstreetmap.org/%d/%d/%d.png",
            TileCoord::new(1, 0, 2),
            "https://tile.openstreetmap.org/2/1/0.png",
        );
        check_templ(
            "https://tiles.example.com/{z}/{x}/{y}.png",
            TileCoord::new(1, 0, 2),
            "https://tiles.example.com/2/1/0.png",
        );
        check_templ("{x}{x}{y}{z}", TileCoord::new(1, 0, 2), "1102");
        check_templ("{y}-%d-{x}", TileCoord::new(7, 9, 5), "9-5-7");
    }
}
