//! Media types and Accept-header ranges.
//!
//! [`MediaType`] wraps [`mime::Mime`] and compares by essence (`type/subtype`,
//! lowercase, parameters ignored). [`MediaRange`] is one entry of an Accept
//! header; [`parse_accept`] splits a header into ranges and [`quality`] scores
//! a concrete type against them.

use mime::Mime;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// `application/json`, the default for unset consumes/produces.
pub const APPLICATION_JSON: &str = "application/json";

/// Error parsing a media type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid media type '{value}': {reason}")]
pub struct MediaTypeError {
    /// The rejected input.
    pub value: String,
    /// Parser message.
    pub reason: String,
}

/// A concrete media type such as `application/vnd.acme.order+json`.
///
/// # Example
///
/// ```
/// use hermes_registry::MediaType;
///
/// let mt = MediaType::parse("application/vnd.acme.order+json; charset=utf-8").unwrap();
/// assert_eq!(mt.essence(), "application/vnd.acme.order+json");
/// assert_eq!(mt.suffix(), Some("json"));
/// assert_eq!(mt.super_type().essence(), "application/json");
/// assert!(mt.is_json());
/// ```
#[derive(Debug, Clone)]
pub struct MediaType {
    mime: Mime,
}

impl MediaType {
    /// Parses a media type. Wildcards are rejected.
    pub fn parse(value: &str) -> Result<Self, MediaTypeError> {
        let mime: Mime = value.trim().parse().map_err(|e: mime::FromStrError| MediaTypeError {
            value: value.to_string(),
            reason: e.to_string(),
        })?;
        if mime.type_() == mime::STAR || mime.subtype() == mime::STAR {
            return Err(MediaTypeError {
                value: value.to_string(),
                reason: "wildcards are not allowed in a concrete media type".to_string(),
            });
        }
        Ok(Self { mime })
    }

    /// `application/json`.
    #[must_use]
    pub fn json() -> Self {
        Self {
            mime: mime::APPLICATION_JSON,
        }
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> &str {
        self.mime.essence_str()
    }

    /// Returns the top-level type, e.g. `application`.
    #[must_use]
    pub fn top_level(&self) -> &str {
        self.mime.type_().as_str()
    }

    /// Returns the full subtype including any suffix, e.g. `vnd.acme+json`.
    #[must_use]
    pub fn subtype(&self) -> &str {
        let essence = self.essence();
        essence
            .split_once('/')
            .map(|(_, sub)| sub)
            .unwrap_or(essence)
    }

    /// Returns the structured syntax suffix, e.g. `json` for `a/x+json`.
    #[must_use]
    pub fn suffix(&self) -> Option<&str> {
        self.mime.suffix().map(|name| name.as_str())
    }

    /// Returns `top/suffix` for suffixed types, or a copy of `self` otherwise.
    #[must_use]
    pub fn super_type(&self) -> Self {
        self.suffix()
            .and_then(|suffix| Self::parse(&format!("{}/{suffix}", self.top_level())).ok())
            .unwrap_or_else(|| self.clone())
    }

    /// Returns true for `application/json` and any `+json` type.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.essence() == APPLICATION_JSON || self.suffix() == Some("json")
    }

    /// Returns true for `text/plain`.
    #[must_use]
    pub fn is_text_plain(&self) -> bool {
        self.essence() == "text/plain"
    }

    /// Returns the underlying [`Mime`], parameters included.
    #[must_use]
    pub fn as_mime(&self) -> &Mime {
        &self.mime
    }
}

impl PartialEq for MediaType {
    fn eq(&self, other: &Self) -> bool {
        self.essence() == other.essence()
    }
}

impl Eq for MediaType {}

impl Hash for MediaType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.essence().hash(state);
    }
}

impl PartialOrd for MediaType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.essence().cmp(other.essence())
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.essence())
    }
}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One range of an Accept header, such as `text/*;q=0.5`.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    top_level: String,
    subtype: String,
    q: f32,
}

impl MediaRange {
    /// `*/*` with quality 1.
    #[must_use]
    pub fn any() -> Self {
        Self {
            top_level: "*".to_string(),
            subtype: "*".to_string(),
            q: 1.0,
        }
    }

    /// A range matching exactly `media_type`, with quality 1.
    #[must_use]
    pub fn exact(media_type: &MediaType) -> Self {
        Self {
            top_level: media_type.top_level().to_string(),
            subtype: media_type.subtype().to_string(),
            q: 1.0,
        }
    }

    /// Parses one range. Returns `None` for malformed input or an invalid `q`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let mime: Mime = value.trim().parse().ok()?;
        let top_level = mime.type_().as_str().to_string();
        let subtype = mime
            .essence_str()
            .split_once('/')
            .map(|(_, sub)| sub.to_string())?;
        // `*/json` is not a valid range
        if top_level == "*" && subtype != "*" {
            return None;
        }
        let q = match mime.get_param("q") {
            Some(raw) => raw.as_str().parse::<f32>().ok()?,
            None => 1.0,
        };
        if !(0.0..=1.0).contains(&q) {
            return None;
        }
        Some(Self {
            top_level,
            subtype,
            q,
        })
    }

    /// Returns the quality weight.
    #[must_use]
    pub fn q(&self) -> f32 {
        self.q
    }

    /// Returns how specifically this range matches `media_type`:
    /// 2 for an exact match, 1 for `type/*`, 0 for `*/*`, `None` for no match.
    #[must_use]
    pub fn specificity(&self, media_type: &MediaType) -> Option<u8> {
        if self.top_level == "*" {
            return Some(0);
        }
        if self.top_level != media_type.top_level() {
            return None;
        }
        if self.subtype == "*" {
            return Some(1);
        }
        (self.subtype == media_type.subtype()).then_some(2)
    }
}

impl fmt::Display for MediaRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.top_level, self.subtype)?;
        if (self.q - 1.0).abs() > f32::EPSILON {
            write!(f, ";q={}", self.q)?;
        }
        Ok(())
    }
}

/// Parses an Accept header into ranges.
///
/// Malformed entries are skipped. A missing header, or one with no valid
/// entries, yields a single `*/*`.
#[must_use]
pub fn parse_accept(header: Option<&str>) -> Vec<MediaRange> {
    let ranges: Vec<MediaRange> = header
        .map(|value| value.split(',').filter_map(MediaRange::parse).collect())
        .unwrap_or_default();
    if ranges.is_empty() {
        vec![MediaRange::any()]
    } else {
        ranges
    }
}

/// Returns the quality of `media_type` under `ranges`.
///
/// The most specific matching range decides; the first one wins among equally
/// specific ranges. Returns 0.0 when nothing matches.
#[must_use]
pub fn quality(ranges: &[MediaRange], media_type: &MediaType) -> f32 {
    let mut best: Option<(u8, f32)> = None;
    for range in ranges {
        if let Some(specificity) = range.specificity(media_type) {
            if best.map_or(true, |(s, _)| specificity > s) {
                best = Some((specificity, range.q));
            }
        }
    }
    best.map_or(0.0, |(_, q)| q)
}
