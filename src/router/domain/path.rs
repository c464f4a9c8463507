//! Route patterns, path matching, and relative path resolution.
//!
//! Patterns are slash-separated. A segment is either static text, a
//! `:name` parameter capturing exactly one path segment, or `*` in the last
//! position which captures zero or more trailing segments. A `*` anywhere
//! else is treated as literal text.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Marker used for absolute paths inside relative sub-calls.
const ABSOLUTE_MARKER: &str = "@/";

/// Parameter name under which the wildcard tail is captured.
pub const WILDCARD_PARAM: &str = "*";

/// One segment of a parsed route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PatternSegment {
    Static(String),
    Param(String),
}

/// A parsed route pattern.
///
/// # Examples
///
/// ```
/// use switchboard::router::domain::RoutePattern;
///
/// let pattern = RoutePattern::parse("/users/:id/*");
/// let matched = pattern.matches("/users/42/posts/7").expect("pattern matches");
/// assert_eq!(matched.param("id"), Some("42"));
/// assert_eq!(matched.param("*"), Some("posts/7"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<PatternSegment>,
    wildcard_tail: bool,
}

impl RoutePattern {
    /// Parses a route pattern. Parsing never fails; malformed segments are
    /// kept as static text.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let parts = split_path(pattern);
        let last_index = parts.len().saturating_sub(1);
        let mut segments = Vec::with_capacity(parts.len());
        let mut wildcard_tail = false;

        for (index, part) in parts.iter().enumerate() {
            if *part == WILDCARD_PARAM && index == last_index {
                wildcard_tail = true;
                continue;
            }
            match part.strip_prefix(':') {
                Some(name) if !name.is_empty() => {
                    segments.push(PatternSegment::Param(name.to_owned()));
                }
                _ => segments.push(PatternSegment::Static((*part).to_owned())),
            }
        }

        let raw = render(&segments, wildcard_tail);
        Self {
            raw,
            segments,
            wildcard_tail,
        }
    }

    /// Returns the normalized pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns `true` when the pattern ends in a wildcard tail.
    #[must_use]
    pub const fn has_wildcard(&self) -> bool {
        self.wildcard_tail
    }

    /// Returns `true` when the pattern declares at least one parameter.
    #[must_use]
    pub fn has_params(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, PatternSegment::Param(_)))
    }

    /// Returns a copy of this pattern mounted beneath `prefix`.
    #[must_use]
    pub fn with_prefix(&self, prefix: &str) -> Self {
        let mut combined = Self::parse(prefix);
        if combined.wildcard_tail {
            // A wildcard prefix cannot be extended; mount beneath it literally.
            combined
                .segments
                .push(PatternSegment::Static(WILDCARD_PARAM.to_owned()));
            combined.wildcard_tail = false;
        }
        combined.segments.extend(self.segments.iter().cloned());
        combined.wildcard_tail = self.wildcard_tail;
        combined.raw = render(&combined.segments, combined.wildcard_tail);
        combined
    }

    /// Matches a concrete path against this pattern.
    ///
    /// Returns `None` when the path does not match.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<RouteMatch> {
        let parts = split_path(path);
        if parts.len() < self.segments.len() {
            return None;
        }
        if !self.wildcard_tail && parts.len() != self.segments.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        let mut ranks = Vec::with_capacity(parts.len().saturating_add(1));
        for (segment, part) in self.segments.iter().zip(parts.iter()) {
            match segment {
                PatternSegment::Static(text) => {
                    if text != part {
                        return None;
                    }
                    ranks.push(SegmentRank::Static);
                }
                PatternSegment::Param(name) => {
                    params.insert(name.clone(), (*part).to_owned());
                    ranks.push(SegmentRank::Param);
                }
            }
        }

        if self.wildcard_tail {
            let tail: Vec<&str> = parts.iter().skip(self.segments.len()).copied().collect();
            ranks.extend(tail.iter().map(|_| SegmentRank::Wildcard));
            ranks.push(SegmentRank::OpenEnd);
            params.insert(WILDCARD_PARAM.to_owned(), tail.join("/"));
        } else {
            ranks.push(SegmentRank::ExactEnd);
        }

        Some(RouteMatch {
            params,
            specificity: Specificity(ranks),
        })
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Rank of one matched segment; higher is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum SegmentRank {
    OpenEnd,
    Wildcard,
    ExactEnd,
    Param,
    Static,
}

/// Ordering key for competing matches of the same path.
///
/// Compared segment by segment: static beats parameter beats wildcard, and an
/// exact end beats an open wildcard tail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Specificity(Vec<SegmentRank>);

impl PartialOrd for Specificity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Specificity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// Result of a successful pattern match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    params: BTreeMap<String, String>,
    specificity: Specificity,
}

impl RouteMatch {
    /// Returns a captured parameter value.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns all captured parameters.
    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Consumes the match and returns its captured parameters.
    #[must_use]
    pub fn into_params(self) -> BTreeMap<String, String> {
        self.params
    }

    /// Returns the specificity of the match.
    #[must_use]
    pub const fn specificity(&self) -> &Specificity {
        &self.specificity
    }
}

/// Splits a path into its non-empty segments.
#[must_use]
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|part| !part.is_empty()).collect()
}

/// Normalizes a path to a leading slash without a trailing slash.
///
/// # Examples
///
/// ```
/// use switchboard::router::domain::normalize_path;
///
/// assert_eq!(normalize_path("a//b/"), "/a/b");
/// assert_eq!(normalize_path(""), "/");
/// ```
#[must_use]
pub fn normalize_path(path: &str) -> String {
    format!("/{}", split_path(path).join("/"))
}

/// Joins a mount prefix and a path.
#[must_use]
pub fn join_paths(prefix: &str, path: &str) -> String {
    normalize_path(&format!("{prefix}/{path}"))
}

/// Resolves a sub-call target against the caller's current path.
///
/// `/x` and `@/x` are absolute; anything else is relative to `current`.
/// `.` and `..` segments are collapsed, and `..` never climbs above the
/// root.
///
/// # Examples
///
/// ```
/// use switchboard::router::domain::resolve_path;
///
/// assert_eq!(resolve_path("/research", "summarize"), "/research/summarize");
/// assert_eq!(resolve_path("/research/deep", "../plan"), "/research/plan");
/// assert_eq!(resolve_path("/research", "@/brain"), "/brain");
/// ```
#[must_use]
pub fn resolve_path(current: &str, target: &str) -> String {
    let combined = if let Some(absolute) = target.strip_prefix(ABSOLUTE_MARKER) {
        absolute.to_owned()
    } else if target.starts_with('/') {
        target.to_owned()
    } else {
        format!("{current}/{target}")
    };

    let mut resolved: Vec<&str> = Vec::new();
    for part in split_path(&combined) {
        match part {
            "." => {}
            ".." => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    format!("/{}", resolved.join("/"))
}

fn render(segments: &[PatternSegment], wildcard_tail: bool) -> String {
    let mut parts: Vec<String> = segments
        .iter()
        .map(|segment| match segment {
            PatternSegment::Static(text) => text.clone(),
            PatternSegment::Param(name) => format!(":{name}"),
        })
        .collect();
    if wildcard_tail {
        parts.push(WILDCARD_PARAM.to_owned());
    }
    format!("/{}", parts.join("/"))
}
