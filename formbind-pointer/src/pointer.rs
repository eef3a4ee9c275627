//! Pointer normalization and segment handling.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PointerError, Result};

/// Normalize a pointer string: strip one leading `#`, ensure a leading `/`.
///
/// Normalization is idempotent. The root normalizes to `/`.
///
/// ```
/// use formbind_pointer::normalize;
///
/// assert_eq!(normalize("foo"), "/foo");
/// assert_eq!(normalize("/foo"), "/foo");
/// assert_eq!(normalize("#/foo"), "/foo");
/// assert_eq!(normalize("#"), "/");
/// ```
pub fn normalize(pointer: &str) -> String {
    let stripped = pointer.strip_prefix('#').unwrap_or(pointer);
    if stripped.starts_with('/') {
        stripped.to_string()
    } else {
        format!("/{stripped}")
    }
}

/// Decoded segments of a pointer. Empty segments are skipped, so `""`, `"#"`
/// and `"/"` all address the root.
pub fn segments(pointer: &str) -> Vec<String> {
    normalize(pointer)
        .split('/')
        .filter(|s| !s.is_empty())
        .map(unescape_segment)
        .collect()
}

/// Decode `~1` to `/` and `~0` to `~`.
pub fn unescape_segment(segment: &str) -> String {
    if !segment.contains('~') {
        return segment.to_string();
    }
    segment.replace("~1", "/").replace("~0", "~")
}

/// Encode `~` as `~0` and `/` as `~1`.
pub fn escape_segment(segment: &str) -> String {
    if !segment.contains(['~', '/']) {
        return segment.to_string();
    }
    segment.replace('~', "~0").replace('/', "~1")
}

/// A canonical pointer.
///
/// Construction normalizes and drops empty segments, so two pointers are
/// equal iff they address the same location: `Pointer::from("#/a")`,
/// `Pointer::from("a")` and `Pointer::from("/a/")` are all equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Pointer(String);

impl Pointer {
    /// Lenient constructor; any string is accepted and canonicalized.
    pub fn new(pointer: &str) -> Self {
        Self::from_segments(segments(pointer))
    }

    /// The root pointer `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Strict constructor that rejects dangling or unknown `~` escapes.
    pub fn parse(pointer: &str) -> Result<Self> {
        let bytes = pointer.as_bytes();
        for (position, byte) in bytes.iter().enumerate() {
            if *byte == b'~' && !matches!(bytes.get(position + 1), Some(b'0') | Some(b'1')) {
                return Err(PointerError::InvalidEscape {
                    pointer: pointer.to_string(),
                    position,
                });
            }
        }
        Ok(Self::new(pointer))
    }

    /// Build a pointer from raw (unescaped) segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = String::new();
        for segment in segments {
            out.push('/');
            out.push_str(&escape_segment(segment.as_ref()));
        }
        if out.is_empty() {
            out.push('/');
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decoded segments, root yields none.
    pub fn segments(&self) -> Vec<String> {
        segments(&self.0)
    }

    pub fn is_root(&self) -> bool {
        self.segments().is_empty()
    }

    /// Append a sub-path, e.g. a row reference emitted by a composite control.
    ///
    /// ```
    /// use formbind_pointer::Pointer;
    ///
    /// let rows = Pointer::new("#/rows");
    /// assert_eq!(rows.join("1/name").as_str(), "/rows/1/name");
    /// assert_eq!(Pointer::root().join("/a").as_str(), "/a");
    /// ```
    pub fn join(&self, sub: &str) -> Pointer {
        let mut all = self.segments();
        all.extend(segments(sub));
        Self::from_segments(all)
    }

    /// True when `self` is a strict, segment-wise prefix of `other`.
    pub fn is_ancestor_of(&self, other: &Pointer) -> bool {
        let mine = self.segments();
        let theirs = other.segments();
        mine.len() < theirs.len() && theirs.starts_with(&mine)
    }

    /// Equal, ancestor, or descendant.
    pub fn is_related_to(&self, other: &Pointer) -> bool {
        let mine = self.segments();
        let theirs = other.segments();
        mine.starts_with(&theirs) || theirs.starts_with(&mine)
    }
}

impl Default for Pointer {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Pointer {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Pointer {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Pointer {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<Pointer> for String {
    fn from(value: Pointer) -> Self {
        value.0
    }
}

impl FromStr for Pointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
