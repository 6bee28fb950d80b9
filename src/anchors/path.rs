//! Parsed anchor chains.
//!
//! Game descriptions address nested attachment points with dotted strings:
//! `"column-3.bottom.top"` is the anchor `top` on whatever is snapped into
//! `bottom` on whatever is snapped into `column-3`. The string is parsed once
//! into an `AnchorPath`; resolution walks the segments.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::AnchorId;

/// A dotted anchor chain was empty or had an empty segment.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid anchor path {0:?}")]
pub struct InvalidAnchorPath(pub String);

/// Non-empty sequence of anchor ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnchorPath {
    segments: SmallVec<[AnchorId; 3]>,
}

impl AnchorPath {
    /// Parse a dotted chain.
    pub fn parse(chain: &str) -> Result<Self, InvalidAnchorPath> {
        let segments: SmallVec<[AnchorId; 3]> = chain.split('.').map(AnchorId::from).collect();
        if segments.iter().any(|s| s.as_str().is_empty()) {
            return Err(InvalidAnchorPath(chain.to_string()));
        }
        Ok(Self { segments })
    }

    /// Single-segment path.
    #[must_use]
    pub fn single(anchor: impl Into<AnchorId>) -> Self {
        let mut segments = SmallVec::new();
        segments.push(anchor.into());
        Self { segments }
    }

    #[must_use]
    pub fn segments(&self) -> &[AnchorId] {
        &self.segments
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl std::str::FromStr for AnchorPath {
    type Err = InvalidAnchorPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AnchorPath {
    type Error = InvalidAnchorPath;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AnchorPath> for String {
    fn from(path: AnchorPath) -> Self {
        path.to_string()
    }
}

impl std::fmt::Display for AnchorPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let path = AnchorPath::parse("column-3.bottom.top").unwrap();
        assert_eq!(path.depth(), 3);
        assert_eq!(path.segments()[1], AnchorId::new("bottom"));
        assert_eq!(path.to_string(), "column-3.bottom.top");
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(AnchorPath::parse("").is_err());
        assert!(AnchorPath::parse("a..b").is_err());
        assert!(AnchorPath::parse("a.").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let path: AnchorPath = serde_json::from_str("\"reserve.top\"").unwrap();
        assert_eq!(path.depth(), 2);
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"reserve.top\"");
        assert!(serde_json::from_str::<AnchorPath>("\"..\"").is_err());
    }
}
