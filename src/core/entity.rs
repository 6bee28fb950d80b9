//! Piece and anchor identification.
//!
//! Every game object on the table (card, tile, token, die, board) is a piece
//! with a unique `PieceId`. Ids are strings because game descriptors name
//! their pieces (`"card-12"`, `"board"`), and peers exchange them verbatim.
//!
//! Anchors are identified by an `AnchorId` that is only unique *within the
//! piece carrying it*.
//!
//! ## Usage
//!
//! ```
//! use rust_tabletop::core::{AnchorId, PieceId};
//!
//! let card = PieceId::new("card-12");
//! assert_eq!(card.as_str(), "card-12");
//!
//! let anchor: AnchorId = "reserve".into();
//! assert_eq!(anchor.to_string(), "reserve");
//! ```

use serde::{Deserialize, Serialize};

/// Unique identifier of a piece.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceId(pub String);

impl PieceId {
    /// Create a piece ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the id of a piece split off this one.
    ///
    /// `n` disambiguates successive splits: `"chips"` gives `"chips-1"`,
    /// `"chips-2"`, ...
    #[must_use]
    pub fn derived(&self, n: u32) -> Self {
        Self(format!("{}-{}", self.0, n))
    }
}

impl From<&str> for PieceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PieceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PieceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an anchor, unique within its owning piece.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(pub String);

impl AnchorId {
    /// Create an anchor ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AnchorId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AnchorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
