//! Player identification, preferences and color assignment.
//!
//! ## PlayerId
//!
//! Opaque identifier handed out by the identity service. Also used to
//! address remote participants on the replication layer.
//!
//! ## Colors
//!
//! Every enrolled player gets a distinct color from the game palette.
//! `assign_color` picks randomly among the colors nobody holds yet.

use serde::{Deserialize, Serialize};

use super::error::SetupError;
use super::rng::GameRng;

/// Participant identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Create a new player ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player {}", self.0)
    }
}

/// A player enrolled in a game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,

    /// Hex color, from the game palette.
    #[serde(default)]
    pub color: Option<String>,

    /// Whether this player created the game.
    #[serde(default)]
    pub is_host: bool,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            color: None,
            is_host: false,
        }
    }

    #[must_use]
    pub fn host(mut self) -> Self {
        self.is_host = true;
        self
    }
}

/// Per-player preferences, handed to score computation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerPreference {
    pub player: Option<PlayerId>,

    #[serde(default)]
    pub color: Option<String>,

    /// Preferred seat angle around the table, in radians.
    #[serde(default)]
    pub angle: Option<f32>,
}

/// Pick a color for a new player among those not yet taken.
///
/// Errors when every palette color is in use.
pub fn assign_color(
    players: &[Player],
    palette: &[String],
    rng: &mut GameRng,
) -> Result<String, SetupError> {
    let taken: Vec<String> = players.iter().filter_map(|p| p.color.clone()).collect();
    rng.pick_random(palette, &taken)
        .cloned()
        .ok_or(SetupError::PaletteExhausted {
            palette_size: palette.len(),
        })
}
