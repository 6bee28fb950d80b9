//! Game descriptor contract.
//!
//! Games implement `GameDescriptor` to supply:
//! - The initial setup (pieces, bags, slots)
//! - Per-player additions when someone enrolls
//! - A parameter schema to ask new players for
//! - Score computation from the current table
//!
//! The engine calls into descriptors but never interprets game-specific
//! pieces or anchors itself.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{HistoryRecord, Player, PlayerId, PlayerPreference, Table};
use crate::setup::GameSetup;

/// Colors handed out when a descriptor does not choose its own.
pub const DEFAULT_PALETTE: [&str; 8] = [
    "#e53935", "#1e88e5", "#43a047", "#fdd835", "#8e24aa", "#fb8c00", "#00acc1", "#6d4c41",
];

/// Score per player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scores(pub FxHashMap<PlayerId, i64>);

impl Scores {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, player: PlayerId, score: i64) {
        self.0.insert(player, score);
    }

    /// Score of `player`, 0 when absent.
    #[must_use]
    pub fn get(&self, player: &PlayerId) -> i64 {
        self.0.get(player).copied().unwrap_or(0)
    }

    /// Players sharing the highest score, ordered by id.
    #[must_use]
    pub fn leaders(&self) -> Vec<PlayerId> {
        let Some(best) = self.0.values().max().copied() else {
            return Vec::new();
        };
        let mut leaders: Vec<PlayerId> = self
            .0
            .iter()
            .filter(|(_, score)| **score == best)
            .map(|(player, _)| player.clone())
            .collect();
        leaders.sort();
        leaders
    }
}

/// A game package.
///
/// ## Implementation Notes
///
/// - `build`: Called once when the game is created
/// - `add_player`: Receives the current pieces as `meshes`; any bags and
///   slots it adds are resolved like the initial setup
/// - `compute_score`: Must derive scores from `table` alone, never
///   incrementally; return `None` when `last` cannot change them
pub trait GameDescriptor {
    /// Game name, for logs.
    fn name(&self) -> &str;

    /// Initial setup.
    fn build(&self) -> GameSetup;

    /// Setup after `player` joined with `parameters`.
    fn add_player(&self, setup: GameSetup, _player: &Player, _parameters: &Value) -> GameSetup {
        setup
    }

    /// JSON schema of the parameters to ask `player` for, if any.
    fn ask_for_parameters(&self, _setup: &GameSetup, _player: &Player) -> Option<Value> {
        None
    }

    /// Scores after `last` was applied.
    fn compute_score(
        &self,
        _last: &HistoryRecord,
        _table: &Table,
        _players: &[Player],
        _preferences: &[PlayerPreference],
    ) -> Option<Scores> {
        None
    }

    /// Player colors.
    fn palette(&self) -> Vec<String> {
        DEFAULT_PALETTE.iter().map(|c| (*c).to_string()).collect()
    }
}
