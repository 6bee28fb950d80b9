//! Deck game: a shuffled deck, a reserve card, chips and dice.
//!
//! A minimal game exercising the engine:
//! - One card is dealt on the reserve anchor, the rest form a deck
//! - Each enrolled player gets a chip stick and a six-sided die
//! - Chips snapped on a player's score anchor count as their score

mod game;

pub use game::{chips_id, die_id, score_anchor, DeckGame, DeckGameBuilder, BOARD, DISCARD, RESERVE};
