//! Game sessions: one participant's update loop.
//!
//! ## Key Types
//!
//! - `GameSession`: Ties a descriptor, the action engine and the replicator
//! - `SavedGame`: Serialized form for save/load

pub mod game;

pub use game::{GameSession, SavedGame};
