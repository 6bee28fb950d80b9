//! Core engine types: ids, players, pieces, the piece graph, actions, state,
//! RNG, configuration and errors.
//!
//! Everything here is game-agnostic. Games describe their pieces through
//! capability structs and their setup through `setup::GameSetup`.

pub mod entity;
pub mod player;
pub mod rng;
pub mod config;
pub mod piece;
pub mod graph;
pub mod action;
pub mod state;
pub mod error;

pub use entity::{AnchorId, PieceId};
pub use player::{assign_color, Player, PlayerId, PlayerPreference};
pub use rng::GameRng;
pub use config::EngineConfig;
pub use piece::{
    Anchor, Anchorable, Drawable, Flippable, Lockable, Movable, Piece, PiecePatch, Quantifiable,
    Randomizable, Rotable, Shape, Stackable, Vec3,
};
pub use graph::PieceGraph;
pub use action::{Change, Gesture, HistoryRecord, Invocation, Operation, Revert};
pub use state::{EngineState, Table};
pub use error::{Rejection, ReplicationError, SetupError};
