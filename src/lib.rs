//! # rust-tabletop
//!
//! A shared-tabletop engine: players move, stack, snap, flip and draw
//! pieces on a common table, each participant holding a full replica.
//!
//! ## Design Principles
//!
//! 1. **Game-Agnostic**: Pieces are plain capability bundles (movable,
//!    stackable, anchorable, ...). Games describe their table declaratively
//!    and the engine never hardcodes cards, dice or boards.
//!
//! 2. **Explicit Operations**: Every gesture resolves to a replayable
//!    operation with its random outcomes filled in, so any participant can
//!    apply it and reach the same state.
//!
//! 3. **Single Update Loop**: All mutations of a participant go through
//!    `&mut GameSession`; network events are queued and applied in receipt
//!    order.
//!
//! ## Architecture
//!
//! - **Persistent History**: Records live in an `im` vector so snapshots
//!   and replays clone it cheaply.
//!
//! - **Private Hands**: Drawn pieces leave the shared graph; remote hands
//!   are tracked as counts until their pieces are played back.
//!
//! ## Modules
//!
//! - `core`: Ids, pieces, the piece graph, operations, state, RNG, errors
//! - `anchors`: Anchor chains, snapping and stacking
//! - `setup`: Declarative setups resolved into initial pieces
//! - `hands`: Per-player private piece lists
//! - `actions`: Gesture resolution, application, undo and replay
//! - `replication`: Peer messages, codec and the replicator state machine
//! - `rules`: `GameDescriptor` trait for game implementations
//! - `session`: One participant's game loop
//! - `games`: Sample game implementations

pub mod core;
pub mod anchors;
pub mod setup;
pub mod hands;
pub mod actions;
pub mod replication;
pub mod rules;
pub mod session;
pub mod games;

// Re-export commonly used types
pub use crate::core::{
    AnchorId, PieceId, Player, PlayerId, PlayerPreference,
    GameRng, EngineConfig,
    Piece, PiecePatch, Shape, Vec3, PieceGraph,
    Change, Gesture, HistoryRecord, Invocation, Operation,
    EngineState, Table,
    Rejection, ReplicationError, SetupError,
};

pub use crate::anchors::AnchorPath;

pub use crate::setup::{Bag, GameSetup, SetupResolver, Slot};

pub use crate::hands::{Hand, HandManager};

pub use crate::actions::{ActionEngine, DragOutcome, DragTracker};

pub use crate::replication::{ActionMessage, Delivery, Inbound, Outbound, PeerMessage, Replicator};

pub use crate::rules::{GameDescriptor, Scores};

pub use crate::session::{GameSession, SavedGame};

pub use crate::games::deck::DeckGame;
