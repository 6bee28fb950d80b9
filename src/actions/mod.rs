//! Action engine: gesture resolution, precondition checks, history.
//!
//! ## Key Types
//!
//! - `ActionEngine`: Applies local, remote and replayed operations
//! - `DragTracker`: Cancels drags released before the commit threshold

pub mod engine;
pub mod drag;

pub use engine::ActionEngine;
pub use drag::{DragOutcome, DragTracker};
