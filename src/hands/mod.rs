//! Hand manager: private per-player piece lists.
//!
//! ## Key Types
//!
//! - `Hand`: A player's private pieces (the serialized form)
//! - `HandManager`: Draw/play transitions between the shared graph and hands

pub mod manager;

pub use manager::{Hand, HandManager};
