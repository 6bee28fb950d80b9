//! Game descriptor contract for game packages.
//!
//! Games implement `GameDescriptor` to define:
//! - Their setup and per-player additions
//! - Parameters asked to joining players
//! - Scores
//!
//! The setup resolver and action engine are generic over any descriptor.

pub mod descriptor;

pub use descriptor::{GameDescriptor, Scores, DEFAULT_PALETTE};
