//! Setup resolver: declarative game descriptions to initial piece lists.
//!
//! ## Key Types
//!
//! - `Bag`: Randomized pool of piece ids, consumed during setup
//! - `Slot`: Placement rule drawing from a bag
//! - `GameSetup`: Pieces, bags and slots returned by a game descriptor
//! - `SetupResolver`: Runs the slots and returns the pieces in play

pub mod description;
pub mod resolver;

pub use description::{Bag, GameSetup, Slot};
pub use resolver::SetupResolver;
