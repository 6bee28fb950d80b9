//! Anchor resolver: attachment points, anchor chains and stacking.
//!
//! ## Key Types
//!
//! - `AnchorPath`: Parsed dotted anchor chain (`"column-3.bottom.top"`)
//! - `AnchorRef`: A resolved anchor (owning piece + anchor id)
//!
//! ## Operations
//!
//! - `resolve_chain`: Walk a chain through currently snapped pieces
//! - `snap` / `unsnap`: Attach and release pieces
//! - `stack_onto`: Append pieces to a stack

pub mod path;
pub mod resolver;

pub use path::{AnchorPath, InvalidAnchorPath};
pub use resolver::{layout_stack, resolve_chain, snap, stack_onto, unsnap, AnchorRef};
