//! Replication layer: propagates applied changes between participants.
//!
//! ## Key Types
//!
//! - `PeerMessage`: Action, snapshot request, snapshot
//! - `Replicator`: Join sequence, buffering, fan-out
//! - `Inbound` / `Outbound`: Explicit queues shared with the connection driver
//!
//! Connection negotiation is external: the replicator only relays opaque
//! signal payloads.

pub mod message;
pub mod codec;
pub mod peer;
pub mod replicator;

pub use message::{is_shared, ActionMessage, PeerMessage};
pub use codec::{decode, encode};
pub use peer::{PeerSet, PeerStatus};
pub use replicator::{Delivery, Inbound, Outbound, Replicator};
