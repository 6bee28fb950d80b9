//! Wire codec: bincode over the serde derives.

use crate::core::{PlayerId, ReplicationError};

use super::message::PeerMessage;

pub fn encode(message: &PeerMessage) -> Result<Vec<u8>, ReplicationError> {
    bincode::serialize(message).map_err(ReplicationError::Encode)
}

/// Decode bytes received from `from`.
pub fn decode(from: &PlayerId, bytes: &[u8]) -> Result<PeerMessage, ReplicationError> {
    bincode::deserialize(bytes).map_err(|source| ReplicationError::Decode {
        from: from.clone(),
        source,
    })
}
