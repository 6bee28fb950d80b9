//! Peer connection bookkeeping.

use rustc_hash::FxHashMap;

use crate::core::PlayerId;

/// State of the connection with one remote participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerStatus {
    /// Signals exchanged, data channel not open yet.
    Negotiating,
    Open,
    Closed,
}

/// Every remote participant this one has heard of.
///
/// Open peers are kept in opening order: the join sequence asks them for a
/// snapshot in that order.
#[derive(Clone, Debug, Default)]
pub struct PeerSet {
    status: FxHashMap<PlayerId, PeerStatus>,
    opened: Vec<PlayerId>,
}

impl PeerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a negotiation with `peer`. Open channels are left alone.
    pub fn negotiate(&mut self, peer: &PlayerId) {
        let status = self
            .status
            .entry(peer.clone())
            .or_insert(PeerStatus::Negotiating);
        if *status == PeerStatus::Closed {
            *status = PeerStatus::Negotiating;
        }
    }

    pub fn open(&mut self, peer: &PlayerId) {
        self.status.insert(peer.clone(), PeerStatus::Open);
        if !self.opened.contains(peer) {
            self.opened.push(peer.clone());
        }
    }

    /// Mark `peer` closed. Returns whether its channel was open.
    pub fn close(&mut self, peer: &PlayerId) -> bool {
        let was_open = self.is_open(peer);
        self.status.insert(peer.clone(), PeerStatus::Closed);
        self.opened.retain(|p| p != peer);
        was_open
    }

    #[must_use]
    pub fn status(&self, peer: &PlayerId) -> Option<PeerStatus> {
        self.status.get(peer).copied()
    }

    #[must_use]
    pub fn is_open(&self, peer: &PlayerId) -> bool {
        self.status(peer) == Some(PeerStatus::Open)
    }

    /// Open peers, in opening order.
    #[must_use]
    pub fn open_peers(&self) -> &[PlayerId] {
        &self.opened
    }
}
