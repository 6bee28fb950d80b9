//! Replicator: turns network events into deliveries and outbound effects.
//!
//! The replicator never touches the table. It is a state machine between the
//! connection driver (signaling, data channels) and the session's update
//! loop:
//!
//! - `handle(Inbound)` returns what the session must apply, in receipt order.
//! - Effects for the driver queue up in `outbound` and are drained by the
//!   session owner.
//!
//! ## Join
//!
//! A joining replicator asks the first open peer for a snapshot and buffers
//! every inbound action until a snapshot arrives. The snapshot's history
//! gives each author's highest sequence number; buffered actions at or
//! below it already reached the source and are dropped. The others are
//! released in receipt order.

use std::collections::VecDeque;

use crate::core::{EngineConfig, EngineState, PlayerId, ReplicationError};

use super::codec;
use super::message::{ActionMessage, PeerMessage};
use super::peer::PeerSet;

/// Events from the connection driver.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    /// Negotiation payload relayed by the signaling service.
    Signal { from: PlayerId, payload: String },
    ChannelOpen { peer: PlayerId },
    Data { from: PlayerId, bytes: Vec<u8> },
    ChannelClosed { peer: PlayerId },
    ConnectionFailed { peer: PlayerId, reason: String },
}

/// Effects for the connection driver.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    /// Relay a negotiation payload through the signaling service.
    SendSignal { to: PlayerId, payload: String },
    /// Hand a remote negotiation payload to the local connection.
    ApplySignal { peer: PlayerId, payload: String },
    SendData { to: PlayerId, bytes: Vec<u8> },
    Close { peer: PlayerId },
}

/// What the session must apply.
#[derive(Clone, Debug, PartialEq)]
pub enum Delivery {
    Action(ActionMessage),
    SnapshotRequested { from: PlayerId },
    /// `joined` is set for the snapshot completing a join.
    Snapshot {
        from: PlayerId,
        state: EngineState,
        joined: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum JoinState {
    Joined,
    AwaitingPeer,
    Requested { source: PlayerId },
}

/// Replication state of one participant.
#[derive(Clone, Debug)]
pub struct Replicator {
    local: PlayerId,
    peers: PeerSet,
    join: JoinState,
    buffer: VecDeque<ActionMessage>,
    max_buffered: usize,
    outbound: VecDeque<Outbound>,
}

impl Replicator {
    /// Replicator for a participant that already holds the table (the host).
    #[must_use]
    pub fn new(local: PlayerId, config: &EngineConfig) -> Self {
        Self {
            local,
            peers: PeerSet::new(),
            join: JoinState::Joined,
            buffer: VecDeque::new(),
            max_buffered: config.max_buffered_messages,
            outbound: VecDeque::new(),
        }
    }

    /// Replicator for a participant that must fetch the table first.
    #[must_use]
    pub fn joining(local: PlayerId, config: &EngineConfig) -> Self {
        Self {
            join: JoinState::AwaitingPeer,
            ..Self::new(local, config)
        }
    }

    #[must_use]
    pub fn local(&self) -> &PlayerId {
        &self.local
    }

    #[must_use]
    pub fn peers(&self) -> &PeerSet {
        &self.peers
    }

    /// Whether the table is initialized and actions apply directly.
    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.join == JoinState::Joined
    }

    /// Actions waiting for the join snapshot.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Relay a local negotiation payload to `to`.
    pub fn send_signal(&mut self, to: &PlayerId, payload: impl Into<String>) {
        self.peers.negotiate(to);
        self.outbound.push_back(Outbound::SendSignal {
            to: to.clone(),
            payload: payload.into(),
        });
    }

    /// Process one driver event.
    pub fn handle(&mut self, event: Inbound) -> Vec<Delivery> {
        match event {
            Inbound::Signal { from, payload } => {
                self.peers.negotiate(&from);
                self.outbound.push_back(Outbound::ApplySignal {
                    peer: from,
                    payload,
                });
                Vec::new()
            }
            Inbound::ChannelOpen { peer } => {
                tracing::info!(local = %self.local, %peer, "data channel open");
                self.peers.open(&peer);
                if self.join == JoinState::AwaitingPeer {
                    self.request_join_snapshot();
                }
                Vec::new()
            }
            Inbound::Data { from, bytes } => match codec::decode(&from, &bytes) {
                Ok(message) => self.receive(from, message),
                Err(error) => {
                    tracing::warn!(local = %self.local, %error, "dropping undecodable message");
                    Vec::new()
                }
            },
            Inbound::ChannelClosed { peer } => {
                tracing::warn!(local = %self.local, %peer, "data channel closed");
                self.drop_peer(peer);
                Vec::new()
            }
            Inbound::ConnectionFailed { peer, reason } => {
                tracing::warn!(local = %self.local, %peer, %reason, "connection failed");
                self.drop_peer(peer);
                Vec::new()
            }
        }
    }

    /// Send `message` to every open peer.
    pub fn broadcast(&mut self, message: &PeerMessage) -> Result<usize, ReplicationError> {
        let bytes = codec::encode(message)?;
        let targets = self.peers.open_peers().to_vec();
        for to in &targets {
            self.outbound.push_back(Outbound::SendData {
                to: to.clone(),
                bytes: bytes.clone(),
            });
        }
        Ok(targets.len())
    }

    /// Send `message` to one open peer.
    pub fn send(&mut self, to: &PlayerId, message: &PeerMessage) -> Result<(), ReplicationError> {
        if !self.peers.is_open(to) {
            return Err(ReplicationError::UnknownPeer(to.clone()));
        }
        let bytes = codec::encode(message)?;
        self.outbound.push_back(Outbound::SendData {
            to: to.clone(),
            bytes,
        });
        Ok(())
    }

    /// Ask the first open peer for a fresh snapshot.
    ///
    /// Returns the peer asked, if any.
    pub fn request_snapshot(&mut self) -> Option<PlayerId> {
        let source = self.peers.open_peers().first()?.clone();
        if let Err(error) = self.send(&source, &PeerMessage::SnapshotRequest) {
            tracing::warn!(local = %self.local, %error, "snapshot request not sent");
            return None;
        }
        tracing::info!(local = %self.local, %source, "snapshot requested");
        Some(source)
    }

    /// Take every pending driver effect.
    pub fn drain_outbound(&mut self) -> Vec<Outbound> {
        self.outbound.drain(..).collect()
    }

    fn receive(&mut self, from: PlayerId, message: PeerMessage) -> Vec<Delivery> {
        match message {
            PeerMessage::Action(action) if self.join != JoinState::Joined => {
                if self.buffer.len() >= self.max_buffered {
                    if let Some(dropped) = self.buffer.pop_front() {
                        tracing::warn!(
                            local = %self.local,
                            piece = %dropped.piece,
                            "join buffer full, dropping oldest action"
                        );
                    }
                }
                self.buffer.push_back(action);
                Vec::new()
            }
            PeerMessage::Action(action) => vec![Delivery::Action(action)],
            PeerMessage::SnapshotRequest => vec![Delivery::SnapshotRequested { from }],
            PeerMessage::Snapshot(state) if self.join != JoinState::Joined => {
                self.join = JoinState::Joined;
                let marks = state.high_water_marks();
                let (stale, fresh): (Vec<_>, Vec<_>) = self
                    .buffer
                    .drain(..)
                    .partition(|action| {
                        marks
                            .get(&action.player)
                            .is_some_and(|mark| action.seq <= *mark)
                    });
                tracing::info!(
                    local = %self.local,
                    source = %from,
                    released = fresh.len(),
                    dropped = stale.len(),
                    "joined from snapshot"
                );

                let mut deliveries = vec![Delivery::Snapshot {
                    from,
                    state,
                    joined: true,
                }];
                deliveries.extend(fresh.into_iter().map(Delivery::Action));
                deliveries
            }
            PeerMessage::Snapshot(state) => {
                tracing::info!(local = %self.local, source = %from, "snapshot received");
                vec![Delivery::Snapshot {
                    from,
                    state,
                    joined: false,
                }]
            }
        }
    }

    fn request_join_snapshot(&mut self) {
        self.join = match self.request_snapshot() {
            Some(source) => JoinState::Requested { source },
            None => JoinState::AwaitingPeer,
        };
    }

    fn drop_peer(&mut self, peer: PlayerId) {
        self.peers.close(&peer);
        let was_source = matches!(&self.join, JoinState::Requested { source } if source == &peer);
        self.outbound.push_back(Outbound::Close { peer });
        if was_source {
            self.request_join_snapshot();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Change, HistoryRecord, Operation};

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn flip(player: &str, seq: u64, piece: &str) -> ActionMessage {
        ActionMessage {
            player: PlayerId::new(player),
            seq,
            piece: piece.into(),
            from_hand: false,
            payload: Change::Call(Operation::Flip),
            duration: None,
        }
    }

    /// Snapshot whose history holds `flips`.
    fn snapshot(flips: &[ActionMessage]) -> PeerMessage {
        PeerMessage::Snapshot(EngineState {
            history: flips
                .iter()
                .map(|m| HistoryRecord {
                    time: 0,
                    player: m.player.clone(),
                    seq: m.seq,
                    piece: m.piece.clone(),
                    from_hand: m.from_hand,
                    change: m.payload.clone(),
                    revert: Default::default(),
                })
                .collect(),
            ..EngineState::default()
        })
    }

    fn data(from: &str, message: &PeerMessage) -> Inbound {
        Inbound::Data {
            from: PlayerId::new(from),
            bytes: codec::encode(message).unwrap(),
        }
    }

    fn sent_to(outbound: &[Outbound]) -> Vec<(PlayerId, PeerMessage)> {
        outbound
            .iter()
            .filter_map(|o| match o {
                Outbound::SendData { to, bytes } => Some((to.clone(), codec::decode(to, bytes).unwrap())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_signals_are_relayed() {
        let mut replicator = Replicator::new(PlayerId::new("alice"), &config());
        replicator.send_signal(&PlayerId::new("bob"), "offer");
        replicator.handle(Inbound::Signal {
            from: PlayerId::new("bob"),
            payload: "answer".into(),
        });

        assert_eq!(
            replicator.drain_outbound(),
            vec![
                Outbound::SendSignal {
                    to: PlayerId::new("bob"),
                    payload: "offer".into()
                },
                Outbound::ApplySignal {
                    peer: PlayerId::new("bob"),
                    payload: "answer".into()
                },
            ]
        );
    }

    #[test]
    fn test_join_requests_snapshot_and_buffers() {
        let mut replicator = Replicator::joining(PlayerId::new("carol"), &config());
        replicator.handle(Inbound::ChannelOpen {
            peer: PlayerId::new("alice"),
        });
        assert_eq!(
            sent_to(&replicator.drain_outbound()),
            vec![(PlayerId::new("alice"), PeerMessage::SnapshotRequest)]
        );

        let early = replicator.handle(data("bob", &PeerMessage::Action(flip("bob", 1, "c1"))));
        let stale = replicator.handle(data("alice", &PeerMessage::Action(flip("alice", 1, "c2"))));
        assert!(early.is_empty() && stale.is_empty());
        assert_eq!(replicator.buffered(), 2);

        let deliveries = replicator.handle(data("alice", &snapshot(&[flip("alice", 1, "c2")])));
        assert!(replicator.is_joined());
        assert_eq!(deliveries.len(), 2);
        assert!(matches!(deliveries[0], Delivery::Snapshot { joined: true, .. }));
        assert_eq!(deliveries[1], Delivery::Action(flip("bob", 1, "c1")));
    }

    #[test]
    fn test_join_drops_third_party_actions_already_in_snapshot() {
        let mut replicator = Replicator::joining(PlayerId::new("carol"), &config());
        replicator.handle(Inbound::ChannelOpen {
            peer: PlayerId::new("alice"),
        });
        for seq in [4, 5] {
            replicator.handle(data("bob", &PeerMessage::Action(flip("bob", seq, "c1"))));
        }

        // alice had applied bob's fourth change when she answered
        let deliveries = replicator.handle(data(
            "alice",
            &snapshot(&[flip("bob", 3, "c1"), flip("bob", 4, "c1")]),
        ));
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[1], Delivery::Action(flip("bob", 5, "c1")));
    }

    #[test]
    fn test_join_moves_on_when_source_drops() {
        let mut replicator = Replicator::joining(PlayerId::new("carol"), &config());
        replicator.handle(Inbound::ChannelOpen {
            peer: PlayerId::new("alice"),
        });
        replicator.handle(Inbound::ChannelOpen {
            peer: PlayerId::new("bob"),
        });
        replicator.drain_outbound();

        replicator.handle(Inbound::ConnectionFailed {
            peer: PlayerId::new("alice"),
            reason: "ice failed".into(),
        });
        let outbound = replicator.drain_outbound();
        assert!(outbound.contains(&Outbound::Close {
            peer: PlayerId::new("alice")
        }));
        assert_eq!(
            sent_to(&outbound),
            vec![(PlayerId::new("bob"), PeerMessage::SnapshotRequest)]
        );
        assert!(!replicator.is_joined());
    }

    #[test]
    fn test_buffer_drops_oldest_on_overflow() {
        let config = EngineConfig::default().with_max_buffered_messages(2);
        let mut replicator = Replicator::joining(PlayerId::new("carol"), &config);
        for (seq, piece) in [(1, "c1"), (2, "c2"), (3, "c3")] {
            replicator.handle(data("bob", &PeerMessage::Action(flip("bob", seq, piece))));
        }
        assert_eq!(replicator.buffered(), 2);

        replicator.handle(Inbound::ChannelOpen {
            peer: PlayerId::new("alice"),
        });
        let deliveries =
            replicator.handle(data("alice", &PeerMessage::Snapshot(EngineState::default())));
        assert_eq!(
            &deliveries[1..],
            &[
                Delivery::Action(flip("bob", 2, "c2")),
                Delivery::Action(flip("bob", 3, "c3"))
            ]
        );
    }

    #[test]
    fn test_joined_snapshot_is_delivered_as_update() {
        let mut replicator = Replicator::new(PlayerId::new("alice"), &config());
        let deliveries =
            replicator.handle(data("bob", &PeerMessage::Snapshot(EngineState::default())));
        assert!(matches!(deliveries[0], Delivery::Snapshot { joined: false, .. }));
    }

    #[test]
    fn test_broadcast_and_send() {
        let mut replicator = Replicator::new(PlayerId::new("alice"), &config());
        replicator.handle(Inbound::ChannelOpen {
            peer: PlayerId::new("bob"),
        });
        replicator.handle(Inbound::ChannelOpen {
            peer: PlayerId::new("carol"),
        });

        let count = replicator
            .broadcast(&PeerMessage::Action(flip("alice", 1, "c1")))
            .unwrap();
        assert_eq!(count, 2);
        assert!(matches!(
            replicator.send(&PlayerId::new("dave"), &PeerMessage::SnapshotRequest),
            Err(ReplicationError::UnknownPeer(_))
        ));
        assert_eq!(replicator.drain_outbound().len(), 2);
    }
}
