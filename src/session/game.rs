//! Game session: the single update loop of one participant.
//!
//! Every mutation goes through `&mut GameSession`:
//! - Local gestures are applied, recorded, scored and broadcast.
//! - Network events wait in the inbound queue until `process` applies them,
//!   in receipt order, through the same engine.
//!
//! Driver effects (signals, data, closes) accumulate in the replicator's
//! outbound queue; the owner drains them with `drain_outbound`.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::ActionEngine;
use crate::core::{
    assign_color, EngineConfig, EngineState, GameRng, Gesture, HistoryRecord, PieceId, Player,
    PlayerId, PlayerPreference, Rejection, SetupError, Table,
};
use crate::replication::{is_shared, ActionMessage, Delivery, Inbound, Outbound, PeerMessage, Replicator};
use crate::rules::{GameDescriptor, Scores};
use crate::setup::{GameSetup, SetupResolver};

/// Saved game: players and the full table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedGame {
    pub players: Vec<Player>,
    pub state: EngineState,
}

/// One participant's view of a game.
pub struct GameSession<D: GameDescriptor> {
    descriptor: D,
    local: PlayerId,
    players: Vec<Player>,
    preferences: Vec<PlayerPreference>,
    engine: ActionEngine,
    replicator: Replicator,
    inbound: VecDeque<Inbound>,
    scores: Option<Scores>,
    setup_rng: GameRng,
    config: EngineConfig,
}

impl<D: GameDescriptor> GameSession<D> {
    /// Create the game: build and resolve the descriptor's setup.
    ///
    /// The creating participant holds the table; others join it.
    pub fn start(descriptor: D, host: Player, seed: u64, config: EngineConfig) -> Result<Self, SetupError> {
        let rng = GameRng::new(seed);
        let setup_rng = rng.for_context("setup");
        let mut resolver = SetupResolver::new(setup_rng.for_context("initial"), &config);
        let pieces = resolver.resolve(descriptor.build())?;
        tracing::info!(game = descriptor.name(), pieces = pieces.len(), "game started");

        let local = host.id.clone();
        let mut session = Self {
            engine: ActionEngine::new(pieces, rng.for_context("actions"), config.clone()),
            replicator: Replicator::new(local.clone(), &config),
            descriptor,
            local,
            players: Vec::new(),
            preferences: Vec::new(),
            inbound: VecDeque::new(),
            scores: None,
            setup_rng: setup_rng.for_context("players"),
            config,
        };
        session.enroll(host, &Value::Null)?;
        Ok(session)
    }

    /// Join a game held by other participants.
    ///
    /// The table stays empty until a peer answers with a snapshot.
    #[must_use]
    pub fn join(descriptor: D, local: Player, seed: u64, config: EngineConfig) -> Self {
        let rng = GameRng::new(seed);
        Self {
            engine: ActionEngine::new(Vec::new(), rng.for_context("actions"), config.clone()),
            replicator: Replicator::joining(local.id.clone(), &config),
            descriptor,
            local: local.id.clone(),
            players: vec![local],
            preferences: Vec::new(),
            inbound: VecDeque::new(),
            scores: None,
            setup_rng: rng.for_context("players"),
            config,
        }
    }

    // === Accessors ===

    #[must_use]
    pub fn local(&self) -> &PlayerId {
        &self.local
    }

    #[must_use]
    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }

    #[must_use]
    pub fn table(&self) -> &Table {
        self.engine.table()
    }

    #[must_use]
    pub fn engine(&self) -> &ActionEngine {
        &self.engine
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Replace the player list (relayed by the identity service).
    pub fn set_players(&mut self, players: Vec<Player>) {
        self.players = players;
    }

    pub fn set_preferences(&mut self, preferences: Vec<PlayerPreference>) {
        self.preferences = preferences;
    }

    /// Latest published scores.
    #[must_use]
    pub fn scores(&self) -> Option<&Scores> {
        self.scores.as_ref()
    }

    #[must_use]
    pub fn replicator(&self) -> &Replicator {
        &self.replicator
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // === Players ===

    /// Parameter schema to collect from `player` before enrolling them.
    #[must_use]
    pub fn parameters_for(&self, player: &Player) -> Option<Value> {
        self.descriptor
            .ask_for_parameters(&self.current_setup(), player)
    }

    /// Enroll `player`: pick their color, let the descriptor add their
    /// pieces, resolve, and push the new table to every peer.
    pub fn enroll(&mut self, mut player: Player, parameters: &Value) -> Result<(), SetupError> {
        if player.color.is_none() {
            let palette = self.descriptor.palette();
            player.color = Some(assign_color(&self.players, &palette, &mut self.setup_rng)?);
        }

        let setup = self
            .descriptor
            .add_player(self.current_setup(), &player, parameters);
        let mut resolver = SetupResolver::new(self.setup_rng.for_context(player.id.as_str()), &self.config);
        let pieces = resolver.resolve(setup)?;
        self.engine.table_mut().pieces.replace(pieces);
        tracing::info!(player = %player.id, color = ?player.color, "player enrolled");

        self.players.retain(|p| p.id != player.id);
        self.players.push(player);

        let peers = self.replicator.peers().open_peers().to_vec();
        for peer in peers {
            let snapshot = PeerMessage::Snapshot(self.engine.table().snapshot_for(&peer));
            if let Err(error) = self.replicator.send(&peer, &snapshot) {
                tracing::warn!(%peer, %error, "enrollment snapshot not sent");
            }
        }
        Ok(())
    }

    // === Local changes ===

    /// Apply a local gesture, publish it and recompute scores.
    pub fn handle_gesture(
        &mut self,
        piece: &PieceId,
        from_hand: bool,
        gesture: Gesture,
    ) -> Result<HistoryRecord, Rejection> {
        let local = self.local.clone();
        let record = self.engine.apply_gesture(&local, piece, from_hand, gesture)?;
        self.publish(&record, None);
        self.update_scores(&record);
        Ok(record)
    }

    /// Undo the local player's latest change.
    ///
    /// Returns the records of the inverse operations; empty when there is
    /// nothing to undo. Inverses applied before a rejection stay applied
    /// and published.
    pub fn undo(&mut self) -> Result<Vec<HistoryRecord>, Rejection> {
        let Some(last) = self.engine.last_record_of(&self.local).cloned() else {
            return Ok(Vec::new());
        };
        let local = self.local.clone();
        let mut applied = Vec::with_capacity(last.revert.len());
        for invocation in &last.revert {
            let record = self.engine.apply_invocation(&local, invocation)?;
            self.publish(&record, None);
            self.update_scores(&record);
            applied.push(record);
        }
        Ok(applied)
    }

    // === Network ===

    /// Queue a driver event for the next `process`.
    pub fn push_inbound(&mut self, event: Inbound) {
        self.inbound.push_back(event);
    }

    /// Relay a local negotiation payload to `to`.
    pub fn send_signal(&mut self, to: &PlayerId, payload: impl Into<String>) {
        self.replicator.send_signal(to, payload);
    }

    /// Apply every queued event, in receipt order.
    ///
    /// Returns the number of remote actions applied.
    pub fn process(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.inbound.pop_front() {
            for delivery in self.replicator.handle(event) {
                if self.deliver(delivery) {
                    applied += 1;
                }
            }
        }
        applied
    }

    /// Take every pending driver effect.
    pub fn drain_outbound(&mut self) -> Vec<Outbound> {
        self.replicator.drain_outbound()
    }

    /// Ask a peer for a fresh snapshot, replacing the shared graph when it
    /// arrives.
    pub fn resync(&mut self) -> Option<PlayerId> {
        self.replicator.request_snapshot()
    }

    // === Persistence ===

    /// Serialize players and the full table.
    pub fn save(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&SavedGame {
            players: self.players.clone(),
            state: self.engine.table().snapshot(),
        })
    }

    /// Restore a saved game, replacing the table and players.
    pub fn load(&mut self, json: &str) -> Result<(), serde_json::Error> {
        let saved: SavedGame = serde_json::from_str(json)?;
        self.players = saved.players;
        self.engine.load(saved.state);
        self.scores = None;
        tracing::info!(pieces = self.engine.pieces().len(), "game loaded");
        Ok(())
    }

    // === Internals ===

    fn current_setup(&self) -> GameSetup {
        GameSetup {
            meshes: self.engine.pieces().pieces().to_vec(),
            ..GameSetup::default()
        }
    }

    fn publish(&mut self, record: &HistoryRecord, duration: Option<u32>) {
        if !is_shared(record) {
            return;
        }
        let message = PeerMessage::Action(ActionMessage::from_record(record, duration));
        if let Err(error) = self.replicator.broadcast(&message) {
            tracing::warn!(piece = %record.piece, %error, "change not broadcast");
        }
    }

    fn update_scores(&mut self, record: &HistoryRecord) {
        if let Some(scores) = self.descriptor.compute_score(
            record,
            self.engine.table(),
            &self.players,
            &self.preferences,
        ) {
            tracing::debug!(?scores, "scores updated");
            self.scores = Some(scores);
        }
    }

    /// Returns whether a remote action was applied.
    fn deliver(&mut self, delivery: Delivery) -> bool {
        match delivery {
            Delivery::Action(message) => {
                match self
                    .engine
                    .apply_remote(&message.player, &message.invocation(), message.seq)
                {
                    Ok(record) => {
                        self.update_scores(&record);
                        true
                    }
                    Err(_) => false,
                }
            }
            Delivery::SnapshotRequested { from } => {
                let snapshot = PeerMessage::Snapshot(self.engine.table().snapshot_for(&from));
                if let Err(error) = self.replicator.send(&from, &snapshot) {
                    tracing::warn!(peer = %from, %error, "snapshot not sent");
                }
                false
            }
            Delivery::Snapshot {
                state,
                joined: true,
                ..
            } => {
                self.engine.load(state);
                false
            }
            Delivery::Snapshot { state, .. } => {
                // own hand content is not in other peers' snapshots
                self.engine.table_mut().pieces.replace(state.meshes);
                false
            }
        }
    }
}
