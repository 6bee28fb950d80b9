//! Setup resolution: from a declarative `GameSetup` to a concrete piece list.
//!
//! 1. Every bag is shuffled once; draws then proceed front to back.
//! 2. Slots run in declaration order. Anchored slots resolve their chain
//!    first and are skipped when it cannot be walked yet.
//! 3. Pieces never drawn by any slot are dropped from the result.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::anchors::{self, resolve_chain};
use crate::core::{EngineConfig, GameRng, Piece, PieceGraph, PieceId, SetupError};

use super::description::{GameSetup, Slot};

/// Turns game setups into initial piece lists.
///
/// Holds its own RNG so concurrent sessions never share draw state.
#[derive(Clone, Debug)]
pub struct SetupResolver {
    rng: GameRng,
    shuffle_iterations: Option<usize>,
}

impl SetupResolver {
    /// Create a resolver from a seeded RNG and the engine configuration.
    #[must_use]
    pub fn new(rng: GameRng, config: &EngineConfig) -> Self {
        Self {
            rng,
            shuffle_iterations: config.shuffle_iterations,
        }
    }

    /// Resolve a setup into the ordered list of pieces in play.
    pub fn resolve(&mut self, setup: GameSetup) -> Result<Vec<Piece>, SetupError> {
        setup.validate()?;

        let GameSetup {
            meshes,
            bags,
            slots,
        } = setup;
        let mut graph = PieceGraph::from_pieces(meshes);

        let mut remaining: FxHashMap<String, VecDeque<PieceId>> = FxHashMap::default();
        for bag in &bags {
            let shuffled = self.rng.shuffle(&bag.piece_ids, self.shuffle_iterations);
            if remaining.insert(bag.id.clone(), shuffled.into()).is_some() {
                tracing::warn!(bag = %bag.id, "bag declared twice, keeping the last one");
            }
        }

        let mut drawn: FxHashSet<PieceId> = FxHashSet::default();
        for slot in &slots {
            self.apply_slot(&mut graph, &mut remaining, &mut drawn, slot);
        }

        let undrawn: Vec<PieceId> = remaining
            .into_values()
            .flatten()
            .filter(|id| !drawn.contains(id))
            .collect();
        for id in &undrawn {
            graph.remove(id);
        }
        tracing::debug!(
            pieces = graph.len(),
            drawn = drawn.len(),
            dropped = undrawn.len(),
            "setup resolved"
        );
        Ok(graph.into_pieces())
    }

    fn apply_slot(
        &mut self,
        graph: &mut PieceGraph,
        remaining: &mut FxHashMap<String, VecDeque<PieceId>>,
        drawn: &mut FxHashSet<PieceId>,
        slot: &Slot,
    ) {
        let target = match &slot.anchor {
            Some(path) => match resolve_chain(graph, path) {
                Some(target) => Some(target),
                None => {
                    tracing::warn!(anchor = %path, bag = %slot.bag_id, "anchor chain not resolvable, slot skipped");
                    return;
                }
            },
            None => None,
        };

        let Some(bag) = remaining.get_mut(&slot.bag_id) else {
            tracing::warn!(bag = %slot.bag_id, "slot references an unknown bag");
            return;
        };
        let count = slot.count.unwrap_or(bag.len());
        let ids = draw(bag, count, graph, drawn);
        let Some((first, rest)) = ids.split_first() else {
            tracing::debug!(bag = %slot.bag_id, "bag exhausted, nothing drawn");
            return;
        };

        if let Some(piece) = graph.get_mut(first) {
            piece.apply_patch(&slot.overrides);
        }
        if let Some(target) = target {
            if let Err(rejection) = anchors::snap(graph, &target, first) {
                tracing::warn!(piece = %first, %rejection, "slot piece could not be snapped");
            }
        }
        if !rest.is_empty() {
            if let Err(rejection) = anchors::stack_onto(graph, first, rest) {
                tracing::warn!(base = %first, %rejection, "slot pieces could not be stacked");
            }
        }
    }
}

/// Take up to `count` usable ids from the front of `bag`.
///
/// Ids already drawn elsewhere or absent from the graph are discarded.
fn draw(
    bag: &mut VecDeque<PieceId>,
    count: usize,
    graph: &PieceGraph,
    drawn: &mut FxHashSet<PieceId>,
) -> Vec<PieceId> {
    let mut ids = Vec::with_capacity(count.min(bag.len()));
    while ids.len() < count {
        let Some(id) = bag.pop_front() else {
            break;
        };
        if !graph.contains(&id) {
            tracing::warn!(piece = %id, "bag references an unknown piece");
            continue;
        }
        if !drawn.insert(id.clone()) {
            tracing::warn!(piece = %id, "piece already drawn by another slot");
            continue;
        }
        ids.push(id);
    }
    ids
}
