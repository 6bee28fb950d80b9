//! Anchor chain resolution and snap/stack placement.
//!
//! Chains are resolved against whatever is *currently* snapped, so a game
//! description can address arbitrarily deep placements without computing
//! coordinates. A chain that cannot be walked yet is not an error: it simply
//! resolves to `None`.

use serde::{Deserialize, Serialize};

use crate::core::{AnchorId, Piece, PieceGraph, PieceId, Rejection, Vec3};

use super::path::AnchorPath;

/// A resolved anchor: the owning piece and the anchor id on it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorRef {
    pub piece: PieceId,
    pub anchor: AnchorId,
}

impl AnchorRef {
    pub fn new(piece: impl Into<PieceId>, anchor: impl Into<AnchorId>) -> Self {
        Self {
            piece: piece.into(),
            anchor: anchor.into(),
        }
    }
}

/// Resolve `path` against the graph.
///
/// The first segment is looked up on root pieces (pieces not snapped
/// anywhere), each following segment only among the pieces snapped into the
/// previously resolved anchor. Returns `None` as soon as a segment fails.
#[must_use]
pub fn resolve_chain(graph: &PieceGraph, path: &AnchorPath) -> Option<AnchorRef> {
    let mut candidates: Vec<&Piece> = graph
        .iter()
        .filter(|p| graph.anchor_holding(&p.id).is_none())
        .collect();

    let (last, walk) = path.segments().split_last()?;
    for segment in walk {
        let anchor = candidates.iter().find_map(|p| p.anchor(segment))?;
        candidates = anchor
            .snapped_ids
            .iter()
            .filter_map(|id| graph.get(id))
            .collect();
    }

    candidates
        .iter()
        .find(|p| p.anchor(last).is_some())
        .map(|p| AnchorRef::new(p.id.clone(), last.clone()))
}

/// Where a piece lands when snapped on `owner`'s anchor.
fn snap_position(owner: &Piece, anchor_offset: Vec3) -> Vec3 {
    let mut target = owner.position + anchor_offset;
    target.y += owner.shape.height;
    target
}

/// Snap `piece` into `target`.
///
/// The piece leaves any anchor it was in before. Anchor angle and flip
/// overrides are applied to the capabilities the piece carries. A full
/// anchor or a kind mismatch is rejected and leaves state unchanged.
pub fn snap(graph: &mut PieceGraph, target: &AnchorRef, piece: &PieceId) -> Result<(), Rejection> {
    if &target.piece == piece {
        return Err(Rejection::SelfTarget(piece.clone()));
    }
    let mover_kind = graph
        .get(piece)
        .ok_or_else(|| Rejection::UnknownPiece(piece.clone()))?
        .kind()
        .map(str::to_string);
    let owner = graph
        .get(&target.piece)
        .ok_or_else(|| Rejection::UnknownPiece(target.piece.clone()))?;
    let anchor = owner.anchor(&target.anchor).ok_or_else(|| Rejection::UnknownAnchor {
        piece: target.piece.clone(),
        anchor: target.anchor.clone(),
    })?;

    let already_there = anchor.snapped_ids.contains(piece);
    if !already_there && !anchor.has_capacity() {
        return Err(Rejection::AnchorFull {
            piece: target.piece.clone(),
            anchor: target.anchor.clone(),
        });
    }
    if !anchor.accepts(mover_kind.as_deref()) {
        return Err(Rejection::KindMismatch {
            mover: piece.clone(),
            target: target.piece.clone(),
        });
    }
    let position = snap_position(owner, anchor.offset);
    let (angle, flip) = (anchor.angle, anchor.flip);

    if !already_there {
        unsnap(graph, piece);
        if let Some(anchor) = graph
            .get_mut(&target.piece)
            .and_then(|owner| owner.anchor_mut(&target.anchor))
        {
            anchor.snapped_ids.push(piece.clone());
        }
    }
    graph.translate(piece, position);

    if let Some(mover) = graph.get_mut(piece) {
        if let (Some(angle), Some(rotable)) = (angle, mover.rotable.as_mut()) {
            rotable.angle = angle;
        }
        if let (Some(flip), Some(flippable)) = (flip, mover.flippable.as_mut()) {
            flippable.is_flipped = flip;
        }
    }
    Ok(())
}

/// Release `piece` from whichever anchor lists it.
///
/// Returns where it was snapped, or `None` if it was not snapped.
pub fn unsnap(graph: &mut PieceGraph, piece: &PieceId) -> Option<AnchorRef> {
    let (owner, anchor) = graph
        .anchor_holding(piece)
        .map(|(owner, anchor)| (owner.clone(), anchor.clone()))?;
    if let Some(slot) = graph.get_mut(&owner).and_then(|p| p.anchor_mut(&anchor)) {
        slot.snapped_ids.retain(|id| id != piece);
    }
    Some(AnchorRef {
        piece: owner,
        anchor,
    })
}

/// Stack `pieces`, in order, on top of `base`.
///
/// A stacked piece that carried its own stack brings it along, flattened
/// right above it. Stacked pieces are laid out above the base one height
/// step each. Returns the ids actually appended.
pub fn stack_onto(
    graph: &mut PieceGraph,
    base: &PieceId,
    pieces: &[PieceId],
) -> Result<Vec<PieceId>, Rejection> {
    let base_piece = graph
        .get(base)
        .ok_or_else(|| Rejection::UnknownPiece(base.clone()))?;
    if base_piece.stackable.is_none() {
        return Err(Rejection::MissingCapability {
            piece: base.clone(),
            capability: "stackable",
        });
    }

    let mut appended = Vec::new();
    for id in pieces {
        if id == base || base_piece_contains(graph, base, id) {
            continue;
        }
        let Some(piece) = graph.get_mut(id) else {
            tracing::warn!(%base, piece = %id, "cannot stack unknown piece");
            continue;
        };
        let carried = piece
            .stackable
            .as_mut()
            .map(|s| std::mem::take(&mut s.stack_ids))
            .unwrap_or_default();
        graph.detach(id);
        appended.push(id.clone());
        for carried_id in carried {
            if &carried_id != base && !appended.contains(&carried_id) {
                appended.push(carried_id);
            }
        }
    }

    if let Some(stackable) = graph.get_mut(base).and_then(|p| p.stackable.as_mut()) {
        stackable.stack_ids.extend(appended.iter().cloned());
    }
    layout_stack(graph, base);
    Ok(appended)
}

fn base_piece_contains(graph: &PieceGraph, base: &PieceId, id: &PieceId) -> bool {
    graph.get(base).is_some_and(|b| b.stack_ids().contains(id))
}

/// Lay every stacked piece above the base, one height step each.
pub fn layout_stack(graph: &mut PieceGraph, base: &PieceId) {
    let Some((origin, step, stack)) = graph
        .get(base)
        .map(|b| (b.position, b.shape.height, b.stack_ids().to_vec()))
    else {
        return;
    };
    for (index, id) in stack.iter().enumerate() {
        let elevation = step * (index as f32 + 1.0);
        graph.translate(id, Vec3::new(origin.x, origin.y + elevation, origin.z));
    }
}
