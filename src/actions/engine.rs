//! Action engine: validates and applies single-piece mutations.
//!
//! Every mutation goes through one path:
//! 1. A gesture is resolved against current state into an `Invocation`
//!    carrying an explicit `Operation` (or a move).
//! 2. Preconditions are checked. A failing one is a `Rejection`: nothing
//!    changes, nothing is recorded.
//! 3. The change is applied and its inverse invocations are captured.
//! 4. Exactly one `HistoryRecord` is appended.
//!
//! Remote invocations and replayed records take steps 2-4 only, with the
//! same precondition checks.

use std::time::{SystemTime, UNIX_EPOCH};

use im::Vector;
use smallvec::smallvec;

use crate::anchors::{self, AnchorRef};
use crate::core::{
    AnchorId, Change, EngineConfig, EngineState, GameRng, Gesture, HistoryRecord, Invocation, Operation,
    Piece, PieceGraph, PieceId, PlayerId, Randomizable, Rejection, Revert, Table, Vec3,
};

/// Applies operations to one participant's table.
///
/// Owns its RNG: rolls and shuffles made here never touch another session.
#[derive(Clone, Debug)]
pub struct ActionEngine {
    table: Table,
    rng: GameRng,
    config: EngineConfig,
}

impl ActionEngine {
    /// Engine over an initial piece list.
    #[must_use]
    pub fn new(pieces: Vec<Piece>, rng: GameRng, config: EngineConfig) -> Self {
        Self::from_table(Table::new(pieces), rng, config)
    }

    #[must_use]
    pub fn from_table(table: Table, rng: GameRng, config: EngineConfig) -> Self {
        Self { table, rng, config }
    }

    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }

    #[must_use]
    pub fn pieces(&self) -> &PieceGraph {
        &self.table.pieces
    }

    #[must_use]
    pub fn history(&self) -> &Vector<HistoryRecord> {
        &self.table.history
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rng_mut(&mut self) -> &mut GameRng {
        &mut self.rng
    }

    /// Replace the whole table with a snapshot.
    pub fn load(&mut self, state: EngineState) {
        self.table.load(state);
    }

    /// Most recent record authored by `player`, the usual undo target.
    #[must_use]
    pub fn last_record_of(&self, player: &PlayerId) -> Option<&HistoryRecord> {
        self.table.last_record_of(player)
    }

    // === Local application ===

    /// Resolve a gesture into an explicit invocation, without applying it.
    pub fn resolve(
        &mut self,
        player: &PlayerId,
        piece: &PieceId,
        from_hand: bool,
        gesture: Gesture,
    ) -> Result<Invocation, Rejection> {
        let target = self.lookup(player, piece, from_hand)?;
        let call = |op| Invocation::call(piece.clone(), from_hand, op);

        let invocation = match gesture {
            Gesture::Move { pos } => Invocation {
                piece: piece.clone(),
                from_hand,
                change: Change::Move {
                    pos,
                    prev: target.position,
                },
            },
            Gesture::Flip => call(Operation::Flip),
            Gesture::Rotate => {
                let angle = target.angle().ok_or_else(|| missing(piece, "rotable"))?;
                call(Operation::Rotate {
                    angle: angle + self.config.rotation_step,
                })
            }
            Gesture::Snap { mover, anchor } => call(Operation::Snap {
                snapped: mover,
                anchor,
            }),
            Gesture::Unsnap { snapped } => call(Operation::Unsnap { snapped }),
            Gesture::UnsnapAll => call(Operation::UnsnapAll),
            Gesture::Push { pushed } => call(Operation::Push { pushed }),
            Gesture::Pop { count } => call(Operation::Pop { count }),
            Gesture::Reorder { ids } => call(Operation::Reorder { ids }),
            Gesture::Increment { donor } => call(Operation::Increment { donor }),
            Gesture::Decrement { amount } => {
                let spawned = self.fresh_id(piece);
                call(Operation::Decrement { amount, spawned })
            }
            Gesture::ToggleLock => call(Operation::ToggleLock),
            Gesture::Random => {
                let max = target
                    .randomizable
                    .map(|r| r.max)
                    .ok_or_else(|| missing(piece, "randomizable"))?;
                call(Operation::Random {
                    face: self.rng.roll(max),
                })
            }
            Gesture::SetFace { face } => call(Operation::SetFace { face }),
            Gesture::Draw => {
                // drawing a stack takes its top piece
                let drawn = target.stack_ids().last().unwrap_or(piece).clone();
                Invocation::call(drawn, from_hand, Operation::Draw)
            }
            Gesture::Play { pos } => {
                if !from_hand {
                    return Err(Rejection::NotInHand {
                        piece: piece.clone(),
                        player: player.clone(),
                    });
                }
                let mut played = target.clone();
                played.position = pos;
                if let (true, Some(flippable)) = (
                    played.drawable.is_some_and(|d| d.flip_on_play),
                    played.flippable.as_mut(),
                ) {
                    flippable.is_flipped = true;
                }
                call(Operation::Play {
                    piece: Box::new(played),
                })
            }
        };
        Ok(invocation)
    }

    /// Resolve and apply a local gesture.
    pub fn apply_gesture(
        &mut self,
        player: &PlayerId,
        piece: &PieceId,
        from_hand: bool,
        gesture: Gesture,
    ) -> Result<HistoryRecord, Rejection> {
        let invocation = match self.resolve(player, piece, from_hand, gesture) {
            Ok(invocation) => invocation,
            Err(rejection) => {
                tracing::debug!(%player, %piece, %rejection, "gesture rejected");
                return Err(rejection);
            }
        };
        self.apply_invocation(player, &invocation)
    }

    /// Apply an explicit invocation authored locally.
    ///
    /// The record takes the author's next sequence number.
    pub fn apply_invocation(
        &mut self,
        player: &PlayerId,
        invocation: &Invocation,
    ) -> Result<HistoryRecord, Rejection> {
        let seq = self.table.next_seq(player);
        self.commit(player, invocation, true, now_millis(), seq)
    }

    /// Apply an invocation received from a remote participant, stamped
    /// with the author's sequence number `seq`.
    ///
    /// Same preconditions as local application. Pieces drawn by the remote
    /// player only count toward their hidden hand size.
    pub fn apply_remote(
        &mut self,
        player: &PlayerId,
        invocation: &Invocation,
        seq: u64,
    ) -> Result<HistoryRecord, Rejection> {
        self.commit(player, invocation, false, now_millis(), seq)
    }

    /// Apply a record's inverse invocations as new operations.
    ///
    /// Each inverse gets its own history record; the reverted record stays.
    /// Stops at the first rejection, keeping what was already applied.
    pub fn revert(
        &mut self,
        player: &PlayerId,
        record: &HistoryRecord,
    ) -> Result<Vec<HistoryRecord>, Rejection> {
        let mut applied = Vec::with_capacity(record.revert.len());
        for invocation in &record.revert {
            applied.push(self.apply_invocation(player, invocation)?);
        }
        Ok(applied)
    }

    /// Rebuild an engine by re-applying `history` over `initial`.
    ///
    /// Records keep their original time, author and sequence number.
    /// Rejected records are skipped. Every draw is replayed with its
    /// content, so hands that were hidden counts on the live table hold
    /// pieces on the replayed one.
    pub fn replay<'a>(
        initial: Vec<Piece>,
        history: impl IntoIterator<Item = &'a HistoryRecord>,
        rng: GameRng,
        config: EngineConfig,
    ) -> Self {
        let mut engine = Self::new(initial, rng, config);
        for record in history {
            if let Err(rejection) =
                engine.commit(
                &record.player,
                &record.invocation(),
                true,
                record.time,
                record.seq,
            )
            {
                tracing::warn!(
                    player = %record.player,
                    piece = %record.piece,
                    op = record.change.name(),
                    %rejection,
                    "record skipped during replay"
                );
            }
        }
        engine
    }

    // === Application ===

    fn commit(
        &mut self,
        player: &PlayerId,
        invocation: &Invocation,
        reveal: bool,
        time: u64,
        seq: u64,
    ) -> Result<HistoryRecord, Rejection> {
        let revert = match self.apply(player, invocation, reveal) {
            Ok(revert) => revert,
            Err(rejection) => {
                tracing::debug!(
                    %player,
                    piece = %invocation.piece,
                    op = invocation.change.name(),
                    %rejection,
                    "operation rejected"
                );
                return Err(rejection);
            }
        };
        let record = HistoryRecord {
            time,
            player: player.clone(),
            seq,
            piece: invocation.piece.clone(),
            from_hand: invocation.from_hand,
            change: invocation.change.clone(),
            revert,
        };
        tracing::trace!(%player, piece = %record.piece, op = record.change.name(), "operation applied");
        self.table.record(record.clone());
        Ok(record)
    }

    fn apply(
        &mut self,
        player: &PlayerId,
        invocation: &Invocation,
        reveal: bool,
    ) -> Result<Revert, Rejection> {
        let id = &invocation.piece;
        if invocation.from_hand {
            return self.apply_in_hand(player, id, &invocation.change);
        }

        let piece = self
            .table
            .pieces
            .get_mut(id)
            .ok_or_else(|| Rejection::UnknownPiece(id.clone()))?;
        let op = match &invocation.change {
            Change::Move { pos, .. } => {
                if piece.is_locked() {
                    return Err(Rejection::Locked(id.clone()));
                }
                return self.apply_move(id, *pos);
            }
            Change::Call(op) => op,
        };
        if piece.is_locked() && !matches!(op, Operation::ToggleLock) {
            return Err(Rejection::Locked(id.clone()));
        }
        if let Some(inverse) = mutate_piece(piece, op)? {
            return Ok(smallvec![Invocation::call(id.clone(), false, inverse)]);
        }

        match op {
            Operation::Snap { snapped, anchor } => self.apply_snap(id, snapped, anchor),
            Operation::Unsnap { snapped } => self.apply_unsnap(id, snapped),
            Operation::UnsnapAll => self.apply_unsnap_all(id),
            Operation::Push { pushed } => self.apply_push(id, pushed),
            Operation::Pop { count } => self.apply_pop(id, *count),
            Operation::Reorder { ids } => self.apply_reorder(id, ids),
            Operation::Increment { donor } => self.apply_increment(id, donor),
            Operation::Decrement { amount, spawned } => self.apply_decrement(id, *amount, spawned),
            Operation::Draw => self.apply_draw(player, id, reveal),
            Operation::Play { .. } => Err(Rejection::NotInHand {
                piece: id.clone(),
                player: player.clone(),
            }),
            Operation::Flip
            | Operation::Rotate { .. }
            | Operation::ToggleLock
            | Operation::Random { .. }
            | Operation::SetFace { .. } => Err(Rejection::NotAllowedInHand { op: op.name() }),
        }
    }

    /// Pieces in a hand only flip, rotate, or get played back.
    fn apply_in_hand(
        &mut self,
        player: &PlayerId,
        id: &PieceId,
        change: &Change,
    ) -> Result<Revert, Rejection> {
        let op = match change {
            Change::Call(Operation::Play { piece }) => return self.apply_play(player, id, piece),
            Change::Call(op @ (Operation::Flip | Operation::Rotate { .. })) => op,
            other => return Err(Rejection::NotAllowedInHand { op: other.name() }),
        };
        let piece = self
            .table
            .hands
            .get_mut(player, id)
            .ok_or_else(|| Rejection::NotInHand {
                piece: id.clone(),
                player: player.clone(),
            })?;
        match mutate_piece(piece, op)? {
            Some(inverse) => Ok(smallvec![Invocation::call(id.clone(), true, inverse)]),
            None => Err(Rejection::NotAllowedInHand { op: op.name() }),
        }
    }

    /// A moved piece leaves the anchor holding it; its own stack and the
    /// pieces snapped on it follow.
    fn apply_move(&mut self, id: &PieceId, pos: Vec3) -> Result<Revert, Rejection> {
        let origin = capable(&self.table.pieces, id, "movable", |p| p.movable.is_some())?.position;
        let released = anchors::unsnap(&mut self.table.pieces, id);
        self.table.pieces.translate(id, pos);

        let mut revert: Revert = smallvec![move_to(id, origin, pos)];
        if let Some(prior) = released {
            revert.push(Invocation::call(
                prior.piece,
                false,
                Operation::Snap {
                    snapped: id.clone(),
                    anchor: prior.anchor,
                },
            ));
        }
        Ok(revert)
    }

    fn apply_snap(
        &mut self,
        id: &PieceId,
        snapped: &PieceId,
        anchor: &AnchorId,
    ) -> Result<Revert, Rejection> {
        if snapped == id {
            return Err(Rejection::SelfTarget(id.clone()));
        }
        capable(&self.table.pieces, id, "anchorable", |p| p.anchorable.is_some())?;
        let mover = capable(&self.table.pieces, snapped, "movable", |p| p.movable.is_some())?;
        if mover.is_locked() {
            return Err(Rejection::Locked(snapped.clone()));
        }
        let (prev_position, prev_angle, prev_flipped) =
            (mover.position, mover.angle(), mover.is_flipped());
        let prior = holder_of(&self.table.pieces, snapped);

        anchors::snap(
            &mut self.table.pieces,
            &AnchorRef::new(id.clone(), anchor.clone()),
            snapped,
        )?;

        let mut revert = Revert::new();
        match prior {
            Some(prior) => revert.push(Invocation::call(
                prior.piece,
                false,
                Operation::Snap {
                    snapped: snapped.clone(),
                    anchor: prior.anchor,
                },
            )),
            None => {
                revert.push(Invocation::call(
                    id.clone(),
                    false,
                    Operation::Unsnap {
                        snapped: snapped.clone(),
                    },
                ));
                let now = self
                    .table
                    .pieces
                    .get(snapped)
                    .map_or(prev_position, |p| p.position);
                revert.push(move_to(snapped, prev_position, now));
            }
        }
        if let Some(after) = self.table.pieces.get(snapped) {
            if let (Some(angle), true) = (prev_angle, after.angle() != prev_angle) {
                revert.push(Invocation::call(snapped.clone(), false, Operation::Rotate { angle }));
            }
            if after.is_flipped() != prev_flipped {
                revert.push(Invocation::call(snapped.clone(), false, Operation::Flip));
            }
        }
        Ok(revert)
    }

    fn apply_unsnap(&mut self, id: &PieceId, snapped: &PieceId) -> Result<Revert, Rejection> {
        match holder_of(&self.table.pieces, snapped) {
            Some(holder) if &holder.piece == id => {
                anchors::unsnap(&mut self.table.pieces, snapped);
                Ok(smallvec![Invocation::call(
                    id.clone(),
                    false,
                    Operation::Snap {
                        snapped: snapped.clone(),
                        anchor: holder.anchor,
                    },
                )])
            }
            _ => Err(Rejection::NotSnapped(snapped.clone())),
        }
    }

    fn apply_unsnap_all(&mut self, id: &PieceId) -> Result<Revert, Rejection> {
        let piece = capable(&self.table.pieces, id, "anchorable", |p| p.anchorable.is_some())?;
        let released: Vec<_> = piece
            .anchors()
            .iter()
            .flat_map(|a| a.snapped_ids.iter().map(|s| (s.clone(), a.id.clone())))
            .collect();

        let mut revert = Revert::new();
        for (snapped, anchor) in released {
            anchors::unsnap(&mut self.table.pieces, &snapped);
            revert.push(Invocation::call(
                id.clone(),
                false,
                Operation::Snap { snapped, anchor },
            ));
        }
        Ok(revert)
    }

    fn apply_push(&mut self, id: &PieceId, pushed: &PieceId) -> Result<Revert, Rejection> {
        if pushed == id {
            return Err(Rejection::SelfTarget(id.clone()));
        }
        let base = capable(&self.table.pieces, id, "stackable", |p| p.stackable.is_some())?;
        if base.stack_ids().contains(pushed) {
            return Err(Rejection::AlreadyStacked {
                piece: pushed.clone(),
                base: id.clone(),
            });
        }
        let moved = self
            .table
            .pieces
            .get(pushed)
            .ok_or_else(|| Rejection::UnknownPiece(pushed.clone()))?;
        if moved.is_locked() {
            return Err(Rejection::Locked(pushed.clone()));
        }
        let prev_position = moved.position;
        let prior = holder_of(&self.table.pieces, pushed);

        let appended =
            anchors::stack_onto(&mut self.table.pieces, id, std::slice::from_ref(pushed))?;

        let mut revert: Revert = smallvec![Invocation::call(
            id.clone(),
            false,
            Operation::Pop {
                count: appended.len(),
            },
        )];
        match prior {
            Some(prior) => revert.push(Invocation::call(
                prior.piece,
                false,
                Operation::Snap {
                    snapped: pushed.clone(),
                    anchor: prior.anchor,
                },
            )),
            None => {
                let now = self
                    .table
                    .pieces
                    .get(pushed)
                    .map_or(prev_position, |p| p.position);
                revert.push(move_to(pushed, prev_position, now));
            }
        }
        Ok(revert)
    }

    /// Popped pieces keep their relative order: the lowest becomes the base
    /// of a new stack holding the others.
    fn apply_pop(&mut self, id: &PieceId, count: usize) -> Result<Revert, Rejection> {
        let base = capable(&self.table.pieces, id, "stackable", |p| p.stackable.is_some())?;
        let available = base.stack_ids().len();
        if count == 0 || count > available {
            return Err(Rejection::StackTooSmall {
                piece: id.clone(),
                requested: count,
                available,
            });
        }

        let popped = match self
            .table
            .pieces
            .get_mut(id)
            .and_then(|p| p.stackable.as_mut())
        {
            Some(stackable) => stackable.stack_ids.split_off(available - count),
            None => Vec::new(),
        };
        let Some((first, rest)) = popped.split_first() else {
            return Ok(Revert::new());
        };
        if !rest.is_empty() {
            if let Err(rejection) = anchors::stack_onto(&mut self.table.pieces, first, rest) {
                tracing::debug!(base = %first, %rejection, "popped pieces left loose");
            }
        }
        Ok(smallvec![Invocation::call(
            id.clone(),
            false,
            Operation::Push {
                pushed: first.clone(),
            },
        )])
    }

    fn apply_reorder(&mut self, id: &PieceId, ids: &[PieceId]) -> Result<Revert, Rejection> {
        let base = capable(&self.table.pieces, id, "stackable", |p| p.stackable.is_some())?;
        let current = base.stack_ids().to_vec();

        let mut expected = current.clone();
        expected.sort();
        let mut requested = ids.to_vec();
        requested.sort();
        if expected != requested {
            return Err(Rejection::ReorderMismatch(id.clone()));
        }

        if let Some(stackable) = self
            .table
            .pieces
            .get_mut(id)
            .and_then(|p| p.stackable.as_mut())
        {
            stackable.stack_ids = ids.to_vec();
        }
        anchors::layout_stack(&mut self.table.pieces, id);
        Ok(smallvec![Invocation::call(
            id.clone(),
            false,
            Operation::Reorder { ids: current },
        )])
    }

    /// Merge `donor` into `id`. The donor is destroyed.
    fn apply_increment(&mut self, id: &PieceId, donor: &PieceId) -> Result<Revert, Rejection> {
        if donor == id {
            return Err(Rejection::SelfTarget(id.clone()));
        }
        let kinds = capable(&self.table.pieces, id, "quantifiable", |p| p.quantifiable.is_some())?
            .quantifiable
            .as_ref()
            .map(|q| q.kinds.clone())
            .unwrap_or_default();
        let merged = capable(&self.table.pieces, donor, "quantifiable", |p| {
            p.quantifiable.is_some()
        })?;
        if merged.is_locked() {
            return Err(Rejection::Locked(donor.clone()));
        }
        if !kinds.is_empty() && !merged.kind().is_some_and(|k| kinds.iter().any(|c| c == k)) {
            return Err(Rejection::KindMismatch {
                mover: donor.clone(),
                target: id.clone(),
            });
        }
        let amount = merged.quantity().unwrap_or(0);
        let prev_position = merged.position;

        self.table.pieces.remove(donor);
        let mut spawn_position = prev_position;
        if let Some(target) = self.table.pieces.get_mut(id) {
            spawn_position = split_position(target);
            if let Some(quantifiable) = target.quantifiable.as_mut() {
                quantifiable.quantity = quantifiable.quantity.saturating_add(amount);
            }
        }
        Ok(smallvec![
            Invocation::call(
                id.clone(),
                false,
                Operation::Decrement {
                    amount,
                    spawned: donor.clone(),
                },
            ),
            move_to(donor, prev_position, spawn_position),
        ])
    }

    /// Split `amount` off `id` into a new piece `spawned`.
    ///
    /// Splitting the whole quantity removes `id`: the spawned piece carries
    /// everything.
    fn apply_decrement(
        &mut self,
        id: &PieceId,
        amount: u32,
        spawned: &PieceId,
    ) -> Result<Revert, Rejection> {
        let source = capable(&self.table.pieces, id, "quantifiable", |p| p.quantifiable.is_some())?;
        let available = source.quantity().unwrap_or(0);
        if amount == 0 || amount > available {
            return Err(Rejection::QuantityTooLow {
                piece: id.clone(),
                requested: amount,
                available,
            });
        }
        if self.table.pieces.contains(spawned) || self.table.hands.contains(spawned) {
            return Err(Rejection::DuplicateId(spawned.clone()));
        }

        let mut split = source.clone();
        let prev_position = source.position;
        split.id = spawned.clone();
        split.position = split_position(source);
        if let Some(stackable) = split.stackable.as_mut() {
            stackable.stack_ids.clear();
        }
        if let Some(anchorable) = split.anchorable.as_mut() {
            for anchor in &mut anchorable.anchors {
                anchor.snapped_ids.clear();
            }
        }
        if let Some(quantifiable) = split.quantifiable.as_mut() {
            quantifiable.quantity = amount;
        }

        if amount == available {
            // undoing respawns `id` one width beside the split, then moves it home
            let respawn = split_position(&split);
            self.table.pieces.remove(id);
            self.table.pieces.insert(split);
            return Ok(smallvec![
                Invocation::call(
                    spawned.clone(),
                    false,
                    Operation::Decrement {
                        amount,
                        spawned: id.clone(),
                    },
                ),
                move_to(id, prev_position, respawn),
            ]);
        }

        if let Some(quantifiable) = self
            .table
            .pieces
            .get_mut(id)
            .and_then(|p| p.quantifiable.as_mut())
        {
            quantifiable.quantity -= amount;
        }
        self.table.pieces.insert(split);
        Ok(smallvec![Invocation::call(
            id.clone(),
            false,
            Operation::Increment {
                donor: spawned.clone(),
            },
        )])
    }

    fn apply_draw(
        &mut self,
        player: &PlayerId,
        id: &PieceId,
        reveal: bool,
    ) -> Result<Revert, Rejection> {
        let base = self.table.pieces.stack_base_of(id).cloned();
        let prior = holder_of(&self.table.pieces, id);
        let on_table = self
            .table
            .hands
            .draw(&mut self.table.pieces, player, id, reveal)?;

        let mut revert: Revert = smallvec![Invocation::call(
            id.clone(),
            true,
            Operation::Play {
                piece: Box::new(on_table),
            },
        )];
        if let Some(base) = base {
            revert.push(Invocation::call(
                base,
                false,
                Operation::Push { pushed: id.clone() },
            ));
        } else if let Some(prior) = prior {
            revert.push(Invocation::call(
                prior.piece,
                false,
                Operation::Snap {
                    snapped: id.clone(),
                    anchor: prior.anchor,
                },
            ));
        }
        Ok(revert)
    }

    fn apply_play(
        &mut self,
        player: &PlayerId,
        id: &PieceId,
        piece: &Piece,
    ) -> Result<Revert, Rejection> {
        if &piece.id != id {
            return Err(Rejection::NotInHand {
                piece: id.clone(),
                player: player.clone(),
            });
        }
        if piece.drawable.is_none() {
            return Err(missing(id, "drawable"));
        }
        self.table
            .hands
            .play(&mut self.table.pieces, player, piece.clone())?;
        Ok(smallvec![Invocation::call(id.clone(), false, Operation::Draw)])
    }

    // === Lookups ===

    fn lookup(
        &self,
        player: &PlayerId,
        id: &PieceId,
        from_hand: bool,
    ) -> Result<&Piece, Rejection> {
        if from_hand {
            self.table
                .hands
                .get(player, id)
                .ok_or_else(|| Rejection::NotInHand {
                    piece: id.clone(),
                    player: player.clone(),
                })
        } else {
            self.table
                .pieces
                .get(id)
                .ok_or_else(|| Rejection::UnknownPiece(id.clone()))
        }
    }

    /// First `"{id}-{n}"` unused on the table, in known hands and in history.
    fn fresh_id(&self, id: &PieceId) -> PieceId {
        (1..)
            .map(|n| id.derived(n))
            .find(|candidate| {
                !self.table.pieces.contains(candidate)
                    && !self.table.hands.contains(candidate)
                    && !self.table.is_referenced(candidate)
            })
            .unwrap_or_else(|| id.derived(0))
    }
}

/// Operations that only touch the target's own capability state.
///
/// Returns the inverse operation, or `None` when `op` needs more than the
/// target piece.
fn mutate_piece(piece: &mut Piece, op: &Operation) -> Result<Option<Operation>, Rejection> {
    let id = &piece.id;
    let inverse = match op {
        Operation::Flip => {
            let flippable = piece.flippable.as_mut().ok_or_else(|| missing(id, "flippable"))?;
            flippable.is_flipped = !flippable.is_flipped;
            Operation::Flip
        }
        Operation::Rotate { angle } => {
            let rotable = piece.rotable.as_mut().ok_or_else(|| missing(id, "rotable"))?;
            let prev = std::mem::replace(&mut rotable.angle, *angle);
            Operation::Rotate { angle: prev }
        }
        Operation::ToggleLock => {
            let lockable = piece.lockable.as_mut().ok_or_else(|| missing(id, "lockable"))?;
            lockable.is_locked = !lockable.is_locked;
            Operation::ToggleLock
        }
        Operation::Random { face } => {
            let randomizable = piece
                .randomizable
                .as_mut()
                .ok_or_else(|| missing(id, "randomizable"))?;
            check_face(id, randomizable, *face)?;
            let prev = std::mem::replace(&mut randomizable.face, *face);
            Operation::Random { face: prev }
        }
        Operation::SetFace { face } => {
            let randomizable = piece
                .randomizable
                .as_mut()
                .ok_or_else(|| missing(id, "randomizable"))?;
            if !randomizable.can_be_set {
                return Err(Rejection::FaceNotSettable(id.clone()));
            }
            check_face(id, randomizable, *face)?;
            let prev = std::mem::replace(&mut randomizable.face, *face);
            Operation::SetFace { face: prev }
        }
        _ => return Ok(None),
    };
    Ok(Some(inverse))
}

fn check_face(id: &PieceId, randomizable: &Randomizable, face: u32) -> Result<(), Rejection> {
    if face == 0 || face > randomizable.max {
        return Err(Rejection::FaceOutOfRange {
            piece: id.clone(),
            face,
        });
    }
    Ok(())
}

fn missing(id: &PieceId, capability: &'static str) -> Rejection {
    Rejection::MissingCapability {
        piece: id.clone(),
        capability,
    }
}

fn capable<'a>(
    graph: &'a PieceGraph,
    id: &PieceId,
    capability: &'static str,
    has: fn(&Piece) -> bool,
) -> Result<&'a Piece, Rejection> {
    let piece = graph
        .get(id)
        .ok_or_else(|| Rejection::UnknownPiece(id.clone()))?;
    if has(piece) {
        Ok(piece)
    } else {
        Err(missing(id, capability))
    }
}

fn holder_of(graph: &PieceGraph, id: &PieceId) -> Option<AnchorRef> {
    graph
        .anchor_holding(id)
        .map(|(piece, anchor)| AnchorRef::new(piece.clone(), anchor.clone()))
}

fn move_to(id: &PieceId, pos: Vec3, prev: Vec3) -> Invocation {
    Invocation {
        piece: id.clone(),
        from_hand: false,
        change: Change::Move { pos, prev },
    }
}

/// Where a piece split off `source` lands: one width to the side.
fn split_position(source: &Piece) -> Vec3 {
    let mut position = source.position;
    position.x += source.shape.width;
    position
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}
