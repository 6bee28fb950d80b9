//! Action engine tests.
//!
//! These tests drive the engine through gestures the way the input layer
//! would, and check every operation against its inverse, its rejections
//! and replay.

use proptest::prelude::*;

use rust_tabletop::core::{
    Anchor, Change, Drawable, EngineConfig, GameRng, Gesture, Operation, Piece, PieceId, PlayerId,
    Rejection, Shape, Vec3,
};
use rust_tabletop::replication::is_shared;
use rust_tabletop::ActionEngine;

fn alice() -> PlayerId {
    PlayerId::new("alice")
}

fn card(id: &str) -> Piece {
    Piece::new(id, Shape::new("card", 6.0, 0.1, 9.0))
        .movable(Some("card"))
        .stackable()
        .flippable(true)
        .rotable(0.0)
        .drawable(Drawable {
            unflip_on_pick: true,
            flip_on_play: false,
            angle_on_pick: None,
        })
}

fn board() -> Piece {
    Piece::new("board", Shape::new("board", 40.0, 0.5, 40.0))
        .movable(None)
        .with_anchors(vec![
            Anchor::new("reserve", Vec3::new(-10.0, 0.0, 0.0)).with_kinds(&["card"]),
            Anchor::new("pile", Vec3::new(10.0, 0.0, 0.0)).with_max(3),
        ])
}

fn chips(id: &str, quantity: u32) -> Piece {
    Piece::new(id, Shape::new("chips", 2.0, 0.3, 2.0))
        .movable(Some("chips"))
        .quantifiable(quantity)
}

fn engine(pieces: Vec<Piece>) -> ActionEngine {
    ActionEngine::new(pieces, GameRng::new(7), EngineConfig::default())
}

fn apply(engine: &mut ActionEngine, piece: &str, gesture: Gesture) -> Result<(), Rejection> {
    engine
        .apply_gesture(&alice(), &piece.into(), false, gesture)
        .map(|_| ())
}

fn position(engine: &ActionEngine, id: &str) -> Vec3 {
    engine.pieces().get(&id.into()).unwrap().position
}

fn quantity(engine: &ActionEngine, id: &str) -> Option<u32> {
    engine.pieces().get(&id.into()).and_then(Piece::quantity)
}

fn total_quantity(engine: &ActionEngine) -> u32 {
    engine.pieces().iter().filter_map(Piece::quantity).sum()
}

/// Moving a piece carries its stack and snapped pieces along.
#[test]
fn test_move_carries_stack_and_snapped() {
    let mut engine = engine(vec![board(), card("c1"), card("c2"), card("c3")]);
    apply(&mut engine, "c1", Gesture::Push { pushed: "c2".into() }).unwrap();
    apply(
        &mut engine,
        "board",
        Gesture::Snap {
            mover: "c3".into(),
            anchor: "pile".into(),
        },
    )
    .unwrap();
    assert_eq!(position(&engine, "c2"), Vec3::new(0.0, 0.1, 0.0));
    assert_eq!(position(&engine, "c3"), Vec3::new(10.0, 0.5, 0.0));

    apply(&mut engine, "c1", Gesture::Move { pos: Vec3::new(5.0, 0.0, 0.0) }).unwrap();
    assert_eq!(position(&engine, "c2"), Vec3::new(5.0, 0.1, 0.0));

    apply(&mut engine, "board", Gesture::Move { pos: Vec3::new(0.0, 0.0, 20.0) }).unwrap();
    assert_eq!(position(&engine, "c3"), Vec3::new(10.0, 0.5, 20.0));
    // c1 is neither stacked nor snapped on the board
    assert_eq!(position(&engine, "c1"), Vec3::new(5.0, 0.0, 0.0));
}

/// Move records carry both positions; the inverse swaps them.
#[test]
fn test_move_record_and_revert() {
    let mut engine = engine(vec![card("c1").at(Vec3::new(1.0, 0.0, 1.0))]);
    let record = engine
        .apply_gesture(&alice(), &"c1".into(), false, Gesture::Move { pos: Vec3::new(4.0, 0.0, 4.0) })
        .unwrap();
    assert_eq!(
        record.change,
        Change::Move {
            pos: Vec3::new(4.0, 0.0, 4.0),
            prev: Vec3::new(1.0, 0.0, 1.0),
        }
    );

    engine.revert(&alice(), &record).unwrap();
    assert_eq!(position(&engine, "c1"), Vec3::new(1.0, 0.0, 1.0));
    assert_eq!(engine.history().len(), 2);
}

/// Snapping enforces capacity and kinds without changing state.
#[test]
fn test_snap_rejections() {
    let die = Piece::new("die", Shape::new("die", 1.0, 1.0, 1.0))
        .movable(Some("die"))
        .randomizable(6, false);
    let mut engine = engine(vec![board(), card("c1"), card("c2"), die]);
    let snap = |mover: &str| Gesture::Snap {
        mover: mover.into(),
        anchor: "reserve".into(),
    };

    apply(&mut engine, "board", snap("c1")).unwrap();
    assert_eq!(
        apply(&mut engine, "board", snap("c2")),
        Err(Rejection::AnchorFull {
            piece: "board".into(),
            anchor: "reserve".into(),
        })
    );
    apply(&mut engine, "board", Gesture::Unsnap { snapped: "c1".into() }).unwrap();
    assert_eq!(
        apply(&mut engine, "board", snap("die")),
        Err(Rejection::KindMismatch {
            mover: "die".into(),
            target: "board".into(),
        })
    );
    assert_eq!(
        apply(&mut engine, "board", Gesture::Unsnap { snapped: "c1".into() }),
        Err(Rejection::NotSnapped("c1".into()))
    );
    assert_eq!(engine.history().len(), 2);
}

/// Anchor overrides are undone along with the snap.
#[test]
fn test_snap_revert_restores_overrides() {
    let mut table = board();
    table.anchorable.as_mut().unwrap().anchors[1] = Anchor::new("pile", Vec3::default())
        .with_angle(1.5)
        .with_flip(false);
    let mut engine = engine(vec![table, card("c1").rotable(0.25)]);

    let record = engine
        .apply_gesture(
            &alice(),
            &"board".into(),
            false,
            Gesture::Snap {
                mover: "c1".into(),
                anchor: "pile".into(),
            },
        )
        .unwrap();
    let snapped = engine.pieces().get(&"c1".into()).unwrap();
    assert_eq!(snapped.angle(), Some(1.5));
    assert!(!snapped.is_flipped());

    engine.revert(&alice(), &record).unwrap();
    let restored = engine.pieces().get(&"c1".into()).unwrap();
    assert_eq!(restored.angle(), Some(0.25));
    assert!(restored.is_flipped());
    assert_eq!(restored.position, Vec3::default());
}

/// Unsnapping everything frees every anchor; the inverse snaps them back.
#[test]
fn test_unsnap_all_and_revert() {
    let mut engine = engine(vec![board(), card("c1"), card("c2"), card("c3")]);
    for (mover, anchor) in [("c1", "reserve"), ("c2", "pile"), ("c3", "pile")] {
        apply(
            &mut engine,
            "board",
            Gesture::Snap {
                mover: mover.into(),
                anchor: anchor.into(),
            },
        )
        .unwrap();
    }

    let record = engine
        .apply_gesture(&alice(), &"board".into(), false, Gesture::UnsnapAll)
        .unwrap();
    assert_eq!(record.revert.len(), 3);
    assert_eq!(engine.pieces().get(&"board".into()).unwrap().snapped_ids().count(), 0);

    engine.revert(&alice(), &record).unwrap();
    let pile = engine
        .pieces()
        .get(&"board".into())
        .unwrap()
        .anchor(&"pile".into())
        .unwrap()
        .snapped_ids
        .clone();
    assert_eq!(pile, vec![PieceId::from("c2"), PieceId::from("c3")]);
}

/// Push brings the pushed piece's own stack along; the inverse pops it all.
#[test]
fn test_push_carries_stack_and_reverts() {
    let mut engine = engine(vec![card("c1"), card("c2"), card("c3").at(Vec3::new(9.0, 0.0, 9.0))]);
    apply(&mut engine, "c3", Gesture::Push { pushed: "c2".into() }).unwrap();

    let record = engine
        .apply_gesture(&alice(), &"c1".into(), false, Gesture::Push { pushed: "c3".into() })
        .unwrap();
    let base = engine.pieces().get(&"c1".into()).unwrap();
    assert_eq!(base.stack_ids(), &[PieceId::from("c3"), PieceId::from("c2")]);
    assert_eq!(position(&engine, "c2"), Vec3::new(0.0, 0.2, 0.0));

    engine.revert(&alice(), &record).unwrap();
    assert!(engine.pieces().get(&"c1".into()).unwrap().stack_ids().is_empty());
    assert_eq!(
        engine.pieces().get(&"c3".into()).unwrap().stack_ids(),
        &[PieceId::from("c2")]
    );
    assert_eq!(position(&engine, "c3"), Vec3::new(9.0, 0.0, 9.0));
}

/// Push rejects self targets and pieces already on the stack.
#[test]
fn test_push_rejections() {
    let mut engine = engine(vec![card("c1"), card("c2")]);
    assert_eq!(
        apply(&mut engine, "c1", Gesture::Push { pushed: "c1".into() }),
        Err(Rejection::SelfTarget("c1".into()))
    );
    apply(&mut engine, "c1", Gesture::Push { pushed: "c2".into() }).unwrap();
    assert_eq!(
        apply(&mut engine, "c1", Gesture::Push { pushed: "c2".into() }),
        Err(Rejection::AlreadyStacked {
            piece: "c2".into(),
            base: "c1".into(),
        })
    );
}

/// Popping keeps the popped group together, lowest piece as its base.
#[test]
fn test_pop_and_revert() {
    let mut engine = engine(vec![card("c1"), card("c2"), card("c3"), card("c4")]);
    for pushed in ["c2", "c3", "c4"] {
        apply(&mut engine, "c1", Gesture::Push { pushed: pushed.into() }).unwrap();
    }

    assert!(matches!(
        apply(&mut engine, "c1", Gesture::Pop { count: 0 }),
        Err(Rejection::StackTooSmall { .. })
    ));
    assert_eq!(
        apply(&mut engine, "c1", Gesture::Pop { count: 4 }),
        Err(Rejection::StackTooSmall {
            piece: "c1".into(),
            requested: 4,
            available: 3,
        })
    );

    let record = engine
        .apply_gesture(&alice(), &"c1".into(), false, Gesture::Pop { count: 2 })
        .unwrap();
    assert_eq!(engine.pieces().get(&"c1".into()).unwrap().stack_ids(), &[PieceId::from("c2")]);
    assert_eq!(engine.pieces().get(&"c3".into()).unwrap().stack_ids(), &[PieceId::from("c4")]);

    engine.revert(&alice(), &record).unwrap();
    assert_eq!(
        engine.pieces().get(&"c1".into()).unwrap().stack_ids(),
        &[PieceId::from("c2"), PieceId::from("c3"), PieceId::from("c4")]
    );
}

/// Reorder must list the same pieces; positions follow the new order.
#[test]
fn test_reorder() {
    let mut engine = engine(vec![card("c1"), card("c2"), card("c3")]);
    for pushed in ["c2", "c3"] {
        apply(&mut engine, "c1", Gesture::Push { pushed: pushed.into() }).unwrap();
    }

    assert_eq!(
        apply(&mut engine, "c1", Gesture::Reorder { ids: vec!["c2".into(), "c2".into()] }),
        Err(Rejection::ReorderMismatch("c1".into()))
    );

    let record = engine
        .apply_gesture(&alice(), &"c1".into(), false, Gesture::Reorder { ids: vec!["c3".into(), "c2".into()] })
        .unwrap();
    assert_eq!(position(&engine, "c3"), Vec3::new(0.0, 0.1, 0.0));
    assert_eq!(position(&engine, "c2"), Vec3::new(0.0, 0.2, 0.0));

    engine.revert(&alice(), &record).unwrap();
    assert_eq!(
        engine.pieces().get(&"c1".into()).unwrap().stack_ids(),
        &[PieceId::from("c2"), PieceId::from("c3")]
    );
}

/// Merging checks kinds, destroys the donor, and splits back on undo.
#[test]
fn test_increment_and_revert() {
    let mut bank = chips("bank", 5);
    bank.quantifiable.as_mut().unwrap().kinds = vec!["chips".to_string()];
    let coins = Piece::new("coins", Shape::new("coins", 1.0, 0.1, 1.0))
        .movable(Some("coin"))
        .quantifiable(2);
    let mut engine = engine(vec![bank, chips("pile", 3).at(Vec3::new(7.0, 0.0, 7.0)), coins]);

    assert_eq!(
        apply(&mut engine, "bank", Gesture::Increment { donor: "coins".into() }),
        Err(Rejection::KindMismatch {
            mover: "coins".into(),
            target: "bank".into(),
        })
    );
    assert_eq!(
        apply(&mut engine, "bank", Gesture::Increment { donor: "bank".into() }),
        Err(Rejection::SelfTarget("bank".into()))
    );

    let record = engine
        .apply_gesture(&alice(), &"bank".into(), false, Gesture::Increment { donor: "pile".into() })
        .unwrap();
    assert_eq!(quantity(&engine, "bank"), Some(8));
    assert!(!engine.pieces().contains(&"pile".into()));

    engine.revert(&alice(), &record).unwrap();
    assert_eq!(quantity(&engine, "bank"), Some(5));
    assert_eq!(quantity(&engine, "pile"), Some(3));
    assert_eq!(position(&engine, "pile"), Vec3::new(7.0, 0.0, 7.0));
}

/// Splitting spawns a fresh piece one width aside.
#[test]
fn test_decrement_spawns_fresh_piece() {
    let mut engine = engine(vec![chips("bank", 5)]);
    let record = engine
        .apply_gesture(&alice(), &"bank".into(), false, Gesture::Decrement { amount: 2 })
        .unwrap();

    assert_eq!(
        record.change,
        Change::Call(Operation::Decrement {
            amount: 2,
            spawned: "bank-1".into(),
        })
    );
    assert_eq!(quantity(&engine, "bank"), Some(3));
    assert_eq!(quantity(&engine, "bank-1"), Some(2));
    assert_eq!(position(&engine, "bank-1"), Vec3::new(2.0, 0.0, 0.0));

    assert_eq!(
        apply(&mut engine, "bank", Gesture::Decrement { amount: 4 }),
        Err(Rejection::QuantityTooLow {
            piece: "bank".into(),
            requested: 4,
            available: 3,
        })
    );

    apply(&mut engine, "bank", Gesture::Decrement { amount: 1 }).unwrap();
    assert_eq!(quantity(&engine, "bank-2"), Some(1));
}

/// Splitting the whole quantity moves everything to the spawned piece.
#[test]
fn test_decrement_to_zero_removes_source() {
    let mut engine = engine(vec![chips("bank", 4).at(Vec3::new(1.0, 0.0, 1.0))]);
    let record = engine
        .apply_gesture(&alice(), &"bank".into(), false, Gesture::Decrement { amount: 4 })
        .unwrap();

    assert!(!engine.pieces().contains(&"bank".into()));
    assert_eq!(quantity(&engine, "bank-1"), Some(4));

    engine.revert(&alice(), &record).unwrap();
    assert_eq!(engine.pieces().len(), 1);
    assert_eq!(quantity(&engine, "bank"), Some(4));
    assert_eq!(position(&engine, "bank"), Vec3::new(1.0, 0.0, 1.0));
}

/// Rolls stay within the faces; setting a face needs permission.
#[test]
fn test_random_and_set_face() {
    let fixed = Piece::new("d1", Shape::new("die", 1.0, 1.0, 1.0)).randomizable(6, false);
    let settable = Piece::new("d2", Shape::new("die", 1.0, 1.0, 1.0)).randomizable(20, true);
    let mut engine = engine(vec![fixed, settable]);

    for _ in 0..50 {
        apply(&mut engine, "d1", Gesture::Random).unwrap();
        let face = engine.pieces().get(&"d1".into()).unwrap().randomizable.unwrap().face;
        assert!((1..=6).contains(&face));
    }

    assert_eq!(
        apply(&mut engine, "d1", Gesture::SetFace { face: 3 }),
        Err(Rejection::FaceNotSettable("d1".into()))
    );
    assert_eq!(
        apply(&mut engine, "d2", Gesture::SetFace { face: 21 }),
        Err(Rejection::FaceOutOfRange {
            piece: "d2".into(),
            face: 21,
        })
    );
    apply(&mut engine, "d2", Gesture::SetFace { face: 17 }).unwrap();
    assert_eq!(engine.pieces().get(&"d2".into()).unwrap().randomizable.unwrap().face, 17);
}

/// Undoing a draw puts the piece back on top of the stack it came from.
#[test]
fn test_draw_revert_restacks() {
    let mut engine = engine(vec![card("c1"), card("c2"), card("c3")]);
    for pushed in ["c2", "c3"] {
        apply(&mut engine, "c1", Gesture::Push { pushed: pushed.into() }).unwrap();
    }

    let record = engine
        .apply_gesture(&alice(), &"c1".into(), false, Gesture::Draw)
        .unwrap();
    assert_eq!(record.piece, PieceId::from("c3"));
    assert_eq!(engine.table().hands.size(&alice()), 1);

    engine.revert(&alice(), &record).unwrap();
    assert_eq!(engine.table().hands.size(&alice()), 0);
    assert_eq!(
        engine.pieces().get(&"c1".into()).unwrap().stack_ids(),
        &[PieceId::from("c2"), PieceId::from("c3")]
    );
    // flipped on the table again, as it was before the draw
    assert!(engine.pieces().get(&"c3".into()).unwrap().is_flipped());
}

/// Replaying the history over the initial pieces rebuilds the same table.
#[test]
fn test_replay_rebuilds_same_table() {
    let initial = vec![
        board(),
        card("c1"),
        card("c2"),
        card("c3"),
        chips("bank", 10),
        Piece::new("die", Shape::new("die", 1.0, 1.0, 1.0)).randomizable(6, false),
    ];
    let mut engine = engine(initial.clone());

    apply(&mut engine, "c1", Gesture::Flip).unwrap();
    apply(&mut engine, "c1", Gesture::Rotate).unwrap();
    apply(&mut engine, "c1", Gesture::Push { pushed: "c2".into() }).unwrap();
    apply(&mut engine, "die", Gesture::Random).unwrap();
    apply(&mut engine, "bank", Gesture::Decrement { amount: 3 }).unwrap();
    apply(
        &mut engine,
        "board",
        Gesture::Snap {
            mover: "bank-1".into(),
            anchor: "pile".into(),
        },
    )
    .unwrap();
    apply(&mut engine, "c1", Gesture::Draw).unwrap();
    engine
        .apply_gesture(&alice(), &"c2".into(), true, Gesture::Rotate)
        .unwrap();
    engine
        .apply_gesture(&alice(), &"c2".into(), true, Gesture::Play { pos: Vec3::new(3.0, 0.0, 3.0) })
        .unwrap();
    apply(&mut engine, "c3", Gesture::Move { pos: Vec3::new(-4.0, 0.0, 2.0) }).unwrap();

    let replayed = ActionEngine::replay(
        initial,
        engine.history().iter(),
        GameRng::new(1234),
        EngineConfig::default(),
    );
    assert_eq!(replayed.pieces(), engine.pieces());
    assert_eq!(replayed.table().hands.hands(), engine.table().hands.hands());
    assert_eq!(replayed.history(), engine.history());
}

/// Apply a gesture on the author's engine and hand the shared record to
/// the other engine.
fn exchange(
    author: &mut ActionEngine,
    receiver: &mut ActionEngine,
    player: &PlayerId,
    piece: &str,
    from_hand: bool,
    gesture: Gesture,
) -> PieceId {
    let record = author
        .apply_gesture(player, &piece.into(), from_hand, gesture)
        .unwrap();
    if is_shared(&record) {
        receiver
            .apply_remote(player, &record.invocation(), record.seq)
            .unwrap();
    }
    record.piece
}

/// Replaying a history that mixes local and remote records, hidden draws
/// included, rebuilds the live table of each participant.
#[test]
fn test_replay_interleaved_histories() {
    let bob = PlayerId::new("bob");
    let initial = vec![
        board(),
        card("c1"),
        card("c2"),
        card("c3"),
        chips("bank", 10),
        Piece::new("die", Shape::new("die", 1.0, 1.0, 1.0)).randomizable(6, false),
    ];
    let mut alices = engine(initial.clone());
    let mut bobs = ActionEngine::new(initial.clone(), GameRng::new(99), EngineConfig::default());

    let (a, b) = (&mut alices, &mut bobs);
    exchange(a, b, &alice(), "c1", false, Gesture::Push { pushed: "c2".into() });
    exchange(b, a, &bob, "c3", false, Gesture::Flip);
    let drawn = exchange(a, b, &alice(), "c1", false, Gesture::Draw);
    assert_eq!(drawn, PieceId::from("c2"));
    exchange(b, a, &bob, "bank", false, Gesture::Decrement { amount: 3 });
    exchange(a, b, &alice(), "c2", true, Gesture::Rotate);
    exchange(
        b,
        a,
        &bob,
        "board",
        false,
        Gesture::Snap {
            mover: "bank-1".into(),
            anchor: "pile".into(),
        },
    );
    exchange(a, b, &alice(), "c2", true, Gesture::Play { pos: Vec3::new(3.0, 0.0, 3.0) });
    exchange(b, a, &bob, "c3", false, Gesture::Draw);
    exchange(a, b, &alice(), "die", false, Gesture::Random);
    exchange(b, a, &bob, "bank-1", false, Gesture::Move { pos: Vec3::new(-6.0, 0.0, 6.0) });
    exchange(a, b, &alice(), "bank", false, Gesture::Increment { donor: "bank-1".into() });

    assert_eq!(alices.pieces(), bobs.pieces());
    assert_eq!(alices.table().hands.size(&bob), 1);
    assert_eq!(bobs.table().hands.size(&alice()), 0);

    for live in [&alices, &bobs] {
        let replayed = ActionEngine::replay(
            initial.clone(),
            live.history().iter(),
            GameRng::new(1234),
            EngineConfig::default(),
        );
        assert_eq!(replayed.pieces(), live.pieces());
        assert_eq!(replayed.history(), live.history());
        assert_eq!(replayed.table().hands.size(&bob), 1);
    }
}

proptest! {
    /// Splits and merges never create or destroy quantity.
    #[test]
    fn prop_quantity_is_conserved(amounts in proptest::collection::vec(1u32..8, 1..20)) {
        let mut engine = engine(vec![chips("bank", 20)]);

        for amount in amounts {
            let largest = engine
                .pieces()
                .iter()
                .max_by_key(|p| p.quantity())
                .map(|p| p.id.clone())
                .unwrap();
            // oversized splits are rejected, which is fine
            let _ = engine.apply_gesture(&alice(), &largest, false, Gesture::Decrement { amount });
            prop_assert_eq!(total_quantity(&engine), 20);
        }

        let ids: Vec<PieceId> = engine.pieces().iter().map(|p| p.id.clone()).collect();
        let (target, donors) = ids.split_first().unwrap();
        for donor in donors {
            engine
                .apply_gesture(&alice(), target, false, Gesture::Increment { donor: donor.clone() })
                .unwrap();
            prop_assert_eq!(total_quantity(&engine), 20);
        }
        prop_assert_eq!(engine.pieces().len(), 1);
    }
}
