//! Hand tests.
//!
//! These tests verify that hands stay private: the drawing participant
//! knows the content, everyone else only counts pieces until they are
//! played back.

use rust_tabletop::core::{
    Drawable, EngineConfig, GameRng, Gesture, Piece, PieceId, PlayerId, Rejection, Shape, Vec3,
};
use rust_tabletop::replication::is_shared;
use rust_tabletop::ActionEngine;

fn alice() -> PlayerId {
    PlayerId::new("alice")
}

fn card(id: &str, drawable: Drawable) -> Piece {
    Piece::new(id, Shape::new("card", 6.0, 0.1, 9.0))
        .movable(Some("card"))
        .stackable()
        .flippable(true)
        .rotable(1.0)
        .drawable(drawable)
}

fn table() -> Vec<Piece> {
    let drawable = Drawable {
        unflip_on_pick: true,
        flip_on_play: true,
        angle_on_pick: Some(0.0),
    };
    vec![card("c1", drawable), card("c2", drawable), card("c3", Drawable::default())]
}

fn engines() -> (ActionEngine, ActionEngine) {
    let config = EngineConfig::default();
    (
        ActionEngine::new(table(), GameRng::new(1), config.clone()),
        ActionEngine::new(table(), GameRng::new(2), config),
    )
}

/// A drawn piece is revealed to its owner and only counted remotely.
#[test]
fn test_remote_draw_is_hidden() {
    let (mut local, mut remote) = engines();

    let record = local
        .apply_gesture(&alice(), &"c1".into(), false, Gesture::Draw)
        .unwrap();
    assert!(is_shared(&record));
    remote.apply_remote(&alice(), &record.invocation(), record.seq).unwrap();

    let held = local.table().hands.get(&alice(), &"c1".into()).unwrap();
    assert!(!held.is_flipped());
    assert_eq!(held.angle(), Some(0.0));

    assert!(!remote.pieces().contains(&"c1".into()));
    assert!(remote.table().hands.hand(&alice()).is_empty());
    assert_eq!(remote.table().hands.size(&alice()), 1);
}

/// Changes inside a hand stay private; playing carries the full content.
#[test]
fn test_play_reveals_content() {
    let (mut local, mut remote) = engines();
    let drawn = local
        .apply_gesture(&alice(), &"c1".into(), false, Gesture::Draw)
        .unwrap();
    remote.apply_remote(&alice(), &drawn.invocation(), drawn.seq).unwrap();

    let rotated = local
        .apply_gesture(&alice(), &"c1".into(), true, Gesture::Rotate)
        .unwrap();
    assert!(!is_shared(&rotated));

    let played = local
        .apply_gesture(&alice(), &"c1".into(), true, Gesture::Play { pos: Vec3::new(2.0, 0.0, 2.0) })
        .unwrap();
    assert!(is_shared(&played));
    remote.apply_remote(&alice(), &played.invocation(), played.seq).unwrap();

    let on_local = local.pieces().get(&"c1".into()).unwrap();
    let on_remote = remote.pieces().get(&"c1".into()).unwrap();
    assert_eq!(on_local, on_remote);
    assert_eq!(on_remote.position, Vec3::new(2.0, 0.0, 2.0));
    assert_eq!(on_remote.angle(), Some(local.config().rotation_step));
    // flip on play
    assert!(on_remote.is_flipped());
    assert_eq!(remote.table().hands.size(&alice()), 0);
}

/// Only flip, rotate and play apply to pieces in hand.
#[test]
fn test_hand_operations_are_limited() {
    let (mut local, _) = engines();
    local
        .apply_gesture(&alice(), &"c3".into(), false, Gesture::Draw)
        .unwrap();

    local
        .apply_gesture(&alice(), &"c3".into(), true, Gesture::Flip)
        .unwrap();
    assert_eq!(
        local.apply_gesture(&alice(), &"c3".into(), true, Gesture::Move { pos: Vec3::default() }),
        Err(Rejection::NotAllowedInHand { op: "move" })
    );
    assert_eq!(
        local.apply_gesture(&alice(), &"c3".into(), true, Gesture::ToggleLock),
        Err(Rejection::NotAllowedInHand { op: "toggleLock" })
    );

    // without flip_on_play the hand state is kept
    let played = local
        .apply_gesture(&alice(), &"c3".into(), true, Gesture::Play { pos: Vec3::default() })
        .unwrap();
    assert_eq!(played.piece, PieceId::from("c3"));
    assert!(!local.pieces().get(&"c3".into()).unwrap().is_flipped());
}

/// Another player's hand is out of reach.
#[test]
fn test_cannot_play_from_other_hand() {
    let (mut local, _) = engines();
    local
        .apply_gesture(&alice(), &"c2".into(), false, Gesture::Draw)
        .unwrap();

    let bob = PlayerId::new("bob");
    let result = local.apply_gesture(&bob, &"c2".into(), true, Gesture::Play { pos: Vec3::default() });
    assert_eq!(
        result,
        Err(Rejection::NotInHand {
            piece: "c2".into(),
            player: bob,
        })
    );
    assert_eq!(local.table().hands.size(&alice()), 1);
}

/// Snapshots sent to a player only carry that player's hand.
#[test]
fn test_snapshot_for_player_hides_other_hands() {
    let (mut local, _) = engines();
    let bob = PlayerId::new("bob");
    local
        .apply_gesture(&alice(), &"c1".into(), false, Gesture::Draw)
        .unwrap();
    local
        .apply_gesture(&bob, &"c2".into(), false, Gesture::Draw)
        .unwrap();

    let for_bob = local.table().snapshot_for(&bob);
    assert_eq!(for_bob.hand_meshes.len(), 1);
    assert_eq!(for_bob.hand_meshes[0].meshes[0].id, PieceId::from("c2"));

    let mut joined = ActionEngine::new(Vec::new(), GameRng::new(3), EngineConfig::default());
    joined.load(for_bob);
    assert_eq!(joined.table().hands.size(&bob), 1);
    assert!(joined.table().hands.hand(&alice()).is_empty());
    assert_eq!(joined.table().hands.size(&alice()), 1);
    assert_eq!(joined.pieces().len(), 1);
}

/// A participant loading a snapshot after a draw still accepts the play.
#[test]
fn test_play_after_joining_from_snapshot() {
    let (mut local, _) = engines();
    let bob = PlayerId::new("bob");
    local
        .apply_gesture(&alice(), &"c1".into(), false, Gesture::Draw)
        .unwrap();

    let mut joined = ActionEngine::new(Vec::new(), GameRng::new(3), EngineConfig::default());
    joined.load(local.table().snapshot_for(&bob));

    let played = local
        .apply_gesture(&alice(), &"c1".into(), true, Gesture::Play { pos: Vec3::new(1.0, 0.0, 1.0) })
        .unwrap();
    joined
        .apply_remote(&alice(), &played.invocation(), played.seq)
        .unwrap();

    assert_eq!(joined.pieces(), local.pieces());
    assert_eq!(joined.table().hands.size(&alice()), 0);
}
