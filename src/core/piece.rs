//! Pieces (meshes) and their capability states.
//!
//! A `Piece` is one game object on the table. Its shape is opaque to the
//! engine (the rendering layer owns it); what the engine cares about are the
//! optional capability states. Each capability is independent, and an
//! operation is only valid on a piece carrying the matching capability.
//!
//! ## Capabilities
//!
//! | Field | Enables |
//! |---|---|
//! | `movable` | move, being snapped / pushed |
//! | `stackable` | push, pop, reorder |
//! | `anchorable` | snap, unsnap |
//! | `flippable` | flip |
//! | `rotable` | rotate |
//! | `quantifiable` | increment, decrement |
//! | `randomizable` | random, set face |
//! | `lockable` | toggle lock |
//! | `drawable` | draw into and play from a hand |

use serde::{Deserialize, Serialize};

use super::entity::{AnchorId, PieceId};

/// A 3D coordinate (x: right, y: up, z: towards the viewer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// Create a coordinate.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Horizontal distance, ignoring elevation.
    #[must_use]
    pub fn planar_distance(self, other: Vec3) -> f32 {
        ((self.x - other.x).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Visual descriptor, consumed by the rendering layer.
///
/// Only `height` is read by the engine: it is the vertical step used when
/// stacking pieces or snapping onto them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Mesh family (`"card"`, `"roundToken"`, `"die"`, `"board"`...).
    pub kind: String,

    /// Texture reference, uninterpreted.
    #[serde(default)]
    pub texture: Option<String>,

    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl Shape {
    /// Create a shape with the given footprint and height.
    pub fn new(kind: impl Into<String>, width: f32, height: f32, depth: f32) -> Self {
        Self {
            kind: kind.into(),
            texture: None,
            width,
            height,
            depth,
        }
    }

    /// Set the texture reference.
    #[must_use]
    pub fn with_texture(mut self, texture: impl Into<String>) -> Self {
        self.texture = Some(texture.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Movable {
    /// Placement compatibility tag checked against anchor and quantity filters.
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stackable {
    /// Pieces stacked on this one, bottom to top.
    #[serde(default)]
    pub stack_ids: Vec<PieceId>,
}

/// Named attachment point on a piece.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: AnchorId,

    /// Position relative to the owning piece.
    #[serde(default)]
    pub offset: Vec3,

    /// Accepted `Movable::kind` values. Empty accepts everything.
    #[serde(default)]
    pub kinds: Vec<String>,

    /// Currently snapped pieces, in snap order.
    #[serde(default)]
    pub snapped_ids: Vec<PieceId>,

    /// Maximum occupancy.
    #[serde(default = "default_anchor_max")]
    pub max: usize,

    /// Yaw forced onto whatever snaps here.
    #[serde(default)]
    pub angle: Option<f32>,

    /// Face state forced onto whatever snaps here.
    #[serde(default)]
    pub flip: Option<bool>,
}

fn default_anchor_max() -> usize {
    1
}

impl Anchor {
    /// Create an empty anchor with capacity 1.
    pub fn new(id: impl Into<AnchorId>, offset: Vec3) -> Self {
        Self {
            id: id.into(),
            offset,
            kinds: Vec::new(),
            snapped_ids: Vec::new(),
            max: default_anchor_max(),
            angle: None,
            flip: None,
        }
    }

    /// Restrict accepted kinds.
    #[must_use]
    pub fn with_kinds(mut self, kinds: &[&str]) -> Self {
        self.kinds = kinds.iter().map(|k| (*k).to_string()).collect();
        self
    }

    /// Set maximum occupancy.
    #[must_use]
    pub fn with_max(mut self, max: usize) -> Self {
        self.max = max;
        self
    }

    /// Force an angle on snapped pieces.
    #[must_use]
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = Some(angle);
        self
    }

    /// Force a face state on snapped pieces.
    #[must_use]
    pub fn with_flip(mut self, flipped: bool) -> Self {
        self.flip = Some(flipped);
        self
    }

    /// Whether another piece may still snap here.
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        self.snapped_ids.len() < self.max
    }

    /// Whether a piece of `kind` is accepted.
    #[must_use]
    pub fn accepts(&self, kind: Option<&str>) -> bool {
        if self.kinds.is_empty() {
            return true;
        }
        kind.is_some_and(|kind| self.kinds.iter().any(|k| k == kind))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Anchorable {
    pub anchors: Vec<Anchor>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flippable {
    pub is_flipped: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotable {
    /// Yaw, in radians.
    pub angle: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quantifiable {
    pub quantity: u32,

    /// Accepted donor kinds on merge. Empty accepts everything.
    #[serde(default)]
    pub kinds: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Randomizable {
    /// Current face, in `1..=max`.
    pub face: u32,
    pub max: u32,

    /// Whether players may pick a face instead of rolling.
    #[serde(default)]
    pub can_be_set: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockable {
    pub is_locked: bool,
}

/// Hand transition behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Drawable {
    /// Turn face up when picked into a hand.
    #[serde(default)]
    pub unflip_on_pick: bool,

    /// Turn face down when played from a hand.
    #[serde(default)]
    pub flip_on_play: bool,

    /// Angle applied when picked into a hand.
    #[serde(default)]
    pub angle_on_pick: Option<f32>,
}

/// A piece and its capability states.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub shape: Shape,

    /// Absolute position on the table (or within a hand).
    #[serde(default)]
    pub position: Vec3,

    #[serde(default)]
    pub movable: Option<Movable>,
    #[serde(default)]
    pub stackable: Option<Stackable>,
    #[serde(default)]
    pub anchorable: Option<Anchorable>,
    #[serde(default)]
    pub flippable: Option<Flippable>,
    #[serde(default)]
    pub rotable: Option<Rotable>,
    #[serde(default)]
    pub quantifiable: Option<Quantifiable>,
    #[serde(default)]
    pub randomizable: Option<Randomizable>,
    #[serde(default)]
    pub lockable: Option<Lockable>,
    #[serde(default)]
    pub drawable: Option<Drawable>,
}

impl Piece {
    /// Create a piece with no capabilities.
    pub fn new(id: impl Into<PieceId>, shape: Shape) -> Self {
        Self {
            id: id.into(),
            shape,
            position: Vec3::default(),
            movable: None,
            stackable: None,
            anchorable: None,
            flippable: None,
            rotable: None,
            quantifiable: None,
            randomizable: None,
            lockable: None,
            drawable: None,
        }
    }

    #[must_use]
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn movable(mut self, kind: Option<&str>) -> Self {
        self.movable = Some(Movable {
            kind: kind.map(str::to_string),
        });
        self
    }

    #[must_use]
    pub fn stackable(mut self) -> Self {
        self.stackable = Some(Stackable::default());
        self
    }

    #[must_use]
    pub fn with_anchors(mut self, anchors: Vec<Anchor>) -> Self {
        self.anchorable = Some(Anchorable { anchors });
        self
    }

    #[must_use]
    pub fn flippable(mut self, is_flipped: bool) -> Self {
        self.flippable = Some(Flippable { is_flipped });
        self
    }

    #[must_use]
    pub fn rotable(mut self, angle: f32) -> Self {
        self.rotable = Some(Rotable { angle });
        self
    }

    #[must_use]
    pub fn quantifiable(mut self, quantity: u32) -> Self {
        self.quantifiable = Some(Quantifiable {
            quantity,
            kinds: Vec::new(),
        });
        self
    }

    #[must_use]
    pub fn randomizable(mut self, max: u32, can_be_set: bool) -> Self {
        self.randomizable = Some(Randomizable {
            face: 1,
            max,
            can_be_set,
        });
        self
    }

    #[must_use]
    pub fn lockable(mut self, is_locked: bool) -> Self {
        self.lockable = Some(Lockable { is_locked });
        self
    }

    #[must_use]
    pub fn drawable(mut self, drawable: Drawable) -> Self {
        self.drawable = Some(drawable);
        self
    }

    /// Movement kind, if movable and tagged.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.movable.as_ref().and_then(|m| m.kind.as_deref())
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lockable.is_some_and(|l| l.is_locked)
    }

    #[must_use]
    pub fn is_flipped(&self) -> bool {
        self.flippable.is_some_and(|f| f.is_flipped)
    }

    #[must_use]
    pub fn angle(&self) -> Option<f32> {
        self.rotable.map(|r| r.angle)
    }

    #[must_use]
    pub fn quantity(&self) -> Option<u32> {
        self.quantifiable.as_ref().map(|q| q.quantity)
    }

    /// Pieces stacked on this one, bottom to top.
    #[must_use]
    pub fn stack_ids(&self) -> &[PieceId] {
        self.stackable.as_ref().map_or(&[], |s| s.stack_ids.as_slice())
    }

    /// Anchors carried by this piece.
    #[must_use]
    pub fn anchors(&self) -> &[Anchor] {
        self.anchorable.as_ref().map_or(&[], |a| a.anchors.as_slice())
    }

    #[must_use]
    pub fn anchor(&self, id: &AnchorId) -> Option<&Anchor> {
        self.anchors().iter().find(|a| &a.id == id)
    }

    pub fn anchor_mut(&mut self, id: &AnchorId) -> Option<&mut Anchor> {
        self.anchorable
            .as_mut()?
            .anchors
            .iter_mut()
            .find(|a| &a.id == id)
    }

    /// Ids of every piece snapped on any of this piece's anchors.
    pub fn snapped_ids(&self) -> impl Iterator<Item = &PieceId> {
        self.anchors().iter().flat_map(|a| a.snapped_ids.iter())
    }

    /// Apply a set of overrides.
    ///
    /// Overrides only touch capabilities the piece already carries.
    pub fn apply_patch(&mut self, patch: &PiecePatch) {
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let (Some(flipped), Some(flippable)) = (patch.is_flipped, self.flippable.as_mut()) {
            flippable.is_flipped = flipped;
        }
        if let (Some(angle), Some(rotable)) = (patch.angle, self.rotable.as_mut()) {
            rotable.angle = angle;
        }
        if let (Some(locked), Some(lockable)) = (patch.is_locked, self.lockable.as_mut()) {
            lockable.is_locked = locked;
        }
        if let (Some(face), Some(randomizable)) = (patch.face, self.randomizable.as_mut()) {
            randomizable.face = face.clamp(1, randomizable.max.max(1));
        }
        if let (Some(quantity), Some(quantifiable)) = (patch.quantity, self.quantifiable.as_mut()) {
            quantifiable.quantity = quantity.max(1);
        }
    }
}

/// Property overrides carried by setup slots.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PiecePatch {
    #[serde(default)]
    pub position: Option<Vec3>,
    #[serde(default)]
    pub is_flipped: Option<bool>,
    #[serde(default)]
    pub angle: Option<f32>,
    #[serde(default)]
    pub is_locked: Option<bool>,
    #[serde(default)]
    pub face: Option<u32>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

impl PiecePatch {
    #[must_use]
    pub fn at(position: Vec3) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn flipped(mut self, is_flipped: bool) -> Self {
        self.is_flipped = Some(is_flipped);
        self
    }

    #[must_use]
    pub fn angled(mut self, angle: f32) -> Self {
        self.angle = Some(angle);
        self
    }
}
