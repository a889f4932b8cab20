/// Map layer classification.
///
/// Keyed on the layer name alone. The map loader and the renderer both
/// read their decisions from here.
///
///   Collidable            water, rails, border, vegetation, buildings
///   DecorativeCollidable  street furniture, per-name depth
///   ForegroundOverlay     upper lamp parts, pinned above every sprite
///   BackgroundOnly        everything else

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LayerKind {
    Collidable,
    DecorativeCollidable,
    BackgroundOnly,
    ForegroundOverlay,
}

/// Depth for layers that must draw above any sprite.
/// Sprite depth is the y pixel, which stays far below this.
pub const ABOVE_SPRITES: f32 = 10_000.0;

pub const BACKGROUND_DEPTH: f32 = 0.0;
pub const SCENERY_DEPTH: f32 = 1.0;

/// Scenery whose solid tiles block the player.
pub const COLLIDABLE_LAYERS: &[&str] = &[
    "water",
    "rails",
    "map_border",
    "vegetation_low",
    "vegetation_high",
    "buildings_low",
    "buildings_high",
];

/// Street furniture: collides, drawn at its own depth.
///
/// Every depth here sits below the lowest sprite depth (a player's y is
/// never under its collider height), so furniture always draws beneath
/// the player. Parts that must cover the player go on a foreground layer.
pub const DECORATIVE_LAYERS: &[(&str, f32)] = &[
    ("benches", 2.0),
    ("bins", 2.0),
    ("fences", 3.0),
    ("lamps", 4.0),
];

/// Upper lamp parts: drawn over the player, never collide.
/// The lamp base on `lamps` still blocks.
pub const FOREGROUND_LAYERS: &[&str] = &["lamps_upper"];

impl LayerKind {
    /// Classify a layer by name.
    pub fn of(name: &str) -> LayerKind {
        if COLLIDABLE_LAYERS.contains(&name) {
            LayerKind::Collidable
        } else if DECORATIVE_LAYERS.iter().any(|(n, _)| *n == name) {
            LayerKind::DecorativeCollidable
        } else if FOREGROUND_LAYERS.contains(&name) {
            LayerKind::ForegroundOverlay
        } else {
            LayerKind::BackgroundOnly
        }
    }

    /// Do solid tiles on a layer of this kind register against the player's collider?
    pub fn collides(self) -> bool {
        matches!(self, LayerKind::Collidable | LayerKind::DecorativeCollidable)
    }
}

/// Render and collision decision for one named layer.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerPlan {
    pub name: String,
    pub kind: LayerKind,
    pub depth: f32,
    pub collides: bool,
}

impl LayerPlan {
    pub fn for_name(name: &str) -> LayerPlan {
        let kind = LayerKind::of(name);
        let depth = match kind {
            LayerKind::Collidable => SCENERY_DEPTH,
            LayerKind::DecorativeCollidable => DECORATIVE_LAYERS
                .iter()
                .find(|(n, _)| *n == name)
                .map(|&(_, d)| d)
                .unwrap_or(SCENERY_DEPTH),
            LayerKind::ForegroundOverlay => ABOVE_SPRITES,
            LayerKind::BackgroundOnly => BACKGROUND_DEPTH,
        };
        LayerPlan {
            name: name.to_string(),
            kind,
            depth,
            collides: kind.collides(),
        }
    }

    /// Is this layer drawn over a sprite at `sprite_depth`?
    pub fn draws_over(&self, sprite_depth: f32) -> bool {
        self.depth > sprite_depth
    }
}

/// Every fixed collidable name, scenery first then furniture.
/// Used to look layers up by name when wiring collision.
pub fn colliding_layer_names() -> impl Iterator<Item = &'static str> {
    COLLIDABLE_LAYERS
        .iter()
        .copied()
        .chain(DECORATIVE_LAYERS.iter().map(|&(n, _)| n))
}
