/// Map loader for Tiled JSON maps.
///
/// ## Supported format
///   - orthogonal, finite maps
///   - tile layers with plain `data` arrays (no base64/compression)
///   - group layers (flattened in order)
///   - one object layer holding the spawn marker and POIs
///   - embedded tilesets with an `image`
///
/// ## What loading produces
///   1. Tile layers, each with its `LayerPlan` (kind, depth, collides),
///      sorted by depth for drawing (map order breaks ties)
///   2. A collision grid: union of every named colliding layer found
///   3. The frozen POI registry and the spawn point
///
/// A colliding layer name missing from the map is skipped. A missing
/// object layer or spawn marker is fatal.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::AssetConfig;
use crate::domain::entity::Vec2;
use crate::domain::layer::{self, LayerPlan};
use crate::domain::physics::CollisionGrid;
use crate::domain::poi::{self, MapObject, PoiRegistry};
use crate::error::{LoadError, LoadResult};

/// Tiled stores flip/rotation flags in the top bits of each gid.
const GID_MASK: u32 = 0x0FFF_FFFF;

// ══════════════════════════════════════════════════════════════
// Tiled JSON schema
// ══════════════════════════════════════════════════════════════

#[derive(Deserialize, Debug)]
pub struct TiledMap {
    pub width: usize,
    pub height: usize,
    pub tilewidth: u32,
    pub tileheight: u32,
    pub layers: Vec<TiledLayer>,
    #[serde(default)]
    pub tilesets: Vec<TiledTileset>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TiledLayer {
    TileLayer(TiledTileLayer),
    ObjectGroup(TiledObjectGroup),
    Group(TiledGroup),
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug)]
pub struct TiledTileLayer {
    pub name: String,
    pub data: Vec<u32>,
    #[serde(default = "visible_default")]
    pub visible: bool,
}

#[derive(Deserialize, Debug)]
pub struct TiledObjectGroup {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<TiledObject>,
}

#[derive(Deserialize, Debug)]
pub struct TiledGroup {
    #[serde(default)]
    pub layers: Vec<TiledLayer>,
}

#[derive(Deserialize, Debug)]
pub struct TiledObject {
    #[serde(default)]
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub properties: Vec<TiledProperty>,
}

#[derive(Deserialize, Debug)]
pub struct TiledProperty {
    pub name: String,
    pub value: serde_json::Value,
}

#[derive(Deserialize, Debug)]
pub struct TiledTileset {
    pub firstgid: u32,
    #[serde(default)]
    pub name: String,
    pub image: Option<String>,
    #[serde(default)]
    pub columns: u32,
    #[serde(default)]
    pub tilecount: u32,
    #[serde(default)]
    pub tilewidth: u32,
    #[serde(default)]
    pub tileheight: u32,
}

fn visible_default() -> bool { true }

impl TiledProperty {
    /// Property value as text. Non-string values use their JSON form.
    fn text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl From<&TiledObject> for MapObject {
    fn from(obj: &TiledObject) -> Self {
        MapObject {
            name: obj.name.clone(),
            x: obj.x,
            y: obj.y,
            properties: obj.properties.iter().map(|p| (p.name.clone(), p.text())).collect(),
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Runtime map
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct TileLayer {
    pub plan: LayerPlan,
    /// Row-major, flags stripped; 0 = empty.
    pub gids: Vec<u32>,
    pub visible: bool,
}

#[derive(Clone, Debug)]
pub struct TilesetRef {
    pub name: String,
    pub first_gid: u32,
    /// Resolved against the map file's directory.
    pub image: Option<PathBuf>,
    pub columns: u32,
    pub tile_count: u32,
    pub tile_w: u32,
    pub tile_h: u32,
}

#[derive(Clone, Debug)]
pub struct TileMap {
    pub width: usize,
    pub height: usize,
    pub tile_w: f32,
    pub tile_h: f32,
    /// Drawing order: ascending depth.
    pub layers: Vec<TileLayer>,
    pub tilesets: Vec<TilesetRef>,
}

impl TileMap {
    pub fn layer(&self, name: &str) -> Option<&TileLayer> {
        self.layers.iter().find(|l| l.plan.name == name)
    }

    #[inline]
    pub fn gid_at(&self, layer: &TileLayer, x: usize, y: usize) -> u32 {
        if x < self.width && y < self.height {
            layer.gids[y * self.width + x]
        } else {
            0
        }
    }

    /// Cell containing a pixel position.
    pub fn cell_of(&self, pos: Vec2) -> (usize, usize) {
        let cx = (pos.x / self.tile_w).floor().max(0.0) as usize;
        let cy = (pos.y / self.tile_h).floor().max(0.0) as usize;
        (cx.min(self.width.saturating_sub(1)), cy.min(self.height.saturating_sub(1)))
    }
}

/// Everything the session needs from the map file.
#[derive(Clone, Debug)]
pub struct LoadedMap {
    pub map: TileMap,
    pub collision: CollisionGrid,
    pub pois: PoiRegistry,
    pub spawn: Vec2,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Read, parse and build the configured map.
pub fn load_map(assets: &AssetConfig) -> LoadResult<LoadedMap> {
    let path = &assets.map;
    let text = std::fs::read_to_string(path)
        .map_err(|source| LoadError::Io { path: path.clone(), source })?;
    let tiled = parse_map(&text, path)?;
    let base_dir = path.parent().unwrap_or(Path::new("."));
    build(tiled, base_dir, &assets.object_layer, &assets.spawn_name)
}

pub fn parse_map(text: &str, origin: &Path) -> LoadResult<TiledMap> {
    serde_json::from_str(text)
        .map_err(|source| LoadError::MapFormat { path: origin.to_path_buf(), source })
}

/// Classify layers, wire collision, extract POIs and spawn.
pub fn build(tiled: TiledMap, base_dir: &Path, object_layer: &str, spawn_name: &str) -> LoadResult<LoadedMap> {
    let (width, height) = (tiled.width, tiled.height);
    let cells = width * height;

    let mut flat = Vec::new();
    flatten(tiled.layers, &mut flat);

    let mut layers = Vec::new();
    let mut objects: Option<Vec<MapObject>> = None;

    for l in flat {
        match l {
            TiledLayer::TileLayer(t) => {
                if t.data.len() != cells {
                    return Err(LoadError::LayerSize {
                        layer: t.name,
                        expected: cells,
                        actual: t.data.len(),
                    });
                }
                let plan = LayerPlan::for_name(&t.name);
                tracing::debug!(layer = %t.name, kind = ?plan.kind, depth = plan.depth, "classified layer");
                layers.push(TileLayer {
                    plan,
                    gids: t.data.into_iter().map(|g| g & GID_MASK).collect(),
                    visible: t.visible,
                });
            }
            TiledLayer::ObjectGroup(g) if g.name == object_layer && objects.is_none() => {
                objects = Some(g.objects.iter().map(MapObject::from).collect());
            }
            _ => {}
        }
    }

    // Stable: equal depths keep map order.
    layers.sort_by(|a, b| a.plan.depth.total_cmp(&b.plan.depth));

    let map = TileMap {
        width,
        height,
        tile_w: tiled.tilewidth as f32,
        tile_h: tiled.tileheight as f32,
        layers,
        tilesets: tiled.tilesets.into_iter().map(|ts| TilesetRef {
            image: ts.image.as_ref().map(|img| base_dir.join(img)),
            name: ts.name,
            first_gid: ts.firstgid,
            columns: ts.columns,
            tile_count: ts.tilecount,
            tile_w: ts.tilewidth,
            tile_h: ts.tileheight,
        }).collect(),
    };

    let collision = build_collision(&map);

    let objects = objects.ok_or_else(|| LoadError::MissingObjectLayer(object_layer.to_string()))?;
    let extraction = poi::extract(&objects, spawn_name);
    let spawn = extraction.spawn
        .ok_or_else(|| LoadError::MissingSpawn(spawn_name.to_string()))?;
    if extraction.registry.is_empty() {
        tracing::warn!(layer = object_layer, "object layer has no points of interest");
    }

    tracing::info!(
        width, height,
        layers = map.layers.len(),
        solid_cells = collision.solid_count(),
        pois = extraction.registry.len(),
        "map built"
    );

    Ok(LoadedMap { map, collision, pois: extraction.registry, spawn })
}

// ══════════════════════════════════════════════════════════════
// Internal
// ══════════════════════════════════════════════════════════════

fn flatten(layers: Vec<TiledLayer>, out: &mut Vec<TiledLayer>) {
    for l in layers {
        match l {
            TiledLayer::Group(g) => flatten(g.layers, out),
            other => out.push(other),
        }
    }
}

/// Register each named colliding layer by lookup. Absent names are skipped.
fn build_collision(map: &TileMap) -> CollisionGrid {
    let mut grid = CollisionGrid::new(map.width, map.height, map.tile_w, map.tile_h);
    for name in layer::colliding_layer_names() {
        match map.layer(name) {
            Some(l) => {
                let added = grid.add_layer(&l.gids);
                tracing::debug!(layer = name, added, "collision registered");
            }
            None => tracing::debug!(layer = name, "layer not in map, collision skipped"),
        }
    }
    grid
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::layer::{LayerKind, ABOVE_SPRITES};
    use crate::domain::poi::DEFAULT_DESCRIPTION;

    /// 4×3 map, 16px tiles. Water in the top-right cell, a lamp base at
    /// (1,2) with its upper part at (1,1).
    pub(crate) const SMALL_MAP: &str = r#"{
        "width": 4, "height": 3, "tilewidth": 16, "tileheight": 16,
        "layers": [
            {"type": "tilelayer", "name": "ground", "data": [1,1,1,1, 1,1,1,1, 1,1,1,1]},
            {"type": "group", "name": "street", "layers": [
                {"type": "tilelayer", "name": "lamps_upper", "data": [0,0,0,0, 0,12,0,0, 0,0,0,0]},
                {"type": "tilelayer", "name": "lamps", "data": [0,0,0,0, 0,0,0,0, 0,11,0,0]}
            ]},
            {"type": "tilelayer", "name": "water", "data": [0,0,0,2147483651, 0,0,0,0, 0,0,0,0]},
            {"type": "imagelayer", "name": "sky"},
            {"type": "objectgroup", "name": "Objects", "objects": [
                {"name": "Spawn Point", "x": 8, "y": 40},
                {"name": "Fontana", "x": 40, "y": 24},
                {"name": "hall", "x": 56, "y": 8, "properties": [
                    {"name": "title", "type": "string", "value": "Town Hall"},
                    {"name": "text", "type": "string", "value": "Sandstone."},
                    {"name": "media", "type": "string", "value": "images/hall.png"}
                ]}
            ]}
        ],
        "tilesets": [{"firstgid": 1, "name": "town", "image": "../tiles.png",
                      "columns": 8, "tilecount": 16, "tilewidth": 16, "tileheight": 16}]
    }"#;

    pub(crate) fn small_map() -> LoadedMap {
        let tiled = parse_map(SMALL_MAP, Path::new("small.json")).unwrap();
        build(tiled, Path::new("maps"), "Objects", "Spawn Point").unwrap()
    }

    #[test]
    fn builds_layers_sorted_by_depth() {
        let m = small_map();
        let names: Vec<_> = m.map.layers.iter().map(|l| l.plan.name.as_str()).collect();
        assert_eq!(names, ["ground", "water", "lamps", "lamps_upper"]);
        let upper = m.map.layer("lamps_upper").unwrap();
        assert_eq!(upper.plan.kind, LayerKind::ForegroundOverlay);
        assert_eq!(upper.plan.depth, ABOVE_SPRITES);
    }

    #[test]
    fn flip_flags_are_stripped() {
        let m = small_map();
        let water = m.map.layer("water").unwrap();
        assert_eq!(m.map.gid_at(water, 3, 0), 3);
    }

    #[test]
    fn collision_from_scenery_and_furniture_only() {
        let m = small_map();
        assert!(m.collision.is_solid(3, 0)); // water
        assert!(m.collision.is_solid(1, 2)); // lamp base
        assert!(!m.collision.is_solid(1, 1)); // upper lamp part
        assert!(!m.collision.is_solid(0, 0)); // ground
        assert_eq!(m.collision.solid_count(), 2);
    }

    #[test]
    fn pois_and_spawn_extracted() {
        let m = small_map();
        assert_eq!(m.spawn, Vec2::new(8.0, 40.0));
        assert_eq!(m.pois.len(), 2);
        let fontana = m.pois.get(0).unwrap();
        assert_eq!(fontana.title, "Fontana");
        assert_eq!(fontana.description, DEFAULT_DESCRIPTION);
        assert!(fontana.image.is_none());
        assert_eq!(m.pois.get(1).unwrap().title, "Town Hall");
    }

    #[test]
    fn tileset_image_resolves_against_map_dir() {
        let m = small_map();
        let ts = &m.map.tilesets[0];
        assert_eq!(ts.image.as_deref(), Some(Path::new("maps/../tiles.png")));
        assert_eq!(ts.first_gid, 1);
    }

    #[test]
    fn missing_spawn_is_fatal() {
        let text = SMALL_MAP.replace("Spawn Point", "Start");
        let tiled = parse_map(&text, Path::new("x.json")).unwrap();
        let err = build(tiled, Path::new("."), "Objects", "Spawn Point").unwrap_err();
        assert!(matches!(err, LoadError::MissingSpawn(ref n) if n == "Spawn Point"));
    }

    #[test]
    fn missing_object_layer_is_fatal() {
        let tiled = parse_map(SMALL_MAP, Path::new("x.json")).unwrap();
        let err = build(tiled, Path::new("."), "Markers", "Spawn Point").unwrap_err();
        assert!(matches!(err, LoadError::MissingObjectLayer(_)));
    }

    #[test]
    fn wrong_layer_size_is_fatal() {
        let text = SMALL_MAP.replace("[1,1,1,1, 1,1,1,1, 1,1,1,1]", "[1,1,1]");
        let tiled = parse_map(&text, Path::new("x.json")).unwrap();
        let err = build(tiled, Path::new("."), "Objects", "Spawn Point").unwrap_err();
        assert!(matches!(err, LoadError::LayerSize { expected: 12, actual: 3, .. }));
    }

    #[test]
    fn malformed_json_is_fatal() {
        let err = parse_map("{ not json", Path::new("broken.json")).unwrap_err();
        assert!(matches!(err, LoadError::MapFormat { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn cell_of_clamps() {
        let m = small_map();
        assert_eq!(m.map.cell_of(Vec2::new(17.0, 33.0)), (1, 2));
        assert_eq!(m.map.cell_of(Vec2::new(-5.0, 999.0)), (0, 2));
    }

    #[test]
    fn shipped_map_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/maps/plaza.json");
        let assets = AssetConfig {
            map: path,
            sprite_sheet: PathBuf::from("assets/player.png"),
            asset_root: "assets/".into(),
            base_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
            object_layer: "Objects".into(),
            spawn_name: "Spawn Point".into(),
        };
        let m = load_map(&assets).unwrap();
        assert_eq!((m.map.width, m.map.height), (40, 30));
        assert_eq!(m.pois.len(), 4);
        assert!(m.pois.iter().any(|p| p.title == "Fontana" && p.image.is_none()));
        let (sx, sy) = m.map.cell_of(m.spawn);
        assert!(!m.collision.is_solid(sx as i64, sy as i64));
    }
}
