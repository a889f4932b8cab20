/// Points of interest and their load-time extraction.
///
/// The registry is built once from the map's object layer and frozen.
/// Clones share the same backing slice; nothing mutates it after load.

use std::collections::HashMap;
use std::sync::Arc;

use super::entity::Vec2;

pub const PROP_TITLE: &str = "title";
pub const PROP_TEXT: &str = "text";
pub const PROP_MEDIA: &str = "media";

pub const DEFAULT_DESCRIPTION: &str = "No description available.";

#[derive(Clone, Debug, PartialEq)]
pub struct PointOfInterest {
    pub x: f32,
    pub y: f32,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
}

impl PointOfInterest {
    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// A map object as read from the object layer, format-neutral.
#[derive(Clone, Debug, Default)]
pub struct MapObject {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub properties: HashMap<String, String>,
}

impl MapObject {
    /// Non-blank custom property value.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }
}

#[derive(Clone, Debug, Default)]
pub struct PoiRegistry {
    pois: Arc<[PointOfInterest]>,
}

impl PoiRegistry {
    pub fn new(pois: Vec<PointOfInterest>) -> Self {
        PoiRegistry { pois: pois.into() }
    }

    pub fn get(&self, idx: usize) -> Option<&PointOfInterest> {
        self.pois.get(idx)
    }

    pub fn len(&self) -> usize {
        self.pois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pois.is_empty()
    }

    /// Registry order is object-layer order.
    pub fn iter(&self) -> impl Iterator<Item = &PointOfInterest> {
        self.pois.iter()
    }
}

/// Result of scanning the object layer.
#[derive(Clone, Debug)]
pub struct Extraction {
    pub registry: PoiRegistry,
    /// Position of the first spawn marker, if the layer has one.
    pub spawn: Option<Vec2>,
}

/// Split objects into the spawn marker and POIs.
///
/// Every object named `spawn_name` is withheld from the registry; the
/// first one seeds the spawn. Titles fall back to the object name,
/// descriptions to [`DEFAULT_DESCRIPTION`], images to none.
pub fn extract(objects: &[MapObject], spawn_name: &str) -> Extraction {
    let mut spawn = None;
    let mut pois = Vec::with_capacity(objects.len());

    for obj in objects {
        if obj.name == spawn_name {
            if spawn.is_none() {
                spawn = Some(Vec2::new(obj.x, obj.y));
            }
            continue;
        }
        pois.push(PointOfInterest {
            x: obj.x,
            y: obj.y,
            title: obj.property(PROP_TITLE).unwrap_or(obj.name.as_str()).to_string(),
            description: obj
                .property(PROP_TEXT)
                .unwrap_or(DEFAULT_DESCRIPTION)
                .to_string(),
            image: obj.property(PROP_MEDIA).map(str::to_string),
        });
    }

    Extraction { registry: PoiRegistry::new(pois), spawn }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(name: &str, x: f32, y: f32, props: &[(&str, &str)]) -> MapObject {
        MapObject {
            name: name.to_string(),
            x,
            y,
            properties: props
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn spawn_is_not_a_poi() {
        let objects = [
            obj("Spawn Point", 10.0, 20.0, &[]),
            obj("Fontana", 50.0, 60.0, &[]),
        ];
        let ex = extract(&objects, "Spawn Point");
        assert_eq!(ex.spawn, Some(Vec2::new(10.0, 20.0)));
        assert_eq!(ex.registry.len(), 1);
        assert_eq!(ex.registry.get(0).unwrap().title, "Fontana");
    }

    #[test]
    fn missing_properties_fall_back() {
        let ex = extract(&[obj("Fontana", 1.0, 2.0, &[])], "Spawn Point");
        let p = ex.registry.get(0).unwrap();
        assert_eq!(p.title, "Fontana");
        assert_eq!(p.description, DEFAULT_DESCRIPTION);
        assert_eq!(p.image, None);
        assert_eq!(ex.spawn, None);
    }

    #[test]
    fn properties_override_defaults() {
        let ex = extract(
            &[obj("hall", 0.0, 0.0, &[
                ("title", "Town Hall"),
                ("text", "Sandstone."),
                ("media", "images/hall.png"),
            ])],
            "Spawn Point",
        );
        let p = ex.registry.get(0).unwrap();
        assert_eq!(p.title, "Town Hall");
        assert_eq!(p.description, "Sandstone.");
        assert_eq!(p.image.as_deref(), Some("images/hall.png"));
    }

    #[test]
    fn blank_properties_count_as_absent() {
        let ex = extract(
            &[obj("kiosk", 0.0, 0.0, &[("title", "  "), ("text", ""), ("media", "")])],
            "Spawn Point",
        );
        let p = ex.registry.get(0).unwrap();
        assert_eq!(p.title, "kiosk");
        assert_eq!(p.description, DEFAULT_DESCRIPTION);
        assert!(p.image.is_none());
    }

    #[test]
    fn first_spawn_wins_and_duplicates_are_dropped() {
        let objects = [
            obj("a", 0.0, 0.0, &[]),
            obj("Spawn Point", 1.0, 1.0, &[]),
            obj("Spawn Point", 9.0, 9.0, &[]),
            obj("b", 0.0, 0.0, &[]),
        ];
        let ex = extract(&objects, "Spawn Point");
        assert_eq!(ex.spawn, Some(Vec2::new(1.0, 1.0)));
        let titles: Vec<_> = ex.registry.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["a", "b"]);
    }

    #[test]
    fn clones_share_storage() {
        let ex = extract(&[obj("a", 0.0, 0.0, &[])], "Spawn Point");
        let other = ex.registry.clone();
        assert!(std::ptr::eq(
            ex.registry.get(0).unwrap(),
            other.get(0).unwrap(),
        ));
    }
}
