/// Load-time errors. Every variant is fatal: the session never starts.
///
/// Non-fatal conditions (missing optional POI properties, absent named
/// layers, unreadable config) are defaulted at the call site and logged,
/// never surfaced as errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a valid Tiled JSON map: {source}", .path.display())]
    MapFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("tile layer `{layer}` has {actual} cells, expected {expected}")]
    LayerSize {
        layer: String,
        expected: usize,
        actual: usize,
    },

    #[error("map has no object layer named `{0}`")]
    MissingObjectLayer(String),

    #[error("no `{0}` object on the object layer; the player has nowhere to start")]
    MissingSpawn(String),

    #[error("could not decode image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("sprite sheet {} is {width}x{height}, which does not split into a 3x4 frame grid", .path.display())]
    SpriteGrid {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    #[error("tileset `{0}` has no image")]
    TilesetImage(String),
}

pub type LoadResult<T> = Result<T, LoadError>;
