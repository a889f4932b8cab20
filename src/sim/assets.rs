/// Image assets: tileset colours and the player sprite sheet.
///
/// The terminal draws one cell per map tile, so each tile image is
/// reduced to the average colour of its opaque pixels. A fully
/// transparent tile has no colour and lets lower layers show through.
///
/// The sprite sheet is a 3×4 frame grid (rows: down, left, right, up),
/// reduced the same way to one colour per frame.

use std::path::Path;

use image::RgbaImage;

use crate::domain::entity::FRAMES_PER_ROW;
use crate::error::{LoadError, LoadResult};
use super::map::{TileMap, TilesetRef};

pub type Rgb = (u8, u8, u8);

const SHEET_ROWS: u32 = 4;
/// Pixels with less alpha than this are ignored when averaging.
const ALPHA_CUTOFF: u8 = 128;

#[derive(Clone, Debug)]
struct TilesetColours {
    first_gid: u32,
    colours: Vec<Option<Rgb>>,
}

/// gid → colour lookup over every tileset of a map.
#[derive(Clone, Debug, Default)]
pub struct TilePalette {
    /// Sorted by `first_gid`.
    sets: Vec<TilesetColours>,
}

impl TilePalette {
    pub fn colour(&self, gid: u32) -> Option<Rgb> {
        if gid == 0 { return None; }
        let set = self.sets.iter().rev().find(|s| s.first_gid <= gid)?;
        set.colours.get((gid - set.first_gid) as usize).copied().flatten()
    }
}

#[derive(Clone, Debug)]
pub struct SpriteSheet {
    pub frame_w: u32,
    pub frame_h: u32,
    /// Row-major, `FRAMES_PER_ROW * 4` entries.
    frames: Vec<Rgb>,
}

impl SpriteSheet {
    pub fn frame_colour(&self, index: usize) -> Rgb {
        self.frames.get(index).copied().unwrap_or((255, 255, 255))
    }
}

#[derive(Clone, Debug)]
pub struct Assets {
    pub palette: TilePalette,
    pub sprite: SpriteSheet,
}

// ══════════════════════════════════════════════════════════════
// Loading
// ══════════════════════════════════════════════════════════════

/// Decode every tileset image referenced by `map` and the sprite sheet.
pub fn load_assets(map: &TileMap, sprite_path: &Path) -> LoadResult<Assets> {
    let mut sets = map.tilesets.iter().map(load_tileset).collect::<LoadResult<Vec<_>>>()?;
    sets.sort_by_key(|s| s.first_gid);

    let img = open_rgba(sprite_path)?;
    let sprite = slice_sheet(&img, sprite_path)?;

    tracing::info!(
        tilesets = sets.len(),
        frame_w = sprite.frame_w,
        frame_h = sprite.frame_h,
        "assets decoded"
    );
    Ok(Assets { palette: TilePalette { sets }, sprite })
}

fn load_tileset(ts: &TilesetRef) -> LoadResult<TilesetColours> {
    let path = ts.image.as_deref().ok_or_else(|| LoadError::TilesetImage(ts.name.clone()))?;
    let img = open_rgba(path)?;
    let (tw, th) = (ts.tile_w.max(1), ts.tile_h.max(1));
    let columns = if ts.columns > 0 { ts.columns } else { img.width() / tw };
    let count = if ts.tile_count > 0 { ts.tile_count } else { columns * (img.height() / th) };
    tracing::debug!(tileset = %ts.name, columns, count, "tileset sliced");
    Ok(TilesetColours {
        first_gid: ts.first_gid,
        colours: tile_colours(&img, tw, th, columns, count),
    })
}

/// Size and average colour of a standalone picture (POI media).
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ImageSummary {
    pub width: u32,
    pub height: u32,
    pub colour: Option<Rgb>,
}

pub fn image_summary(path: &Path) -> LoadResult<ImageSummary> {
    let img = open_rgba(path)?;
    let (width, height) = img.dimensions();
    Ok(ImageSummary { width, height, colour: block_colour(&img, 0, 0, width, height) })
}

fn open_rgba(path: &Path) -> LoadResult<RgbaImage> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| LoadError::Image { path: path.to_path_buf(), source })
}

// ══════════════════════════════════════════════════════════════
// Reduction
// ══════════════════════════════════════════════════════════════

/// Average opaque colour of the `w`×`h` block at `(x0, y0)`, clipped to the image.
fn block_colour(img: &RgbaImage, x0: u32, y0: u32, w: u32, h: u32) -> Option<Rgb> {
    let (mut r, mut g, mut b, mut n) = (0u64, 0u64, 0u64, 0u64);
    for y in y0..(y0 + h).min(img.height()) {
        for x in x0..(x0 + w).min(img.width()) {
            let [pr, pg, pb, pa] = img.get_pixel(x, y).0;
            if pa >= ALPHA_CUTOFF {
                r += pr as u64;
                g += pg as u64;
                b += pb as u64;
                n += 1;
            }
        }
    }
    if n == 0 { return None; }
    Some(((r / n) as u8, (g / n) as u8, (b / n) as u8))
}

fn tile_colours(img: &RgbaImage, tw: u32, th: u32, columns: u32, count: u32) -> Vec<Option<Rgb>> {
    let columns = columns.max(1);
    (0..count)
        .map(|i| block_colour(img, (i % columns) * tw, (i / columns) * th, tw, th))
        .collect()
}

pub fn slice_sheet(img: &RgbaImage, path: &Path) -> LoadResult<SpriteSheet> {
    let cols = FRAMES_PER_ROW as u32;
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || w % cols != 0 || h % SHEET_ROWS != 0 {
        return Err(LoadError::SpriteGrid { path: path.to_path_buf(), width: w, height: h });
    }
    let (fw, fh) = (w / cols, h / SHEET_ROWS);
    let frames = (0..cols * SHEET_ROWS)
        .map(|i| block_colour(img, (i % cols) * fw, (i / cols) * fh, fw, fh).unwrap_or((255, 255, 255)))
        .collect();
    Ok(SpriteSheet { frame_w: fw, frame_h: fh, frames })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::path::PathBuf;

    fn two_tile_strip() -> RgbaImage {
        // 4×2: left tile red, right tile half blue, half transparent.
        let mut img = RgbaImage::new(4, 2);
        for y in 0..2 {
            for x in 0..2 {
                img.put_pixel(x, y, Rgba([200, 0, 0, 255]));
            }
            img.put_pixel(2, y, Rgba([0, 0, 100, 255]));
            img.put_pixel(3, y, Rgba([255, 255, 255, 0]));
        }
        img
    }

    #[test]
    fn averages_only_opaque_pixels() {
        let img = two_tile_strip();
        let colours = tile_colours(&img, 2, 2, 2, 2);
        assert_eq!(colours, vec![Some((200, 0, 0)), Some((0, 0, 100))]);
    }

    #[test]
    fn transparent_tile_has_no_colour() {
        let img = RgbaImage::new(2, 2);
        assert_eq!(tile_colours(&img, 2, 2, 1, 1), vec![None]);
    }

    #[test]
    fn palette_picks_owning_tileset() {
        let palette = TilePalette {
            sets: vec![
                TilesetColours { first_gid: 1, colours: vec![Some((1, 1, 1)), Some((2, 2, 2))] },
                TilesetColours { first_gid: 3, colours: vec![Some((9, 9, 9)), None] },
            ],
        };
        assert_eq!(palette.colour(0), None);
        assert_eq!(palette.colour(2), Some((2, 2, 2)));
        assert_eq!(palette.colour(3), Some((9, 9, 9)));
        assert_eq!(palette.colour(4), None);
        assert_eq!(palette.colour(99), None);
    }

    #[test]
    fn sheet_splits_into_twelve_frames() {
        let mut img = RgbaImage::new(6, 8);
        // Frame 4 (row 1 "left", column 1) painted green.
        for y in 2..4 {
            for x in 2..4 {
                img.put_pixel(x, y, Rgba([0, 255, 0, 255]));
            }
        }
        let sheet = slice_sheet(&img, Path::new("p.png")).unwrap();
        assert_eq!((sheet.frame_w, sheet.frame_h), (2, 2));
        assert_eq!(sheet.frame_colour(4), (0, 255, 0));
        assert_eq!(sheet.frame_colour(0), (255, 255, 255));
    }

    #[test]
    fn uneven_sheet_is_rejected() {
        let img = RgbaImage::new(50, 64);
        let err = slice_sheet(&img, Path::new("hero.png")).unwrap_err();
        assert!(matches!(err, LoadError::SpriteGrid { width: 50, height: 64, .. }));
    }

    #[test]
    fn missing_image_is_fatal() {
        let err = open_rgba(Path::new("/nonexistent/tiles.png")).unwrap_err();
        assert!(matches!(err, LoadError::Image { .. }));
    }

    #[test]
    fn summary_of_shipped_picture() {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let s = image_summary(&root.join("assets/images/townhall.png")).unwrap();
        assert!(s.width > 0 && s.height > 0);
        assert!(s.colour.is_some());
    }

    #[test]
    fn shipped_assets_decode() {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let loaded = crate::sim::map::tests::small_map();
        let mut map = loaded.map;
        map.tilesets[0].image = Some(root.join("assets/tiles.png"));
        let assets = load_assets(&map, &root.join("assets/player.png")).unwrap();
        assert!(assets.palette.colour(1).is_some());
        assert_eq!((assets.sprite.frame_w, assets.sprite.frame_h), (16, 16));
    }
}
