/// Overlay content: what the info panel shows for one POI.
///
/// Built when the overlay opens. Image paths from map data are
/// normalized onto the asset root, and a missing or broken image
/// degrades to a note in the panel instead of failing the session.

use std::path::{Path, PathBuf};

use crate::domain::poi::PointOfInterest;
use crate::sim::assets::{self, ImageSummary};

#[derive(Clone, Debug, PartialEq)]
pub enum ImagePreview {
    Ready { path: String, summary: ImageSummary },
    Unavailable { path: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayView {
    pub poi: usize,
    pub title: String,
    pub description: String,
    /// None when the POI has no image: the panel shows text only.
    pub image: Option<ImagePreview>,
}

impl OverlayView {
    /// `base_dir` is where normalized asset paths are resolved from.
    pub fn from_poi(idx: usize, poi: &PointOfInterest, asset_root: &str, base_dir: &Path) -> Self {
        let image = poi.image.as_deref().map(|raw| {
            let path = normalize_image_path(raw, asset_root);
            let full: PathBuf = base_dir.join(&path);
            match assets::image_summary(&full) {
                Ok(summary) => ImagePreview::Ready { path, summary },
                Err(e) => {
                    tracing::warn!(poi = %poi.title, "overlay image unavailable: {e}");
                    ImagePreview::Unavailable { path }
                }
            }
        });
        OverlayView {
            poi: idx,
            title: poi.title.clone(),
            description: poi.description.clone(),
            image,
        }
    }
}

/// Prefix `raw` with `asset_root` unless it already starts with it.
///
/// Idempotent: normalizing an already-normalized path returns it unchanged.
/// Leading `./` and `/` are dropped first.
pub fn normalize_image_path(raw: &str, asset_root: &str) -> String {
    let mut path = raw.trim();
    loop {
        if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix('/') {
            path = rest;
        } else {
            break;
        }
    }

    let root = asset_root
        .trim_start_matches("./")
        .trim_start_matches('/')
        .trim_end_matches('/');
    // Component-wise: `assets2/x.png` is not under `assets`.
    if root.is_empty() || Path::new(path).starts_with(root) {
        return path.to_string();
    }
    format!("{root}/{path}")
}

/// Greedy word wrap. Explicit newlines are kept; words longer than
/// `width` are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for para in text.lines() {
        let mut line = String::new();
        let mut len = 0;
        for word in para.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();
            loop {
                let wlen = chars.len();
                let sep = if len == 0 { 0 } else { 1 };
                if len + sep + wlen <= width {
                    if sep == 1 { line.push(' '); }
                    line.extend(chars.iter());
                    len += sep + wlen;
                    break;
                }
                if len > 0 {
                    lines.push(std::mem::take(&mut line));
                    len = 0;
                    continue;
                }
                // Word alone is too long: hard split.
                let rest = chars.split_off(width);
                lines.push(chars.iter().collect());
                chars = rest;
            }
        }
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
