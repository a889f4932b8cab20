/// Proximity detection: which POI, if any, is "current" this tick.
///
/// Pure function of player position and registry; no state carries
/// over between ticks.

use serde::Deserialize;

use super::entity::Vec2;
use super::poi::PoiRegistry;

/// Interaction radius in map pixels. A POI qualifies only when the
/// distance is strictly less than this.
pub const DEFAULT_RADIUS: f32 = 40.0;

/// How to choose among several qualifying POIs.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// First qualifying POI in registry order, even if a later one is closer.
    #[default]
    First,
    /// Strictly nearest; equal distances go to the earlier POI.
    Nearest,
}

/// Index of the current POI, or None when nothing is within `radius`.
pub fn detect(player: Vec2, registry: &PoiRegistry, radius: f32, tie: TieBreak) -> Option<usize> {
    let mut in_range = registry
        .iter()
        .enumerate()
        .map(|(i, p)| (i, player.distance(p.pos())))
        .filter(|&(_, d)| d < radius);

    match tie {
        TieBreak::First => in_range.next().map(|(i, _)| i),
        TieBreak::Nearest => in_range
            .fold(None, |best: Option<(usize, f32)>, (i, d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((i, d)),
            })
            .map(|(i, _)| i),
    }
}
