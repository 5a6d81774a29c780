//! Geometry of the mining field: where helpers may stand.

use mine_core::PlacedHelper;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned rectangle, inclusive on every edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.x0..=self.x1).contains(&x) && (self.y0..=self.y1).contains(&y)
    }
}

/// Why a position was refused.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Rejection {
    OutOfBounds,
    MiningArea,
    TooClose { other: u64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::OutOfBounds => f.write_str("outside the field"),
            Rejection::MiningArea => f.write_str("inside the mining area"),
            Rejection::TooClose { other } => write!(f, "too close to helper {other}"),
        }
    }
}

/// Field dimensions and spacing constraints for placed helpers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementRules {
    pub width: f64,
    pub height: f64,
    /// Distance helpers keep from the field edges.
    pub margin: f64,
    /// Reserved central rock; nothing may stand here.
    pub mining_area: Rect,
    /// Minimum distance between two placed helpers.
    pub clearance: f64,
    /// Anchor of the automatic placement grid (bottom-left).
    pub cluster_x: f64,
    pub cluster_y: f64,
    pub cluster_spacing: f64,
}

impl Default for PlacementRules {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 640.0,
            margin: 24.0,
            mining_area: Rect {
                x0: 380.0,
                y0: 220.0,
                x1: 580.0,
                y1: 420.0,
            },
            clearance: 48.0,
            cluster_x: 60.0,
            cluster_y: 580.0,
            cluster_spacing: 48.0,
        }
    }
}

impl PlacementRules {
    fn in_bounds(&self, x: f64, y: f64) -> bool {
        x.is_finite()
            && y.is_finite()
            && (self.margin..=self.width - self.margin).contains(&x)
            && (self.margin..=self.height - self.margin).contains(&y)
    }

    /// Check a candidate position against the field, the mining area and
    /// every already placed helper.
    pub fn check(&self, placed: &[PlacedHelper], x: f64, y: f64) -> Result<(), Rejection> {
        if !self.in_bounds(x, y) {
            return Err(Rejection::OutOfBounds);
        }
        if self.mining_area.contains(x, y) {
            return Err(Rejection::MiningArea);
        }
        if let Some(other) = placed
            .iter()
            .find(|h| (h.x - x).hypot(h.y - y) < self.clearance)
        {
            return Err(Rejection::TooClose { other: other.id });
        }
        Ok(())
    }

    /// First free spot of the automatic grid, walking right then upwards from
    /// the cluster anchor. When the grid is full the anchor itself is used.
    pub fn fallback_position(&self, placed: &[PlacedHelper]) -> (f64, f64) {
        let step = self.cluster_spacing.max(1.0);
        let mut y = self.cluster_y;
        while y >= self.margin {
            let mut x = self.cluster_x;
            while x <= self.width - self.margin {
                if self.check(placed, x, y).is_ok() {
                    return (x, y);
                }
                x += step;
            }
            y -= step;
        }
        (self.cluster_x, self.cluster_y)
    }

    /// Random in-bounds candidate. It may still be rejected by
    /// [`PlacementRules::check`]; callers draw again.
    pub fn suggest_position<R: Rng>(&self, rng: &mut R) -> (f64, f64) {
        let x = rng.gen_range(self.margin..=self.width - self.margin);
        let y = rng.gen_range(self.margin..=self.height - self.margin);
        (x.round(), y.round())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mine_core::{EarthHelper, HelperId};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn at(id: u64, x: f64, y: f64) -> PlacedHelper {
        PlacedHelper {
            kind: HelperId::Earth(EarthHelper::Miner),
            x,
            y,
            id,
            is_producing: true,
        }
    }

    #[test]
    fn rejects_edges_rock_and_neighbours() {
        let rules = PlacementRules::default();
        let placed = vec![at(7, 100.0, 100.0)];
        assert_eq!(rules.check(&placed, 5.0, 100.0), Err(Rejection::OutOfBounds));
        assert_eq!(rules.check(&placed, 480.0, 320.0), Err(Rejection::MiningArea));
        assert_eq!(
            rules.check(&placed, 120.0, 110.0),
            Err(Rejection::TooClose { other: 7 })
        );
        assert_eq!(rules.check(&placed, 148.0, 100.0), Ok(()));
        assert_eq!(rules.check(&placed, f64::NAN, 100.0), Err(Rejection::OutOfBounds));
    }

    #[test]
    fn fallback_walks_the_grid() {
        let rules = PlacementRules::default();
        let first = rules.fallback_position(&[]);
        assert_eq!(first, (60.0, 580.0));
        let second = rules.fallback_position(&[at(1, first.0, first.1)]);
        assert_eq!(second, (108.0, 580.0));
        assert!(rules.check(&[at(1, first.0, first.1)], second.0, second.1).is_ok());
    }

    #[test]
    fn fallback_is_deterministic() {
        let rules = PlacementRules::default();
        let placed = vec![at(1, 60.0, 580.0), at(2, 300.0, 300.0)];
        assert_eq!(rules.fallback_position(&placed), rules.fallback_position(&placed));
    }

    #[test]
    fn suggestions_stay_in_bounds() {
        let rules = PlacementRules::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..200 {
            let (x, y) = rules.suggest_position(&mut rng);
            assert!(rules.in_bounds(x, y));
        }
    }
}
