//! Distance-band classification with an optional hysteresis dead-zone.

use tessera_config::LodConfig;

/// Detail level of a tracked object, ordered from finest to coarsest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DetailLevel {
    High,
    Medium,
    Low,
    Culled,
}

impl DetailLevel {
    pub fn is_reduced(self) -> bool {
        matches!(self, DetailLevel::Medium | DetailLevel::Low)
    }
}

/// Band boundaries in world units.
///
/// `distance > culling` is culled, `> medium` is low, `> high` is medium,
/// anything nearer is high.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    pub high: f32,
    pub medium: f32,
    pub culling: f32,
    /// Fractional dead-zone applied around each boundary. 0 disables it.
    pub hysteresis: f32,
}

impl Thresholds {
    pub fn from_config(config: &LodConfig) -> Self {
        Self {
            high: config.high_detail_threshold,
            medium: config.medium_detail_threshold,
            culling: config.culling_distance,
            hysteresis: config.hysteresis,
        }
    }

    /// Select the band for `distance`.
    ///
    /// With hysteresis, an object already at or beyond a boundary's coarser
    /// level must come `hysteresis` nearer than the boundary to become finer,
    /// and an object on the finer side must go `hysteresis` further to become
    /// coarser. Without a previous level the raw boundaries apply.
    pub fn classify(&self, distance: f32, previous: Option<DetailLevel>) -> DetailLevel {
        let h = self.hysteresis;
        let edge = |boundary: f32, coarser: DetailLevel| match previous {
            Some(p) if h > 0.0 && p >= coarser => boundary * (1.0 - h),
            Some(_) if h > 0.0 => boundary * (1.0 + h),
            _ => boundary,
        };

        if distance > edge(self.culling, DetailLevel::Culled) {
            DetailLevel::Culled
        } else if distance > edge(self.medium, DetailLevel::Low) {
            DetailLevel::Low
        } else if distance > edge(self.high, DetailLevel::Medium) {
            DetailLevel::Medium
        } else {
            DetailLevel::High
        }
    }
}

/// `distance / culling`, clamped to `[0, 1]`. A zero culling distance
/// treats everything as maximally distant.
pub fn distance_ratio(distance: f32, culling: f32) -> f32 {
    if culling <= 0.0 || distance.is_nan() {
        return 1.0;
    }
    (distance / culling).clamp(0.0, 1.0)
}
