//! Aggregate LOD statistics, derived entirely from the tracked-object set.

/// Published snapshot of what the engine is doing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LodStatistics {
    pub total_objects: usize,
    pub high_detail: usize,
    pub medium_detail: usize,
    pub low_detail: usize,
    pub culled: usize,
    /// Bytes of geometry no longer referenced by reduced objects.
    pub memory_saved_bytes: usize,
    /// Triangles not drawn compared to full detail. Culled objects count in full.
    pub polygons_reduced: usize,
    /// Objects whose texture sampling has been downgraded.
    pub textures_optimized: usize,
    /// Milliseconds since the engine was created.
    pub last_update_ms: u64,
    /// Weighted share of reduced objects, in `[0, 100]`.
    pub performance_impact: f32,
}

/// Band moves above which a refresh is published.
const SIGNIFICANT_MOVES: usize = 2;
/// Memory delta above which a refresh is published.
const SIGNIFICANT_BYTES: usize = 1024 * 1024;

impl LodStatistics {
    /// `(culled + 0.7 * low + 0.4 * medium) / total`, as a percentage.
    pub fn compute_performance_impact(&mut self) {
        self.performance_impact = if self.total_objects == 0 {
            0.0
        } else {
            let weighted = self.culled as f32
                + self.low_detail as f32 * 0.7
                + self.medium_detail as f32 * 0.4;
            (weighted / self.total_objects as f32 * 100.0).clamp(0.0, 100.0)
        };
    }

    /// Objects that changed band between two snapshots. Each move shifts
    /// two counters, so the summed difference is halved.
    pub fn level_moves(&self, other: &LodStatistics) -> usize {
        let diff = self.high_detail.abs_diff(other.high_detail)
            + self.medium_detail.abs_diff(other.medium_detail)
            + self.low_detail.abs_diff(other.low_detail)
            + self.culled.abs_diff(other.culled);
        diff.div_ceil(2)
    }

    /// Whether `next` differs enough from `self` to be worth publishing.
    pub fn is_significant_change(&self, next: &LodStatistics) -> bool {
        self.total_objects != next.total_objects
            || self.level_moves(next) > SIGNIFICANT_MOVES
            || self.memory_saved_bytes.abs_diff(next.memory_saved_bytes) > SIGNIFICANT_BYTES
    }
}
