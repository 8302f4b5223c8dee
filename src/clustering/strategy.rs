//! Distance-based greedy clustering

use tracing::trace;

use super::geo::haversine_km;
use super::thresholds::{ClusterThresholds, ThresholdFn, ThresholdScaling};
use super::{ClusterItem, ClusterStrategy};

/// Greedy single-pass proximity grouping.
///
/// Points are visited in input order. Each point that is not yet part of a
/// cluster seeds a new one and absorbs every remaining unclustered point whose
/// great-circle distance to the seed is within the threshold (inclusive).
///
/// The partition is only independent of input order when groups are separated
/// by clearly more than the threshold. For chains of points spaced close to
/// the threshold, which point ends up seeding a cluster depends on ordering
/// and so does the resulting grouping.
#[derive(Debug, Clone, Copy)]
pub struct DistanceBasedClusterStrategy<F = ThresholdFn> {
    zoom_to_threshold: F,
}

impl DistanceBasedClusterStrategy {
    /// Strategy using the piecewise-exponential zoom scaling
    pub fn new() -> Self {
        Self::from_scaling(ThresholdScaling::default())
    }

    /// Strategy using one of the named zoom scalings
    pub fn from_scaling(scaling: ThresholdScaling) -> Self {
        Self {
            zoom_to_threshold: scaling.as_fn(),
        }
    }
}

impl Default for DistanceBasedClusterStrategy {
    fn default() -> Self {
        Self {
            zoom_to_threshold: ClusterThresholds::piecewise_exponential_scaling,
        }
    }
}

impl<F> DistanceBasedClusterStrategy<F>
where
    F: Fn(f32) -> f64 + Send + Sync,
{
    /// Strategy with a caller-supplied zoom-to-kilometres function
    pub fn with_threshold_fn(zoom_to_threshold: F) -> Self {
        Self { zoom_to_threshold }
    }

    /// Distance in kilometres used at the given zoom level
    pub fn threshold_km(&self, zoom_level: f32) -> f64 {
        (self.zoom_to_threshold)(zoom_level)
    }
}

impl<F> ClusterStrategy for DistanceBasedClusterStrategy<F>
where
    F: Fn(f32) -> f64 + Send + Sync,
{
    fn group(&self, items: &[ClusterItem], zoom_level: f32) -> Vec<Vec<usize>> {
        let threshold = self.threshold_km(zoom_level);
        let mut clustered = vec![false; items.len()];
        let mut groups = Vec::new();

        for seed in 0..items.len() {
            if clustered[seed] {
                continue;
            }
            clustered[seed] = true;
            let mut members = vec![seed];

            for candidate in (seed + 1)..items.len() {
                if !clustered[candidate] && haversine_km(&items[seed], &items[candidate]) <= threshold {
                    clustered[candidate] = true;
                    members.push(candidate);
                }
            }
            groups.push(members);
        }

        trace!(
            "Grouped {} points into {} clusters at zoom {} (threshold {:.3} km)",
            items.len(),
            groups.len(),
            zoom_level,
            threshold
        );
        groups
    }
}
