//! Map marker clustering
//!
//! Groups geographic points of interest (shops, sessions, rental spaces) into
//! zoom-appropriate clusters while keeping a link back to the caller's own
//! domain objects.
//!
//! - [`ClusterManager`] projects domain objects to [`ClusterItem`]s, runs the
//!   configured [`ClusterStrategy`] and maps each group back to the original
//!   objects.
//! - [`DistanceBasedClusterStrategy`] is the production strategy.
//! - [`ClusterThresholds`] holds the zoom-to-distance functions.
//!
//! Everything here is synchronous and free of shared mutable state.

pub mod geo;
pub mod strategy;
pub mod thresholds;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub use strategy::DistanceBasedClusterStrategy;
pub use thresholds::{ClusterThresholds, ThresholdFn, ThresholdScaling};

/// A point in degrees of latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterItem {
    pub lat: f64,
    pub lng: f64,
}

impl ClusterItem {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A group of items with the mean position of its members
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster<T> {
    pub center_lat: f64,
    pub center_lng: f64,
    pub items: Vec<T>,
}

impl<T> Cluster<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Build a cluster from member points and the items they stand for.
    ///
    /// Returns `None` when there are no members.
    fn from_members(points: &[ClusterItem], items: Vec<T>) -> Option<Self> {
        let (center_lat, center_lng) = geo::mean_center(points)?;
        Some(Self {
            center_lat,
            center_lng,
            items,
        })
    }
}

/// Pluggable clustering algorithm
pub trait ClusterStrategy: Send + Sync {
    /// Partition `items` into groups.
    ///
    /// Each group lists positions into `items`. Implementations should return
    /// every position exactly once and no empty groups.
    fn group(&self, items: &[ClusterItem], zoom_level: f32) -> Vec<Vec<usize>>;

    /// Cluster raw points
    fn clusterize(&self, items: &[ClusterItem], zoom_level: f32) -> Vec<Cluster<ClusterItem>> {
        self.group(items, zoom_level)
            .into_iter()
            .filter_map(|members| {
                let points: Vec<ClusterItem> = members
                    .iter()
                    .filter_map(|&index| items.get(index).copied())
                    .collect();
                Cluster::from_members(&points, points.clone())
            })
            .collect()
    }
}

/// Clusters domain objects through a [`ClusterStrategy`]
#[derive(Clone)]
pub struct ClusterManager {
    strategy: Arc<dyn ClusterStrategy>,
}

impl ClusterManager {
    pub fn new(strategy: Arc<dyn ClusterStrategy>) -> Self {
        Self { strategy }
    }

    /// Manager backed by a [`DistanceBasedClusterStrategy`] with the given scaling
    pub fn with_scaling(scaling: ThresholdScaling) -> Self {
        Self::new(Arc::new(DistanceBasedClusterStrategy::from_scaling(scaling)))
    }

    /// Group `items` for display at `zoom_level`.
    ///
    /// Every input item ends up in exactly one returned cluster. Indices a
    /// strategy repeats or invents are ignored, and items it leaves out are
    /// returned as single-item clusters.
    pub fn cluster<T, F>(&self, items: Vec<T>, zoom_level: f32, to_point: F) -> Vec<Cluster<T>>
    where
        F: Fn(&T) -> ClusterItem,
    {
        if items.is_empty() {
            return Vec::new();
        }

        let points: Vec<ClusterItem> = items.iter().map(&to_point).collect();
        let groups = self.strategy.group(&points, zoom_level);

        let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
        let mut clusters = Vec::with_capacity(groups.len());

        for group in groups {
            let mut member_points = Vec::with_capacity(group.len());
            let mut member_items = Vec::with_capacity(group.len());

            for index in group {
                match slots.get_mut(index).and_then(Option::take) {
                    Some(item) => {
                        member_points.push(points[index]);
                        member_items.push(item);
                    }
                    None => warn!("Cluster strategy returned unknown or repeated index {}", index),
                }
            }

            if let Some(cluster) = Cluster::from_members(&member_points, member_items) {
                clusters.push(cluster);
            }
        }

        let mut orphans = 0usize;
        for (index, slot) in slots.iter_mut().enumerate() {
            if let Some(item) = slot.take() {
                orphans += 1;
                clusters.push(Cluster {
                    center_lat: points[index].lat,
                    center_lng: points[index].lng,
                    items: vec![item],
                });
            }
        }
        if orphans > 0 {
            warn!("Cluster strategy skipped {} items; added them as single clusters", orphans);
        }

        debug!(
            "Clustered {} items into {} clusters at zoom {}",
            points.len(),
            clusters.len(),
            zoom_level
        );
        clusters
    }
}

impl Default for ClusterManager {
    fn default() -> Self {
        Self::new(Arc::new(DistanceBasedClusterStrategy::default()))
    }
}

impl std::fmt::Debug for ClusterManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Shop {
        name: &'static str,
        lat: f64,
        lng: f64,
    }

    fn shop(name: &'static str, lat: f64, lng: f64) -> Shop {
        Shop { name, lat, lng }
    }

    fn to_point(shop: &Shop) -> ClusterItem {
        ClusterItem::new(shop.lat, shop.lng)
    }

    /// Puts every point into a single group
    struct EverythingTogether;

    impl ClusterStrategy for EverythingTogether {
        fn group(&self, items: &[ClusterItem], _zoom_level: f32) -> Vec<Vec<usize>> {
            vec![(0..items.len()).collect()]
        }
    }

    /// Returns repeated, out-of-range and missing indices
    struct Sloppy;

    impl ClusterStrategy for Sloppy {
        fn group(&self, _items: &[ClusterItem], _zoom_level: f32) -> Vec<Vec<usize>> {
            vec![vec![0, 0, 99], vec![], vec![2]]
        }
    }

    #[test]
    fn test_empty_input_returns_empty() {
        let manager = ClusterManager::default();
        for zoom in [-3.0, 0.0, 12.0, 25.0] {
            assert!(manager.cluster(Vec::<Shop>::new(), zoom, to_point).is_empty());
        }
    }

    #[test]
    fn test_items_map_back_to_domain_objects() {
        let manager = ClusterManager::new(Arc::new(EverythingTogether));
        let shops = vec![shop("a", 1.0, 2.0), shop("b", 3.0, 4.0)];

        let clusters = manager.cluster(shops.clone(), 10.0, to_point);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].items, shops);
        assert!((clusters[0].center_lat - 2.0).abs() < 1e-6);
        assert!((clusters[0].center_lng - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_sloppy_strategy_still_covers_every_item() {
        let manager = ClusterManager::new(Arc::new(Sloppy));
        let shops = vec![shop("a", 0.0, 0.0), shop("b", 1.0, 1.0), shop("c", 2.0, 2.0)];

        let clusters = manager.cluster(shops, 10.0, to_point);
        let mut names: Vec<_> = clusters.iter().flat_map(|c| c.items.iter().map(|s| s.name)).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(clusters.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn test_duplicate_positions_stay_distinct() {
        let manager = ClusterManager::default();
        let shops = vec![shop("first", 5.0, 5.0), shop("second", 5.0, 5.0)];

        let clusters = manager.cluster(shops, 20.0, to_point);
        assert_eq!(clusters.len(), 1);
        let names: Vec<_> = clusters[0].items.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_clusterize_uses_raw_points() {
        let strategy = EverythingTogether;
        let points = [ClusterItem::new(0.0, 0.0), ClusterItem::new(2.0, 4.0)];
        let clusters = strategy.clusterize(&points, 3.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].items, points.to_vec());
        assert!((clusters[0].center_lat - 1.0).abs() < 1e-9);
        assert!((clusters[0].center_lng - 2.0).abs() < 1e-9);
    }
}
