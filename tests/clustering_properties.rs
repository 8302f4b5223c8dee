use meeple_core::clustering::geo::haversine_km;
use meeple_core::clustering::{
    Cluster, ClusterItem, ClusterManager, DistanceBasedClusterStrategy, ThresholdScaling,
};
use proptest::prelude::*;
use std::sync::Arc;

const KM_PER_DEGREE: f64 = 111.0;

/// A map marker as a caller would cluster it
#[derive(Debug, Clone, PartialEq)]
struct Marker {
    id: usize,
    lat: f64,
    lng: f64,
}

fn fixed_threshold(km: f64) -> ClusterManager {
    ClusterManager::new(Arc::new(DistanceBasedClusterStrategy::with_threshold_fn(
        move |_zoom: f32| km,
    )))
}

fn cluster_markers(manager: &ClusterManager, markers: Vec<Marker>, zoom: f32) -> Vec<Cluster<Marker>> {
    manager.cluster(markers, zoom, |m| ClusterItem::new(m.lat, m.lng))
}

/// 100 markers within a few hundred metres of `origin_lat`, ids offset by `first_id`
fn tight_group(origin_lat: f64, first_id: usize) -> Vec<Marker> {
    (0..100)
        .map(|i| Marker {
            id: first_id + i,
            lat: origin_lat + (i % 10) as f64 * 0.0002,
            lng: (i / 10) as f64 * 0.0002,
        })
        .collect()
}

fn two_separated_groups() -> Vec<Marker> {
    let mut markers = tight_group(0.0, 0);
    markers.extend(tight_group(10.0 / KM_PER_DEGREE, 100));
    markers
}

fn sorted_sizes(clusters: &[Cluster<Marker>]) -> Vec<usize> {
    let mut sizes: Vec<usize> = clusters.iter().map(Cluster::len).collect();
    sizes.sort_unstable();
    sizes
}

#[test]
fn test_empty_input_gives_no_clusters() {
    let manager = ClusterManager::default();
    for zoom in [0.0, 10.0, 22.0, -3.0, f32::NAN] {
        assert!(cluster_markers(&manager, Vec::new(), zoom).is_empty());
    }
}

#[test]
fn test_near_points_join_and_far_points_separate() {
    let manager = fixed_threshold(1.0);

    let near = vec![
        Marker { id: 0, lat: 0.0, lng: 0.0 },
        Marker { id: 1, lat: 0.9 / KM_PER_DEGREE, lng: 0.0 },
    ];
    assert_eq!(cluster_markers(&manager, near, 12.0).len(), 1);

    let far = vec![
        Marker { id: 0, lat: 0.0, lng: 0.0 },
        Marker { id: 1, lat: 10.0 / KM_PER_DEGREE, lng: 0.0 },
    ];
    assert_eq!(cluster_markers(&manager, far, 12.0).len(), 2);
}

#[test]
fn test_points_exactly_at_threshold_cluster_together() {
    let a = ClusterItem::new(48.8566, 2.3522);
    let b = ClusterItem::new(48.8666, 2.3622);
    let distance = haversine_km(&a, &b);

    let manager = fixed_threshold(distance);
    let clusters = manager.cluster(vec![a, b], 15.0, |p| *p);
    assert_eq!(clusters.len(), 1);
}

#[test]
fn test_well_separated_groups_ignore_input_order() {
    let manager = fixed_threshold(1.0);

    let forward = two_separated_groups();
    let mut reversed = forward.clone();
    reversed.reverse();
    let interleaved: Vec<Marker> = forward[..100]
        .iter()
        .zip(&forward[100..])
        .flat_map(|(a, b)| [a.clone(), b.clone()])
        .collect();

    for markers in [forward, reversed, interleaved] {
        let clusters = cluster_markers(&manager, markers, 12.0);
        assert_eq!(sorted_sizes(&clusters), vec![100, 100]);
        for cluster in &clusters {
            let first_group = cluster.items[0].id < 100;
            assert!(cluster.items.iter().all(|m| (m.id < 100) == first_group));
        }
    }
}

#[test]
fn test_every_scaling_separates_groups_at_street_level() {
    for scaling in ThresholdScaling::ALL {
        let manager = ClusterManager::with_scaling(scaling);
        let clusters = cluster_markers(&manager, two_separated_groups(), 22.0);
        let total: usize = clusters.iter().map(Cluster::len).sum();
        assert_eq!(total, 200, "{scaling} lost markers");
        assert!(clusters.len() >= 2, "{scaling} merged distant groups at zoom 22");
    }
}

fn marker_strategy() -> impl Strategy<Value = Vec<Marker>> {
    prop::collection::vec((-60.0f64..60.0, -179.0f64..179.0), 0..60).prop_map(|coords| {
        coords
            .into_iter()
            .enumerate()
            .map(|(id, (lat, lng))| Marker { id, lat, lng })
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_every_marker_lands_in_exactly_one_cluster(
        markers in marker_strategy(),
        zoom in -5.0f32..30.0,
    ) {
        let manager = ClusterManager::default();
        let clusters = cluster_markers(&manager, markers.clone(), zoom);

        let mut ids: Vec<usize> = clusters
            .iter()
            .flat_map(|c| c.items.iter().map(|m| m.id))
            .collect();
        ids.sort_unstable();
        let expected: Vec<usize> = (0..markers.len()).collect();
        prop_assert_eq!(ids, expected);
        prop_assert!(clusters.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn prop_cluster_center_is_member_mean(
        markers in marker_strategy(),
        zoom in 0.0f32..22.0,
    ) {
        let manager = ClusterManager::default();
        for cluster in cluster_markers(&manager, markers, zoom) {
            let n = cluster.len() as f64;
            let lat = cluster.items.iter().map(|m| m.lat).sum::<f64>() / n;
            let lng = cluster.items.iter().map(|m| m.lng).sum::<f64>() / n;
            prop_assert!((cluster.center_lat - lat).abs() < 1e-6);
            prop_assert!((cluster.center_lng - lng).abs() < 1e-6);
        }
    }

    #[test]
    fn prop_separated_groups_survive_shuffling(
        markers in Just(two_separated_groups()).prop_shuffle(),
    ) {
        let manager = fixed_threshold(1.0);
        let clusters = cluster_markers(&manager, markers, 12.0);
        prop_assert_eq!(sorted_sizes(&clusters), vec![100, 100]);
    }

    #[test]
    fn prop_thresholds_non_increasing_and_positive(
        low in -50.0f32..40.0,
        delta in 0.0f32..40.0,
    ) {
        let high = low + delta;
        for scaling in ThresholdScaling::ALL {
            let f = scaling.as_fn();
            // anchors are interpolated in floating point, allow rounding noise
            prop_assert!(f(low) + 1e-9 >= f(high), "{} grew from {} to {}", scaling, low, high);
            prop_assert!(f(low) > 0.0);
            prop_assert!(f(high) > 0.0);
        }
    }
}
