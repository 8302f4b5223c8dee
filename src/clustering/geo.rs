//! Spherical distance helpers for latitude/longitude points

use super::ClusterItem;

/// Mean Earth radius used by the Haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometres
pub fn haversine_km(a: &ClusterItem, b: &ClusterItem) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h marginally outside [0, 1] for antipodal points
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Arithmetic mean of latitudes and longitudes.
///
/// Not a true spherical centroid, which is fine at the tens-of-kilometres
/// scale markers are grouped at. Returns `None` for an empty slice.
pub fn mean_center<'a, I>(points: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = &'a ClusterItem>,
{
    let (count, lat_sum, lng_sum) = points
        .into_iter()
        .fold((0usize, 0.0f64, 0.0f64), |(n, lat, lng), p| {
            (n + 1, lat + p.lat, lng + p.lng)
        });

    if count == 0 {
        return None;
    }
    Some((lat_sum / count as f64, lng_sum / count as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_zero_for_same_point() {
        let p = ClusterItem::new(46.52, 6.57);
        assert_eq!(haversine_km(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let a = ClusterItem::new(0.0, 0.0);
        let b = ClusterItem::new(1.0, 0.0);
        // 2 * pi * 6371 / 360
        assert!((haversine_km(&a, &b) - 111.195).abs() < 0.01);
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let lausanne = ClusterItem::new(46.5197, 6.6323);
        let geneva = ClusterItem::new(46.2044, 6.1432);
        let d1 = haversine_km(&lausanne, &geneva);
        let d2 = haversine_km(&geneva, &lausanne);
        assert!((d1 - d2).abs() < 1e-9);
        assert!(d1 > 50.0 && d1 < 55.0);
    }

    #[test]
    fn test_haversine_antipodal_is_finite() {
        let a = ClusterItem::new(0.0, 0.0);
        let b = ClusterItem::new(0.0, 180.0);
        let d = haversine_km(&a, &b);
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_mean_center() {
        let points = [
            ClusterItem::new(1.0, 2.0),
            ClusterItem::new(3.0, 4.0),
            ClusterItem::new(5.0, 9.0),
        ];
        let (lat, lng) = mean_center(&points).unwrap();
        assert!((lat - 3.0).abs() < 1e-9);
        assert!((lng - 5.0).abs() < 1e-9);

        let empty: [ClusterItem; 0] = [];
        assert!(mean_center(&empty).is_none());
    }
}
