//! Zoom level to clustering distance functions
//!
//! Every function here maps a map zoom level to a distance in kilometres that
//! is strictly positive and never increases as the zoom level grows. Zoom
//! levels outside the usual 0–22 range (including negative, infinite and NaN
//! values) are clamped instead of rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest zoom level the functions distinguish
pub const MIN_ZOOM: f64 = 0.0;
/// Highest zoom level the functions distinguish
pub const MAX_ZOOM: f64 = 22.0;

/// Largest threshold any function returns
pub const MAX_THRESHOLD_KM: f64 = 10.0;

const LINEAR_SLOPE_KM_PER_ZOOM: f64 = 0.5;
const LINEAR_FLOOR_KM: f64 = 0.03;

/// Zoom levels it takes the exponential variant to halve its threshold
const EXPONENTIAL_HALVING_ZOOM: f64 = 2.2;
const EXPONENTIAL_FLOOR_KM: f64 = 0.01;

/// Band boundaries for the piecewise-linear variant: coarse slopes at low
/// zoom, finer slopes once streets become visible.
const PIECEWISE_LINEAR_ANCHORS: [(f64, f64); 5] = [
    (0.0, 10.0),
    (10.0, 5.0),
    (14.0, 1.0),
    (18.0, 0.2),
    (22.0, 0.04),
];

/// Band boundaries for the piecewise-exponential variant. Between two
/// anchors the threshold decays at a constant rate.
const PIECEWISE_EXPONENTIAL_ANCHORS: [(f64, f64); 5] = [
    (0.0, 10.0),
    (10.0, 4.0),
    (14.0, 1.0),
    (18.0, 0.08),
    (22.0, 0.01),
];

/// Signature shared by all zoom-to-threshold functions
pub type ThresholdFn = fn(f32) -> f64;

/// Named zoom-to-threshold functions
pub struct ClusterThresholds;

impl ClusterThresholds {
    /// Threshold shrinks by a fixed amount per zoom level, floored at 30 m
    pub fn linear_scaling(zoom_level: f32) -> f64 {
        let zoom = clamp_zoom(zoom_level);
        (MAX_THRESHOLD_KM - LINEAR_SLOPE_KM_PER_ZOOM * zoom).max(LINEAR_FLOOR_KM)
    }

    /// Linear within each zoom band, with steeper slopes at higher zoom
    pub fn piecewise_linear_scaling(zoom_level: f32) -> f64 {
        interpolate(&PIECEWISE_LINEAR_ANCHORS, clamp_zoom(zoom_level), Interpolation::Linear)
    }

    /// Threshold halves every 2.2 zoom levels, floored at 10 m
    pub fn exponential_scaling(zoom_level: f32) -> f64 {
        let zoom = clamp_zoom(zoom_level);
        (MAX_THRESHOLD_KM * 0.5f64.powf(zoom / EXPONENTIAL_HALVING_ZOOM)).max(EXPONENTIAL_FLOOR_KM)
    }

    /// Exponential decay with a band-specific rate.
    ///
    /// Zoom 10 still groups across several kilometres, zoom 14 groups around
    /// one kilometre and zoom 18 separates nearly everything (80 m).
    pub fn piecewise_exponential_scaling(zoom_level: f32) -> f64 {
        interpolate(
            &PIECEWISE_EXPONENTIAL_ANCHORS,
            clamp_zoom(zoom_level),
            Interpolation::Exponential,
        )
    }
}

/// Configurable choice between the named threshold functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdScaling {
    Linear,
    PiecewiseLinear,
    Exponential,
    #[default]
    PiecewiseExponential,
}

impl ThresholdScaling {
    pub const ALL: [ThresholdScaling; 4] = [
        Self::Linear,
        Self::PiecewiseLinear,
        Self::Exponential,
        Self::PiecewiseExponential,
    ];

    /// Function implementing this scaling
    pub fn as_fn(self) -> ThresholdFn {
        match self {
            Self::Linear => ClusterThresholds::linear_scaling,
            Self::PiecewiseLinear => ClusterThresholds::piecewise_linear_scaling,
            Self::Exponential => ClusterThresholds::exponential_scaling,
            Self::PiecewiseExponential => ClusterThresholds::piecewise_exponential_scaling,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::PiecewiseLinear => "piecewise_linear",
            Self::Exponential => "exponential",
            Self::PiecewiseExponential => "piecewise_exponential",
        }
    }
}

impl fmt::Display for ThresholdScaling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThresholdScaling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|scaling| scaling.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "Unknown threshold scaling '{s}' (expected one of: linear, piecewise_linear, exponential, piecewise_exponential)"
                )
            })
    }
}

#[derive(Clone, Copy)]
enum Interpolation {
    Linear,
    Exponential,
}

/// NaN maps to the coarsest zoom; everything else is clamped into range.
fn clamp_zoom(zoom_level: f32) -> f64 {
    if zoom_level.is_nan() {
        return MIN_ZOOM;
    }
    f64::from(zoom_level).clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Anchors must be sorted by zoom with strictly positive, non-increasing values.
fn interpolate(anchors: &[(f64, f64)], zoom: f64, mode: Interpolation) -> f64 {
    for window in anchors.windows(2) {
        let (z0, v0) = window[0];
        let (z1, v1) = window[1];
        if zoom <= z1 {
            let t = ((zoom - z0) / (z1 - z0)).clamp(0.0, 1.0);
            let value = match mode {
                Interpolation::Linear => v0 + t * (v1 - v0),
                Interpolation::Exponential => (v0.ln() + t * (v1.ln() - v0.ln())).exp(),
            };
            // ln/exp round-trips can land an ulp outside the band
            return value.clamp(v1, v0);
        }
    }

    anchors.last().map_or(EXPONENTIAL_FLOOR_KM, |&(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ThresholdScaling::Linear)]
    #[case(ThresholdScaling::PiecewiseLinear)]
    #[case(ThresholdScaling::Exponential)]
    #[case(ThresholdScaling::PiecewiseExponential)]
    fn test_degenerate_zoom_levels_stay_positive(#[case] scaling: ThresholdScaling) {
        let f = scaling.as_fn();
        for zoom in [0.0, -1.0, -100.0, f32::NEG_INFINITY, f32::INFINITY, f32::NAN, 1000.0] {
            let threshold = f(zoom);
            assert!(threshold.is_finite(), "{scaling} at {zoom} gave {threshold}");
            assert!(threshold > 0.0, "{scaling} at {zoom} gave {threshold}");
            assert!(threshold <= MAX_THRESHOLD_KM);
        }
    }

    #[rstest]
    #[case(ThresholdScaling::Linear)]
    #[case(ThresholdScaling::PiecewiseLinear)]
    #[case(ThresholdScaling::Exponential)]
    #[case(ThresholdScaling::PiecewiseExponential)]
    fn test_monotonic_over_practical_range(#[case] scaling: ThresholdScaling) {
        let f = scaling.as_fn();
        let mut previous = f(0.0);
        for step in 1..=220 {
            let zoom = step as f32 / 10.0;
            let current = f(zoom);
            assert!(
                current <= previous + 1e-12,
                "{scaling} increased between zoom {} and {zoom}",
                zoom - 0.1
            );
            previous = current;
        }
    }

    #[test]
    fn test_piecewise_exponential_calibration() {
        let f = ClusterThresholds::piecewise_exponential_scaling;
        assert!(f(10.0) > 2.0, "zoom 10 should cluster across kilometres");
        assert!((f(14.0) - 1.0).abs() < 1e-9);
        assert!(f(18.0) < 0.1, "zoom 18 should be sub-100m");
    }

    #[test]
    fn test_linear_floor() {
        assert_eq!(ClusterThresholds::linear_scaling(0.0), 10.0);
        assert_eq!(ClusterThresholds::linear_scaling(22.0), 0.03);
        assert_eq!(ClusterThresholds::linear_scaling(-5.0), 10.0);
    }

    #[test]
    fn test_piecewise_exponential_hits_anchors_exactly() {
        let f = ClusterThresholds::piecewise_exponential_scaling;
        assert_eq!(f(0.0), MAX_THRESHOLD_KM);
        assert_eq!(f(-3.0), MAX_THRESHOLD_KM);
        assert_eq!(f(f32::NAN), MAX_THRESHOLD_KM);
        for (zoom, km) in PIECEWISE_EXPONENTIAL_ANCHORS {
            let threshold = f(zoom as f32);
            assert!(threshold <= MAX_THRESHOLD_KM);
            assert!((threshold - km).abs() < 1e-12, "zoom {zoom} gave {threshold}");
        }
    }

    #[test]
    fn test_piecewise_linear_band_edges() {
        let f = ClusterThresholds::piecewise_linear_scaling;
        assert!((f(10.0) - 5.0).abs() < 1e-12);
        assert!((f(12.0) - 3.0).abs() < 1e-12);
        assert!((f(14.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_halves() {
        let f = ClusterThresholds::exponential_scaling;
        assert!((f(2.2) - 5.0).abs() < 1e-6);
        assert_eq!(f(30.0), EXPONENTIAL_FLOOR_KM);
    }

    #[test]
    fn test_scaling_from_str() {
        assert_eq!(
            "piecewise-exponential".parse::<ThresholdScaling>(),
            Ok(ThresholdScaling::PiecewiseExponential)
        );
        assert_eq!("Linear".parse::<ThresholdScaling>(), Ok(ThresholdScaling::Linear));
        assert!("cubic".parse::<ThresholdScaling>().is_err());
        assert_eq!(ThresholdScaling::default(), ThresholdScaling::PiecewiseExponential);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_thresholds_never_increase(a in -50.0f32..50.0, b in -50.0f32..50.0) {
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                for scaling in ThresholdScaling::ALL {
                    let f = scaling.as_fn();
                    prop_assert!(f(low) + 1e-12 >= f(high));
                    prop_assert!(f(high) > 0.0);
                }
            }
        }
    }
}
