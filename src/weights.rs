//! Point radius and alpha normalization.
//!
//! Radius shrinks with point density and grows with engagement. Engagement is
//! heavy-tailed, so values are `log1p`-transformed, winsorized at sample
//! percentiles and blended with their percentile rank before being mapped
//! onto the density-derived base radius.

use serde::Serialize;

use crate::config::PointStyleConfig;
use crate::ir::{Point, SelectionState};

const REFERENCE_POINT_COUNT: f32 = 5000.0;
const BASE_RADIUS_MAX: f32 = 2.3;
const BASE_RADIUS_MIN: f32 = 0.8;
const BASE_ALPHA: f32 = 180.0;
/// Samples at least this large use the 3rd/97th percentiles; smaller ones
/// use the 5th/95th.
const WIDE_PERCENTILE_SAMPLE: usize = 2000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadiusTable {
    pub base_radius: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub radii: Vec<f32>,
}

impl RadiusTable {
    pub fn get(&self, idx: usize) -> f32 {
        self.radii.get(idx).copied().unwrap_or(self.base_radius)
    }

    pub fn len(&self) -> usize {
        self.radii.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radii.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlphaScale {
    pub base: u8,
    pub selected: u8,
    pub dim: u8,
}

impl AlphaScale {
    /// Fill alpha for one point. Activation (feature strength, usually 0..1)
    /// lifts a normal point toward the selected alpha.
    pub fn fill_alpha(&self, state: SelectionState, hovered: bool, activation: f32) -> u8 {
        if state == SelectionState::Hidden {
            return 0;
        }
        if hovered {
            return 255;
        }
        match state {
            SelectionState::Selected => self.selected,
            SelectionState::NotSelected => self.dim,
            _ => {
                let lift = if activation.is_finite() {
                    activation.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let base = self.base as f32;
                (base + (self.selected as f32 - base) * lift).round() as u8
            }
        }
    }
}

pub fn base_radius(point_count: usize, point_scale: f32) -> f32 {
    let n = point_count.max(1) as f32;
    let scale = if point_scale.is_finite() && point_scale > 0.0 {
        point_scale
    } else {
        1.0
    };
    (BASE_RADIUS_MAX * (REFERENCE_POINT_COUNT / n).powf(0.25)).clamp(BASE_RADIUS_MIN, BASE_RADIUS_MAX)
        * scale
}

pub fn compute_alpha_scale(point_count: usize, config: &PointStyleConfig) -> AlphaScale {
    let n = point_count.max(1) as f32;
    let opacity = if config.opacity.is_finite() {
        config.opacity.max(0.0)
    } else {
        1.0
    };
    let base = (BASE_ALPHA * (REFERENCE_POINT_COUNT / n).powf(0.2) * opacity)
        .round()
        .clamp(10.0, 255.0);
    let selected = (base + config.selected_alpha_delta as f32).clamp(0.0, 255.0);
    let floor = config.dim_alpha_floor.min(config.dim_alpha_ceiling) as f32;
    let ceiling = config.dim_alpha_ceiling as f32;
    let dim = (base * config.dim_factor).round().clamp(floor, ceiling);
    AlphaScale {
        base: base as u8,
        selected: selected as u8,
        dim: dim as u8,
    }
}

pub fn compute_radii(points: &[Point], config: &PointStyleConfig) -> RadiusTable {
    let base = base_radius(points.len(), config.point_scale);
    let min_mult = config.min_radius_multiplier.min(1.0).max(0.0);
    let max_mult = config.max_radius_multiplier.max(1.0);
    let min_radius = base * min_mult;
    let max_radius = base * max_mult;
    let mut table = RadiusTable {
        base_radius: base,
        min_radius,
        max_radius,
        radii: vec![base; points.len()],
    };

    let transformed: Vec<f32> = points
        .iter()
        .map(|point| engagement_sample(point.engagement))
        .collect();
    if !transformed.iter().any(|value| *value > 0.0) {
        return table;
    }

    let stride = transformed
        .len()
        .div_ceil(config.max_sample_size.max(1))
        .max(1);
    let mut sample: Vec<f32> = transformed.iter().step_by(stride).copied().collect();
    sample.sort_by(f32::total_cmp);

    let (low_q, high_q) = if sample.len() >= WIDE_PERCENTILE_SAMPLE {
        (0.03, 0.97)
    } else {
        (0.05, 0.95)
    };
    let lo = percentile(&sample, low_q);
    let mut hi = percentile(&sample, high_q);
    if hi <= lo {
        // A lone outlier sits above the upper percentile; stretch to it so it
        // still reaches the maximum.
        hi = transformed.iter().copied().fold(lo, f32::max);
    }
    let span = hi - lo;
    let floor_rank = upper_bound(&sample, lo);
    let rank_span = sample.len() - floor_rank;
    let magnitude_weight = config.magnitude_weight.clamp(0.0, 1.0);

    tracing::trace!(
        lo,
        hi,
        sample = sample.len(),
        stride,
        "engagement winsorization bounds"
    );

    for (radius, value) in table.radii.iter_mut().zip(&transformed) {
        if *value <= lo || span <= 0.0 {
            continue;
        }
        let magnitude = (value.min(hi) - lo) / span;
        let rank = if rank_span == 0 {
            magnitude
        } else {
            (upper_bound(&sample, *value) - floor_rank) as f32 / rank_span as f32
        };
        let factor = magnitude_weight * magnitude + (1.0 - magnitude_weight) * rank;
        let multiplier = (1.0 + factor.clamp(0.0, 1.0) * (max_mult - 1.0)).clamp(min_mult, max_mult);
        *radius = (base * multiplier).clamp(min_radius, max_radius);
    }
    table
}

fn engagement_sample(raw: f32) -> f32 {
    if raw.is_finite() { raw.max(0.0).ln_1p() } else { 0.0 }
}

/// Nearest-rank percentile of an ascending slice.
fn percentile(sorted: &[f32], q: f32) -> f32 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f32 * q).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Number of elements `<= value` in an ascending slice.
fn upper_bound(sorted: &[f32], value: f32) -> usize {
    sorted.partition_point(|probe| *probe <= value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points_with(engagement: &[f32]) -> Vec<Point> {
        engagement
            .iter()
            .enumerate()
            .map(|(i, e)| Point::new(i as f32, 0.0).with_engagement(*e))
            .collect()
    }

    #[test]
    fn base_radius_shrinks_with_density() {
        assert_eq!(base_radius(100, 1.0), 2.3);
        let dense = base_radius(250_000, 1.0);
        assert!(dense < 1.0 && dense >= 0.8, "got {dense}");
        assert_eq!(base_radius(10_000_000, 1.0), 0.8);
        assert_eq!(base_radius(100, 2.0), 4.6);
    }

    #[test]
    fn zero_engagement_gets_uniform_base_radius() {
        let config = PointStyleConfig::default();
        let table = compute_radii(&points_with(&[0.0, 0.0, -3.0, f32::NAN]), &config);
        assert!(table.radii.iter().all(|r| *r == table.base_radius));
    }

    #[test]
    fn empty_input_produces_empty_table() {
        let table = compute_radii(&[], &PointStyleConfig::default());
        assert!(table.is_empty());
        assert_eq!(table.get(3), table.base_radius);
    }

    #[test]
    fn lone_outlier_reaches_max_and_leaves_others_at_base() {
        let mut engagement = vec![0.0; 10_000];
        engagement[1234] = 1_000_000.0;
        let table = compute_radii(&points_with(&engagement), &PointStyleConfig::default());
        assert_eq!(table.radii[1234], table.max_radius);
        for (idx, radius) in table.radii.iter().enumerate() {
            if idx != 1234 {
                assert_eq!(*radius, table.base_radius);
            }
        }
    }

    #[test]
    fn radii_are_monotonic_in_engagement() {
        let engagement: Vec<f32> = (0..500).map(|i| ((i * 37) % 500) as f32).collect();
        let table = compute_radii(&points_with(&engagement), &PointStyleConfig::default());
        let mut order: Vec<usize> = (0..engagement.len()).collect();
        order.sort_by(|a, b| engagement[*a].total_cmp(&engagement[*b]));
        for pair in order.windows(2) {
            assert!(table.radii[pair[1]] >= table.radii[pair[0]]);
        }
        assert!(
            table
                .radii
                .iter()
                .all(|r| *r >= table.min_radius && *r <= table.max_radius)
        );
    }

    #[test]
    fn narrow_distribution_still_separates_by_rank() {
        let engagement: Vec<f32> = (0..100).map(|i| 1000.0 + i as f32).collect();
        let table = compute_radii(&points_with(&engagement), &PointStyleConfig::default());
        assert!(table.radii[99] - table.radii[10] > table.base_radius * 0.5);
    }

    #[test]
    fn subsampling_keeps_bounds() {
        let engagement: Vec<f32> = (0..120_000).map(|i| (i % 997) as f32).collect();
        let config = PointStyleConfig::default();
        let table = compute_radii(&points_with(&engagement), &config);
        assert!(
            table
                .radii
                .iter()
                .all(|r| *r >= table.min_radius && *r <= table.max_radius)
        );
        assert_eq!(table.radii[996], table.max_radius);
    }

    #[test]
    fn alpha_scale_follows_point_count() {
        let config = PointStyleConfig::default();
        let sparse = compute_alpha_scale(100, &config);
        assert_eq!(sparse.base, 255);
        let reference = compute_alpha_scale(5000, &config);
        assert_eq!(reference.base, 180);
        assert_eq!(reference.selected, 244);
        assert_eq!(reference.dim, 50);
        let dense = compute_alpha_scale(250_000, &config);
        assert!(dense.base < reference.base && dense.base >= 10);
    }

    #[test]
    fn fill_alpha_by_selection_state() {
        let scale = AlphaScale {
            base: 100,
            selected: 164,
            dim: 28,
        };
        assert_eq!(scale.fill_alpha(SelectionState::Hidden, true, 1.0), 0);
        assert_eq!(scale.fill_alpha(SelectionState::Normal, true, 0.0), 255);
        assert_eq!(scale.fill_alpha(SelectionState::Selected, false, 0.0), 164);
        assert_eq!(scale.fill_alpha(SelectionState::NotSelected, false, 0.0), 28);
        assert_eq!(scale.fill_alpha(SelectionState::Normal, false, 0.0), 100);
        assert_eq!(scale.fill_alpha(SelectionState::Normal, false, 0.5), 132);
        assert_eq!(scale.fill_alpha(SelectionState::Normal, false, 7.0), 164);
    }
}
