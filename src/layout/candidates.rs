use serde::Serialize;

use crate::ir::{ClusterId, LabelDescriptor, Point};

use super::text::normalize_label_text;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCandidate {
    pub cluster: ClusterId,
    pub text: String,
    pub layer: u32,
    pub member_count: u64,
    /// Anchor in data space.
    pub anchor: (f32, f32),
    pub priority: f64,
}

impl LabelCandidate {
    pub fn new(
        cluster: impl Into<ClusterId>,
        text: &str,
        layer: u32,
        member_count: u64,
        anchor: (f32, f32),
    ) -> Self {
        Self {
            cluster: cluster.into(),
            text: normalize_label_text(text),
            layer,
            member_count,
            anchor,
            priority: label_priority(member_count, layer),
        }
    }
}

/// `member_count * 2^layer`: coarser and larger clusters are placed first.
pub fn label_priority(member_count: u64, layer: u32) -> f64 {
    member_count as f64 * 2f64.powi(layer.min(1023) as i32)
}

pub fn build_candidates(descriptors: &[LabelDescriptor], points: &[Point]) -> Vec<LabelCandidate> {
    descriptors
        .iter()
        .map(|desc| {
            LabelCandidate::new(
                desc.cluster.clone(),
                &desc.label,
                desc.layer,
                desc.count,
                resolve_anchor(desc, points),
            )
        })
        .collect()
}

/// Explicit finite centroid, else the mean of the valid hull members, else
/// the origin.
pub fn resolve_anchor(desc: &LabelDescriptor, points: &[Point]) -> (f32, f32) {
    if let (Some(x), Some(y)) = (desc.centroid_x, desc.centroid_y)
        && x.is_finite()
        && y.is_finite()
    {
        return (x, y);
    }
    hull_centroid(&desc.hull, points).unwrap_or((0.0, 0.0))
}

pub fn hull_centroid(hull: &[usize], points: &[Point]) -> Option<(f32, f32)> {
    let mut sum = (0.0f64, 0.0f64);
    let mut count = 0usize;
    for idx in hull {
        let Some(point) = points.get(*idx) else {
            continue;
        };
        let (x, y) = point.position;
        if !x.is_finite() || !y.is_finite() {
            continue;
        }
        sum.0 += x as f64;
        sum.1 += y as f64;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(((sum.0 / count as f64) as f32, (sum.1 / count as f64) as f32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_doubles_per_layer() {
        assert_eq!(label_priority(10, 0), 10.0);
        assert_eq!(label_priority(10, 3), 80.0);
        assert_eq!(label_priority(0, 5), 0.0);
    }

    #[test]
    fn explicit_centroid_wins() {
        let points = vec![Point::new(10.0, 10.0)];
        let desc = LabelDescriptor::new(1, "x", 0, 1)
            .at(1.0, 2.0)
            .with_hull(vec![0]);
        assert_eq!(resolve_anchor(&desc, &points), (1.0, 2.0));
    }

    #[test]
    fn hull_members_are_averaged() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 2.0),
            Point::new(f32::NAN, 9.0),
        ];
        let desc = LabelDescriptor::new(1, "x", 0, 3).with_hull(vec![0, 1, 2, 3, 99]);
        let (x, y) = resolve_anchor(&desc, &points);
        assert!((x - 8.0 / 3.0).abs() < 1e-5);
        assert!((y - 2.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn missing_geometry_falls_back_to_origin() {
        let mut desc = LabelDescriptor::new("unknown", "Unclustered", 0, 5).with_hull(vec![7]);
        desc.centroid_x = Some(f32::INFINITY);
        desc.centroid_y = Some(1.0);
        assert_eq!(resolve_anchor(&desc, &[]), (0.0, 0.0));
    }

    #[test]
    fn build_normalizes_text() {
        let candidates = build_candidates(
            &[LabelDescriptor::new(2, "  Rust <br> tooling ", 1, 4).at(0.5, 0.5)],
            &[],
        );
        assert_eq!(candidates[0].text, "Rust tooling");
        assert_eq!(candidates[0].priority, 8.0);
    }
}
