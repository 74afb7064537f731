//! Property-based invariants for the layout core:
//!
//! 1. Wrapped lines fit the width (one-character floor for long tokens).
//! 2. Truncation is idempotent.
//! 3. Hard labels never overlap.
//! 4. A pass is a pure function of its inputs.
//! 5. Radii stay in bounds and are monotone in engagement.
//! 6. Fitting a box keeps its corners on screen.

use proptest::prelude::*;
use scatter_labels::config::{LabelConfig, PointStyleConfig};
use scatter_labels::ir::{DataBounds, Point};
use scatter_labels::layout::{LabelCandidate, place_labels, truncate_text, wrap_text};
use scatter_labels::text_metrics::{FontSpec, HeuristicMetrics, TextMetrics};
use scatter_labels::viewport::{ViewState, Viewport, ZoomBounds, fit_bounds};
use scatter_labels::weights::compute_radii;

// ── Helpers ─────────────────────────────────────────────────────────────

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-zA-Z0-9/:.é]{1,40}", 0..12).prop_map(|words| words.join(" "))
}

fn candidate_strategy() -> impl Strategy<Value = LabelCandidate> {
    (
        0i64..1000,
        text_strategy(),
        0u32..5,
        0u64..5000,
        -500.0f32..500.0,
        -400.0f32..400.0,
    )
        .prop_map(|(cluster, text, layer, count, x, y)| {
            LabelCandidate::new(cluster, &text, layer, count, (x, y))
        })
}

fn pass_inputs() -> impl Strategy<Value = (Vec<LabelCandidate>, f32, f32, f32)> {
    (
        prop::collection::vec(candidate_strategy(), 0..80),
        -1.0f32..3.0,
        200.0f32..1600.0,
        200.0f32..1000.0,
    )
}

fn run_pass(candidates: &[LabelCandidate], zoom: f32, width: f32, height: f32) -> scatter_labels::LabelPass {
    place_labels(
        candidates,
        Viewport::new(width, height, ViewState::new(zoom, (0.0, 0.0))),
        &LabelConfig::default(),
        &FontSpec::default(),
        &HeuristicMetrics::default(),
    )
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Width bound
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn wrapped_lines_fit_width(text in text_strategy(), max_width in 4.0f32..400.0, size in 8.0f32..30.0) {
        let metrics = HeuristicMetrics::default();
        let font = FontSpec::default();
        for line in wrap_text(&text, max_width, size, &font, &metrics) {
            let width = metrics.measure(&line, &font, size);
            prop_assert!(
                width <= max_width || line.chars().count() == 1,
                "line {:?} is {} wide, limit {}", line, width, max_width
            );
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Truncation idempotence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn truncation_is_idempotent(text in text_strategy(), max_width in 1.0f32..300.0, size in 8.0f32..30.0) {
        let metrics = HeuristicMetrics::default();
        let font = FontSpec::default();
        let once = truncate_text(&text, max_width, size, &font, &metrics, false);
        let twice = truncate_text(&once, max_width, size, &font, &metrics, false);
        prop_assert_eq!(once, twice);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. No-overlap among hard labels
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn hard_labels_never_overlap((candidates, zoom, width, height) in pass_inputs()) {
        let pass = run_pass(&candidates, zoom, width, height);
        let hard: Vec<_> = pass.hard_labels().collect();
        for (i, a) in hard.iter().enumerate() {
            for b in &hard[i + 1..] {
                prop_assert!(!a.bounds.intersects(&b.bounds), "{:?} overlaps {:?}", a.bounds, b.bounds);
            }
        }
        let stats = pass.stats;
        prop_assert_eq!(stats.hard + stats.soft, pass.labels.len());
        prop_assert_eq!(
            stats.considered + stats.skipped_offscreen + stats.skipped_empty + stats.capped,
            candidates.len()
        );
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Determinism
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn passes_are_deterministic((candidates, zoom, width, height) in pass_inputs()) {
        let first = run_pass(&candidates, zoom, width, height);
        let second = run_pass(&candidates, zoom, width, height);
        prop_assert_eq!(first, second);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Radius bounds and monotonicity
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn radii_bounded_and_monotone(engagement in prop::collection::vec(0.0f32..1_000_000.0, 1..300)) {
        let points: Vec<Point> = engagement
            .iter()
            .map(|value| Point::new(0.0, 0.0).with_engagement(*value))
            .collect();
        let radii = compute_radii(&points, &PointStyleConfig::default());
        for radius in &radii.radii {
            prop_assert!(*radius >= radii.min_radius && *radius <= radii.max_radius);
        }
        for (a, ea) in engagement.iter().enumerate() {
            for (b, eb) in engagement.iter().enumerate() {
                if ea > eb {
                    prop_assert!(radii.get(a) >= radii.get(b), "e {} > {} but r {} < {}", ea, eb, radii.get(a), radii.get(b));
                }
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Fit to bounds
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn fitted_bounds_stay_on_screen(
        x in -1000.0f32..1000.0,
        y in -1000.0f32..1000.0,
        w in 0.01f32..1000.0,
        h in 0.01f32..1000.0,
        vw in 100.0f32..2000.0,
        vh in 100.0f32..2000.0,
    ) {
        let bounds = DataBounds::new(x, y, x + w, y + h);
        let zoom_bounds = ZoomBounds::new(-6.0, 12.0).unwrap();
        let view = fit_bounds(&bounds, vw, vh, &zoom_bounds, 0.2);
        let viewport = Viewport::new(vw, vh, view);
        for corner in [(bounds.min_x, bounds.min_y), (bounds.max_x, bounds.max_y)] {
            let (sx, sy) = viewport.project(corner);
            prop_assert!(sx >= -0.5 && sx <= vw + 0.5, "x {} outside 0..{}", sx, vw);
            prop_assert!(sy >= -0.5 && sy <= vh + 0.5, "y {} outside 0..{}", sy, vh);
        }
    }
}
