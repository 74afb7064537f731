pub mod candidates;
pub mod label_placement;
pub mod text;
pub(crate) mod types;

pub use candidates::{LabelCandidate, build_candidates, label_priority};
pub use label_placement::{
    PlacementContext, PlacementOutcome, PlacementState, place_candidate, place_labels,
};
pub use text::{ELLIPSIS, fit_lines, normalize_label_text, truncate_text, wrap_text};
pub use types::*;

use crate::config::{Config, ConfigError};
use crate::ir::{DataBounds, LabelDescriptor, Point, ScreenPoint};
use crate::text_metrics::{FontSpec, TextMetrics};
use crate::viewport::{ViewController, ViewState, Viewport};
use crate::weights::{AlphaScale, RadiusTable, compute_alpha_scale, compute_radii};

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone)]
pub struct Scene {
    pub viewport: Viewport,
    pub radii: RadiusTable,
    pub alpha: AlphaScale,
    pub labels: LabelPass,
}

/// One-shot layout: normalize point weights and run a single label pass.
pub fn compute_scene<M: TextMetrics + ?Sized>(
    points: &[Point],
    descriptors: &[LabelDescriptor],
    viewport: Viewport,
    config: &Config,
    metrics: &M,
) -> Scene {
    let radii = compute_radii(points, &config.points);
    let alpha = compute_alpha_scale(points.len(), &config.points);
    let candidates = build_candidates(descriptors, points);
    let font = config.theme.font();
    let labels = place_labels(&candidates, viewport, &config.labels, &font, metrics);
    Scene {
        viewport,
        radii,
        alpha,
        labels,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PassKey {
    view: ViewState,
    width: f32,
    height: f32,
    candidates_revision: u64,
}

/// Long-lived layout state for an interactive host.
///
/// Radii are recomputed only when points change, candidates only when the
/// label set (or the points their hulls refer to) changes, and the label pass
/// only when the view, the viewport size or the candidates change.
pub struct LayoutSession<M> {
    config: Config,
    font: FontSpec,
    metrics: M,
    controller: ViewController,
    points: Vec<Point>,
    descriptors: Vec<LabelDescriptor>,
    candidates: Vec<LabelCandidate>,
    candidates_revision: u64,
    radii: RadiusTable,
    alpha: AlphaScale,
    pass: LabelPass,
    pass_key: Option<PassKey>,
    pass_count: usize,
}

impl<M: TextMetrics> LayoutSession<M> {
    pub fn new(config: Config, metrics: M) -> Result<Self, ConfigError> {
        config.validate()?;
        let controller = ViewController::new(&config.view, config.render.width, config.render.height)?;
        let radii = compute_radii(&[], &config.points);
        let alpha = compute_alpha_scale(0, &config.points);
        Ok(Self {
            font: config.theme.font(),
            config,
            metrics,
            controller,
            points: Vec::new(),
            descriptors: Vec::new(),
            candidates: Vec::new(),
            candidates_revision: 0,
            radii,
            alpha,
            pass: LabelPass::default(),
            pass_key: None,
            pass_count: 0,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn set_points(&mut self, points: Vec<Point>) {
        self.radii = compute_radii(&points, &self.config.points);
        self.alpha = compute_alpha_scale(points.len(), &self.config.points);
        self.points = points;
        let candidates = build_candidates(&self.descriptors, &self.points);
        self.replace_candidates(candidates);
    }

    pub fn set_labels(&mut self, descriptors: Vec<LabelDescriptor>) {
        self.descriptors = descriptors;
        let candidates = build_candidates(&self.descriptors, &self.points);
        self.replace_candidates(candidates);
    }

    fn replace_candidates(&mut self, candidates: Vec<LabelCandidate>) {
        if candidates != self.candidates {
            self.candidates = candidates;
            self.candidates_revision += 1;
        }
    }

    pub fn candidates(&self) -> &[LabelCandidate] {
        &self.candidates
    }

    pub fn radii(&self) -> &RadiusTable {
        &self.radii
    }

    pub fn alpha_scale(&self) -> AlphaScale {
        self.alpha
    }

    /// Fill alpha of point `idx`; unknown indices are treated as hidden.
    pub fn fill_alpha(&self, idx: usize, hovered: bool) -> u8 {
        match self.points.get(idx) {
            Some(point) => self
                .alpha
                .fill_alpha(point.selection, hovered, point.activation),
            None => 0,
        }
    }

    pub fn view_state(&self) -> ViewState {
        self.controller.view_state()
    }

    /// Apply a host-requested view; zoom is clamped to the configured bounds.
    pub fn set_view_state(&mut self, view: ViewState) -> ViewState {
        self.controller.set_view_state(view)
    }

    pub fn fit_to_bounds(&mut self, bounds: &DataBounds) -> ViewState {
        self.controller.fit_to_bounds(bounds)
    }

    /// Fit the view to all visible points. Returns `None` with no points.
    pub fn fit_to_points(&mut self) -> Option<ViewState> {
        let bounds = DataBounds::from_points(&self.points)?;
        Some(self.controller.fit_to_bounds(&bounds))
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.controller.resize(width, height);
    }

    pub fn viewport(&self) -> Viewport {
        self.controller.viewport()
    }

    pub fn hit_test(&self, screen: ScreenPoint, tolerance: f32) -> Option<usize> {
        self.viewport()
            .hit_test(&self.points, &self.radii, screen, tolerance)
    }

    /// Labels for the current view, recomputed only when an input changed.
    pub fn labels(&mut self) -> &LabelPass {
        let viewport = self.viewport();
        let key = PassKey {
            view: viewport.view,
            width: viewport.width,
            height: viewport.height,
            candidates_revision: self.candidates_revision,
        };
        if self.pass_key != Some(key) {
            self.pass = place_labels(
                &self.candidates,
                viewport,
                &self.config.labels,
                &self.font,
                &self.metrics,
            );
            self.pass_key = Some(key);
            self.pass_count += 1;
        }
        &self.pass
    }

    /// Number of label passes actually executed.
    pub fn pass_count(&self) -> usize {
        self.pass_count
    }

    pub fn scene(&mut self) -> Scene {
        let labels = self.labels().clone();
        Scene {
            viewport: self.viewport(),
            radii: self.radii.clone(),
            alpha: self.alpha,
            labels,
        }
    }
}
