//! Data-space <-> screen-space projection.
//!
//! Orthographic camera: one data unit spans `2^zoom` pixels, the view target
//! sits at the viewport center and data `y` grows upward (screen `y` grows
//! downward).

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ViewConfig};
use crate::ir::{DataBounds, Point};
use crate::weights::RadiusTable;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub zoom: f32,
    pub target: (f32, f32),
}

impl ViewState {
    pub fn new(zoom: f32, target: (f32, f32)) -> Self {
        Self { zoom, target }
    }

    pub fn scale(&self) -> f32 {
        self.zoom.exp2()
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(0.0, (0.0, 0.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoomBounds {
    pub min: f32,
    pub max: f32,
}

impl ZoomBounds {
    pub fn new(min: f32, max: f32) -> Result<Self, ConfigError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(ConfigError::InvalidZoomBounds { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn clamp(&self, zoom: f32) -> f32 {
        if zoom.is_finite() {
            zoom.clamp(self.min, self.max)
        } else {
            self.min
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub view: ViewState,
}

impl Viewport {
    pub fn new(width: f32, height: f32, view: ViewState) -> Self {
        Self {
            width: sanitize_extent(width),
            height: sanitize_extent(height),
            view,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width * 0.5, self.height * 0.5)
    }

    pub fn project(&self, position: (f32, f32)) -> (f32, f32) {
        let scale = self.view.scale();
        let (cx, cy) = self.center();
        (
            cx + (position.0 - self.view.target.0) * scale,
            cy - (position.1 - self.view.target.1) * scale,
        )
    }

    pub fn unproject(&self, screen: (f32, f32)) -> (f32, f32) {
        let scale = self.view.scale();
        let (cx, cy) = self.center();
        (
            self.view.target.0 + (screen.0 - cx) / scale,
            self.view.target.1 - (screen.1 - cy) / scale,
        )
    }

    /// Whether a screen position lies strictly within `margin` pixels of the
    /// viewport rectangle.
    pub fn within_margin(&self, screen: (f32, f32), margin: f32) -> bool {
        screen.0 > -margin
            && screen.0 < self.width + margin
            && screen.1 > -margin
            && screen.1 < self.height + margin
    }

    /// Distance from the viewport center as a fraction of the half-diagonal,
    /// clamped to `[0, 1]`.
    pub fn center_distance_fraction(&self, screen: (f32, f32)) -> f32 {
        let (cx, cy) = self.center();
        let half_diag = (cx * cx + cy * cy).sqrt();
        if half_diag <= 0.0 {
            return 1.0;
        }
        let d = ((screen.0 - cx).powi(2) + (screen.1 - cy).powi(2)).sqrt() / half_diag;
        if d.is_finite() { d.clamp(0.0, 1.0) } else { 1.0 }
    }

    /// Nearest visible point whose rendered circle, grown by `tolerance`
    /// pixels, contains `screen`. Ties go to the lowest index.
    pub fn hit_test(
        &self,
        points: &[Point],
        radii: &RadiusTable,
        screen: (f32, f32),
        tolerance: f32,
    ) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, point) in points.iter().enumerate() {
            if !point.selection.is_visible() {
                continue;
            }
            let (sx, sy) = self.project(point.position);
            let dist_sq = (sx - screen.0).powi(2) + (sy - screen.1).powi(2);
            if !dist_sq.is_finite() {
                continue;
            }
            let reach = radii.get(idx) + tolerance.max(0.0);
            if dist_sq > reach * reach {
                continue;
            }
            if best.is_none_or(|(_, best_sq)| dist_sq < best_sq) {
                best = Some((idx, dist_sq));
            }
        }
        best.map(|(idx, _)| idx)
    }
}

/// View that shows `bounds` with `padding` (fraction of the box size) on each
/// axis, zoom clamped to `zoom_bounds`.
pub fn fit_bounds(
    bounds: &DataBounds,
    width: f32,
    height: f32,
    zoom_bounds: &ZoomBounds,
    padding: f32,
) -> ViewState {
    let target = bounds.center();
    let pad = 1.0 + padding.max(0.0);
    let fit_w = bounds.width() * pad;
    let fit_h = bounds.height() * pad;
    let width = sanitize_extent(width);
    let height = sanitize_extent(height);

    let mut scale = f32::INFINITY;
    if fit_w > 0.0 && width > 0.0 {
        scale = scale.min(width / fit_w);
    }
    if fit_h > 0.0 && height > 0.0 {
        scale = scale.min(height / fit_h);
    }
    let zoom = if scale.is_finite() {
        zoom_bounds.clamp(scale.log2())
    } else {
        zoom_bounds.max
    };
    ViewState::new(zoom, target)
}

/// Host-facing camera state: read-back and fit commands over a clamped view.
#[derive(Debug, Clone)]
pub struct ViewController {
    view: ViewState,
    zoom_bounds: ZoomBounds,
    fit_padding: f32,
    size: (f32, f32),
}

impl ViewController {
    pub fn new(config: &ViewConfig, width: f32, height: f32) -> Result<Self, ConfigError> {
        let zoom_bounds = ZoomBounds::new(config.min_zoom, config.max_zoom)?;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ConfigError::InvalidViewport { width, height });
        }
        Ok(Self {
            view: ViewState::new(zoom_bounds.clamp(0.0), (0.0, 0.0)),
            zoom_bounds,
            fit_padding: config.fit_padding,
            size: (width, height),
        })
    }

    pub fn view_state(&self) -> ViewState {
        self.view
    }

    pub fn set_view_state(&mut self, view: ViewState) -> ViewState {
        let target = if view.target.0.is_finite() && view.target.1.is_finite() {
            view.target
        } else {
            self.view.target
        };
        self.view = ViewState::new(self.zoom_bounds.clamp(view.zoom), target);
        self.view
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.size = (sanitize_extent(width), sanitize_extent(height));
    }

    pub fn fit_to_bounds(&mut self, bounds: &DataBounds) -> ViewState {
        self.view = fit_bounds(
            bounds,
            self.size.0,
            self.size.1,
            &self.zoom_bounds,
            self.fit_padding,
        );
        self.view
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.size.0, self.size.1, self.view)
    }

    pub fn zoom_bounds(&self) -> ZoomBounds {
        self.zoom_bounds
    }
}

fn sanitize_extent(value: f32) -> f32 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}
