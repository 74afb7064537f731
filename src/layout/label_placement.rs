// Priority-ordered label placement with collision avoidance.
//
// Candidates are visited in descending priority. Each one tries a list of
// wrap/truncation variants from fullest to most compact and takes the first
// that clears every box accepted so far ("hard" label). Peripheral candidates
// that fail may still be drawn faintly as "soft" labels, which tolerate a few
// overlaps and never reserve space.
//
// Collision checks go through a uniform grid over accepted boxes, so a pass
// stays well below the O(n^2) linear-scan worst case at the default caps.

use std::collections::{HashMap, HashSet};

use crate::config::LabelConfig;
use crate::text_metrics::{FontSpec, TextMetrics};
use crate::viewport::Viewport;

use super::candidates::LabelCandidate;
use super::text::{fit_lines, measure_block};
use super::{LabelPass, PlacedLabel, PlacementBox, PlacementStats, TextBlock};

/// Accepted boxes of the current pass plus the soft-label and candidate
/// budgets already spent.
pub struct PlacementState {
    boxes: Vec<PlacementBox>,
    grid: ObstacleGrid,
    soft_count: usize,
    considered: usize,
}

impl PlacementState {
    pub fn new(cell: f32) -> Self {
        Self {
            boxes: Vec::new(),
            grid: ObstacleGrid::new(cell),
            soft_count: 0,
            considered: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn accepted(&self) -> &[PlacementBox] {
        &self.boxes
    }

    pub fn soft_count(&self) -> usize {
        self.soft_count
    }

    pub fn collides(&self, rect: &PlacementBox) -> bool {
        self.grid
            .query(rect)
            .any(|idx| self.boxes[idx].intersects(rect))
    }

    pub fn count_intersections(&self, rect: &PlacementBox) -> usize {
        self.grid
            .query(rect)
            .filter(|idx| self.boxes[*idx].intersects(rect))
            .count()
    }

    pub fn accept(&mut self, rect: PlacementBox) {
        self.grid.insert(self.boxes.len(), &rect);
        self.boxes.push(rect);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlacementOutcome {
    Hard(PlacedLabel),
    Soft(PlacedLabel),
    Rejected,
    SkippedOffscreen,
    SkippedEmpty,
    Capped,
}

/// Per-pass inputs shared by every candidate.
pub struct PlacementContext<'a, M: TextMetrics + ?Sized> {
    pub viewport: Viewport,
    pub config: &'a LabelConfig,
    pub font: &'a FontSpec,
    pub metrics: &'a M,
    /// Zoom above `config.reference_zoom`, floored at zero.
    pub relative_zoom: f32,
    pub width_cap: f32,
}

impl<'a, M: TextMetrics + ?Sized> PlacementContext<'a, M> {
    pub fn new(
        viewport: Viewport,
        config: &'a LabelConfig,
        font: &'a FontSpec,
        metrics: &'a M,
    ) -> Self {
        let relative_zoom = if viewport.view.zoom.is_finite() {
            (viewport.view.zoom - config.reference_zoom).max(0.0)
        } else {
            0.0
        };
        let width_cap = label_width_cap(viewport.width, relative_zoom, config);
        Self {
            viewport,
            config,
            font,
            metrics,
            relative_zoom,
            width_cap,
        }
    }
}

/// Run one layout pass. Identical inputs give identical output.
pub fn place_labels<M: TextMetrics + ?Sized>(
    candidates: &[LabelCandidate],
    viewport: Viewport,
    config: &LabelConfig,
    font: &FontSpec,
    metrics: &M,
) -> LabelPass {
    let mut pass = LabelPass::default();
    if viewport.is_empty() {
        pass.stats.skipped_offscreen = candidates.len();
        return pass;
    }
    let ctx = PlacementContext::new(viewport, config, font, metrics);
    let mut state = PlacementState::new(config.grid_cell);

    let mut order: Vec<usize> = (0..candidates.len()).collect();
    // Stable sort: equal priorities keep input order.
    order.sort_by(|&a, &b| candidates[b].priority.total_cmp(&candidates[a].priority));

    for idx in order {
        let outcome = place_candidate(&mut state, &candidates[idx], &ctx);
        record(&mut pass, outcome);
    }

    let stats = &pass.stats;
    tracing::debug!(
        considered = stats.considered,
        hard = stats.hard,
        soft = stats.soft,
        rejected = stats.rejected,
        skipped_offscreen = stats.skipped_offscreen,
        skipped_empty = stats.skipped_empty,
        capped = stats.capped,
        "label pass"
    );
    pass
}

fn record(pass: &mut LabelPass, outcome: PlacementOutcome) {
    let stats: &mut PlacementStats = &mut pass.stats;
    match outcome {
        PlacementOutcome::Hard(label) => {
            stats.hard += 1;
            pass.labels.push(label);
        }
        PlacementOutcome::Soft(label) => {
            stats.soft += 1;
            pass.labels.push(label);
        }
        PlacementOutcome::Rejected => stats.rejected += 1,
        PlacementOutcome::SkippedOffscreen => stats.skipped_offscreen += 1,
        PlacementOutcome::SkippedEmpty => stats.skipped_empty += 1,
        PlacementOutcome::Capped => stats.capped += 1,
    }
    stats.considered = stats.hard + stats.soft + stats.rejected;
}

/// Place a single candidate against the boxes accepted so far. Hard
/// placements are recorded in `state`; soft ones only spend soft budget.
pub fn place_candidate<M: TextMetrics + ?Sized>(
    state: &mut PlacementState,
    candidate: &LabelCandidate,
    ctx: &PlacementContext<'_, M>,
) -> PlacementOutcome {
    let config = ctx.config;
    let anchor = ctx.viewport.project(candidate.anchor);
    if !ctx.viewport.within_margin(anchor, config.offscreen_margin) {
        return PlacementOutcome::SkippedOffscreen;
    }
    if candidate.text.trim().is_empty() {
        return PlacementOutcome::SkippedEmpty;
    }
    if state.considered >= config.max_candidates {
        return PlacementOutcome::Capped;
    }
    state.considered += 1;

    let d01 = ctx.viewport.center_distance_fraction(anchor);
    let (fade_scale, fade_alpha) = fade_factors(d01, config);
    let font_size = label_font_size(candidate, fade_scale, config);
    let line_height_px = font_size * config.line_height;
    let line_options = line_options(state.is_empty(), ctx.relative_zoom, d01, config);
    let variants = layout_variants(candidate, font_size, &line_options, ctx);
    if variants.is_empty() {
        return PlacementOutcome::Rejected;
    }

    for block in &variants {
        let rect = label_box(anchor, block, config);
        if !state.collides(&rect) {
            state.accept(rect);
            return PlacementOutcome::Hard(placed_label(
                candidate,
                block,
                anchor,
                font_size,
                line_height_px,
                config.text_alpha * fade_alpha,
                config.background_alpha * fade_alpha,
                false,
                rect,
            ));
        }
    }

    if !config.soft_labels
        || state.soft_count >= config.max_soft_labels
        || d01 < config.soft_min_distance
    {
        return PlacementOutcome::Rejected;
    }
    let Some(compact) = variants
        .iter()
        .min_by(|a, b| a.area().total_cmp(&b.area()))
    else {
        return PlacementOutcome::Rejected;
    };
    let rect = label_box(anchor, compact, config);
    let hits = state.count_intersections(&rect);
    if hits > config.soft_max_intersections {
        return PlacementOutcome::Rejected;
    }
    state.soft_count += 1;
    let crowding = 1.0 + hits as f32 * config.soft_alpha_penalty;
    let soft_alpha = fade_alpha * config.soft_alpha_scale / crowding;
    PlacementOutcome::Soft(placed_label(
        candidate,
        compact,
        anchor,
        font_size,
        line_height_px,
        config.text_alpha * soft_alpha,
        config.background_alpha * soft_alpha,
        true,
        rect,
    ))
}

#[allow(clippy::too_many_arguments)]
fn placed_label(
    candidate: &LabelCandidate,
    block: &TextBlock,
    position: (f32, f32),
    font_size_px: f32,
    line_height_px: f32,
    text_alpha: f32,
    background_alpha: f32,
    is_soft: bool,
    bounds: PlacementBox,
) -> PlacedLabel {
    PlacedLabel {
        cluster: candidate.cluster.clone(),
        layer: candidate.layer,
        display_text: block.text(),
        lines: block.lines.clone(),
        full_text: candidate.text.clone(),
        font_size_px,
        line_height_px,
        position,
        text_alpha: text_alpha.clamp(0.0, 1.0),
        background_alpha: background_alpha.clamp(0.0, 1.0),
        is_soft,
        bounds,
    }
}

pub(crate) fn label_box(center: (f32, f32), block: &TextBlock, config: &LabelConfig) -> PlacementBox {
    PlacementBox::around(
        center,
        block.width * 0.5 + config.padding_x + config.collision_margin,
        block.height * 0.5 + config.padding_y + config.collision_margin,
    )
}

/// Font-size and alpha multipliers that shrink toward the configured floors
/// as the anchor moves away from the viewport center.
pub(crate) fn fade_factors(d01: f32, config: &LabelConfig) -> (f32, f32) {
    let start = config.fade_start.clamp(0.0, 0.99);
    let t = ((d01 - start) / (1.0 - start)).clamp(0.0, 1.0);
    (
        1.0 - (1.0 - config.fade_min_scale) * t,
        1.0 - (1.0 - config.fade_min_alpha) * t,
    )
}

pub(crate) fn label_font_size(candidate: &LabelCandidate, fade_scale: f32, config: &LabelConfig) -> f32 {
    let count_term = config.count_font_gain * ((candidate.member_count as f32) + 1.0).log10();
    let layer_term = if config.hierarchical_sizing {
        config.layer_font_step * candidate.layer as f32
    } else {
        0.0
    };
    // max/min rather than clamp: clamp panics on inverted or NaN bounds.
    ((config.base_font_px + layer_term + count_term) * fade_scale)
        .max(config.min_font_px)
        .min(config.max_font_px)
}

pub(crate) fn label_width_cap(viewport_width: f32, relative_zoom: f32, config: &LabelConfig) -> f32 {
    let lo = config.min_label_width.min(config.max_label_width);
    (viewport_width * config.label_width_ratio * (1.0 + config.zoom_width_gain * relative_zoom))
        .max(lo)
        .min(config.max_label_width)
}

/// Line caps to try, fullest first. `None` (unlimited) is offered only on an
/// empty canvas or for a near-center candidate at high zoom.
pub(crate) fn line_options(
    canvas_empty: bool,
    relative_zoom: f32,
    d01: f32,
    config: &LabelConfig,
) -> Vec<Option<usize>> {
    let mut options = Vec::new();
    if canvas_empty || (relative_zoom >= config.high_zoom && d01 <= config.near_center) {
        options.push(None);
    }
    let step = config.zoom_lines_step.max(f32::EPSILON);
    let extra = (relative_zoom / step).floor().max(0.0) as usize;
    let cap = (config.base_max_lines + extra)
        .min(config.max_lines_limit)
        .max(1);
    options.extend((1..=cap).rev().map(Some));
    options
}

fn layout_variants<M: TextMetrics + ?Sized>(
    candidate: &LabelCandidate,
    font_size: f32,
    line_options: &[Option<usize>],
    ctx: &PlacementContext<'_, M>,
) -> Vec<TextBlock> {
    let config = ctx.config;
    let mut variants: Vec<TextBlock> = Vec::new();
    for max_lines in line_options {
        for fraction in &config.width_fractions {
            let max_width = ctx.width_cap * fraction;
            let lines = fit_lines(
                &candidate.text,
                max_width,
                *max_lines,
                font_size,
                ctx.font,
                ctx.metrics,
            );
            if lines.is_empty() || variants.iter().any(|existing| existing.lines == lines) {
                continue;
            }
            variants.push(measure_block(
                lines,
                font_size,
                config.line_height,
                ctx.font,
                ctx.metrics,
            ));
        }
    }
    variants
}

/// Uniform grid over accepted boxes for overlap queries.
struct ObstacleGrid {
    cell: f32,
    /// Maps grid cell (ix, iy) to indices into the accepted box list.
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl ObstacleGrid {
    fn new(cell: f32) -> Self {
        let cell = if cell.is_finite() { cell.max(16.0) } else { 64.0 };
        Self {
            cell,
            cells: HashMap::new(),
        }
    }

    fn cell_range(&self, rect: &PlacementBox) -> (i32, i32, i32, i32) {
        (
            (rect.x0 / self.cell).floor() as i32,
            (rect.y0 / self.cell).floor() as i32,
            (rect.x1 / self.cell).floor() as i32,
            (rect.y1 / self.cell).floor() as i32,
        )
    }

    fn insert(&mut self, idx: usize, rect: &PlacementBox) {
        let (x0, y0, x1, y1) = self.cell_range(rect);
        for ix in x0..=x1 {
            for iy in y0..=y1 {
                self.cells.entry((ix, iy)).or_default().push(idx);
            }
        }
    }

    /// Indices of boxes that could overlap `rect`, each reported once.
    fn query(&self, rect: &PlacementBox) -> impl Iterator<Item = usize> + '_ {
        let (x0, y0, x1, y1) = self.cell_range(rect);
        let mut seen = HashSet::new();
        (x0..=x1)
            .flat_map(move |ix| (y0..=y1).map(move |iy| (ix, iy)))
            .flat_map(move |key| {
                self.cells
                    .get(&key)
                    .map(|v| v.as_slice())
                    .unwrap_or(&[])
                    .iter()
                    .copied()
            })
            .filter(move |idx| seen.insert(*idx))
    }
}
