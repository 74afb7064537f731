use serde::Serialize;

use crate::ir::ClusterId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

impl TextBlock {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// Axis-aligned screen rectangle reserved by a label, padding and collision
/// margin included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacementBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PlacementBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn around(center: (f32, f32), half_width: f32, half_height: f32) -> Self {
        Self {
            x0: center.0 - half_width,
            y0: center.1 - half_height,
            x1: center.0 + half_width,
            y1: center.1 + half_height,
        }
    }

    /// Open-interval overlap: boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &PlacementBox) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLabel {
    pub cluster: ClusterId,
    pub layer: u32,
    /// Wrapped/truncated text, lines joined by `\n`.
    pub display_text: String,
    pub lines: Vec<String>,
    pub full_text: String,
    pub font_size_px: f32,
    pub line_height_px: f32,
    /// Center of the label block in screen pixels.
    pub position: (f32, f32),
    pub text_alpha: f32,
    pub background_alpha: f32,
    pub is_soft: bool,
    pub bounds: PlacementBox,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementStats {
    pub considered: usize,
    pub hard: usize,
    pub soft: usize,
    pub rejected: usize,
    pub skipped_offscreen: usize,
    pub skipped_empty: usize,
    pub capped: usize,
}

/// Output of one layout pass, in placement (priority) order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelPass {
    pub labels: Vec<PlacedLabel>,
    pub stats: PlacementStats,
}

impl LabelPass {
    pub fn hard_labels(&self) -> impl Iterator<Item = &PlacedLabel> {
        self.labels.iter().filter(|label| !label.is_soft)
    }

    pub fn soft_labels(&self) -> impl Iterator<Item = &PlacedLabel> {
        self.labels.iter().filter(|label| label.is_soft)
    }
}
