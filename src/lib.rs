#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod text_metrics;
pub mod theme;
pub mod viewport;
pub mod weights;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, ConfigError, LabelConfig, PointStyleConfig, load_config, parse_config};
pub use ir::{ClusterId, DataBounds, LabelDescriptor, Point, SelectionState};
pub use layout::{
    LabelCandidate, LabelPass, LayoutSession, PlacedLabel, Scene, build_candidates, compute_scene,
    place_labels,
};
pub use text_metrics::{FontMetrics, FontSpec, HeuristicMetrics, MeasureCache, TextMetrics};
pub use viewport::{ViewController, ViewState, Viewport, ZoomBounds, fit_bounds};
pub use weights::{AlphaScale, RadiusTable, compute_alpha_scale, compute_radii};
