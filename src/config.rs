use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid zoom bounds: minZoom {min} must not exceed maxZoom {max}")]
    InvalidZoomBounds { min: f32, max: f32 },
    #[error("invalid viewport size {width}x{height}")]
    InvalidViewport { width: f32, height: f32 },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PointStyleConfig {
    pub point_scale: f32,
    pub opacity: f32,
    pub selected_alpha_delta: u8,
    pub dim_factor: f32,
    pub dim_alpha_floor: u8,
    pub dim_alpha_ceiling: u8,
    pub min_radius_multiplier: f32,
    pub max_radius_multiplier: f32,
    /// Share of the magnitude term in the magnitude/rank blend.
    pub magnitude_weight: f32,
    pub max_sample_size: usize,
}

impl Default for PointStyleConfig {
    fn default() -> Self {
        Self {
            point_scale: 1.0,
            opacity: 1.0,
            selected_alpha_delta: 64,
            dim_factor: 0.28,
            dim_alpha_floor: 8,
            dim_alpha_ceiling: 96,
            min_radius_multiplier: 0.8,
            max_radius_multiplier: 2.5,
            magnitude_weight: 0.55,
            max_sample_size: 50_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelConfig {
    pub max_candidates: usize,
    pub max_soft_labels: usize,
    pub offscreen_margin: f32,
    pub soft_labels: bool,
    pub soft_min_distance: f32,
    pub soft_max_intersections: usize,
    pub soft_alpha_penalty: f32,
    pub soft_alpha_scale: f32,
    pub hierarchical_sizing: bool,
    pub outline: bool,
    pub min_font_px: f32,
    pub max_font_px: f32,
    pub base_font_px: f32,
    pub layer_font_step: f32,
    pub count_font_gain: f32,
    pub fade_start: f32,
    pub fade_min_scale: f32,
    pub fade_min_alpha: f32,
    pub text_alpha: f32,
    pub background_alpha: f32,
    pub line_height: f32,
    pub padding_x: f32,
    pub padding_y: f32,
    pub collision_margin: f32,
    pub width_fractions: Vec<f32>,
    pub label_width_ratio: f32,
    pub min_label_width: f32,
    pub max_label_width: f32,
    /// Zoom level treated as "fully zoomed out" when growing label width and
    /// line budgets.
    pub reference_zoom: f32,
    pub zoom_width_gain: f32,
    pub base_max_lines: usize,
    pub max_lines_limit: usize,
    pub zoom_lines_step: f32,
    pub high_zoom: f32,
    pub near_center: f32,
    pub grid_cell: f32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            max_candidates: 1500,
            max_soft_labels: 400,
            offscreen_margin: 200.0,
            soft_labels: true,
            soft_min_distance: 0.55,
            soft_max_intersections: 2,
            soft_alpha_penalty: 0.75,
            soft_alpha_scale: 0.6,
            hierarchical_sizing: true,
            outline: false,
            min_font_px: 10.0,
            max_font_px: 26.0,
            base_font_px: 11.0,
            layer_font_step: 2.5,
            count_font_gain: 1.2,
            fade_start: 0.15,
            fade_min_scale: 0.88,
            fade_min_alpha: 0.35,
            text_alpha: 0.95,
            background_alpha: 0.72,
            line_height: 1.2,
            padding_x: 4.0,
            padding_y: 2.0,
            collision_margin: 3.0,
            width_fractions: vec![1.0, 0.9, 0.8, 0.7],
            label_width_ratio: 0.22,
            min_label_width: 96.0,
            max_label_width: 280.0,
            reference_zoom: 0.0,
            zoom_width_gain: 0.12,
            base_max_lines: 2,
            max_lines_limit: 4,
            zoom_lines_step: 2.0,
            high_zoom: 2.0,
            near_center: 0.3,
            grid_cell: 64.0,
        }
    }
}

impl LabelConfig {
    /// Every numeric setting must be finite and inside its range (JSON5
    /// also parses `NaN` and `Infinity`).
    pub fn validate(&self) -> Result<(), ConfigError> {
        at_least("labels.offscreenMargin", self.offscreen_margin, 0.0)?;
        unit_range("labels.softMinDistance", self.soft_min_distance)?;
        at_least("labels.softAlphaPenalty", self.soft_alpha_penalty, 0.0)?;
        unit_range("labels.softAlphaScale", self.soft_alpha_scale)?;

        positive("labels.minFontPx", self.min_font_px)?;
        at_least("labels.maxFontPx", self.max_font_px, self.min_font_px)?;
        finite("labels.baseFontPx", self.base_font_px)?;
        at_least("labels.layerFontStep", self.layer_font_step, 0.0)?;
        at_least("labels.countFontGain", self.count_font_gain, 0.0)?;

        unit_range("labels.fadeStart", self.fade_start)?;
        unit_range("labels.fadeMinScale", self.fade_min_scale)?;
        unit_range("labels.fadeMinAlpha", self.fade_min_alpha)?;
        unit_range("labels.textAlpha", self.text_alpha)?;
        unit_range("labels.backgroundAlpha", self.background_alpha)?;

        positive("labels.lineHeight", self.line_height)?;
        at_least("labels.paddingX", self.padding_x, 0.0)?;
        at_least("labels.paddingY", self.padding_y, 0.0)?;
        at_least("labels.collisionMargin", self.collision_margin, 0.0)?;
        if self.width_fractions.is_empty()
            || self
                .width_fractions
                .iter()
                .any(|f| !(f.is_finite() && *f > 0.0 && *f <= 1.0))
        {
            return Err(invalid(
                "labels.widthFractions",
                "must be a non-empty list of fractions in (0, 1]",
            ));
        }
        at_least("labels.labelWidthRatio", self.label_width_ratio, 0.0)?;
        positive("labels.minLabelWidth", self.min_label_width)?;
        at_least("labels.maxLabelWidth", self.max_label_width, self.min_label_width)?;

        finite("labels.referenceZoom", self.reference_zoom)?;
        at_least("labels.zoomWidthGain", self.zoom_width_gain, 0.0)?;
        positive("labels.zoomLinesStep", self.zoom_lines_step)?;
        finite("labels.highZoom", self.high_zoom)?;
        unit_range("labels.nearCenter", self.near_center)?;
        positive("labels.gridCell", self.grid_cell)?;
        if self.base_max_lines == 0 {
            return Err(invalid("labels.baseMaxLines", "must be at least 1"));
        }
        Ok(())
    }
}

impl PointStyleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("points.pointScale", self.point_scale)?;
        at_least("points.opacity", self.opacity, 0.0)?;
        unit_range("points.dimFactor", self.dim_factor)?;
        if self.dim_alpha_floor > self.dim_alpha_ceiling {
            return Err(invalid(
                "points.dimAlphaFloor",
                "must not exceed dimAlphaCeiling",
            ));
        }
        at_least("points.minRadiusMultiplier", self.min_radius_multiplier, 0.0)?;
        positive("points.maxRadiusMultiplier", self.max_radius_multiplier)?;
        unit_range("points.magnitudeWeight", self.magnitude_weight)?;
        if self.max_sample_size == 0 {
            return Err(invalid("points.maxSampleSize", "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub fit_padding: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            min_zoom: -6.0,
            max_zoom: 12.0,
            fit_padding: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
    pub hulls: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
            hulls: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub points: PointStyleConfig,
    pub labels: LabelConfig,
    pub view: ViewConfig,
    pub render: RenderConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        crate::viewport::ZoomBounds::new(self.view.min_zoom, self.view.max_zoom)?;
        let (width, height) = (self.render.width, self.render.height);
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ConfigError::InvalidViewport { width, height });
        }
        at_least("view.fitPadding", self.view.fit_padding, 0.0)?;
        self.points.validate()?;
        self.labels.validate()
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, "must be a finite number"))
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive number"))
    }
}

fn at_least(field: &'static str, value: f32, min: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("must be a finite number of at least {min}"),
        })
    }
}

fn unit_range(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, "must lie in [0, 1]"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_weight: Option<u16>,
    label_text_color: Option<String>,
    label_background: Option<String>,
    label_outline_color: Option<String>,
    point_color: Option<String>,
    selected_point_color: Option<String>,
    hull_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    points: Option<PointStyleConfig>,
    labels: Option<LabelConfig>,
    view: Option<ViewConfig>,
    render: Option<RenderConfig>,
}

/// Load a JSON/JSON5 configuration file on top of the defaults and validate
/// it. Invalid configuration fails here, before any layout pass runs.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match Theme::from_name(theme_name) {
            Some(theme) => config.theme = theme,
            None => tracing::warn!(theme = theme_name, "unknown theme, keeping default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_weight {
            config.theme.font_weight = v;
        }
        if let Some(v) = vars.label_text_color {
            config.theme.label_text_color = v;
        }
        if let Some(v) = vars.label_background {
            config.theme.label_background = v;
        }
        if let Some(v) = vars.label_outline_color {
            config.theme.label_outline_color = v;
        }
        if let Some(v) = vars.point_color {
            config.theme.point_color = v;
        }
        if let Some(v) = vars.selected_point_color {
            config.theme.selected_point_color = v;
        }
        if let Some(v) = vars.hull_color {
            config.theme.hull_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
    }

    if let Some(points) = parsed.points {
        config.points = points;
    }
    if let Some(labels) = parsed.labels {
        config.labels = labels;
    }
    if let Some(view) = parsed.view {
        config.view = view;
    }
    let explicit_background = parsed
        .render
        .as_ref()
        .is_some_and(|render| render.background != RenderConfig::default().background);
    if let Some(render) = parsed.render {
        config.render = render;
    }
    if !explicit_background {
        config.render.background = config.theme.background.clone();
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn partial_sections_overlay_defaults() {
        let config = parse_config(
            r#"{
                // json5 comments are accepted
                theme: "dark",
                labels: { maxCandidates: 200, softLabels: false },
                points: { pointScale: 1.5 },
            }"#,
        )
        .unwrap();
        assert_eq!(config.labels.max_candidates, 200);
        assert!(!config.labels.soft_labels);
        assert_eq!(config.labels.max_soft_labels, 400);
        assert_eq!(config.points.point_scale, 1.5);
        assert_eq!(config.render.background, Theme::dark().background);
    }

    #[test]
    fn theme_variables_override_preset() {
        let config =
            parse_config(r#"{"themeVariables": {"fontFamily": "Lato", "fontWeight": 700}}"#)
                .unwrap();
        assert_eq!(config.theme.font_family, "Lato");
        assert_eq!(config.theme.font_weight, 700);
    }

    #[test]
    fn inverted_zoom_bounds_fail_fast() {
        let err = parse_config(r#"{"view": {"minZoom": 5, "maxZoom": 1}}"#).unwrap_err();
        let err = err.downcast::<ConfigError>().unwrap();
        assert_eq!(err, ConfigError::InvalidZoomBounds { min: 5.0, max: 1.0 });
    }

    #[test]
    fn bad_label_settings_are_rejected() {
        assert!(parse_config(r#"{"labels": {"widthFractions": []}}"#).is_err());
        assert!(parse_config(r#"{"labels": {"minFontPx": 30, "maxFontPx": 20}}"#).is_err());
        assert!(parse_config(r#"{"render": {"width": 0}}"#).is_err());
    }

    #[test]
    fn non_finite_and_out_of_range_numbers_are_rejected() {
        let rejected_field = |source: &str| match parse_config(source)
            .unwrap_err()
            .downcast::<ConfigError>()
            .unwrap()
        {
            ConfigError::InvalidValue { field, .. } => field,
            other => panic!("unexpected error {other:?}"),
        };
        assert_eq!(
            rejected_field("{labels: {maxLabelWidth: NaN}}"),
            "labels.maxLabelWidth"
        );
        assert_eq!(
            rejected_field("{labels: {fadeMinScale: NaN, fadeStart: 0}}"),
            "labels.fadeMinScale"
        );
        assert_eq!(
            rejected_field("{labels: {offscreenMargin: Infinity}}"),
            "labels.offscreenMargin"
        );
        assert_eq!(
            rejected_field("{labels: {minLabelWidth: 300}}"),
            "labels.maxLabelWidth"
        );
        assert_eq!(rejected_field("{labels: {minLabelWidth: 0}}"), "labels.minLabelWidth");
        assert_eq!(rejected_field("{labels: {fadeMinAlpha: 1.5}}"), "labels.fadeMinAlpha");
        assert_eq!(rejected_field("{labels: {paddingX: -1}}"), "labels.paddingX");
        assert_eq!(
            rejected_field("{labels: {collisionMargin: -Infinity}}"),
            "labels.collisionMargin"
        );
        assert_eq!(
            rejected_field("{labels: {softAlphaPenalty: NaN}}"),
            "labels.softAlphaPenalty"
        );
        assert_eq!(rejected_field("{labels: {zoomLinesStep: 0}}"), "labels.zoomLinesStep");
        assert_eq!(rejected_field("{points: {dimFactor: 2}}"), "points.dimFactor");
        assert_eq!(
            rejected_field("{points: {maxRadiusMultiplier: NaN}}"),
            "points.maxRadiusMultiplier"
        );
        assert_eq!(rejected_field("{view: {fitPadding: -0.5}}"), "view.fitPadding");
    }

    #[test]
    fn in_range_overrides_still_load() {
        let config = parse_config(
            "{labels: {minLabelWidth: 4, maxLabelWidth: 4, fadeStart: 1, paddingX: 0}}",
        )
        .unwrap();
        assert_eq!(config.labels.max_label_width, 4.0);
        assert_eq!(config.labels.fade_start, 1.0);
    }
}
