use scatter_labels::config::parse_config;
use scatter_labels::ir::{DataBounds, LabelDescriptor, Point, PointRecord};
use scatter_labels::layout_dump::SceneDump;
use scatter_labels::{Config, HeuristicMetrics, ViewController, ViewState, Viewport, compute_scene};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneOptions {
    width: Option<f32>,
    height: Option<f32>,
    zoom: Option<f32>,
    target: Option<(f32, f32)>,
    include_radii: Option<bool>,
    /// Same shape as the CLI config file.
    config: Option<serde_json::Value>,
}

fn build_config(options: &SceneOptions) -> Result<Config, String> {
    let mut config = match &options.config {
        Some(value) => parse_config(&value.to_string()).map_err(|error| format!("{error:#}"))?,
        None => Config::default(),
    };
    if let Some(width) = options.width {
        config.render.width = width;
    }
    if let Some(height) = options.height {
        config.render.height = height;
    }
    config.validate().map_err(|error| error.to_string())?;
    Ok(config)
}

fn layout_scene_json(points_json: &str, labels_json: &str, options: SceneOptions) -> Result<String, String> {
    let mut config = build_config(&options)?;
    let records: Vec<PointRecord> = serde_json::from_str(points_json).map_err(|error| error.to_string())?;
    let points: Vec<Point> = records.into_iter().map(Point::from).collect();
    let labels: Vec<LabelDescriptor> = serde_json::from_str(labels_json).map_err(|error| error.to_string())?;

    let mut controller = ViewController::new(&config.view, config.render.width, config.render.height)
        .map_err(|error| error.to_string())?;
    let fitted = DataBounds::from_points(&points).map(|bounds| controller.fit_to_bounds(&bounds));
    if let Some(fitted) = fitted {
        config.labels.reference_zoom = fitted.zoom;
    }
    let base = fitted.unwrap_or_default();
    let view = controller.set_view_state(ViewState::new(
        options.zoom.unwrap_or(base.zoom),
        options.target.unwrap_or(base.target),
    ));

    // Browser hosts have no font database here; the heuristic keeps output
    // identical across platforms.
    let viewport = Viewport::new(config.render.width, config.render.height, view);
    let scene = compute_scene(&points, &labels, viewport, &config, &HeuristicMetrics::default());
    SceneDump::from_scene(&scene, options.include_radii.unwrap_or(false))
        .to_json()
        .map_err(|error| error.to_string())
}

#[wasm_bindgen]
pub fn layout_scene(points_json: &str, labels_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<SceneOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        SceneOptions::default()
    };
    layout_scene_json(points_json, labels_json, options).map_err(|error| JsValue::from_str(&error))
}

#[cfg(test)]
mod tests {
    use crate::{SceneOptions, layout_scene_json};

    #[test]
    fn lays_out_labels_from_upstream_rows() {
        let points = r#"[
            {"x": -1.0, "y": -1.0, "favorites": 4, "retweets": 1},
            {"x": 1.0, "y": 1.0},
            {"x": 0.5, "y": -0.5, "selection": "selected"}
        ]"#;
        let labels = r#"[
            {"cluster": "0_0", "label": "Rust tooling", "layer": 0, "count": 2, "hull": [0, 1]},
            {"cluster": "unknown", "label": "  ", "layer": 0, "count": 1}
        ]"#;
        let options = SceneOptions {
            width: Some(800.0),
            height: Some(600.0),
            ..SceneOptions::default()
        };
        let json = layout_scene_json(points, labels, options).expect("scene should lay out");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["labels"].as_array().unwrap().len(), 1);
        assert_eq!(value["labels"][0]["fullText"], "Rust tooling");
        assert_eq!(value["stats"]["skippedEmpty"], 1);
        assert_eq!(value["radii"]["count"], 3);
    }

    #[test]
    fn rejects_inverted_zoom_bounds() {
        let options = SceneOptions {
            config: Some(serde_json::json!({"view": {"minZoom": 4, "maxZoom": 1}})),
            ..SceneOptions::default()
        };
        assert!(layout_scene_json("[]", "[]", options).is_err());
    }
}
