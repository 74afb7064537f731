use crate::ir::ClusterId;
use crate::layout::{PlacementStats, Scene};
use crate::viewport::ViewState;
use crate::weights::AlphaScale;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDump {
    pub width: f32,
    pub height: f32,
    pub view: ViewState,
    pub alpha: AlphaScale,
    pub radii: RadiiDump,
    pub labels: Vec<LabelDump>,
    pub stats: PlacementStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadiiDump {
    pub count: usize,
    pub base: f32,
    pub min: f32,
    pub max: f32,
    /// Largest radius actually assigned.
    pub largest: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDump {
    pub cluster: ClusterId,
    pub layer: u32,
    pub text: String,
    pub full_text: String,
    pub lines: Vec<String>,
    pub font_size: f32,
    pub x: f32,
    pub y: f32,
    pub text_alpha: f32,
    pub background_alpha: f32,
    pub soft: bool,
    pub bounds: [f32; 4],
}

impl SceneDump {
    pub fn from_scene(scene: &Scene, include_radii: bool) -> Self {
        let radii = &scene.radii;
        let largest = radii.radii.iter().copied().fold(0.0, f32::max);
        let labels = scene
            .labels
            .labels
            .iter()
            .map(|label| LabelDump {
                cluster: label.cluster.clone(),
                layer: label.layer,
                text: label.display_text.clone(),
                full_text: label.full_text.clone(),
                lines: label.lines.clone(),
                font_size: label.font_size_px,
                x: label.position.0,
                y: label.position.1,
                text_alpha: label.text_alpha,
                background_alpha: label.background_alpha,
                soft: label.is_soft,
                bounds: [
                    label.bounds.x0,
                    label.bounds.y0,
                    label.bounds.x1,
                    label.bounds.y1,
                ],
            })
            .collect();

        SceneDump {
            width: scene.viewport.width,
            height: scene.viewport.height,
            view: scene.viewport.view,
            alpha: scene.alpha,
            radii: RadiiDump {
                count: radii.len(),
                base: radii.base_radius,
                min: radii.min_radius,
                max: radii.max_radius,
                largest,
                values: include_radii.then(|| radii.radii.clone()),
            },
            labels,
            stats: scene.labels.stats,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Write the dump as pretty JSON to `path`, or stdout when `None`.
pub fn write_scene_dump(path: Option<&Path>, scene: &Scene, include_radii: bool) -> anyhow::Result<()> {
    let dump = SceneDump::from_scene(scene, include_radii);
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
