use crate::config::{Config, RenderConfig};
use crate::ir::{LabelDescriptor, Point, SelectionState};
use crate::layout::{PlacedLabel, Scene};
use crate::theme::Theme;
use anyhow::Result;
use std::fmt::Write as _;
use std::path::Path;

/// Draw a scene: background, optional hull outlines, points, then labels in
/// placement order (soft labels included, at their reduced alpha).
pub fn render_svg(
    scene: &Scene,
    points: &[Point],
    descriptors: &[LabelDescriptor],
    config: &Config,
) -> String {
    let theme = &config.theme;
    let viewport = &scene.viewport;
    let width = viewport.width.max(1.0);
    let height = viewport.height.max(1.0);
    let mut svg = String::new();

    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    );
    let _ = write!(
        svg,
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.render.background
    );

    if config.render.hulls {
        svg.push_str("<g class=\"hulls\">");
        for desc in descriptors {
            let outline: Vec<(f32, f32)> = desc
                .hull
                .iter()
                .filter_map(|idx| points.get(*idx))
                .map(|point| viewport.project(point.position))
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .collect();
            if outline.len() < 3 {
                continue;
            }
            let _ = write!(
                svg,
                "<path d=\"{} Z\" fill=\"none\" stroke=\"{}\" stroke-opacity=\"0.5\" stroke-width=\"1\"/>",
                points_to_path(&outline),
                theme.hull_color
            );
        }
        svg.push_str("</g>");
    }

    svg.push_str("<g class=\"points\">");
    // Selected points draw last so they sit on top.
    for selected_pass in [false, true] {
        for (idx, point) in points.iter().enumerate() {
            if (point.selection == SelectionState::Selected) != selected_pass {
                continue;
            }
            let alpha = scene
                .alpha
                .fill_alpha(point.selection, false, point.activation);
            if alpha == 0 {
                continue;
            }
            let radius = scene.radii.get(idx);
            let (cx, cy) = viewport.project(point.position);
            if !viewport.within_margin((cx, cy), radius) {
                continue;
            }
            let fill = if selected_pass {
                &theme.selected_point_color
            } else {
                &theme.point_color
            };
            let _ = write!(
                svg,
                "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{radius:.2}\" fill=\"{fill}\" fill-opacity=\"{:.3}\"/>",
                alpha as f32 / 255.0
            );
        }
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"labels\">");
    for label in &scene.labels.labels {
        svg.push_str(&label_svg(label, theme, config));
    }
    svg.push_str("</g>");

    svg.push_str("</svg>");
    svg
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    let mut d = String::new();
    for (idx, (x, y)) in points.iter().enumerate() {
        let cmd = if idx == 0 { "M" } else { " L" };
        let _ = write!(d, "{cmd} {x:.2} {y:.2}");
    }
    d
}

fn label_svg(label: &PlacedLabel, theme: &Theme, config: &Config) -> String {
    let labels = &config.labels;
    let margin = labels.collision_margin;
    let bounds = &label.bounds;
    let mut out = String::new();
    let class = if label.is_soft { "label soft" } else { "label" };
    let _ = write!(
        out,
        "<g class=\"{class}\" data-cluster=\"{}\">",
        escape_xml(&label.cluster.to_string())
    );
    let _ = write!(
        out,
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"3\" ry=\"3\" fill=\"{}\" fill-opacity=\"{:.3}\"/>",
        bounds.x0 + margin,
        bounds.y0 + margin,
        (bounds.width() - 2.0 * margin).max(0.0),
        (bounds.height() - 2.0 * margin).max(0.0),
        theme.label_background,
        label.background_alpha
    );

    let (x, y) = label.position;
    let total_height = label.lines.len() as f32 * label.line_height_px;
    // Baseline of the first line, roughly centering the block vertically.
    let start_y = y - total_height / 2.0 + label.font_size_px;
    let outline = if labels.outline {
        format!(
            " stroke=\"{}\" stroke-width=\"3\" stroke-linejoin=\"round\" paint-order=\"stroke\"",
            theme.label_outline_color
        )
    } else {
        String::new()
    };
    let _ = write!(
        out,
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{:.2}\" font-weight=\"{}\" fill=\"{}\" fill-opacity=\"{:.3}\"{outline}>",
        escape_xml(&theme.font_family),
        label.font_size_px,
        theme.font_weight,
        theme.label_text_color,
        label.text_alpha
    );
    for (idx, line) in label.lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { label.line_height_px };
        let _ = write!(
            out,
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        );
    }
    out.push_str("</text>");
    if label.display_text != label.full_text {
        let _ = write!(out, "<title>{}</title>", escape_xml(&label.full_text));
    }
    out.push_str("</g>");
    out
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = primary_family(&theme.font_family);
    opt.fontdb_mut().load_system_fonts();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .or_else(|| usvg::Size::from_wh(800.0, 600.0))
        .ok_or_else(|| anyhow::anyhow!("invalid render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig, _theme: &Theme) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

#[cfg(feature = "png")]
fn primary_family(families: &str) -> String {
    families
        .split(',')
        .map(|family| family.trim().trim_matches(|c| c == '"' || c == '\''))
        .find(|family| !family.is_empty())
        .unwrap_or("sans-serif")
        .to_string()
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
