use crate::config::{Config, load_config};
use crate::ir::{DataBounds, LabelDescriptor, Point, PointRecord};
use crate::layout::compute_scene;
use crate::layout_dump::write_scene_dump;
use crate::render::{render_svg, write_output_png, write_output_svg};
use crate::text_metrics::{FontMetrics, HeuristicMetrics, MeasureCache};
use crate::viewport::{ViewController, ViewState, Viewport};
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sclabel", version, about = "Scatter plot point weighting and cluster label layout")]
pub struct Args {
    /// Points JSON file (array of {x, y, selection?, activation?, cluster?, engagement? | favorites?, retweets?}) or '-' for stdin
    #[arg(short = 'p', long = "points")]
    pub points: PathBuf,

    /// Label descriptors JSON file (array of {cluster, label, layer, count, hull?, centroid_x?, centroid_y?})
    #[arg(short = 'l', long = "labels")]
    pub labels: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG/JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON/JSON5 file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Viewport width (overrides render.width)
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Viewport height (overrides render.height)
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Zoom level (log2 pixels per data unit). Fits the points when omitted.
    #[arg(short = 'z', long = "zoom", allow_negative_numbers = true)]
    pub zoom: Option<f32>,

    /// View target in data space as "x,y". Defaults to the center of the points.
    #[arg(short = 't', long = "target", value_parser = parse_target, allow_hyphen_values = true)]
    pub target: Option<(f32, f32)>,

    /// Measure with the fixed-width heuristic instead of system fonts
    #[arg(long = "heuristic")]
    pub heuristic: bool,

    /// Include per-point radii in JSON output
    #[arg(long = "radii")]
    pub radii: bool,

    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    config.validate()?;

    let points = read_points(&args.points)?;
    let labels = match args.labels.as_deref() {
        Some(path) => read_labels(path)?,
        None => Vec::new(),
    };
    tracing::debug!(points = points.len(), labels = labels.len(), "inputs loaded");

    let view = resolve_view(&mut config, &points, args.zoom, args.target)?;
    let viewport = Viewport::new(config.render.width, config.render.height, view);

    let scene = if args.heuristic {
        compute_scene(&points, &labels, viewport, &config, &HeuristicMetrics::default())
    } else {
        let metrics = MeasureCache::new(FontMetrics::new());
        if !metrics.inner().has_face(&config.theme.font()) {
            tracing::warn!(
                family = %config.theme.font_family,
                "no matching system font, using heuristic text widths"
            );
        }
        compute_scene(&points, &labels, viewport, &config, &metrics)
    };

    match args.output_format {
        OutputFormat::Json => write_scene_dump(args.output.as_deref(), &scene, args.radii)?,
        OutputFormat::Svg => {
            let svg = render_svg(&scene, &points, &labels, &config);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_svg(&scene, &points, &labels, &config);
            write_output_png(&svg, &output, &config.render, &config.theme)?;
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Explicit zoom/target win; otherwise fit the visible points. The fitted
/// zoom also becomes the reference for zoom-dependent label sizing.
fn resolve_view(
    config: &mut Config,
    points: &[Point],
    zoom: Option<f32>,
    target: Option<(f32, f32)>,
) -> Result<ViewState> {
    let mut controller = ViewController::new(&config.view, config.render.width, config.render.height)?;
    let fitted = DataBounds::from_points(points).map(|bounds| controller.fit_to_bounds(&bounds));
    if let Some(fitted) = fitted {
        config.labels.reference_zoom = fitted.zoom;
    }
    let base = fitted.unwrap_or_default();
    let requested = ViewState::new(zoom.unwrap_or(base.zoom), target.unwrap_or(base.target));
    Ok(controller.set_view_state(requested))
}

fn read_points(path: &Path) -> Result<Vec<Point>> {
    let content = read_input(path)?;
    let records: Vec<PointRecord> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse points from {}", path.display()))?;
    Ok(records.into_iter().map(Point::from).collect())
}

fn read_labels(path: &Path) -> Result<Vec<LabelDescriptor>> {
    let content = read_input(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse labels from {}", path.display()))
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!(
        "Output path required for {} output",
        ext
    ))
}

fn parse_target(value: &str) -> std::result::Result<(f32, f32), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got {value:?}"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f32>()
            .map_err(|err| format!("invalid coordinate {part:?}: {err}"))
    };
    Ok((parse(x)?, parse(y)?))
}
