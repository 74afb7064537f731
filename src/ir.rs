use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in data space (`y` grows upward).
pub type DataPoint = (f32, f32);
/// Position in screen pixels (`y` grows downward).
pub type ScreenPoint = (f32, f32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionState {
    #[default]
    Normal,
    Selected,
    NotSelected,
    Hidden,
}

impl SelectionState {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "normal" | "default" => Some(Self::Normal),
            "selected" => Some(Self::Selected),
            "notSelected" | "not_selected" | "unselected" => Some(Self::NotSelected),
            "hidden" | "deleted" => Some(Self::Hidden),
            _ => None,
        }
    }

    pub fn is_visible(self) -> bool {
        self != Self::Hidden
    }
}

/// Cluster identifier as produced upstream: either a bare index or a
/// layered key such as `"2_14"` / `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClusterId {
    Index(i64),
    Name(String),
}

impl Default for ClusterId {
    fn default() -> Self {
        Self::Index(-1)
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(idx) => write!(f, "{idx}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<i64> for ClusterId {
    fn from(value: i64) -> Self {
        Self::Index(value)
    }
}

impl From<i32> for ClusterId {
    fn from(value: i32) -> Self {
        Self::Index(value as i64)
    }
}

impl From<usize> for ClusterId {
    fn from(value: usize) -> Self {
        Self::Index(value as i64)
    }
}

impl From<&str> for ClusterId {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub position: DataPoint,
    pub selection: SelectionState,
    pub activation: f32,
    pub cluster: ClusterId,
    /// Raw engagement count (likes + reposts). Negative values count as zero.
    pub engagement: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            position: (x, y),
            selection: SelectionState::Normal,
            activation: 0.0,
            cluster: ClusterId::default(),
            engagement: 0.0,
        }
    }

    pub fn with_engagement(mut self, engagement: f32) -> Self {
        self.engagement = engagement;
        self
    }

    pub fn with_selection(mut self, selection: SelectionState) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_cluster(mut self, cluster: impl Into<ClusterId>) -> Self {
        self.cluster = cluster.into();
        self
    }
}

/// Point row as it arrives from the serving layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointRecord {
    pub x: f32,
    pub y: f32,
    #[serde(default, alias = "selectionState")]
    pub selection: Option<String>,
    #[serde(default)]
    pub activation: f32,
    #[serde(default)]
    pub cluster: Option<ClusterId>,
    #[serde(default)]
    pub engagement: Option<f32>,
    #[serde(default)]
    pub favorites: Option<f32>,
    #[serde(default)]
    pub retweets: Option<f32>,
}

impl From<PointRecord> for Point {
    fn from(record: PointRecord) -> Self {
        let engagement = record.engagement.unwrap_or_else(|| {
            record.favorites.unwrap_or(0.0).max(0.0) + record.retweets.unwrap_or(0.0).max(0.0)
        });
        let selection = record
            .selection
            .as_deref()
            .and_then(SelectionState::from_token)
            .unwrap_or_default();
        Self {
            position: (record.x, record.y),
            selection,
            activation: record.activation,
            cluster: record.cluster.unwrap_or_default(),
            engagement,
        }
    }
}

/// Cluster label row: text, hierarchy layer, member count and either an
/// explicit centroid or the hull member indices to derive one from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelDescriptor {
    #[serde(default)]
    pub cluster: ClusterId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub layer: u32,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub hull: Vec<usize>,
    #[serde(default)]
    pub centroid_x: Option<f32>,
    #[serde(default)]
    pub centroid_y: Option<f32>,
}

impl LabelDescriptor {
    pub fn new(cluster: impl Into<ClusterId>, label: &str, layer: u32, count: u64) -> Self {
        Self {
            cluster: cluster.into(),
            label: label.to_string(),
            layer,
            count,
            ..Self::default()
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.centroid_x = Some(x);
        self.centroid_y = Some(y);
        self
    }

    pub fn with_hull(mut self, hull: Vec<usize>) -> Self {
        self.hull = hull;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl DataBounds {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    /// Bounds of all visible points with finite coordinates.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let mut bounds: Option<Self> = None;
        for point in points {
            let (x, y) = point.position;
            if !point.selection.is_visible() || !x.is_finite() || !y.is_finite() {
                continue;
            }
            bounds = Some(match bounds {
                None => Self::new(x, y, x, y),
                Some(b) => Self {
                    min_x: b.min_x.min(x),
                    min_y: b.min_y.min(y),
                    max_x: b.max_x.max(x),
                    max_y: b.max_y.max(y),
                },
            });
        }
        bounds
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }
}
