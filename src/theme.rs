use serde::{Deserialize, Serialize};

use crate::text_metrics::FontSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Theme {
    pub font_family: String,
    pub font_weight: u16,
    pub label_text_color: String,
    pub label_background: String,
    pub label_outline_color: String,
    pub point_color: String,
    pub selected_point_color: String,
    pub hull_color: String,
    pub background: String,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_weight: 500,
            label_text_color: "#1C2430".to_string(),
            label_background: "#FFFFFF".to_string(),
            label_outline_color: "#FFFFFF".to_string(),
            point_color: "#4A6FA5".to_string(),
            selected_point_color: "#D9480F".to_string(),
            hull_color: "#7A8AA6".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_weight: 500,
            label_text_color: "#E8ECF3".to_string(),
            label_background: "#111418".to_string(),
            label_outline_color: "#111418".to_string(),
            point_color: "#8DB3E2".to_string(),
            selected_point_color: "#FFA94D".to_string(),
            hull_color: "#5C6B85".to_string(),
            background: "#0B0D10".to_string(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "light" | "default" => Some(Self::light()),
            "dark" => Some(Self::dark()),
            _ => None,
        }
    }

    pub fn font(&self) -> FontSpec {
        FontSpec::new(&self.font_family, self.font_weight)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}
