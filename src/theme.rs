use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub label_color: String,
    pub block_stroke: String,
    pub block_fill: String,
    pub wire_color: String,
    pub wire_width: u32,
    pub background: String,
    pub grid_fine: String,
    pub grid_coarse: String,
    /// Colours handed out by fan-out highlighting, in rotation.
    pub palette: Vec<String>,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "Helvetica, Arial, sans-serif".to_string(),
            label_color: "#000000".to_string(),
            block_stroke: "#000000".to_string(),
            block_fill: "none".to_string(),
            wire_color: "#000000".to_string(),
            wire_width: 1,
            background: "#FFFFFF".to_string(),
            grid_fine: "rgba(0,0,0,0.025)".to_string(),
            grid_coarse: "rgba(0,0,0,0.05)".to_string(),
            palette: [
                "#1abc9c", "#2ecc71", "#3498db", "#9b59b6", "#f1c40f", "#d35400", "#0652DD",
                "#1B1464", "#6F1E51", "#D980FA", "#ED4C67",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, sans-serif".to_string(),
            label_color: "#1C2430".to_string(),
            block_stroke: "#7A8AA6".to_string(),
            block_fill: "#F8FAFF".to_string(),
            wire_color: "#3B4A63".to_string(),
            wire_width: 1,
            background: "#FFFFFF".to_string(),
            grid_fine: "rgba(28,36,48,0.03)".to_string(),
            grid_coarse: "rgba(28,36,48,0.06)".to_string(),
            palette: [
                "#0EA5E9", "#22C55E", "#A855F7", "#F97316", "#EF4444", "#14B8A6", "#EAB308",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }

    /// Palette entry for the `n`th highlight, wrapping around.
    pub fn palette_colour(&self, n: usize) -> &str {
        if self.palette.is_empty() {
            return self.wire_color.as_str();
        }
        self.palette[n % self.palette.len()].as_str()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
