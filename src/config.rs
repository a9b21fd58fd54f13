use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Master switch for the route pass; when off every net is a flight line.
    pub enabled: bool,
    /// Extra cost, in grid steps, charged whenever a path changes heading.
    pub turn_penalty: f32,
    pub avoid_staircase: bool,
    /// Upper bound on A* expansions for one connection.
    pub max_steps: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            turn_penalty: 0.1,
            avoid_staircase: true,
            max_steps: 200_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Use the built-in width table instead of system fonts. Deterministic.
    pub fast_text_metrics: bool,
    pub routing: RoutingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub show_grid: bool,
    pub origin_x: i32,
    pub origin_y: i32,
    /// Extra canvas around the drawn roots in exported images.
    pub margin: i32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            show_grid: false,
            origin_x: crate::diagram::BLOCK_SPACING,
            origin_y: crate::diagram::BLOCK_SPACING,
            margin: crate::diagram::BLOCK_SPACING,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Blocks shallower than this layer start displayed.
    pub expand_depth: usize,
    /// Interconnect types whose nets start visible.
    pub show_types: Vec<String>,
    /// Per interconnect type colour overrides.
    pub colours: BTreeMap<String, String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            expand_depth: 2,
            show_types: Vec::new(),
            colours: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub view: ViewConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutFile>,
    routing: Option<RoutingFile>,
    render: Option<RenderFile>,
    view: Option<ViewFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    label_color: Option<String>,
    block_stroke: Option<String>,
    block_fill: Option<String>,
    wire_color: Option<String>,
    wire_width: Option<u32>,
    background: Option<String>,
    palette: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutFile {
    fast_text_metrics: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutingFile {
    enabled: Option<bool>,
    turn_penalty: Option<f32>,
    avoid_staircase: Option<bool>,
    max_steps: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderFile {
    show_grid: Option<bool>,
    origin_x: Option<i32>,
    origin_y: Option<i32>,
    margin: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewFile {
    expand_depth: Option<usize>,
    show_types: Option<Vec<String>>,
    colours: Option<BTreeMap<String, String>>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse a config document on top of the defaults.
///
/// Strict JSON is tried first; JSON5 (comments, trailing commas) is accepted
/// as a fallback and the JSON error is reported if both fail.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents).map_err(|_| json_err)?,
    };
    Ok(apply_config_file(Config::default(), parsed))
}

fn apply_config_file(mut config: Config, parsed: ConfigFile) -> Config {
    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "modern" => config.theme = Theme::modern(),
            "classic" | "default" => config.theme = Theme::classic(),
            other => tracing::warn!(theme = other, "unknown theme name, keeping default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.label_color {
            config.theme.label_color = v;
        }
        if let Some(v) = vars.block_stroke {
            config.theme.block_stroke = v;
        }
        if let Some(v) = vars.block_fill {
            config.theme.block_fill = v;
        }
        if let Some(v) = vars.wire_color {
            config.theme.wire_color = v;
        }
        if let Some(v) = vars.wire_width {
            config.theme.wire_width = v.max(1);
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.palette {
            config.theme.palette = v;
        }
    }

    if let Some(layout) = parsed.layout
        && let Some(v) = layout.fast_text_metrics
    {
        config.layout.fast_text_metrics = v;
    }

    if let Some(routing) = parsed.routing {
        let target = &mut config.layout.routing;
        if let Some(v) = routing.enabled {
            target.enabled = v;
        }
        if let Some(v) = routing.turn_penalty {
            target.turn_penalty = v.max(0.0);
        }
        if let Some(v) = routing.avoid_staircase {
            target.avoid_staircase = v;
        }
        if let Some(v) = routing.max_steps {
            target.max_steps = v.max(1);
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.show_grid {
            config.render.show_grid = v;
        }
        if let Some(v) = render.origin_x {
            config.render.origin_x = v;
        }
        if let Some(v) = render.origin_y {
            config.render.origin_y = v;
        }
        if let Some(v) = render.margin {
            config.render.margin = v.max(0);
        }
    }

    if let Some(view) = parsed.view {
        if let Some(v) = view.expand_depth {
            config.view.expand_depth = v;
        }
        if let Some(v) = view.show_types {
            config.view.show_types = v;
        }
        if let Some(v) = view.colours {
            config.view.colours = v;
        }
    }

    config
}
