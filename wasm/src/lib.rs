use chipview::{Config, render_design};
use chipview::theme::Theme;
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagramRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    fast_text: Option<bool>,
    show_types: Option<Vec<String>>,
    expand_depth: Option<usize>,
    route: Option<bool>,
}

fn build_config(options: DiagramRenderOptions) -> Config {
    let mut config = Config::default();
    if options.theme.as_deref() == Some("modern") {
        config.theme = Theme::modern();
    }
    if let Some(font_family) = options.font_family {
        config.theme.font_family = font_family;
    }
    // System fonts are out of reach in the browser.
    config.layout.fast_text_metrics = options.fast_text.unwrap_or(true);
    if let Some(types) = options.show_types {
        config.view.show_types = types;
    }
    if let Some(depth) = options.expand_depth {
        config.view.expand_depth = depth;
    }
    if let Some(route) = options.route {
        config.layout.routing.enabled = route;
    }
    config
}

#[wasm_bindgen]
pub fn render_design_svg(design_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<DiagramRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        DiagramRenderOptions::default()
    };

    render_design(design_json, build_config(options))
        .map_err(|error| JsValue::from_str(&error.to_string()))
}

#[cfg(test)]
mod tests {
    use chipview::render_design;

    use crate::{DiagramRenderOptions, build_config};

    #[test]
    fn renders_nested_design_with_visible_nets() {
        let design = r#"{
            "id": "top", "type": "soc",
            "ports": { "input": [{"name": "a", "type": "bus"}] },
            "children": [
                { "id": "u0", "type": "core", "ports": { "input": [{"name": "a", "type": "bus"}] } }
            ],
            "connections": [
                { "start": {"block": "top", "port": "a"}, "end": {"block": "u0", "port": "a"} }
            ]
        }"#;
        let options: DiagramRenderOptions =
            serde_json::from_str(r#"{"showTypes": ["bus"], "theme": "modern"}"#).unwrap();

        let svg = render_design(design, build_config(options)).expect("design should render");

        assert!(svg.contains("<svg"));
        assert!(svg.contains(">u0<"));
        assert!(svg.contains("<path d=\"M "));
    }
}
