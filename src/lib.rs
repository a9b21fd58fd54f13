#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod diagram;
pub mod error;
pub mod geometry;
pub mod inspect;
pub mod layout_dump;
pub mod model;
pub mod render;
pub mod session;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{load_config, parse_config, Config};
pub use diagram::{Diagram, Scene};
pub use error::{DesignError, DiagramError};
pub use model::Design;
pub use render::render_svg;
pub use session::{Outcome, Session};

/// Load a design from JSON text, view its root and return the SVG.
pub fn render_design(json: &str, config: Config) -> anyhow::Result<String> {
    let design = Design::from_json(json)?;
    let mut session = Session::new(config);
    let scene = session.load(design)?;
    Ok(render_svg(&scene))
}
