use crate::config::load_config;
use crate::layout_dump::write_layout_dump;
use crate::model::Design;
use crate::render::{render_svg, write_output_svg};
use crate::session::Session;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chipview", version, about = "Hierarchical hardware block diagram viewer")]
pub struct Args {
    /// Elaborated design (.json, or .zip holding elaborated.json)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Dotted path of the block to view, e.g. `top.u_core`
    #[arg(long = "path")]
    pub path: Option<String>,

    /// Show nets of this interconnect type (repeatable)
    #[arg(long = "show")]
    pub show: Vec<String>,

    /// Show nets whose interconnect type matches this regex
    #[arg(long = "show-matching")]
    pub show_matching: Option<String>,

    /// Hierarchy depth displayed initially
    #[arg(long = "expand-depth")]
    pub expand_depth: Option<usize>,

    /// Skip routing; nets render as flight lines
    #[arg(long = "no-route")]
    pub no_route: bool,

    /// Draw the background routing grid
    #[arg(long = "show-grid")]
    pub show_grid: bool,

    /// Write the laid-out diagram as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,

    /// Print the interconnect types used by the design and exit
    #[arg(long = "list-types")]
    pub list_types: bool,

    /// Debug logging on stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(depth) = args.expand_depth {
        config.view.expand_depth = depth;
    }
    config.view.show_types.extend(args.show.iter().cloned());
    if args.no_route {
        config.layout.routing.enabled = false;
    }
    if args.show_grid {
        config.render.show_grid = true;
    }
    let pattern = args.show_matching.as_deref().map(Regex::new).transpose()?;

    let design = Design::load(&args.input)?;
    if args.list_types {
        for kind in design.interconnect_types() {
            println!("{kind}");
        }
        return Ok(());
    }

    let font_family = config.theme.font_family.clone();
    let mut session = Session::new(config);
    let mut scene = session.load_matching(design, pattern.as_ref())?;
    if let Some(path) = args.path.as_deref() {
        scene = session.view(path)?;
    }
    if let Some(dump) = args.dump_layout.as_deref() {
        write_layout_dump(dump, session.diagram())?;
    }

    let svg = render_svg(&scene);
    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_png(&svg, &output, &font_family)?;
        }
    }
    Ok(())
}

/// `CHIPVIEW_LOG` picks the filter; `-v` forces debug output.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("CHIPVIEW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, font_family: &str) -> Result<()> {
    crate::render::write_output_png(svg, output, font_family)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _font_family: &str) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
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

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn repeated_show_flags_accumulate() {
        let args = Args::try_parse_from([
            "chipview", "-i", "d.json", "--show", "axi", "--show", "apb", "--no-route",
        ])
        .unwrap();
        assert_eq!(args.show, vec!["axi".to_string(), "apb".to_string()]);
        assert!(args.no_route);
        assert!(matches!(args.output_format, OutputFormat::Svg));
    }

    #[test]
    fn png_needs_an_output_path() {
        assert!(ensure_output(&None, "png").is_err());
    }
}
