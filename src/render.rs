use crate::diagram::{DrawItem, GridSpec, Scene};
use crate::geometry::Coords;
use anyhow::Result;
use std::fmt::Write as _;
use std::path::Path;

/// Serialise a scene as a standalone SVG document.
///
/// Strokes are offset by half a pixel so one-pixel lines land on whole
/// device pixels.
pub fn render_svg(scene: &Scene) -> String {
    let mut svg = String::new();
    let width = scene.width;
    let height = scene.height;

    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    );
    let _ = write!(
        svg,
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        escape_xml(&scene.background)
    );
    if let Some(grid) = &scene.grid {
        svg.push_str(&grid_svg(grid));
    }

    let font = escape_xml(&scene.font_family);
    for item in &scene.items {
        match item {
            DrawItem::BlockOutline {
                bounds,
                stroke,
                fill,
                ..
            } => {
                let _ = write!(
                    svg,
                    "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
                    half_pixel(bounds.x),
                    half_pixel(bounds.y),
                    bounds.width,
                    bounds.height,
                    escape_xml(fill),
                    escape_xml(stroke)
                );
            }
            DrawItem::Label {
                text,
                at,
                font_size,
                colour,
            } => {
                let _ = write!(
                    svg,
                    "<text x=\"{}\" y=\"{}\" font-family=\"{font}\" font-size=\"{font_size}\" fill=\"{}\" dominant-baseline=\"middle\">{}</text>",
                    at.x,
                    at.y,
                    escape_xml(colour),
                    escape_xml(text)
                );
            }
            DrawItem::Wire {
                points,
                colour,
                width,
                ..
            } => {
                let _ = write!(
                    svg,
                    "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{width}\"/>",
                    points_to_path(points),
                    escape_xml(colour)
                );
            }
            DrawItem::FlightLine {
                from,
                to,
                colour,
                width,
                ..
            } => {
                let _ = write!(
                    svg,
                    "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{width}\" stroke-dasharray=\"4 3\"/>",
                    points_to_path(&[*from, *to]),
                    escape_xml(colour)
                );
            }
            DrawItem::PortDot { bounds, colour, .. } => {
                let _ = write!(
                    svg,
                    "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\"/>",
                    bounds.x,
                    bounds.y,
                    bounds.width,
                    bounds.height,
                    escape_xml(colour)
                );
            }
            DrawItem::ConstantTie {
                centre,
                radius,
                ring_radius,
                colour,
                ..
            } => {
                let colour = escape_xml(colour);
                let _ = write!(
                    svg,
                    "<circle cx=\"{}\" cy=\"{}\" r=\"{radius}\" fill=\"{colour}\"/><circle cx=\"{}\" cy=\"{}\" r=\"{ring_radius}\" fill=\"none\" stroke=\"{colour}\" stroke-width=\"1\"/>",
                    centre.x, centre.y, centre.x, centre.y
                );
            }
        }
    }

    svg.push_str("</svg>");
    svg
}

fn grid_svg(grid: &GridSpec) -> String {
    let pattern = |id: &str, step: i32, colour: &str| {
        format!(
            "<pattern id=\"{id}\" width=\"{step}\" height=\"{step}\" patternUnits=\"userSpaceOnUse\"><path d=\"M {step} 0 L 0 0 0 {step}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1\"/></pattern>",
            escape_xml(colour)
        )
    };
    format!(
        "<defs>{}{}</defs><rect width=\"100%\" height=\"100%\" fill=\"url(#grid-fine)\"/><rect width=\"100%\" height=\"100%\" fill=\"url(#grid-coarse)\"/>",
        pattern("grid-fine", grid.fine, &grid.fine_colour),
        pattern("grid-coarse", grid.coarse, &grid.coarse_colour)
    )
}

/// Centre of the device pixel at `value`.
fn half_pixel(value: i32) -> f32 {
    value as f32 + 0.5
}

fn points_to_path(points: &[Coords]) -> String {
    let mut d = String::new();
    for (idx, pt) in points.iter().enumerate() {
        let cmd = if idx == 0 { 'M' } else { 'L' };
        let _ = write!(d, "{cmd} {} {} ", half_pixel(pt.x), half_pixel(pt.y));
    }
    d.trim_end().to_string()
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
pub fn write_output_png(svg: &str, output: &Path, font_family: &str) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = font_family
        .split(',')
        .next()
        .map(str::trim)
        .unwrap_or("Helvetica")
        .to_string();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
