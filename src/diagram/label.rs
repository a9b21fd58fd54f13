use crate::geometry::{Bounds, Coords};
use crate::text_metrics;

/// Measures label extents for one font family.
#[derive(Debug, Clone)]
pub struct TextMetrics {
    font_family: String,
    fast: bool,
}

impl TextMetrics {
    pub fn new(font_family: impl Into<String>, fast: bool) -> Self {
        Self {
            font_family: font_family.into(),
            fast,
        }
    }

    /// Deterministic metrics that never touch installed fonts.
    pub fn fixed() -> Self {
        Self::new("Helvetica", true)
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    /// Integer `(width, height)` of `text` at `font_size` pixels.
    ///
    /// Width is the advance width truncated toward zero; height is the font
    /// size itself.
    pub fn measure(&self, text: &str, font_size: i32) -> (i32, i32) {
        let size = font_size.max(0) as f32;
        let width = if self.fast {
            fallback_text_width(text, size)
        } else {
            text_metrics::measure_text_width(text, size, &self.font_family)
                .unwrap_or_else(|| fallback_text_width(text, size))
        };
        (width as i32, font_size.max(0))
    }
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self::fixed()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub text: String,
    pub font_size: i32,
    /// Origin is relative to the owner; size is valid after `layout`.
    pub bounds: Bounds,
}

impl Label {
    pub fn new(text: impl Into<String>, font_size: i32) -> Self {
        Self {
            text: text.into(),
            font_size,
            bounds: Bounds::default(),
        }
    }

    pub fn layout(&mut self, metrics: &TextMetrics) {
        let (width, height) = metrics.measure(&self.text, self.font_size);
        self.bounds.width = width;
        self.bounds.height = height;
    }

    pub fn set_origin(&mut self, x: i32, y: i32) {
        self.bounds.set_origin(Coords::new(x, y));
    }
}

// Helvetica advance widths in em units.
fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' | '.' | ',' | ':' | ';' | '!' | '/' | '\\' | '[' | ']' | '|' | 'f' | 't' | 'I' => 0.278,
        'i' | 'j' | 'l' | '\'' => 0.222,
        '(' | ')' | '-' | 'r' | '`' => 0.333,
        'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' | 'J' => 0.5,
        'm' | 'M' => 0.833,
        'w' => 0.722,
        'W' => 0.944,
        'A' | 'B' | 'E' | 'K' | 'P' | 'S' | 'V' | 'X' | 'Y' => 0.667,
        'C' | 'D' | 'H' | 'N' | 'R' | 'U' => 0.722,
        'F' | 'T' | 'Z' => 0.611,
        'G' | 'O' | 'Q' => 0.778,
        'L' => 0.556,
        '@' => 1.015,
        '%' => 0.889,
        '&' => 0.667,
        _ => 0.556,
    }
}

fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars()
        .filter(|ch| *ch != '\n')
        .map(char_width_factor)
        .sum::<f32>()
        * font_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_metrics_truncate_width() {
        let metrics = TextMetrics::fixed();
        // c(0.5) + l(0.222) + k(0.5) = 1.222em at 10px
        assert_eq!(metrics.measure("clk", 10), (12, 10));
    }

    #[test]
    fn height_is_the_font_size() {
        let metrics = TextMetrics::fixed();
        assert_eq!(metrics.measure("", 12), (0, 12));
    }

    #[test]
    fn width_scales_with_font_size() {
        let small = fallback_text_width("Hello", 10.0);
        let large = fallback_text_width("Hello", 20.0);
        assert!((large - small * 2.0).abs() < 0.01);
    }

    #[test]
    fn label_layout_sets_size_only() {
        let mut label = Label::new("top", 12);
        label.set_origin(4, 6);
        label.layout(&TextMetrics::fixed());
        assert_eq!(label.bounds.x, 4);
        assert_eq!(label.bounds.y, 6);
        assert_eq!(label.bounds.height, 12);
        assert!(label.bounds.width > 0);
    }
}
