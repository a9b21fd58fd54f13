use crate::geometry::Bounds;

use super::label::{Label, TextMetrics};
use super::types::{BlockId, Direction, Port, PortRole};
use super::{PORT_DOT_SIZE, PORT_LABEL_SIZE};

impl Port {
    pub(crate) fn new(id: String, name: String, direction: Direction, block: BlockId) -> Self {
        let role = PortRole::infer(&name);
        let label = Label::new(name.clone(), PORT_LABEL_SIZE);
        Self {
            id,
            name,
            direction,
            role,
            block,
            bounds: Bounds::default(),
            drawn: Bounds::default(),
            label,
            colour: None,
            constant_tie: None,
            connections: Vec::new(),
            reference: None,
        }
    }

    /// Size the port around its label.
    ///
    /// Output labels sit left of the connector so the text reads toward the
    /// block interior; every other label starts at the connector.
    pub(crate) fn layout(&mut self, metrics: &TextMetrics) {
        self.label.layout(metrics);
        let label_width = self.label.bounds.width;
        if self.direction == Direction::Output {
            self.label.set_origin(-(PORT_DOT_SIZE * 2 + label_width), 0);
        } else {
            self.label.set_origin(0, 0);
        }
        self.bounds.width = PORT_DOT_SIZE * 2 + label_width;
        self.bounds.height = self.label.bounds.height;
    }

    /// Connector square centred on the drawn anchor.
    pub fn dot_bounds(&self) -> Bounds {
        Bounds::new(
            self.drawn.x - PORT_DOT_SIZE / 2,
            self.drawn.y - PORT_DOT_SIZE / 2,
            PORT_DOT_SIZE,
            PORT_DOT_SIZE,
        )
    }

    /// Whether `(x, y)` lies within two connector widths of the drawn anchor.
    pub fn hit(&self, x: i32, y: i32) -> bool {
        let reach = 2 * PORT_DOT_SIZE;
        (x - self.drawn.x).abs() <= reach && (y - self.drawn.y).abs() <= reach
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(name: &str, direction: Direction) -> Port {
        Port::new(name.to_string(), name.to_string(), direction, BlockId(0))
    }

    #[test]
    fn output_label_sits_left_of_the_dot() {
        let mut p = port("clk", Direction::Output);
        p.layout(&TextMetrics::fixed());
        assert_eq!(p.label.bounds.x, -(2 * PORT_DOT_SIZE + 12));
        assert_eq!(p.bounds.width, 2 * PORT_DOT_SIZE + 12);
        assert_eq!(p.bounds.height, PORT_LABEL_SIZE);
    }

    #[test]
    fn input_label_starts_at_the_dot() {
        let mut p = port("clk", Direction::Input);
        p.layout(&TextMetrics::fixed());
        assert_eq!(p.label.bounds.x, 0);
        assert_eq!(p.role, PortRole::Clock);
    }

    #[test]
    fn hit_window_is_two_dots_each_way() {
        let mut p = port("a", Direction::Input);
        p.drawn = Bounds::new(100, 100, 10, 10);
        assert!(p.hit(100, 100));
        assert!(p.hit(112, 88));
        assert!(!p.hit(113, 100));
        assert!(!p.hit(100, 87));
    }
}
