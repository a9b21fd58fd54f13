use serde::Serialize;

use crate::config::RenderConfig;
use crate::geometry::{Bounds, Coords};
use crate::theme::Theme;

use super::types::{BlockId, ConnectionId, PortId};
use super::{Diagram, BLOCK_SPACING, GRID_SPACING, PORT_DOT_SIZE};

/// One primitive in paint order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawItem {
    BlockOutline {
        block: BlockId,
        bounds: Bounds,
        stroke: String,
        fill: String,
    },
    /// Text anchored at its left edge, vertically centred on `at`.
    Label {
        text: String,
        at: Coords,
        font_size: i32,
        colour: String,
    },
    Wire {
        connection: ConnectionId,
        points: Vec<Coords>,
        colour: String,
        width: u32,
    },
    FlightLine {
        connection: ConnectionId,
        from: Coords,
        to: Coords,
        colour: String,
        width: u32,
    },
    PortDot {
        port: PortId,
        bounds: Bounds,
        colour: String,
    },
    /// Filled dot with an outer ring, marking a port tied to a constant.
    ConstantTie {
        port: PortId,
        centre: Coords,
        radius: i32,
        ring_radius: i32,
        colour: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSpec {
    pub fine: i32,
    pub coarse: i32,
    pub fine_colour: String,
    pub coarse_colour: String,
}

/// Backend-neutral draw list produced by a render pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub width: i32,
    pub height: i32,
    pub background: String,
    pub font_family: String,
    pub grid: Option<GridSpec>,
    pub items: Vec<DrawItem>,
}

impl Scene {
    pub fn wires(&self) -> impl Iterator<Item = &DrawItem> {
        self.items
            .iter()
            .filter(|item| matches!(item, DrawItem::Wire { .. } | DrawItem::FlightLine { .. }))
    }

    pub fn draws_connection(&self, id: ConnectionId) -> bool {
        self.wires().any(|item| match item {
            DrawItem::Wire { connection, .. } | DrawItem::FlightLine { connection, .. } => {
                *connection == id
            }
            _ => false,
        })
    }
}

impl Diagram {
    /// Top-down render pass. Records absolute drawn bounds on every visible
    /// block and port and collects the draw list.
    pub(crate) fn render_scene(&mut self, theme: &Theme, config: &RenderConfig) -> Scene {
        let mut items = Vec::new();
        let origin = Coords::new(config.origin_x, config.origin_y);
        let mut width = 0;
        let mut height = 0;

        for root in self.roots.clone() {
            if !self.blocks[root.0].display {
                continue;
            }
            let at = origin.offset(self.blocks[root.0].bounds.origin());
            self.render_block(root, at, theme, &mut items);
            let drawn = self.blocks[root.0].drawn;
            width = width.max(drawn.right());
            height = height.max(drawn.bottom());
        }

        let grid = config.show_grid.then(|| GridSpec {
            fine: 2 * GRID_SPACING,
            coarse: 20 * GRID_SPACING,
            fine_colour: theme.grid_fine.clone(),
            coarse_colour: theme.grid_coarse.clone(),
        });

        Scene {
            width: (width + config.margin).max(BLOCK_SPACING),
            height: (height + config.margin).max(BLOCK_SPACING),
            background: theme.background.clone(),
            font_family: theme.font_family.clone(),
            grid,
            items,
        }
    }

    fn render_block(&mut self, id: BlockId, at: Coords, theme: &Theme, items: &mut Vec<DrawItem>) {
        if !self.blocks[id.0].display {
            return;
        }
        let block = &mut self.blocks[id.0];
        block.drawn = Bounds::new(at.x, at.y, block.bounds.width, block.bounds.height);

        items.push(DrawItem::BlockOutline {
            block: id,
            bounds: block.drawn,
            stroke: theme.block_stroke.clone(),
            fill: theme.block_fill.clone(),
        });
        items.push(DrawItem::Label {
            text: block.label.text.clone(),
            at: at.offset(block.label.bounds.origin()),
            font_size: block.label.font_size,
            colour: theme.label_color.clone(),
        });

        for child in self.blocks[id.0].subblocks.clone() {
            let child_at = at.offset(self.blocks[child.0].bounds.origin());
            self.render_block(child, child_at, theme, items);
        }

        for &conn_id in &self.blocks[id.0].connections {
            let conn = &self.connections[conn_id.0];
            if !conn.visible {
                continue;
            }
            let start_block = self.ports[conn.start.0].block;
            let end_block = self.ports[conn.end.0].block;
            if !self.is_shown_within(start_block, id) || !self.is_shown_within(end_block, id) {
                continue;
            }
            let colour = conn
                .colour
                .clone()
                .unwrap_or_else(|| theme.wire_color.clone());
            if conn.path.len() < 2 {
                let (Some(from), Some(to)) = (
                    self.port_position_in(conn.start, id),
                    self.port_position_in(conn.end, id),
                ) else {
                    continue;
                };
                items.push(DrawItem::FlightLine {
                    connection: conn_id,
                    from: at.offset(from),
                    to: at.offset(to),
                    colour,
                    width: conn.width,
                });
            } else {
                items.push(DrawItem::Wire {
                    connection: conn_id,
                    points: conn.path.iter().map(|pt| at.offset(*pt)).collect(),
                    colour,
                    width: conn.width,
                });
            }
        }

        // Ports go last so their markers sit on top of the wires.
        for port_id in self.blocks[id.0].all_ports() {
            let port = &mut self.ports[port_id.0];
            port.drawn = Bounds::new(
                at.x + port.bounds.x,
                at.y + port.bounds.y,
                port.bounds.width,
                port.bounds.height,
            );
            let colour = port
                .colour
                .clone()
                .unwrap_or_else(|| theme.wire_color.clone());
            if port.constant_tie.is_some() {
                items.push(DrawItem::ConstantTie {
                    port: port_id,
                    centre: port.drawn.origin(),
                    radius: PORT_DOT_SIZE / 2,
                    ring_radius: PORT_DOT_SIZE / 2 + 2,
                    colour,
                });
            } else {
                items.push(DrawItem::PortDot {
                    port: port_id,
                    bounds: port.dot_bounds(),
                    colour,
                });
            }
            items.push(DrawItem::Label {
                text: port.label.text.clone(),
                at: Coords::new(
                    port.drawn.x + PORT_DOT_SIZE + port.label.bounds.x,
                    port.drawn.y - PORT_DOT_SIZE * 2 + port.label.bounds.y,
                ),
                font_size: port.label.font_size,
                colour: theme.label_color.clone(),
            });
        }
    }
}
