use crate::geometry::{round_up, snap_down, Bounds, Coords, Index2D};

use super::label::{Label, TextMetrics};
use super::types::{Block, BlockId, Direction, Hit, PortId};
use super::{
    Diagram, BLOCK_LABEL_SIZE, BLOCK_PADDING, BLOCK_SPACING, GRID_SPACING, PORT_SPACING,
};

impl Block {
    pub(crate) fn new(
        id: String,
        name: String,
        parent: Option<BlockId>,
        layer: usize,
        display: bool,
    ) -> Self {
        let label = Label::new(name.clone(), BLOCK_LABEL_SIZE);
        Self {
            id,
            name,
            parent,
            layer,
            display,
            bounds: Bounds::default(),
            drawn: Bounds::default(),
            index: Index2D::default(),
            label,
            subblocks: Vec::new(),
            clock_ports: Vec::new(),
            reset_ports: Vec::new(),
            other_ports: Vec::new(),
            connections: Vec::new(),
            reference: None,
            grid: None,
        }
    }
}

impl Diagram {
    /// Ports of `id` with the given direction, in role order.
    pub fn ports_by_direction(&self, id: BlockId, direction: Direction) -> Vec<PortId> {
        self.blocks[id.0]
            .all_ports()
            .into_iter()
            .filter(|p| self.ports[p.0].direction == direction)
            .collect()
    }

    /// Left edge ports: inputs first, then bidirectional ports.
    fn left_ports(&self, id: BlockId) -> Vec<PortId> {
        let mut ports = self.ports_by_direction(id, Direction::Input);
        ports.extend(self.ports_by_direction(id, Direction::InOut));
        ports
    }

    /// Post-order layout of a visible block and its visible subtree.
    ///
    /// Discards the cached grid and every path owned by the block, then
    /// derives its size from the packed children, port widths and label.
    pub(crate) fn layout_block(&mut self, id: BlockId, metrics: &TextMetrics) {
        if !self.blocks[id.0].display {
            return;
        }

        {
            let block = &mut self.blocks[id.0];
            block.bounds = Bounds::default();
            block.drawn = Bounds::default();
            block.index = Index2D::default();
            block.grid = None;
        }
        for conn in self.blocks[id.0].connections.clone() {
            self.connections[conn.0].clear_path();
        }

        // 1. children, all packed into a single row
        let children: Vec<BlockId> = self.blocks[id.0]
            .subblocks
            .iter()
            .copied()
            .filter(|child| self.blocks[child.0].display)
            .collect();
        for (column, &child) in children.iter().enumerate() {
            self.layout_block(child, metrics);
            self.blocks[child.0].index = Index2D::new(column, 0);
        }

        // 2. place children left to right
        let mut child_width = 0;
        let mut child_height = 0;
        for (column, &child) in children.iter().enumerate() {
            let bounds = &mut self.blocks[child.0].bounds;
            bounds.set_origin(Coords::new(
                snap_down(child_width, GRID_SPACING),
                snap_down(0, GRID_SPACING),
            ));
            child_width += bounds.width;
            child_height = child_height.max(bounds.height);
            if column + 1 < children.len() {
                child_width += BLOCK_SPACING;
            }
        }

        // 3. port extents
        for port in self.blocks[id.0].all_ports() {
            self.ports[port.0].layout(metrics);
        }
        let left = self.left_ports(id);
        let right = self.ports_by_direction(id, Direction::Output);
        let widest = |ports: &[PortId]| {
            ports
                .iter()
                .map(|p| self.ports[p.0].bounds.width)
                .max()
                .unwrap_or(0)
        };
        let max_in_width = widest(&left);
        let max_out_width = widest(&right);
        let total_port_height = (left.len().max(right.len()) as i32 - 1) * PORT_SPACING;

        // 4. label
        let block = &mut self.blocks[id.0];
        block.label.layout(metrics);
        let label_width = block.label.bounds.width;
        let label_height = block.label.bounds.height;

        // 5. size
        let has_children = !children.is_empty();
        let mut width = child_width + max_in_width + max_out_width;
        if has_children {
            width += 2 * BLOCK_SPACING;
        }
        width = width.max(label_width + 2 * BLOCK_PADDING);

        let mut height = child_height + label_height;
        if has_children {
            height += 2 * BLOCK_SPACING;
        }
        if height < total_port_height {
            height += total_port_height;
        }
        height += 3 * BLOCK_PADDING;

        let width = round_up(width, GRID_SPACING);
        let height = round_up(height, GRID_SPACING);
        block.bounds.width = width;
        block.bounds.height = height;

        // 6. label and child origin
        block
            .label
            .set_origin((width - label_width) / 2, BLOCK_PADDING);
        let root = Coords::new(
            max_in_width + BLOCK_SPACING,
            BLOCK_PADDING + label_height + BLOCK_PADDING + BLOCK_SPACING,
        );
        for &child in &children {
            let bounds = &mut self.blocks[child.0].bounds;
            let moved = bounds.origin().offset(root);
            bounds.set_origin(moved);
        }

        // 7. ports down both edges
        let start_y = label_height + 2 * BLOCK_PADDING + 2 * GRID_SPACING;
        for (i, port) in left.iter().enumerate() {
            self.ports[port.0]
                .bounds
                .set_origin(Coords::new(0, start_y + i as i32 * PORT_SPACING));
        }
        for (i, port) in right.iter().enumerate() {
            self.ports[port.0]
                .bounds
                .set_origin(Coords::new(width, start_y + i as i32 * PORT_SPACING));
        }
    }

    /// Innermost visible element under `(x, y)` within block `id`.
    pub(crate) fn resolve_in_block(&self, id: BlockId, x: i32, y: i32) -> Option<Hit> {
        let block = &self.blocks[id.0];
        if !block.display || !block.drawn.contains_with_tolerance(x, y, GRID_SPACING) {
            return None;
        }
        for &child in &block.subblocks {
            if let Some(hit) = self.resolve_in_block(child, x, y) {
                return Some(hit);
            }
        }
        for port in block.all_ports() {
            if self.ports[port.0].hit(x, y) {
                return Some(Hit::Port(port));
            }
        }
        Some(Hit::Block(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_block_sizes_around_ports_and_label() {
        let mut d = Diagram::new();
        let top = d.add_root("top", "top", true);
        d.add_port(top, "a", "a", Direction::Input);
        d.add_port(top, "b", "b", Direction::Input);
        d.add_port(top, "y", "y", Direction::Output);
        d.layout();

        let b = d.block(top).bounds;
        assert_eq!((b.width, b.height), (40, 65));
        let label = &d.block(top).label.bounds;
        assert_eq!(label.y, BLOCK_PADDING);
        assert_eq!(label.x, (40 - label.width) / 2);
    }

    #[test]
    fn ports_line_up_below_the_label() {
        let mut d = Diagram::new();
        let top = d.add_root("top", "top", true);
        let a = d.add_port(top, "a", "a", Direction::Input);
        let io = d.add_port(top, "io", "io", Direction::InOut);
        let y = d.add_port(top, "y", "y", Direction::Output);
        d.layout();

        let start_y = 12 + 2 * BLOCK_PADDING + 2 * GRID_SPACING;
        assert_eq!(d.port(a).bounds.origin(), Coords::new(0, start_y));
        assert_eq!(
            d.port(io).bounds.origin(),
            Coords::new(0, start_y + PORT_SPACING)
        );
        let width = d.block(top).bounds.width;
        assert_eq!(d.port(y).bounds.origin(), Coords::new(width, start_y));
    }

    #[test]
    fn child_is_offset_past_the_widest_input() {
        let mut d = Diagram::new();
        let top = d.add_root("top", "top", true);
        d.add_port(top, "din", "din", Direction::Input);
        let u0 = d.add_subblock(top, "u0", "u0", true);
        d.add_port(u0, "din", "din", Direction::Input);
        d.layout();

        assert_eq!(d.block(u0).bounds, Bounds::new(75, 82, 35, 45));
        let root = d.block(top).bounds;
        assert_eq!((root.width, root.height), (160, 190));
    }

    #[test]
    fn siblings_share_one_row() {
        let mut d = Diagram::new();
        let top = d.add_root("top", "top", true);
        let a = d.add_subblock(top, "a", "a", true);
        let b = d.add_subblock(top, "b", "b", true);
        let c = d.add_subblock(top, "c", "c", true);
        d.layout();

        let (ba, bb, bc) = (d.block(a).bounds, d.block(b).bounds, d.block(c).bounds);
        assert_eq!(ba.y, bb.y);
        assert_eq!(bb.y, bc.y);
        assert_eq!(bb.x, ba.right() + BLOCK_SPACING);
        assert_eq!(bc.x, bb.right() + BLOCK_SPACING);
        assert_eq!(d.block(c).index, Index2D::new(2, 0));
    }

    #[test]
    fn hidden_children_take_no_slot() {
        let mut d = Diagram::new();
        let top = d.add_root("top", "top", true);
        let a = d.add_subblock(top, "a", "a", true);
        d.add_subblock(top, "hidden", "hidden", false);
        d.layout();
        let with_hidden = d.block(top).bounds;

        let mut e = Diagram::new();
        let top2 = e.add_root("top", "top", true);
        e.add_subblock(top2, "a", "a", true);
        e.layout();

        assert_eq!(with_hidden, e.block(top2).bounds);
        assert_eq!(d.block(a).index, Index2D::new(0, 0));
    }

    #[test]
    fn every_visible_block_is_grid_aligned() {
        let mut d = Diagram::new();
        let top = d.add_root("top", "a top level block", true);
        d.add_port(top, "clk", "clk", Direction::Input);
        let mid = d.add_subblock(top, "mid", "middle", true);
        d.add_port(mid, "data_out", "data_out", Direction::Output);
        let leaf = d.add_subblock(mid, "leaf", "leaf", true);
        d.add_port(leaf, "rst_n", "rst_n", Direction::Input);
        d.layout();

        for id in [top, mid, leaf] {
            let b = d.block(id).bounds;
            assert!(b.width >= 0 && b.width % GRID_SPACING == 0, "{b:?}");
            assert!(b.height >= 0 && b.height % GRID_SPACING == 0, "{b:?}");
        }
    }
}
