//! Hierarchical block diagram: arena, layout, routing and render passes.
//!
//! Blocks, ports and connections live in flat vectors addressed by copyable
//! handles. Structural edits bump a revision counter; `route` and `render`
//! re-run `layout` whenever the laid-out revision is stale.

pub mod action;
mod block;
pub mod label;
mod port;
pub mod routing;
pub mod scene;
pub mod types;

pub use action::{default_action, menu_for, Action, ActionEvent, BlockAction, MenuItem, PortAction};
pub use label::{Label, TextMetrics};
pub use routing::{PathError, WalkGrid};
pub use scene::{DrawItem, GridSpec, Scene};
pub use types::{
    Block, BlockId, Connection, ConnectionId, Direction, Hit, Port, PortId, PortRole, RouteQuality,
};

use crate::config::{RenderConfig, RoutingConfig};
use crate::error::DiagramError;
use crate::geometry::Coords;
use crate::theme::Theme;

// ── Geometry constants ──────────────────────────────────────────────
pub const GRID_SPACING: i32 = 5;
pub const BLOCK_SPACING: i32 = 50;
pub const BLOCK_PADDING: i32 = 10;
pub const PORT_DOT_SIZE: i32 = 6;
pub const PORT_SPACING: i32 = 20;
pub const BLOCK_LABEL_SIZE: i32 = 12;
pub const PORT_LABEL_SIZE: i32 = 10;

#[derive(Debug, Clone, Default)]
pub struct Diagram {
    pub(crate) blocks: Vec<Block>,
    pub(crate) ports: Vec<Port>,
    pub(crate) connections: Vec<Connection>,
    pub(crate) roots: Vec<BlockId>,
    pub(crate) revision: u64,
    laid_out: Option<u64>,
    metrics: TextMetrics,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(metrics: TextMetrics) -> Self {
        Self {
            metrics,
            ..Self::default()
        }
    }

    pub fn set_metrics(&mut self, metrics: TextMetrics) {
        self.metrics = metrics;
        self.touch();
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id.0]
    }

    pub fn connection(&self, id: ConnectionId) -> &Connection {
        &self.connections[id.0]
    }

    pub fn roots(&self) -> &[BlockId] {
        &self.roots
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter().enumerate().map(|(i, b)| (BlockId(i), b))
    }

    pub fn ports(&self) -> impl Iterator<Item = (PortId, &Port)> {
        self.ports.iter().enumerate().map(|(i, p)| (PortId(i), p))
    }

    pub fn connections(&self) -> impl Iterator<Item = (ConnectionId, &Connection)> {
        self.connections
            .iter()
            .enumerate()
            .map(|(i, c)| (ConnectionId(i), c))
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True when bounds reflect the current structure.
    pub fn is_laid_out(&self) -> bool {
        self.laid_out == Some(self.revision)
    }

    /// The cached base routing grid of `id`, if it is current.
    pub fn walk_grid(&self, id: BlockId) -> Option<&WalkGrid> {
        self.blocks[id.0]
            .grid
            .as_ref()
            .filter(|cached| cached.revision == self.revision)
            .map(|cached| &cached.grid)
    }

    // ── Construction ────────────────────────────────────────────────

    pub fn add_root(&mut self, id: impl Into<String>, name: impl Into<String>, display: bool) -> BlockId {
        let handle = BlockId(self.blocks.len());
        self.blocks
            .push(Block::new(id.into(), name.into(), None, 0, display));
        self.roots.push(handle);
        self.touch();
        handle
    }

    pub fn add_subblock(
        &mut self,
        parent: BlockId,
        id: impl Into<String>,
        name: impl Into<String>,
        display: bool,
    ) -> BlockId {
        let handle = BlockId(self.blocks.len());
        let layer = self.blocks[parent.0].layer + 1;
        self.blocks
            .push(Block::new(id.into(), name.into(), Some(parent), layer, display));
        self.blocks[parent.0].subblocks.push(handle);
        self.touch();
        handle
    }

    /// Add a port; its role, and so its place in the port order, follows
    /// from the name.
    pub fn add_port(
        &mut self,
        block: BlockId,
        id: impl Into<String>,
        name: impl Into<String>,
        direction: Direction,
    ) -> PortId {
        let handle = PortId(self.ports.len());
        let port = Port::new(id.into(), name.into(), direction, block);
        let owner = &mut self.blocks[block.0];
        match port.role {
            PortRole::Clock => owner.clock_ports.push(handle),
            PortRole::Reset => owner.reset_ports.push(handle),
            PortRole::Other => owner.other_ports.push(handle),
        }
        self.ports.push(port);
        self.touch();
        handle
    }

    /// Create a net owned by `scope`. Both ports must belong to `scope` or
    /// one of its descendants. The net starts hidden.
    pub fn connect(
        &mut self,
        scope: BlockId,
        start: PortId,
        end: PortId,
    ) -> Result<ConnectionId, DiagramError> {
        for port in [start, end] {
            let owner = self.ports[port.0].block;
            if !self.is_within(owner, scope) {
                return Err(DiagramError::PortOutOfScope {
                    port: self.ports[port.0].name.clone(),
                    owner: self.blocks[owner.0].id.clone(),
                    scope: self.blocks[scope.0].id.clone(),
                });
            }
        }

        let (from, to) = (self.ports[start.0].direction, self.ports[end.0].direction);
        if from != to {
            if !matches!(from, Direction::Output | Direction::InOut) {
                tracing::warn!(
                    port = %self.ports[start.0].name,
                    direction = from.as_str(),
                    "connection start port is not an output or inout"
                );
            }
            if !matches!(to, Direction::Input | Direction::InOut) {
                tracing::warn!(
                    port = %self.ports[end.0].name,
                    direction = to.as_str(),
                    "connection end port is not an input or inout"
                );
            }
        }

        let handle = ConnectionId(self.connections.len());
        self.connections.push(Connection {
            start,
            end,
            owner: scope,
            width: 1,
            colour: None,
            visible: false,
            path: Vec::new(),
            quality: None,
            kind: None,
        });
        self.blocks[scope.0].connections.push(handle);
        self.ports[start.0].connections.push(handle);
        self.ports[end.0].connections.push(handle);
        self.touch();
        Ok(handle)
    }

    // ── Mutation ────────────────────────────────────────────────────

    pub fn set_display(&mut self, id: BlockId, display: bool) {
        if self.blocks[id.0].display != display {
            self.blocks[id.0].display = display;
            self.touch();
        }
    }

    /// Visibility is not structural: cached paths of other nets survive.
    pub fn set_visible(&mut self, id: ConnectionId, visible: bool) {
        self.connections[id.0].visible = visible;
    }

    pub fn set_connection_colour(&mut self, id: ConnectionId, colour: Option<String>) {
        self.connections[id.0].colour = colour;
    }

    pub fn set_connection_kind(&mut self, id: ConnectionId, kind: Option<String>) {
        self.connections[id.0].kind = kind;
    }

    pub fn set_port_colour(&mut self, id: PortId, colour: Option<String>) {
        self.ports[id.0].colour = colour;
    }

    pub fn set_constant_tie(&mut self, id: PortId, tie: Option<String>) {
        self.ports[id.0].constant_tie = tie;
        self.touch();
    }

    pub fn set_block_reference(&mut self, id: BlockId, reference: impl Into<String>) {
        self.blocks[id.0].reference = Some(reference.into());
    }

    pub fn set_port_reference(&mut self, id: PortId, reference: impl Into<String>) {
        self.ports[id.0].reference = Some(reference.into());
    }

    /// Drop every block, port and connection.
    pub fn reset(&mut self) {
        self.blocks.clear();
        self.ports.clear();
        self.connections.clear();
        self.roots.clear();
        self.touch();
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    // ── Passes ──────────────────────────────────────────────────────

    /// Lay out every visible root and stack the roots in one column.
    pub fn layout(&mut self) {
        let metrics = self.metrics.clone();
        let mut next_y = 0;
        for root in self.roots.clone() {
            if !self.blocks[root.0].display {
                continue;
            }
            self.layout_block(root, &metrics);
            let bounds = &mut self.blocks[root.0].bounds;
            bounds.set_origin(Coords::new(0, next_y));
            next_y += bounds.height + BLOCK_SPACING;
        }
        self.laid_out = Some(self.revision);
    }

    fn ensure_laid_out(&mut self) {
        if !self.is_laid_out() {
            self.layout();
        }
    }

    /// Route every visible, unrouted net. Children route before parents.
    ///
    /// With routing disabled every cached path is dropped, so the next
    /// render draws flight lines only.
    pub fn route(&mut self, config: &RoutingConfig) {
        self.ensure_laid_out();
        if !config.enabled {
            for conn in &mut self.connections {
                conn.clear_path();
            }
            tracing::debug!("routing disabled, nets render as flight lines");
            return;
        }
        for root in self.roots.clone() {
            self.route_block(root, config);
        }
    }

    /// Record drawn bounds and produce the draw list.
    pub fn render(&mut self, theme: &Theme, config: &RenderConfig) -> Scene {
        self.ensure_laid_out();
        self.render_scene(theme, config)
    }

    /// Innermost visible element at absolute `(x, y)` after a render.
    pub fn resolve_coordinate(&self, x: i32, y: i32) -> Option<Hit> {
        self.roots
            .iter()
            .find_map(|&root| self.resolve_in_block(root, x, y))
    }

    // ── Hierarchy helpers ───────────────────────────────────────────

    /// Whether `block` is `scope` or one of its descendants.
    pub fn is_within(&self, block: BlockId, scope: BlockId) -> bool {
        let mut cur = Some(block);
        while let Some(id) = cur {
            if id == scope {
                return true;
            }
            cur = self.blocks[id.0].parent;
        }
        false
    }

    /// Whether every block from `block` up to and including `scope` is
    /// displayed.
    pub(crate) fn is_shown_within(&self, block: BlockId, scope: BlockId) -> bool {
        let mut cur = Some(block);
        while let Some(id) = cur {
            if !self.blocks[id.0].display {
                return false;
            }
            if id == scope {
                return true;
            }
            cur = self.blocks[id.0].parent;
        }
        false
    }

    /// Port anchor in the frame of `scope`, summing every block offset
    /// between the port's owner and `scope`.
    pub(crate) fn port_position_in(&self, port: PortId, scope: BlockId) -> Option<Coords> {
        let port = &self.ports[port.0];
        let mut pos = port.bounds.origin();
        let mut cur = port.block;
        while cur != scope {
            let block = &self.blocks[cur.0];
            pos = pos.offset(block.bounds.origin());
            cur = block.parent?;
        }
        Some(pos)
    }

    /// Dotted hierarchical path of an element, e.g. `top.u0` or `top.u0.din`.
    pub fn full_path(&self, hit: Hit) -> String {
        match hit {
            Hit::Block(id) => self.block_path(id),
            Hit::Port(id) => {
                let port = &self.ports[id.0];
                port.reference
                    .clone()
                    .unwrap_or_else(|| format!("{}.{}", self.block_path(port.block), port.name))
            }
        }
    }

    fn block_path(&self, id: BlockId) -> String {
        if let Some(reference) = &self.blocks[id.0].reference {
            return reference.clone();
        }
        let mut parts = Vec::new();
        let mut cur = Some(id);
        while let Some(b) = cur {
            parts.push(self.blocks[b.0].id.as_str());
            cur = self.blocks[b.0].parent;
        }
        parts.reverse();
        parts.join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (Diagram, BlockId, BlockId, PortId, PortId) {
        let mut d = Diagram::new();
        let top = d.add_root("top", "top", true);
        let u0 = d.add_subblock(top, "u0", "u0", true);
        let a = d.add_port(top, "a", "a", Direction::Input);
        let b = d.add_port(u0, "b", "b", Direction::Input);
        (d, top, u0, a, b)
    }

    #[test]
    fn structural_edits_bump_the_revision() {
        let (mut d, top, u0, a, b) = pair();
        let before = d.revision();
        d.connect(top, a, b).unwrap();
        assert!(d.revision() > before);

        d.layout();
        assert!(d.is_laid_out());
        d.set_display(u0, false);
        assert!(!d.is_laid_out());
    }

    #[test]
    fn visibility_is_not_structural() {
        let (mut d, top, _, a, b) = pair();
        let net = d.connect(top, a, b).unwrap();
        d.layout();
        d.set_visible(net, true);
        assert!(d.is_laid_out());
    }

    #[test]
    fn connect_rejects_ports_outside_the_scope() {
        let (mut d, _top, u0, a, b) = pair();
        let err = d.connect(u0, a, b).unwrap_err();
        assert!(matches!(err, DiagramError::PortOutOfScope { .. }));
    }

    #[test]
    fn nets_register_on_both_ports() {
        let (mut d, top, _, a, b) = pair();
        let net = d.connect(top, a, b).unwrap();
        assert_eq!(d.port(a).connections(), &[net]);
        assert_eq!(d.port(b).connections(), &[net]);
        assert_eq!(d.block(top).connections(), &[net]);
        assert!(!d.connection(net).visible);
    }

    #[test]
    fn roots_stack_in_one_column() {
        let mut d = Diagram::new();
        let first = d.add_root("first", "first", true);
        let second = d.add_root("second", "second", true);
        d.layout();
        let b0 = d.block(first).bounds;
        let b1 = d.block(second).bounds;
        assert_eq!((b0.x, b0.y), (0, 0));
        assert_eq!((b1.x, b1.y), (0, b0.height + BLOCK_SPACING));
    }

    #[test]
    fn full_paths_follow_the_hierarchy() {
        let (d, _top, u0, _a, b) = pair();
        assert_eq!(d.full_path(Hit::Block(u0)), "top.u0");
        assert_eq!(d.full_path(Hit::Port(b)), "top.u0.b");
    }

    #[test]
    fn reset_empties_the_arena() {
        let (mut d, ..) = pair();
        d.reset();
        assert!(d.roots().is_empty());
        assert_eq!(d.blocks().count(), 0);
    }
}
