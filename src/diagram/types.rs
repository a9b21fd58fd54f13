use serde::Serialize;

use crate::geometry::{Bounds, Coords, Index2D};

use super::label::Label;
use super::routing::WalkGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BlockId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PortId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ConnectionId(pub(crate) usize);

impl BlockId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl PortId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl ConnectionId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Input,
    Output,
    InOut,
}

impl Direction {
    /// Inputs and bidirectional ports sit on the left edge.
    pub fn is_left_edge(self) -> bool {
        matches!(self, Direction::Input | Direction::InOut)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
            Direction::InOut => "inout",
        }
    }
}

/// Role inferred from a port name; decides which port set the port joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PortRole {
    Clock,
    Reset,
    Other,
}

impl PortRole {
    pub fn infer(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.contains("clk") || lower.contains("clock") {
            PortRole::Clock
        } else if lower.contains("rst") || lower.contains("reset") {
            PortRole::Reset
        } else {
            PortRole::Other
        }
    }
}

/// Which grid a connection's path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RouteQuality {
    /// Routed on the per-pass safe grid, clear of earlier nets.
    Separated,
    /// Routed on the base grid after the safe grid was too congested.
    Shared,
    /// No route on either grid; drawn as a flight line.
    Unroutable,
}

/// Element found under a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Hit {
    Block(BlockId),
    Port(PortId),
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: String,
    pub name: String,
    pub parent: Option<BlockId>,
    pub layer: usize,
    pub(crate) display: bool,
    /// Relative to the parent block; valid right after layout.
    pub bounds: Bounds,
    /// Absolute; valid right after render.
    pub drawn: Bounds,
    pub index: Index2D,
    pub label: Label,
    pub(crate) subblocks: Vec<BlockId>,
    pub(crate) clock_ports: Vec<PortId>,
    pub(crate) reset_ports: Vec<PortId>,
    pub(crate) other_ports: Vec<PortId>,
    pub(crate) connections: Vec<ConnectionId>,
    pub reference: Option<String>,
    pub(crate) grid: Option<CachedGrid>,
}

impl Block {
    pub fn display(&self) -> bool {
        self.display
    }

    pub fn subblocks(&self) -> &[BlockId] {
        &self.subblocks
    }

    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    /// Clock ports first, then resets, then everything else.
    pub fn all_ports(&self) -> Vec<PortId> {
        let mut ports =
            Vec::with_capacity(self.clock_ports.len() + self.reset_ports.len() + self.other_ports.len());
        ports.extend_from_slice(&self.clock_ports);
        ports.extend_from_slice(&self.reset_ports);
        ports.extend_from_slice(&self.other_ports);
        ports
    }

    pub fn ports_with_role(&self, role: PortRole) -> &[PortId] {
        match role {
            PortRole::Clock => &self.clock_ports,
            PortRole::Reset => &self.reset_ports,
            PortRole::Other => &self.other_ports,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Port {
    pub id: String,
    pub name: String,
    pub direction: Direction,
    pub role: PortRole,
    pub block: BlockId,
    /// Relative to the owning block; valid right after layout.
    pub bounds: Bounds,
    /// Absolute; valid right after render.
    pub drawn: Bounds,
    pub label: Label,
    pub colour: Option<String>,
    pub(crate) constant_tie: Option<String>,
    pub(crate) connections: Vec<ConnectionId>,
    pub reference: Option<String>,
}

impl Port {
    pub fn constant_tie(&self) -> Option<&str> {
        self.constant_tie.as_deref()
    }

    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub start: PortId,
    pub end: PortId,
    /// Block whose scope routes and draws this net.
    pub owner: BlockId,
    pub width: u32,
    pub colour: Option<String>,
    pub visible: bool,
    /// Grid-aligned pixel vertices relative to `owner`; empty until routed.
    pub path: Vec<Coords>,
    pub quality: Option<RouteQuality>,
    /// Interconnect type the net carries, when known.
    pub kind: Option<String>,
}

impl Connection {
    pub fn is_routed(&self) -> bool {
        !self.path.is_empty()
    }

    pub(crate) fn clear_path(&mut self) {
        self.path.clear();
        self.quality = None;
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CachedGrid {
    pub(crate) revision: u64,
    pub(crate) grid: WalkGrid,
}
