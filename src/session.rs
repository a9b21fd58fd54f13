//! Viewing context: the loaded design, the diagram built from it and the
//! per-interconnect-type filters applied on top.

use std::collections::BTreeMap;

use regex::Regex;

use crate::config::Config;
use crate::diagram::{
    menu_for, Action, ActionEvent, BlockAction, BlockId, ConnectionId, Diagram, Hit, MenuItem,
    PortAction, PortId, Scene, TextMetrics,
};
use crate::error::DesignError;
use crate::inspect::{inspect_block, inspect_port, Inspection};
use crate::model::{Design, DesignNode, Endpoint};

/// Result of dispatching an [`ActionEvent`].
#[derive(Debug, Clone)]
pub enum Outcome {
    Redrawn(Scene),
    FullPath(String),
    Inspected(Inspection),
    Ignored,
}

#[derive(Debug)]
pub struct Session {
    config: Config,
    design: Option<Design>,
    view_path: String,
    diagram: Diagram,
    filters: BTreeMap<String, bool>,
    colours: BTreeMap<String, String>,
    type_connections: BTreeMap<String, Vec<ConnectionId>>,
    type_ports: BTreeMap<String, Vec<PortId>>,
    highlights: usize,
}

impl Session {
    pub fn new(config: Config) -> Self {
        let metrics = TextMetrics::new(
            config.theme.font_family.clone(),
            config.layout.fast_text_metrics,
        );
        let colours = config.view.colours.clone();
        Self {
            config,
            design: None,
            view_path: String::new(),
            diagram: Diagram::with_metrics(metrics),
            filters: BTreeMap::new(),
            colours,
            type_connections: BTreeMap::new(),
            type_ports: BTreeMap::new(),
            highlights: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn design(&self) -> Option<&Design> {
        self.design.as_ref()
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    /// Dotted path of the model node currently at the diagram root.
    pub fn view_path(&self) -> &str {
        &self.view_path
    }

    /// Interconnect types and whether their nets are shown.
    pub fn filters(&self) -> &BTreeMap<String, bool> {
        &self.filters
    }

    pub fn connections_of_type(&self, kind: &str) -> &[ConnectionId] {
        self.type_connections
            .get(kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn ports_of_type(&self, kind: &str) -> &[PortId] {
        self.type_ports
            .get(kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn load(&mut self, design: Design) -> Result<Scene, DesignError> {
        self.load_matching(design, None)
    }

    /// Load a design and view its root. Nets start hidden unless their type
    /// is listed in the view config or matches `show`.
    pub fn load_matching(
        &mut self,
        design: Design,
        show: Option<&Regex>,
    ) -> Result<Scene, DesignError> {
        self.filters.clear();
        for kind in design.interconnect_types() {
            let visible = self.config.view.show_types.contains(&kind)
                || show.is_some_and(|re| re.is_match(&kind));
            self.filters.insert(kind, visible);
        }
        tracing::debug!(types = self.filters.len(), root = %design.root.id, "design loaded");
        let root = design.root.id.clone();
        self.design = Some(design);
        self.view(&root)
    }

    /// Rebuild the diagram rooted at the model node at `path`.
    pub fn view(&mut self, path: &str) -> Result<Scene, DesignError> {
        let Some(design) = self.design.as_ref() else {
            return Err(DesignError::UnknownPath(path.to_string()));
        };
        let node = design.resolve_path(path)?;
        // references must always start at the root id
        let path = if path.is_empty() {
            design.root.id.as_str()
        } else {
            path
        };

        self.type_connections.clear();
        self.type_ports.clear();
        self.diagram.reset();

        let mut builder = ViewBuilder {
            diagram: &mut self.diagram,
            filters: &self.filters,
            colours: &self.colours,
            type_connections: &mut self.type_connections,
            type_ports: &mut self.type_ports,
            expand_depth: self.config.view.expand_depth,
        };
        builder.add_block(node, path.to_string(), None);
        self.view_path = path.to_string();
        Ok(self.refresh())
    }

    /// Full layout, route and render of the visible tree.
    pub fn refresh(&mut self) -> Scene {
        self.diagram.layout();
        self.diagram.route(&self.config.layout.routing);
        self.diagram.render(&self.config.theme, &self.config.render)
    }

    pub fn set_signal_visible(&mut self, kind: &str, visible: bool) -> Scene {
        self.filters.insert(kind.to_string(), visible);
        for &conn in self.type_connections.get(kind).into_iter().flatten() {
            self.diagram.set_visible(conn, visible);
        }
        self.refresh()
    }

    pub fn set_signal_colour(&mut self, kind: &str, colour: &str) -> Scene {
        self.colours.insert(kind.to_string(), colour.to_string());
        for &conn in self.type_connections.get(kind).into_iter().flatten() {
            self.diagram
                .set_connection_colour(conn, Some(colour.to_string()));
        }
        for &port in self.type_ports.get(kind).into_iter().flatten() {
            self.diagram.set_port_colour(port, Some(colour.to_string()));
        }
        self.refresh()
    }

    /// Hide every net and turn every type filter off.
    pub fn clear_connections(&mut self) -> Scene {
        let nets: Vec<ConnectionId> = self.diagram.connections().map(|(id, _)| id).collect();
        for net in nets {
            self.diagram.set_visible(net, false);
        }
        for visible in self.filters.values_mut() {
            *visible = false;
        }
        self.refresh()
    }

    pub fn set_route_signals(&mut self, enabled: bool) -> Scene {
        self.config.layout.routing.enabled = enabled;
        self.refresh()
    }

    pub fn set_show_grid(&mut self, show: bool) -> Scene {
        self.config.render.show_grid = show;
        self.refresh()
    }

    pub fn resolve(&self, x: i32, y: i32) -> Option<Hit> {
        self.diagram.resolve_coordinate(x, y)
    }

    pub fn menu(&self, hit: Hit) -> Vec<MenuItem> {
        menu_for(&self.diagram, hit)
    }

    pub fn dispatch(&mut self, event: ActionEvent) -> Result<Outcome, DesignError> {
        match (event.target, event.action) {
            (Hit::Block(block), Action::Block(action)) => self.block_action(block, action),
            (Hit::Port(port), Action::Port(action)) => self.port_action(port, action),
            (target, action) => {
                tracing::warn!(?target, ?action, "action does not apply to its target");
                Ok(Outcome::Ignored)
            }
        }
    }

    fn block_path(&self, block: BlockId) -> String {
        self.diagram.full_path(Hit::Block(block))
    }

    fn block_action(&mut self, block: BlockId, action: BlockAction) -> Result<Outcome, DesignError> {
        match action {
            BlockAction::Expand => {
                for child in self.diagram.block(block).subblocks().to_vec() {
                    self.diagram.set_display(child, true);
                }
                Ok(Outcome::Redrawn(self.refresh()))
            }
            BlockAction::Inspect => {
                let Some(design) = self.design.as_ref() else {
                    return Ok(Outcome::Ignored);
                };
                Ok(Outcome::Inspected(inspect_block(design, &self.block_path(block))?))
            }
            BlockAction::MakeTop => {
                let path = self.block_path(block);
                Ok(Outcome::Redrawn(self.view(&path)?))
            }
            BlockAction::FullPath => Ok(Outcome::FullPath(self.block_path(block))),
        }
    }

    fn port_action(&mut self, port: PortId, action: PortAction) -> Result<Outcome, DesignError> {
        match action {
            PortAction::ShowFanout => {
                for conn in self.diagram.port(port).connections().to_vec() {
                    let end = self.diagram.connection(conn).end;
                    let end_block = self.diagram.port(end).block;
                    self.diagram.set_display(end_block, true);
                    self.diagram.set_visible(conn, true);
                }
                Ok(Outcome::Redrawn(self.refresh()))
            }
            PortAction::Inspect => {
                let Some(design) = self.design.as_ref() else {
                    return Ok(Outcome::Ignored);
                };
                let owner = self.diagram.port(port).block;
                let name = self.diagram.port(port).name.clone();
                Ok(Outcome::Inspected(inspect_port(
                    design,
                    &self.block_path(owner),
                    &name,
                )?))
            }
            PortAction::HighlightFanout => {
                let colour = self
                    .config
                    .theme
                    .palette_colour(self.highlights)
                    .to_string();
                self.highlights += 1;
                self.diagram.set_port_colour(port, Some(colour.clone()));
                for conn in self.diagram.port(port).connections().to_vec() {
                    self.diagram
                        .set_connection_colour(conn, Some(colour.clone()));
                }
                Ok(Outcome::Redrawn(self.refresh()))
            }
            PortAction::FullPath => Ok(Outcome::FullPath(self.diagram.full_path(Hit::Port(port)))),
        }
    }
}

/// Builds diagram blocks from model nodes during [`Session::view`].
struct ViewBuilder<'a> {
    diagram: &'a mut Diagram,
    filters: &'a BTreeMap<String, bool>,
    colours: &'a BTreeMap<String, String>,
    type_connections: &'a mut BTreeMap<String, Vec<ConnectionId>>,
    type_ports: &'a mut BTreeMap<String, Vec<PortId>>,
    expand_depth: usize,
}

impl ViewBuilder<'_> {
    /// Returns the new block's ports by name.
    fn add_block(
        &mut self,
        node: &DesignNode,
        path: String,
        parent: Option<BlockId>,
    ) -> BTreeMap<String, PortId> {
        let block = match parent {
            None => self.diagram.add_root(&node.id, &node.id, true),
            Some(parent) => {
                let layer = self.diagram.block(parent).layer + 1;
                self.diagram
                    .add_subblock(parent, &node.id, &node.id, layer < self.expand_depth)
            }
        };

        let mut ports = BTreeMap::new();
        for (direction, spec) in node.ports.iter() {
            let port = self
                .diagram
                .add_port(block, &spec.name, &spec.name, direction);
            self.diagram
                .set_port_reference(port, format!("{path}.{}", spec.name));
            self.type_ports
                .entry(spec.kind.clone())
                .or_default()
                .push(port);
            if let Some(colour) = self.colours.get(&spec.kind) {
                self.diagram.set_port_colour(port, Some(colour.clone()));
            }
            ports.insert(spec.name.clone(), port);
        }
        self.diagram.set_block_reference(block, path.clone());

        let mut children = BTreeMap::new();
        for child in &node.children {
            let child_ports = self.add_block(child, format!("{path}.{}", child.id), Some(block));
            children.insert(child.id.as_str(), child_ports);
        }

        let lookup = |endpoint: &Endpoint| -> Option<PortId> {
            match endpoint {
                Endpoint::Port { block: b, port } if *b == node.id => ports.get(port).copied(),
                Endpoint::Port { block: b, port } => children.get(b.as_str())?.get(port).copied(),
                Endpoint::Constant { .. } => None,
            }
        };

        for conn in &node.connections {
            let Some(end) = lookup(&conn.end) else {
                tracing::warn!(block = %path, end = ?conn.end, "unresolved connection end, skipping");
                continue;
            };
            if let Some(tie) = conn.start.constant_text() {
                self.diagram.set_constant_tie(end, Some(tie));
                continue;
            }
            let Some(start) = lookup(&conn.start) else {
                tracing::warn!(block = %path, start = ?conn.start, "unresolved connection start, skipping");
                continue;
            };

            let net = match self.diagram.connect(block, start, end) {
                Ok(net) => net,
                Err(err) => {
                    tracing::warn!(%err, "skipping connection");
                    continue;
                }
            };
            let kind = node.connection_kind(conn).unwrap_or_default();
            if self.filters.get(&kind).copied().unwrap_or(false) {
                self.diagram.set_visible(net, true);
            }
            if let Some(colour) = self.colours.get(&kind) {
                self.diagram.set_connection_colour(net, Some(colour.clone()));
            }
            self.diagram.set_connection_kind(net, Some(kind.clone()));
            self.type_connections.entry(kind).or_default().push(net);
        }

        ports
    }
}
