use serde::Serialize;

use crate::error::DesignError;
use crate::model::{parent_path, Design, DesignNode, Endpoint, PortSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectSection {
    pub title: String,
    pub headings: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Starts folded in an interactive viewer.
    pub collapsed: bool,
}

impl InspectSection {
    fn new(title: &str, headings: &[&str], rows: Vec<Vec<String>>, collapsed: bool) -> Self {
        Self {
            title: title.to_string(),
            headings: headings.iter().map(|h| h.to_string()).collect(),
            rows,
            collapsed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inspection {
    pub title: String,
    pub sections: Vec<InspectSection>,
}

impl Inspection {
    pub fn section(&self, title: &str) -> Option<&InspectSection> {
        self.sections.iter().find(|s| s.title == title)
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn port_row(direction: &str, port: &PortSpec) -> Vec<String> {
    vec![port.name.clone(), direction.to_string(), port.kind.clone()]
}

/// Ports of `node` named by no connection in `node` or in `parent`.
fn unconnected_ports<'a>(
    node: &'a DesignNode,
    parent: Option<&DesignNode>,
) -> Vec<(&'static str, &'a PortSpec)> {
    node.ports
        .iter()
        .filter(|(_, port)| {
            !node.references_port(&node.id, &port.name)
                && !parent.is_some_and(|p| p.references_port(&node.id, &port.name))
        })
        .map(|(dir, port)| (dir.as_str(), port))
        .collect()
}

/// Tables describing the block at dotted `path`.
pub fn inspect_block(design: &Design, path: &str) -> Result<Inspection, DesignError> {
    let node = design.resolve_path(path)?;
    let parent = parent_path(path)
        .map(|p| design.resolve_path(p))
        .transpose()?;

    let mut props = vec![
        vec!["Name".to_string(), node.id.clone()],
        vec!["Type".to_string(), node.kind.clone()],
    ];
    if let Some(parent) = parent {
        props.push(vec!["Parent".to_string(), parent.id.clone()]);
    }
    for (key, value) in &node.attributes {
        props.push(vec![key.clone(), value_text(value)]);
    }

    let mut sections = vec![
        InspectSection::new("Block", &["Property", "Value"], props, false),
        InspectSection::new(
            "Block Ports",
            &["Port", "In/Out", "Type"],
            node.ports
                .iter()
                .map(|(dir, port)| port_row(dir.as_str(), port))
                .collect(),
            true,
        ),
    ];

    let unconnected: Vec<_> = unconnected_ports(node, parent)
        .into_iter()
        .map(|(dir, port)| port_row(dir, port))
        .collect();
    if !unconnected.is_empty() {
        sections.push(InspectSection::new(
            "Unconnected Ports",
            &["Port", "In/Out", "Type"],
            unconnected,
            true,
        ));
    }

    if !node.children.is_empty() {
        sections.push(InspectSection::new(
            "Block Children",
            &["Child", "Type"],
            node.children
                .iter()
                .map(|c| vec![c.id.clone(), c.kind.clone()])
                .collect(),
            true,
        ));
    }

    let child_unconnected: Vec<Vec<String>> = node
        .children
        .iter()
        .flat_map(|child| {
            unconnected_ports(child, Some(node))
                .into_iter()
                .map(move |(dir, port)| {
                    let mut row = vec![child.id.clone()];
                    row.extend(port_row(dir, port));
                    row
                })
        })
        .collect();
    if !child_unconnected.is_empty() {
        sections.push(InspectSection::new(
            "Child Unconnected",
            &["Block", "Port", "In/Out", "Type"],
            child_unconnected,
            true,
        ));
    }

    Ok(Inspection {
        title: path.to_string(),
        sections,
    })
}

/// Constant driving `block`.`port`, looked up in `scopes`.
fn constant_tie(scopes: &[&DesignNode], block: &str, port: &str) -> Option<String> {
    scopes.iter().flat_map(|s| &s.connections).find_map(|conn| {
        let drives = matches!(&conn.end, Endpoint::Port { block: b, port: p } if b == block && p == port);
        if drives { conn.start.constant_text() } else { None }
    })
}

/// Table describing port `port` of the block at dotted `block_path`.
pub fn inspect_port(
    design: &Design,
    block_path: &str,
    port: &str,
) -> Result<Inspection, DesignError> {
    let node = design.resolve_path(block_path)?;
    let unknown = || DesignError::UnknownPath(format!("{block_path}.{port}"));
    let (_, spec) = node.ports.find(port).ok_or_else(unknown)?;

    let mut rows = vec![
        vec!["Name".to_string(), spec.name.clone()],
        vec!["Type".to_string(), spec.kind.clone()],
        vec!["Parent".to_string(), node.id.clone()],
    ];
    for (key, value) in &spec.attributes {
        rows.push(vec![key.clone(), value_text(value)]);
    }

    let mut scopes = vec![node];
    if let Some(parent) = parent_path(block_path) {
        scopes.push(design.resolve_path(parent)?);
    }
    if let Some(tie) = constant_tie(&scopes, &node.id, port) {
        rows.push(vec!["Constant Tie".to_string(), tie]);
    }

    Ok(Inspection {
        title: format!("{block_path}.{port}"),
        sections: vec![InspectSection::new("Port", &["Property", "Value"], rows, false)],
    })
}
