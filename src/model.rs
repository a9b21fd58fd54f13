//! Read-only design tree supplied by an elaboration tool.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Seek};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diagram::Direction;
use crate::error::DesignError;

/// Archive entry holding the elaborated design.
pub const ARCHIVE_ENTRY: &str = "elaborated.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortSet {
    #[serde(default)]
    pub input: Vec<PortSpec>,
    #[serde(default)]
    pub output: Vec<PortSpec>,
    #[serde(default)]
    pub inout: Vec<PortSpec>,
}

impl PortSet {
    /// Inputs, then outputs, then bidirectional ports.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, &PortSpec)> {
        self.input
            .iter()
            .map(|p| (Direction::Input, p))
            .chain(self.output.iter().map(|p| (Direction::Output, p)))
            .chain(self.inout.iter().map(|p| (Direction::InOut, p)))
    }

    pub fn find(&self, name: &str) -> Option<(Direction, &PortSpec)> {
        self.iter().find(|(_, p)| p.name == name)
    }
}

/// One side of a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
    Port {
        block: String,
        port: String,
    },
    Constant {
        constant: serde_json::Value,
        #[serde(rename = "type", default)]
        kind: String,
    },
}

impl Endpoint {
    /// Printable form of a constant driver.
    pub fn constant_text(&self) -> Option<String> {
        match self {
            Endpoint::Constant { constant, .. } => Some(match constant {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            Endpoint::Port { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub start: Endpoint,
    pub end: Endpoint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignNode {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub ports: PortSet,
    #[serde(default)]
    pub children: Vec<DesignNode>,
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
}

impl DesignNode {
    pub fn child(&self, id: &str) -> Option<&DesignNode> {
        self.children.iter().find(|c| c.id == id)
    }

    /// The port an endpoint refers to. `block` naming this node means one of
    /// its own ports; any other name means a direct child.
    pub fn endpoint_port(&self, endpoint: &Endpoint) -> Option<(Direction, &PortSpec)> {
        match endpoint {
            Endpoint::Port { block, port } if *block == self.id => self.ports.find(port),
            Endpoint::Port { block, port } => self.child(block)?.ports.find(port),
            Endpoint::Constant { .. } => None,
        }
    }

    /// Interconnect type carried by a connection: the start port's type, or
    /// the constant's declared type.
    pub fn connection_kind(&self, conn: &ConnectionSpec) -> Option<String> {
        match &conn.start {
            Endpoint::Constant { kind, .. } => Some(kind.clone()),
            start => self.endpoint_port(start).map(|(_, p)| p.kind.clone()),
        }
    }

    /// Whether any connection in this node names `block`.`port` as an end.
    pub fn references_port(&self, block: &str, port: &str) -> bool {
        self.connections.iter().any(|conn| {
            [&conn.start, &conn.end].into_iter().any(|ep| {
                matches!(ep, Endpoint::Port { block: b, port: p } if b == block && p == port)
            })
        })
    }

    fn collect_kinds(&self, kinds: &mut BTreeSet<String>) {
        for conn in &self.connections {
            if let Some(kind) = self.connection_kind(conn)
                && !kind.is_empty()
            {
                kinds.insert(kind);
            }
        }
        for child in &self.children {
            child.collect_kinds(kinds);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Design {
    pub root: DesignNode,
}

impl Design {
    pub fn from_json(text: &str) -> Result<Self, DesignError> {
        Ok(Self {
            root: serde_json::from_str(text)?,
        })
    }

    /// Load a `.json` file, or a `.zip` archive holding `elaborated.json`.
    pub fn load(path: &Path) -> Result<Self, DesignError> {
        let is_zip = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        let io_err = |source| DesignError::Io {
            path: path.to_path_buf(),
            source,
        };
        if is_zip {
            let file = std::fs::File::open(path).map_err(io_err)?;
            Self::from_archive(file)
        } else {
            let text = std::fs::read_to_string(path).map_err(io_err)?;
            Self::from_json(&text)
        }
    }

    pub fn from_archive<R: Read + Seek>(reader: R) -> Result<Self, DesignError> {
        let mut archive = zip::ZipArchive::new(reader)?;
        let entry_name = archive
            .file_names()
            .find(|name| *name == ARCHIVE_ENTRY || name.ends_with(&format!("/{ARCHIVE_ENTRY}")))
            .map(str::to_string)
            .ok_or_else(|| DesignError::MissingArchiveEntry(ARCHIVE_ENTRY.to_string()))?;
        let mut text = String::new();
        archive
            .by_name(&entry_name)?
            .read_to_string(&mut text)
            .map_err(|source| DesignError::Io {
                path: entry_name.clone().into(),
                source,
            })?;
        Self::from_json(&text)
    }

    /// Walk dotted ids from the root. An empty path is the root itself.
    pub fn resolve_path(&self, path: &str) -> Result<&DesignNode, DesignError> {
        let unknown = || DesignError::UnknownPath(path.to_string());
        if path.is_empty() {
            return Ok(&self.root);
        }
        let mut parts = path.split('.');
        if parts.next() != Some(self.root.id.as_str()) {
            return Err(unknown());
        }
        let mut node = &self.root;
        for part in parts {
            node = node.child(part).ok_or_else(unknown)?;
        }
        Ok(node)
    }

    /// Every interconnect type used anywhere in the design, sorted.
    pub fn interconnect_types(&self) -> BTreeSet<String> {
        let mut kinds = BTreeSet::new();
        self.root.collect_kinds(&mut kinds);
        kinds
    }
}

/// Parent path of a dotted path, if it has one.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rsplit_once('.').map(|(parent, _)| parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SMALL: &str = r#"{
        "id": "top", "type": "soc",
        "ports": { "input": [{"name": "clk", "type": "clock"}], "output": [{"name": "q", "type": "data"}] },
        "children": [
            { "id": "u0", "type": "reg",
              "ports": { "input": [{"name": "d", "type": "data"}, {"name": "en", "type": "data"}],
                         "output": [{"name": "dout", "type": "data"}] } }
        ],
        "connections": [
            { "start": {"block": "u0", "port": "dout"}, "end": {"block": "top", "port": "q"} },
            { "start": {"constant": 1, "type": "data"}, "end": {"block": "u0", "port": "en"} },
            { "start": {"block": "top", "port": "clk"}, "end": {"block": "u0", "port": "d"} }
        ]
    }"#;

    #[test]
    fn endpoints_resolve_against_self_or_children() {
        let design = Design::from_json(SMALL).unwrap();
        let root = &design.root;
        let (dir, port) = root.endpoint_port(&root.connections[0].start).unwrap();
        assert_eq!(dir, Direction::Output);
        assert_eq!(port.name, "dout");
        let (dir, port) = root.endpoint_port(&root.connections[0].end).unwrap();
        assert_eq!(dir, Direction::Output);
        assert_eq!(port.name, "q");
        assert_eq!(root.connections[1].start.constant_text().as_deref(), Some("1"));
    }

    #[test]
    fn interconnect_types_come_from_start_ports() {
        let design = Design::from_json(SMALL).unwrap();
        let kinds: Vec<_> = design.interconnect_types().into_iter().collect();
        assert_eq!(kinds, vec!["clock".to_string(), "data".to_string()]);
    }

    #[test]
    fn dotted_paths_walk_children() {
        let design = Design::from_json(SMALL).unwrap();
        assert_eq!(design.resolve_path("top").unwrap().id, "top");
        assert_eq!(design.resolve_path("top.u0").unwrap().kind, "reg");
        assert_eq!(design.resolve_path("").unwrap().id, "top");
        assert!(matches!(
            design.resolve_path("top.nope"),
            Err(DesignError::UnknownPath(_))
        ));
        assert!(design.resolve_path("other").is_err());
        assert_eq!(parent_path("top.u0"), Some("top"));
        assert_eq!(parent_path("top"), None);
    }

    #[test]
    fn loads_json_and_zip_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("design.json");
        std::fs::write(&json_path, SMALL).unwrap();
        assert_eq!(Design::load(&json_path).unwrap().root.id, "top");

        let zip_path = dir.path().join("design.zip");
        let file = std::fs::File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(ARCHIVE_ENTRY, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(SMALL.as_bytes()).unwrap();
        writer.finish().unwrap();
        assert_eq!(Design::load(&zip_path).unwrap().root.children.len(), 1);
    }

    #[test]
    fn archive_without_design_is_rejected() {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer
                .start_file("readme.txt", zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(b"nothing here").unwrap();
            writer.finish().unwrap();
        }
        buf.set_position(0);
        assert!(matches!(
            Design::from_archive(buf),
            Err(DesignError::MissingArchiveEntry(_))
        ));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = Design::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
