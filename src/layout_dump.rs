use crate::diagram::{Diagram, RouteQuality};
use crate::geometry::Bounds;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub revision: u64,
    pub blocks: Vec<BlockDump>,
    pub ports: Vec<PortDump>,
    pub connections: Vec<ConnectionDump>,
}

#[derive(Debug, Serialize)]
pub struct BlockDump {
    pub index: usize,
    pub id: String,
    pub path: String,
    pub parent: Option<usize>,
    pub layer: usize,
    pub display: bool,
    pub bounds: Bounds,
    pub drawn: Bounds,
    pub label: Bounds,
}

#[derive(Debug, Serialize)]
pub struct PortDump {
    pub index: usize,
    pub name: String,
    pub block: usize,
    pub direction: String,
    pub bounds: Bounds,
    pub drawn: Bounds,
    pub constant_tie: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionDump {
    pub index: usize,
    pub owner: usize,
    pub start: usize,
    pub end: usize,
    pub kind: Option<String>,
    pub visible: bool,
    pub quality: Option<RouteQuality>,
    pub points: Vec<[i32; 2]>,
}

impl LayoutDump {
    pub fn from_diagram(diagram: &Diagram) -> Self {
        let blocks = diagram
            .blocks()
            .map(|(id, block)| BlockDump {
                index: id.index(),
                id: block.id.clone(),
                path: diagram.full_path(crate::diagram::Hit::Block(id)),
                parent: block.parent.map(|p| p.index()),
                layer: block.layer,
                display: block.display(),
                bounds: block.bounds,
                drawn: block.drawn,
                label: block.label.bounds,
            })
            .collect();

        let ports = diagram
            .ports()
            .map(|(id, port)| PortDump {
                index: id.index(),
                name: port.name.clone(),
                block: port.block.index(),
                direction: port.direction.as_str().to_string(),
                bounds: port.bounds,
                drawn: port.drawn,
                constant_tie: port.constant_tie().map(str::to_string),
            })
            .collect();

        let connections = diagram
            .connections()
            .map(|(id, conn)| ConnectionDump {
                index: id.index(),
                owner: conn.owner.index(),
                start: conn.start.index(),
                end: conn.end.index(),
                kind: conn.kind.clone(),
                visible: conn.visible,
                quality: conn.quality,
                points: conn.path.iter().map(|pt| [pt.x, pt.y]).collect(),
            })
            .collect();

        LayoutDump {
            revision: diagram.revision(),
            blocks,
            ports,
            connections,
        }
    }
}

pub fn write_layout_dump(path: &Path, diagram: &Diagram) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_diagram(diagram);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
