use serde::Serialize;

use super::types::Hit;
use super::Diagram;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BlockAction {
    /// Show every direct subblock.
    Expand,
    Inspect,
    /// Re-root the view at this block.
    MakeTop,
    FullPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PortAction {
    /// Reveal every net on the port together with the blocks it reaches.
    ShowFanout,
    Inspect,
    HighlightFanout,
    FullPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Action {
    Block(BlockAction),
    Port(PortAction),
}

/// A user request against one diagram element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionEvent {
    pub target: Hit,
    pub action: Action,
}

impl ActionEvent {
    pub fn new(target: Hit, action: Action) -> Self {
        Self { target, action }
    }

    /// The double-click action for `target`.
    pub fn default_for(target: Hit) -> Self {
        Self::new(target, default_action(target))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub label: &'static str,
    pub action: Action,
}

impl MenuItem {
    fn new(label: &'static str, action: Action) -> Self {
        Self { label, action }
    }
}

pub fn default_action(target: Hit) -> Action {
    match target {
        Hit::Block(_) => Action::Block(BlockAction::Expand),
        Hit::Port(_) => Action::Port(PortAction::ShowFanout),
    }
}

/// Context menu entries for `target`, in display order.
pub fn menu_for(diagram: &Diagram, target: Hit) -> Vec<MenuItem> {
    let mut items = Vec::new();
    match target {
        Hit::Block(id) => {
            if !diagram.block(id).subblocks().is_empty() {
                items.push(MenuItem::new("Expand Block", Action::Block(BlockAction::Expand)));
            }
            items.push(MenuItem::new("Inspect Block", Action::Block(BlockAction::Inspect)));
            items.push(MenuItem::new("Browse from Block", Action::Block(BlockAction::MakeTop)));
            items.push(MenuItem::new("Copy Full Path", Action::Block(BlockAction::FullPath)));
        }
        Hit::Port(_) => {
            items.push(MenuItem::new(
                "Show Port Connections",
                Action::Port(PortAction::ShowFanout),
            ));
            items.push(MenuItem::new("Inspect Port", Action::Port(PortAction::Inspect)));
            items.push(MenuItem::new(
                "Highlight Fan-out",
                Action::Port(PortAction::HighlightFanout),
            ));
            items.push(MenuItem::new("Copy Full Path", Action::Port(PortAction::FullPath)));
        }
    }
    items
}
