//! Interaction controller. Turns palette drops and pointer gestures into
//! graph mutations and owns the one selection pointer the inspector reads.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::{Connection, Graph, NewNode, Removed};
use crate::{Diagram, Edge, EdgePatch, Node, NodeData, NodePatch, Position, Size, GROUP_TYPE};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 4.0;

/// What a drag from the palette carries to the canvas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DragPayload {
    pub node_type: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl DragPayload {
    pub fn new(node_type: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            label: label.into(),
            icon: None,
            color: None,
        }
    }

    fn into_node(self, position: Position) -> NewNode {
        let label = if self.label.is_empty() {
            self.node_type.clone()
        } else {
            self.label
        };
        let is_group = self.node_type == GROUP_TYPE;
        let data = NodeData {
            label,
            node_type: Some(self.node_type),
            icon: self.icon,
            color: self.color,
            ..NodeData::default()
        };
        if is_group {
            NewNode::group(position, data)
        } else {
            NewNode::custom(position, data)
        }
    }
}

/// Pan and zoom of the canvas. `x`/`y` is where canvas origin lands in the
/// viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Viewport-local point to canvas coordinates.
    pub fn project(&self, point: Position) -> Position {
        Position::new((point.x - self.x) / self.zoom, (point.y - self.y) / self.zoom)
    }

    /// Canvas coordinates to a viewport-local point.
    pub fn unproject(&self, point: Position) -> Position {
        Position::new(point.x * self.zoom + self.x, point.y * self.zoom + self.y)
    }
}

/// The one selected element. Nodes and edges are tagged separately, so an
/// edge that shares an id with a node is still told apart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    Node(String),
    Edge(String),
}

impl Selection {
    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Selection::None => None,
            Selection::Node(id) | Selection::Edge(id) => Some(id),
        }
    }
}

/// The selected element, read live from the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selected<'a> {
    Node(&'a Node),
    Edge(&'a Edge),
}

#[derive(Debug, Clone, Default)]
pub struct Canvas {
    graph: Graph,
    viewport: Viewport,
    bounds_origin: Position,
    selection: Selection,
    /// Bumped on every selection change, including re-selecting the same id.
    selection_epoch: u64,
    /// Bumped by every whole-diagram load.
    load_generation: u64,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_graph(graph: Graph) -> Self {
        Self {
            graph,
            ..Self::default()
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Viewport {
            zoom: viewport.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            ..viewport
        };
    }

    /// Top-left corner of the canvas element in client coordinates.
    pub fn set_bounds_origin(&mut self, origin: Position) {
        self.bounds_origin = origin;
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.viewport.x += dx;
        self.viewport.y += dy;
    }

    /// Zooms while keeping the canvas point under `anchor` (viewport-local)
    /// in place.
    pub fn zoom_to(&mut self, zoom: f64, anchor: Position) {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let ratio = zoom / self.viewport.zoom;
        self.viewport.x = anchor.x - (anchor.x - self.viewport.x) * ratio;
        self.viewport.y = anchor.y - (anchor.y - self.viewport.y) * ratio;
        self.viewport.zoom = zoom;
    }

    /// Client coordinates of a pointer event to canvas coordinates.
    pub fn to_canvas(&self, client: Position) -> Position {
        let local = Position::new(client.x - self.bounds_origin.x, client.y - self.bounds_origin.y);
        self.viewport.project(local)
    }

    // --- Gestures ---

    /// Places a node for a palette drop at `client`. Returns the new id, or
    /// `None` when the payload names no type.
    pub fn drop_payload(&mut self, payload: DragPayload, client: Position) -> Option<String> {
        if payload.node_type.is_empty() {
            debug!("ignoring drop without a node type");
            return None;
        }
        let position = self.to_canvas(client);
        Some(self.graph.add_node(payload.into_node(position)))
    }

    pub fn connect(&mut self, connection: Connection) -> Option<String> {
        self.graph.add_edge(connection)
    }

    pub fn drag_node(&mut self, id: &str, position: Position) -> bool {
        self.graph.move_node(id, position)
    }

    pub fn resize_group(&mut self, id: &str, size: Size) -> bool {
        self.graph.resize_node(id, size)
    }

    // --- Selection ---

    pub fn click_node(&mut self, id: &str) -> bool {
        if !self.graph.contains_node(id) {
            return false;
        }
        self.select(Selection::Node(id.to_string()));
        true
    }

    pub fn click_edge(&mut self, id: &str) -> bool {
        if self.graph.edge(id).is_none() {
            return false;
        }
        self.select(Selection::Edge(id.to_string()));
        true
    }

    pub fn click_pane(&mut self) {
        self.clear_selection();
    }

    pub fn clear_selection(&mut self) {
        self.select(Selection::None);
    }

    fn select(&mut self, selection: Selection) -> Selection {
        self.selection_epoch = self.selection_epoch.wrapping_add(1);
        std::mem::replace(&mut self.selection, selection)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_epoch(&self) -> u64 {
        self.selection_epoch
    }

    /// `None` when nothing is selected or the selected element is gone.
    pub fn selected(&self) -> Option<Selected<'_>> {
        match &self.selection {
            Selection::None => None,
            Selection::Node(id) => self.graph.node(id).map(Selected::Node),
            Selection::Edge(id) => self.graph.edge(id).map(Selected::Edge),
        }
    }

    pub fn delete_selection(&mut self) -> Option<Removed> {
        let removed = match self.select(Selection::None) {
            Selection::None => None,
            Selection::Node(id) => self.graph.delete_element(&id),
            Selection::Edge(id) => self
                .graph
                .delete_edge(&id)
                .then_some(Removed::Edge(id)),
        };
        debug!(?removed, "deleted selection");
        removed
    }

    /// The remove button shown on a hovered edge.
    pub fn remove_edge(&mut self, id: &str) -> bool {
        if self.selection == Selection::Edge(id.to_string()) {
            self.clear_selection();
        }
        self.graph.delete_edge(id)
    }

    // --- Data ---

    pub fn update_node_data(&mut self, id: &str, patch: &NodePatch) -> bool {
        self.graph.update_node_data(id, patch)
    }

    pub fn update_edge_data(&mut self, id: &str, patch: &EdgePatch) -> bool {
        self.graph.update_edge_data(id, patch)
    }

    /// Installs a whole diagram (template or generated) and drops the selection.
    pub fn load_diagram(&mut self, diagram: Diagram) {
        self.clear_selection();
        self.graph.replace_all(diagram);
        self.load_generation = self.load_generation.wrapping_add(1);
    }

    pub fn load_generation(&self) -> u64 {
        self.load_generation
    }

    pub fn to_diagram(&self) -> Diagram {
        self.graph.to_diagram()
    }
}
