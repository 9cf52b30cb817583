//! The authoritative node and edge store.
//!
//! Every structural invariant lives here: ids are unique and never reused,
//! edges only ever point at nodes that exist, and deleting a node takes its
//! edges with it in the same step. Callers never see these as errors; an
//! impossible request is simply a no-op.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::{
    Diagram, Edge, EdgePatch, Node, NodeData, NodeKind, NodePatch, NodeStyle, Position, Size,
    DEFAULT_EDGE_TYPE, MIN_GROUP_DIMENSION,
};

const NODE_ID_PREFIX: &str = "dndnode_";
const EDGE_ID_PREFIX: &str = "edge_";

/// Mints ids for a single graph. Nodes and edges share one counter so a
/// minted node id can never equal a minted edge id.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn next_node_id(&mut self) -> String {
        self.mint(NODE_ID_PREFIX)
    }

    pub fn next_edge_id(&mut self) -> String {
        self.mint(EDGE_ID_PREFIX)
    }

    /// Wraps instead of overflowing; [`Graph`] skips any candidate already
    /// in use, so wrapping never yields a duplicate.
    fn mint(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}{}", self.next);
        self.next = self.next.wrapping_add(1);
        id
    }

    /// Moves the counter past an externally supplied id that happens to use
    /// one of our prefixes. Ids at the very top of the range are left to the
    /// in-use check instead.
    fn reserve(&mut self, id: &str) {
        let taken = [NODE_ID_PREFIX, EDGE_ID_PREFIX]
            .iter()
            .find_map(|prefix| id.strip_prefix(prefix))
            .and_then(|n| n.parse::<u64>().ok())
            .and_then(|n| n.checked_add(1));
        if let Some(next) = taken {
            self.next = self.next.max(next);
        }
    }
}

/// A node waiting for an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    pub kind: NodeKind,
    pub position: Position,
    pub data: NodeData,
    pub style: Option<NodeStyle>,
}

impl NewNode {
    pub fn custom(position: Position, data: NodeData) -> Self {
        Self {
            kind: NodeKind::Custom,
            position,
            data,
            style: None,
        }
    }

    /// A group at the default size, stacked beneath ordinary nodes.
    pub fn group(position: Position, data: NodeData) -> Self {
        Self {
            kind: NodeKind::Group,
            position,
            data,
            style: Some(NodeStyle::group()),
        }
    }
}

/// A proposed edge, as produced by the connect gesture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connection {
    pub source: String,
    pub target: String,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
}

impl Connection {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn with_handles(mut self, source_handle: &str, target_handle: &str) -> Self {
        self.source_handle = Some(source_handle.to_string());
        self.target_handle = Some(target_handle.to_string());
        self
    }
}

/// What a delete actually removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removed {
    Node { id: String, edges: Vec<String> },
    Edge(String),
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    ids: IdGenerator,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_diagram(diagram: Diagram) -> Self {
        let mut graph = Self::new();
        graph.replace_all(diagram);
        graph
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    fn id_in_use(&self, id: &str) -> bool {
        self.node(id).is_some() || self.edge(id).is_some()
    }

    fn fresh_node_id(&mut self) -> String {
        loop {
            let id = self.ids.next_node_id();
            if !self.id_in_use(&id) {
                return id;
            }
            warn!(id = %id, "minted id already taken by an imported element, skipping");
        }
    }

    fn fresh_edge_id(&mut self) -> String {
        loop {
            let id = self.ids.next_edge_id();
            if !self.id_in_use(&id) {
                return id;
            }
            warn!(id = %id, "minted id already taken by an imported element, skipping");
        }
    }

    pub fn add_node(&mut self, draft: NewNode) -> String {
        let id = self.fresh_node_id();
        debug!(id = %id, kind = ?draft.kind, "adding node");
        self.nodes.push(Node {
            id: id.clone(),
            kind: draft.kind,
            position: draft.position,
            data: draft.data,
            style: draft.style,
        });
        id
    }

    /// Adds an edge between two existing nodes. Parallel edges and self-loops
    /// are allowed; a missing endpoint rejects the connection.
    pub fn add_edge(&mut self, connection: Connection) -> Option<String> {
        if !self.contains_node(&connection.source) || !self.contains_node(&connection.target) {
            debug!(
                source = %connection.source,
                target = %connection.target,
                "rejecting connection to a missing node"
            );
            return None;
        }
        let id = self.fresh_edge_id();
        self.edges.push(Edge {
            id: id.clone(),
            source: connection.source,
            target: connection.target,
            source_handle: connection.source_handle,
            target_handle: connection.target_handle,
            edge_type: DEFAULT_EDGE_TYPE.to_string(),
            data: Default::default(),
        });
        Some(id)
    }

    pub fn update_node_data(&mut self, id: &str, patch: &NodePatch) -> bool {
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => {
                node.data = node.data.merged(patch);
                true
            }
            None => {
                debug!(id, "ignoring data update for missing node");
                false
            }
        }
    }

    pub fn update_edge_data(&mut self, id: &str, patch: &EdgePatch) -> bool {
        match self.edges.iter_mut().find(|e| e.id == id) {
            Some(edge) => {
                edge.data = edge.data.merged(patch);
                true
            }
            None => {
                debug!(id, "ignoring data update for missing edge");
                false
            }
        }
    }

    pub fn move_node(&mut self, id: &str, position: Position) -> bool {
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    /// Resizes a group. Ordinary nodes size to their content and are left alone.
    pub fn resize_node(&mut self, id: &str, size: Size) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if !node.is_group() {
            debug!(id, "ignoring resize of a non-group node");
            return false;
        }
        let style = node.style.get_or_insert_with(NodeStyle::group);
        style.width = Some(size.width.max(MIN_GROUP_DIMENSION));
        style.height = Some(size.height.max(MIN_GROUP_DIMENSION));
        true
    }

    /// Deletes the node with this id together with every edge touching it.
    /// If no node matches, deletes the edge with this id instead.
    pub fn delete_element(&mut self, id: &str) -> Option<Removed> {
        if let Some(index) = self.nodes.iter().position(|n| n.id == id) {
            let node = self.nodes.remove(index);
            let mut edges = Vec::new();
            self.edges.retain(|e| {
                if e.touches(&node.id) {
                    edges.push(e.id.clone());
                    false
                } else {
                    true
                }
            });
            debug!(id, cascaded = edges.len(), "deleted node");
            return Some(Removed::Node { id: node.id, edges });
        }
        if self.delete_edge(id) {
            return Some(Removed::Edge(id.to_string()));
        }
        None
    }

    pub fn delete_edge(&mut self, id: &str) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| e.id != id);
        before != self.edges.len()
    }

    /// Discards the whole graph and installs `diagram`. Duplicate ids and
    /// dangling edges in the incoming document are dropped.
    pub fn replace_all(&mut self, diagram: Diagram) {
        let Diagram { nodes, edges } = diagram;

        let mut node_ids = HashSet::with_capacity(nodes.len());
        let mut kept_nodes = Vec::with_capacity(nodes.len());
        for node in nodes {
            if node_ids.insert(node.id.clone()) {
                kept_nodes.push(node);
            } else {
                warn!(id = %node.id, "dropping node with duplicate id");
            }
        }

        let mut edge_ids = HashSet::with_capacity(edges.len());
        let mut kept_edges = Vec::with_capacity(edges.len());
        for edge in edges {
            if !node_ids.contains(&edge.source) || !node_ids.contains(&edge.target) {
                warn!(id = %edge.id, "dropping edge with a missing endpoint");
            } else if !edge_ids.insert(edge.id.clone()) {
                warn!(id = %edge.id, "dropping edge with duplicate id");
            } else {
                kept_edges.push(edge);
            }
        }

        for id in node_ids.iter().chain(edge_ids.iter()) {
            self.ids.reserve(id);
        }

        info!(
            nodes = kept_nodes.len(),
            edges = kept_edges.len(),
            "installed diagram"
        );
        self.nodes = kept_nodes;
        self.edges = kept_edges;
    }

    pub fn to_diagram(&self) -> Diagram {
        Diagram {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Nodes in paint order: lowest stacking order first, insertion order
    /// among equals, so groups end up underneath.
    pub fn render_order(&self) -> Vec<&Node> {
        let mut ordered: Vec<&Node> = self.nodes.iter().collect();
        ordered.sort_by_key(|n| n.z_index());
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EdgeData, TlsVersion};

    fn card(label: &str, node_type: &str) -> NewNode {
        NewNode::custom(
            Position::new(0.0, 0.0),
            NodeData {
                label: label.into(),
                node_type: Some(node_type.into()),
                color: Some("bg-green-600".into()),
                icon: Some("Microservice".into()),
                port: Some("8080".into()),
                ..NodeData::default()
            },
        )
    }

    fn three_node_graph() -> (Graph, String, String, String) {
        let mut graph = Graph::new();
        let a = graph.add_node(card("A", "Microservice"));
        let b = graph.add_node(card("B", "Microservice"));
        let c = graph.add_node(card("C", "Database"));
        (graph, a, b, c)
    }

    #[test]
    fn minted_ids_are_unique_even_with_repeated_labels() {
        let mut graph = Graph::new();
        let ids: Vec<String> = (0..50)
            .map(|_| graph.add_node(card("Same", "Microservice")))
            .collect();
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn importing_the_largest_id_does_not_exhaust_the_counter() {
        let top = format!("dndnode_{}", u64::MAX);
        let mut graph = Graph::new();
        graph.replace_all(Diagram {
            nodes: vec![Node {
                id: top.clone(),
                kind: NodeKind::Custom,
                position: Position::default(),
                data: NodeData::with_label("Imported"),
                style: None,
            }],
            edges: vec![],
        });

        let first = graph.add_node(card("A", "x"));
        let second = graph.add_node(card("B", "x"));
        let edge = graph.add_edge(Connection::new(&first, &top)).expect("edge");

        let ids: HashSet<&str> = graph
            .nodes()
            .iter()
            .map(|n| n.id.as_str())
            .chain(graph.edges().iter().map(|e| e.id.as_str()))
            .collect();
        assert_eq!(ids.len(), 4);
        assert_ne!(first, top);
        assert_ne!(second, top);
        assert_ne!(edge, top);
    }

    #[test]
    fn minting_skips_ids_already_in_use() {
        let mut graph = Graph::new();
        graph.replace_all(Diagram {
            nodes: vec![Node {
                id: "dndnode_0".into(),
                kind: NodeKind::Custom,
                position: Position::default(),
                data: NodeData::with_label("Imported"),
                style: None,
            }],
            edges: vec![],
        });
        graph.ids.next = u64::MAX;

        assert_eq!(graph.add_node(card("A", "x")), format!("dndnode_{}", u64::MAX));
        // The counter wraps to 0, which is taken, so 1 comes next.
        assert_eq!(graph.add_node(card("B", "x")), "dndnode_1");
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let mut graph = Graph::new();
        let first = graph.add_node(card("A", "x"));
        graph.delete_element(&first);
        let second = graph.add_node(card("A", "x"));
        assert_ne!(first, second);
    }

    #[test]
    fn separate_graphs_mint_independently() {
        let mut one = Graph::new();
        let mut two = Graph::new();
        assert_eq!(one.add_node(card("A", "x")), "dndnode_0");
        assert_eq!(two.add_node(card("A", "x")), "dndnode_0");
    }

    #[test]
    fn deleting_a_node_cascades_to_its_edges() {
        let mut graph = Graph::new();
        let a = graph.add_node(card("A", "x"));
        let b = graph.add_node(card("B", "x"));
        let edge = graph.add_edge(Connection::new(&a, &b)).expect("edge");

        let removed = graph.delete_element(&a).expect("removed");
        assert_eq!(
            removed,
            Removed::Node {
                id: a.clone(),
                edges: vec![edge.clone()]
            }
        );
        assert!(graph.edge(&edge).is_none());
        assert!(graph.contains_node(&b));
        assert!(graph
            .edges()
            .iter()
            .all(|e| graph.contains_node(&e.source) && graph.contains_node(&e.target)));
    }

    #[test]
    fn delete_falls_back_to_edge_ids() {
        let (mut graph, a, b, _) = three_node_graph();
        let edge = graph.add_edge(Connection::new(&a, &b)).expect("edge");
        assert_eq!(graph.delete_element(&edge), Some(Removed::Edge(edge)));
        assert_eq!(graph.nodes().len(), 3);
        assert_eq!(graph.delete_element("nope"), None);
    }

    #[test]
    fn connection_to_missing_node_is_rejected() {
        let (mut graph, a, _, _) = three_node_graph();
        assert_eq!(graph.add_edge(Connection::new(&a, "ghost")), None);
        assert_eq!(graph.add_edge(Connection::new("ghost", &a)), None);
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn parallel_edges_and_self_loops_are_kept() {
        let (mut graph, a, b, _) = three_node_graph();
        graph.add_edge(Connection::new(&a, &b)).expect("first");
        graph.add_edge(Connection::new(&a, &b)).expect("parallel");
        graph.add_edge(Connection::new(&a, &a)).expect("loop");
        assert_eq!(graph.edges().len(), 3);
    }

    #[test]
    fn edge_keeps_its_handles() {
        let (mut graph, a, b, _) = three_node_graph();
        let id = graph
            .add_edge(Connection::new(&a, &b).with_handles("right", "left"))
            .expect("edge");
        let edge = graph.edge(&id).expect("edge");
        assert_eq!(edge.source_handle.as_deref(), Some("right"));
        assert_eq!(edge.target_handle.as_deref(), Some("left"));
        assert_eq!(edge.edge_type, DEFAULT_EDGE_TYPE);
    }

    #[test]
    fn update_label_leaves_other_fields() {
        let (mut graph, a, _, _) = three_node_graph();
        let before = graph.node(&a).expect("node").data.clone();
        assert!(graph.update_node_data(&a, &NodePatch::label("X")));
        let after = &graph.node(&a).expect("node").data;
        assert_eq!(after.label, "X");
        assert_eq!(after.node_type, before.node_type);
        assert_eq!(after.color, before.color);
        assert_eq!(after.icon, before.icon);
        assert_eq!(after.port, before.port);
    }

    #[test]
    fn update_of_missing_node_is_a_no_op() {
        let (mut graph, _, _, _) = three_node_graph();
        assert!(!graph.update_node_data("ghost", &NodePatch::label("X")));
        assert_eq!(graph.nodes().len(), 3);
    }

    #[test]
    fn edge_patch_merges_into_existing_data() {
        let (mut graph, a, b, _) = three_node_graph();
        let id = graph.add_edge(Connection::new(&a, &b)).expect("edge");
        graph.update_edge_data(&id, &EdgePatch::tls(true));
        graph.update_edge_data(
            &id,
            &EdgePatch {
                tls_version: Some(TlsVersion::Tls13),
                ..EdgePatch::default()
            },
        );
        let data = &graph.edge(&id).expect("edge").data;
        assert!(data.tls);
        assert_eq!(data.tls_version, Some(TlsVersion::Tls13));
    }

    #[test]
    fn replace_all_discards_prior_graph() {
        let (mut graph, _, _, _) = three_node_graph();
        let template = Diagram {
            nodes: vec![Node {
                id: "1".into(),
                kind: NodeKind::Custom,
                position: Position::new(100.0, 100.0),
                data: NodeData::with_label("Android App"),
                style: None,
            }],
            edges: vec![],
        };
        graph.replace_all(template);
        assert_eq!(graph.nodes().len(), 1);
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn snapshot_round_trips_through_replace_all() {
        let (mut graph, a, b, c) = three_node_graph();
        graph.add_edge(Connection::new(&a, &b)).expect("edge");
        graph.add_edge(Connection::new(&b, &c)).expect("edge");
        let snapshot = graph.to_diagram();

        let mut restored = Graph::new();
        restored.replace_all(snapshot.clone());
        assert_eq!(restored.to_diagram(), snapshot);
    }

    #[test]
    fn replace_all_repairs_broken_documents() {
        let node = |id: &str| Node {
            id: id.into(),
            kind: NodeKind::Custom,
            position: Position::default(),
            data: NodeData::with_label(id),
            style: None,
        };
        let edge = |id: &str, s: &str, t: &str| Edge {
            id: id.into(),
            source: s.into(),
            target: t.into(),
            source_handle: None,
            target_handle: None,
            edge_type: DEFAULT_EDGE_TYPE.into(),
            data: EdgeData::default(),
        };
        let mut graph = Graph::new();
        graph.replace_all(Diagram {
            nodes: vec![node("a"), node("b"), node("a")],
            edges: vec![edge("e1", "a", "b"), edge("e1", "b", "a"), edge("e2", "a", "zz")],
        });
        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edges()[0].source, "a");
    }

    #[test]
    fn minted_ids_skip_past_imported_ones() {
        let mut graph = Graph::new();
        graph.replace_all(Diagram {
            nodes: vec![Node {
                id: "dndnode_7".into(),
                kind: NodeKind::Custom,
                position: Position::default(),
                data: NodeData::with_label("imported"),
                style: None,
            }],
            edges: vec![],
        });
        let id = graph.add_node(card("new", "x"));
        assert_eq!(id, "dndnode_8");
    }

    #[test]
    fn groups_resize_with_a_floor_and_render_first() {
        let mut graph = Graph::new();
        let card_id = graph.add_node(card("A", "x"));
        let group = graph.add_node(NewNode::group(
            Position::new(100.0, 50.0),
            NodeData::with_label("Layer"),
        ));

        assert!(graph.resize_node(&group, Size::new(40.0, 480.0)));
        assert_eq!(
            graph.node(&group).and_then(Node::size),
            Some(Size::new(MIN_GROUP_DIMENSION, 480.0))
        );
        assert!(!graph.resize_node(&card_id, Size::new(400.0, 400.0)));

        let order: Vec<&str> = graph.render_order().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec![group.as_str(), card_id.as_str()]);
    }

    #[test]
    fn move_node_updates_position() {
        let (mut graph, a, _, _) = three_node_graph();
        assert!(graph.move_node(&a, Position::new(12.0, 34.0)));
        assert_eq!(graph.node(&a).expect("node").position, Position::new(12.0, 34.0));
        assert!(!graph.move_node("ghost", Position::default()));
    }
}
