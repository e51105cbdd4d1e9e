use std::fmt;

use im::Vector;
use uuid::Uuid;

/// Opaque node identity, generated once at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Edge identity, derived from the connection it binds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeId(String);

impl EdgeId {
    pub fn for_connection(connection: &Connection) -> Self {
        Self(format!(
            "edge-{}{}-{}{}",
            connection.source,
            connection.source_handle.as_deref().unwrap_or(""),
            connection.target,
            connection.target_handle.as_deref().unwrap_or(""),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A point on the canvas, in canvas units (not terminal cells).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rendering type tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeKind {
    #[default]
    Markdown,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
        }
    }
}

/// A note on the canvas.
///
/// Nodes carry data only; the edit affordance is derived from `id` by
/// whoever renders the node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Short display text shown while the node is collapsed.
    pub label: String,
    /// Markdown body.
    pub content: String,
    pub position: Position,
    pub selected: bool,
}

impl Node {
    pub fn new(
        id: NodeId,
        label: impl Into<String>,
        content: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id,
            kind: NodeKind::Markdown,
            label: label.into(),
            content: content.into(),
            position,
            selected: false,
        }
    }
}

/// Parameters of a connect gesture: both endpoints plus optional handle ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
}

impl Connection {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            source,
            target,
            source_handle: None,
            target_handle: None,
        }
    }

    pub fn with_handles(mut self, source_handle: &str, target_handle: &str) -> Self {
        self.source_handle = Some(source_handle.to_string());
        self.target_handle = Some(target_handle.to_string());
        self
    }
}

/// A link between two nodes. Carries nothing beyond connectivity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
    pub selected: bool,
}

impl Edge {
    pub fn from_connection(connection: &Connection) -> Self {
        Self {
            id: EdgeId::for_connection(connection),
            source: connection.source,
            target: connection.target,
            source_handle: connection.source_handle.clone(),
            target_handle: connection.target_handle.clone(),
            selected: false,
        }
    }

    pub fn connection(&self) -> Connection {
        Connection {
            source: self.source,
            target: self.target,
            source_handle: self.source_handle.clone(),
            target_handle: self.target_handle.clone(),
        }
    }
}

/// Low-level node mutation produced by canvas gestures.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    Add(Node),
    Position { id: NodeId, position: Position },
    Select { id: NodeId, selected: bool },
    Remove { id: NodeId },
}

/// Low-level edge mutation produced by canvas gestures.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeChange {
    Add(Edge),
    Select { id: EdgeId, selected: bool },
    Remove { id: EdgeId },
}

/// Apply node ops in order. Ops naming a missing id are skipped, as is an
/// `Add` whose id is already present.
pub fn apply_node_changes(changes: &[NodeChange], nodes: &Vector<Node>) -> Vector<Node> {
    let mut nodes = nodes.clone();
    for change in changes {
        match change {
            NodeChange::Add(node) => {
                if !nodes.iter().any(|n| n.id == node.id) {
                    nodes.push_back(node.clone());
                }
            }
            NodeChange::Position { id, position } => {
                if let Some(idx) = nodes.iter().position(|n| n.id == *id) {
                    let mut node = nodes[idx].clone();
                    node.position = *position;
                    nodes.set(idx, node);
                }
            }
            NodeChange::Select { id, selected } => {
                if let Some(idx) = nodes.iter().position(|n| n.id == *id) {
                    let mut node = nodes[idx].clone();
                    node.selected = *selected;
                    nodes.set(idx, node);
                }
            }
            NodeChange::Remove { id } => nodes.retain(|n| n.id != *id),
        }
    }
    nodes
}

/// Edge counterpart of [`apply_node_changes`].
pub fn apply_edge_changes(changes: &[EdgeChange], edges: &Vector<Edge>) -> Vector<Edge> {
    let mut edges = edges.clone();
    for change in changes {
        match change {
            EdgeChange::Add(edge) => {
                if !edges.iter().any(|e| e.id == edge.id) {
                    edges.push_back(edge.clone());
                }
            }
            EdgeChange::Select { id, selected } => {
                if let Some(idx) = edges.iter().position(|e| e.id == *id) {
                    let mut edge = edges[idx].clone();
                    edge.selected = *selected;
                    edges.set(idx, edge);
                }
            }
            EdgeChange::Remove { id } => edges.retain(|e| e.id != *id),
        }
    }
    edges
}

/// Append an edge for `connection` unless the same connection already exists.
pub fn add_edge(connection: &Connection, edges: &Vector<Edge>) -> Vector<Edge> {
    let edge = Edge::from_connection(connection);
    let mut edges = edges.clone();
    if !edges.iter().any(|e| e.id == edge.id) {
        edges.push_back(edge);
    }
    edges
}

/// Rebind `old` to `connection`. The replacement is appended at the end,
/// or merged into an existing edge with the same connection. Nothing changes
/// when `old` is not present.
pub fn update_edge(old: &Edge, connection: &Connection, edges: &Vector<Edge>) -> Vector<Edge> {
    if !edges.iter().any(|e| e.id == old.id) {
        return edges.clone();
    }
    let replacement = Edge::from_connection(connection);
    let mut edges = edges.clone();
    edges.retain(|e| e.id != old.id);
    if !edges.iter().any(|e| e.id == replacement.id) {
        edges.push_back(replacement);
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(label: &str) -> Node {
        Node::new(NodeId::generate(), label, "", Position::default())
    }

    #[test]
    fn node_changes_apply_in_order_and_skip_unknown_ids() {
        let a = node("a");
        let b = node("b");
        let nodes: Vector<Node> = vec![a.clone()].into_iter().collect();

        let updated = apply_node_changes(
            &[
                NodeChange::Add(b.clone()),
                NodeChange::Position {
                    id: a.id,
                    position: Position::new(10.0, 20.0),
                },
                NodeChange::Select {
                    id: NodeId::generate(),
                    selected: true,
                },
                NodeChange::Remove { id: b.id },
            ],
            &nodes,
        );

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].position, Position::new(10.0, 20.0));
        assert_eq!(nodes[0].position, Position::default(), "input must stay untouched");
    }

    #[test]
    fn adding_a_present_node_id_is_skipped() {
        let a = node("a");
        let nodes: Vector<Node> = vec![a.clone()].into_iter().collect();
        let mut dup = a.clone();
        dup.label = "other".to_string();
        let updated = apply_node_changes(&[NodeChange::Add(dup)], &nodes);
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].label, "a");
    }

    #[test]
    fn add_edge_ignores_duplicate_connections() {
        let conn = Connection::new(NodeId::generate(), NodeId::generate()).with_handles("a", "a");
        let edges = add_edge(&conn, &Vector::new());
        let edges = add_edge(&conn, &edges);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].id, EdgeId::for_connection(&conn));
    }

    #[test]
    fn update_edge_replaces_and_appends() {
        let (a, b, c) = (NodeId::generate(), NodeId::generate(), NodeId::generate());
        let ab = Connection::new(a, b);
        let bc = Connection::new(b, c);
        let edges = add_edge(&bc, &add_edge(&ab, &Vector::new()));
        let old = edges[0].clone();

        let ac = Connection::new(a, c);
        let updated = update_edge(&old, &ac, &edges);

        assert_eq!(updated.len(), 2);
        assert_eq!(updated[0].connection(), bc);
        assert_eq!(updated[1].connection(), ac);
    }

    #[test]
    fn update_edge_without_old_edge_is_unchanged() {
        let (a, b) = (NodeId::generate(), NodeId::generate());
        let stale = Edge::from_connection(&Connection::new(a, b));
        let edges = update_edge(&stale, &Connection::new(b, a), &Vector::new());
        assert!(edges.is_empty());
    }
}
