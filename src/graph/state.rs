//! The graph state reducer.
//!
//! `GraphState` is an immutable snapshot; [`GraphState::reduce`] returns the
//! next one. Collections are persistent vectors, so untouched parts are
//! shared between snapshots.

use im::Vector;

use crate::graph::model::{
    self, Connection, Edge, EdgeChange, EdgeId, Node, NodeChange, NodeId, Position,
};

/// The single open editor, if any. `content` is a working copy that only
/// reaches the node on [`Action::CloseEditor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSession {
    pub node_id: NodeId,
    pub content: String,
}

/// Progress of an edge-endpoint drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeUpdate {
    /// No drag pending. An `EdgeUpdateEnd` here is a no-op, so an End that
    /// was never preceded by a Start cannot delete an edge.
    #[default]
    Idle,
    /// Drag started and has not landed on a valid target yet.
    Dragging,
    /// Drag landed and the edge was rebound.
    Reconnected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateNode {
        position: Position,
        content: String,
        label: String,
    },
    NodesChanged(Vec<NodeChange>),
    EdgesChanged(Vec<EdgeChange>),
    Connect(Connection),
    OpenEditor(NodeId),
    CloseEditor(NodeId),
    EditorContentChanged(String),
    EdgeUpdateStart,
    EdgeUpdateAttempt { old: Edge, connection: Connection },
    EdgeUpdateEnd(Edge),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateNode { .. } => "create_node",
            Self::NodesChanged(_) => "nodes_changed",
            Self::EdgesChanged(_) => "edges_changed",
            Self::Connect(_) => "connect",
            Self::OpenEditor(_) => "open_editor",
            Self::CloseEditor(_) => "close_editor",
            Self::EditorContentChanged(_) => "editor_content_changed",
            Self::EdgeUpdateStart => "edge_update_start",
            Self::EdgeUpdateAttempt { .. } => "edge_update_attempt",
            Self::EdgeUpdateEnd(_) => "edge_update_end",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphState {
    nodes: Vector<Node>,
    edges: Vector<Edge>,
    editor: Option<EditorSession>,
    edge_update: EdgeUpdate,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &Vector<Node> {
        &self.nodes
    }

    pub fn edges(&self) -> &Vector<Edge> {
        &self.edges
    }

    pub fn editor(&self) -> Option<&EditorSession> {
        self.editor.as_ref()
    }

    pub fn edge_update(&self) -> EdgeUpdate {
        self.edge_update
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == *id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn reduce(&self, action: Action) -> GraphState {
        match action {
            Action::CreateNode {
                position,
                content,
                label,
            } => {
                let node = Node::new(self.fresh_node_id(), label, content, position);
                let mut nodes = self.nodes.clone();
                nodes.push_back(node);
                Self {
                    nodes,
                    ..self.clone()
                }
            }
            Action::NodesChanged(changes) => {
                let nodes = model::apply_node_changes(&changes, &self.nodes);
                // Edges never outlive either endpoint.
                let mut edges = self.edges.clone();
                edges.retain(|e| {
                    nodes.iter().any(|n| n.id == e.source) && nodes.iter().any(|n| n.id == e.target)
                });
                Self {
                    nodes,
                    edges,
                    ..self.clone()
                }
            }
            Action::EdgesChanged(changes) => {
                let mut edges = model::apply_edge_changes(&changes, &self.edges);
                edges.retain(|e| self.contains_node(e.source) && self.contains_node(e.target));
                Self {
                    edges,
                    ..self.clone()
                }
            }
            Action::Connect(connection) => {
                if !self.contains_node(connection.source) || !self.contains_node(connection.target)
                {
                    return self.clone();
                }
                Self {
                    edges: model::add_edge(&connection, &self.edges),
                    ..self.clone()
                }
            }
            Action::OpenEditor(id) => match self.node(id) {
                Some(node) => Self {
                    editor: Some(EditorSession {
                        node_id: id,
                        content: node.content.clone(),
                    }),
                    ..self.clone()
                },
                None => self.clone(),
            },
            Action::CloseEditor(id) => match &self.editor {
                Some(session) if session.node_id == id => {
                    let mut nodes = self.nodes.clone();
                    if let Some(idx) = nodes.iter().position(|n| n.id == id) {
                        let mut node = nodes[idx].clone();
                        node.content = session.content.clone();
                        nodes.set(idx, node);
                    }
                    Self {
                        nodes,
                        editor: None,
                        ..self.clone()
                    }
                }
                _ => self.clone(),
            },
            Action::EditorContentChanged(content) => match &self.editor {
                Some(session) => Self {
                    editor: Some(EditorSession {
                        node_id: session.node_id,
                        content,
                    }),
                    ..self.clone()
                },
                None => self.clone(),
            },
            Action::EdgeUpdateStart => Self {
                edge_update: EdgeUpdate::Dragging,
                ..self.clone()
            },
            Action::EdgeUpdateAttempt { old, connection } => {
                if !self.can_rebind(&old, &connection) {
                    return self.clone();
                }
                Self {
                    edges: model::update_edge(&old, &connection, &self.edges),
                    edge_update: EdgeUpdate::Reconnected,
                    ..self.clone()
                }
            }
            Action::EdgeUpdateEnd(edge) => {
                if self.edge_update != EdgeUpdate::Dragging {
                    return self.clone();
                }
                let mut edges = self.edges.clone();
                edges.retain(|e| e.id != edge.id);
                Self {
                    edges,
                    edge_update: EdgeUpdate::Idle,
                    ..self.clone()
                }
            }
        }
    }

    fn fresh_node_id(&self) -> NodeId {
        loop {
            let id = NodeId::generate();
            if !self.contains_node(id) {
                return id;
            }
        }
    }

    fn can_rebind(&self, old: &Edge, connection: &Connection) -> bool {
        if self.edge(&old.id).is_none() {
            return false;
        }
        self.contains_node(connection.source) && self.contains_node(connection.target)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn create(state: &GraphState, content: &str) -> (GraphState, NodeId) {
        let next = state.reduce(Action::CreateNode {
            position: Position::new(250.0, 25.0),
            content: content.to_string(),
            label: "note".to_string(),
        });
        let id = next.nodes().last().expect("node was created").id;
        (next, id)
    }

    fn connected_pair() -> (GraphState, NodeId, NodeId, Edge) {
        let (state, a) = create(&GraphState::new(), "a");
        let (state, b) = create(&state, "b");
        let state = state.reduce(Action::Connect(Connection::new(a, b).with_handles("a", "a")));
        let edge = state.edges()[0].clone();
        (state, a, b, edge)
    }

    #[test]
    fn created_node_ids_are_pairwise_distinct() {
        let mut state = GraphState::new();
        for _ in 0..64 {
            state = create(&state, "x").0;
        }
        let ids: HashSet<NodeId> = state.nodes().iter().map(|n| n.id).collect();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn open_then_close_without_edits_keeps_content() {
        let (state, a) = create(&GraphState::new(), "alpha");
        let (state, _) = create(&state, "beta");
        let after = state.reduce(Action::OpenEditor(a)).reduce(Action::CloseEditor(a));
        assert_eq!(after, state);
    }

    #[test]
    fn editing_commits_only_to_the_edited_node() {
        let (state, a) = create(&GraphState::new(), "alpha");
        let (state, b) = create(&state, "beta");

        let after = state
            .reduce(Action::OpenEditor(a))
            .reduce(Action::EditorContentChanged("gamma".to_string()))
            .reduce(Action::CloseEditor(a));

        assert_eq!(after.node(a).unwrap().content, "gamma");
        assert_eq!(after.node(b), state.node(b));
        assert!(after.editor().is_none());
    }

    #[test]
    fn working_copy_is_not_visible_before_close() {
        let (state, a) = create(&GraphState::new(), "alpha");
        let state = state
            .reduce(Action::OpenEditor(a))
            .reduce(Action::EditorContentChanged("draft".to_string()));
        assert_eq!(state.node(a).unwrap().content, "alpha");
        assert_eq!(state.editor().unwrap().content, "draft");
    }

    #[test]
    fn open_editor_for_missing_node_is_identity() {
        let (state, _) = create(&GraphState::new(), "alpha");
        assert_eq!(state.reduce(Action::OpenEditor(NodeId::generate())), state);
    }

    #[test]
    fn close_or_change_without_session_is_identity() {
        let (state, a) = create(&GraphState::new(), "alpha");
        assert_eq!(state.reduce(Action::CloseEditor(a)), state);
        assert_eq!(
            state.reduce(Action::EditorContentChanged("x".to_string())),
            state
        );
    }

    #[test]
    fn close_for_another_node_keeps_session_open() {
        let (state, a) = create(&GraphState::new(), "alpha");
        let (state, b) = create(&state, "beta");
        let open = state
            .reduce(Action::OpenEditor(a))
            .reduce(Action::EditorContentChanged("draft".to_string()));
        assert_eq!(open.reduce(Action::CloseEditor(b)), open);
    }

    #[test]
    fn closing_after_node_removal_drops_the_working_copy() {
        let (state, a) = create(&GraphState::new(), "alpha");
        let state = state
            .reduce(Action::OpenEditor(a))
            .reduce(Action::EditorContentChanged("draft".to_string()))
            .reduce(Action::NodesChanged(vec![NodeChange::Remove { id: a }]))
            .reduce(Action::CloseEditor(a));
        assert!(state.nodes().is_empty());
        assert!(state.editor().is_none());
    }

    #[test]
    fn connect_requires_both_endpoints() {
        let (state, a) = create(&GraphState::new(), "alpha");
        let dangling = state.reduce(Action::Connect(Connection::new(a, NodeId::generate())));
        assert!(dangling.edges().is_empty());

        let self_loop = state.reduce(Action::Connect(Connection::new(a, a)));
        assert_eq!(self_loop.edges().len(), 1, "self loops are left to the caller");
    }

    #[test]
    fn removing_a_node_cascades_to_its_edges() {
        let (state, a, b, _) = connected_pair();
        let (state, c) = create(&state, "c");
        let state = state.reduce(Action::Connect(Connection::new(b, c)));
        assert_eq!(state.edges().len(), 2);

        let state = state.reduce(Action::NodesChanged(vec![NodeChange::Remove { id: a }]));
        assert_eq!(state.edges().len(), 1);
        assert_eq!(state.edges()[0].source, b);
    }

    #[test]
    fn edge_drag_to_nowhere_removes_the_edge() {
        let (state, _, _, edge) = connected_pair();
        let state = state
            .reduce(Action::EdgeUpdateStart)
            .reduce(Action::EdgeUpdateEnd(edge));
        assert!(state.edges().is_empty());
    }

    #[test]
    fn edge_drag_onto_a_target_keeps_the_rebound_edge() {
        let (state, a, _, edge) = connected_pair();
        let (state, c) = create(&state, "c");
        let connection = Connection::new(a, c).with_handles("a", "a");

        let state = state
            .reduce(Action::EdgeUpdateStart)
            .reduce(Action::EdgeUpdateAttempt {
                old: edge.clone(),
                connection: connection.clone(),
            })
            .reduce(Action::EdgeUpdateEnd(edge));

        assert_eq!(state.edges().len(), 1);
        assert_eq!(state.edges()[0].connection(), connection);
        assert_eq!(state.edge_update(), EdgeUpdate::Reconnected);
    }

    #[test]
    fn edge_drag_onto_an_existing_connection_merges_into_it() {
        let (state, a, _, edge) = connected_pair();
        let (state, c) = create(&state, "c");
        let existing = Connection::new(a, c).with_handles("a", "a");
        let state = state.reduce(Action::Connect(existing.clone()));
        assert_eq!(state.edges().len(), 2);

        let state = state
            .reduce(Action::EdgeUpdateStart)
            .reduce(Action::EdgeUpdateAttempt {
                old: edge.clone(),
                connection: existing.clone(),
            });
        assert_eq!(state.edge_update(), EdgeUpdate::Reconnected);

        let state = state.reduce(Action::EdgeUpdateEnd(edge));
        assert_eq!(state.edges().len(), 1);
        assert_eq!(state.edges()[0].connection(), existing);
    }

    #[test]
    fn edges_changed_removes_by_id() {
        let (state, _, _, edge) = connected_pair();
        let state = state.reduce(Action::EdgesChanged(vec![EdgeChange::Remove { id: edge.id }]));
        assert!(state.edges().is_empty());
    }

    #[test]
    fn edges_changed_skips_duplicate_add() {
        let (state, _, _, edge) = connected_pair();
        let after = state.reduce(Action::EdgesChanged(vec![EdgeChange::Add(edge)]));
        assert_eq!(after, state);
    }

    #[test]
    fn edges_changed_never_adds_a_dangling_edge() {
        let (state, a, b, _) = connected_pair();
        let ghost = NodeId::generate();
        let after = state.reduce(Action::EdgesChanged(vec![
            EdgeChange::Add(Edge::from_connection(&Connection::new(a, ghost))),
            EdgeChange::Add(Edge::from_connection(&Connection::new(b, a))),
        ]));
        assert_eq!(after.edges().len(), 2);
        assert!(after.edges().iter().all(|e| e.target != ghost));

        let removed = state.reduce(Action::NodesChanged(vec![NodeChange::Remove { id: b }]));
        let readded = removed.reduce(Action::EdgesChanged(vec![EdgeChange::Add(
            state.edges()[0].clone(),
        )]));
        assert!(readded.edges().is_empty());
    }

    #[test]
    fn second_edge_update_end_is_a_noop() {
        let (state, a, _, edge) = connected_pair();
        let (state, c) = create(&state, "c");
        let state = state
            .reduce(Action::Connect(Connection::new(a, c)))
            .reduce(Action::EdgeUpdateStart)
            .reduce(Action::EdgeUpdateEnd(edge.clone()));
        let other = state.edges()[0].clone();
        assert_eq!(state.reduce(Action::EdgeUpdateEnd(other)), state);
    }

    #[test]
    fn edge_update_end_without_start_is_a_noop() {
        let (state, _, _, edge) = connected_pair();
        assert_eq!(state.reduce(Action::EdgeUpdateEnd(edge)), state);
    }

    #[test]
    fn edge_update_attempt_onto_missing_node_is_identity() {
        let (state, a, _, edge) = connected_pair();
        let dragging = state.reduce(Action::EdgeUpdateStart);
        let after = dragging.reduce(Action::EdgeUpdateAttempt {
            old: edge,
            connection: Connection::new(a, NodeId::generate()),
        });
        assert_eq!(after, dragging);
    }

    #[test]
    fn end_to_end_create_edit_commit() {
        let state = GraphState::new().reduce(Action::CreateNode {
            position: Position::new(250.0, 25.0),
            content: "hello".to_string(),
            label: "note".to_string(),
        });
        assert_eq!(state.nodes().len(), 1);
        let node = state.nodes()[0].clone();
        assert_eq!(node.content, "hello");
        assert_eq!(node.position, Position::new(250.0, 25.0));
        assert!(state.editor().is_none());

        let state = state.reduce(Action::OpenEditor(node.id));
        assert_eq!(state.editor().unwrap().content, "hello");

        let state = state
            .reduce(Action::EditorContentChanged("world".to_string()))
            .reduce(Action::CloseEditor(node.id));
        assert_eq!(state.node(node.id).unwrap().content, "world");
        assert!(state.editor().is_none());
    }
}
