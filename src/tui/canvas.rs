use std::collections::HashSet;
use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::{Frame, Terminal};
use tracing::{debug, info};

use crate::config::Config;
use crate::graph::model::{Connection, Edge, EdgeChange, NodeChange, NodeId, Position};
use crate::graph::state::{Action, EdgeUpdate, GraphState};
use crate::hotkey::{HotkeyEvent, HotkeyTracker};
use crate::tui::editor::{self, EditorView};
use crate::tui::input::{self, Direction, EdgeEnd, KeyAction, KeyboardSubscription};
use crate::tui::render::{
    self, CELL_HEIGHT, CELL_WIDTH, CanvasRenderData, NODE_WIDTH, RenderEdge, RenderNode,
};

/// Handle id used on both ends of every edge drawn from the canvas.
const HANDLE: &str = "a";
const NUDGE_COLS: f64 = 2.0;
/// Rows kept free below a focused node when scrolling it into view.
const FOCUS_ROWS: i32 = 6;

pub const SAMPLE_NOTE: &str = "\
## Autolink literals

www.example.com, https://example.com, and contact@example.com.

## Footnote

A note[^1]

[^1]: Big note.

## Strikethrough

~one~ or ~~two~~ tildes.

## Table

First Header  | Second Header
------------- | -------------
Content Cell  | Content Cell
Content Cell  | Content Cell

## Tasklist

* [ ] to do
* [x] done";

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Normal,
    Connecting { source: NodeId },
    Reconnecting { edge: Edge, end: EdgeEnd },
}

#[derive(Debug)]
struct App {
    state: GraphState,
    hotkeys: HotkeyTracker,
    config: Config,
    editor_view: Option<EditorView>,
    expanded: HashSet<NodeId>,
    mode: Mode,
    /// Candidate endpoint while connecting or reconnecting.
    pick: Option<NodeId>,
    viewport: Position,
    show_help: bool,
    status_message: Option<String>,
    release_reporting: bool,
}

impl App {
    fn new(config: Config, demo: bool) -> Self {
        let mut app = Self {
            state: GraphState::new(),
            hotkeys: HotkeyTracker::new(config.hotkey.clone()),
            config,
            editor_view: None,
            expanded: HashSet::new(),
            mode: Mode::Normal,
            pick: None,
            viewport: Position::default(),
            show_help: false,
            status_message: Some("notes live in memory only".to_string()),
            release_reporting: false,
        };
        if demo {
            app.load_demo();
        }
        if let Some(first) = app.state.nodes().front().map(|n| n.id) {
            app.focus(first);
        }
        app
    }

    fn dispatch(&mut self, action: Action) {
        debug!(action = action.name(), "dispatch");
        self.state = self.state.reduce(action);
        if let Some(session) = self.state.editor() {
            if self.editor_view.is_none() {
                self.editor_view = Some(EditorView::new(&session.content));
            }
        } else {
            self.editor_view = None;
        }
    }

    fn focused(&self) -> Option<NodeId> {
        self.state.nodes().iter().find(|n| n.selected).map(|n| n.id)
    }

    fn selected_edge(&self) -> Option<Edge> {
        self.state.edges().iter().find(|e| e.selected).cloned()
    }

    fn focus(&mut self, id: NodeId) {
        let mut changes: Vec<NodeChange> = self
            .state
            .nodes()
            .iter()
            .filter(|n| n.selected && n.id != id)
            .map(|n| NodeChange::Select {
                id: n.id,
                selected: false,
            })
            .collect();
        changes.push(NodeChange::Select { id, selected: true });
        self.dispatch(Action::NodesChanged(changes));
    }

    fn create_node(&mut self) {
        let position = self.free_position();
        let content = if self.config.seed_content {
            SAMPLE_NOTE.to_string()
        } else {
            String::new()
        };
        self.dispatch(Action::CreateNode {
            position,
            content,
            label: self.config.node_label.clone(),
        });
        if let Some(id) = self.state.nodes().last().map(|n| n.id) {
            info!(node = %id, x = position.x, y = position.y, "created node");
            self.focus(id);
            self.status_message = Some("note created".to_string());
        }
    }

    /// The configured spot, stepped diagonally until no node sits on it.
    fn free_position(&self) -> Position {
        let mut candidate = self.config.node_position;
        while self.state.nodes().iter().any(|n| n.position == candidate) {
            candidate.x += CELL_WIDTH * 4.0;
            candidate.y += CELL_HEIGHT * 2.0;
        }
        candidate
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mut chord_fired = false;
        for transition in input::key_transitions(key, self.release_reporting) {
            if let Some(HotkeyEvent::CreateNode) = self.hotkeys.apply(transition) {
                chord_fired = true;
            }
        }
        if chord_fired {
            self.create_node();
            return Ok(false);
        }
        if key.kind == KeyEventKind::Release || matches!(key.code, KeyCode::Modifier(_)) {
            return Ok(false);
        }

        if self.editor_view.is_some() {
            self.handle_editor_key(key);
            return Ok(false);
        }
        if self.show_help {
            self.show_help = false;
            return Ok(false);
        }

        let preserve_status = self.mode != Mode::Normal;
        if !preserve_status {
            self.status_message = None;
        }

        let action = input::action_for_key(key, false);
        match self.mode.clone() {
            Mode::Normal => self.handle_normal_action(action),
            Mode::Connecting { source } => self.handle_connecting_action(source, action),
            Mode::Reconnecting { edge, end } => self.handle_reconnecting_action(edge, end, action),
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let action = input::action_for_key(key, true);
        if action == KeyAction::Cancel {
            if let Some(id) = self.state.editor().map(|s| s.node_id) {
                self.dispatch(Action::CloseEditor(id));
                info!(node = %id, "editor closed");
                self.status_message = Some("note saved".to_string());
            }
            return;
        }
        let Some(view) = self.editor_view.as_mut() else {
            return;
        };
        if let Some(text) = view.handle(&action) {
            self.dispatch(Action::EditorContentChanged(text));
        }
    }

    fn handle_normal_action(&mut self, action: KeyAction) -> Result<bool> {
        match action {
            KeyAction::Quit => return Ok(true),
            KeyAction::ToggleHelp => self.show_help = true,
            KeyAction::Move(_) | KeyAction::NextNode | KeyAction::PrevNode => {
                if let Some(id) = self.navigate(self.focused(), &action) {
                    self.focus(id);
                }
            }
            KeyAction::Nudge(direction) => self.nudge_focused(direction),
            KeyAction::Activate | KeyAction::Edit => {
                if let Some(id) = self.focused() {
                    self.dispatch(Action::OpenEditor(id));
                }
            }
            KeyAction::ToggleExpand => {
                if let Some(id) = self.focused()
                    && !self.expanded.remove(&id)
                {
                    self.expanded.insert(id);
                }
            }
            KeyAction::StartConnect => self.start_connect(),
            KeyAction::StartReconnect(end) => self.start_reconnect(end),
            KeyAction::NextEdge => self.cycle_edge(1),
            KeyAction::PrevEdge => self.cycle_edge(-1),
            KeyAction::DeleteNode => self.delete_focused(),
            KeyAction::DeleteEdge => {
                if let Some(edge) = self.selected_edge() {
                    self.dispatch(Action::EdgesChanged(vec![EdgeChange::Remove {
                        id: edge.id,
                    }]));
                    self.status_message = Some("edge deleted".to_string());
                }
            }
            KeyAction::Cancel => {
                if let Some(edge) = self.selected_edge() {
                    self.dispatch(Action::EdgesChanged(vec![EdgeChange::Select {
                        id: edge.id,
                        selected: false,
                    }]));
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_connecting_action(&mut self, source: NodeId, action: KeyAction) -> Result<bool> {
        match action {
            KeyAction::Quit => return Ok(true),
            KeyAction::Move(_) | KeyAction::NextNode | KeyAction::PrevNode => {
                if let Some(id) = self.navigate(self.pick, &action) {
                    self.pick = Some(id);
                }
            }
            KeyAction::Activate => {
                if let Some(target) = self.pick {
                    let before = self.state.edges().len();
                    self.dispatch(Action::Connect(
                        Connection::new(source, target).with_handles(HANDLE, HANDLE),
                    ));
                    self.status_message = Some(if self.state.edges().len() > before {
                        "edge added".to_string()
                    } else {
                        "already connected".to_string()
                    });
                }
                self.leave_pick_mode();
            }
            KeyAction::Cancel => {
                self.status_message = None;
                self.leave_pick_mode();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_reconnecting_action(
        &mut self,
        edge: Edge,
        end: EdgeEnd,
        action: KeyAction,
    ) -> Result<bool> {
        match action {
            KeyAction::Move(_) | KeyAction::NextNode | KeyAction::PrevNode => {
                if let Some(id) = self.navigate(self.pick, &action) {
                    self.pick = Some(id);
                }
            }
            KeyAction::Activate => {
                if let Some(node) = self.pick {
                    let mut connection = edge.connection();
                    match end {
                        EdgeEnd::Source => connection.source = node,
                        EdgeEnd::Target => connection.target = node,
                    }
                    self.dispatch(Action::EdgeUpdateAttempt {
                        old: edge.clone(),
                        connection,
                    });
                }
                self.dispatch(Action::EdgeUpdateEnd(edge));
                self.status_message = Some(
                    if self.state.edge_update() == EdgeUpdate::Reconnected {
                        "edge reconnected"
                    } else {
                        "edge dropped on nothing: removed"
                    }
                    .to_string(),
                );
                self.leave_pick_mode();
            }
            KeyAction::Cancel | KeyAction::Quit => {
                self.dispatch(Action::EdgeUpdateEnd(edge));
                self.status_message = Some("edge dropped on nothing: removed".to_string());
                self.leave_pick_mode();
                return Ok(action == KeyAction::Quit);
            }
            _ => {}
        }
        Ok(false)
    }

    fn start_connect(&mut self) {
        let Some(source) = self.focused() else {
            self.status_message = Some("focus a note first".to_string());
            return;
        };
        self.mode = Mode::Connecting { source };
        self.pick = self.cycle_from(Some(source), 1);
        self.status_message = Some("connect: pick a target".to_string());
    }

    fn start_reconnect(&mut self, end: EdgeEnd) {
        let Some(edge) = self.selected_edge() else {
            self.status_message = Some("select an edge with [ or ] first".to_string());
            return;
        };
        self.pick = Some(match end {
            EdgeEnd::Source => edge.source,
            EdgeEnd::Target => edge.target,
        });
        self.dispatch(Action::EdgeUpdateStart);
        self.mode = Mode::Reconnecting { edge, end };
        self.status_message = Some("reconnect: pick the new endpoint".to_string());
    }

    fn leave_pick_mode(&mut self) {
        self.mode = Mode::Normal;
        self.pick = None;
    }

    fn delete_focused(&mut self) {
        let Some(id) = self.focused() else {
            return;
        };
        let next = self.cycle_from(Some(id), 1).filter(|next| *next != id);
        self.dispatch(Action::NodesChanged(vec![NodeChange::Remove { id }]));
        self.expanded.remove(&id);
        if let Some(next) = next {
            self.focus(next);
        }
        self.status_message = Some("note deleted".to_string());
    }

    fn nudge_focused(&mut self, direction: Direction) {
        let Some(node) = self.focused().and_then(|id| self.state.node(id)) else {
            return;
        };
        let mut position = node.position;
        match direction {
            Direction::Up => position.y -= CELL_HEIGHT,
            Direction::Down => position.y += CELL_HEIGHT,
            Direction::Left => position.x -= CELL_WIDTH * NUDGE_COLS,
            Direction::Right => position.x += CELL_WIDTH * NUDGE_COLS,
        }
        let id = node.id;
        self.dispatch(Action::NodesChanged(vec![NodeChange::Position {
            id,
            position,
        }]));
    }

    fn cycle_edge(&mut self, delta: isize) {
        let edges = self.state.edges();
        if edges.is_empty() {
            self.status_message = Some("no edges".to_string());
            return;
        }
        let len = edges.len() as isize;
        let current = edges.iter().position(|e| e.selected);
        let next = match current {
            Some(idx) => (idx as isize + delta).rem_euclid(len) as usize,
            None if delta >= 0 => 0,
            None => (len - 1) as usize,
        };
        let mut changes = Vec::new();
        if let Some(idx) = current {
            changes.push(EdgeChange::Select {
                id: edges[idx].id.clone(),
                selected: false,
            });
        }
        changes.push(EdgeChange::Select {
            id: edges[next].id.clone(),
            selected: true,
        });
        self.dispatch(Action::EdgesChanged(changes));
    }

    fn navigate(&self, from: Option<NodeId>, action: &KeyAction) -> Option<NodeId> {
        match action {
            KeyAction::NextNode => self.cycle_from(from, 1),
            KeyAction::PrevNode => self.cycle_from(from, -1),
            KeyAction::Move(direction) => match from {
                Some(id) => self.neighbor_in_direction(id, *direction),
                None => self.state.nodes().front().map(|n| n.id),
            },
            _ => None,
        }
    }

    fn cycle_from(&self, from: Option<NodeId>, delta: isize) -> Option<NodeId> {
        let nodes = self.state.nodes();
        if nodes.is_empty() {
            return None;
        }
        let len = nodes.len() as isize;
        let idx = match from.and_then(|id| nodes.iter().position(|n| n.id == id)) {
            Some(idx) => (idx as isize + delta).rem_euclid(len) as usize,
            None => 0,
        };
        Some(nodes[idx].id)
    }

    /// Closest node whose offset points into `direction`, measured in cells
    /// with sideways drift weighted double.
    fn neighbor_in_direction(&self, from: NodeId, direction: Direction) -> Option<NodeId> {
        let origin = self.state.node(from)?.position;
        self.state
            .nodes()
            .iter()
            .filter(|n| n.id != from)
            .filter_map(|n| {
                let dx = (n.position.x - origin.x) / CELL_WIDTH;
                let dy = (n.position.y - origin.y) / CELL_HEIGHT;
                let (ahead, drift) = match direction {
                    Direction::Right => (dx, dy),
                    Direction::Left => (-dx, dy),
                    Direction::Down => (dy, dx),
                    Direction::Up => (-dy, dx),
                };
                (ahead > 0.0).then_some((n.id, ahead + 2.0 * drift.abs()))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    fn ensure_visible(&mut self, canvas: Rect) {
        let Some(id) = self.pick.or_else(|| self.focused()) else {
            return;
        };
        let Some(position) = self.state.node(id).map(|n| n.position) else {
            return;
        };
        let width = canvas.width as f64;
        let height = canvas.height as f64;
        let col = (position.x - self.viewport.x) / CELL_WIDTH;
        let row = (position.y - self.viewport.y) / CELL_HEIGHT;
        if col < 0.0 {
            self.viewport.x = position.x;
        } else if col + NODE_WIDTH as f64 > width {
            self.viewport.x = position.x - (width - NODE_WIDTH as f64).max(0.0) * CELL_WIDTH;
        }
        if row < 0.0 {
            self.viewport.y = position.y;
        } else if row + FOCUS_ROWS as f64 > height {
            self.viewport.y = position.y - (height - FOCUS_ROWS as f64).max(0.0) * CELL_HEIGHT;
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let (canvas_area, _) = render::layout(frame.area());
        self.ensure_visible(canvas_area);

        let focused = self.focused();
        let nodes = self
            .state
            .nodes()
            .iter()
            .map(|node| RenderNode {
                id: node.id,
                label: node.label.clone(),
                content: node.content.clone(),
                col: render::to_cells(node.position.x - self.viewport.x, CELL_WIDTH),
                row: render::to_cells(node.position.y - self.viewport.y, CELL_HEIGHT),
                expanded: self.expanded.contains(&node.id),
                focused: Some(node.id) == focused,
                picked: Some(node.id) == self.pick,
            })
            .collect::<Vec<_>>();
        let edges = self
            .state
            .edges()
            .iter()
            .map(|edge| RenderEdge {
                source: edge.source,
                target: edge.target,
                selected: edge.selected,
            })
            .collect::<Vec<_>>();

        let hints = self.hints();
        let chord = self.hotkeys.chord().to_string();
        let data = CanvasRenderData {
            nodes: &nodes,
            edges: &edges,
            mode_label: self.mode_label(),
            hints: &hints,
            message: self.status_message.as_deref(),
            show_help: self.show_help,
            chord: &chord,
        };
        render::draw(frame, &data);

        if let (Some(view), Some(session)) = (&self.editor_view, self.state.editor()) {
            let label = self
                .state
                .node(session.node_id)
                .map(|n| n.label.as_str())
                .unwrap_or("note");
            editor::draw(frame, view, &format!("editing: {}", label), &session.content);
        }
    }

    fn mode_label(&self) -> &'static str {
        if self.editor_view.is_some() {
            return "EDIT";
        }
        match self.mode {
            Mode::Normal => "CANVAS",
            Mode::Connecting { .. } => "CONNECT",
            Mode::Reconnecting { .. } => "RECONNECT",
        }
    }

    fn hints(&self) -> String {
        if self.editor_view.is_some() {
            return "type markdown, [Enter] newline, [Esc] save and close".to_string();
        }
        match self.mode {
            Mode::Normal => {
                "[Tab/hjkl] focus  [HJKL] move  [e] edit  [space] expand  [c] connect  [[/]] edge  [r] reconnect  [x] del edge  [D] del note"
                    .to_string()
            }
            Mode::Connecting { .. } => {
                "CONNECT: [Tab/hjkl] target  [Enter] connect  [Esc] cancel".to_string()
            }
            Mode::Reconnecting { .. } => {
                "RECONNECT: [Tab/hjkl] endpoint  [Enter] drop here  [Esc] drop on nothing (removes)"
                    .to_string()
            }
        }
    }

    fn load_demo(&mut self) {
        let notes = [
            (
                "**Welcome**",
                "# Welcome\n\nPress `e` to edit a note and `Esc` to save it.\n\nUse `c` to link notes, `[`/`]` to pick an edge.",
                Position::new(40.0, 16.0),
            ),
            ("Markdown showcase", SAMPLE_NOTE, Position::new(360.0, 16.0)),
            (
                "_Ideas_",
                "* [ ] sketch the outline\n* [x] collect links",
                Position::new(40.0, 176.0),
            ),
        ];
        for (label, content, position) in notes {
            self.dispatch(Action::CreateNode {
                position,
                content: content.to_string(),
                label: label.to_string(),
            });
        }
        let ids: Vec<NodeId> = self.state.nodes().iter().map(|n| n.id).collect();
        for target in &ids[1..] {
            self.dispatch(Action::Connect(
                Connection::new(ids[0], *target).with_handles(HANDLE, HANDLE),
            ));
        }
        self.status_message = Some("demo notes loaded (in memory only)".to_string());
    }
}

pub fn run(config: Config, demo: bool) -> Result<()> {
    let mut app = App::new(config, demo);

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    let _guard = TerminalGuard;
    let keyboard = KeyboardSubscription::acquire()?;
    app.release_reporting = keyboard.release_reporting();
    info!(
        release_reporting = app.release_reporting,
        "keyboard subscription acquired"
    );

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    loop {
        terminal.draw(|f| app.draw(f))?;
        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        if let Event::Key(key) = event::read()?
            && app.handle_key(key)?
        {
            break;
        }
    }

    drop(keyboard);
    info!("keyboard subscription released");
    Ok(())
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen);
    }
}
