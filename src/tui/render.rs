use std::collections::HashMap;

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Flex, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph};

use crate::graph::model::NodeId;
use crate::markdown;

/// Canvas units covered by one terminal column / row.
pub const CELL_WIDTH: f64 = 8.0;
pub const CELL_HEIGHT: f64 = 16.0;

pub const NODE_WIDTH: u16 = 30;
const MAX_LABEL_LINES: usize = 2;
const MAX_CONTENT_LINES: usize = 14;
const STATUS_HEIGHT: u16 = 4;
/// Node offsets past this many cells are equally off screen.
const MAX_CELL_OFFSET: i32 = 10_000;

#[derive(Debug, Clone)]
pub struct RenderNode {
    pub id: NodeId,
    pub label: String,
    pub content: String,
    /// Top-left corner in cells, relative to the canvas area.
    pub col: i32,
    pub row: i32,
    pub expanded: bool,
    pub focused: bool,
    /// Highlighted as the candidate target of a connect or reconnect.
    pub picked: bool,
}

#[derive(Debug, Clone)]
pub struct RenderEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub selected: bool,
}

#[derive(Debug)]
pub struct CanvasRenderData<'a> {
    pub nodes: &'a [RenderNode],
    pub edges: &'a [RenderEdge],
    pub mode_label: &'a str,
    pub hints: &'a str,
    pub message: Option<&'a str>,
    pub show_help: bool,
    pub chord: &'a str,
}

struct PlacedNode<'a> {
    node: &'a RenderNode,
    left: i32,
    top: i32,
    body: Vec<Line<'static>>,
}

impl PlacedNode<'_> {
    fn height(&self) -> i32 {
        self.body.len() as i32 + 3
    }

    fn source_handle(&self) -> (i32, i32) {
        (self.left + NODE_WIDTH as i32 / 2, self.top + self.height())
    }

    fn target_handle(&self) -> (i32, i32) {
        (self.left + NODE_WIDTH as i32 / 2, self.top - 1)
    }
}

/// Canvas-unit offset from the viewport as whole cells, bounded so screen
/// arithmetic stays in range for any finite position.
pub fn to_cells(offset: f64, cell: f64) -> i32 {
    let bound = MAX_CELL_OFFSET as f64;
    (offset / cell).round().clamp(-bound, bound) as i32
}

/// Split the frame into the canvas and the status block.
pub fn layout(frame_area: Rect) -> (Rect, Rect) {
    let area = frame_area.inner(Margin {
        horizontal: 1,
        vertical: 0,
    });
    let inner = Block::default().borders(Borders::ALL).inner(area);
    let [canvas, status] =
        Layout::vertical([Constraint::Min(4), Constraint::Length(STATUS_HEIGHT)]).areas(inner);
    (canvas, status)
}

pub fn draw(frame: &mut Frame, data: &CanvasRenderData<'_>) {
    let area = frame.area().inner(Margin {
        horizontal: 1,
        vertical: 0,
    });
    let title = Line::from(vec![
        Span::styled("mdcanvas", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(
            format!("[{}] new note", data.chord),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled("[?] help", Style::default().fg(Color::DarkGray)),
        Span::raw("  "),
        Span::styled("[q] quit", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(title),
        area,
    );
    let (canvas_area, status_area) = layout(frame.area());

    let placed: Vec<PlacedNode<'_>> = data
        .nodes
        .iter()
        .map(|node| PlacedNode {
            node,
            left: canvas_area.x as i32 + node.col.clamp(-MAX_CELL_OFFSET, MAX_CELL_OFFSET),
            top: canvas_area.y as i32 + node.row.clamp(-MAX_CELL_OFFSET, MAX_CELL_OFFSET),
            body: node_body(node),
        })
        .collect();
    let by_id: HashMap<NodeId, &PlacedNode<'_>> =
        placed.iter().map(|p| (p.node.id, p)).collect();

    draw_edges(frame, canvas_area, data.edges, &by_id);
    for node in &placed {
        if let Some(rect) = clip(canvas_area, node.left, node.top, node.height()) {
            frame.render_widget(Clear, rect);
            frame.render_widget(markdown_node(node.node, node.body.clone()), rect);
        }
    }

    if data.nodes.is_empty() {
        let hint = Paragraph::new(Line::from(Span::styled(
            format!("empty canvas: press {} to add a note", data.chord),
            Style::default().fg(Color::DarkGray),
        )))
        .alignment(Alignment::Center);
        frame.render_widget(hint, centered_rect(canvas_area, 80, 20));
    }

    draw_status(frame, status_area, data);

    if data.show_help {
        render_help_overlay(frame, data.chord);
    }
}

/// Body lines of a markdown node: the rendered label while collapsed, the
/// rendered content while expanded.
pub fn node_body(node: &RenderNode) -> Vec<Line<'static>> {
    let (source, limit, empty) = if node.expanded {
        (&node.content, MAX_CONTENT_LINES, "(empty)")
    } else {
        (&node.label, MAX_LABEL_LINES, "(untitled)")
    };
    let mut lines = markdown::render(source).lines;
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            empty,
            Style::default().fg(Color::DarkGray),
        )));
    }
    if lines.len() > limit {
        lines.truncate(limit);
        lines.push(Line::from(Span::styled(
            "…",
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

/// Renderer for the `markdown` node type: body plus the edit and
/// expand/collapse affordances.
pub fn markdown_node(node: &RenderNode, mut body: Vec<Line<'static>>) -> Paragraph<'static> {
    let toggle = if node.expanded { "collapse" } else { "expand" };
    body.push(Line::from(vec![
        Span::styled("[e]", Style::default().fg(Color::Cyan)),
        Span::styled(" edit  ", Style::default().fg(Color::DarkGray)),
        Span::styled("[space]", Style::default().fg(Color::Cyan)),
        Span::styled(format!(" {}", toggle), Style::default().fg(Color::DarkGray)),
    ]));

    let border_style = if node.picked {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else if node.focused {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Paragraph::new(body).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(if node.focused {
                BorderType::Thick
            } else {
                BorderType::Rounded
            })
            .border_style(border_style)
            .padding(Padding::horizontal(1)),
    )
}

fn draw_edges(
    frame: &mut Frame,
    area: Rect,
    edges: &[RenderEdge],
    by_id: &HashMap<NodeId, &PlacedNode<'_>>,
) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let to_canvas = |(x, y): (i32, i32)| -> (f64, f64) {
        (
            (x - area.x as i32) as f64 + 0.5,
            area.height as f64 - (y - area.y as i32) as f64 - 0.5,
        )
    };
    let segments: Vec<((f64, f64), (f64, f64), Color)> = edges
        .iter()
        .filter_map(|edge| {
            let source = by_id.get(&edge.source)?;
            let target = by_id.get(&edge.target)?;
            let color = if edge.selected {
                Color::Yellow
            } else {
                Color::Gray
            };
            Some((
                to_canvas(source.source_handle()),
                to_canvas(target.target_handle()),
                color,
            ))
        })
        .collect();

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([0.0, area.width as f64])
        .y_bounds([0.0, area.height as f64])
        .paint(move |ctx| {
            for ((x1, y1), (x2, y2), color) in &segments {
                ctx.draw(&CanvasLine {
                    x1: *x1,
                    y1: *y1,
                    x2: *x2,
                    y2: *y2,
                    color: *color,
                });
            }
            for (_, (x2, y2), color) in &segments {
                ctx.print(*x2, *y2, Span::styled("▼", Style::default().fg(*color)));
            }
        });
    frame.render_widget(canvas, area);
}

/// Intersect a node box with the canvas; `None` when fully off screen.
fn clip(area: Rect, left: i32, top: i32, height: i32) -> Option<Rect> {
    let right = (left + NODE_WIDTH as i32).min(area.right() as i32);
    let bottom = (top + height).min(area.bottom() as i32);
    let left = left.max(area.x as i32);
    let top = top.max(area.y as i32);
    if right <= left || bottom <= top {
        return None;
    }
    Some(Rect::new(
        left as u16,
        top as u16,
        (right - left) as u16,
        (bottom - top) as u16,
    ))
}

fn draw_status(frame: &mut Frame, area: Rect, data: &CanvasRenderData<'_>) {
    let top_status = format!(
        "{}   nodes: {}   edges: {}",
        data.mode_label,
        data.nodes.len(),
        data.edges.len()
    );
    let mut hint_line = data.hints.to_string();
    if let Some(msg) = data.message {
        hint_line.push_str("   ");
        hint_line.push_str(msg);
    }
    let status = Paragraph::new(vec![
        Line::from(Span::styled(
            top_status,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            hint_line,
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray))
            .padding(Padding::new(1, 1, 0, 0)),
    );
    frame.render_widget(status, area);
}

fn render_help_overlay(frame: &mut Frame, chord: &str) {
    let area = centered_rect(frame.area(), 70, 70);
    frame.render_widget(Clear, area);
    let help = Paragraph::new(vec![
        Line::from(format!("{}          create a note", chord)),
        Line::from("Tab/arrows/hjkl  focus another note"),
        Line::from("Shift+arrows/HJKL  move the focused note"),
        Line::from("e / Enter      edit the focused note (Esc closes)"),
        Line::from("Space          expand / collapse"),
        Line::from("c              connect: pick a target, Enter"),
        Line::from("[ / ]          select an edge"),
        Line::from("r / R          drag the selected edge's target / source end"),
        Line::from("                 Enter drops it on the picked note,"),
        Line::from("                 Esc drops it on nothing (removes the edge)"),
        Line::from("x              delete the selected edge"),
        Line::from("D / Delete     delete the focused note and its edges"),
        Line::from(""),
        Line::from("Notes live in memory only; quitting discards them."),
    ])
    .block(Block::default().title("Help").borders(Borders::ALL));
    frame.render_widget(help, area);
}

pub fn centered_rect(area: Rect, width_percent: u16, height_percent: u16) -> Rect {
    let vertical = Layout::vertical([
        Constraint::Percentage((100 - height_percent) / 2),
        Constraint::Percentage(height_percent),
        Constraint::Percentage((100 - height_percent) / 2),
    ])
    .flex(Flex::Center)
    .split(area);
    Layout::horizontal([
        Constraint::Percentage((100 - width_percent) / 2),
        Constraint::Percentage(width_percent),
        Constraint::Percentage((100 - width_percent) / 2),
    ])
    .flex(Flex::Center)
    .split(vertical[1])[1]
}
