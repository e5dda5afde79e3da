use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use tui_textarea::TextArea;

use crate::app::{StatusKind, StatusLine, View};
use crate::core::{LineInput, NoteList, Selectable, TextBuffer, cell_width};

const BANNER: [&str; 5] = [
    r#" ______   ______     ______   __     ______     __   __    "#,
    r#"/\__  _\ /\  __ \   /\__  _\ /\ \   /\  __ \   /\ "-.\ \   "#,
    r#"\/_/\ \/ \ \ \/\ \  \/_/\ \/ \ \ \  \ \ \/\ \  \ \ \-.  \  "#,
    r#"   \ \_\  \ \_____\    \ \_\  \ \_\  \ \_____\  \ \_\\"\_\ "#,
    r#"    \/_/   \/_____/     \/_/   \/_/   \/_____/   \/_/ \/_/ "#,
];

const DESCRIPTION: &str =
    "Your personal note-taking companion • Create, edit, and manage your notes from the terminal.";
const IDLE_TEXT: &str =
    "No note open. Press Ctrl+N to create one or Ctrl+L to list existing notes.";
const EMPTY_LIST_TEXT: &str = "No notes yet. Press Ctrl+N to create one.";
const ACCENT: Color = Color::Rgb(0xff, 0xd5, 0x05);

pub struct UiModel<'a> {
    pub view: &'a View,
    pub editor: &'a TextBuffer,
    pub name_input: &'a LineInput,
    pub notes: &'a NoteList,
    pub status: Option<&'a StatusLine>,
    pub suggestion: Option<&'a str>,
    pub autocomplete: bool,
    pub help: &'static str,
}

struct Areas {
    banner: Rect,
    description: Rect,
    status: Rect,
    body: Rect,
    assist: Rect,
    help: Rect,
}

fn layout(area: Rect) -> Areas {
    let banner_height = if area.height >= 30 {
        BANNER.len() as u16 + 2
    } else {
        1
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(2)
        .constraints([
            Constraint::Length(banner_height),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(2),
            Constraint::Length(1),
        ])
        .split(area);
    Areas {
        banner: chunks[0],
        description: chunks[1],
        status: chunks[2],
        body: chunks[3],
        assist: chunks[4],
        help: chunks[5],
    }
}

/// Inner size of the bordered body block for a terminal of the given size.
pub fn body_size(width: u16, height: u16) -> (u16, u16) {
    let body = layout(Rect::new(0, 0, width, height)).body;
    (
        body.width.saturating_sub(2).max(1),
        body.height.saturating_sub(2).max(1),
    )
}

pub fn draw(frame: &mut Frame<'_>, model: UiModel<'_>) {
    let areas = layout(frame.area());

    draw_banner(frame, areas.banner);
    frame.render_widget(
        Paragraph::new(DESCRIPTION)
            .alignment(Alignment::Center)
            .style(
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ),
        areas.description,
    );
    draw_status(frame, areas.status, model.status);

    match model.view {
        View::Idle => {
            frame.render_widget(
                Paragraph::new(IDLE_TEXT)
                    .wrap(Wrap { trim: true })
                    .block(Block::default().title("Totion").borders(Borders::ALL)),
                areas.body,
            );
        }
        View::List => draw_list(frame, areas.body, model.notes),
        View::NewNote { .. } => draw_name_prompt(frame, areas.body, model.name_input),
        View::Editor(open) => {
            let dirty = if model.editor.dirty { " *" } else { "" };
            let title = format!("{}{dirty}", open.title);
            if let Some((x, y)) = draw_editor(frame, areas.body, model.editor, &title) {
                frame.set_cursor_position((x, y));
            }
            draw_assist(frame, areas.assist, model.autocomplete, model.suggestion);
        }
    }

    frame.render_widget(
        Paragraph::new(model.help).style(Style::default().fg(Color::DarkGray)),
        areas.help,
    );
}

fn draw_banner(frame: &mut Frame<'_>, area: Rect) {
    let style = Style::default().fg(ACCENT).add_modifier(Modifier::BOLD);
    if area.height > 1 {
        let lines: Vec<Line<'_>> = BANNER.iter().map(|l| Line::from(*l)).collect();
        frame.render_widget(
            Paragraph::new(lines)
                .style(style)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::TOP | Borders::BOTTOM)),
            area,
        );
    } else {
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(
                    " Welcome to TOTION ",
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::LightMagenta)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled("  notes in your terminal", style),
            ])),
            area,
        );
    }
}

fn draw_status(frame: &mut Frame<'_>, area: Rect, status: Option<&StatusLine>) {
    let Some(status) = status else {
        return;
    };
    let style = match status.kind {
        StatusKind::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        StatusKind::Info => Style::default().fg(ACCENT),
    };
    frame.render_widget(Paragraph::new(status.text.as_str()).style(style), area);
}

fn draw_list(frame: &mut Frame<'_>, area: Rect, notes: &NoteList) {
    let block = Block::default().title("All Notes").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 {
        return;
    }

    if notes.is_empty() {
        frame.render_widget(Paragraph::new(EMPTY_LIST_TEXT), inner);
        return;
    }

    let mut lines: Vec<Line<'_>> = Vec::new();
    if notes.is_filtering() || !notes.filter().is_empty() {
        let cursor = if notes.is_filtering() { "_" } else { "" };
        lines.push(Line::from(Span::styled(
            format!("Filter: {}{cursor}", notes.filter()),
            Style::default().fg(ACCENT),
        )));
    }

    let rows = (inner.height as usize).saturating_sub(lines.len()).max(1);
    let visible = notes.visible();
    let selected = notes.selected().map(|n| n.title.as_str());
    let offset = notes.selected_index().saturating_sub(rows - 1);

    if visible.is_empty() {
        lines.push(Line::from(Span::styled(
            "No matching notes.",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for note in visible.into_iter().skip(offset).take(rows) {
        let is_selected = selected == Some(note.title.as_str());
        let marker = if is_selected { ">" } else { " " };
        let title_style = if is_selected {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw(format!("{marker} ")),
            Span::styled(note.title.clone(), title_style),
            Span::styled(
                format!("  {}", note.description()),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_name_prompt(frame: &mut Frame<'_>, area: Rect, input: &LineInput) {
    let rect = Rect {
        height: area.height.min(3),
        ..area
    };
    let mut textarea = TextArea::default();
    textarea.insert_str(input.as_str());
    textarea.set_placeholder_text("What do you wanna name it?");
    textarea.set_cursor_style(Style::default().bg(ACCENT));
    textarea.set_cursor_line_style(Style::default());
    textarea.set_block(
        Block::default()
            .title("New note (Enter create and open | Esc cancel)")
            .borders(Borders::ALL),
    );
    frame.render_widget(&textarea, rect);
}

fn draw_assist(frame: &mut Frame<'_>, area: Rect, autocomplete: bool, suggestion: Option<&str>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let state = if autocomplete { "on" } else { "off" };
    let mut status = format!("[Autocomplete: {state} - Ctrl+T to toggle]");
    if autocomplete {
        status.push_str(" Ctrl+G: Get the next suggestion");
    }
    frame.render_widget(
        Paragraph::new(status)
            .alignment(Alignment::Right)
            .style(Style::default().fg(Color::DarkGray)),
        rows[0],
    );

    if let Some(text) = suggestion.filter(|_| autocomplete) {
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::raw("Suggestion: "),
                Span::styled(
                    text.replace('\n', " "),
                    Style::default().fg(ACCENT).add_modifier(Modifier::ITALIC),
                ),
                Span::raw(" (Tab to accept)"),
            ])),
            rows[1],
        );
    }
}

fn draw_editor(
    frame: &mut Frame<'_>,
    area: Rect,
    buffer: &TextBuffer,
    title: &str,
) -> Option<(u16, u16)> {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width < 2 || inner.height < 1 {
        return None;
    }

    if buffer.is_empty() {
        frame.render_widget(
            Paragraph::new("Type your notes....").style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return Some((inner.x, inner.y));
    }

    let top = buffer.viewport.top_line;
    let height = inner.height as usize;
    let mut lines: Vec<Line<'_>> = Vec::with_capacity(height);
    let mut cursor_xy: Option<(u16, u16)> = None;

    for row in 0..height {
        let line_idx = top + row;
        if line_idx >= buffer.line_count() {
            break;
        }

        let source = buffer.line_text(line_idx);
        let on_cursor_line = line_idx == buffer.cursor.line;
        let (line, cursor_x) = render_line(
            &source,
            buffer.viewport.left_col,
            inner.width as usize,
            buffer.cursor.col,
            on_cursor_line,
        );
        lines.push(line);

        if on_cursor_line {
            cursor_xy = Some((inner.x + cursor_x as u16, inner.y + row as u16));
        }
    }

    frame.render_widget(Paragraph::new(lines), inner);
    cursor_xy
}

/// Renders one buffer line with tabs expanded and the horizontal scroll
/// applied. `left_col` and the returned cursor column are display columns.
fn render_line(
    source: &str,
    left_col: usize,
    max_cols: usize,
    cursor_col: usize,
    cursor_line: bool,
) -> (Line<'static>, usize) {
    let right_col = left_col + max_cols;
    let mut out = String::new();
    let mut col = 0usize;
    let mut cursor_at = None;

    for (char_idx, ch) in source.chars().enumerate() {
        if col >= right_col && (!cursor_line || cursor_at.is_some()) {
            break;
        }
        if cursor_line && char_idx == cursor_col {
            cursor_at = Some(col);
        }
        let width = cell_width(ch, col);
        let next_col = col + width;
        let shown = next_col.min(right_col).saturating_sub(col.max(left_col));
        if shown == width && ch != '\t' {
            out.push(ch);
        } else if shown > 0 {
            // Tabs and wide chars cut by an edge become blanks.
            out.extend(std::iter::repeat_n(' ', shown));
        }
        col = next_col;
    }

    let cursor_x = cursor_at
        .unwrap_or(col)
        .saturating_sub(left_col)
        .min(max_cols.saturating_sub(1));
    (Line::from(out), cursor_x)
}
