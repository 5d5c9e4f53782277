use crate::app::{App, Focus};
use crate::braille::BrailleCanvas;
use crate::chat::Sender;
use crate::map::style::Rgb;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
    Frame,
};

/// Screen regions: map, info, transcript, input, status bar
struct Areas {
    map: Rect,
    info: Rect,
    transcript: Rect,
    input: Rect,
    status: Rect,
}

fn areas(area: Rect) -> Areas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map and chat
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(rows[0]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(35), // Feature info
            Constraint::Min(3),         // Transcript
            Constraint::Length(3),      // Input
        ])
        .split(columns[1]);

    Areas {
        map: columns[0],
        info: side[0],
        transcript: side[1],
        input: side[2],
        status: rows[1],
    }
}

/// Map area inside its border, for a terminal of the given size
pub fn map_inner(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(areas(area).map)
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let areas = areas(frame.area());

    render_map(frame, app, areas.map);
    render_info(frame, app, areas.info);
    render_transcript(frame, app, areas.transcript);
    render_input(frame, app, areas.input);
    render_status_bar(frame, app, areas.status);
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn title(text: &str) -> Span<'_> {
    Span::styled(
        text,
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app.focus == Focus::Map))
        .title(title(" Map "));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut canvas = BrailleCanvas::new(inner.width as usize, inner.height as usize);
    let labels = app.widget.render(&mut canvas);

    let map_view = MapView {
        canvas,
        labels,
        cursor_pos: app.cursor_cell(),
    };
    frame.render_widget(map_view, inner);
}

fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

/// Braille overlay with marker labels and the pointer cross
struct MapView {
    canvas: BrailleCanvas,
    labels: Vec<(u16, u16, String)>,
    cursor_pos: Option<(u16, u16)>,
}

impl Widget for MapView {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for (row_idx, row) in self.canvas.rows().enumerate().take(area.height as usize) {
            let y = area.y + row_idx as u16;
            for (col_idx, cell) in row.iter().enumerate().take(area.width as usize) {
                // Skip empty braille characters
                if cell.dots == 0 {
                    continue;
                }
                let x = area.x + col_idx as u16;
                let fg = cell.color.map_or(Color::White, rgb);
                buf[(x, y)].set_char(cell.glyph()).set_fg(fg);
            }
        }

        let label_style = Style::default().fg(Color::White);
        for (lx, ly, text) in &self.labels {
            if *ly >= area.height || *lx >= area.width {
                continue;
            }
            let max_len = area.width.saturating_sub(*lx) as usize;
            for (i, ch) in text.chars().take(max_len.min(24)).enumerate() {
                buf[(area.x + *lx + i as u16, area.y + *ly)]
                    .set_char(ch)
                    .set_style(label_style);
            }
        }

        if let Some((cx, cy)) = self.cursor_pos {
            if cx < area.width && cy < area.height {
                buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
            }
        }
    }
}

fn render_info(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(false))
        .title(title(" Feature "));

    let hint = |text: &'static str| vec![Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))];
    let lines = if !app.widget.panel().shows_info() {
        hint("(disabled)")
    } else {
        match app.widget.info().text() {
            Some(text) => text.lines().map(|l| Line::from(l.to_string())).collect(),
            None => hint("Click a feature to see its properties"),
        }
    };
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

/// Split `text` into lines of at most `width` characters
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for line in text.lines() {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            out.push(String::new());
            continue;
        }
        out.extend(chars.chunks(width).map(|c| c.iter().collect::<String>()));
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn render_transcript(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(false))
        .title(title(" Chat "));
    let inner = block.inner(area);

    let mut lines = Vec::new();
    for message in app.chat.messages() {
        let (prefix, color) = match message.sender {
            Sender::User => ("you: ", Color::Yellow),
            Sender::Bot => ("bot: ", Color::Green),
        };
        let style = if message.pending.is_some() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(color)
        };
        let body = format!("{}{}", prefix, message.text);
        lines.extend(
            wrap_text(&body, inner.width as usize)
                .into_iter()
                .map(|l| Line::from(Span::styled(l, style))),
        );
    }

    // Keep the latest messages in view
    let skip = lines.len().saturating_sub(inner.height as usize);
    let visible: Vec<Line> = lines.into_iter().skip(skip).collect();
    frame.render_widget(Paragraph::new(visible).block(block), area);
}

fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Chat;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(focused))
        .title(title(" Message "));

    let inner = block.inner(area);
    // Show the tail of long input
    let width = inner.width.saturating_sub(1) as usize;
    let shown: String = {
        let chars: Vec<char> = app.input.chars().collect();
        chars[chars.len().saturating_sub(width)..].iter().collect()
    };
    frame.render_widget(Paragraph::new(shown.clone()).block(block), area);

    if focused {
        frame.set_cursor_position((inner.x + shown.chars().count() as u16, inner.y));
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let panel = app.widget.panel();
    let dim = Style::default().fg(Color::DarkGray);
    let mut spans = vec![Span::raw(" ")];

    if let Some(zoom) = panel.zoom_text() {
        spans.push(Span::styled(zoom.to_string(), Style::default().fg(Color::Yellow)));
        spans.push(Span::styled(" | ", dim));
    }
    if let Some(coords) = panel.coord_text() {
        spans.push(Span::styled(coords.to_string(), Style::default().fg(Color::Cyan)));
        spans.push(Span::styled(" | ", dim));
    }
    if let Some(count) = panel.feature_count_text() {
        spans.push(Span::styled(count.to_string(), Style::default().fg(Color::Magenta)));
        spans.push(Span::styled(" | ", dim));
    }
    if let Some(current) = panel.basemap() {
        for (i, name) in panel.basemap_names().iter().enumerate() {
            let style = if name == current {
                Style::default().fg(Color::Green)
            } else {
                dim
            };
            spans.push(Span::styled(format!("[{}]{} ", i + 1, name), style));
        }
        spans.push(Span::styled("| ", dim));
    }
    if !app.widget.surface().is_overlay_visible() && app.widget.surface().has_overlay() {
        spans.push(Span::styled("overlay hidden | ", Style::default().fg(Color::Red)));
    }
    if let Some(status) = app.widget.status() {
        spans.push(Span::styled(status.to_string(), Style::default().fg(Color::White)));
        spans.push(Span::styled(" | ", dim));
    }

    let mut hints = String::from("tab:focus hjkl:pan +/-:zoom");
    for button in panel.buttons() {
        hints.push_str(&format!(" {}:{}", button.key, button.label));
    }
    hints.push_str(" g:reload n:new chat q:quit");
    spans.push(Span::styled(hints, dim));

    if let Some(layer) = app.widget.surface().active_tile_layer() {
        spans.push(Span::styled(format!(" | {}", layer.attribution), dim));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
