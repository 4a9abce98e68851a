use crate::app::{App, Focus};
use crate::map::MapLayers;
use crate::timeline::{format_day, Timeline};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget},
    Frame,
};

/// Choropleth outline color.
const OUTLINE: Color = Color::Gray;
/// Ring and bubble colors, from the orange ramp.
const RING: Color = Color::Rgb(253, 141, 60);
const BUBBLE: Color = Color::Rgb(217, 72, 1);
const SERIES: Color = Color::Rgb(230, 85, 13);

/// Split the terminal into (map, timeline, status) panes. Kept pure so
/// the event loop can map mouse coordinates to panes without rendering.
pub fn panes(area: Rect) -> (Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),    // Map
            Constraint::Length(12), // Timeline
            Constraint::Length(1),  // Status bar
        ])
        .split(area);
    (chunks[0], chunks[1], chunks[2])
}

/// Inner drawing area of a bordered pane.
pub fn pane_inner(pane: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(pane)
}

/// Day under a timeline column, for the probe cursor.
pub fn timeline_day_at(timeline_pane: Rect, timeline: &Timeline, column: u16) -> Option<f64> {
    let inner = pane_inner(timeline_pane);
    if inner.width == 0 || column < inner.x || column >= inner.x + inner.width {
        return None;
    }
    let (lo, hi) = timeline.window();
    let frac = (column - inner.x) as f64 / inner.width as f64;
    Some(lo as f64 + frac * (hi - lo) as f64)
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let (map_pane, timeline_pane, status_pane) = panes(frame.area());

    render_map(frame, app, map_pane);
    render_timeline(frame, app, timeline_pane);
    render_status_bar(frame, app, status_pane);
}

fn focus_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(focus_style(app.focus == Focus::Map))
        .title(Span::styled(
            " Departing Incidents ",
            Style::default().fg(SERIES).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Braille gives 2x4 resolution per character
    let mut viewport = app.viewport.clone();
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let ring = app.ring_display();
    let layers = app.map.render(&viewport, app.selected, ring.as_ref());

    frame.render_widget(MapWidget { layers }, inner);
}

/// Custom widget compositing the shade layer under the braille layers.
struct MapWidget {
    layers: MapLayers,
}

impl MapWidget {
    /// Overlay one braille canvas with a fixed foreground color.
    fn render_layer(
        canvas: &crate::braille::BrailleCanvas,
        color: Color,
        area: Rect,
        buf: &mut Buffer,
    ) {
        for (row_idx, row_str) in canvas.rows().enumerate() {
            if row_idx >= area.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;

            for (col_idx, ch) in row_str.chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                // Skip empty braille characters (U+2800)
                if ch == '\u{2800}' {
                    continue;
                }
                let x = area.x + col_idx as u16;
                buf[(x, y)].set_char(ch).set_fg(color);
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // 1. Country fills as cell backgrounds
        for y in 0..area.height {
            for x in 0..area.width {
                if let Some((r, g, b)) = self.layers.shade.get(x as usize, y as usize) {
                    buf[(area.x + x, area.y + y)].set_bg(Color::Rgb(r, g, b));
                }
            }
        }

        // 2. Outlines, then the ring and bubbles on top
        Self::render_layer(&self.layers.outlines, OUTLINE, area, buf);
        Self::render_layer(&self.layers.ring, RING, area, buf);
        Self::render_layer(&self.layers.bubbles, BUBBLE, area, buf);

        // 3. Bubble labels last
        let label_style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        for (lx, ly, text) in &self.layers.labels {
            if *lx >= area.width || *ly >= area.height {
                continue;
            }
            let y = area.y + *ly;
            for (i, ch) in text.chars().enumerate() {
                let x = area.x + *lx + i as u16;
                if x < area.x + area.width {
                    buf[(x, y)].set_char(ch).set_style(label_style);
                }
            }
        }
    }
}

fn render_timeline(frame: &mut Frame, app: &App, area: Rect) {
    let windowed = app.timeline.windowed();
    let line_data: Vec<(f64, f64)> = windowed
        .iter()
        .map(|p| (p.day as f64, p.fatalities))
        .collect();
    let point_data: Vec<(f64, f64)> = windowed
        .iter()
        .filter(|p| p.fatalities > 0.0)
        .map(|p| (p.day as f64, p.fatalities))
        .collect();
    let probe_data: Vec<(f64, f64)> = app
        .timeline
        .probe_point()
        .map(|p| (p.day as f64, p.fatalities))
        .into_iter()
        .collect();

    let mut datasets = vec![
        Dataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(SERIES))
            .data(&line_data),
        Dataset::default()
            .marker(Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(RING))
            .data(&point_data),
    ];
    if !probe_data.is_empty() {
        datasets.push(
            Dataset::default()
                .marker(Marker::Block)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(Color::White))
                .data(&probe_data),
        );
    }

    let (x0, x1) = app.timeline.window();
    let (y0, y1) = app.timeline.y_extent();
    let mid = (x0 + x1) / 2;

    let title = match app.timeline.probe_point() {
        Some(p) => format!(
            " Fatalities — {}: {} ",
            format_day(p.day),
            p.fatalities as u64
        ),
        None => " Fatalities over time ".to_string(),
    };

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focus_style(app.focus == Focus::Timeline))
                .title(Span::styled(
                    title,
                    Style::default().fg(SERIES).add_modifier(Modifier::BOLD),
                )),
        )
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([x0 as f64, x1 as f64])
                .labels(vec![
                    Line::from(format_day(x0)),
                    Line::from(format_day(mid)),
                    Line::from(format_day(x1)),
                ]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([y0, y1])
                .labels(vec![
                    Line::from(format!("{y0:.0}")),
                    Line::from(format!("{:.0}", (y0 + y1) / 2.0)),
                    Line::from(format!("{y1:.0}")),
                ]),
        );
    frame.render_widget(chart, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
    ];

    match app.selection_label() {
        Some(label) => {
            spans.push(Span::styled(label, Style::default().fg(Color::Cyan)));
            if app.is_simulating() {
                spans.push(Span::styled(
                    " [packing…]",
                    Style::default().fg(Color::Magenta),
                ));
            }
        }
        None => spans.push(Span::styled(
            "click a country to zoom",
            Style::default().fg(Color::DarkGray),
        )),
    }

    if let Some(notice) = &app.notice {
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(notice.clone(), Style::default().fg(Color::Red)));
    }

    spans.push(Span::styled(
        " | tab:focus hjkl:pan +/-:zoom r:reset q:quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
