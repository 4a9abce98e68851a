use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::layout::{Position, Rect};
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::time::Duration;

use incident_atlas::app::{App, Focus};
use incident_atlas::data;
use incident_atlas::map::MapRenderer;
use incident_atlas::timeline::Timeline;
use incident_atlas::ui;

#[derive(Parser)]
#[command(about = "Terminal choropleth map and timeline for aviation incident data")]
struct Args {
    /// Directory holding the incident CSV and boundaries GeoJSON
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    /// First year shown on the timeline
    #[arg(long, default_value_t = 2010)]
    start_year: i32,
    /// Last year shown on the timeline
    #[arg(long, default_value_t = 2022)]
    end_year: i32,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load before the terminal takes over, so warnings land on stderr
    let incidents = data::load_incidents(&args.data_dir.join("parsed_incident_data.csv"))
        .context("loading incident data")?;
    let countries = data::load_countries(
        &args
            .data_dir
            .join("world-administrative-boundaries-fixed.geo.json"),
    )
    .context("loading administrative boundaries")?;

    let timeline = Timeline::from_records(&incidents.records, args.start_year, args.end_year);
    let map = MapRenderer::new(countries, incidents.departure_counts().clone());

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, map, incidents, timeline);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Braille pixel dimensions of the map pane for a terminal size.
fn map_pixel_dims(width: u16, height: u16) -> (usize, usize) {
    let (map_pane, _, _) = ui::panes(Rect::new(0, 0, width, height));
    let inner = ui::pane_inner(map_pane);
    (inner.width as usize * 2, inner.height as usize * 4)
}

/// Handle mouse events: selection clicks, drag panning, scroll zooming,
/// and the timeline probe.
fn handle_mouse(app: &mut App, mouse: MouseEvent, terminal_area: Rect) {
    let (map_pane, timeline_pane, _) = ui::panes(terminal_area);
    let map_inner = ui::pane_inner(map_pane);
    let pos = Position::new(mouse.column, mouse.row);

    // Braille pixel position inside the map canvas
    let map_pixel = || {
        (
            (mouse.column.saturating_sub(map_inner.x)) as i32 * 2,
            (mouse.row.saturating_sub(map_inner.y)) as i32 * 4,
        )
    };

    match mouse.kind {
        MouseEventKind::ScrollUp if map_inner.contains(pos) => {
            let (px, py) = map_pixel();
            app.zoom_in_at(px, py);
        }
        MouseEventKind::ScrollDown if map_inner.contains(pos) => {
            let (px, py) = map_pixel();
            app.zoom_out_at(px, py);
        }
        MouseEventKind::ScrollUp if timeline_pane.contains(pos) => {
            app.timeline.zoom_window_in();
        }
        MouseEventKind::ScrollDown if timeline_pane.contains(pos) => {
            app.timeline.zoom_window_out();
        }
        MouseEventKind::Down(MouseButton::Left) => {
            app.begin_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Drag(MouseButton::Left) if map_inner.contains(pos) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            if !app.drag_moved {
                if map_inner.contains(pos) {
                    let (px, py) = map_pixel();
                    app.select_at(px, py);
                } else if let Some(day) =
                    ui::timeline_day_at(timeline_pane, &app.timeline, mouse.column)
                {
                    app.timeline.probe_nearest(day);
                }
            }
            app.end_drag();
        }
        MouseEventKind::Moved => {
            if timeline_pane.contains(pos) {
                if let Some(day) = ui::timeline_day_at(timeline_pane, &app.timeline, mouse.column) {
                    app.timeline.probe_nearest(day);
                }
            }
        }
        _ => {}
    }
}

fn handle_key(app: &mut App, code: KeyCode) {
    // Keys shared by both panes
    match code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.quit();
            return;
        }
        KeyCode::Tab => {
            app.toggle_focus();
            return;
        }
        _ => {}
    }

    match app.focus {
        Focus::Map => match code {
            KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
            KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
            KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
            KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),
            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),
            KeyCode::Char('f') | KeyCode::Char('F') => app.map.toggle_fills(),
            KeyCode::Char('o') | KeyCode::Char('O') => app.map.toggle_outlines(),
            KeyCode::Char('L') => app.map.toggle_labels(),
            KeyCode::Char('g') | KeyCode::Char('G') => app.map.toggle_ring(),
            KeyCode::Char('r') | KeyCode::Char('0') => app.clear_selection(),
            _ => {}
        },
        Focus::Timeline => match code {
            KeyCode::Left | KeyCode::Char('h') => app.timeline.pan_window(-1),
            KeyCode::Right | KeyCode::Char('l') => app.timeline.pan_window(1),
            KeyCode::Char('+') | KeyCode::Char('=') => app.timeline.zoom_window_in(),
            KeyCode::Char('-') | KeyCode::Char('_') => app.timeline.zoom_window_out(),
            KeyCode::Char('r') | KeyCode::Char('0') => app.timeline.reset_window(),
            _ => {}
        },
    }
}

fn run(
    terminal: &mut DefaultTerminal,
    map: MapRenderer,
    incidents: data::IncidentTable,
    timeline: Timeline,
) -> Result<()> {
    let size = terminal.size()?;
    let (pixel_w, pixel_h) = map_pixel_dims(size.width, size.height);
    let mut app = App::new(map, incidents, timeline, pixel_w, pixel_h);

    // Main loop
    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        handle_key(&mut app, key.code);
                    }
                }
                Event::Mouse(mouse) => {
                    let size = terminal.size()?;
                    handle_mouse(&mut app, mouse, Rect::new(0, 0, size.width, size.height));
                }
                Event::Resize(width, height) => {
                    let (pixel_w, pixel_h) = map_pixel_dims(width, height);
                    app.resize(pixel_w, pixel_h);
                }
                _ => {}
            }
        }

        // Advance the in-flight ring packing, one step per frame
        app.tick();

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
