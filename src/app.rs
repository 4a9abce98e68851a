use crate::data::IncidentTable;
use crate::layout::{build_ring, top_destinations, PackConfig, Packing, RingLayout};
use crate::map::{base_project, MapRenderer, RingDisplay, Viewport};
use crate::timeline::Timeline;

/// Which pane keyboard input is routed to.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Map,
    Timeline,
}

/// Application state
pub struct App {
    pub viewport: Viewport,
    pub map: MapRenderer,
    pub incidents: IncidentTable,
    pub timeline: Timeline,
    pub pack_config: PackConfig,
    pub focus: Focus,
    pub should_quit: bool,
    /// Index into `map.countries` of the zoomed country, if any.
    pub selected: Option<usize>,
    /// The at-most-one in-flight packing run. Replacing or clearing the
    /// selection drops it, which is what cancellation means here.
    packing: Option<Packing>,
    /// Completed layout for the current selection.
    ring: Option<RingLayout>,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Whether the current button press turned into a drag; a release
    /// without movement is a click (select), with movement it is a pan.
    pub drag_moved: bool,
    /// One-line notice surfaced in the status bar (load/layout errors).
    pub notice: Option<String>,
}

impl App {
    pub fn new(
        map: MapRenderer,
        incidents: IncidentTable,
        timeline: Timeline,
        pixel_width: usize,
        pixel_height: usize,
    ) -> Self {
        Self {
            viewport: Viewport::world(pixel_width, pixel_height),
            map,
            incidents,
            timeline,
            pack_config: PackConfig::default(),
            focus: Focus::Map,
            should_quit: false,
            selected: None,
            packing: None,
            ring: None,
            last_mouse: None,
            drag_moved: false,
            notice: None,
        }
    }

    /// Update viewport size when the terminal resizes
    pub fn resize(&mut self, pixel_width: usize, pixel_height: usize) {
        self.viewport.width = pixel_width;
        self.viewport.height = pixel_height;
    }

    /// Advance the in-flight simulation by one step. Called once per
    /// frame; the run is harvested exactly once when it terminates.
    pub fn tick(&mut self) {
        let Some(packing) = self.packing.as_mut() else {
            return;
        };
        match packing.step() {
            Ok(phase) if phase.is_terminal() => {
                self.ring = packing.layout().cloned();
                self.packing = None;
            }
            Ok(_) => {}
            Err(e) => {
                self.notice = Some(format!("layout aborted: {e}"));
                self.packing = None;
            }
        }
    }

    /// Select the country under a braille pixel, or clear the selection
    /// when the click hits the active country or open water. Countries
    /// with no departing incidents are not selectable.
    pub fn select_at(&mut self, px: i32, py: i32) {
        let (lon, lat) = self.viewport.unproject(px, py);
        let hit = self.map.country_at(lon, lat);

        match hit {
            Some(idx) if Some(idx) != self.selected => {
                let code = self.map.countries[idx].code.clone();
                if self.incidents.departures_from(&code).is_none() {
                    self.clear_selection();
                    return;
                }
                self.select_country(idx);
            }
            _ => self.clear_selection(),
        }
    }

    fn select_country(&mut self, idx: usize) {
        // Cancel any in-flight run before its successor starts; a
        // dropped run can never report a stale layout.
        self.packing = None;
        self.ring = None;
        self.notice = None;
        self.selected = Some(idx);

        let country = &self.map.countries[idx];
        self.viewport.focus_on(country.bbox);

        let code = country.code.clone();
        let destinations = top_destinations(
            &code,
            self.incidents.destinations_of(&code),
            self.pack_config.top_n,
        );
        let map = &self.map;
        match build_ring(
            &code,
            &destinations,
            |c: &str| map.centroid_of(c),
            base_project,
            &self.pack_config,
        ) {
            Ok(packing) => self.packing = Some(packing),
            Err(e) => self.notice = Some(format!("cannot layout {code}: {e}")),
        }
    }

    /// Drop the selection, the ring, and any in-flight run.
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.packing = None;
        self.ring = None;
        self.viewport.reset();
    }

    /// The ring overlay for the renderer, once a run has finished.
    pub fn ring_display(&self) -> Option<RingDisplay<'_>> {
        self.ring.as_ref().map(|layout| RingDisplay {
            layout,
            rest_length: self.pack_config.rest_length,
        })
    }

    pub fn is_simulating(&self) -> bool {
        self.packing.is_some()
    }

    /// Name and departing count of the selected country, for the status bar.
    pub fn selection_label(&self) -> Option<String> {
        let idx = self.selected?;
        let country = &self.map.countries[idx];
        let count = self.map.count_of(&country.code).unwrap_or(0);
        Some(format!("{} ({count} departing)", country.name))
    }

    /// Pan the map
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.viewport.zoom_in_at(px, py);
    }

    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.viewport.zoom_out_at(px, py);
    }

    /// Start tracking a button press.
    pub fn begin_drag(&mut self, x: u16, y: u16) {
        self.last_mouse = Some((x, y));
        self.drag_moved = false;
    }

    /// Handle mouse drag panning
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        self.drag_moved = true;
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            let scale = if self.viewport.zoom < 2.0 {
                2
            } else if self.viewport.zoom < 4.0 {
                3
            } else {
                4
            };
            self.pan(dx * scale, dy * scale);
        }
        self.last_mouse = Some((x, y));
    }

    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Map => Focus::Timeline,
            Focus::Timeline => Focus::Map,
        };
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }
}
