use rayon::prelude::*;
use std::collections::HashMap;

use crate::braille::{BrailleCanvas, ShadeLayer};
use crate::layout::RingLayout;
use crate::map::geometry::{draw_circle, draw_circle_outline, draw_line, point_in_rings};
use crate::map::projection::Viewport;
use crate::map::spatial::FeatureGrid;

/// One administrative boundary feature.
#[derive(Clone)]
pub struct Country {
    /// ISO-3166 alpha-3 code, the join key against the incident data.
    pub code: String,
    pub name: String,
    /// All polygon rings (exteriors and holes, even-odd).
    pub rings: Vec<Vec<(f64, f64)>>,
    /// (min_lon, min_lat, max_lon, max_lat)
    pub bbox: (f64, f64, f64, f64),
    /// (lon, lat) representative point, from the dataset's geo_point_2d.
    pub centroid: (f64, f64),
}

/// Sequential orange ramp (light → dark) for the choropleth fill.
const RAMP_LIGHT: (f64, f64, f64) = (255.0, 245.0, 235.0);
const RAMP_DARK: (f64, f64, f64) = (127.0, 39.0, 4.0);
/// Fill for countries with no departing incidents.
const NO_DATA: (u8, u8, u8) = (226, 230, 233);
/// Fill multiplier for unselected countries while a selection is active.
const DIM: f64 = 0.45;

/// Display settings for map layers
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_fills: bool,
    pub show_outlines: bool,
    pub show_ring: bool,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_fills: true,
            show_outlines: true,
            show_ring: true,
            show_labels: true,
        }
    }
}

/// The ring overlay for the selected country: the finished layout plus
/// the base-plane ring radius it was packed against.
pub struct RingDisplay<'a> {
    pub layout: &'a RingLayout,
    pub rest_length: f64,
}

/// Rendered layers for one frame, composited back-to-front by the UI.
pub struct MapLayers {
    pub shade: ShadeLayer,
    pub outlines: BrailleCanvas,
    pub ring: BrailleCanvas,
    pub bubbles: BrailleCanvas,
    /// (char_x, char_y, text) overlays, drawn last.
    pub labels: Vec<(u16, u16, String)>,
}

/// Choropleth renderer over the administrative boundaries.
pub struct MapRenderer {
    pub countries: Vec<Country>,
    counts: HashMap<String, u64>,
    count_extent: (u64, u64),
    grid: FeatureGrid,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new(countries: Vec<Country>, counts: HashMap<String, u64>) -> Self {
        let grid = FeatureGrid::build(countries.iter().map(|c| c.bbox), 10.0);
        let mut extent = (u64::MAX, 0u64);
        for &n in counts.values() {
            extent.0 = extent.0.min(n);
            extent.1 = extent.1.max(n);
        }
        if extent.0 > extent.1 {
            extent = (0, 0);
        }
        Self {
            countries,
            counts,
            count_extent: extent,
            grid,
            settings: DisplaySettings::default(),
        }
    }

    pub fn has_data(&self) -> bool {
        !self.countries.is_empty()
    }

    /// Departing-incident count for a country, if it has any.
    pub fn count_of(&self, code: &str) -> Option<u64> {
        self.counts.get(code).copied()
    }

    pub fn centroid_of(&self, code: &str) -> Option<(f64, f64)> {
        self.countries
            .iter()
            .find(|c| c.code == code)
            .map(|c| c.centroid)
    }

    /// Exact country under a geographic point, via the grid prefilter.
    pub fn country_at(&self, lon: f64, lat: f64) -> Option<usize> {
        self.grid
            .query_point(lon, lat)
            .iter()
            .copied()
            .find(|&idx| {
                let c = &self.countries[idx];
                let (min_lon, min_lat, max_lon, max_lat) = c.bbox;
                lon >= min_lon
                    && lon <= max_lon
                    && lat >= min_lat
                    && lat <= max_lat
                    && point_in_rings(lon, lat, &c.rings)
            })
    }

    /// Choropleth fill for a count, linear over the observed extent.
    fn fill_rgb(&self, count: u64) -> (u8, u8, u8) {
        let (lo, hi) = self.count_extent;
        let t = if hi == lo {
            0.5
        } else {
            (count - lo) as f64 / (hi - lo) as f64
        };
        let channel = |a: f64, b: f64| (a + t * (b - a)).round().clamp(0.0, 255.0) as u8;
        (
            channel(RAMP_LIGHT.0, RAMP_DARK.0),
            channel(RAMP_LIGHT.1, RAMP_DARK.1),
            channel(RAMP_LIGHT.2, RAMP_DARK.2),
        )
    }

    /// Render all layers for one frame. `viewport` carries braille pixel
    /// dimensions (2x4 per character cell).
    pub fn render(
        &self,
        viewport: &Viewport,
        selected: Option<usize>,
        ring: Option<&RingDisplay>,
    ) -> MapLayers {
        let char_w = viewport.width / 2;
        let char_h = viewport.height / 4;

        let mut layers = MapLayers {
            shade: ShadeLayer::new(char_w, char_h),
            outlines: BrailleCanvas::new(char_w, char_h),
            ring: BrailleCanvas::new(char_w, char_h),
            bubbles: BrailleCanvas::new(char_w, char_h),
            labels: Vec::new(),
        };

        if self.settings.show_fills {
            self.shade_cells(&mut layers.shade, viewport, selected, char_w, char_h);
        }
        if self.settings.show_outlines {
            for country in &self.countries {
                for ring_coords in &country.rings {
                    self.draw_ring_outline(&mut layers.outlines, ring_coords, viewport);
                }
            }
        }
        if self.settings.show_ring {
            if let Some(display) = ring {
                self.draw_ring_layers(&mut layers, display, viewport);
            }
        }

        layers
    }

    /// Fill the shade layer, one rayon task per character row: each cell
    /// center is unprojected and resolved to a country through the grid.
    fn shade_cells(
        &self,
        shade: &mut ShadeLayer,
        viewport: &Viewport,
        selected: Option<usize>,
        char_w: usize,
        char_h: usize,
    ) {
        let rows: Vec<Vec<Option<(u8, u8, u8)>>> = (0..char_h)
            .into_par_iter()
            .map(|cy| {
                let mut row = vec![None; char_w];
                for (cx, cell) in row.iter_mut().enumerate() {
                    let px = (cx * 2 + 1) as i32;
                    let py = (cy * 4 + 2) as i32;
                    let (lon, lat) = viewport.unproject(px, py);
                    if !(-180.0..=180.0).contains(&lon) || !(-85.0..=85.0).contains(&lat) {
                        continue;
                    }
                    if let Some(idx) = self.country_at(lon, lat) {
                        let rgb = match self.count_of(&self.countries[idx].code) {
                            Some(n) => self.fill_rgb(n),
                            None => NO_DATA,
                        };
                        let rgb = match selected {
                            Some(active) if active != idx => dim(rgb),
                            _ => rgb,
                        };
                        *cell = Some(rgb);
                    }
                }
                row
            })
            .collect();

        for (cy, row) in rows.into_iter().enumerate() {
            shade.set_row(cy, row);
        }
    }

    /// Draw one polygon ring with viewport culling (segment-level, as
    /// for any linestring).
    fn draw_ring_outline(
        &self,
        canvas: &mut BrailleCanvas,
        ring: &[(f64, f64)],
        viewport: &Viewport,
    ) {
        if ring.len() < 2 {
            return;
        }

        let mut prev: Option<(i32, i32)> = None;
        for &(lon, lat) in ring {
            let (px, py) = viewport.project(lon, lat);
            if let Some((prev_x, prev_y)) = prev {
                let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
                if dist < viewport.width && viewport.line_might_be_visible((prev_x, prev_y), (px, py))
                {
                    draw_line(canvas, prev_x, prev_y, px, py);
                }
            }
            prev = Some((px, py));
        }
    }

    /// Draw the origin ring outline and the packed destination bubbles,
    /// mapping base-plane positions through the live viewport.
    fn draw_ring_layers(&self, layers: &mut MapLayers, display: &RingDisplay, viewport: &Viewport) {
        let ratio = viewport.base_ratio();
        let origin = viewport.project_base(display.layout.origin);
        let ring_px = (display.rest_length * ratio).round() as i32;
        draw_circle_outline(&mut layers.ring, origin.x as i32, origin.y as i32, ring_px.max(1));

        for placement in &display.layout.placements {
            let pos = viewport.project_base(placement.pos);
            let radius = ((placement.radius * ratio).round() as i32).max(1);
            draw_circle(&mut layers.bubbles, pos.x as i32, pos.y as i32, radius);

            if self.settings.show_labels {
                let char_x = pos.x as i32 / 2 + 1 + (radius / 2);
                let char_y = pos.y as i32 / 4;
                if char_x >= 0 && char_y >= 0 {
                    layers
                        .labels
                        .push((char_x as u16, char_y as u16, placement.id.clone()));
                }
            }
        }
    }

    /// Toggle choropleth fills
    pub fn toggle_fills(&mut self) {
        self.settings.show_fills = !self.settings.show_fills;
    }

    /// Toggle country outlines
    pub fn toggle_outlines(&mut self) {
        self.settings.show_outlines = !self.settings.show_outlines;
    }

    /// Toggle bubble labels
    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }

    /// Toggle the destination ring overlay
    pub fn toggle_ring(&mut self) {
        self.settings.show_ring = !self.settings.show_ring;
    }
}

fn dim(rgb: (u8, u8, u8)) -> (u8, u8, u8) {
    (
        (rgb.0 as f64 * DIM) as u8,
        (rgb.1 as f64 * DIM) as u8,
        (rgb.2 as f64 * DIM) as u8,
    )
}
