use glam::DVec2;
use std::f64::consts::PI;

/// Width of the zoom-independent plane the ring layout is computed in.
/// Final bubble positions are stored in this plane and mapped through
/// the live viewport every frame, so pan/zoom never invalidates a run.
pub const BASE_SCALE: f64 = 1000.0;

/// Largest zoom `focus_on` will pick.
const FOCUS_MAX_ZOOM: f64 = 7.0;
/// Fraction of the screen a focused country may fill.
const FOCUS_FILL: f64 = 0.4;

/// Normalized Web-Mercator coordinates in [0, 1] x [0, 1].
fn mercator_norm(lon: f64, lat: f64) -> (f64, f64) {
    let x = (lon + 180.0) / 360.0;
    let lat_rad = lat * PI / 180.0;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    (x, y)
}

/// Invert the normalized-Mercator y back to latitude.
fn mercator_lat(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI
}

/// Project into the fixed base plane (no zoom, no centering).
pub fn base_project(lon: f64, lat: f64) -> DVec2 {
    let (x, y) = mercator_norm(lon, lat);
    DVec2::new(x * BASE_SCALE, y * BASE_SCALE)
}

/// Invert [`base_project`].
pub fn base_unproject(p: DVec2) -> (f64, f64) {
    (p.x / BASE_SCALE * 360.0 - 180.0, mercator_lat(p.y / BASE_SCALE))
}

/// Viewport representing the visible map area and zoom level
#[derive(Clone)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-90 to 90)
    pub center_lat: f64,
    /// Zoom level (higher = more zoomed in)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
        }
    }

    /// Create a world view (shows entire world)
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(0.0, 20.0, 1.0, width, height)
    }

    /// Drop back to the world view, keeping the canvas size.
    pub fn reset(&mut self) {
        *self = Self::world(self.width, self.height);
    }

    /// Pixels per normalized-Mercator unit at the current zoom.
    fn scale(&self) -> f64 {
        self.zoom * self.width as f64
    }

    /// Ratio between viewport pixels and base-plane units; used to map
    /// ring layouts (computed in the base plane) onto the screen.
    pub fn base_ratio(&self) -> f64 {
        self.scale() / BASE_SCALE
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = 360.0 / (self.zoom * self.width as f64);
        self.center_lon += dx as f64 * scale;
        self.center_lat -= dy as f64 * scale * 0.5; // Mercator distortion

        // Wrap longitude
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }

        // Clamp latitude
        self.center_lat = self.center_lat.clamp(-85.0, 85.0);
    }

    /// Zoom in by a factor
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(100.0);
    }

    /// Zoom out by a factor
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(0.5);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor towards a specific pixel location
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        // Get the geographic coordinates under the cursor
        let (lon, lat) = self.unproject(px, py);

        self.zoom = (self.zoom * factor).clamp(0.5, 100.0);

        // Pan so the point stays under the cursor
        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Center and zoom onto a lon/lat bounding box so it fills at most
    /// 40% of the canvas, capped at 7x.
    pub fn focus_on(&mut self, bbox: (f64, f64, f64, f64)) {
        let (min_lon, min_lat, max_lon, max_lat) = bbox;
        let (x0, y0) = mercator_norm(min_lon, max_lat);
        let (x1, y1) = mercator_norm(max_lon, min_lat);
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();

        let fit_x = if dx > 0.0 { FOCUS_FILL / dx } else { FOCUS_MAX_ZOOM };
        let fit_y = if dy > 0.0 {
            FOCUS_FILL * self.height as f64 / (self.width as f64 * dy)
        } else {
            FOCUS_MAX_ZOOM
        };
        self.zoom = fit_x.min(fit_y).min(FOCUS_MAX_ZOOM).max(0.5);

        self.center_lon = (min_lon + max_lon) / 2.0;
        // Center in Mercator space, not raw latitude, so tall countries
        // do not drift toward the poles.
        self.center_lat = mercator_lat((y0 + y1) / 2.0).clamp(-85.0, 85.0);
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let scale = self.scale();
        let (center_x, center_y) = mercator_norm(self.center_lon, self.center_lat);

        let x = (px as f64 - self.width as f64 / 2.0) / scale + center_x;
        let y = (py as f64 - self.height as f64 / 2.0) / scale + center_y;

        (x * 360.0 - 180.0, mercator_lat(y))
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let p = self.project_f64(lon, lat);
        (p.x as i32, p.y as i32)
    }

    /// Same projection without the pixel rounding; the ring overlay
    /// keeps sub-pixel positions until the final draw.
    pub fn project_f64(&self, lon: f64, lat: f64) -> DVec2 {
        let (x, y) = mercator_norm(lon, lat);
        let (center_x, center_y) = mercator_norm(self.center_lon, self.center_lat);
        let scale = self.scale();

        DVec2::new(
            (x - center_x) * scale + self.width as f64 / 2.0,
            (y - center_y) * scale + self.height as f64 / 2.0,
        )
    }

    /// Map a base-plane point (e.g. a bubble position) onto the screen.
    pub fn project_base(&self, p: DVec2) -> DVec2 {
        let (lon, lat) = base_unproject(p);
        self.project_f64(lon, lat)
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}
