use crate::braille::BrailleCanvas;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a filled circle (destination bubbles)
pub fn draw_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

/// Draw a circle outline (the origin ring), midpoint algorithm.
pub fn draw_circle_outline(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    if radius <= 0 {
        canvas.set_pixel_signed(cx, cy);
        return;
    }
    let mut x = radius;
    let mut y = 0;
    let mut err = 1 - radius;

    while x >= y {
        for &(px, py) in &[
            (cx + x, cy + y),
            (cx - x, cy + y),
            (cx + x, cy - y),
            (cx - x, cy - y),
            (cx + y, cy + x),
            (cx - y, cy + x),
            (cx + y, cy - x),
            (cx - y, cy - x),
        ] {
            canvas.set_pixel_signed(px, py);
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

/// Even-odd point-in-polygon over a set of rings. Holes fall out of the
/// even-odd rule without tracking ring orientation.
pub fn point_in_rings(lon: f64, lat: f64, rings: &[Vec<(f64, f64)>]) -> bool {
    let mut inside = false;
    for ring in rings {
        if ring.len() < 3 {
            continue;
        }
        let mut j = ring.len() - 1;
        for i in 0..ring.len() {
            let (xi, yi) = ring[i];
            let (xj, yj) = ring[j];
            if (yi > lat) != (yj > lat) {
                let x_cross = xi + (lat - yi) / (yj - yi) * (xj - xi);
                if lon < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
    }
    inside
}

/// Lon/lat bounding box of a set of rings: (min_lon, min_lat, max_lon, max_lat).
pub fn rings_bbox(rings: &[Vec<(f64, f64)>]) -> (f64, f64, f64, f64) {
    let mut bbox = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for ring in rings {
        for &(lon, lat) in ring {
            bbox.0 = bbox.0.min(lon);
            bbox.1 = bbox.1.min(lat);
            bbox.2 = bbox.2.max(lon);
            bbox.3 = bbox.3.max(lat);
        }
    }
    bbox
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0);
        // Should have pixels across the top
        let s = canvas.to_string();
        assert!(s.contains('⠉') || s.contains('⠁'));
    }

    #[test]
    fn circle_outline_stays_hollow() {
        let mut canvas = BrailleCanvas::new(6, 3);
        draw_circle_outline(&mut canvas, 5, 5, 4);
        // Center pixel untouched
        assert!(!canvas.pixel_set(5, 5));
        assert!(canvas.pixel_set(9, 5));
        assert!(canvas.pixel_set(1, 5));
    }

    fn square() -> Vec<Vec<(f64, f64)>> {
        vec![vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]]
    }

    #[test]
    fn point_in_rings_basic() {
        let rings = square();
        assert!(point_in_rings(5.0, 5.0, &rings));
        assert!(!point_in_rings(15.0, 5.0, &rings));
        assert!(!point_in_rings(-1.0, -1.0, &rings));
    }

    #[test]
    fn point_in_rings_respects_holes() {
        let mut rings = square();
        rings.push(vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0), (4.0, 4.0)]);
        assert!(!point_in_rings(5.0, 5.0, &rings));
        assert!(point_in_rings(2.0, 2.0, &rings));
    }

    #[test]
    fn bbox_covers_all_rings() {
        let rings = vec![
            vec![(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)],
            vec![(-3.0, 2.0), (1.0, 8.0), (0.0, 2.0)],
        ];
        assert_eq!(rings_bbox(&rings), (-3.0, 0.0, 5.0, 8.0));
    }
}
