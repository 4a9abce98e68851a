use std::collections::HashMap;

/// Spatial index for country polygons using conservative approximation.
/// Each country's bounding box is indexed into every cell it overlaps,
/// guaranteeing no false negatives while allowing false positives
/// (eliminated by the exact point-in-polygon check at the use site).
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl FeatureGrid {
    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from feature bounding boxes (min_lon, min_lat, max_lon, max_lat).
    pub fn build(bboxes: impl Iterator<Item = (f64, f64, f64, f64)>, cell_size: f64) -> Self {
        let mut grid = Self {
            cells: HashMap::new(),
            cell_size,
        };
        for (idx, (min_lon, min_lat, max_lon, max_lat)) in bboxes.enumerate() {
            let min_cell = grid.to_cell(min_lon, min_lat);
            let max_cell = grid.to_cell(max_lon, max_lat);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    /// Candidate feature indices whose bbox cell contains the point.
    pub fn query_point(&self, lon: f64, lat: f64) -> &[usize] {
        self.cells
            .get(&self.to_cell(lon, lat))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Append feature indices for the given bounds into results vec.
    /// May contain duplicates; caller should dedup after all queries.
    pub fn query_into(
        &self,
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
        results: &mut Vec<usize>,
    ) {
        let min_cell = self.to_cell(min_lon, min_lat);
        let max_cell = self.to_cell(max_lon, max_lat);
        for y in min_cell.1..=max_cell.1 {
            for x in min_cell.0..=max_cell.0 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend_from_slice(indices);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> FeatureGrid {
        // Two features: one around the origin, one far east
        let bboxes = vec![(-5.0, -5.0, 5.0, 5.0), (100.0, 10.0, 120.0, 30.0)];
        FeatureGrid::build(bboxes.into_iter(), 10.0)
    }

    #[test]
    fn query_point_finds_overlapping_feature() {
        let g = grid();
        assert!(g.query_point(0.0, 0.0).contains(&0));
        assert!(g.query_point(110.0, 20.0).contains(&1));
        assert!(g.query_point(50.0, 50.0).is_empty());
    }

    #[test]
    fn query_into_is_conservative() {
        let g = grid();
        let mut results = Vec::new();
        g.query_into(-20.0, -20.0, 130.0, 40.0, &mut results);
        results.sort_unstable();
        results.dedup();
        assert_eq!(results, vec![0, 1]);
    }
}
