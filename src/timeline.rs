use std::collections::HashMap;

use crate::data::IncidentRecord;

/// Smallest window the brush can shrink to, in days.
const MIN_WINDOW_DAYS: i64 = 30;
/// Fraction of the window span moved per pan step.
const PAN_STEP: f64 = 0.1;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Total fatalities on one incident date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelinePoint {
    /// Days since 1970-01-01.
    pub day: i64,
    pub fatalities: f64,
}

/// Fatalities-over-time series with a brushed window and a probe cursor.
pub struct Timeline {
    points: Vec<TimelinePoint>,
    full: (i64, i64),
    window: (i64, i64),
    probe: Option<usize>,
}

impl Timeline {
    /// Sum fatalities per incident date, keeping only the configured
    /// year range, sorted by day.
    pub fn from_records(records: &[IncidentRecord], start_year: i32, end_year: i32) -> Self {
        let mut by_day: HashMap<i64, f64> = HashMap::new();
        for record in records {
            let Some((y, m, d)) = parse_iso_date(&record.date) else {
                continue;
            };
            if y < start_year || y > end_year {
                continue;
            }
            *by_day.entry(days_from_civil(y, m, d)).or_default() += record.fatalities;
        }

        let mut points: Vec<TimelinePoint> = by_day
            .into_iter()
            .map(|(day, fatalities)| TimelinePoint { day, fatalities })
            .collect();
        points.sort_by_key(|p| p.day);

        let full = match (points.first(), points.last()) {
            (Some(a), Some(b)) => (a.day, b.day),
            _ => (0, 0),
        };
        Self {
            points,
            full,
            window: full,
            probe: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn window(&self) -> (i64, i64) {
        self.window
    }

    /// Points inside the current window.
    pub fn windowed(&self) -> &[TimelinePoint] {
        let start = self.points.partition_point(|p| p.day < self.window.0);
        let end = self.points.partition_point(|p| p.day <= self.window.1);
        &self.points[start..end]
    }

    /// Shift the window left/right by a tenth of its span.
    pub fn pan_window(&mut self, direction: i64) {
        let span = self.window.1 - self.window.0;
        let step = ((span as f64 * PAN_STEP) as i64).max(1) * direction.signum();
        let (mut lo, mut hi) = (self.window.0 + step, self.window.1 + step);
        if lo < self.full.0 {
            hi += self.full.0 - lo;
            lo = self.full.0;
        }
        if hi > self.full.1 {
            lo -= hi - self.full.1;
            hi = self.full.1;
        }
        self.window = (lo.max(self.full.0), hi.min(self.full.1));
        self.probe = None;
    }

    /// Halve the window span around its center (brush zoom in).
    pub fn zoom_window_in(&mut self) {
        self.scale_window(0.5);
    }

    /// Double the window span around its center (brush zoom out).
    pub fn zoom_window_out(&mut self) {
        self.scale_window(2.0);
    }

    fn scale_window(&mut self, factor: f64) {
        let full_span = self.full.1 - self.full.0;
        let span = self.window.1 - self.window.0;
        let new_span = ((span as f64 * factor) as i64)
            .clamp(MIN_WINDOW_DAYS.min(full_span), full_span.max(1));
        let center = (self.window.0 + self.window.1) / 2;
        let mut lo = center - new_span / 2;
        let mut hi = lo + new_span;
        if lo < self.full.0 {
            hi += self.full.0 - lo;
            lo = self.full.0;
        }
        if hi > self.full.1 {
            lo -= hi - self.full.1;
            hi = self.full.1;
        }
        self.window = (lo.max(self.full.0), hi.min(self.full.1));
        self.probe = None;
    }

    /// Clear the brush back to the full extent.
    pub fn reset_window(&mut self) {
        self.window = self.full;
        self.probe = None;
    }

    /// Fatalities extent over the windowed points, zero-floored and
    /// rounded up to a pleasant axis bound.
    pub fn y_extent(&self) -> (f64, f64) {
        let max = self
            .windowed()
            .iter()
            .map(|p| p.fatalities)
            .fold(0.0_f64, f64::max);
        (0.0, nice_ceil(max))
    }

    /// Snap the probe to the point closest to `day` inside the window.
    pub fn probe_nearest(&mut self, day: f64) {
        let start = self.points.partition_point(|p| p.day < self.window.0);
        let windowed = self.windowed();
        self.probe = windowed
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (a.day as f64 - day).abs();
                let db = (b.day as f64 - day).abs();
                da.total_cmp(&db)
            })
            .map(|(i, _)| start + i);
    }

    pub fn clear_probe(&mut self) {
        self.probe = None;
    }

    pub fn probe_point(&self) -> Option<TimelinePoint> {
        self.probe.map(|i| self.points[i])
    }
}

/// Round up to 1, 2, or 5 times a power of ten (axis-friendly bound).
fn nice_ceil(value: f64) -> f64 {
    if value <= 0.0 {
        return 1.0;
    }
    let mag = 10f64.powf(value.log10().floor());
    for mult in [1.0, 2.0, 5.0, 10.0] {
        if value <= mag * mult {
            return mag * mult;
        }
    }
    value
}

/// Parse `YYYY-MM-DD`; anything else is skipped upstream.
fn parse_iso_date(text: &str) -> Option<(i32, u32, u32)> {
    let mut parts = text.splitn(3, '-');
    let y = parts.next()?.parse().ok()?;
    let m: u32 = parts.next()?.parse().ok()?;
    let d: u32 = parts.next()?.parse().ok()?;
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) {
        return None;
    }
    Some((y, m, d))
}

/// Days since 1970-01-01 for a civil date (Gregorian, proleptic).
fn days_from_civil(y: i32, m: u32, d: u32) -> i64 {
    let y = y as i64 - i64::from(m <= 2);
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = if m > 2 { m as i64 - 3 } else { m as i64 + 9 };
    let doy = (153 * mp + 2) / 5 + d as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}

/// Inverse of [`days_from_civil`].
fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    ((y + i64::from(m <= 2)) as i32, m, d)
}

/// `02 Jun 2012`-style label for axis ticks and the probe readout.
pub fn format_day(day: i64) -> String {
    let (y, m, d) = civil_from_days(day);
    format!("{d:02} {} {y}", MONTHS[(m - 1) as usize])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, fatalities: f64) -> IncidentRecord {
        IncidentRecord {
            id: 0,
            date: date.to_string(),
            category: "Accident".to_string(),
            aircraft: "Passenger".to_string(),
            fatalities,
            international: 1,
            departure: "USA".to_string(),
            destination: "CAN".to_string(),
        }
    }

    #[test]
    fn civil_date_round_trip() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        for &(y, m, d) in &[(2000, 2, 29), (2012, 6, 2), (2022, 12, 31), (1969, 12, 31)] {
            assert_eq!(civil_from_days(days_from_civil(y, m, d)), (y, m, d));
        }
        // Consecutive days differ by one across a leap boundary
        assert_eq!(
            days_from_civil(2020, 3, 1) - days_from_civil(2020, 2, 28),
            2
        );
    }

    #[test]
    fn format_day_matches_the_original_readout() {
        assert_eq!(format_day(days_from_civil(2012, 6, 2)), "02 Jun 2012");
    }

    #[test]
    fn binning_sums_per_date_and_filters_years() {
        let records = vec![
            record("2012-06-02", 3.0),
            record("2012-06-02", 2.0),
            record("2015-01-10", 7.0),
            record("2009-05-05", 100.0), // outside the year range
            record("not-a-date", 5.0),
        ];
        let timeline = Timeline::from_records(&records, 2010, 2022);

        let points = timeline.windowed();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].day, days_from_civil(2012, 6, 2));
        assert_eq!(points[0].fatalities, 5.0);
        assert_eq!(points[1].fatalities, 7.0);
    }

    #[test]
    fn window_zoom_and_pan_stay_inside_the_extent() {
        let records = vec![record("2012-01-01", 1.0), record("2020-01-01", 2.0)];
        let mut timeline = Timeline::from_records(&records, 2010, 2022);
        let full = timeline.window();

        timeline.zoom_window_in();
        let (lo, hi) = timeline.window();
        assert!(lo >= full.0 && hi <= full.1);
        assert!(hi - lo < full.1 - full.0);

        for _ in 0..100 {
            timeline.pan_window(-1);
        }
        assert_eq!(timeline.window().0, full.0);

        timeline.reset_window();
        assert_eq!(timeline.window(), full);
    }

    #[test]
    fn windowing_drops_out_of_range_points() {
        let records = vec![
            record("2012-01-01", 1.0),
            record("2016-01-01", 2.0),
            record("2020-01-01", 3.0),
        ];
        let mut timeline = Timeline::from_records(&records, 2010, 2022);
        timeline.zoom_window_in();
        timeline.zoom_window_in();

        let windowed = timeline.windowed();
        assert!(windowed.len() < 3);
        for p in windowed {
            assert!(p.day >= timeline.window().0 && p.day <= timeline.window().1);
        }
    }

    #[test]
    fn probe_snaps_to_the_closest_point() {
        let records = vec![
            record("2012-01-01", 1.0),
            record("2014-01-01", 2.0),
            record("2020-01-01", 3.0),
        ];
        let mut timeline = Timeline::from_records(&records, 2010, 2022);

        let near = days_from_civil(2014, 3, 1) as f64;
        timeline.probe_nearest(near);
        let point = timeline.probe_point().expect("probe set");
        assert_eq!(point.day, days_from_civil(2014, 1, 1));
        assert_eq!(point.fatalities, 2.0);

        timeline.clear_probe();
        assert!(timeline.probe_point().is_none());
    }

    #[test]
    fn y_extent_is_zero_floored_and_nice() {
        let records = vec![record("2012-01-01", 37.0)];
        let timeline = Timeline::from_records(&records, 2010, 2022);
        assert_eq!(timeline.y_extent(), (0.0, 50.0));

        let empty = Timeline::from_records(&[], 2010, 2022);
        assert!(empty.is_empty());
        assert_eq!(empty.y_extent(), (0.0, 1.0));
    }
}
