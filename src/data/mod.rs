use anyhow::{Context, Result};
use geojson::{GeoJson, Value};
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::map::{rings_bbox, Country};

/// One row of the parsed incident dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct IncidentRecord {
    #[serde(rename = "Accident_ID")]
    pub id: u32,
    /// ISO date, `YYYY-MM-DD`.
    #[serde(rename = "Incident_Date")]
    pub date: String,
    #[serde(rename = "Incident_Category")]
    pub category: String,
    // Dataset header carries the upstream typo.
    #[serde(rename = "Aircaft_Nature")]
    pub aircraft: String,
    #[serde(rename = "Fatalities")]
    pub fatalities: f64,
    #[serde(rename = "International")]
    pub international: u8,
    #[serde(rename = "Departure_Code")]
    pub departure: String,
    #[serde(rename = "Destination_Code")]
    pub destination: String,
}

/// Loaded incidents plus the aggregations the map and ring need:
/// departing counts per country (choropleth metric) and per-destination
/// counts per origin (ring weights, in first-seen order so count ties
/// stay deterministic).
pub struct IncidentTable {
    pub records: Vec<IncidentRecord>,
    departures: HashMap<String, u64>,
    destinations: HashMap<String, Vec<(String, u64)>>,
}

impl IncidentTable {
    pub fn from_records(records: Vec<IncidentRecord>) -> Self {
        let mut departures: HashMap<String, u64> = HashMap::new();
        let mut destinations: HashMap<String, Vec<(String, u64)>> = HashMap::new();
        let mut position: HashMap<String, HashMap<String, usize>> = HashMap::new();

        for record in &records {
            *departures.entry(record.departure.clone()).or_default() += 1;

            let list = destinations.entry(record.departure.clone()).or_default();
            let index = position.entry(record.departure.clone()).or_default();
            match index.get(&record.destination) {
                Some(&i) => list[i].1 += 1,
                None => {
                    index.insert(record.destination.clone(), list.len());
                    list.push((record.destination.clone(), 1));
                }
            }
        }

        Self {
            records,
            departures,
            destinations,
        }
    }

    /// Number of incidents departing from a country, if any.
    pub fn departures_from(&self, code: &str) -> Option<u64> {
        self.departures.get(code).copied()
    }

    pub fn departure_counts(&self) -> &HashMap<String, u64> {
        &self.departures
    }

    /// (destination, count) pairs for an origin, first-seen order.
    pub fn destinations_of(&self, code: &str) -> &[(String, u64)] {
        self.destinations
            .get(code)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Load the incident CSV. Malformed rows are skipped with a warning
/// rather than aborting the whole load.
pub fn load_incidents(path: &Path) -> Result<IncidentTable> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening incident data at {}", path.display()))?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: IncidentRecord = match row {
            Ok(record) => record,
            Err(e) => {
                eprintln!("Warning: skipping malformed incident row: {e}");
                continue;
            }
        };
        if record.departure.is_empty() || record.destination.is_empty() {
            continue;
        }
        records.push(record);
    }
    Ok(IncidentTable::from_records(records))
}

/// Load the administrative boundaries GeoJSON. The file is large, so it
/// goes through simd-json; per-country bboxes are computed in parallel.
pub fn load_countries(path: &Path) -> Result<Vec<Country>> {
    let mut bytes = fs::read(path)
        .with_context(|| format!("reading boundaries at {}", path.display()))?;
    let geojson: GeoJson = simd_json::serde::from_slice(&mut bytes)
        .with_context(|| format!("parsing boundaries at {}", path.display()))?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        anyhow::bail!("boundaries file is not a FeatureCollection");
    };

    let countries: Vec<Country> = collection
        .features
        .into_par_iter()
        .filter_map(country_from_feature)
        .collect();
    Ok(countries)
}

fn country_from_feature(feature: geojson::Feature) -> Option<Country> {
    let props = feature.properties.as_ref()?;

    let Some(code) = props.get("iso3").and_then(|v| v.as_str()) else {
        // Disputed territories and the like carry no iso3; skip quietly.
        return None;
    };
    let name = props
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or(code)
        .to_string();

    // geo_point_2d is stored [lat, lon]; swap into (lon, lat)
    let centroid = props
        .get("geo_point_2d")
        .and_then(|v| v.as_array())
        .and_then(|a| match (a.first()?.as_f64(), a.get(1)?.as_f64()) {
            (Some(lat), Some(lon)) => Some((lon, lat)),
            _ => None,
        });
    let Some(centroid) = centroid else {
        eprintln!("Warning: no centroid for {code}, skipping feature");
        return None;
    };

    let rings = match feature.geometry.map(|g| g.value) {
        Some(Value::Polygon(polygon)) => polygon_rings(&polygon),
        Some(Value::MultiPolygon(polygons)) => polygons
            .iter()
            .flat_map(|polygon| polygon_rings(polygon))
            .collect(),
        _ => {
            eprintln!("Warning: unsupported geometry for {code}, skipping feature");
            return None;
        }
    };
    if rings.is_empty() {
        return None;
    }

    let bbox = rings_bbox(&rings);
    Some(Country {
        code: code.to_string(),
        name,
        rings,
        bbox,
        centroid,
    })
}

fn polygon_rings(polygon: &[Vec<Vec<f64>>]) -> Vec<Vec<(f64, f64)>> {
    polygon
        .iter()
        .map(|ring| ring.iter().map(|c| (c[0], c[1])).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(departure: &str, destination: &str, date: &str, fatalities: f64) -> IncidentRecord {
        IncidentRecord {
            id: 0,
            date: date.to_string(),
            category: "Accident".to_string(),
            aircraft: "Passenger".to_string(),
            fatalities,
            international: u8::from(departure != destination),
            departure: departure.to_string(),
            destination: destination.to_string(),
        }
    }

    #[test]
    fn rollups_count_departures_and_destinations() {
        let table = IncidentTable::from_records(vec![
            record("USA", "CAN", "2015-01-01", 0.0),
            record("USA", "CAN", "2015-02-01", 2.0),
            record("USA", "MEX", "2015-03-01", 0.0),
            record("FRA", "USA", "2016-01-01", 1.0),
        ]);

        assert_eq!(table.departures_from("USA"), Some(3));
        assert_eq!(table.departures_from("FRA"), Some(1));
        assert_eq!(table.departures_from("CAN"), None);

        let dests = table.destinations_of("USA");
        assert_eq!(
            dests,
            &[("CAN".to_string(), 2), ("MEX".to_string(), 1)]
        );
        assert!(table.destinations_of("ZZZ").is_empty());
    }

    #[test]
    fn destination_order_is_first_seen() {
        // Equal counts must keep dataset order for deterministic ties
        let table = IncidentTable::from_records(vec![
            record("USA", "MEX", "2015-01-01", 0.0),
            record("USA", "CAN", "2015-02-01", 0.0),
        ]);
        let dests = table.destinations_of("USA");
        assert_eq!(dests[0].0, "MEX");
        assert_eq!(dests[1].0, "CAN");
    }

    #[test]
    fn csv_rows_deserialize_with_dataset_headers() {
        let csv_text = "\
Accident_ID,Incident_Date,Incident_Category,Aircaft_Nature,Fatalities,International,Departure_Code,Destination_Code
0,2012-06-02,Accident,Passenger,10.0,1,NGA,GHA
1,2013-09-14,Hijacking,Cargo,0.0,0,USA,USA
";
        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        let rows: Vec<IncidentRecord> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .expect("rows deserialize");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].departure, "NGA");
        assert_eq!(rows[0].fatalities, 10.0);
        assert_eq!(rows[1].international, 0);
        assert_eq!(rows[1].date, "2013-09-14");
    }
}
