use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::DVec2;
use std::collections::HashMap;

use incident_atlas::layout::{PackConfig, PackNode, Packing};
use incident_atlas::map::{Country, MapRenderer};

/// A full top-10-plus-self packing run, targets clustered the way a
/// dense origin produces them.
fn bench_ring_packing(c: &mut Criterion) {
    let cfg = PackConfig::default();
    c.bench_function("ring_pack_11_nodes", |b| {
        b.iter(|| {
            let nodes: Vec<PackNode> = (0..11)
                .map(|i| {
                    let target = DVec2::new(10.0, i as f64 * 0.3);
                    PackNode::new(format!("N{i}"), target, 1.0 + (i % 4) as f64, i == 0)
                })
                .collect();
            let mut packing = Packing::new(DVec2::ZERO, nodes, cfg.clone()).unwrap();
            packing.run().unwrap();
            black_box(packing.layout().unwrap().placements.len())
        })
    });
}

fn polygon_country(code: String, center: (f64, f64), radius: f64) -> Country {
    let ring: Vec<(f64, f64)> = (0..=64)
        .map(|i| {
            let angle = i as f64 / 64.0 * std::f64::consts::TAU;
            (
                center.0 + radius * angle.cos(),
                center.1 + radius * angle.sin(),
            )
        })
        .collect();
    let bbox = (
        center.0 - radius,
        center.1 - radius,
        center.0 + radius,
        center.1 + radius,
    );
    Country {
        code,
        name: String::new(),
        rings: vec![ring],
        bbox,
        centroid: center,
    }
}

/// Click hit-testing across a world of synthetic polygons.
fn bench_country_hit_test(c: &mut Criterion) {
    let countries: Vec<Country> = (0..200)
        .map(|i| {
            let lon = (i % 20) as f64 * 18.0 - 171.0;
            let lat = (i / 20) as f64 * 16.0 - 72.0;
            polygon_country(format!("C{i:03}"), (lon, lat), 6.0)
        })
        .collect();
    let map = MapRenderer::new(countries, HashMap::new());

    c.bench_function("country_at_400_probes", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for px in 0..20 {
                for py in 0..20 {
                    let lon = px as f64 * 18.0 - 170.0;
                    let lat = py as f64 * 8.0 - 75.0;
                    if map.country_at(black_box(lon), black_box(lat)).is_some() {
                        hits += 1;
                    }
                }
            }
            black_box(hits)
        })
    });
}

criterion_group!(benches, bench_ring_packing, bench_country_hit_test);
criterion_main!(benches);
