use anyhow::{ensure, Context, Result};
use glam::DVec2;

use super::sim::{PackNode, Packing};
use super::{limit_distance, PackConfig};

/// Pick the destinations shown for an origin country.
///
/// Sorts ascending by count (stable, so ties keep their first-seen
/// order), drops the self entry while remembering its count, keeps the
/// `top_n` highest, then re-appends the self entry last. An origin with
/// no outgoing records yields the self entry alone, with weight zero.
pub fn top_destinations(
    origin: &str,
    counts: &[(String, u64)],
    top_n: usize,
) -> Vec<(String, u64)> {
    let mut list = counts.to_vec();
    list.sort_by_key(|&(_, count)| count);

    let self_weight = list
        .iter()
        .position(|(code, _)| code == origin)
        .map(|i| list.remove(i).1)
        .unwrap_or(0);

    if list.len() > top_n {
        list.drain(..list.len() - top_n);
    }
    list.push((origin.to_string(), self_weight));
    list
}

/// Clamped linear scale from incident count to bubble radius.
///
/// The domain is the extent of the non-self weights; output is clamped
/// to `[min_radius, max_radius]` on both sides, which keeps every
/// radius positive and bounds the collision exclusion zone. A collapsed
/// domain (all weights equal) maps everything to the range midpoint.
#[derive(Debug, Clone, Copy)]
pub struct RadiusScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl RadiusScale {
    pub fn from_weights<I>(weights: I, min_radius: f64, max_radius: f64) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for w in weights {
            lo = lo.min(w as f64);
            hi = hi.max(w as f64);
        }
        if !lo.is_finite() || !hi.is_finite() {
            // Empty extent: everything lands on the midpoint.
            (lo, hi) = (0.0, 0.0);
        }
        Self {
            domain: (lo, hi),
            range: (min_radius, max_radius),
        }
    }

    pub fn radius(&self, weight: u64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        let t = (weight as f64 - d0) / (d1 - d0);
        (r0 + t * (r1 - r0)).clamp(r0, r1)
    }
}

/// Prepare and start a packing run for one origin country.
///
/// `centroid` resolves a country code to (lon, lat); `project` is the
/// planar projection both the targets and the final layout live in.
/// Every destination starts at its true geographic bearing from the
/// origin, truncated to `bubble_dist`; the origin's own entry is pinned
/// at the origin. Missing centroids and non-finite projections are
/// rejected before the simulation starts.
pub fn build_ring(
    origin: &str,
    destinations: &[(String, u64)],
    centroid: impl Fn(&str) -> Option<(f64, f64)>,
    project: impl Fn(f64, f64) -> DVec2,
    cfg: &PackConfig,
) -> Result<Packing> {
    let (origin_lon, origin_lat) =
        centroid(origin).with_context(|| format!("no centroid for origin {origin:?}"))?;
    let origin_pos = project(origin_lon, origin_lat);
    ensure!(
        origin_pos.is_finite(),
        "origin {origin:?} projects to a non-finite position"
    );

    let scale = RadiusScale::from_weights(
        destinations
            .iter()
            .filter(|(code, _)| code != origin)
            .map(|&(_, w)| w),
        cfg.min_radius,
        cfg.max_radius,
    );

    let mut nodes = Vec::with_capacity(destinations.len());
    for (code, weight) in destinations {
        let (lon, lat) =
            centroid(code).with_context(|| format!("no centroid for destination {code:?}"))?;
        let projected = project(lon, lat);
        ensure!(
            projected.is_finite(),
            "destination {code:?} projects to a non-finite position"
        );
        let target = limit_distance(origin_pos, projected, cfg.bubble_dist);
        nodes.push(PackNode::new(
            code.clone(),
            target,
            scale.radius(*weight),
            code == origin,
        ));
    }

    Packing::new(origin_pos, nodes, cfg.clone())
}
