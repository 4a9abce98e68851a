// Radial packing layout for the destination ring.
//
// Goals:
// - Deterministic: no randomness, no wall-clock, only step count
// - Headless: no dependency on the renderer or terminal
// - Explicit configuration: no captured module state, so independent
//   runs (and tests) cannot interfere with each other
//
// Submodules:
// - ring: destination selection, radius scale, target positions
// - sim: the step-driven packing simulation

use glam::DVec2;

mod ring;
mod sim;

pub use ring::{build_ring, top_destinations, RadiusScale};
pub use sim::{PackNode, Packing, Phase, Placement, RingLayout};

/// Configuration for one ring layout run.
///
/// Defaults mirror the tuning the incident map ships with: bubbles are
/// truncated to `bubble_dist` from the origin along their true bearing,
/// then relaxed onto a ring of radius `rest_length`.
#[derive(Debug, Clone)]
pub struct PackConfig {
    /// Target distance between the origin and every destination bubble.
    pub rest_length: f64,
    /// Distance the unconstrained target positions are truncated to.
    pub bubble_dist: f64,
    /// Smallest bubble radius.
    pub min_radius: f64,
    /// Largest bubble radius; also the collision clamp.
    pub max_radius: f64,
    /// How many top destinations to keep (the self entry is extra).
    pub top_n: usize,
    /// Driving energy at step zero.
    pub initial_energy: f64,
    /// Geometric per-step energy decay rate.
    pub energy_decay: f64,
    /// Energy threshold below which the run is exhausted.
    pub min_energy: f64,
    /// Fraction of velocity retained after each step (< 1).
    pub velocity_retain: f64,
    /// Pairwise collision resolution passes per step.
    pub collide_passes: u32,
    /// Total kinetic energy below which the run has converged.
    pub ke_threshold: f64,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            rest_length: 10.0,
            bubble_dist: 10.0,
            min_radius: 1.0,
            max_radius: 4.0,
            top_n: 10,
            initial_energy: 1.0,
            energy_decay: 0.1,
            min_energy: 0.01,
            velocity_retain: 0.5,
            collide_passes: 2,
            ke_threshold: 1e-4,
        }
    }
}

impl PackConfig {
    /// Upper bound on step count implied by the energy schedule.
    pub fn step_budget(&self) -> u32 {
        let ratio = self.min_energy / self.initial_energy;
        (ratio.ln() / (1.0 - self.energy_decay).ln()).ceil() as u32
    }
}

/// Point on the ray origin→dest at `limit` from the origin.
/// A zero-length direction (origin == dest) passes through unchanged.
pub fn limit_distance(origin: DVec2, dest: DVec2, limit: f64) -> DVec2 {
    let delta = dest - origin;
    let dist = delta.length();
    if dist == 0.0 {
        return dest;
    }
    origin + delta * (limit / dist)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_distance_length_and_collinearity() {
        let o = DVec2::new(2.0, -1.0);
        let d = DVec2::new(14.0, 4.0);
        let p = limit_distance(o, d, 6.5);

        assert!(((p - o).length() - 6.5).abs() < 1e-12);
        // Collinear: cross product of (p-o) and (d-o) vanishes
        let a = p - o;
        let b = d - o;
        assert!((a.x * b.y - a.y * b.x).abs() < 1e-9);
        // Same side of the origin as the destination
        assert!(a.dot(b) > 0.0);
    }

    #[test]
    fn limit_distance_degenerate_point() {
        let o = DVec2::new(3.0, 3.0);
        assert_eq!(limit_distance(o, o, 10.0), o);
    }

    #[test]
    fn limit_distance_shortens_and_extends() {
        let o = DVec2::ZERO;
        let d = DVec2::new(100.0, 0.0);
        assert_eq!(limit_distance(o, d, 10.0), DVec2::new(10.0, 0.0));

        let near = DVec2::new(1.0, 0.0);
        assert_eq!(limit_distance(o, near, 10.0), DVec2::new(10.0, 0.0));
    }

    #[test]
    fn step_budget_matches_schedule() {
        let cfg = PackConfig::default();
        let budget = cfg.step_budget();

        // Energy after `budget` steps must be under the threshold,
        // and must not be under it one step earlier.
        let after = cfg.initial_energy * (1.0 - cfg.energy_decay).powi(budget as i32);
        let before = cfg.initial_energy * (1.0 - cfg.energy_decay).powi(budget as i32 - 1);
        assert!(after < cfg.min_energy);
        assert!(before >= cfg.min_energy);
    }
}
