use anyhow::{bail, ensure, Result};
use glam::DVec2;
use std::collections::HashSet;
use std::f64::consts::TAU;

use super::PackConfig;

/// Where a packing run currently stands. `Converged` and `Exhausted`
/// are both terminal and both produce a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Converged,
    Exhausted,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Phase::Running)
    }
}

/// One node of the ring under simulation. Nodes live in a single owned
/// arena inside [`Packing`]; the implicit link to the origin is the only
/// link topology there is.
#[derive(Debug, Clone)]
pub struct PackNode {
    pub id: String,
    pub target: DVec2,
    pub pos: DVec2,
    pub vel: DVec2,
    pub radius: f64,
    pub pinned: bool,
}

impl PackNode {
    pub fn new(id: impl Into<String>, target: DVec2, radius: f64, pinned: bool) -> Self {
        Self {
            id: id.into(),
            target,
            pos: target,
            vel: DVec2::ZERO,
            radius,
            pinned,
        }
    }
}

/// Final position and display radius of one bubble.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub id: String,
    pub pos: DVec2,
    pub radius: f64,
}

/// The finished layout: origin plus one placement per node.
#[derive(Debug, Clone, PartialEq)]
pub struct RingLayout {
    pub origin: DVec2,
    pub placements: Vec<Placement>,
}

/// A single in-flight packing run.
///
/// Drive it with [`step`](Packing::step) (one call per animation frame)
/// or [`run`](Packing::run) (headless, to completion). Dropping the
/// value cancels the run; a cancelled run never yields a layout, so a
/// successor can never race a stale result.
pub struct Packing {
    origin: DVec2,
    nodes: Vec<PackNode>,
    cfg: PackConfig,
    energy: f64,
    steps: u32,
    phase: Phase,
    finished: Option<RingLayout>,
}

impl Packing {
    /// Validates the inputs and places every node at its unconstrained
    /// target with zero velocity. An empty node set is not an error: the
    /// run starts terminal with an origin-only layout.
    pub fn new(origin: DVec2, nodes: Vec<PackNode>, cfg: PackConfig) -> Result<Self> {
        ensure!(origin.is_finite(), "origin position is not finite");

        let mut seen = HashSet::new();
        for node in &nodes {
            ensure!(
                node.target.is_finite(),
                "target position for {:?} is not finite",
                node.id
            );
            ensure!(
                node.radius.is_finite() && node.radius > 0.0,
                "radius for {:?} must be positive",
                node.id
            );
            ensure!(
                node.radius <= cfg.max_radius,
                "radius for {:?} exceeds the configured maximum",
                node.id
            );
            ensure!(seen.insert(node.id.clone()), "duplicate node id {:?}", node.id);
        }

        let mut packing = Self {
            origin,
            nodes,
            energy: cfg.initial_energy,
            cfg,
            steps: 0,
            phase: Phase::Running,
            finished: None,
        };
        if packing.nodes.is_empty() {
            packing.finish(Phase::Converged);
        }
        Ok(packing)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Nodes in their current (possibly mid-run) positions. Exposed for
    /// animation only; the correctness contract is the final layout.
    pub fn nodes(&self) -> &[PackNode] {
        &self.nodes
    }

    /// The finished layout, once the run is terminal.
    pub fn layout(&self) -> Option<&RingLayout> {
        self.finished.as_ref()
    }

    /// Advance the simulation by exactly one step.
    ///
    /// Per step: the link force corrects each free node's distance to
    /// the origin toward the rest-length, collisions push overlapping
    /// pairs apart for a fixed number of passes, then velocities are
    /// damped and integrated. The driving energy decays geometrically,
    /// so the step count is bounded regardless of convergence.
    pub fn step(&mut self) -> Result<Phase> {
        if self.phase.is_terminal() {
            return Ok(self.phase);
        }

        self.apply_link_force();
        for _ in 0..self.cfg.collide_passes {
            self.apply_collisions();
        }

        let mut kinetic = 0.0;
        for node in &mut self.nodes {
            if node.pinned {
                node.vel = DVec2::ZERO;
                node.pos = node.target;
                continue;
            }
            node.vel *= self.cfg.velocity_retain;
            node.pos += node.vel;
            kinetic += node.vel.length_squared();
        }

        if self.nodes.iter().any(|n| !n.pos.is_finite()) {
            self.phase = Phase::Exhausted;
            bail!("packing diverged to a non-finite position at step {}", self.steps);
        }

        self.steps += 1;
        self.energy *= 1.0 - self.cfg.energy_decay;

        if kinetic < self.cfg.ke_threshold {
            self.finish(Phase::Converged);
        } else if self.energy < self.cfg.min_energy {
            self.finish(Phase::Exhausted);
        }
        Ok(self.phase)
    }

    /// Drive the run to a terminal phase; the layout is then available
    /// from [`layout`](Packing::layout).
    pub fn run(&mut self) -> Result<Phase> {
        while !self.phase.is_terminal() {
            self.step()?;
        }
        Ok(self.phase)
    }

    /// Spring each free node toward the rest-length from the origin:
    /// direction preserved, distance corrected, scaled by the current
    /// driving energy.
    fn apply_link_force(&mut self) {
        let rest = self.cfg.rest_length;
        let alpha = self.energy;
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if node.pinned {
                continue;
            }
            let delta = (node.pos + node.vel) - self.origin;
            let dist = delta.length();
            let (dir, dist) = if dist > f64::EPSILON {
                (delta / dist, dist)
            } else {
                // Coincident with the origin: pick a fixed direction from
                // the node index so repeated runs stay identical.
                (spread_direction(index, 0), 0.0)
            };
            node.vel -= dir * ((dist - rest) * alpha);
        }
    }

    /// One pass of pairwise overlap resolution. Each overlapping pair is
    /// pushed apart along the line between centers; pinned nodes act as
    /// immovable obstacles and transfer the whole correction.
    fn apply_collisions(&mut self) {
        for i in 0..self.nodes.len() {
            for j in (i + 1)..self.nodes.len() {
                let (a, b) = {
                    let (head, tail) = self.nodes.split_at_mut(j);
                    (&mut head[i], &mut tail[0])
                };
                if a.pinned && b.pinned {
                    continue;
                }

                let delta = (a.pos + a.vel) - (b.pos + b.vel);
                let dist = delta.length();
                let min_dist = a.radius + b.radius;
                if dist >= min_dist {
                    continue;
                }

                let dir = if dist > f64::EPSILON {
                    delta / dist
                } else {
                    spread_direction(i, j)
                };
                let push = dir * (min_dist - dist);
                match (a.pinned, b.pinned) {
                    (false, false) => {
                        a.vel += push * 0.5;
                        b.vel -= push * 0.5;
                    }
                    (false, true) => a.vel += push,
                    (true, false) => b.vel -= push,
                    (true, true) => unreachable!(),
                }
            }
        }
    }

    fn finish(&mut self, phase: Phase) {
        self.phase = phase;
        self.finished = Some(RingLayout {
            origin: self.origin,
            placements: self
                .nodes
                .iter()
                .map(|n| Placement {
                    id: n.id.clone(),
                    pos: n.pos,
                    radius: n.radius,
                })
                .collect(),
        });
    }
}

/// Deterministic stand-in direction for coincident points: golden-angle
/// spread keyed on node indices, so no two pairs share a direction.
fn spread_direction(i: usize, j: usize) -> DVec2 {
    let angle = (i as f64 * 0.618_034 + j as f64 * 0.414_214) * TAU;
    DVec2::new(angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_node_ring() -> Packing {
        let cfg = PackConfig::default();
        let nodes = vec![
            PackNode::new("AAA", DVec2::new(10.0, 0.0), 3.0, false),
            PackNode::new("BBB", DVec2::new(10.0, 1.0), 3.0, false),
            PackNode::new("CCC", DVec2::new(10.0, 2.0), 3.0, false),
        ];
        let cfg = PackConfig {
            max_radius: 3.0,
            ..cfg
        };
        Packing::new(DVec2::ZERO, nodes, cfg).unwrap()
    }

    #[test]
    fn example_scenario_spreads_and_stays_on_ring() {
        let mut packing = three_node_ring();
        assert_eq!(packing.run().unwrap(), Phase::Converged);

        let layout = packing.layout().unwrap();
        let p = &layout.placements;
        assert_eq!(p.len(), 3);
        for a in 0..p.len() {
            // Within tolerance of the rest-length from the origin
            let to_origin = p[a].pos.length();
            assert!(
                (to_origin - 10.0).abs() < 1.0,
                "node {} ended {} from origin",
                p[a].id,
                to_origin
            );
            for b in (a + 1)..p.len() {
                let gap = (p[a].pos - p[b].pos).length();
                assert!(
                    gap >= 6.0 - 0.25,
                    "{} and {} ended {} apart",
                    p[a].id,
                    p[b].id,
                    gap
                );
            }
        }
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let mut first = three_node_ring();
        let mut second = three_node_ring();

        loop {
            let a = first.step().unwrap();
            let b = second.step().unwrap();
            assert_eq!(a, b);
            for (x, y) in first.nodes().iter().zip(second.nodes()) {
                // Bit-for-bit, not approximately
                assert_eq!(x.pos, y.pos);
                assert_eq!(x.vel, y.vel);
            }
            if a.is_terminal() {
                break;
            }
        }
        assert_eq!(first.layout(), second.layout());
    }

    #[test]
    fn pinned_node_never_moves() {
        let cfg = PackConfig::default();
        let home = DVec2::new(5.0, 5.0);
        let nodes = vec![
            PackNode::new("SELF", home, 2.0, true),
            // Directly on top of the pinned node: maximum provocation
            PackNode::new("AAA", home, 2.0, false),
            PackNode::new("BBB", DVec2::new(6.0, 5.0), 2.0, false),
        ];
        let mut packing = Packing::new(DVec2::new(5.0, 5.0), nodes, cfg).unwrap();

        while !packing.step().unwrap().is_terminal() {
            assert_eq!(packing.nodes()[0].pos, home);
        }
        let layout = packing.layout().unwrap();
        assert_eq!(layout.placements[0].pos, home);
    }

    #[test]
    fn converged_runs_resolve_overlaps() {
        let mut packing = three_node_ring();
        let phase = packing.run().unwrap();
        if phase == Phase::Converged {
            let p = &packing.layout().unwrap().placements;
            for a in 0..p.len() {
                for b in (a + 1)..p.len() {
                    let gap = (p[a].pos - p[b].pos).length();
                    assert!(gap >= p[a].radius + p[b].radius - 0.25);
                }
            }
        }
    }

    #[test]
    fn terminates_within_the_energy_budget() {
        // Radii too large to ever pack on the ring: the run must still
        // stop, as exhausted, within the schedule's step budget.
        let cfg = PackConfig {
            max_radius: 40.0,
            ..PackConfig::default()
        };
        let budget = cfg.step_budget();
        let nodes = (0..8)
            .map(|i| {
                PackNode::new(
                    format!("N{i}"),
                    DVec2::new(10.0, i as f64 * 0.1),
                    40.0,
                    false,
                )
            })
            .collect();
        let mut packing = Packing::new(DVec2::ZERO, nodes, cfg).unwrap();
        packing.run().unwrap();

        assert_eq!(packing.phase(), Phase::Exhausted);
        assert!(packing.steps() <= budget);
    }

    #[test]
    fn link_distance_bounded_on_convergence() {
        let cfg = PackConfig::default();
        let nodes = vec![
            PackNode::new("AAA", DVec2::new(10.0, 0.0), 1.5, false),
            PackNode::new("BBB", DVec2::new(0.0, 10.0), 1.5, false),
        ];
        let mut packing = Packing::new(DVec2::ZERO, nodes, cfg).unwrap();
        let phase = packing.run().unwrap();

        if phase == Phase::Converged {
            for p in &packing.layout().unwrap().placements {
                assert!((p.pos.length() - 10.0).abs() < 0.5);
            }
        }
    }

    #[test]
    fn empty_node_set_is_an_immediate_origin_only_layout() {
        let origin = DVec2::new(3.0, 7.0);
        let packing = Packing::new(origin, Vec::new(), PackConfig::default()).unwrap();
        assert!(packing.phase().is_terminal());
        let layout = packing.layout().unwrap();
        assert_eq!(layout.origin, origin);
        assert!(layout.placements.is_empty());
    }

    #[test]
    fn rejects_corrupt_input_before_starting() {
        let bad_target = vec![PackNode::new(
            "AAA",
            DVec2::new(f64::NAN, 0.0),
            2.0,
            false,
        )];
        assert!(Packing::new(DVec2::ZERO, bad_target, PackConfig::default()).is_err());

        let bad_radius = vec![PackNode::new("AAA", DVec2::ZERO, 0.0, false)];
        assert!(Packing::new(DVec2::ZERO, bad_radius, PackConfig::default()).is_err());

        let dupes = vec![
            PackNode::new("AAA", DVec2::ZERO, 1.0, false),
            PackNode::new("AAA", DVec2::new(1.0, 0.0), 1.0, false),
        ];
        assert!(Packing::new(DVec2::ZERO, dupes, PackConfig::default()).is_err());

        assert!(Packing::new(DVec2::new(f64::INFINITY, 0.0), Vec::new(), PackConfig::default())
            .is_err());
    }

    #[test]
    fn stable_input_converges_on_the_first_step() {
        // Pre-spread targets with no overlap: nothing to do.
        let cfg = PackConfig::default();
        let nodes = vec![
            PackNode::new("AAA", DVec2::new(10.0, 0.0), 1.0, false),
            PackNode::new("BBB", DVec2::new(-10.0, 0.0), 1.0, false),
        ];
        let mut packing = Packing::new(DVec2::ZERO, nodes, cfg).unwrap();
        assert_eq!(packing.step().unwrap(), Phase::Converged);
        assert_eq!(packing.steps(), 1);
    }
}
