use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::graph::GraphModel;
use crate::Point;

const ALPHA_MIN: f32 = 0.001;
const MAX_DISPLACEMENT: f32 = 5.0;
const MIN_DISTANCE_SQ: f32 = 0.01;

/// Per-tick position resolution. Pinned nodes always sit exactly on their
/// pin; only unpinned nodes (rare, transient) are integrated.
#[derive(Debug)]
pub struct Simulation {
    velocities: HashMap<String, (f32, f32)>,
    alpha: f32,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            velocities: HashMap::new(),
            alpha: 1.0,
        }
    }
}

impl Simulation {
    /// Energy reset. Called on node/edge-set changes and on bulk re-layout
    /// requests; a plain single-node drag never needs it.
    pub fn restart(&mut self) {
        self.alpha = 1.0;
    }

    pub fn is_settled(&self) -> bool {
        self.alpha < ALPHA_MIN
    }

    pub fn step(
        &mut self,
        positions: &mut HashMap<String, Point>,
        model: &GraphModel,
        pins: &HashMap<String, Point>,
        center: Point,
        config: &EngineConfig,
        dt: f32,
    ) {
        // A pin is authoritative no matter what the integrator thinks.
        for (id, pin) in pins {
            positions.insert(id.clone(), *pin);
            self.velocities.insert(id.clone(), (0.0, 0.0));
        }
        for node in &model.nodes {
            positions.entry(node.id.clone()).or_insert(center);
        }
        self.velocities.retain(|id, _| model.contains(id));
        positions.retain(|id, _| model.contains(id));

        let free: Vec<String> = model
            .nodes
            .iter()
            .filter(|node| !pins.contains_key(&node.id))
            .map(|node| node.id.clone())
            .collect();
        if free.is_empty() || self.is_settled() {
            self.alpha *= 1.0 - config.alpha_decay;
            return;
        }

        let ids: Vec<&String> = model.nodes.iter().map(|node| &node.id).collect();
        let mut forces: HashMap<&str, (f32, f32)> = ids
            .iter()
            .map(|id| (id.as_str(), (0.0_f32, 0.0_f32)))
            .collect();

        // Pairwise inverse-distance repulsion. Tens of nodes, so the plain
        // double loop beats any spatial index.
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let a = positions[ids[i]];
                let b = positions[ids[j]];
                let dx = b.x - a.x;
                let dy = b.y - a.y;
                let d2 = (dx * dx + dy * dy).max(MIN_DISTANCE_SQ);
                let inv = config.repulsion / d2;
                let fx = dx * inv;
                let fy = dy * inv;
                let fa = forces.get_mut(ids[i].as_str()).unwrap();
                fa.0 -= fx;
                fa.1 -= fy;
                let fb = forces.get_mut(ids[j].as_str()).unwrap();
                fb.0 += fx;
                fb.1 += fy;
            }
        }

        // Spring attraction toward the configured separation.
        for edge in &model.edges {
            let a = positions[&edge.from];
            let b = positions[&edge.to];
            let dx = b.x - a.x;
            let dy = b.y - a.y;
            let dist = (dx * dx + dy * dy).sqrt().max(MIN_DISTANCE_SQ.sqrt());
            let stretch = config.link_strength * (dist - config.link_distance) / dist;
            let fx = stretch * dx;
            let fy = stretch * dy;
            let fa = forces.get_mut(edge.from.as_str()).unwrap();
            fa.0 += fx;
            fa.1 += fy;
            let fb = forces.get_mut(edge.to.as_str()).unwrap();
            fb.0 -= fx;
            fb.1 -= fy;
        }

        // Centering toward the viewport midpoint.
        for id in &ids {
            let at = positions[id.as_str()];
            let f = forces.get_mut(id.as_str()).unwrap();
            f.0 += config.center_strength * (center.x - at.x);
            f.1 += config.center_strength * (center.y - at.y);
        }

        for id in &free {
            let (fx, fy) = forces[id.as_str()];
            let velocity = self.velocities.entry(id.clone()).or_insert((0.0, 0.0));
            velocity.0 = (velocity.0 + fx * dt * self.alpha) * config.damping;
            velocity.1 = (velocity.1 + fy * dt * self.alpha) * config.damping;

            let mut dx = velocity.0 * dt;
            let mut dy = velocity.1 * dt;
            let disp2 = dx * dx + dy * dy;
            if disp2 > MAX_DISPLACEMENT * MAX_DISPLACEMENT {
                let scale = MAX_DISPLACEMENT / disp2.sqrt();
                dx *= scale;
                dy *= scale;
            }
            let at = positions.get_mut(id.as_str()).unwrap();
            at.x += dx;
            at.y += dy;
        }

        self.resolve_collisions(positions, model, pins, config);
        self.alpha *= 1.0 - config.alpha_decay;
    }

    /// Push overlapping pairs apart until centers sit at least the collision
    /// distance apart. Pinned nodes never move; the free side absorbs the
    /// whole correction.
    fn resolve_collisions(
        &self,
        positions: &mut HashMap<String, Point>,
        model: &GraphModel,
        pins: &HashMap<String, Point>,
        config: &EngineConfig,
    ) {
        let min_dist = config.collision_distance();
        let ids: Vec<&String> = model.nodes.iter().map(|node| &node.id).collect();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let a_pinned = pins.contains_key(ids[i]);
                let b_pinned = pins.contains_key(ids[j]);
                if a_pinned && b_pinned {
                    continue;
                }
                let a = positions[ids[i]];
                let b = positions[ids[j]];
                let dx = b.x - a.x;
                let dy = b.y - a.y;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist >= min_dist || dist <= f32::EPSILON {
                    continue;
                }
                let overlap = min_dist - dist;
                let ux = dx / dist;
                let uy = dy / dist;
                if a_pinned {
                    let at = positions.get_mut(ids[j].as_str()).unwrap();
                    at.x += ux * overlap;
                    at.y += uy * overlap;
                } else if b_pinned {
                    let at = positions.get_mut(ids[i].as_str()).unwrap();
                    at.x -= ux * overlap;
                    at.y -= uy * overlap;
                } else {
                    let half = overlap * 0.5;
                    let at = positions.get_mut(ids[i].as_str()).unwrap();
                    at.x -= ux * half;
                    at.y -= uy * half;
                    let at = positions.get_mut(ids[j].as_str()).unwrap();
                    at.x += ux * half;
                    at.y += uy * half;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeRecord, GraphModel, NodeRecord, Relationship};

    fn model(ids: &[&str], edges: &[(&str, &str)]) -> GraphModel {
        let nodes: Vec<NodeRecord> = ids
            .iter()
            .map(|id| NodeRecord {
                id: id.to_string(),
                display_name: id.to_string(),
                persisted_x: None,
                persisted_y: None,
                category: None,
            })
            .collect();
        let edges: Vec<EdgeRecord> = edges
            .iter()
            .map(|(from, to)| EdgeRecord {
                source_id: from.to_string(),
                target_id: to.to_string(),
                relationship_type: Relationship::Neutral,
            })
            .collect();
        GraphModel::from_records(&nodes, &edges)
    }

    #[test]
    fn pinned_nodes_never_move() {
        let model = model(&["a", "b"], &[("a", "b")]);
        let pins = HashMap::from([("a".to_string(), Point::new(10.0, 10.0))]);
        let mut positions = HashMap::from([
            ("a".to_string(), Point::new(500.0, 500.0)),
            ("b".to_string(), Point::new(30.0, 10.0)),
        ]);
        let mut simulation = Simulation::default();
        let config = EngineConfig::default();

        for _ in 0..50 {
            simulation.step(
                &mut positions,
                &model,
                &pins,
                Point::new(0.0, 0.0),
                &config,
                1.0,
            );
            assert_eq!(positions["a"], Point::new(10.0, 10.0));
        }
    }

    #[test]
    fn unpinned_pair_respects_the_collision_floor() {
        let model = model(&["a", "b"], &[]);
        let pins = HashMap::new();
        let mut positions = HashMap::from([
            ("a".to_string(), Point::new(100.0, 100.0)),
            ("b".to_string(), Point::new(101.0, 100.0)),
        ]);
        let mut simulation = Simulation::default();
        let config = EngineConfig::default();

        for _ in 0..10 {
            simulation.step(
                &mut positions,
                &model,
                &pins,
                Point::new(100.0, 100.0),
                &config,
                1.0,
            );
        }
        let dist = positions["a"].distance_to(positions["b"]);
        assert!(
            dist >= config.collision_distance() - 0.5,
            "centers settled {dist} apart, floor is {}",
            config.collision_distance()
        );
    }

    #[test]
    fn settled_simulation_restarts_on_demand() {
        let mut simulation = Simulation::default();
        let config = EngineConfig::default();
        let model = model(&["a"], &[]);
        let mut positions = HashMap::from([("a".to_string(), Point::new(0.0, 0.0))]);

        for _ in 0..600 {
            simulation.step(
                &mut positions,
                &model,
                &HashMap::new(),
                Point::new(0.0, 0.0),
                &config,
                1.0,
            );
        }
        assert!(simulation.is_settled());

        simulation.restart();
        assert!(!simulation.is_settled());
    }
}
