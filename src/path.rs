use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::graph::{GraphModel, Relationship};
use crate::Point;

/// Quadratic-curve geometry for one edge, endpoints already trimmed to the
/// node boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePath {
    pub from: String,
    pub to: String,
    pub start: Point,
    pub end: Point,
    pub control: Point,
    pub relationship: Relationship,
    pub mutual: bool,
}

impl EdgePath {
    pub fn stroke_color(&self) -> &'static str {
        self.relationship.stroke_color()
    }

    pub fn marker_id(&self) -> &'static str {
        self.relationship.marker_id()
    }
}

/// Build the curve set for one tick. Edges with missing, non-finite or
/// overlapping endpoints are suppressed for the tick, never fatal.
pub fn build_edge_paths(
    model: &GraphModel,
    positions: &HashMap<String, Point>,
    config: &EngineConfig,
) -> Vec<EdgePath> {
    let mut paths = Vec::with_capacity(model.edges.len());

    for edge in &model.edges {
        let (Some(&a), Some(&b)) = (positions.get(&edge.from), positions.get(&edge.to)) else {
            continue;
        };
        if !a.is_finite() || !b.is_finite() {
            continue;
        }

        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist < config.node_radius * 2.0 {
            // Overlapping or coincident nodes leave no room for a readable
            // arrow; skip the edge this tick.
            continue;
        }

        let ux = dx / dist;
        let uy = dy / dist;
        let start = Point::new(a.x + ux * config.node_radius, a.y + uy * config.node_radius);
        let end = Point::new(b.x - ux * config.node_radius, b.y - uy * config.node_radius);

        // Each direction bows to the left of its own travel. The reverse
        // direction's normal points the opposite way in absolute space, so a
        // mutual pair comes out as two mirrored arcs without further
        // casework; `slot` records which side each direction landed on.
        let length = start.distance_to(end);
        let mid = Point::new((start.x + end.x) * 0.5, (start.y + end.y) * 0.5);
        let offset = config.curvature * length;
        let control = Point::new(mid.x - uy * offset, mid.y + ux * offset);

        paths.push(EdgePath {
            from: edge.from.clone(),
            to: edge.to.clone(),
            start,
            end,
            control,
            relationship: edge.relationship,
            mutual: edge.mutual,
        });
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeRecord, NodeRecord};

    fn two_node_model(edges: &[(&str, &str, Relationship)]) -> GraphModel {
        let nodes: Vec<NodeRecord> = ["a", "b"]
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
            .map(|(from, to, relationship)| EdgeRecord {
                source_id: from.to_string(),
                target_id: to.to_string(),
                relationship_type: *relationship,
            })
            .collect();
        GraphModel::from_records(&nodes, &edges)
    }

    fn positions(a: Point, b: Point) -> HashMap<String, Point> {
        HashMap::from([("a".to_string(), a), ("b".to_string(), b)])
    }

    #[test]
    fn endpoints_are_trimmed_to_the_node_boundary() {
        let model = two_node_model(&[("a", "b", Relationship::Neutral)]);
        let config = EngineConfig::default();
        let map = positions(Point::new(0.0, 0.0), Point::new(200.0, 0.0));

        let paths = build_edge_paths(&model, &map, &config);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].start, Point::new(config.node_radius, 0.0));
        assert_eq!(paths[0].end, Point::new(200.0 - config.node_radius, 0.0));
    }

    #[test]
    fn mutual_arcs_are_mirrored_and_never_coincide() {
        let model = two_node_model(&[
            ("a", "b", Relationship::Friendly),
            ("b", "a", Relationship::Neutral),
        ]);
        let config = EngineConfig::default();
        let map = positions(Point::new(0.0, 0.0), Point::new(200.0, 0.0));

        let paths = build_edge_paths(&model, &map, &config);
        assert_eq!(paths.len(), 2);
        let forward = paths.iter().find(|p| p.from == "a").unwrap();
        let reverse = paths.iter().find(|p| p.from == "b").unwrap();

        assert!(forward.mutual && reverse.mutual);
        // Opposite sides of the a-b axis, symmetric about it.
        assert!(forward.control.y * reverse.control.y < 0.0);
        assert!((forward.control.y + reverse.control.y).abs() < 1e-3);
        assert!(forward.control.distance_to(reverse.control) > 1.0);
    }

    #[test]
    fn overlapping_nodes_suppress_the_edge() {
        let model = two_node_model(&[("a", "b", Relationship::Neutral)]);
        let config = EngineConfig::default();
        let map = positions(Point::new(0.0, 0.0), Point::new(config.node_radius, 0.0));

        assert!(build_edge_paths(&model, &map, &config).is_empty());
    }

    #[test]
    fn missing_or_non_finite_endpoints_suppress_the_edge() {
        let model = two_node_model(&[("a", "b", Relationship::Neutral)]);
        let config = EngineConfig::default();

        let mut map = positions(Point::new(0.0, 0.0), Point::new(f32::NAN, 0.0));
        assert!(build_edge_paths(&model, &map, &config).is_empty());

        map.remove("b");
        assert!(build_edge_paths(&model, &map, &config).is_empty());
    }
}
