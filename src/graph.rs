use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::Point;

/// Two-valued accent cohort used for default node styling. Absent means the
/// neutral accent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Friendly,
    Neutral,
    Awkward,
    /// Anything the feed sends that we do not recognize. Styled like
    /// `Neutral` rather than rejected.
    #[serde(other)]
    Unknown,
}

impl Relationship {
    pub fn stroke_color(self) -> &'static str {
        match self {
            Relationship::Friendly => "#38a169",
            Relationship::Awkward => "#e53e3e",
            Relationship::Neutral | Relationship::Unknown => "#718096",
        }
    }

    pub fn marker_id(self) -> &'static str {
        match self {
            Relationship::Friendly => "arrow-friendly",
            Relationship::Awkward => "arrow-awkward",
            Relationship::Neutral | Relationship::Unknown => "arrow-neutral",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Relationship::Friendly => "friendly",
            Relationship::Neutral => "neutral",
            Relationship::Awkward => "awkward",
            Relationship::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persisted_x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persisted_y: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    pub source_id: String,
    pub target_id: String,
    pub relationship_type: Relationship,
}

/// Wholesale input payload: the full node and edge sets as supplied by the
/// surrounding application on every refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl Roster {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| Error::invalid_roster(err.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub persisted: Option<Point>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub relationship: Relationship,
    /// The reverse edge is present in the same set.
    pub mutual: bool,
    /// Which of the two mirrored arc sides a mutual edge renders on.
    pub slot: u8,
}

impl GraphEdge {
    pub fn touches(&self, id: &str) -> bool {
        self.from == id || self.to == id
    }
}

/// Normalized graph: deduplicated edges with mutual pairs resolved, dangling
/// endpoints dropped.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    index: HashMap<String, usize>,
}

impl GraphModel {
    pub fn from_records(records: &[NodeRecord], edge_records: &[EdgeRecord]) -> Self {
        let mut nodes = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());

        for record in records {
            if index.contains_key(&record.id) {
                tracing::debug!(node = %record.id, "duplicate node id in feed, keeping first");
                continue;
            }
            let persisted = match (record.persisted_x, record.persisted_y) {
                (Some(x), Some(y)) => Some(Point::new(x, y)),
                _ => None,
            };
            index.insert(record.id.clone(), nodes.len());
            nodes.push(GraphNode {
                id: record.id.clone(),
                label: record.display_name.clone(),
                persisted,
                category: record.category,
            });
        }

        // Deduplicate per ordered pair before mutual pairing; first
        // occurrence wins. Dangling endpoints are dropped outright.
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut directed: Vec<(String, String, Relationship)> = Vec::new();
        for record in edge_records {
            if !index.contains_key(&record.source_id) || !index.contains_key(&record.target_id) {
                tracing::debug!(
                    from = %record.source_id,
                    to = %record.target_id,
                    "edge references a node outside the current set, dropping"
                );
                continue;
            }
            let key = (record.source_id.clone(), record.target_id.clone());
            if !seen.insert(key) {
                continue;
            }
            directed.push((
                record.source_id.clone(),
                record.target_id.clone(),
                record.relationship_type,
            ));
        }

        let pairs: HashSet<(String, String)> = directed
            .iter()
            .map(|(from, to, _)| (from.clone(), to.clone()))
            .collect();

        let edges = directed
            .into_iter()
            .map(|(from, to, relationship)| {
                let mutual = from != to && pairs.contains(&(to.clone(), from.clone()));
                // Slot falls out of the canonical id ordering so it is stable
                // no matter how the feed orders its edge list.
                let slot = if mutual && from > to { 1 } else { 0 };
                GraphEdge {
                    from,
                    to,
                    relationship,
                    mutual,
                    slot,
                }
            })
            .collect();

        Self {
            nodes,
            edges,
            index,
        }
    }

    pub fn from_roster(roster: &Roster) -> Self {
        Self::from_records(&roster.nodes, &roster.edges)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&at| &self.nodes[at])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node plus every source or target of an edge touching it.
    pub fn neighborhood(&self, id: &str) -> HashSet<String> {
        let mut out = HashSet::new();
        if !self.contains(id) {
            return out;
        }
        out.insert(id.to_string());
        for edge in &self.edges {
            if edge.from == id {
                out.insert(edge.to.clone());
            } else if edge.to == id {
                out.insert(edge.from.clone());
            }
        }
        out
    }
}
