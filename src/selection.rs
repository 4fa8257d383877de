use std::collections::HashSet;

use crate::config::EngineConfig;
use crate::graph::{Category, GraphEdge, GraphNode};

const DEFAULT_FILL: &str = "#f7fafc";
const DEFAULT_LABEL: &str = "#1a202c";
const NEUTRAL_BORDER: &str = "#a0aec0";
const HOVER_BORDER: &str = "#718096";
const ACCENT_A: &str = "#3182ce";
const ACCENT_B: &str = "#dd6b20";
const ACTIVE_FILL: &str = "#2b6cb0";
const ACTIVE_BORDER: &str = "#1a365d";
const ACTIVE_LABEL: &str = "#ffffff";

/// At most one selected node at a time.
#[derive(Debug, Default, Clone)]
pub struct Selection {
    current: Option<String>,
}

impl Selection {
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn set(&mut self, id: Option<String>) {
        self.current = id;
    }

    /// Re-selecting the current node clears the selection; anything else
    /// replaces it. Returns the resulting selection.
    pub fn toggle(&mut self, id: &str) -> Option<&str> {
        if self.current.as_deref() == Some(id) {
            self.current = None;
        } else {
            self.current = Some(id.to_string());
        }
        self.current()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStyle {
    pub fill: &'static str,
    pub stroke: &'static str,
    pub label_color: &'static str,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeEmphasis {
    pub opacity: f32,
}

fn category_border(category: Option<Category>) -> &'static str {
    match category {
        Some(Category::A) => ACCENT_A,
        Some(Category::B) => ACCENT_B,
        None => NEUTRAL_BORDER,
    }
}

/// Resolve a node's presentation for the current selection and hover state.
/// `neighborhood` is the selected node plus everything touching it, or `None`
/// when nothing is selected.
pub fn node_style(
    node: &GraphNode,
    selected: Option<&str>,
    neighborhood: Option<&HashSet<String>>,
    hovered: Option<&str>,
    config: &EngineConfig,
) -> NodeStyle {
    if selected == Some(node.id.as_str()) {
        return NodeStyle {
            fill: ACTIVE_FILL,
            stroke: ACTIVE_BORDER,
            label_color: ACTIVE_LABEL,
            opacity: 1.0,
        };
    }

    let in_neighborhood = neighborhood.map_or(true, |set| set.contains(&node.id));
    let opacity = if in_neighborhood {
        1.0
    } else {
        config.dim_node_opacity
    };

    // Hover only ever darkens a border that is still showing default
    // styling; dimmed and active nodes keep theirs.
    let stroke = if hovered == Some(node.id.as_str()) && opacity >= 1.0 {
        HOVER_BORDER
    } else {
        category_border(node.category)
    };

    NodeStyle {
        fill: DEFAULT_FILL,
        stroke,
        label_color: DEFAULT_LABEL,
        opacity,
    }
}

/// Edges touching the selected node stay at full opacity; the rest are
/// dimmed, not hidden, so the surrounding graph stays legible.
pub fn edge_emphasis(
    edge: &GraphEdge,
    selected: Option<&str>,
    config: &EngineConfig,
) -> EdgeEmphasis {
    let opacity = match selected {
        Some(id) if edge.touches(id) => 1.0,
        Some(_) => config.dim_edge_opacity,
        None => 1.0,
    };
    EdgeEmphasis { opacity }
}
