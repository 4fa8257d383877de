use serde::Deserialize;

/// Tunables for the graph engine. Every knob has a default; hosts usually
/// deserialize a partial JSON object over `EngineConfig::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Node circle radius in logical units.
    pub node_radius: f32,
    /// Pairwise inverse-distance repulsion strength.
    pub repulsion: f32,
    /// Target separation for connected nodes.
    pub link_distance: f32,
    /// Spring stiffness pulling edge endpoints toward `link_distance`.
    pub link_strength: f32,
    /// Pull toward the viewport midpoint.
    pub center_strength: f32,
    /// Extra clearance enforced on top of the 2x-radius collision floor.
    pub collision_padding: f32,
    /// Velocity retained per tick; the rest bleeds off so the system settles.
    pub damping: f32,
    /// Fraction of remaining simulation energy lost per tick.
    pub alpha_decay: f32,
    /// Quadratic-curve midpoint offset as a fraction of edge length.
    pub curvature: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Fraction of the viewport left as margin when framing the graph.
    pub fit_padding: f32,
    pub fit_duration_ms: f32,
    /// Maximum per-axis offset applied to freshly anchored nodes.
    pub jitter_radius: f32,
    /// Seed for jitter placement; `None` draws from entropy.
    pub jitter_seed: Option<u64>,
    /// Pointer displacement past which a gesture becomes a drag.
    pub drag_threshold: f32,
    /// Press-and-hold duration after which any movement arms a drag.
    pub drag_delay_ms: f64,
    /// Two background activations within this window request a fit.
    pub double_activate_ms: f64,
    pub dim_node_opacity: f32,
    pub dim_edge_opacity: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_radius: 16.0,
            repulsion: 120.0,
            link_distance: 120.0,
            link_strength: 0.03,
            center_strength: 0.05,
            collision_padding: 4.0,
            damping: 0.6,
            alpha_decay: 0.02,
            curvature: 0.18,
            min_scale: 0.1,
            max_scale: 4.0,
            fit_padding: 0.9,
            fit_duration_ms: 750.0,
            jitter_radius: 25.0,
            jitter_seed: None,
            drag_threshold: 4.0,
            drag_delay_ms: 150.0,
            double_activate_ms: 350.0,
            dim_node_opacity: 0.3,
            dim_edge_opacity: 0.1,
        }
    }
}

impl EngineConfig {
    /// Minimum allowed distance between two node centers.
    pub fn collision_distance(&self) -> f32 {
        self.node_radius * 2.0 + self.collision_padding
    }
}
