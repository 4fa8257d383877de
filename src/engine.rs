use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::graph::{EdgeRecord, GraphModel, GraphNode, NodeRecord};
use crate::path::{EdgePath, build_edge_paths};
use crate::placement::{DragEffect, DragMachine, Placement, PointerEvent};
use crate::selection::{NodeStyle, Selection, edge_emphasis, node_style};
use crate::simulation::Simulation;
use crate::store::PersistenceGateway;
use crate::viewport::{FitAnimation, ViewTransform, fit_transform};
use crate::Point;

type SelectCallback = Box<dyn Fn(Option<&GraphNode>) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct NodeSprite {
    pub id: String,
    pub label: String,
    pub at: Point,
    pub radius: f32,
    pub style: NodeStyle,
}

#[derive(Debug, Clone)]
pub struct EdgeSprite {
    pub path: EdgePath,
    pub opacity: f32,
}

/// One tick's worth of renderable state, in logical coordinates.
#[derive(Debug, Clone)]
pub struct Frame {
    pub nodes: Vec<NodeSprite>,
    pub edges: Vec<EdgeSprite>,
    pub transform: ViewTransform,
    pub width: f32,
    pub height: f32,
}

/// The relationship-graph engine: owns the normalized model, the pin map,
/// the simulation, the viewport transform and the selection, and turns them
/// into a [`Frame`] per tick.
pub struct Sociogram {
    config: EngineConfig,
    viewport: (f32, f32),
    model: GraphModel,
    placement: Placement,
    drag: DragMachine,
    simulation: Simulation,
    positions: HashMap<String, Point>,
    transform: ViewTransform,
    fit: Option<FitAnimation>,
    selection: Selection,
    hovered: Option<String>,
    gateway: Option<PersistenceGateway>,
    on_select: Option<SelectCallback>,
    fitted_once: bool,
}

impl Sociogram {
    pub fn new(config: EngineConfig, width: f32, height: f32) -> Self {
        let placement = Placement::new(config.jitter_seed);
        Self {
            config,
            viewport: (width, height),
            model: GraphModel::default(),
            placement,
            drag: DragMachine::default(),
            simulation: Simulation::default(),
            positions: HashMap::new(),
            transform: ViewTransform::default(),
            fit: None,
            selection: Selection::default(),
            hovered: None,
            gateway: None,
            on_select: None,
            fitted_once: false,
        }
    }

    /// Route drag-end coordinate saves through this gateway from now on.
    pub fn attach_gateway(&mut self, gateway: PersistenceGateway) {
        self.gateway = Some(gateway);
    }

    pub fn on_select(&mut self, callback: impl Fn(Option<&GraphNode>) + Send + Sync + 'static) {
        self.on_select = Some(Box::new(callback));
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = (width, height);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn selected(&self) -> Option<&str> {
        self.selection.current()
    }

    pub fn position(&self, id: &str) -> Option<Point> {
        self.positions.get(id).copied()
    }

    pub fn pin(&self, id: &str) -> Option<Point> {
        self.placement.pin(id)
    }

    /// Wholesale node/edge refresh. Pins and selection survive by id; the
    /// first refresh that yields any node also frames the viewport.
    pub fn refresh(&mut self, nodes: &[NodeRecord], edges: &[EdgeRecord]) {
        self.model = GraphModel::from_records(nodes, edges);

        let selection_stale = self
            .selection
            .current()
            .is_some_and(|id| !self.model.contains(id));
        if selection_stale {
            self.selection.clear();
        }
        let hover_stale = self
            .hovered
            .as_deref()
            .is_some_and(|id| !self.model.contains(id));
        if hover_stale {
            self.hovered = None;
        }

        let anchor = self.world_center();
        self.placement
            .reconcile(&self.model, anchor, self.config.jitter_radius);

        self.positions.retain(|id, _| self.model.contains(id));
        for (id, pin) in self.placement.pins() {
            self.positions.insert(id.clone(), *pin);
        }

        self.simulation.restart();

        if !self.fitted_once && !self.model.is_empty() && self.request_fit() {
            self.fitted_once = true;
        }
    }

    /// Advance the simulation and any running fit animation by `dt_ms`.
    pub fn tick(&mut self, dt_ms: f32) {
        let dt = (dt_ms / 16.0).clamp(0.1, 3.0);
        let center = self.world_center();
        self.simulation.step(
            &mut self.positions,
            &self.model,
            self.placement.pins(),
            center,
            &self.config,
            dt,
        );

        if let Some(animation) = &mut self.fit {
            self.transform = animation.advance(dt_ms);
            if animation.finished() {
                self.fit = None;
            }
        }
    }

    pub fn pointer_down(&mut self, at: Point, time_ms: f64) {
        let target = self.hit_test(at);
        let effects = self.drag.on_event(
            PointerEvent::Down {
                target,
                at,
                time_ms,
            },
            &self.config,
            |_| false,
        );
        self.apply_effects(effects);
    }

    pub fn pointer_move(&mut self, at: Point, time_ms: f64) {
        let placement = &self.placement;
        let effects = self.drag.on_event(
            PointerEvent::Move { at, time_ms },
            &self.config,
            |id| placement.is_unseen(id),
        );
        let dragging = !effects.is_empty();
        self.apply_effects(effects);
        if !dragging {
            self.hovered = self.hit_test(at);
        }
    }

    pub fn pointer_up(&mut self, at: Point, time_ms: f64) {
        let effects = self.drag.on_event(
            PointerEvent::Up { at, time_ms },
            &self.config,
            |_| false,
        );
        self.apply_effects(effects);
    }

    /// Programmatic selection (the click callback is not fired).
    pub fn set_selection(&mut self, id: Option<String>) {
        match id {
            Some(id) if self.model.contains(&id) => self.selection.set(Some(id)),
            _ => self.selection.clear(),
        }
    }

    /// Pin a node at an externally chosen coordinate and persist it, exactly
    /// as if a drag had ended there. Returns false for unknown nodes.
    pub fn commit_manual_position(&mut self, id: &str, at: Point) -> bool {
        if !self.model.contains(id) {
            return false;
        }
        self.placement.commit(id, at);
        self.positions.insert(id.to_string(), at);
        if let Some(gateway) = &self.gateway {
            gateway.persist(id, at.x, at.y);
        }
        true
    }

    /// Start an animated fit-to-bounds. No-op (returns false) when nothing
    /// has a finite position or the bounding box has no area.
    pub fn request_fit(&mut self) -> bool {
        let target = fit_transform(
            self.model
                .nodes
                .iter()
                .filter_map(|node| self.positions.get(&node.id).copied()),
            self.config.node_radius,
            self.viewport,
            &self.config,
        );
        match target {
            Some(target) => {
                self.fit = Some(FitAnimation::new(
                    self.transform,
                    target,
                    self.config.fit_duration_ms,
                ));
                true
            }
            None => false,
        }
    }

    /// Jump straight to the fit target, skipping the animation. Used by
    /// one-shot renders.
    pub fn fit_now(&mut self) -> bool {
        if self.request_fit() {
            if let Some(animation) = self.fit.take() {
                self.transform = animation.target();
            }
            true
        } else {
            false
        }
    }

    /// Bulk re-layout: release every pin and reheat the simulation so the
    /// physics can arrange the whole graph again.
    pub fn relayout(&mut self) {
        self.placement.release_all();
        self.simulation.restart();
    }

    pub fn zoom_at(&mut self, cursor: Point, factor: f32) {
        self.fit = None;
        self.transform.zoom_at(cursor, factor, &self.config);
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.fit = None;
        self.transform.pan_by(dx, dy);
    }

    pub fn frame(&self) -> Frame {
        let neighborhood = self
            .selection
            .current()
            .map(|id| self.model.neighborhood(id));

        let nodes = self
            .model
            .nodes
            .iter()
            .filter_map(|node| {
                let at = self.positions.get(&node.id).copied()?;
                let style = node_style(
                    node,
                    self.selection.current(),
                    neighborhood.as_ref(),
                    self.hovered.as_deref(),
                    &self.config,
                );
                Some(NodeSprite {
                    id: node.id.clone(),
                    label: node.label.clone(),
                    at,
                    radius: self.config.node_radius,
                    style,
                })
            })
            .collect();

        let edges = build_edge_paths(&self.model, &self.positions, &self.config)
            .into_iter()
            .map(|path| {
                let opacity = self
                    .model
                    .edges
                    .iter()
                    .find(|edge| edge.from == path.from && edge.to == path.to)
                    .map(|edge| edge_emphasis(edge, self.selection.current(), &self.config).opacity)
                    .unwrap_or(1.0);
                EdgeSprite { path, opacity }
            })
            .collect();

        Frame {
            nodes,
            edges,
            transform: self.transform,
            width: self.viewport.0,
            height: self.viewport.1,
        }
    }

    fn world_center(&self) -> Point {
        self.transform
            .to_world(Point::new(self.viewport.0 * 0.5, self.viewport.1 * 0.5))
    }

    fn hit_test(&self, at: Point) -> Option<String> {
        let hit_radius = self.config.node_radius + self.config.collision_padding;
        let mut best: Option<(f32, &str)> = None;
        for node in &self.model.nodes {
            let Some(center) = self.positions.get(&node.id) else {
                continue;
            };
            let dist = center.distance_to(at);
            if dist <= hit_radius && best.map_or(true, |(d, _)| dist < d) {
                best = Some((dist, node.id.as_str()));
            }
        }
        best.map(|(_, id)| id.to_string())
    }

    fn apply_effects(&mut self, effects: Vec<DragEffect>) {
        for effect in effects {
            match effect {
                DragEffect::ToggleSelection(id) => {
                    let selected = self.selection.toggle(&id).map(str::to_string);
                    self.fire_select(selected.as_deref());
                }
                DragEffect::ClearSelection => {
                    if self.selection.current().is_some() {
                        self.selection.clear();
                        self.fire_select(None);
                    }
                }
                DragEffect::RequestFit => {
                    self.request_fit();
                }
                DragEffect::ReleasePin(id) => {
                    self.placement.release(&id);
                }
                DragEffect::PinAt { node, at } => {
                    self.placement.set_pin(&node, at);
                    self.positions.insert(node, at);
                }
                DragEffect::Commit { node, at } => {
                    self.commit_manual_position(&node, at);
                }
            }
        }
    }

    fn fire_select(&self, id: Option<&str>) {
        if let Some(callback) = &self.on_select {
            callback(id.and_then(|id| self.model.node(id)));
        }
    }
}
