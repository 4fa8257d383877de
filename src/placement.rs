use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::EngineConfig;
use crate::graph::GraphModel;
use crate::Point;

/// Owns every node's pinned coordinate. A pin exempts the node from physics;
/// after each [`Placement::reconcile`] pass every node in the model has one.
#[derive(Debug)]
pub struct Placement {
    pins: HashMap<String, Point>,
    unseen: HashSet<String>,
    rng: StdRng,
}

impl Placement {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            pins: HashMap::new(),
            unseen: HashSet::new(),
            rng,
        }
    }

    /// Per node, in order: keep an active pin, else restore the persisted
    /// coordinate, else anchor near the pinned centroid (or the supplied
    /// fallback) with bounded jitter.
    pub fn reconcile(&mut self, model: &GraphModel, fallback_anchor: Point, jitter_radius: f32) {
        self.pins.retain(|id, _| model.contains(id));
        self.unseen.retain(|id| model.contains(id));

        for node in &model.nodes {
            if self.pins.contains_key(&node.id) {
                continue;
            }
            if let Some(at) = node.persisted {
                self.pins.insert(node.id.clone(), at);
                self.unseen.remove(&node.id);
                continue;
            }
            let anchor = self.pinned_centroid().unwrap_or(fallback_anchor);
            let jitter = Point::new(
                self.rng.gen_range(-jitter_radius..=jitter_radius),
                self.rng.gen_range(-jitter_radius..=jitter_radius),
            );
            self.pins
                .insert(node.id.clone(), Point::new(anchor.x + jitter.x, anchor.y + jitter.y));
            self.unseen.insert(node.id.clone());
        }
    }

    pub fn pin(&self, id: &str) -> Option<Point> {
        self.pins.get(id).copied()
    }

    pub fn pins(&self) -> &HashMap<String, Point> {
        &self.pins
    }

    pub fn set_pin(&mut self, id: &str, at: Point) {
        self.pins.insert(id.to_string(), at);
    }

    pub fn release(&mut self, id: &str) {
        self.pins.remove(id);
    }

    /// Bulk re-layout support: drop every pin so the simulation may arrange
    /// the whole graph again.
    pub fn release_all(&mut self) {
        let ids: Vec<String> = self.pins.keys().cloned().collect();
        self.pins.clear();
        self.unseen.extend(ids);
    }

    pub fn is_unseen(&self, id: &str) -> bool {
        self.unseen.contains(id)
    }

    /// Final placement of a drag: pin at the release point and stop treating
    /// the node as never-manually-placed.
    pub fn commit(&mut self, id: &str, at: Point) {
        self.pins.insert(id.to_string(), at);
        self.unseen.remove(id);
    }

    fn pinned_centroid(&self) -> Option<Point> {
        if self.pins.is_empty() {
            return None;
        }
        let (sx, sy) = self
            .pins
            .values()
            .fold((0.0_f32, 0.0_f32), |acc, p| (acc.0 + p.x, acc.1 + p.y));
        let count = self.pins.len() as f32;
        Some(Point::new(sx / count, sy / count))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Down {
        /// Node under the pointer, or `None` for the canvas background.
        target: Option<String>,
        at: Point,
        time_ms: f64,
    },
    Move {
        at: Point,
        time_ms: f64,
    },
    Up {
        at: Point,
        time_ms: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragEffect {
    ToggleSelection(String),
    ClearSelection,
    RequestFit,
    /// Unseen pins are released for exactly the arming instant.
    ReleasePin(String),
    PinAt { node: String, at: Point },
    /// Drag finished: pin here, clear the unseen flag, persist.
    Commit { node: String, at: Point },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Armed {
        node: String,
        origin: Point,
        pressed_ms: f64,
    },
    Dragging {
        node: String,
        pointer: Point,
    },
}

/// Click-vs-drag disambiguation as an explicit state machine. Each event maps
/// `(phase, event) -> (phase, effects)`; the engine applies the effects.
#[derive(Debug, Default)]
pub struct DragMachine {
    phase: DragPhase,
    last_background_down_ms: Option<f64>,
}

impl DragMachine {
    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn on_event(
        &mut self,
        event: PointerEvent,
        config: &EngineConfig,
        unseen: impl Fn(&str) -> bool,
    ) -> Vec<DragEffect> {
        match event {
            PointerEvent::Down {
                target: Some(node),
                at,
                time_ms,
            } => {
                self.phase = DragPhase::Armed {
                    node,
                    origin: at,
                    pressed_ms: time_ms,
                };
                Vec::new()
            }
            PointerEvent::Down {
                target: None,
                time_ms,
                ..
            } => {
                self.phase = DragPhase::Idle;
                let mut effects = vec![DragEffect::ClearSelection];
                if let Some(last) = self.last_background_down_ms {
                    if time_ms - last <= config.double_activate_ms {
                        effects.push(DragEffect::RequestFit);
                    }
                }
                self.last_background_down_ms = Some(time_ms);
                effects
            }
            PointerEvent::Move { at, time_ms } => match std::mem::take(&mut self.phase) {
                DragPhase::Armed {
                    node,
                    origin,
                    pressed_ms,
                } => {
                    let displacement = origin.distance_to(at);
                    let held_long = time_ms - pressed_ms >= config.drag_delay_ms;
                    if displacement > config.drag_threshold || (held_long && displacement > 0.0) {
                        let effects = if unseen(&node) {
                            vec![DragEffect::ReleasePin(node.clone())]
                        } else {
                            vec![DragEffect::PinAt {
                                node: node.clone(),
                                at,
                            }]
                        };
                        self.phase = DragPhase::Dragging { node, pointer: at };
                        effects
                    } else {
                        self.phase = DragPhase::Armed {
                            node,
                            origin,
                            pressed_ms,
                        };
                        Vec::new()
                    }
                }
                DragPhase::Dragging { node, .. } => {
                    let effects = vec![DragEffect::PinAt {
                        node: node.clone(),
                        at,
                    }];
                    self.phase = DragPhase::Dragging { node, pointer: at };
                    effects
                }
                DragPhase::Idle => Vec::new(),
            },
            PointerEvent::Up { at, .. } => match std::mem::take(&mut self.phase) {
                DragPhase::Armed { node, .. } => vec![DragEffect::ToggleSelection(node)],
                DragPhase::Dragging { node, .. } => vec![DragEffect::Commit { node, at }],
                DragPhase::Idle => Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphModel, NodeRecord};

    fn record(id: &str, persisted: Option<(f32, f32)>) -> NodeRecord {
        NodeRecord {
            id: id.to_string(),
            display_name: id.to_string(),
            persisted_x: persisted.map(|p| p.0),
            persisted_y: persisted.map(|p| p.1),
            category: None,
        }
    }

    #[test]
    fn persisted_coordinates_restore_exactly() {
        let model = GraphModel::from_records(&[record("a", Some((42.5, -7.0)))], &[]);
        let mut placement = Placement::new(Some(1));
        placement.reconcile(&model, Point::new(0.0, 0.0), 25.0);

        assert_eq!(placement.pin("a"), Some(Point::new(42.5, -7.0)));
        assert!(!placement.is_unseen("a"));
    }

    #[test]
    fn new_nodes_jitter_around_the_pinned_centroid() {
        let model = GraphModel::from_records(
            &[
                record("a", Some((100.0, 100.0))),
                record("b", Some((300.0, 100.0))),
                record("fresh", None),
            ],
            &[],
        );
        let mut placement = Placement::new(Some(7));
        placement.reconcile(&model, Point::new(0.0, 0.0), 25.0);

        let pin = placement.pin("fresh").unwrap();
        assert!((pin.x - 200.0).abs() <= 25.0, "x within jitter of anchor");
        assert!((pin.y - 100.0).abs() <= 25.0, "y within jitter of anchor");
        assert!(placement.is_unseen("fresh"));
    }

    #[test]
    fn pins_for_vanished_nodes_are_discarded() {
        let before = GraphModel::from_records(&[record("a", None), record("b", None)], &[]);
        let mut placement = Placement::new(Some(3));
        placement.reconcile(&before, Point::new(0.0, 0.0), 25.0);
        assert!(placement.pin("b").is_some());

        let after = GraphModel::from_records(&[record("a", None)], &[]);
        placement.reconcile(&after, Point::new(0.0, 0.0), 25.0);
        assert!(placement.pin("b").is_none());
    }

    #[test]
    fn sub_threshold_gesture_is_a_selection_toggle() {
        let config = EngineConfig::default();
        let mut machine = DragMachine::default();

        let effects = machine.on_event(
            PointerEvent::Down {
                target: Some("a".into()),
                at: Point::new(10.0, 10.0),
                time_ms: 0.0,
            },
            &config,
            |_| false,
        );
        assert!(effects.is_empty());

        let effects = machine.on_event(
            PointerEvent::Move {
                at: Point::new(11.0, 10.0),
                time_ms: 16.0,
            },
            &config,
            |_| false,
        );
        assert!(effects.is_empty(), "under-threshold move must not drag");

        let effects = machine.on_event(
            PointerEvent::Up {
                at: Point::new(11.0, 10.0),
                time_ms: 32.0,
            },
            &config,
            |_| false,
        );
        assert_eq!(effects, vec![DragEffect::ToggleSelection("a".into())]);
    }

    #[test]
    fn drag_commits_at_the_final_pointer_without_toggling() {
        let config = EngineConfig::default();
        let mut machine = DragMachine::default();

        machine.on_event(
            PointerEvent::Down {
                target: Some("a".into()),
                at: Point::new(0.0, 0.0),
                time_ms: 0.0,
            },
            &config,
            |_| false,
        );
        let effects = machine.on_event(
            PointerEvent::Move {
                at: Point::new(30.0, 0.0),
                time_ms: 16.0,
            },
            &config,
            |_| false,
        );
        assert_eq!(
            effects,
            vec![DragEffect::PinAt {
                node: "a".into(),
                at: Point::new(30.0, 0.0),
            }]
        );

        let effects = machine.on_event(
            PointerEvent::Up {
                at: Point::new(55.0, 5.0),
                time_ms: 48.0,
            },
            &config,
            |_| false,
        );
        assert_eq!(
            effects,
            vec![DragEffect::Commit {
                node: "a".into(),
                at: Point::new(55.0, 5.0),
            }]
        );
        assert_eq!(*machine.phase(), DragPhase::Idle);
    }

    #[test]
    fn unseen_pin_releases_only_on_the_arming_instant() {
        let config = EngineConfig::default();
        let mut machine = DragMachine::default();

        machine.on_event(
            PointerEvent::Down {
                target: Some("a".into()),
                at: Point::new(0.0, 0.0),
                time_ms: 0.0,
            },
            &config,
            |_| true,
        );
        let effects = machine.on_event(
            PointerEvent::Move {
                at: Point::new(20.0, 0.0),
                time_ms: 16.0,
            },
            &config,
            |_| true,
        );
        assert_eq!(effects, vec![DragEffect::ReleasePin("a".into())]);

        let effects = machine.on_event(
            PointerEvent::Move {
                at: Point::new(25.0, 0.0),
                time_ms: 32.0,
            },
            &config,
            |_| true,
        );
        assert_eq!(
            effects,
            vec![DragEffect::PinAt {
                node: "a".into(),
                at: Point::new(25.0, 0.0),
            }]
        );
    }

    #[test]
    fn background_double_activation_requests_a_fit() {
        let config = EngineConfig::default();
        let mut machine = DragMachine::default();

        let first = machine.on_event(
            PointerEvent::Down {
                target: None,
                at: Point::new(0.0, 0.0),
                time_ms: 1000.0,
            },
            &config,
            |_| false,
        );
        assert_eq!(first, vec![DragEffect::ClearSelection]);

        let second = machine.on_event(
            PointerEvent::Down {
                target: None,
                at: Point::new(0.0, 0.0),
                time_ms: 1200.0,
            },
            &config,
            |_| false,
        );
        assert_eq!(
            second,
            vec![DragEffect::ClearSelection, DragEffect::RequestFit]
        );
    }
}
