use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::Point;

/// Zoom/pan state. The rendered scene is `world * scale + translate`; the
/// three values fully reconstruct the view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewTransform {
    pub scale: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }
}

impl ViewTransform {
    pub fn apply(&self, world: Point) -> Point {
        Point::new(world.x * self.scale + self.tx, world.y * self.scale + self.ty)
    }

    pub fn to_world(&self, screen: Point) -> Point {
        Point::new((screen.x - self.tx) / self.scale, (screen.y - self.ty) / self.scale)
    }

    /// Continuous pointer zoom anchored at the cursor: the world point under
    /// the cursor stays put while the scale changes.
    pub fn zoom_at(&mut self, cursor: Point, factor: f32, config: &EngineConfig) {
        let old_scale = self.scale;
        let new_scale = (old_scale * factor).clamp(config.min_scale, config.max_scale);
        let world = self.to_world(cursor);
        self.tx = cursor.x - world.x * new_scale;
        self.ty = cursor.y - world.y * new_scale;
        self.scale = new_scale;
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.tx += dx;
        self.ty += dy;
    }
}

/// Compute the transform that frames every node (center +/- radius) inside
/// the viewport with the configured padding. `None` when there is nothing
/// finite to frame or the bounding box has no area.
pub fn fit_transform(
    positions: impl IntoIterator<Item = Point>,
    radius: f32,
    viewport: (f32, f32),
    config: &EngineConfig,
) -> Option<ViewTransform> {
    let mut min_x = f32::MAX;
    let mut max_x = f32::MIN;
    let mut min_y = f32::MAX;
    let mut max_y = f32::MIN;
    let mut any = false;

    for at in positions {
        if !at.is_finite() {
            continue;
        }
        any = true;
        min_x = min_x.min(at.x - radius);
        max_x = max_x.max(at.x + radius);
        min_y = min_y.min(at.y - radius);
        max_y = max_y.max(at.y + radius);
    }
    if !any {
        return None;
    }

    let box_w = max_x - min_x;
    let box_h = max_y - min_y;
    if box_w <= f32::EPSILON || box_h <= f32::EPSILON {
        return None;
    }

    let (view_w, view_h) = viewport;
    let scale = (config.fit_padding * (view_w / box_w).min(view_h / box_h))
        .clamp(config.min_scale, config.max_scale);

    let box_center = Point::new((min_x + max_x) * 0.5, (min_y + max_y) * 0.5);
    Some(ViewTransform {
        scale,
        tx: view_w * 0.5 - box_center.x * scale,
        ty: view_h * 0.5 - box_center.y * scale,
    })
}

/// Presentational glide from one transform to another over a fixed duration.
/// Never touches pins or node positions.
#[derive(Debug, Clone)]
pub struct FitAnimation {
    from: ViewTransform,
    to: ViewTransform,
    duration_ms: f32,
    elapsed_ms: f32,
}

impl FitAnimation {
    pub fn new(from: ViewTransform, to: ViewTransform, duration_ms: f32) -> Self {
        Self {
            from,
            to,
            duration_ms: duration_ms.max(1.0),
            elapsed_ms: 0.0,
        }
    }

    pub fn advance(&mut self, dt_ms: f32) -> ViewTransform {
        self.elapsed_ms = (self.elapsed_ms + dt_ms).min(self.duration_ms);
        let t = ease_in_out_cubic(self.elapsed_ms / self.duration_ms);
        ViewTransform {
            scale: lerp(self.from.scale, self.to.scale, t),
            tx: lerp(self.from.tx, self.to.tx, t),
            ty: lerp(self.from.ty, self.to.ty, t),
        }
    }

    pub fn finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }

    pub fn target(&self) -> ViewTransform {
        self.to
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - u * u * u / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_is_clamped_and_anchored_at_the_cursor() {
        let config = EngineConfig::default();
        let mut transform = ViewTransform::default();
        let cursor = Point::new(320.0, 240.0);
        let world_before = transform.to_world(cursor);

        transform.zoom_at(cursor, 1.5, &config);
        let world_after = transform.to_world(cursor);
        assert!(world_before.distance_to(world_after) < 1e-3);

        for _ in 0..50 {
            transform.zoom_at(cursor, 10.0, &config);
        }
        assert_eq!(transform.scale, config.max_scale);

        for _ in 0..50 {
            transform.zoom_at(cursor, 0.01, &config);
        }
        assert_eq!(transform.scale, config.min_scale);
    }

    #[test]
    fn fit_keeps_every_node_inside_the_viewport() {
        let config = EngineConfig::default();
        let viewport = (800.0, 600.0);
        let points = vec![
            Point::new(-120.0, 40.0),
            Point::new(310.0, 220.0),
            Point::new(90.0, -260.0),
        ];

        let transform = fit_transform(points.iter().copied(), config.node_radius, viewport, &config)
            .expect("three spread nodes must produce a fit");

        for at in &points {
            let r = config.node_radius * transform.scale;
            let center = transform.apply(*at);
            assert!(center.x - r >= 0.0 && center.x + r <= viewport.0);
            assert!(center.y - r >= 0.0 && center.y + r <= viewport.1);
        }
    }

    #[test]
    fn degenerate_bounds_produce_no_fit() {
        let config = EngineConfig::default();
        assert!(fit_transform(std::iter::empty(), 16.0, (800.0, 600.0), &config).is_none());
        // Radius of zero collapses a single point to a zero-area box.
        assert!(
            fit_transform([Point::new(5.0, 5.0)], 0.0, (800.0, 600.0), &config).is_none()
        );
        assert!(
            fit_transform([Point::new(f32::NAN, 0.0)], 16.0, (800.0, 600.0), &config).is_none()
        );
    }

    #[test]
    fn fit_animation_glides_between_endpoints() {
        let from = ViewTransform::default();
        let to = ViewTransform {
            scale: 2.0,
            tx: -100.0,
            ty: 50.0,
        };
        let mut animation = FitAnimation::new(from, to, 750.0);

        let early = animation.advance(0.0);
        assert!(early.scale - from.scale < 1e-3);
        assert!(!animation.finished());

        let late = animation.advance(750.0);
        assert!(animation.finished());
        assert_eq!(late, to);
    }
}
