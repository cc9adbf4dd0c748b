//! Pan/zoom camera constrained to the circular world.
//!
//! The camera maps world (display) coordinates to screen coordinates with
//! `screen = world * k + (x, y)`. After every change the translation is
//! clamped so the viewport center never shows anything farther than
//! `R * (1 - 1/k)` from the world center: at minimum scale the view is
//! locked on the center, and zooming in frees it progressively.

use serde::{Deserialize, Serialize};

use crate::types::{EngineConfig, Point};

/// Scales within this distance of the minimum count as "not zoomed" for
/// panning.
const PAN_SCALE_EPSILON: f64 = 1e-3;

/// Translation and uniform scale from world to screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraTransform {
    /// Screen-space translation along x.
    pub x: f64,
    /// Screen-space translation along y.
    pub y: f64,
    /// Scale factor.
    pub k: f64,
}

impl CameraTransform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };

    /// Map a world point to the screen.
    #[must_use]
    pub fn apply(&self, world: Point) -> Point {
        Point::new(world.x.mul_add(self.k, self.x), world.y.mul_add(self.k, self.y))
    }

    /// Map a screen point back to the world.
    #[must_use]
    pub fn invert(&self, screen: Point) -> Point {
        Point::new((screen.x - self.x) / self.k, (screen.y - self.y) / self.k)
    }
}

impl Default for CameraTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Owns the camera transform and applies zoom, pan and the circular clamp.
#[derive(Debug, Clone)]
pub struct CameraController {
    transform: CameraTransform,
    pan_start: Option<CameraTransform>,
    min_scale: f64,
    max_scale: f64,
    zoom_sensitivity: f64,
    world_center: f64,
    world_radius: f64,
    display_center: f64,
}

impl CameraController {
    /// Create a camera at the identity transform.
    ///
    /// The initial scale is `min_scale`, so the identity is only exact
    /// when `min_scale` is 1.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let mut camera = Self {
            transform: CameraTransform::IDENTITY,
            pan_start: None,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            zoom_sensitivity: config.zoom_sensitivity,
            world_center: config.world_center,
            world_radius: config.world_radius,
            display_center: config.display_center,
        };
        camera.reset();
        camera
    }

    /// Current transform.
    #[must_use]
    pub const fn transform(&self) -> CameraTransform {
        self.transform
    }

    /// Current scale.
    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.transform.k
    }

    /// Return to the minimum scale with no translation, then clamp.
    pub fn reset(&mut self) {
        self.pan_start = None;
        self.transform = CameraTransform {
            x: 0.0,
            y: 0.0,
            k: self.min_scale,
        };
        self.clamp();
    }

    /// Replace the transform, clamping scale and translation.
    pub fn set_transform(&mut self, transform: CameraTransform) {
        let k = if transform.k.is_finite() {
            transform.k.clamp(self.min_scale, self.max_scale)
        } else {
            self.transform.k
        };
        self.transform = CameraTransform { k, ..transform };
        self.clamp();
    }

    /// Zoom by a wheel delta around a screen-space anchor.
    ///
    /// The scale is multiplied by `exp(delta * zoom_sensitivity)`, so
    /// positive deltas zoom in. The world point under `anchor` stays under
    /// it unless the clamp has to move the view.
    pub fn zoom(&mut self, anchor: Point, delta: f64) {
        if delta.is_nan() {
            return;
        }
        // An overflowing factor still clamps to the scale bounds.
        let factor = (delta * self.zoom_sensitivity).exp();
        self.zoom_to(anchor, self.transform.k * factor);
    }

    /// Zoom to an absolute scale around a screen-space anchor.
    ///
    /// Ends any drag in progress, since its start transform no longer
    /// matches the view.
    pub fn zoom_to(&mut self, anchor: Point, scale: f64) {
        if scale.is_nan() || !anchor.is_finite() {
            return;
        }
        self.pan_start = None;
        let old = self.transform;
        let k = scale.clamp(self.min_scale, self.max_scale);
        let world = old.invert(anchor);
        self.transform = CameraTransform {
            x: world.x.mul_add(-k, anchor.x),
            y: world.y.mul_add(-k, anchor.y),
            k,
        };
        self.clamp();
    }

    /// Start a drag. Returns `false` (and ignores the drag) at minimum
    /// scale, where the clamp would pin the view anyway.
    pub fn begin_pan(&mut self) -> bool {
        if self.transform.k <= self.min_scale + PAN_SCALE_EPSILON {
            self.pan_start = None;
            return false;
        }
        self.pan_start = Some(self.transform);
        true
    }

    /// Move the view by the total drag offset since [`begin_pan`](Self::begin_pan).
    pub fn pan_by(&mut self, delta: Point) {
        let Some(start) = self.pan_start else {
            return;
        };
        if !delta.is_finite() {
            return;
        }
        self.transform = CameraTransform {
            x: start.x + delta.x,
            y: start.y + delta.y,
            k: start.k,
        };
        self.clamp();
    }

    /// Finish a drag.
    pub const fn end_pan(&mut self) {
        self.pan_start = None;
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub const fn is_panning(&self) -> bool {
        self.pan_start.is_some()
    }

    /// Map a screen point to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        self.transform.invert(screen)
    }

    /// Map a world point to screen coordinates.
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        self.transform.apply(world)
    }

    /// World point currently under the viewport center.
    #[must_use]
    pub fn view_center_world(&self) -> Point {
        self.screen_to_world(Point::new(self.display_center, self.display_center))
    }

    /// Farthest the viewport center may sit from the world center at the
    /// current scale.
    #[must_use]
    pub fn effective_radius(&self) -> f64 {
        (self.world_radius * (1.0 - 1.0 / self.transform.k)).max(0.0)
    }

    fn clamp(&mut self) {
        let effective = self.effective_radius();
        let center = self.view_center_world();
        let dx = center.x - self.world_center;
        let dy = center.y - self.world_center;
        let distance = dx.hypot(dy);
        if distance <= effective {
            return;
        }

        let clamped = if effective > 0.0 {
            let s = effective / distance;
            Point::new(
                dx.mul_add(s, self.world_center),
                dy.mul_add(s, self.world_center),
            )
        } else {
            Point::new(self.world_center, self.world_center)
        };
        let k = self.transform.k;
        self.transform.x = clamped.x.mul_add(-k, self.display_center);
        self.transform.y = clamped.y.mul_add(-k, self.display_center);
    }
}
