//! Zoom/pan state and the mapping between scene and screen coordinates.

use serde::{Deserialize, Serialize};

use super::geom::{Point, Rect, Size};

/// Allowed zoom range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleLimits {
    pub min: f32,
    pub max: f32,
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self {
            min: 0.5,
            max: 20.0,
        }
    }
}

impl ScaleLimits {
    pub fn clamp(&self, scale: f32) -> f32 {
        scale.max(self.min).min(self.max)
    }
}

/// Scale followed by translation: `screen = scene * scale + translate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

impl ViewTransform {
    /// Scene → screen.
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale + self.translate_x,
            p.y * self.scale + self.translate_y,
        )
    }

    /// Screen → scene.
    pub fn invert(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.translate_x) / self.scale,
            (p.y - self.translate_y) / self.scale,
        )
    }

    /// Fit `scene` inside `viewport` and center it. The fitted scale is
    /// clamped to `limits`, so very large scenes may still overflow.
    pub fn centered(scene: Size, viewport: Rect, limits: ScaleLimits) -> Self {
        if scene.is_empty() || viewport.size.is_empty() {
            return Self {
                scale: limits.clamp(1.0),
                translate_x: viewport.min.x,
                translate_y: viewport.min.y,
            };
        }
        let fit = (viewport.size.width / scene.width).min(viewport.size.height / scene.height);
        let scale = limits.clamp(fit);
        let center = viewport.center();
        Self {
            scale,
            translate_x: center.x - scene.width * scale / 2.0,
            translate_y: center.y - scene.height * scale / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Interacting,
}

/// Pointer gestures, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    DragStart,
    DragMove { dx: f32, dy: f32 },
    DragEnd,
    /// Multiply the scale by `factor`, keeping `anchor` fixed on screen.
    Zoom { factor: f32, anchor: Point },
    /// Pan so that `scene` lands on `screen` at the current scale.
    FocusOn { scene: Point, screen: Point },
    /// Return to the transform the viewport was mounted with.
    Reset,
}

/// Owner of the view transform. Only [`ViewportTransform::handle`] mutates it.
#[derive(Debug, Clone)]
pub struct ViewportTransform {
    transform: ViewTransform,
    home: ViewTransform,
    state: InteractionState,
    limits: ScaleLimits,
}

impl ViewportTransform {
    pub fn new(initial: ViewTransform, limits: ScaleLimits) -> Self {
        let transform = ViewTransform {
            scale: limits.clamp(initial.scale),
            ..initial
        };
        Self {
            transform,
            home: transform,
            state: InteractionState::Idle,
            limits,
        }
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    /// Replace the transform `Reset` returns to, e.g. after the scene was
    /// laid out for a new container. The current view is left alone.
    pub fn set_home(&mut self, home: ViewTransform) {
        self.home = ViewTransform {
            scale: self.limits.clamp(home.scale),
            ..home
        };
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn apply(&self, p: Point) -> Point {
        self.transform.apply(p)
    }

    pub fn invert(&self, p: Point) -> Point {
        self.transform.invert(p)
    }

    /// Fold one gesture into the state. Returns whether the transform changed.
    pub fn handle(&mut self, event: GestureEvent) -> bool {
        let before = self.transform;
        match event {
            GestureEvent::DragStart => {
                if self.state == InteractionState::Idle {
                    tracing::trace!("viewport: idle -> interacting");
                }
                self.state = InteractionState::Interacting;
            }
            GestureEvent::DragMove { dx, dy } => {
                if self.state == InteractionState::Interacting && dx.is_finite() && dy.is_finite()
                {
                    self.transform.translate_x += dx;
                    self.transform.translate_y += dy;
                }
            }
            GestureEvent::DragEnd => {
                if self.state == InteractionState::Interacting {
                    tracing::trace!("viewport: interacting -> idle");
                }
                self.state = InteractionState::Idle;
            }
            GestureEvent::Zoom { factor, anchor } => self.zoom_at(factor, anchor),
            GestureEvent::FocusOn { scene, screen } => {
                self.transform.translate_x = screen.x - scene.x * self.transform.scale;
                self.transform.translate_y = screen.y - scene.y * self.transform.scale;
            }
            GestureEvent::Reset => {
                self.transform = self.home;
                self.state = InteractionState::Idle;
            }
        }
        self.transform != before
    }

    fn zoom_at(&mut self, factor: f32, anchor: Point) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let t = &mut self.transform;
        let new_scale = self.limits.clamp(t.scale * factor);
        let ratio = new_scale / t.scale;

        // Keep the scene point under the anchor where it is.
        t.translate_x = anchor.x - (anchor.x - t.translate_x) * ratio;
        t.translate_y = anchor.y - (anchor.y - t.translate_y) * ratio;
        t.scale = new_scale;
    }
}
