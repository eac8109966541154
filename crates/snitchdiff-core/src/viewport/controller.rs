use std::time::Duration;

use crate::config::DiffViewConfig;
use crate::geometry::{ease_cubic_in_out, Point, Size};
use crate::viewport::transform::Transform;

/// Animated camera move between two transforms
#[derive(Debug, Clone, PartialEq)]
pub struct CameraTransition {
    pub from: Transform,
    pub to: Transform,
    pub duration: Duration,
    elapsed: Duration,
}

impl CameraTransition {
    pub fn new(from: Transform, to: Transform, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
        }
    }

    /// Transform after `elapsed` since the start
    pub fn at(&self, elapsed: Duration) -> Transform {
        if self.duration.is_zero() || elapsed >= self.duration {
            return self.to;
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        self.from.lerp(&self.to, ease_cubic_in_out(t))
    }

    /// Advance by `dt` and return the current transform
    pub fn tick(&mut self, dt: Duration) -> Transform {
        self.elapsed = self.elapsed.saturating_add(dt);
        self.at(self.elapsed)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Pan/zoom state of the viewport
///
/// Owns the current [`Transform`] and at most one running camera transition.
/// Any direct manipulation (pan, wheel, zoom) cancels the transition.
#[derive(Debug, Clone)]
pub struct ViewportController {
    transform: Transform,
    size: Size,
    scale_extent: [f64; 2],
    transition: Duration,
    camera: Option<CameraTransition>,
}

impl ViewportController {
    pub fn new(config: &DiffViewConfig, size: Size) -> Self {
        Self {
            transform: Transform::IDENTITY,
            size,
            scale_extent: config.scale_extent,
            transition: config.transition(),
            camera: None,
        }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn resize(&mut self, size: Size) {
        self.size = size;
    }

    pub fn camera(&self) -> Option<&CameraTransition> {
        self.camera.as_ref()
    }

    fn clamp_scale(&self, k: f64) -> f64 {
        k.clamp(self.scale_extent[0], self.scale_extent[1])
    }

    /// Jump to `target`, scale clamped to the configured extent
    pub fn zoom_to(&mut self, target: Transform) -> Transform {
        self.camera = None;
        self.transform = Transform::new(target.x, target.y, self.clamp_scale(target.k));
        self.transform
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) -> Transform {
        self.camera = None;
        self.transform = self.transform.translate_by(dx, dy);
        self.transform
    }

    /// Wheel zoom anchored at `pointer` (screen space)
    ///
    /// The tree point under the pointer stays under the pointer.
    pub fn wheel(&mut self, delta_y: f64, pointer: Point) -> Transform {
        let k = self.clamp_scale(self.transform.k * 2f64.powf(-delta_y * 0.002));
        let anchor = self.transform.invert(pointer);
        self.zoom_to(Transform::new(
            pointer.x - anchor.x * k,
            pointer.y - anchor.y * k,
            k,
        ))
    }

    /// Start an animated move that puts `point` (tree space) at the centre of
    /// the viewport, keeping the current scale
    pub fn center_on(&mut self, point: Point) -> &CameraTransition {
        let k = self.transform.k;
        let target = Transform::new(
            -point.x * k + self.size.width / 2.0,
            -point.y * k + self.size.height / 2.0,
            k,
        );
        tracing::debug!(
            op = "center_on",
            x = point.x,
            y = point.y,
            target = %target.to_svg(),
            "camera transition started"
        );
        self.camera
            .insert(CameraTransition::new(self.transform, target, self.transition))
    }

    /// Advance the running camera transition, if any
    pub fn tick(&mut self, dt: Duration) -> Transform {
        if let Some(camera) = &mut self.camera {
            self.transform = camera.tick(dt);
            if camera.is_finished() {
                self.camera = None;
            }
        }
        self.transform
    }

    /// Jump straight to the end of the running transition
    pub fn finish(&mut self) -> Transform {
        if let Some(camera) = self.camera.take() {
            self.transform = camera.to;
        }
        self.transform
    }
}
