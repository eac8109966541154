//! Viewport: pan/zoom transform, camera transitions and drag auto-pan

pub mod autopan;
pub mod controller;
pub mod transform;

pub use autopan::{edge_direction, AutoPanCommand, DragAutoPan, PanDirection};
pub use controller::{CameraTransition, ViewportController};
pub use transform::Transform;
