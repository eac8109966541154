//! Edge auto-pan while dragging
//!
//! Holding the pointer inside the band of `boundary` pixels along a viewport
//! edge pans the content every tick until the pointer leaves the band or the
//! drag ends.

use serde::Serialize;

use crate::geometry::{Point, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanDirection {
    Left,
    Right,
    Up,
    Down,
}

impl PanDirection {
    /// Translation applied per tick; content moves away from the edge the
    /// pointer is at
    pub fn delta(self, speed: f64) -> (f64, f64) {
        match self {
            PanDirection::Left => (speed, 0.0),
            PanDirection::Right => (-speed, 0.0),
            PanDirection::Up => (0.0, speed),
            PanDirection::Down => (0.0, -speed),
        }
    }
}

/// Edge band the pointer is in, horizontal edges first
pub fn edge_direction(pointer: Point, size: Size, boundary: f64) -> Option<PanDirection> {
    if pointer.x < boundary {
        Some(PanDirection::Left)
    } else if pointer.x > size.width - boundary {
        Some(PanDirection::Right)
    } else if pointer.y < boundary {
        Some(PanDirection::Up)
    } else if pointer.y > size.height - boundary {
        Some(PanDirection::Down)
    } else {
        None
    }
}

/// What the owner of the pan timer must do after a pointer move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoPanCommand {
    /// Start the (single) pan timer
    Start,
    /// Cancel the pan timer
    Stop,
    Nothing,
}

/// Drag auto-pan state; at most one pan is active at a time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragAutoPan {
    direction: Option<PanDirection>,
}

impl DragAutoPan {
    pub fn direction(&self) -> Option<PanDirection> {
        self.direction
    }

    pub fn is_active(&self) -> bool {
        self.direction.is_some()
    }

    /// Track a drag pointer move
    ///
    /// Moving between edge bands only retargets the running pan.
    pub fn on_move(&mut self, pointer: Point, size: Size, boundary: f64) -> AutoPanCommand {
        let next = edge_direction(pointer, size, boundary);
        let command = match (self.direction, next) {
            (None, Some(_)) => AutoPanCommand::Start,
            (Some(_), None) => AutoPanCommand::Stop,
            _ => AutoPanCommand::Nothing,
        };
        self.direction = next;
        command
    }

    pub fn on_end(&mut self) -> AutoPanCommand {
        match self.direction.take() {
            Some(_) => AutoPanCommand::Stop,
            None => AutoPanCommand::Nothing,
        }
    }
}
