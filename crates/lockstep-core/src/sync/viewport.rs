//! Host viewport boundary
//!
//! The sync engine never owns scroll physics or geometry. It talks to each
//! scrollable surface through [`Viewport`], reading and writing a pixel offset
//! and a scroll direction. [`VirtualViewport`] is a plain in-memory host used
//! by the terminal UI and by tests.

use std::cell::Cell;
use std::rc::Rc;

/// Direction of the most recent user-visible motion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScrollDirection {
    /// Not moving, or drivers disagree
    #[default]
    Idle,
    /// Offset increasing
    Forward,
    /// Offset decreasing
    Reverse,
}

impl ScrollDirection {
    /// Direction implied by moving the offset by `delta`
    pub fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            ScrollDirection::Forward
        } else {
            ScrollDirection::Reverse
        }
    }
}

/// Which authority currently controls a viewport's motion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    Idle,
    /// A finger (or equivalent) is resting on some viewport in the group
    Hold,
    /// User drag on this viewport
    Drag,
    /// Programmatic animation
    Animate,
    /// Mirroring one or more peers
    Sync,
}

impl MotionKind {
    /// Whether the viewport is actively scrolling in this state
    pub fn is_scrolling(&self) -> bool {
        matches!(self, MotionKind::Drag | MotionKind::Animate | MotionKind::Sync)
    }
}

/// A scrollable surface owned by the host
///
/// Implementations must not call back into the owning [`SyncGroup`](super::SyncGroup)
/// from these methods; the group is borrowed while they run.
pub trait Viewport {
    /// Current pixel offset
    fn offset(&self) -> f64;

    /// Write an offset without any propagation
    ///
    /// Hosts may clamp; the engine reads the offset back afterwards.
    fn set_offset_internal(&mut self, value: f64);

    /// Discrete write used for jumps
    ///
    /// Hosts that simulate momentum can cancel it here.
    fn jump_internal(&mut self, value: f64) {
        self.set_offset_internal(value);
    }

    fn direction(&self) -> ScrollDirection;

    fn set_direction(&mut self, direction: ScrollDirection);

    /// Called whenever the engine installs a new motion state
    ///
    /// This is also the hold hook: a gesture hold on any member of the group
    /// reaches every attached viewport as `MotionKind::Hold`, and the release
    /// arrives as the next state (usually `MotionKind::Idle`). Hosts that
    /// simulate momentum should stop it when they see `Hold`.
    fn motion_changed(&mut self, _motion: MotionKind) {}
}

impl<V: Viewport + ?Sized> Viewport for Box<V> {
    fn offset(&self) -> f64 {
        (**self).offset()
    }

    fn set_offset_internal(&mut self, value: f64) {
        (**self).set_offset_internal(value)
    }

    fn jump_internal(&mut self, value: f64) {
        (**self).jump_internal(value)
    }

    fn direction(&self) -> ScrollDirection {
        (**self).direction()
    }

    fn set_direction(&mut self, direction: ScrollDirection) {
        (**self).set_direction(direction)
    }

    fn motion_changed(&mut self, motion: MotionKind) {
        (**self).motion_changed(motion)
    }
}

/// Shared upper bound for a [`VirtualViewport`]
///
/// The host keeps a clone and updates it when content or layout changes.
#[derive(Debug, Clone, Default)]
pub struct Extent(Rc<Cell<f64>>);

impl Extent {
    pub fn new(max_offset: f64) -> Self {
        Self(Rc::new(Cell::new(max_offset.max(0.0))))
    }

    pub fn max_offset(&self) -> f64 {
        self.0.get()
    }

    pub fn set_max_offset(&self, max_offset: f64) {
        self.0.set(max_offset.max(0.0));
    }
}

/// In-memory viewport with optional clamping to `[0, max_offset]`
#[derive(Debug, Clone, Default)]
pub struct VirtualViewport {
    offset: f64,
    direction: ScrollDirection,
    extent: Option<Extent>,
}

impl VirtualViewport {
    /// Unbounded viewport
    pub fn new() -> Self {
        Self::default()
    }

    /// Viewport clamped to `[0, extent.max_offset()]`
    pub fn bounded(extent: Extent) -> Self {
        Self {
            extent: Some(extent),
            ..Self::default()
        }
    }

    fn clamp(&self, value: f64) -> f64 {
        match &self.extent {
            Some(extent) => value.clamp(0.0, extent.max_offset()),
            None => value,
        }
    }
}

impl Viewport for VirtualViewport {
    fn offset(&self) -> f64 {
        self.offset
    }

    fn set_offset_internal(&mut self, value: f64) {
        self.offset = self.clamp(value);
    }

    fn direction(&self) -> ScrollDirection {
        self.direction
    }

    fn set_direction(&mut self, direction: ScrollDirection) {
        self.direction = direction;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_delta() {
        assert_eq!(ScrollDirection::from_delta(3.0), ScrollDirection::Forward);
        assert_eq!(ScrollDirection::from_delta(-0.5), ScrollDirection::Reverse);
    }

    #[test]
    fn test_unbounded_viewport_accepts_any_offset() {
        let mut viewport = VirtualViewport::new();
        viewport.set_offset_internal(-40.0);
        assert_eq!(viewport.offset(), -40.0);
    }

    #[test]
    fn test_bounded_viewport_clamps() {
        let extent = Extent::new(50.0);
        let mut viewport = VirtualViewport::bounded(extent.clone());

        viewport.set_offset_internal(80.0);
        assert_eq!(viewport.offset(), 50.0);

        viewport.jump_internal(-5.0);
        assert_eq!(viewport.offset(), 0.0);

        extent.set_max_offset(100.0);
        viewport.set_offset_internal(80.0);
        assert_eq!(viewport.offset(), 80.0);
    }

    #[test]
    fn test_motion_kind_scrolling() {
        assert!(!MotionKind::Idle.is_scrolling());
        assert!(!MotionKind::Hold.is_scrolling());
        assert!(MotionKind::Drag.is_scrolling());
        assert!(MotionKind::Sync.is_scrolling());
    }
}
