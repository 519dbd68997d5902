//! Instrumented viewports for protocol tests

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::viewport::{MotionKind, ScrollDirection, Viewport, VirtualViewport};

/// Counters shared between a test and the viewport it handed to a group
#[derive(Debug, Default)]
pub(crate) struct Tally {
    pub(crate) writes: Cell<usize>,
    pub(crate) jumps: Cell<usize>,
    pub(crate) direction_writes: Cell<usize>,
    pub(crate) motions: RefCell<Vec<MotionKind>>,
}

impl Tally {
    pub(crate) fn internal_writes(&self) -> usize {
        self.writes.get() + self.jumps.get()
    }

    pub(crate) fn reset(&self) {
        self.writes.set(0);
        self.jumps.set(0);
        self.direction_writes.set(0);
        self.motions.borrow_mut().clear();
    }
}

pub(crate) struct CountingViewport {
    inner: VirtualViewport,
    tally: Rc<Tally>,
}

impl CountingViewport {
    pub(crate) fn new() -> (Self, Rc<Tally>) {
        let tally = Rc::new(Tally::default());
        (
            Self {
                inner: VirtualViewport::new(),
                tally: Rc::clone(&tally),
            },
            tally,
        )
    }
}

impl Viewport for CountingViewport {
    fn offset(&self) -> f64 {
        self.inner.offset()
    }

    fn set_offset_internal(&mut self, value: f64) {
        self.tally.writes.set(self.tally.writes.get() + 1);
        self.inner.set_offset_internal(value);
    }

    fn jump_internal(&mut self, value: f64) {
        self.tally.jumps.set(self.tally.jumps.get() + 1);
        self.inner.set_offset_internal(value);
    }

    fn direction(&self) -> ScrollDirection {
        self.inner.direction()
    }

    fn set_direction(&mut self, direction: ScrollDirection) {
        self.tally
            .direction_writes
            .set(self.tally.direction_writes.get() + 1);
        self.inner.set_direction(direction);
    }

    fn motion_changed(&mut self, motion: MotionKind) {
        self.tally.motions.borrow_mut().push(motion);
    }
}
