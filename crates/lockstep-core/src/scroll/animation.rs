//! Scroll animation curve sampling
//!
//! Combines easing functions and timing utilities. A `ScrollAnimation` is a
//! pure description of one transition; the sync engine samples it on every
//! frame tick and writes the result into a viewport.

use std::time::Duration;

use tokio::time::Instant;

use super::config::EasingType;
use super::timing::{is_complete, lerp, progress};

/// One animated transition between two offsets
#[derive(Debug, Clone, Copy)]
pub struct ScrollAnimation {
    /// Animation start time
    start: Instant,
    /// Starting scroll position
    from: f64,
    /// Target scroll position
    to: f64,
    /// Animation duration
    duration: Duration,
    /// Easing function
    easing: EasingType,
}

/// A single sample of a running animation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationFrame {
    pub value: f64,
    pub finished: bool,
}

impl ScrollAnimation {
    pub fn new(start: Instant, from: f64, to: f64, duration: Duration, easing: EasingType) -> Self {
        Self {
            start,
            from,
            to,
            duration,
            easing,
        }
    }

    pub fn target(&self) -> f64 {
        self.to
    }

    /// Sample the interpolated position at `now`
    ///
    /// The final frame always lands exactly on the target.
    pub fn sample(&self, now: Instant) -> AnimationFrame {
        let elapsed = now.saturating_duration_since(self.start);
        if is_complete(elapsed, self.duration) {
            return AnimationFrame {
                value: self.to,
                finished: true,
            };
        }

        let t = self.easing.apply(progress(elapsed, self.duration));
        AnimationFrame {
            value: lerp(self.from, self.to, t),
            finished: false,
        }
    }
}
