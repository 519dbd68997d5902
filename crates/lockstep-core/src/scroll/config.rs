//! Derived timing values for smooth scrolling

use std::time::Duration;

pub use crate::config::{EasingType, ScrollConfig};

impl ScrollConfig {
    /// Get the default page-scroll animation duration
    #[inline]
    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_duration_ms)
    }

    /// Get tick duration for animation FPS
    #[inline]
    pub fn animation_tick_duration(&self) -> Duration {
        if self.animation_fps == 0 {
            Duration::from_millis(16) // ~60fps fallback
        } else {
            Duration::from_millis(1000 / self.animation_fps as u64)
        }
    }
}
