//! Smooth scrolling primitives
//!
//! ## Atomic layer
//! - `easing` - Pure easing functions (cubic, quintic, exponential)
//! - `timing` - Time calculation utilities (progress, interpolation)
//! - `config` - Derived timing values on `ScrollConfig`
//!
//! ## Molecular layer
//! - `animation` - Samples a transition between two offsets
//!
//! The sync engine (`crate::sync`) drives these on a tokio timer so that
//! animated scrolls go through the same write paths as every other motion.

// Atomic layer
pub mod config;
pub mod easing;
pub mod timing;

// Molecular layer
pub mod animation;

pub use animation::{AnimationFrame, ScrollAnimation};
pub use config::{EasingType, ScrollConfig};
