pub mod config;
pub mod error;
pub mod scroll;
pub mod sync;

pub use config::{AppConfig, EasingType, ScrollConfig};
pub use error::{Error, Result};
pub use sync::{Member, ScrollDirection, SyncGroup, Viewport, VirtualViewport};
