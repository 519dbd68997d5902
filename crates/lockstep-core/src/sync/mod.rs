//! Scroll offset synchronization
//!
//! A [`SyncGroup`] keeps any number of [`Member`]s at the same offset. Motion
//! on one member (a jump, a drag, an animation frame) is mirrored onto every
//! other attached member through a shared sync activity, using writes that
//! never propagate further. Group-wide jumps and animations write each member
//! directly instead.
//!
//! ```ignore
//! use lockstep_core::sync::{SyncGroup, VirtualViewport};
//!
//! let group = SyncGroup::new(100.0);
//! let left = group.add_and_get();
//! let right = group.add_and_get();
//! left.attach(VirtualViewport::new());
//! right.attach(VirtualViewport::new());
//!
//! left.jump_to(250.0);
//! assert_eq!(right.offset(), 250.0);
//! ```

mod activity;
mod group;
mod member;
mod notifier;
mod viewport;

#[cfg(test)]
pub(crate) mod testing;

pub use group::SyncGroup;
pub use member::{Drag, Hold, Member, MemberId};
pub use notifier::{ListenerId, OffsetListener, OffsetNotifier};
pub use viewport::{Extent, MotionKind, ScrollDirection, Viewport, VirtualViewport};
