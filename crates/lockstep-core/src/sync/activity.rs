//! Sync activities: one follower mirroring one or more drivers
//!
//! A follower that needs to mirror a peer gets a single [`SyncActivity`] in
//! the group's activity arena, no matter how many drivers feed it. Drivers
//! and followers refer to each other only through [`MemberId`] and
//! [`ActivityId`] keys, so releasing a member never leaves a dangling link.

use slotmap::new_key_type;

use super::group::GroupInner;
use super::member::{MemberId, Motion};
use super::viewport::{ScrollDirection, Viewport};

new_key_type! {
    /// Key of a [`SyncActivity`] in the group's activity arena
    pub struct ActivityId;
}

/// The set of drivers currently forcing one follower's motion
#[derive(Debug, Clone)]
pub(crate) struct SyncActivity {
    follower: MemberId,
    drivers: Vec<MemberId>,
}

impl SyncActivity {
    pub(crate) fn new(follower: MemberId) -> Self {
        Self {
            follower,
            drivers: Vec::new(),
        }
    }

    pub(crate) fn follower(&self) -> MemberId {
        self.follower
    }

    pub(crate) fn drivers(&self) -> &[MemberId] {
        &self.drivers
    }

    pub(crate) fn add_driver(&mut self, driver: MemberId) {
        if !self.drivers.contains(&driver) {
            self.drivers.push(driver);
        }
    }

    /// Returns true once no driver is left
    pub(crate) fn remove_driver(&mut self, driver: MemberId) -> bool {
        self.drivers.retain(|d| *d != driver);
        self.drivers.is_empty()
    }

    /// Unanimous direction of all drivers, or `Idle` if any two disagree
    pub(crate) fn common_direction(
        &self,
        direction_of: impl Fn(MemberId) -> Option<ScrollDirection>,
    ) -> ScrollDirection {
        let mut common: Option<ScrollDirection> = None;
        for direction in self.drivers.iter().filter_map(|d| direction_of(*d)) {
            match common {
                None => common = Some(direction),
                Some(existing) if existing != direction => return ScrollDirection::Idle,
                Some(_) => {}
            }
        }
        common.unwrap_or(ScrollDirection::Idle)
    }
}

impl GroupInner {
    /// Register `driver` on `follower`'s sync activity, installing one if the
    /// follower is not already mirroring someone
    pub(crate) fn link(&mut self, follower: MemberId, driver: MemberId) -> Option<ActivityId> {
        let motion = self.position(follower)?.motion;
        let activity = match motion {
            Motion::Sync(id) if self.activities.contains_key(id) => id,
            _ => {
                let id = self.activities.insert(SyncActivity::new(follower));
                self.begin_motion(follower, Motion::Sync(id));
                tracing::trace!(?follower, ?driver, "Installed sync activity");
                id
            }
        };
        self.activities[activity].add_driver(driver);
        Some(activity)
    }

    /// Drop `driver` from `activity`; the follower goes idle once nobody drives it
    pub(crate) fn unlink(&mut self, activity: ActivityId, driver: MemberId) {
        let Some(sync) = self.activities.get_mut(activity) else {
            return;
        };
        if sync.remove_driver(driver) {
            let follower = sync.follower();
            tracing::trace!(?follower, "Last driver unlinked, follower going idle");
            self.begin_motion(follower, Motion::Idle);
        }
    }

    /// Continuous mirror of a driver's move
    pub(crate) fn activity_move_to(&mut self, activity: ActivityId, value: f64) {
        if let Some(follower) = self.refresh_follower_direction(activity) {
            if let Some(position) = self.position_mut(follower) {
                position.viewport.set_offset_internal(value);
            }
        }
    }

    /// Discrete mirror of a driver's jump
    pub(crate) fn activity_jump_to(&mut self, activity: ActivityId, value: f64) {
        if let Some(follower) = self.refresh_follower_direction(activity) {
            if let Some(position) = self.position_mut(follower) {
                position.viewport.jump_internal(value);
            }
        }
    }

    /// Recompute the follower's direction from its current drivers
    fn refresh_follower_direction(&mut self, activity: ActivityId) -> Option<MemberId> {
        let sync = self.activities.get(activity)?;
        let direction = sync.common_direction(|driver| {
            self.position(driver).map(|p| p.viewport.direction())
        });
        let follower = sync.follower();
        self.position_mut(follower)?.viewport.set_direction(direction);
        Some(follower)
    }

    /// Discard a follower's activity, severing it from every driver
    pub(crate) fn dispose_activity(&mut self, activity: ActivityId) {
        let Some(sync) = self.activities.remove(activity) else {
            return;
        };
        for driver in sync.drivers() {
            if let Some(position) = self.position_mut(*driver) {
                position.peer_activities.retain(|a| *a != activity);
            }
        }
    }
}
