//! Members: typed handles to one synchronized viewport
//!
//! The handle itself only stores its group and its [`MemberId`]. Everything
//! mutable lives in the group's arena as a [`Position`], and every offset
//! change funnels through the linking protocol in [`GroupInner::set_offset`]
//! and [`GroupInner::force_offset`].

use std::future::Future;
use std::time::Duration;

use slotmap::new_key_type;

use super::activity::ActivityId;
use super::group::{AnimationMode, GroupInner, SyncGroup};
use super::viewport::{MotionKind, ScrollDirection, Viewport};
use crate::config::EasingType;

new_key_type! {
    /// Stable key of a member in its group's arena
    pub struct MemberId;
}

/// Motion state installed on an attached position
///
/// Hold, drag and animation states carry the token of the gesture or
/// animation that installed them, so a stale handle can tell it has been
/// overtaken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Motion {
    Idle,
    Hold(u64),
    Drag(u64),
    Animate(u64),
    Sync(ActivityId),
}

impl Motion {
    pub(crate) fn kind(&self) -> MotionKind {
        match self {
            Motion::Idle => MotionKind::Idle,
            Motion::Hold(_) => MotionKind::Hold,
            Motion::Drag(_) => MotionKind::Drag,
            Motion::Animate(_) => MotionKind::Animate,
            Motion::Sync(_) => MotionKind::Sync,
        }
    }
}

/// Live state of an attached member
pub(crate) struct Position {
    pub(crate) viewport: Box<dyn Viewport>,
    pub(crate) motion: Motion,
    /// Activities of followers this position is currently driving
    pub(crate) peer_activities: Vec<ActivityId>,
}

#[derive(Default)]
pub(crate) struct MemberSlot {
    pub(crate) position: Option<Position>,
}

#[derive(Debug, Clone, Copy)]
enum Write {
    Continuous,
    Discrete,
}

impl GroupInner {
    pub(crate) fn position(&self, id: MemberId) -> Option<&Position> {
        self.members.get(id)?.position.as_ref()
    }

    pub(crate) fn position_mut(&mut self, id: MemberId) -> Option<&mut Position> {
        self.members.get_mut(id)?.position.as_mut()
    }

    pub(crate) fn is_attached(&self, id: MemberId) -> bool {
        self.position(id).is_some()
    }

    pub(crate) fn motion(&self, id: MemberId) -> Option<Motion> {
        self.position(id).map(|p| p.motion)
    }

    pub(crate) fn motion_kind(&self, id: MemberId) -> Option<MotionKind> {
        self.motion(id).map(|m| m.kind())
    }

    /// Attached members other than `id`, in creation order
    pub(crate) fn peers_of(&self, id: MemberId) -> Vec<MemberId> {
        self.attached_ids().filter(|m| *m != id).collect()
    }

    pub(crate) fn can_link_with_peers(&self, id: MemberId) -> bool {
        self.attached_ids().any(|m| m != id)
    }

    /// Offset a (re)attached member should start from
    pub(crate) fn initial_scroll_offset(&self) -> f64 {
        self.try_offset().unwrap_or(self.initial_offset)
    }

    /// Link `driver` into the sync activity of every other attached member
    ///
    /// Peers are enumerated here, at fan-out time, so members detached
    /// earlier in the same pass are skipped.
    pub(crate) fn link_with_peers(&mut self, driver: MemberId) -> Vec<ActivityId> {
        let mut activities = Vec::new();
        for peer in self.peers_of(driver) {
            if let Some(activity) = self.link(peer, driver) {
                if !activities.contains(&activity) {
                    activities.push(activity);
                }
            }
        }
        activities
    }

    /// Install a new motion state on `id`
    ///
    /// The position stops driving every follower it was feeding, and a
    /// previous sync activity is discarded along with its driver links.
    pub(crate) fn begin_motion(&mut self, id: MemberId, motion: Motion) {
        let Some(position) = self.position_mut(id) else {
            return;
        };
        let previous = std::mem::replace(&mut position.motion, motion);
        let driven = std::mem::take(&mut position.peer_activities);

        let kind = motion.kind();
        position.viewport.motion_changed(kind);
        if !kind.is_scrolling() && position.viewport.direction() != ScrollDirection::Idle {
            position.viewport.set_direction(ScrollDirection::Idle);
        }

        for activity in driven {
            self.unlink(activity, id);
        }
        if let Motion::Sync(activity) = previous {
            if previous != motion {
                self.dispose_activity(activity);
            }
        }
    }

    /// Continuous (gesture or animation) offset change with fan-out
    pub(crate) fn set_offset(&mut self, id: MemberId, value: f64) -> bool {
        self.apply_offset(id, value, Write::Continuous)
    }

    /// Discrete (jump) offset change with fan-out
    pub(crate) fn force_offset(&mut self, id: MemberId, value: f64) -> bool {
        self.apply_offset(id, value, Write::Discrete)
    }

    fn apply_offset(&mut self, id: MemberId, value: f64, write: Write) -> bool {
        let Some(position) = self.position_mut(id) else {
            return false;
        };
        let current = position.viewport.offset();
        if value == current {
            return false;
        }
        position
            .viewport
            .set_direction(ScrollDirection::from_delta(value - current));

        if self.can_link_with_peers(id) {
            let activities = self.link_with_peers(id);
            if let Some(position) = self.position_mut(id) {
                for activity in &activities {
                    if !position.peer_activities.contains(activity) {
                        position.peer_activities.push(*activity);
                    }
                }
            }
            for activity in activities {
                match write {
                    Write::Continuous => self.activity_move_to(activity, value),
                    Write::Discrete => self.activity_jump_to(activity, value),
                }
            }
        }

        let Some(position) = self.position_mut(id) else {
            return false;
        };
        match write {
            Write::Continuous => position.viewport.set_offset_internal(value),
            Write::Discrete => position.viewport.jump_internal(value),
        }
        true
    }

    /// Hold applied as a side effect of a peer's hold; never fans out
    pub(crate) fn hold_internal(&mut self, id: MemberId, token: u64) {
        self.begin_motion(id, Motion::Hold(token));
    }

    /// Return every member still held by `token` to idle
    pub(crate) fn release_hold(&mut self, token: u64) {
        let held: Vec<MemberId> = self
            .attached_ids()
            .filter(|id| self.motion(*id) == Some(Motion::Hold(token)))
            .collect();
        for id in held {
            self.begin_motion(id, Motion::Idle);
        }
    }

    pub(crate) fn attach_viewport(&mut self, id: MemberId, mut viewport: Box<dyn Viewport>) {
        let initial = self.initial_scroll_offset();
        let Some(slot) = self.members.get_mut(id) else {
            return;
        };
        assert!(
            slot.position.is_none(),
            "member is already attached to a viewport"
        );

        viewport.jump_internal(initial);
        viewport.set_direction(ScrollDirection::Idle);
        viewport.motion_changed(MotionKind::Idle);
        slot.position = Some(Position {
            viewport,
            motion: Motion::Idle,
            peer_activities: Vec::new(),
        });
        tracing::debug!(?id, offset = initial, "Attached viewport");
    }

    pub(crate) fn detach_viewport(&mut self, id: MemberId) -> Option<Box<dyn Viewport>> {
        self.begin_motion(id, Motion::Idle);
        let position = self.members.get_mut(id)?.position.take()?;
        tracing::debug!(?id, "Detached viewport");
        Some(position.viewport)
    }

    pub(crate) fn remove_member(&mut self, id: MemberId) {
        self.detach_viewport(id);
        self.members.remove(id);
        self.order.retain(|m| *m != id);
        tracing::debug!(?id, remaining = self.members.len(), "Released member");
    }
}

/// Handle to one synchronized viewport within a [`SyncGroup`]
///
/// Obtained from [`SyncGroup::add_and_get`]. Releasing the handle (or dropping
/// it) removes the member from the group.
pub struct Member {
    group: SyncGroup,
    id: MemberId,
}

impl Member {
    pub(crate) fn new(group: SyncGroup, id: MemberId) -> Self {
        Self { group, id }
    }

    pub fn id(&self) -> MemberId {
        self.id
    }

    pub fn group(&self) -> &SyncGroup {
        &self.group
    }

    /// Bind a host viewport, seeding it with [`initial_scroll_offset`](Self::initial_scroll_offset)
    ///
    /// # Panics
    /// If the member is already attached.
    pub fn attach(&self, viewport: impl Viewport + 'static) {
        let viewport: Box<dyn Viewport> = Box::new(viewport);
        self.group
            .update(|inner| inner.attach_viewport(self.id, viewport));
    }

    /// Unbind the viewport and hand it back to the host
    pub fn detach(&self) -> Option<Box<dyn Viewport>> {
        self.group.update(|inner| inner.detach_viewport(self.id))
    }

    pub fn is_attached(&self) -> bool {
        self.group.read(|inner| inner.is_attached(self.id))
    }

    /// Current offset; a detached member reports the offset it would attach at
    pub fn offset(&self) -> f64 {
        self.group.read(|inner| match inner.position(self.id) {
            Some(position) => position.viewport.offset(),
            None => inner.initial_scroll_offset(),
        })
    }

    pub fn direction(&self) -> ScrollDirection {
        self.group.read(|inner| {
            inner
                .position(self.id)
                .map(|p| p.viewport.direction())
                .unwrap_or_default()
        })
    }

    /// Current motion state, `None` while detached
    pub fn motion(&self) -> Option<MotionKind> {
        self.group.read(|inner| inner.motion_kind(self.id))
    }

    /// The group's offset if any member is attached, else its initial offset
    pub fn initial_scroll_offset(&self) -> f64 {
        self.group.read(|inner| inner.initial_scroll_offset())
    }

    /// True iff at least one other member is attached
    pub fn can_link_with_peers(&self) -> bool {
        self.group.read(|inner| inner.can_link_with_peers(self.id))
    }

    /// Jump to `value`; every attached peer follows
    pub fn jump_to(&self, value: f64) {
        self.group.update(|inner| {
            if !inner.is_attached(self.id) {
                return;
            }
            inner.begin_motion(self.id, Motion::Idle);
            inner.force_offset(self.id, value);
            inner.begin_motion(self.id, Motion::Idle);
        });
    }

    /// Pointer or keyboard scroll by `delta`; every attached peer follows
    pub fn scroll_by(&self, delta: f64) {
        self.group.update(|inner| {
            let Some(current) = inner.position(self.id).map(|p| p.viewport.offset()) else {
                return;
            };
            inner.begin_motion(self.id, Motion::Idle);
            inner.set_offset(self.id, current + delta);
            inner.begin_motion(self.id, Motion::Idle);
        });
    }

    /// Animate this member to `value`; peers follow every frame through linking
    ///
    /// The animation starts immediately. The returned future drives it and
    /// resolves once it finishes or another motion overtakes it. It does not
    /// borrow the member, so it can be spawned on a `LocalSet`.
    pub fn animate_to(
        &self,
        value: f64,
        easing: EasingType,
        duration: Duration,
    ) -> impl Future<Output = ()> + 'static {
        let runs = self.group.start_animations(&[self.id], value, easing, duration);
        if runs.is_empty() {
            self.jump_to(value);
        }
        self.group.drive_animations(runs, AnimationMode::Linked)
    }

    /// Start a gesture hold on this member and, one level deep, on every peer
    pub fn hold(&self) -> Hold {
        let token = self.group.update(|inner| {
            if !inner.is_attached(self.id) {
                return None;
            }
            let token = inner.next_token();
            for peer in inner.peers_of(self.id) {
                inner.hold_internal(peer, token);
            }
            inner.begin_motion(self.id, Motion::Hold(token));
            tracing::trace!(member = ?self.id, token, "Hold started");
            Some(token)
        });
        Hold {
            group: self.group.clone(),
            token,
        }
    }

    /// Start a user drag on this member
    pub fn drag(&self) -> Drag {
        let token = self.group.update(|inner| {
            if !inner.is_attached(self.id) {
                return None;
            }
            let token = inner.next_token();
            inner.begin_motion(self.id, Motion::Drag(token));
            Some(token)
        });
        Drag {
            group: self.group.clone(),
            member: self.id,
            token,
        }
    }

    /// Remove the member from its group
    pub fn release(self) {
        drop(self);
    }
}

impl std::fmt::Debug for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Member").field("id", &self.id).finish()
    }
}

impl Drop for Member {
    fn drop(&mut self) {
        self.group.release_member(self.id);
    }
}

/// Gesture hold spanning a member and its peers
///
/// Releasing (or dropping) the handle returns every member that is still in
/// this hold to idle. Members that have since started other motion are left
/// alone.
#[must_use = "dropping a Hold releases it immediately"]
pub struct Hold {
    group: SyncGroup,
    token: Option<u64>,
}

impl Hold {
    /// Whether any member is still held by this gesture
    pub fn is_active(&self) -> bool {
        let Some(token) = self.token else {
            return false;
        };
        self.group.read(|inner| {
            inner
                .attached_ids()
                .any(|id| inner.motion(id) == Some(Motion::Hold(token)))
        })
    }

    pub fn release(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if let Some(token) = self.token.take() {
            let released = self.group.try_update(|inner| inner.release_hold(token));
            if released.is_none() {
                tracing::warn!(token, "Group busy while releasing hold");
            }
        }
    }
}

impl Drop for Hold {
    fn drop(&mut self) {
        self.finish();
    }
}

/// User drag on one member
///
/// Each [`update`](Self::update) moves the member through the linking
/// protocol. Ending (or dropping) the drag returns the member to idle if the
/// drag is still current, which also releases the followers it was driving.
#[must_use = "dropping a Drag ends it immediately"]
pub struct Drag {
    group: SyncGroup,
    member: MemberId,
    token: Option<u64>,
}

impl Drag {
    pub fn is_active(&self) -> bool {
        let Some(token) = self.token else {
            return false;
        };
        self.group
            .read(|inner| inner.motion(self.member) == Some(Motion::Drag(token)))
    }

    /// Move by `delta`; ignored once the drag has been overtaken
    pub fn update(&mut self, delta: f64) {
        let Some(token) = self.token else {
            return;
        };
        let member = self.member;
        self.group.update(|inner| {
            if inner.motion(member) != Some(Motion::Drag(token)) {
                return;
            }
            if let Some(current) = inner.position(member).map(|p| p.viewport.offset()) {
                inner.set_offset(member, current + delta);
            }
        });
    }

    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        let member = self.member;
        let ended = self.group.try_update(|inner| {
            if inner.motion(member) == Some(Motion::Drag(token)) {
                inner.begin_motion(member, Motion::Idle);
            }
        });
        if ended.is_none() {
            tracing::warn!(?member, "Group busy while ending drag");
        }
    }
}

impl Drop for Drag {
    fn drop(&mut self) {
        self.finish();
    }
}
