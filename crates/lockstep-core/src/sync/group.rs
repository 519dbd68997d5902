//! Sync group: membership, shared offset and group-wide motion

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use futures::future::join_all;
use slotmap::SlotMap;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::activity::{ActivityId, SyncActivity};
use super::member::{Member, MemberId, MemberSlot, Motion};
use super::notifier::{ListenerId, OffsetNotifier};
use crate::config::{EasingType, ScrollConfig};
use crate::scroll::ScrollAnimation;

/// Arena holding every member, activity and the notifier of one group
pub(crate) struct GroupInner {
    pub(crate) initial_offset: f64,
    pub(crate) config: ScrollConfig,
    pub(crate) members: SlotMap<MemberId, MemberSlot>,
    /// Creation order; the first attached entry defines the group offset
    pub(crate) order: Vec<MemberId>,
    pub(crate) activities: SlotMap<ActivityId, SyncActivity>,
    pub(crate) notifier: OffsetNotifier,
    next_token: u64,
}

impl GroupInner {
    pub(crate) fn new(initial_offset: f64, config: ScrollConfig) -> Self {
        Self {
            initial_offset,
            config,
            members: SlotMap::with_key(),
            order: Vec::new(),
            activities: SlotMap::with_key(),
            notifier: OffsetNotifier::new(initial_offset),
            next_token: 0,
        }
    }

    pub(crate) fn insert_member(&mut self) -> MemberId {
        let id = self.members.insert(MemberSlot::default());
        self.order.push(id);
        id
    }

    /// Token identifying a hold, drag or animation
    pub(crate) fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    /// Attached members in creation order
    pub(crate) fn attached_ids(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.order.iter().copied().filter(|id| self.is_attached(*id))
    }

    pub(crate) fn try_offset(&self) -> Option<f64> {
        let first = self.attached_ids().next()?;
        self.position(first).map(|p| p.viewport.offset())
    }

    /// Discrete write that bypasses linking
    pub(crate) fn jump_internal(&mut self, id: MemberId, value: f64) {
        if let Some(position) = self.position_mut(id) {
            position.viewport.jump_internal(value);
        }
    }

    /// Continuous write that bypasses linking
    pub(crate) fn move_internal(&mut self, id: MemberId, value: f64) {
        if let Some(position) = self.position_mut(id) {
            position.viewport.set_offset_internal(value);
        }
    }

    fn begin_animation(
        &mut self,
        id: MemberId,
        to: f64,
        easing: EasingType,
        duration: Duration,
        start: Instant,
    ) -> Option<AnimationRun> {
        let from = self.position(id)?.viewport.offset();
        let token = self.next_token();
        self.begin_motion(id, Motion::Animate(token));
        Some(AnimationRun {
            member: id,
            token,
            animation: ScrollAnimation::new(start, from, to, duration, easing),
        })
    }
}

/// How an animation frame reaches the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnimationMode {
    /// Through the linking protocol, so peers mirror it
    Linked,
    /// Straight to the viewport; the group is driving every member itself
    Direct,
}

/// One member's running animation
pub(crate) struct AnimationRun {
    member: MemberId,
    token: u64,
    animation: ScrollAnimation,
}

/// Coordinator keeping the offsets of its members in lockstep
///
/// Cloning is cheap and yields another handle to the same group. The group is
/// single-threaded: handles are `!Send`, and animations run on the current
/// thread (a current-thread runtime or a `LocalSet`).
#[derive(Clone)]
pub struct SyncGroup {
    inner: Rc<RefCell<GroupInner>>,
    /// Members dropped while the group was borrowed, removed on the next update
    released: Rc<RefCell<Vec<MemberId>>>,
}

impl Default for SyncGroup {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl SyncGroup {
    pub fn new(initial_offset: f64) -> Self {
        Self::with_config(initial_offset, ScrollConfig::default())
    }

    pub fn with_config(initial_offset: f64, config: ScrollConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(GroupInner::new(initial_offset, config))),
            released: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Create a detached member seeded with the group's current offset
    pub fn add_and_get(&self) -> Member {
        let id = self.inner.borrow_mut().insert_member();
        debug!(?id, "Added member");
        Member::new(self.clone(), id)
    }

    pub fn initial_offset(&self) -> f64 {
        self.read(|inner| inner.initial_offset)
    }

    pub fn config(&self) -> ScrollConfig {
        self.read(|inner| inner.config.clone())
    }

    pub fn set_config(&self, config: ScrollConfig) {
        self.inner.borrow_mut().config = config;
    }

    /// Offset of the first attached member
    ///
    /// # Panics
    /// If no member is attached.
    pub fn offset(&self) -> f64 {
        match self.try_offset() {
            Some(offset) => offset,
            None => panic!("SyncGroup::offset read with no attached member"),
        }
    }

    /// Offset of the first attached member, if any
    pub fn try_offset(&self) -> Option<f64> {
        self.read(|inner| inner.try_offset())
    }

    /// Number of members, attached or not
    pub fn len(&self) -> usize {
        self.read(|inner| inner.members.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn attached_count(&self) -> usize {
        self.read(|inner| inner.attached_ids().count())
    }

    /// Move every attached member to `value` without linking
    pub fn jump_to(&self, value: f64) {
        self.update(|inner| {
            let attached: Vec<MemberId> = inner.attached_ids().collect();
            for id in attached {
                inner.begin_motion(id, Motion::Idle);
                inner.jump_internal(id, value);
            }
        });
    }

    /// Animate every attached member to `value`
    ///
    /// All members enter their animation at the same instant, before this
    /// returns. The future resolves once every one of them has finished or
    /// been overtaken by other motion.
    pub fn animate_to(
        &self,
        value: f64,
        easing: EasingType,
        duration: Duration,
    ) -> impl Future<Output = ()> + 'static {
        let attached: Vec<MemberId> = self.read(|inner| inner.attached_ids().collect());
        let runs = self.start_animations(&attached, value, easing, duration);
        if runs.is_empty() {
            self.jump_to(value);
        }
        self.drive_animations(runs, AnimationMode::Direct)
    }

    pub fn reset_scroll(&self) {
        self.jump_to(0.0);
    }

    pub fn add_offset_changed_listener(&self, listener: impl Fn(f64) + 'static) -> ListenerId {
        self.inner.borrow_mut().notifier.add(Rc::new(listener))
    }

    pub fn remove_offset_changed_listener(&self, id: ListenerId) -> bool {
        self.inner.borrow_mut().notifier.remove(id)
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&GroupInner) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Run a mutation, then evaluate the notifier once
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut GroupInner) -> R) -> R {
        let result = {
            let mut inner = self.inner.borrow_mut();
            self.remove_released(&mut inner);
            f(&mut inner)
        };
        self.notify();
        result
    }

    /// Like [`update`](Self::update) but gives up if the group is already borrowed
    pub(crate) fn try_update<R>(&self, f: impl FnOnce(&mut GroupInner) -> R) -> Option<R> {
        let result = {
            let mut inner = self.inner.try_borrow_mut().ok()?;
            self.remove_released(&mut inner);
            f(&mut inner)
        };
        self.notify();
        Some(result)
    }

    /// Remove `id` now, or as soon as the current borrow of the group ends
    pub(crate) fn release_member(&self, id: MemberId) {
        if self.try_update(|inner| inner.remove_member(id)).is_none() {
            debug!(?id, "Group busy, deferring member release");
            self.released.borrow_mut().push(id);
        }
    }

    fn remove_released(&self, inner: &mut GroupInner) {
        let pending = std::mem::take(&mut *self.released.borrow_mut());
        for id in pending {
            inner.remove_member(id);
        }
    }

    fn notify(&self) {
        let listeners = {
            let mut inner = self.inner.borrow_mut();
            self.remove_released(&mut inner);
            let Some(offset) = inner.try_offset() else {
                return;
            };
            inner.notifier.observe(offset).map(|listeners| (offset, listeners))
        };
        if let Some((offset, listeners)) = listeners {
            trace!(offset, listeners = listeners.len(), "Group offset changed");
            for listener in listeners {
                listener(offset);
            }
        }
    }

    /// Put `members` into an animation toward `value`, all from the same instant
    ///
    /// Returns nothing when animation is disabled or the duration is zero;
    /// callers fall back to a jump.
    pub(crate) fn start_animations(
        &self,
        members: &[MemberId],
        value: f64,
        easing: EasingType,
        duration: Duration,
    ) -> Vec<AnimationRun> {
        if duration.is_zero() || !self.read(|inner| inner.config.smooth_enabled) {
            return Vec::new();
        }
        let start = Instant::now();
        let runs: Vec<AnimationRun> = self.update(|inner| {
            members
                .iter()
                .filter_map(|id| inner.begin_animation(*id, value, easing, duration, start))
                .collect()
        });
        debug!(
            members = runs.len(),
            target = value,
            duration_ms = duration.as_millis() as u64,
            ?easing,
            "Animation started"
        );
        runs
    }

    /// Drive `runs` to completion on the configured frame tick
    pub(crate) fn drive_animations(
        &self,
        runs: Vec<AnimationRun>,
        mode: AnimationMode,
    ) -> impl Future<Output = ()> + 'static {
        let group = self.clone();
        let tick = self.read(|inner| inner.config.animation_tick_duration());
        async move {
            join_all(runs.into_iter().map(|run| drive_one(group.clone(), run, tick, mode))).await;
        }
    }
}

async fn drive_one(group: SyncGroup, run: AnimationRun, tick: Duration, mode: AnimationMode) {
    loop {
        tokio::time::sleep(tick).await;
        let frame = run.animation.sample(Instant::now());

        let current = group.update(|inner| {
            if inner.motion(run.member) != Some(Motion::Animate(run.token)) {
                return false;
            }
            match mode {
                AnimationMode::Linked => {
                    inner.set_offset(run.member, frame.value);
                }
                AnimationMode::Direct => inner.move_internal(run.member, frame.value),
            }
            if frame.finished {
                inner.begin_motion(run.member, Motion::Idle);
            }
            true
        });

        if !current {
            trace!(member = ?run.member, "Animation overtaken");
            return;
        }
        if frame.finished {
            trace!(member = ?run.member, target = run.animation.target(), "Animation finished");
            return;
        }
    }
}

impl std::fmt::Debug for SyncGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("SyncGroup")
                .field("initial_offset", &inner.initial_offset)
                .field("members", &inner.members.len())
                .field("attached", &inner.attached_ids().count())
                .field("activities", &inner.activities.len())
                .field("listeners", &inner.notifier.listener_count())
                .finish(),
            Err(_) => f.debug_struct("SyncGroup").finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::CountingViewport;
    use crate::sync::{MotionKind, ScrollDirection, VirtualViewport};
    use std::cell::Cell;

    fn attached(group: &SyncGroup, n: usize) -> Vec<Member> {
        (0..n)
            .map(|_| {
                let member = group.add_and_get();
                member.attach(VirtualViewport::new());
                member
            })
            .collect()
    }

    fn counting_listener(group: &SyncGroup) -> (ListenerId, Rc<Cell<usize>>) {
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let id = group.add_offset_changed_listener(move |_| counter.set(counter.get() + 1));
        (id, hits)
    }

    #[test]
    fn test_members_created_from_initial_offset_stay_in_sync() {
        let group = SyncGroup::new(100.0);
        let a = group.add_and_get();
        a.attach(VirtualViewport::new());
        assert_eq!(a.offset(), 100.0);

        let b = group.add_and_get();
        assert_eq!(b.offset(), 100.0);
        b.attach(VirtualViewport::new());
        assert_eq!(b.offset(), 100.0);

        a.jump_to(250.0);
        assert_eq!(b.offset(), 250.0);

        group.reset_scroll();
        assert_eq!(a.offset(), 0.0);
        assert_eq!(b.offset(), 0.0);
    }

    #[test]
    fn test_new_member_joins_at_current_offset() {
        let group = SyncGroup::new(0.0);
        let members = attached(&group, 2);
        members[1].jump_to(40.0);

        let late = group.add_and_get();
        assert_eq!(late.initial_scroll_offset(), 40.0);
        late.attach(VirtualViewport::new());
        assert_eq!(late.offset(), 40.0);
        assert_eq!(group.attached_count(), 3);
    }

    #[test]
    fn test_offset_follows_first_attached_member() {
        let group = SyncGroup::new(7.0);
        let first = group.add_and_get();
        let second = group.add_and_get();
        assert_eq!(group.try_offset(), None);

        second.attach(VirtualViewport::new());
        assert_eq!(group.offset(), 7.0);

        first.attach(VirtualViewport::new());
        first.detach();
        assert_eq!(group.offset(), 7.0);
        assert_eq!(group.len(), 2);
    }

    #[test]
    #[should_panic(expected = "no attached member")]
    fn test_offset_without_members_panics() {
        let group = SyncGroup::new(0.0);
        let _detached = group.add_and_get();
        group.offset();
    }

    #[test]
    fn test_group_jump_bypasses_linking() {
        let group = SyncGroup::new(0.0);
        let mut tallies = Vec::new();
        let mut members = Vec::new();
        for _ in 0..3 {
            let member = group.add_and_get();
            let (viewport, tally) = CountingViewport::new();
            member.attach(viewport);
            tally.reset();
            tallies.push(tally);
            members.push(member);
        }

        group.jump_to(90.0);
        for (member, tally) in members.iter().zip(&tallies) {
            assert_eq!(member.offset(), 90.0);
            assert_eq!(tally.jumps.get(), 1);
            assert_eq!(tally.writes.get(), 0);
            assert_eq!(member.motion(), Some(MotionKind::Idle));
        }
        group.read(|inner| assert!(inner.activities.is_empty()));
    }

    #[test]
    fn test_group_jump_cancels_sync_links() {
        let group = SyncGroup::new(0.0);
        let members = attached(&group, 3);
        let mut drag = members[0].drag();
        drag.update(3.0);

        group.jump_to(1.0);
        assert!(!drag.is_active());
        for member in &members {
            assert_eq!(member.motion(), Some(MotionKind::Idle));
            assert_eq!(member.offset(), 1.0);
        }
        group.read(|inner| assert!(inner.activities.is_empty()));
    }

    #[test]
    fn test_notifications_are_deduplicated() {
        let group = SyncGroup::new(0.0);
        let members = attached(&group, 3);
        let (_, hits) = counting_listener(&group);

        group.jump_to(0.0);
        members[2].jump_to(0.0);
        assert_eq!(hits.get(), 0);

        group.jump_to(12.0);
        assert_eq!(hits.get(), 1);

        members[1].jump_to(30.0);
        assert_eq!(hits.get(), 2);

        let mut drag = members[2].drag();
        drag.update(1.0);
        drag.update(1.0);
        assert_eq!(hits.get(), 4);
    }

    #[test]
    fn test_nan_offset_notifies_once() {
        let group = SyncGroup::new(0.0);
        let members = attached(&group, 2);
        let (_, hits) = counting_listener(&group);

        members[0].jump_to(f64::NAN);
        assert_eq!(hits.get(), 1);

        drop(members[1].hold());
        group.jump_to(f64::NAN);
        assert_eq!(hits.get(), 1);

        group.jump_to(5.0);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_removed_listener_is_not_called() {
        let group = SyncGroup::new(0.0);
        let _members = attached(&group, 1);
        let (id, hits) = counting_listener(&group);

        assert!(group.remove_offset_changed_listener(id));
        assert!(!group.remove_offset_changed_listener(id));
        group.jump_to(5.0);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_listener_can_read_group() {
        let group = SyncGroup::new(0.0);
        let _members = attached(&group, 2);
        let seen = Rc::new(Cell::new(0.0));

        let reader = group.clone();
        let sink = Rc::clone(&seen);
        group.add_offset_changed_listener(move |offset| {
            assert_eq!(reader.offset(), offset);
            sink.set(offset);
        });

        group.jump_to(18.0);
        assert_eq!(seen.get(), 18.0);
    }

    #[test]
    fn test_released_members_leave_the_group() {
        let group = SyncGroup::new(0.0);
        let mut members = attached(&group, 2);
        members.pop().unwrap().release();
        assert_eq!(group.len(), 1);

        drop(members);
        assert!(group.is_empty());
        assert_eq!(group.try_offset(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_group_animation_lands_every_member() {
        let group = SyncGroup::new(0.0);
        let members = attached(&group, 3);

        let animation = group.animate_to(120.0, EasingType::Cubic, Duration::from_millis(200));
        for member in &members {
            assert_eq!(member.motion(), Some(MotionKind::Animate));
        }
        animation.await;

        for member in &members {
            assert_eq!(member.offset(), 120.0);
            assert_eq!(member.motion(), Some(MotionKind::Idle));
        }
        group.read(|inner| assert!(inner.activities.is_empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_group_animation_reports_intermediate_offsets() {
        let group = SyncGroup::new(0.0);
        let _members = attached(&group, 2);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        group.add_offset_changed_listener(move |offset| sink.borrow_mut().push(offset));

        group
            .animate_to(100.0, EasingType::Linear, Duration::from_millis(100))
            .await;

        let seen = seen.borrow();
        assert!(seen.len() > 1);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.last(), Some(&100.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_member_animation_drags_peers_along() {
        let group = SyncGroup::new(0.0);
        let members = attached(&group, 2);

        let animation = members[0].animate_to(-50.0, EasingType::Quintic, Duration::from_millis(150));
        let midway = async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            assert_eq!(members[0].motion(), Some(MotionKind::Animate));
            assert_eq!(members[1].motion(), Some(MotionKind::Sync));
            assert_eq!(members[1].direction(), ScrollDirection::Reverse);
            assert_eq!(members[1].offset(), members[0].offset());
        };
        tokio::join!(animation, midway);

        assert_eq!(members[0].offset(), -50.0);
        assert_eq!(members[1].offset(), -50.0);
        assert_eq!(members[1].motion(), Some(MotionKind::Idle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_overtakes_running_animation() {
        let group = SyncGroup::new(0.0);
        let members = attached(&group, 2);

        let animation = members[0].animate_to(500.0, EasingType::Linear, Duration::from_secs(1));
        members[1].jump_to(3.0);
        animation.await;

        assert_eq!(members[0].offset(), 3.0);
        assert_eq!(members[1].offset(), 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_during_group_animation() {
        let group = SyncGroup::new(0.0);
        let mut members = attached(&group, 3);

        let animation = group.animate_to(60.0, EasingType::EaseOut, Duration::from_millis(120));
        members.pop().unwrap().release();
        animation.await;

        assert_eq!(group.len(), 2);
        for member in &members {
            assert_eq!(member.offset(), 60.0);
        }
    }

    #[tokio::test]
    async fn test_disabled_animation_jumps() {
        let config = ScrollConfig {
            smooth_enabled: false,
            ..Default::default()
        };
        let group = SyncGroup::with_config(0.0, config);
        let members = attached(&group, 2);

        let animation = group.animate_to(33.0, EasingType::Cubic, Duration::from_millis(500));
        assert_eq!(members[0].offset(), 33.0);
        assert_eq!(members[1].offset(), 33.0);
        animation.await;

        let animation = members[1].animate_to(8.0, EasingType::Cubic, Duration::ZERO);
        assert_eq!(members[0].offset(), 8.0);
        animation.await;
    }
}
