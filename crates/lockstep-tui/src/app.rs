use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use futures::future::{FutureExt, LocalBoxFuture};
use lockstep_core::sync::{
    Extent, ListenerId, Member, MotionKind, ScrollDirection, SyncGroup, Viewport, VirtualViewport,
};
use lockstep_core::AppConfig;

use crate::input::Action;
use crate::theme::Theme;

/// One document shown in its own column, scrolled by a group member
pub struct Pane {
    /// Title shown in the border
    pub title: String,
    /// Document lines
    pub lines: Vec<String>,
    member: Member,
    /// Scroll bound shared with the member's viewport
    extent: Extent,
    /// Viewport taken back from the member while the pane is detached
    parked: Option<Box<dyn Viewport>>,
    /// Visible rows, updated on every render
    viewport_height: u16,
}

impl Pane {
    /// Create a pane whose member is attached to `group` right away
    pub fn new(group: &SyncGroup, title: impl Into<String>, lines: Vec<String>) -> Self {
        let extent = Extent::new(lines.len().saturating_sub(1) as f64);
        let member = group.add_and_get();
        member.attach(VirtualViewport::bounded(extent.clone()));
        Self {
            title: title.into(),
            lines,
            member,
            extent,
            parked: None,
            viewport_height: 0,
        }
    }

    pub fn member(&self) -> &Member {
        &self.member
    }

    pub fn is_attached(&self) -> bool {
        self.parked.is_none()
    }

    /// Current offset in lines; a detached pane reports its own viewport
    pub fn offset(&self) -> f64 {
        match &self.parked {
            Some(viewport) => viewport.offset(),
            None => self.member.offset(),
        }
    }

    pub fn direction(&self) -> ScrollDirection {
        match &self.parked {
            Some(viewport) => viewport.direction(),
            None => self.member.direction(),
        }
    }

    pub fn motion(&self) -> Option<MotionKind> {
        self.member.motion()
    }

    pub fn max_offset(&self) -> f64 {
        self.extent.max_offset()
    }

    pub fn viewport_height(&self) -> u16 {
        self.viewport_height
    }

    /// Record the rows available for content and tighten the scroll bound
    pub fn set_viewport_height(&mut self, height: u16) {
        self.viewport_height = height;
        let max = self.lines.len().saturating_sub(height as usize);
        self.extent.set_max_offset(max as f64);
    }

    /// First visible line index
    pub fn top_line(&self) -> usize {
        self.offset().clamp(0.0, self.max_offset()).round() as usize
    }

    pub fn visible_lines(&self) -> &[String] {
        let start = self.top_line().min(self.lines.len());
        let end = (start + self.viewport_height as usize).min(self.lines.len());
        &self.lines[start..end]
    }

    /// Offset reached by moving `delta` lines, kept inside the document
    fn target_for(&self, delta: f64) -> f64 {
        (self.offset() + delta).clamp(0.0, self.max_offset())
    }

    /// Scroll by `delta` lines; attached panes carry their peers along
    pub fn scroll_by(&mut self, delta: f64) {
        let target = self.target_for(delta);
        match &mut self.parked {
            Some(viewport) => {
                let current = viewport.offset();
                if target != current {
                    viewport.set_direction(ScrollDirection::from_delta(target - current));
                    viewport.set_offset_internal(target);
                }
            }
            None => {
                let current = self.member.offset();
                if target != current {
                    self.member.scroll_by(target - current);
                }
            }
        }
    }

    /// Detach the member, or re-attach it in sync with the group
    ///
    /// Returns whether the pane is attached afterwards.
    pub fn toggle_attached(&mut self) -> bool {
        match self.parked.take() {
            Some(viewport) => {
                self.member.attach(viewport);
                true
            }
            None => {
                self.parked = self.member.detach();
                false
            }
        }
    }
}

/// Application state
pub struct App {
    /// Application configuration
    pub config: Arc<AppConfig>,
    pub theme: Theme,
    /// Group every attached pane scrolls with
    pub group: SyncGroup,
    pub panes: Vec<Pane>,
    /// Index of the focused pane
    pub focus: usize,
    /// Whether the app should quit
    pub should_quit: bool,
    /// Status message
    pub status_message: Option<String>,
    /// Pending key for multi-key sequences (e.g., 'gg')
    pub pending_key: Option<char>,
    /// Number of group offset change notifications seen
    offset_changes: Rc<Cell<u64>>,
    listener: ListenerId,
}

impl App {
    /// Build one pane per `(title, lines)` document
    pub fn new(config: Arc<AppConfig>, documents: Vec<(String, Vec<String>)>) -> Self {
        let group = SyncGroup::with_config(0.0, config.ui.scroll.clone());

        let offset_changes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&offset_changes);
        let listener = group.add_offset_changed_listener(move |offset| {
            counter.set(counter.get() + 1);
            tracing::trace!(offset, "Group offset changed");
        });

        let panes = documents
            .into_iter()
            .map(|(title, lines)| Pane::new(&group, title, lines))
            .collect();

        Self {
            config,
            theme: Theme::default(),
            group,
            panes,
            focus: 0,
            should_quit: false,
            status_message: None,
            pending_key: None,
            offset_changes,
            listener,
        }
    }

    pub fn focused_pane(&self) -> Option<&Pane> {
        self.panes.get(self.focus)
    }

    pub fn offset_changes(&self) -> u64 {
        self.offset_changes.get()
    }

    /// Whether any pane is mid-animation, so the UI should redraw quickly
    pub fn is_animating(&self) -> bool {
        self.panes
            .iter()
            .any(|pane| matches!(pane.motion(), Some(MotionKind::Animate | MotionKind::Sync)))
    }

    /// Move focus to the next pane (right)
    pub fn focus_right(&mut self) {
        if self.focus + 1 < self.panes.len() {
            self.focus += 1;
        }
    }

    /// Move focus to the previous pane (left)
    pub fn focus_left(&mut self) {
        self.focus = self.focus.saturating_sub(1);
    }

    /// Apply an action
    ///
    /// Animated scrolls are started here and handed back as a future; the
    /// caller spawns it so frames keep advancing while input is handled.
    pub fn handle_action(&mut self, action: Action) -> Option<LocalBoxFuture<'static, ()>> {
        if action != Action::PendingG {
            self.pending_key = None;
        }

        let lines = self.config.ui.scroll.scroll_lines.max(1) as f64;
        match action {
            Action::Quit => self.should_quit = true,
            Action::FocusLeft => self.focus_left(),
            Action::FocusRight => self.focus_right(),
            Action::ScrollDown => self.scroll_focused(lines),
            Action::ScrollUp => self.scroll_focused(-lines),
            Action::ScrollHalfPageDown => return self.animate_focused_by(self.page_size() / 2.0),
            Action::ScrollHalfPageUp => return self.animate_focused_by(-self.page_size() / 2.0),
            Action::ScrollPageDown => return self.animate_focused_by(self.page_size()),
            Action::ScrollPageUp => return self.animate_focused_by(-self.page_size()),
            Action::JumpToTop => return Some(self.animate_group_to(0.0)),
            Action::JumpToBottom => {
                let bottom = self
                    .panes
                    .iter()
                    .filter(|pane| pane.is_attached())
                    .map(Pane::max_offset)
                    .fold(0.0, f64::max);
                return Some(self.animate_group_to(bottom));
            }
            Action::PendingG => self.pending_key = Some('g'),
            Action::Reset => {
                self.group.reset_scroll();
                self.status_message = Some("Scroll reset".to_string());
            }
            Action::ToggleAttach => self.toggle_focused_attachment(),
            Action::None => {}
        }
        None
    }

    /// Rows in the focused pane
    fn page_size(&self) -> f64 {
        let height = self.focused_pane().map(Pane::viewport_height).unwrap_or(0);
        height.max(2) as f64
    }

    fn scroll_focused(&mut self, delta: f64) {
        if let Some(pane) = self.panes.get_mut(self.focus) {
            pane.scroll_by(delta);
        }
    }

    fn animate_focused_by(&mut self, delta: f64) -> Option<LocalBoxFuture<'static, ()>> {
        let scroll = &self.config.ui.scroll;
        let pane = self.panes.get_mut(self.focus)?;
        if !pane.is_attached() {
            pane.scroll_by(delta);
            return None;
        }

        let target = pane.target_for(delta);
        if target == pane.offset() {
            return None;
        }
        Some(
            pane.member()
                .animate_to(target, scroll.easing, scroll.animation_duration())
                .boxed_local(),
        )
    }

    fn animate_group_to(&self, value: f64) -> LocalBoxFuture<'static, ()> {
        let scroll = &self.config.ui.scroll;
        self.group
            .animate_to(value, scroll.easing, scroll.animation_duration())
            .boxed_local()
    }

    fn toggle_focused_attachment(&mut self) {
        let Some(pane) = self.panes.get_mut(self.focus) else {
            return;
        };
        let attached = pane.toggle_attached();
        let message = if attached {
            format!("{} re-attached at line {}", pane.title, pane.top_line())
        } else {
            format!("{} detached", pane.title)
        };
        tracing::debug!(pane = %pane.title, attached, "Toggled pane attachment");
        self.status_message = Some(message);
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.group.remove_offset_changed_listener(self.listener);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_app(panes: usize, lines: usize) -> App {
        let mut config = AppConfig::default();
        config.ui.scroll.smooth_enabled = false;
        let documents = (0..panes)
            .map(|p| {
                let body = (0..lines).map(|l| format!("pane {} line {}", p, l)).collect();
                (format!("doc{}", p), body)
            })
            .collect();

        let mut app = App::new(Arc::new(config), documents);
        for pane in &mut app.panes {
            pane.set_viewport_height(10);
        }
        app
    }

    fn offsets(app: &App) -> Vec<f64> {
        app.panes.iter().map(Pane::offset).collect()
    }

    #[test]
    fn test_line_scroll_moves_every_pane() {
        let mut app = test_app(3, 100);
        app.handle_action(Action::ScrollDown);
        app.handle_action(Action::ScrollDown);
        assert_eq!(offsets(&app), vec![2.0, 2.0, 2.0]);

        app.handle_action(Action::FocusRight);
        app.handle_action(Action::ScrollUp);
        assert_eq!(offsets(&app), vec![1.0, 1.0, 1.0]);
        assert_eq!(app.offset_changes(), 3);
    }

    #[test]
    fn test_scroll_stops_at_document_end() {
        let mut app = test_app(2, 15);
        for _ in 0..20 {
            app.handle_action(Action::ScrollDown);
        }
        assert_eq!(offsets(&app), vec![5.0, 5.0]);

        for _ in 0..20 {
            app.handle_action(Action::ScrollUp);
        }
        assert_eq!(offsets(&app), vec![0.0, 0.0]);
    }

    #[test]
    fn test_visible_lines_follow_offset() {
        let mut app = test_app(1, 30);
        app.handle_action(Action::ScrollDown);
        let pane = &app.panes[0];
        assert_eq!(pane.visible_lines().len(), 10);
        assert_eq!(pane.visible_lines()[0], "pane 0 line 1");
    }

    #[test]
    fn test_short_document_shows_everything() {
        let mut app = test_app(1, 4);
        app.panes[0].set_viewport_height(10);
        assert_eq!(app.panes[0].max_offset(), 0.0);
        assert_eq!(app.panes[0].visible_lines().len(), 4);
    }

    #[test]
    fn test_page_scroll_without_smoothing_jumps() {
        let mut app = test_app(2, 100);
        let future = app.handle_action(Action::ScrollPageDown);
        assert!(future.is_some());
        assert_eq!(offsets(&app), vec![10.0, 10.0]);

        app.handle_action(Action::ScrollHalfPageUp);
        assert_eq!(offsets(&app), vec![5.0, 5.0]);
    }

    #[test]
    fn test_group_jumps_to_longest_bottom() {
        let mut app = test_app(2, 50);
        app.panes.push(Pane::new(&app.group, "long", vec![String::new(); 80]));
        app.panes[2].set_viewport_height(10);

        app.handle_action(Action::JumpToBottom);
        assert_eq!(offsets(&app), vec![40.0, 40.0, 70.0]);

        app.handle_action(Action::PendingG);
        app.handle_action(Action::JumpToTop);
        assert_eq!(offsets(&app), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_detached_pane_scrolls_alone_and_resyncs() {
        let mut app = test_app(2, 100);
        app.handle_action(Action::ToggleAttach);
        assert!(!app.panes[0].is_attached());

        app.handle_action(Action::ScrollDown);
        assert_eq!(offsets(&app), vec![1.0, 0.0]);

        app.handle_action(Action::FocusRight);
        for _ in 0..5 {
            app.handle_action(Action::ScrollDown);
        }
        assert_eq!(offsets(&app), vec![1.0, 5.0]);

        app.handle_action(Action::FocusLeft);
        app.handle_action(Action::ToggleAttach);
        assert!(app.panes[0].is_attached());
        assert_eq!(offsets(&app), vec![5.0, 5.0]);
        assert_eq!(
            app.status_message.as_deref(),
            Some("doc0 re-attached at line 5")
        );
    }

    #[test]
    fn test_reset_returns_to_top() {
        let mut app = test_app(2, 100);
        app.handle_action(Action::ScrollPageDown);
        app.handle_action(Action::Reset);
        assert_eq!(offsets(&app), vec![0.0, 0.0]);
    }

    #[test]
    fn test_focus_stays_in_range() {
        let mut app = test_app(2, 10);
        app.handle_action(Action::FocusLeft);
        assert_eq!(app.focus, 0);
        app.handle_action(Action::FocusRight);
        app.handle_action(Action::FocusRight);
        assert_eq!(app.focus, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_smooth_page_scroll_settles_on_target() {
        let mut app = test_app(2, 100);
        let mut config = (*app.config).clone();
        config.ui.scroll.smooth_enabled = true;
        app.config = Arc::new(config.clone());
        app.group.set_config(config.ui.scroll);

        let animation = app
            .handle_action(Action::ScrollPageDown)
            .expect("page scroll animates");
        assert!(app.is_animating());

        animation.await;
        assert_eq!(offsets(&app), vec![10.0, 10.0]);
        assert!(!app.is_animating());
    }
}
