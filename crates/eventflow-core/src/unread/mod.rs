//! Unread badge management.
//!
//! One manager owns every rendered unread indicator. Page regions register
//! named surfaces; the manager projects a single authoritative count onto
//! all of them, so independently rendered fragments cannot disagree about
//! what the badge says.

pub mod sync;

pub use sync::UnreadSyncService;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::error::Result;

/// Largest count a badge shows literally; anything above renders "99+".
pub const BADGE_DISPLAY_CAP: i64 = 99;

/// Visual state derived from an unread count. Pure data: everything a
/// surface needs to draw itself, nothing about how it draws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeView {
    /// Hidden entirely at zero
    pub visible: bool,
    /// Display text: "" when hidden, "1".."99", or "99+"
    pub text: String,
    /// Accessible label carrying the exact count
    pub label: String,
    /// The exact count the view was built from
    pub count: i64,
}

impl BadgeView {
    pub fn for_count(count: i64) -> Self {
        let count = count.max(0);
        let text = if count == 0 {
            String::new()
        } else if count > BADGE_DISPLAY_CAP {
            "99+".to_string()
        } else {
            count.to_string()
        };
        let label = match count {
            0 => "No unread messages".to_string(),
            1 => "1 unread message".to_string(),
            n => format!("{n} unread messages"),
        };
        Self {
            visible: count > 0,
            text,
            label,
            count,
        }
    }
}

/// A render target for the badge. Implementations draw the given view; they
/// never compute counts themselves.
pub trait BadgeSurface: Send {
    fn render(&mut self, view: &BadgeView);
}

impl<F> BadgeSurface for F
where
    F: FnMut(&BadgeView) + Send,
{
    fn render(&mut self, view: &BadgeView) {
        self(view)
    }
}

/// Sink for the window title, the app-chrome counterpart of a badge.
pub trait WindowTitle: Send {
    fn set_title(&mut self, title: &str);
}

/// Which top-level view the user is on. The title only carries the unread
/// prefix while the inbox is in the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveView {
    Inbox,
    Other,
}

/// Where refreshes get their authoritative count. The REST client is the
/// production source; tests substitute fakes.
#[async_trait]
pub trait UnreadCountSource: Send + Sync {
    async fn fetch_unread_count(&self) -> Result<i64>;
}

#[async_trait]
impl UnreadCountSource for ApiClient {
    async fn fetch_unread_count(&self) -> Result<i64> {
        ApiClient::fetch_unread_count(self).await
    }
}

/// Owner of the authoritative unread count and every surface rendering it.
///
/// Updates are idempotent: re-applying the current count re-renders
/// nothing. Refresh failures keep the last known good count, so a flaky
/// network can never blank a badge that was correct a second ago.
pub struct UnreadBadgeManager {
    surfaces: Vec<(String, Box<dyn BadgeSurface>)>,
    title: Option<Box<dyn WindowTitle>>,
    base_title: String,
    active_view: ActiveView,
    count: i64,
    rendered: Option<BadgeView>,
}

impl UnreadBadgeManager {
    pub fn new() -> Self {
        Self {
            surfaces: Vec::new(),
            title: None,
            base_title: String::new(),
            active_view: ActiveView::Other,
            count: 0,
            rendered: None,
        }
    }

    /// Register a named surface. A late-joining surface is painted with the
    /// current state immediately, so it can never disagree with the rest of
    /// the page. Re-registering a name replaces the previous surface.
    pub fn register(&mut self, name: impl Into<String>, mut surface: Box<dyn BadgeSurface>) {
        let name = name.into();
        surface.render(&self.current_view());
        if let Some(slot) = self.surfaces.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = surface;
        } else {
            self.surfaces.push((name, surface));
        }
    }

    /// Attach the window-title sink. `base_title` is what the title reads
    /// when no unread prefix applies.
    pub fn set_title_sink(&mut self, sink: Box<dyn WindowTitle>, base_title: impl Into<String>) {
        self.title = Some(sink);
        self.base_title = base_title.into();
        let view = self.current_view();
        self.apply_title(&view);
    }

    /// Record a foreground view change and rewrite the title accordingly.
    pub fn set_active_view(&mut self, view: ActiveView) {
        if self.active_view == view {
            return;
        }
        self.active_view = view;
        let badge = self.current_view();
        self.apply_title(&badge);
    }

    /// Apply an absolute count to every surface. Negative counts are
    /// invalid input from a buggy producer and are ignored with a warning;
    /// the previous state stays up.
    pub fn update_all(&mut self, count: i64) {
        if count < 0 {
            warn!(count, "ignoring invalid unread count");
            return;
        }
        self.count = count;
        let view = BadgeView::for_count(count);
        if self.rendered.as_ref() == Some(&view) {
            return;
        }
        debug!(count, surfaces = self.surfaces.len(), "badge updated");
        for (_, surface) in &mut self.surfaces {
            surface.render(&view);
        }
        self.apply_title(&view);
        self.rendered = Some(view);
    }

    /// Re-fetch the authoritative count and apply it. On failure the last
    /// known good count stays rendered. The request timeout is bounded by
    /// the source, so a stalled network cannot wedge the caller.
    pub async fn refresh(&mut self, source: &dyn UnreadCountSource) -> i64 {
        match source.fetch_unread_count().await {
            Ok(count) => self.update_all(count),
            Err(err) => {
                warn!(error = %err, "unread refresh failed, keeping last known count");
            }
        }
        self.count
    }

    /// The count currently rendered everywhere.
    pub fn count(&self) -> i64 {
        self.count
    }

    fn current_view(&self) -> BadgeView {
        self.rendered
            .clone()
            .unwrap_or_else(|| BadgeView::for_count(self.count))
    }

    fn apply_title(&mut self, view: &BadgeView) {
        let Some(sink) = self.title.as_mut() else {
            return;
        };
        let title = if self.active_view == ActiveView::Inbox && view.count > 0 {
            format!("({}) {}", view.count, self.base_title)
        } else {
            self.base_title.clone()
        };
        sink.set_title(&title);
    }
}

impl Default for UnreadBadgeManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recording_surface(log: &Arc<Mutex<Vec<BadgeView>>>) -> Box<dyn BadgeSurface> {
        let log = Arc::clone(log);
        Box::new(move |view: &BadgeView| log.lock().push(view.clone()))
    }

    struct RecordingTitle(Arc<Mutex<Vec<String>>>);

    impl WindowTitle for RecordingTitle {
        fn set_title(&mut self, title: &str) {
            self.0.lock().push(title.to_string());
        }
    }

    struct FixedSource(i64);

    #[async_trait]
    impl UnreadCountSource for FixedSource {
        async fn fetch_unread_count(&self) -> Result<i64> {
            Ok(self.0)
        }
    }

    struct FailingSource;

    #[async_trait]
    impl UnreadCountSource for FailingSource {
        async fn fetch_unread_count(&self) -> Result<i64> {
            Err(CoreError::Api {
                status: 503,
                message: "unavailable".to_string(),
            })
        }
    }

    #[test]
    fn test_view_hides_at_zero() {
        let view = BadgeView::for_count(0);
        assert!(!view.visible);
        assert_eq!(view.text, "");
        assert_eq!(view.label, "No unread messages");
    }

    #[test]
    fn test_view_caps_display_at_99() {
        assert_eq!(BadgeView::for_count(99).text, "99");
        assert_eq!(BadgeView::for_count(100).text, "99+");
        assert_eq!(BadgeView::for_count(250).text, "99+");
    }

    #[test]
    fn test_view_label_keeps_exact_count_past_cap() {
        let view = BadgeView::for_count(142);
        assert_eq!(view.text, "99+");
        assert_eq!(view.label, "142 unread messages");
        assert_eq!(view.count, 142);
    }

    #[test]
    fn test_view_singular_label() {
        assert_eq!(BadgeView::for_count(1).label, "1 unread message");
    }

    #[test]
    fn test_update_all_fans_out_to_every_surface() {
        let nav = Arc::new(Mutex::new(Vec::new()));
        let menu = Arc::new(Mutex::new(Vec::new()));
        let mut manager = UnreadBadgeManager::new();
        manager.register("navbar", recording_surface(&nav));
        manager.register("mobile_menu", recording_surface(&menu));

        manager.update_all(5);

        assert_eq!(nav.lock().last().unwrap().text, "5");
        assert_eq!(menu.lock().last().unwrap().text, "5");
    }

    #[test]
    fn test_update_is_idempotent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = UnreadBadgeManager::new();
        manager.register("navbar", recording_surface(&log));

        manager.update_all(5);
        let renders_after_first = log.lock().len();
        manager.update_all(5);

        assert_eq!(log.lock().len(), renders_after_first);
        assert_eq!(manager.count(), 5);
    }

    #[test]
    fn test_negative_count_is_ignored() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = UnreadBadgeManager::new();
        manager.register("navbar", recording_surface(&log));

        manager.update_all(7);
        let renders = log.lock().len();
        manager.update_all(-3);

        assert_eq!(manager.count(), 7);
        assert_eq!(log.lock().len(), renders);
    }

    #[test]
    fn test_late_surface_is_painted_on_register() {
        let mut manager = UnreadBadgeManager::new();
        manager.update_all(9);

        let late = Arc::new(Mutex::new(Vec::new()));
        manager.register("inbox_tab", recording_surface(&late));

        assert_eq!(late.lock().last().unwrap().text, "9");
    }

    #[test]
    fn test_reregistering_a_name_replaces_the_surface() {
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));
        let mut manager = UnreadBadgeManager::new();
        manager.register("navbar", recording_surface(&first));
        manager.register("navbar", recording_surface(&second));

        manager.update_all(3);

        assert_eq!(first.lock().len(), 1);
        assert_eq!(second.lock().last().unwrap().text, "3");
    }

    #[test]
    fn test_title_prefix_only_on_inbox_view() {
        let titles = Arc::new(Mutex::new(Vec::new()));
        let mut manager = UnreadBadgeManager::new();
        manager.set_title_sink(
            Box::new(RecordingTitle(Arc::clone(&titles))),
            "EventFlow",
        );

        manager.update_all(4);
        assert_eq!(titles.lock().last().unwrap(), "EventFlow");

        manager.set_active_view(ActiveView::Inbox);
        assert_eq!(titles.lock().last().unwrap(), "(4) EventFlow");

        manager.set_active_view(ActiveView::Other);
        assert_eq!(titles.lock().last().unwrap(), "EventFlow");
    }

    #[test]
    fn test_title_clears_when_count_drops_to_zero() {
        let titles = Arc::new(Mutex::new(Vec::new()));
        let mut manager = UnreadBadgeManager::new();
        manager.set_title_sink(
            Box::new(RecordingTitle(Arc::clone(&titles))),
            "EventFlow",
        );
        manager.set_active_view(ActiveView::Inbox);

        manager.update_all(2);
        assert_eq!(titles.lock().last().unwrap(), "(2) EventFlow");

        manager.update_all(0);
        assert_eq!(titles.lock().last().unwrap(), "EventFlow");
    }

    #[tokio::test]
    async fn test_refresh_applies_fetched_count() {
        let mut manager = UnreadBadgeManager::new();
        let count = manager.refresh(&FixedSource(11)).await;
        assert_eq!(count, 11);
        assert_eq!(manager.count(), 11);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_last_known_count() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = UnreadBadgeManager::new();
        manager.register("navbar", recording_surface(&log));
        manager.update_all(6);

        let count = manager.refresh(&FailingSource).await;

        assert_eq!(count, 6);
        assert_eq!(manager.count(), 6);
        assert_eq!(log.lock().last().unwrap().text, "6");
    }
}
