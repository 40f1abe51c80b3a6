//! Visibility policy and event routing for the highlight overlay.
//!
//! ```text
//! Unmounted --mount (enabled)--> Visible --dismiss | navigation--> Hidden
//! Unmounted --mount (disabled)-------------------------------> Hidden
//! ```
//!
//! `Hidden` is terminal for the instance. Work the overlay cannot do itself
//! (network, listener registration, opening links) is returned as an
//! [`Effect`] for the host to carry out.

use crate::config::OverlayConfig;
use crate::drag::{self, DragController, PointerEvent};
use crate::error::FetchError;
use crate::fetch::{ActivationToken, FetchController, FetchJob, FetchState};
use crate::model::{HighlightCollection, Point};
use crate::view::{OverlayBody, OverlayView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unmounted,
    Hidden,
    Visible,
}

#[derive(Debug, Clone)]
pub enum Message {
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
    /// Render frame boundary.
    Frame,
    Dismiss,
    Reselect,
    OpenReview,
    NavigationStart,
    FetchCompleted {
        token: ActivationToken,
        result: Result<HighlightCollection, FetchError>,
    },
}

#[derive(Debug, Clone)]
pub enum Effect {
    None,
    /// Perform this request once and report back with `FetchCompleted`.
    Fetch(FetchJob),
    AttachGlobalListeners,
    DetachGlobalListeners,
    /// Open this URL in a new browsing context.
    OpenLink(String),
}

impl From<drag::Effect> for Effect {
    fn from(effect: drag::Effect) -> Self {
        match effect {
            drag::Effect::None => Effect::None,
            drag::Effect::AttachGlobalListeners => Effect::AttachGlobalListeners,
            drag::Effect::DetachGlobalListeners => Effect::DetachGlobalListeners,
        }
    }
}

#[derive(Debug, Default)]
pub struct OverlayLifecycle {
    mounted: bool,
    torn_down: bool,
    feature_enabled: bool,
    user_dismissed: bool,
    review_url: String,
    fetch: FetchController,
    drag: DragController,
}

impl OverlayLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if !self.mounted {
            Phase::Unmounted
        } else if self.is_visible() {
            Phase::Visible
        } else {
            Phase::Hidden
        }
    }

    pub fn is_visible(&self) -> bool {
        self.mounted && self.feature_enabled && !self.user_dismissed
    }

    pub fn fetch_state(&self) -> &FetchState {
        self.fetch.state()
    }

    pub fn position(&self) -> Point {
        self.drag.position()
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    /// The environment is ready: set the mounted flag, then activate the
    /// fetch if the feature is on. Later calls are ignored.
    pub fn mount(&mut self, config: &OverlayConfig) -> Effect {
        if self.mounted || self.torn_down {
            tracing::debug!("overlay already mounted, ignoring");
            return Effect::None;
        }

        self.mounted = true;
        self.feature_enabled = config.enabled;
        self.review_url = config.review_url.clone();

        if !config.enabled {
            tracing::info!("highlight overlay disabled");
            return Effect::None;
        }

        tracing::info!("highlight overlay mounted");
        match self.fetch.activate(config) {
            Some(job) => Effect::Fetch(job),
            None => Effect::None,
        }
    }

    pub fn handle(&mut self, msg: Message) -> Effect {
        match msg {
            Message::PointerDown(event) => {
                if !self.is_visible() {
                    return Effect::None;
                }
                self.drag.on_pointer_down(&event).into()
            }
            Message::PointerMove(event) => {
                self.drag.on_pointer_move(&event);
                Effect::None
            }
            Message::PointerUp(event) => self.drag.on_pointer_up(&event).into(),
            Message::Frame => {
                self.drag.on_frame();
                Effect::None
            }
            Message::Dismiss => self.close("dismissed by user"),
            Message::NavigationStart => self.close("navigation started"),
            Message::Reselect => {
                if let Some(index) = self.fetch.reselect() {
                    tracing::debug!(index, "reselected highlight");
                }
                Effect::None
            }
            Message::OpenReview => {
                if self.is_visible() {
                    Effect::OpenLink(self.review_url.clone())
                } else {
                    Effect::None
                }
            }
            Message::FetchCompleted { token, result } => {
                self.fetch.complete(&token, result);
                Effect::None
            }
        }
    }

    fn close(&mut self, reason: &'static str) -> Effect {
        if !self.user_dismissed {
            tracing::info!(reason, "closing highlight overlay");
        }
        self.user_dismissed = true;
        // The drag surface is gone with the overlay.
        self.drag.teardown().into()
    }

    pub fn view(&self) -> Option<OverlayView> {
        if !self.is_visible() {
            return None;
        }
        Some(OverlayView {
            offset: self.drag.position(),
            body: OverlayBody::from_state(self.fetch.state()),
            review_url: self.review_url.clone(),
        })
    }

    /// End of the instance. Any in-flight fetch result is discarded.
    pub fn teardown(&mut self) -> Effect {
        self.mounted = false;
        self.torn_down = true;
        self.fetch.cancel();
        self.drag.teardown().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HighlightItem;

    fn config(enabled: bool, api_key: Option<&str>) -> OverlayConfig {
        OverlayConfig {
            enabled,
            api_key: api_key.map(str::to_string),
            ..OverlayConfig::default()
        }
    }

    fn collection(texts: &[&str]) -> HighlightCollection {
        HighlightCollection::new(
            texts
                .iter()
                .map(|text| HighlightItem {
                    text: text.to_string(),
                    title: "unknown".to_string(),
                    author: None,
                })
                .collect(),
        )
    }

    fn mounted_with_job() -> (OverlayLifecycle, FetchJob) {
        let mut overlay = OverlayLifecycle::new();
        match overlay.mount(&config(true, Some("X"))) {
            Effect::Fetch(job) => (overlay, job),
            other => panic!("expected a fetch, got {other:?}"),
        }
    }

    #[test]
    fn test_unmounted_renders_nothing() {
        let overlay = OverlayLifecycle::new();
        assert_eq!(overlay.phase(), Phase::Unmounted);
        assert!(overlay.view().is_none());
        assert_eq!(overlay.fetch_state(), &FetchState::Idle);
    }

    #[test]
    fn test_disabled_mount_is_hidden_without_fetch() {
        let mut overlay = OverlayLifecycle::new();
        assert!(matches!(overlay.mount(&config(false, Some("X"))), Effect::None));
        assert_eq!(overlay.phase(), Phase::Hidden);
        assert!(overlay.view().is_none());
        assert_eq!(overlay.fetch_state(), &FetchState::Idle);
    }

    #[test]
    fn test_missing_credential_shows_error_without_fetch() {
        let mut overlay = OverlayLifecycle::new();
        assert!(matches!(overlay.mount(&config(true, None)), Effect::None));
        let view = overlay.view().unwrap();
        assert_eq!(view.body, OverlayBody::Error("missing credential".to_string()));
    }

    #[test]
    fn test_mount_activates_once() {
        let (mut overlay, _job) = mounted_with_job();
        assert_eq!(overlay.phase(), Phase::Visible);
        assert_eq!(overlay.view().unwrap().body, OverlayBody::Spinner);
        assert!(matches!(overlay.mount(&config(true, Some("X"))), Effect::None));
    }

    #[test]
    fn test_fetch_completion_shows_first_item() {
        let (mut overlay, job) = mounted_with_job();
        overlay.handle(Message::FetchCompleted {
            token: job.token,
            result: Ok(collection(&["A", "B"])),
        });
        match overlay.view().unwrap().body {
            OverlayBody::Highlight(item) => assert_eq!(item.text, "A"),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn test_dismiss_is_sticky() {
        let (mut overlay, job) = mounted_with_job();
        overlay.handle(Message::Dismiss);
        assert_eq!(overlay.phase(), Phase::Hidden);

        overlay.handle(Message::FetchCompleted {
            token: job.token,
            result: Ok(collection(&["A"])),
        });
        overlay.handle(Message::NavigationStart);
        overlay.handle(Message::Reselect);
        overlay.handle(Message::PointerDown(PointerEvent::mouse(1.0, 1.0)));
        overlay.handle(Message::PointerUp(PointerEvent::mouse(1.0, 1.0)));
        assert!(matches!(overlay.mount(&config(true, Some("X"))), Effect::None));

        assert_eq!(overlay.phase(), Phase::Hidden);
        assert!(overlay.view().is_none());
        assert!(!overlay.drag().is_tracking());
    }

    #[test]
    fn test_navigation_interrupts_drag() {
        let (mut overlay, _job) = mounted_with_job();
        let effect = overlay.handle(Message::PointerDown(PointerEvent::mouse(50.0, 50.0)));
        assert!(matches!(effect, Effect::AttachGlobalListeners));
        overlay.handle(Message::PointerMove(PointerEvent::mouse(80.0, 80.0)));

        let effect = overlay.handle(Message::NavigationStart);
        assert!(matches!(effect, Effect::DetachGlobalListeners));
        assert!(overlay.view().is_none());

        overlay.handle(Message::Frame);
        assert_eq!(overlay.position(), Point::ORIGIN);
    }

    #[test]
    fn test_drag_moves_rendered_offset() {
        let (mut overlay, _job) = mounted_with_job();
        overlay.handle(Message::PointerDown(PointerEvent::mouse(50.0, 50.0)));
        overlay.handle(Message::PointerMove(PointerEvent::mouse(60.0, 60.0)));
        overlay.handle(Message::PointerMove(PointerEvent::mouse(80.0, 80.0)));
        assert_eq!(overlay.view().unwrap().offset, Point::ORIGIN);

        overlay.handle(Message::Frame);
        assert_eq!(overlay.view().unwrap().offset, Point::new(30.0, 30.0));

        let effect = overlay.handle(Message::PointerUp(PointerEvent::mouse(80.0, 80.0)));
        assert!(matches!(effect, Effect::DetachGlobalListeners));
    }

    #[test]
    fn test_reselect_and_dismiss_available_in_error_state() {
        let (mut overlay, job) = mounted_with_job();
        overlay.handle(Message::FetchCompleted {
            token: job.token,
            result: Err(FetchError::UnexpectedStatus(500)),
        });
        overlay.handle(Message::Reselect);
        assert_eq!(
            overlay.view().unwrap().body,
            OverlayBody::Error("unexpected status 500".to_string())
        );
        overlay.handle(Message::Dismiss);
        assert!(overlay.view().is_none());
    }

    #[test]
    fn test_open_review_only_when_visible() {
        let (mut overlay, _job) = mounted_with_job();
        match overlay.handle(Message::OpenReview) {
            Effect::OpenLink(url) => assert_eq!(url, crate::config::DEFAULT_REVIEW_URL),
            other => panic!("unexpected effect {other:?}"),
        }
        overlay.handle(Message::Dismiss);
        assert!(matches!(overlay.handle(Message::OpenReview), Effect::None));
    }

    #[test]
    fn test_teardown_discards_in_flight_result() {
        let (mut overlay, job) = mounted_with_job();
        overlay.teardown();
        overlay.handle(Message::FetchCompleted {
            token: job.token,
            result: Ok(collection(&["A"])),
        });
        assert_eq!(overlay.fetch_state(), &FetchState::Loading);
        assert_eq!(overlay.phase(), Phase::Unmounted);
    }
}
