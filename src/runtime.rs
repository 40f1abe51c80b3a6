//! Event loop driving one overlay instance.
//!
//! Everything runs on a single task: user input, navigation signals, frame
//! ticks and fetch completions are multiplexed through one `select!` and each
//! is handled to completion before the next. The fetch is the only work that
//! runs elsewhere; it reports back through a channel tagged with its
//! activation token.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::client::ReviewSource;
use crate::config::OverlayConfig;
use crate::drag::PointerEvent;
use crate::error::FetchError;
use crate::fetch::{ActivationToken, FetchJob};
use crate::model::HighlightCollection;
use crate::navigation::NavigationListener;
use crate::overlay::{Effect, Message, OverlayLifecycle};
use crate::view::OverlayView;

/// Input coming from the host surface.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Press on the overlay surface.
    PointerDown(PointerEvent),
    /// Document-wide move; only delivered while a drag holds the listeners.
    PointerMove(PointerEvent),
    /// Document-wide release; same delivery rule as moves.
    PointerUp(PointerEvent),
    Dismiss,
    Reselect,
    OpenReview,
}

/// The surface the overlay draws into.
pub trait OverlayHost {
    /// Called with the new view whenever it changes. `None` means draw nothing.
    fn render(&mut self, view: Option<&OverlayView>);

    fn open_link(&mut self, url: &str);
}

type Completion = (ActivationToken, Result<HighlightCollection, FetchError>);

struct LoopState {
    listeners_attached: bool,
    completions: mpsc::Sender<Completion>,
}

pub struct OverlayRuntime<S> {
    overlay: OverlayLifecycle,
    source: Arc<S>,
    config: OverlayConfig,
    frame_interval: Duration,
}

impl<S: ReviewSource + 'static> OverlayRuntime<S> {
    pub fn new(config: OverlayConfig, source: Arc<S>, frame_interval: Duration) -> Self {
        Self {
            overlay: OverlayLifecycle::new(),
            source,
            config,
            frame_interval,
        }
    }

    /// Mounts the overlay and processes events until `shutdown` fires or the
    /// event channel closes, then tears the overlay down. The navigation
    /// listener is released on return.
    pub async fn run<H: OverlayHost>(
        mut self,
        mut events: mpsc::Receiver<UiEvent>,
        mut navigation: NavigationListener,
        shutdown: CancellationToken,
        mut host: H,
    ) -> OverlayLifecycle {
        let (completions, mut completed) = mpsc::channel::<Completion>(1);
        let mut state = LoopState {
            listeners_attached: false,
            completions,
        };
        let mut navigation_open = true;
        let mut frames = tokio::time::interval(self.frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let effect = self.overlay.mount(&self.config);
        self.apply(effect, &mut state, &mut host);
        let mut last_view = self.overlay.view();
        host.render(last_view.as_ref());

        loop {
            let frame_pending = self.overlay.drag().pending_frame().is_some();
            let message = tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => route(event, &state),
                    None => break,
                },
                signal = navigation.recv(), if navigation_open => match signal {
                    Some(_) => Some(Message::NavigationStart),
                    None => {
                        tracing::debug!("router closed, no more navigation signals");
                        navigation_open = false;
                        None
                    }
                },
                Some((token, result)) = completed.recv() => Some(Message::FetchCompleted { token, result }),
                _ = frames.tick(), if frame_pending => Some(Message::Frame),
            };

            if let Some(message) = message {
                let effect = self.overlay.handle(message);
                self.apply(effect, &mut state, &mut host);
            }

            let view = self.overlay.view();
            if view != last_view {
                host.render(view.as_ref());
                last_view = view;
            }
        }

        let effect = self.overlay.teardown();
        self.apply(effect, &mut state, &mut host);
        drop(navigation);
        if last_view.is_some() {
            host.render(None);
        }
        tracing::info!("highlight overlay torn down");
        self.overlay
    }

    fn apply<H: OverlayHost>(&self, effect: Effect, state: &mut LoopState, host: &mut H) {
        match effect {
            Effect::None => {}
            Effect::Fetch(job) => self.spawn_fetch(job, state.completions.clone()),
            Effect::AttachGlobalListeners => {
                tracing::trace!("attaching global pointer listeners");
                state.listeners_attached = true;
            }
            Effect::DetachGlobalListeners => {
                tracing::trace!("detaching global pointer listeners");
                state.listeners_attached = false;
            }
            Effect::OpenLink(url) => host.open_link(&url),
        }
    }

    fn spawn_fetch(&self, job: FetchJob, completions: mpsc::Sender<Completion>) {
        tokio::spawn(perform_fetch(Arc::clone(&self.source), job, completions));
    }
}

/// Runs one job and reports back, unless the activation died meanwhile.
async fn perform_fetch<S: ReviewSource>(
    source: Arc<S>,
    job: FetchJob,
    completions: mpsc::Sender<Completion>,
) {
    let result = source.fetch_highlights(&job.api_key).await;
    if !job.token.is_live() {
        tracing::debug!("overlay gone before fetch finished, discarding result");
        return;
    }
    // The loop may have exited between the check and the send.
    let _ = completions.send((job.token, result)).await;
}

fn route(event: UiEvent, state: &LoopState) -> Option<Message> {
    match event {
        UiEvent::PointerDown(event) => Some(Message::PointerDown(event)),
        UiEvent::PointerMove(event) if state.listeners_attached => Some(Message::PointerMove(event)),
        UiEvent::PointerUp(event) if state.listeners_attached => Some(Message::PointerUp(event)),
        UiEvent::PointerMove(_) | UiEvent::PointerUp(_) => None,
        UiEvent::Dismiss => Some(Message::Dismiss),
        UiEvent::Reselect => Some(Message::Reselect),
        UiEvent::OpenReview => Some(Message::OpenReview),
    }
}
