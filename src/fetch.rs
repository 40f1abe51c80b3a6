//! One-shot retrieval lifecycle and the rotating selection over its result.
//!
//! ```text
//! Idle --activate--> Loading --complete(Ok, non-empty)--> Ready { selected: 0 }
//!   |                   \-----complete(Err | empty)-----> Failed
//!   \--activate without credential--------------------> Failed
//! ```
//!
//! The request itself is performed by the host: `activate` hands back a
//! [`FetchJob`] and the host reports the outcome through [`FetchController::complete`].

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::config::OverlayConfig;
use crate::error::FetchError;
use crate::model::{HighlightCollection, HighlightItem};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Failed(FetchError),
    Ready {
        collection: HighlightCollection,
        selected: usize,
    },
}

/// Identifies one activation. Results carrying a cancelled or superseded
/// token are discarded.
#[derive(Debug, Clone)]
pub struct ActivationToken {
    generation: u64,
    liveness: CancellationToken,
}

impl ActivationToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_live(&self) -> bool {
        !self.liveness.is_cancelled()
    }
}

/// A request the host must perform exactly once.
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub token: ActivationToken,
    pub api_key: String,
}

#[derive(Debug, Default)]
pub struct FetchController {
    state: FetchState,
    current: Option<ActivationToken>,
    generation: u64,
}

impl FetchController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn in_flight(&self) -> bool {
        matches!(self.state, FetchState::Loading)
            && self.current.as_ref().is_some_and(ActivationToken::is_live)
    }

    /// Starts the retrieval for this activation.
    ///
    /// Returns `None` when there is nothing to request: the feature is off,
    /// the credential is missing, or a request is already outstanding.
    pub fn activate(&mut self, config: &OverlayConfig) -> Option<FetchJob> {
        if !config.enabled {
            return None;
        }

        if self.in_flight() {
            tracing::debug!("activation ignored, fetch already in flight");
            return None;
        }

        let Some(api_key) = config.credential() else {
            tracing::warn!("overlay enabled without an api key");
            self.current = None;
            self.state = FetchState::Failed(FetchError::MissingCredential);
            return None;
        };

        self.generation += 1;
        let token = ActivationToken {
            generation: self.generation,
            liveness: CancellationToken::new(),
        };
        self.current = Some(token.clone());
        self.state = FetchState::Loading;
        tracing::info!(generation = self.generation, "fetching review highlights");

        Some(FetchJob {
            token,
            api_key: api_key.to_string(),
        })
    }

    /// Applies the outcome of a job. Returns `false` when the result was
    /// stale and dropped.
    pub fn complete(
        &mut self,
        token: &ActivationToken,
        result: Result<HighlightCollection, FetchError>,
    ) -> bool {
        let is_current = self
            .current
            .as_ref()
            .is_some_and(|current| current.generation == token.generation);
        if !token.is_live() || !is_current || !matches!(self.state, FetchState::Loading) {
            tracing::debug!(generation = token.generation, "dropping stale fetch result");
            return false;
        }

        self.current = None;
        self.state = match result {
            Ok(collection) if collection.is_empty() => {
                tracing::warn!("review feed returned no highlights");
                FetchState::Failed(FetchError::EmptyResult)
            }
            Ok(collection) => {
                tracing::info!(count = collection.len(), "review highlights loaded");
                FetchState::Ready {
                    collection,
                    selected: 0,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch review highlights");
                FetchState::Failed(e)
            }
        };
        true
    }

    /// Invalidates the outstanding activation, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.liveness.cancel();
        }
    }

    pub fn reselect(&mut self) -> Option<usize> {
        self.reselect_with(&mut rand::thread_rng())
    }

    /// Picks a new index uniformly at random; the previous one may repeat.
    pub fn reselect_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        match &mut self.state {
            FetchState::Ready {
                collection,
                selected,
            } => {
                *selected = rng.gen_range(0..collection.len());
                Some(*selected)
            }
            _ => None,
        }
    }

    pub fn selected_item(&self) -> Option<&HighlightItem> {
        match &self.state {
            FetchState::Ready {
                collection,
                selected,
            } => collection.get(*selected),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn enabled(api_key: Option<&str>) -> OverlayConfig {
        OverlayConfig {
            enabled: true,
            api_key: api_key.map(str::to_string),
            ..OverlayConfig::default()
        }
    }

    fn items(texts: &[&str]) -> HighlightCollection {
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

    fn ready(texts: &[&str]) -> FetchController {
        let mut fetch = FetchController::new();
        let job = fetch.activate(&enabled(Some("X"))).unwrap();
        assert!(fetch.complete(&job.token, Ok(items(texts))));
        fetch
    }

    #[test]
    fn test_disabled_does_nothing() {
        let mut fetch = FetchController::new();
        let config = OverlayConfig {
            enabled: false,
            api_key: Some("X".into()),
            ..OverlayConfig::default()
        };
        assert!(fetch.activate(&config).is_none());
        assert_eq!(fetch.state(), &FetchState::Idle);
    }

    #[test]
    fn test_missing_credential_fails_without_job() {
        let mut fetch = FetchController::new();
        assert!(fetch.activate(&enabled(None)).is_none());
        assert_eq!(fetch.state(), &FetchState::Failed(FetchError::MissingCredential));

        let mut fetch = FetchController::new();
        assert!(fetch.activate(&enabled(Some("  "))).is_none());
        assert_eq!(fetch.state(), &FetchState::Failed(FetchError::MissingCredential));
    }

    #[test]
    fn test_activate_issues_job_with_credential() {
        let mut fetch = FetchController::new();
        let job = fetch.activate(&enabled(Some("X"))).unwrap();
        assert_eq!(job.api_key, "X");
        assert!(job.token.is_live());
        assert_eq!(fetch.state(), &FetchState::Loading);
        assert!(fetch.in_flight());
    }

    #[test]
    fn test_second_activation_while_in_flight_is_noop() {
        let mut fetch = FetchController::new();
        let first = fetch.activate(&enabled(Some("X"))).unwrap();
        assert!(fetch.activate(&enabled(Some("X"))).is_none());

        assert!(fetch.complete(&first.token, Ok(items(&["A"]))));
        assert_eq!(fetch.selected_item().unwrap().text, "A");
    }

    #[test]
    fn test_reactivation_after_terminal_state_starts_fresh() {
        let mut fetch = FetchController::new();
        let first = fetch.activate(&enabled(Some("X"))).unwrap();
        fetch.complete(&first.token, Err(FetchError::UnexpectedStatus(500)));

        let second = fetch.activate(&enabled(Some("X"))).unwrap();
        assert!(second.token.generation() > first.token.generation());
        assert_eq!(fetch.state(), &FetchState::Loading);
        // A late duplicate of the first result cannot clobber the new one.
        assert!(!fetch.complete(&first.token, Ok(items(&["old"]))));
        assert_eq!(fetch.state(), &FetchState::Loading);
    }

    #[test]
    fn test_empty_result_fails() {
        let mut fetch = FetchController::new();
        let job = fetch.activate(&enabled(Some("X"))).unwrap();
        fetch.complete(&job.token, Ok(HighlightCollection::default()));
        assert_eq!(fetch.state(), &FetchState::Failed(FetchError::EmptyResult));
        assert!(!fetch.in_flight());
    }

    #[test]
    fn test_transport_error_carries_description() {
        let mut fetch = FetchController::new();
        let job = fetch.activate(&enabled(Some("X"))).unwrap();
        fetch.complete(&job.token, Err(FetchError::Transport("dns error".into())));
        match fetch.state() {
            FetchState::Failed(e) => assert_eq!(e.to_string(), "dns error"),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_result_after_cancel_is_dropped() {
        let mut fetch = FetchController::new();
        let job = fetch.activate(&enabled(Some("X"))).unwrap();
        fetch.cancel();

        assert!(!job.token.is_live());
        assert!(!fetch.complete(&job.token, Ok(items(&["A"]))));
        assert_eq!(fetch.state(), &FetchState::Loading);
        assert!(!fetch.in_flight());
    }

    #[test]
    fn test_ready_selects_first_item() {
        let fetch = ready(&["A", "B"]);
        assert_eq!(
            fetch.state(),
            &FetchState::Ready {
                collection: items(&["A", "B"]),
                selected: 0
            }
        );
        assert_eq!(fetch.selected_item().unwrap().text, "A");
    }

    #[test]
    fn test_reselect_before_ready_is_noop() {
        let mut fetch = FetchController::new();
        assert_eq!(fetch.reselect(), None);
        assert_eq!(fetch.state(), &FetchState::Idle);

        fetch.activate(&enabled(Some("X")));
        assert_eq!(fetch.reselect(), None);
        assert_eq!(fetch.state(), &FetchState::Loading);

        let mut failed = FetchController::new();
        failed.activate(&enabled(None));
        assert_eq!(failed.reselect(), None);
        assert_eq!(failed.state(), &FetchState::Failed(FetchError::MissingCredential));
    }

    #[test]
    fn test_reselect_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in 1..=6 {
            let texts: Vec<String> = (0..len).map(|i| i.to_string()).collect();
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            let mut fetch = ready(&refs);
            for _ in 0..200 {
                let index = fetch.reselect_with(&mut rng).unwrap();
                assert!(index < len);
                assert_eq!(fetch.selected_item().unwrap().text, texts[index]);
            }
        }
    }

    #[test]
    fn test_single_item_reselect_keeps_it() {
        let mut fetch = ready(&["only"]);
        assert_eq!(fetch.reselect(), Some(0));
        assert_eq!(fetch.selected_item().unwrap().text, "only");
    }

    #[test]
    fn test_reselect_is_roughly_uniform() {
        let mut fetch = ready(&["A", "B"]);
        let mut rng = StdRng::seed_from_u64(2024);
        let trials = 10_000;
        let mut seen_a = 0;
        for _ in 0..trials {
            fetch.reselect_with(&mut rng);
            if fetch.selected_item().unwrap().text == "A" {
                seen_a += 1;
            }
        }
        let seen_b = trials - seen_a;
        assert!((4_000..=6_000).contains(&seen_a), "A picked {seen_a} times");
        assert!((4_000..=6_000).contains(&seen_b), "B picked {seen_b} times");
    }
}
