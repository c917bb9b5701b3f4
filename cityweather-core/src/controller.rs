//! Fetch state shared between a weather lookup and whatever displays it.
//!
//! `FetchController` owns a [`FetchState`] and publishes every change through a
//! `tokio::sync::watch` channel. Only one fetch runs at a time; a call made
//! while another is in flight is rejected rather than queued.

use chrono::{DateTime, Utc};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::{
    client::WeatherClient,
    error::{QueryError, WeatherError},
    model::{UnitSystem, WeatherQuery, WeatherResult},
};

/// Shown to the user for every failed lookup, whatever the cause.
pub const FETCH_ERROR_MESSAGE: &str = "Failed to load weather data. Please try again.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchState {
    /// Last successful result. Kept when a later fetch fails.
    pub result: Option<WeatherResult>,
    pub is_loading: bool,
    pub error_message: Option<String>,
    /// Query that produced `result`.
    pub query: Option<WeatherQuery>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub enum FetchOutcome {
    Loaded(WeatherResult),
    Failed(WeatherError),
    Rejected(Rejection),
}

/// Why a call never reached the client.
#[derive(Debug)]
pub enum Rejection {
    InvalidQuery(QueryError),
    InFlight,
}

#[derive(Debug)]
pub struct FetchController {
    client: Arc<dyn WeatherClient>,
    state: watch::Sender<FetchState>,
    in_flight: AtomicBool,
}

impl FetchController {
    pub fn new(client: Arc<dyn WeatherClient>) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self { client, state, in_flight: AtomicBool::new(false) }
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> FetchState {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    #[instrument(skip(self))]
    pub async fn fetch_weather(&self, city: &str, units: UnitSystem) -> FetchOutcome {
        let query = match WeatherQuery::new(city, units) {
            Ok(query) => query,
            Err(err) => {
                warn!(%err, "rejected weather fetch");
                return FetchOutcome::Rejected(Rejection::InvalidQuery(err));
            }
        };

        let Some(_loading) = LoadingGuard::acquire(self) else {
            warn!("weather fetch already in flight");
            return FetchOutcome::Rejected(Rejection::InFlight);
        };

        match self.client.fetch(&query).await {
            Ok(result) => {
                info!(city = query.city(), "weather data loaded");
                self.state.send_modify(|s| {
                    s.result = Some(result.clone());
                    s.query = Some(query);
                    s.updated_at = Some(Utc::now());
                    s.error_message = None;
                });
                FetchOutcome::Loaded(result)
            }
            Err(err) => {
                error!(city = query.city(), error = %err, "error fetching weather data");
                self.state.send_modify(|s| {
                    s.error_message = Some(FETCH_ERROR_MESSAGE.to_string());
                });
                FetchOutcome::Failed(err)
            }
        }
    }
}

/// Holds the in-flight slot and the loading flag for one fetch. Dropping it
/// clears both, including when the fetch future is cancelled.
struct LoadingGuard<'a> {
    controller: &'a FetchController,
}

impl<'a> LoadingGuard<'a> {
    fn acquire(controller: &'a FetchController) -> Option<Self> {
        controller
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;

        controller.state.send_modify(|s| {
            s.is_loading = true;
            s.error_message = None;
        });

        Some(Self { controller })
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.controller.state.send_modify(|s| s.is_loading = false);
        self.controller.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NetworkError, ParseError};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::{collections::VecDeque, sync::Mutex};
    use tokio::sync::Notify;

    fn paris() -> WeatherResult {
        WeatherResult { temperature: 21.5, humidity: 60, description: "clear sky".into() }
    }

    fn server_error() -> WeatherError {
        NetworkError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "upstream down".into(),
        }
        .into()
    }

    fn malformed_json() -> WeatherError {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        ParseError::Json(err).into()
    }

    /// Replays canned responses and records every query it receives.
    #[derive(Debug, Default)]
    struct ScriptedClient {
        responses: Mutex<VecDeque<Result<WeatherResult, WeatherError>>>,
        seen: Mutex<Vec<WeatherQuery>>,
    }

    impl ScriptedClient {
        fn with(responses: Vec<Result<WeatherResult, WeatherError>>) -> Arc<Self> {
            Arc::new(Self { responses: Mutex::new(responses.into()), ..Self::default() })
        }

        fn seen(&self) -> Vec<WeatherQuery> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WeatherClient for ScriptedClient {
        async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherResult, WeatherError> {
            self.seen.lock().unwrap().push(query.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra fetch")
        }
    }

    /// Blocks each fetch until `release` is notified.
    #[derive(Debug, Default)]
    struct GatedClient {
        release: Notify,
        fail: bool,
    }

    #[async_trait]
    impl WeatherClient for GatedClient {
        async fn fetch(&self, _query: &WeatherQuery) -> Result<WeatherResult, WeatherError> {
            self.release.notified().await;
            if self.fail { Err(server_error()) } else { Ok(paris()) }
        }
    }

    #[test]
    fn initial_state_is_empty() {
        let controller = FetchController::new(ScriptedClient::with(vec![]));
        assert_eq!(controller.state(), FetchState::default());
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn success_stores_result_and_clears_error() {
        let client = ScriptedClient::with(vec![Ok(paris())]);
        let controller = FetchController::new(client.clone());

        let outcome = controller.fetch_weather("Paris", UnitSystem::Metric).await;

        assert!(matches!(outcome, FetchOutcome::Loaded(ref r) if *r == paris()));
        let state = controller.state();
        assert_eq!(state.result, Some(paris()));
        assert_eq!(state.error_message, None);
        assert!(!state.is_loading);
        assert!(state.updated_at.is_some());
        assert_eq!(state.query.as_ref().map(WeatherQuery::city), Some("Paris"));
        assert_eq!(client.seen(), vec![WeatherQuery::new("Paris", UnitSystem::Metric).unwrap()]);
    }

    #[tokio::test]
    async fn failures_set_fixed_message_and_keep_prior_result() {
        let empty_conditions: WeatherError = ParseError::NoConditions.into();
        let client = ScriptedClient::with(vec![
            Ok(paris()),
            Err(server_error()),
            Err(malformed_json()),
            Err(empty_conditions),
        ]);
        let controller = FetchController::new(client);

        controller.fetch_weather("Paris", UnitSystem::Metric).await;
        let before = controller.state();

        for _ in 0..3 {
            let outcome = controller.fetch_weather("Lyon", UnitSystem::Metric).await;
            assert!(matches!(outcome, FetchOutcome::Failed(_)));

            let state = controller.state();
            assert_eq!(state.error_message.as_deref(), Some(FETCH_ERROR_MESSAGE));
            assert_eq!(state.result, before.result);
            assert_eq!(state.query, before.query);
            assert!(!state.is_loading);
        }
    }

    #[tokio::test]
    async fn failure_without_prior_result_leaves_result_empty() {
        let controller = FetchController::new(ScriptedClient::with(vec![Err(malformed_json())]));

        controller.fetch_weather("Paris", UnitSystem::Metric).await;

        let state = controller.state();
        assert_eq!(state.result, None);
        assert_eq!(state.error_message.as_deref(), Some(FETCH_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn success_after_failure_clears_error() {
        let client = ScriptedClient::with(vec![Err(server_error()), Ok(paris())]);
        let controller = FetchController::new(client);

        controller.fetch_weather("Paris", UnitSystem::Metric).await;
        controller.fetch_weather("Paris", UnitSystem::Metric).await;

        let state = controller.state();
        assert_eq!(state.error_message, None);
        assert_eq!(state.result, Some(paris()));
    }

    #[tokio::test]
    async fn blank_city_never_reaches_client() {
        let client = ScriptedClient::with(vec![]);
        let controller = FetchController::new(client.clone());

        let outcome = controller.fetch_weather("   ", UnitSystem::Metric).await;

        assert!(matches!(
            outcome,
            FetchOutcome::Rejected(Rejection::InvalidQuery(QueryError::BlankCity))
        ));
        assert!(client.seen().is_empty());
        assert_eq!(controller.state(), FetchState::default());
    }

    #[tokio::test]
    async fn units_are_passed_through_unchanged() {
        let client = ScriptedClient::with(vec![Ok(paris())]);
        let controller = FetchController::new(client.clone());

        controller.fetch_weather("Paris", UnitSystem::Imperial).await;

        assert_eq!(client.seen()[0].units(), UnitSystem::Imperial);
        // provider value is trusted as-is, no conversion
        assert_eq!(controller.state().result.unwrap().temperature, 21.5);
    }

    #[tokio::test]
    async fn loading_is_true_only_while_fetch_runs() {
        for fail in [false, true] {
            let client = Arc::new(GatedClient { fail, ..GatedClient::default() });
            let controller = Arc::new(FetchController::new(client.clone()));
            let mut rx = controller.subscribe();
            assert!(!rx.borrow().is_loading);

            let task = tokio::spawn({
                let controller = controller.clone();
                async move { controller.fetch_weather("Paris", UnitSystem::Metric).await }
            });

            rx.wait_for(|s| s.is_loading).await.unwrap();
            assert!(controller.is_loading());
            assert_eq!(controller.state().error_message, None);

            client.release.notify_one();
            task.await.unwrap();

            assert!(!controller.is_loading());
            assert_eq!(controller.state().error_message.is_some(), fail);
        }
    }

    #[tokio::test]
    async fn transitions_are_loading_then_outcome_then_idle() {
        let client = Arc::new(GatedClient::default());
        let controller = Arc::new(FetchController::new(client.clone()));
        let mut rx = controller.subscribe();

        let task = tokio::spawn({
            let controller = controller.clone();
            async move { controller.fetch_weather("Paris", UnitSystem::Metric).await }
        });

        rx.wait_for(|s| s.is_loading && s.result.is_none()).await.unwrap();
        client.release.notify_one();
        task.await.unwrap();

        let last = rx.borrow_and_update().clone();
        assert!(!last.is_loading);
        assert_eq!(last.result, Some(paris()));
    }

    #[tokio::test]
    async fn overlapping_fetch_is_rejected() {
        let client = Arc::new(GatedClient::default());
        let controller = Arc::new(FetchController::new(client.clone()));
        let mut rx = controller.subscribe();

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.fetch_weather("Paris", UnitSystem::Metric).await }
        });
        rx.wait_for(|s| s.is_loading).await.unwrap();

        let second = controller.fetch_weather("Rome", UnitSystem::Metric).await;
        assert!(matches!(second, FetchOutcome::Rejected(Rejection::InFlight)));
        assert!(controller.is_loading());

        client.release.notify_one();
        assert!(matches!(first.await.unwrap(), FetchOutcome::Loaded(_)));

        // slot is free again
        client.release.notify_one();
        let third = controller.fetch_weather("Rome", UnitSystem::Metric).await;
        assert!(matches!(third, FetchOutcome::Loaded(_)));
    }

    #[tokio::test]
    async fn cancelled_fetch_returns_to_idle() {
        let client = Arc::new(GatedClient::default());
        let controller = Arc::new(FetchController::new(client.clone()));
        let mut rx = controller.subscribe();

        let task = tokio::spawn({
            let controller = controller.clone();
            async move { controller.fetch_weather("Paris", UnitSystem::Metric).await }
        });
        rx.wait_for(|s| s.is_loading).await.unwrap();

        task.abort();
        let _ = task.await;

        rx.wait_for(|s| !s.is_loading).await.unwrap();
        let state = controller.state();
        assert_eq!(state.result, None);
        assert_eq!(state.error_message, None);

        client.release.notify_one();
        let outcome = controller.fetch_weather("Paris", UnitSystem::Metric).await;
        assert!(matches!(outcome, FetchOutcome::Loaded(_)));
    }
}
