use crate::config::RequestConfig;
use crate::policy::{DependencyPolicy, Fingerprint, Resolution};
use crate::serialize::{ArrayEncoding, Serializer, build_url};
use crate::state::FetchState;
use crate::transport::Transport;
use error::FetchError;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, debug_span, warn};
use util::{RequestToken, TokenCounter, new_id};
use value::Query;

/// Everything one fetch depends on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListRequest {
    pub path: String,
    pub query: Query,
    pub config: RequestConfig,
    /// Bumping it forces a new fetch under policies which track [`crate::Dependency::Reload`].
    pub reload_key: u64,
}

impl ListRequest {
    pub fn new<S: Into<String>>(path: S) -> Self {
        ListRequest {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn reload_key(mut self, reload_key: u64) -> Self {
        self.reload_key = reload_key;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct FetcherOptions {
    pub dependencies: DependencyPolicy,
    pub resolution: Resolution,
    pub arrays: ArrayEncoding,
}

/// Fetches a list for a `(path, query, config)` triple and exposes the outcome
/// as a [`FetchState`].
///
/// Every fetch runs as its own task; the state is published through a watch
/// channel, so any number of observers can follow the transitions.
pub struct QueryListFetcher<T = serde_json::Value> {
    id: usize,
    transport: Arc<dyn Transport>,
    options: FetcherOptions,
    serializer: Serializer,
    state: Arc<watch::Sender<FetchState<T>>>,
    tokens: Arc<TokenCounter>,
    fingerprint: Option<Fingerprint>,
    tasks: JoinSet<()>,
}

impl<T> QueryListFetcher<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(transport: Arc<dyn Transport>, options: FetcherOptions) -> Self {
        let (state, _) = watch::channel(FetchState::Idle);
        QueryListFetcher {
            id: new_id(),
            transport,
            serializer: Serializer::new(options.arrays),
            options,
            state: Arc::new(state),
            tokens: Arc::new(TokenCounter::new()),
            fingerprint: None,
            tasks: JoinSet::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.state.subscribe()
    }

    /// Fetches only if a tracked dependency changed since the last fetch.
    pub fn update(&mut self, request: &ListRequest) -> Option<RequestToken> {
        let fingerprint = self.options.dependencies.fingerprint(request, &self.serializer);
        if self.fingerprint.as_ref() == Some(&fingerprint) {
            return None;
        }
        Some(self.fetch(request))
    }

    /// Issues a new request unconditionally.
    ///
    /// The state is `Loading` when this returns; it settles once the transport
    /// resolves. Nothing is ever returned as an error, failures end up as
    /// [`FetchState::Failure`].
    pub fn fetch(&mut self, request: &ListRequest) -> RequestToken {
        while self.tasks.try_join_next().is_some() {}

        let token = self.tokens.next();
        self.fingerprint = Some(
            self.options
                .dependencies
                .fingerprint(request, &self.serializer),
        );
        self.state.send_replace(FetchState::Loading);

        let serialized = match self.serializer.serialize(&request.query) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("fetcher {} could not serialize query: {}", self.id, err);
                settle(&self.state, &self.tokens, self.options.resolution, token, Err(err));
                return token;
            }
        };

        let url = build_url(&request.path, &serialized);
        debug!("fetcher {} issues {} for {}", self.id, token, url);

        let transport = self.transport.clone();
        let config = request.config.clone();
        let state = self.state.clone();
        let tokens = self.tokens.clone();
        let resolution = self.options.resolution;

        self.tasks.spawn(
            async move {
                let outcome = transport
                    .get(&url, &config)
                    .await
                    .and_then(|body| decode::<T>(body));
                settle(&state, &tokens, resolution, token, outcome);
            }
            .instrument(debug_span!("fetch", fetcher = self.id, token = token.0)),
        );

        token
    }

    /// Aborts all in-flight requests, a pending `Loading` goes back to `Idle`.
    pub fn cancel(&mut self) {
        if !self.tasks.is_empty() {
            debug!("fetcher {} cancels {} requests", self.id, self.tasks.len());
        }
        self.tasks.abort_all();
        // outdates anything which slipped past the abort
        self.tokens.next();
        self.state.send_if_modified(|state| {
            if state.is_loading() {
                *state = FetchState::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Waits until every issued request settled, was discarded or was aborted.
    pub async fn drain(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(err) = result {
                if !err.is_cancelled() {
                    warn!("fetch task of fetcher {} failed: {}", self.id, err);
                }
            }
        }
    }
}

impl<T> QueryListFetcher<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn state(&self) -> FetchState<T> {
        self.state.borrow().clone()
    }

    /// Waits until the state is no longer `Loading`.
    pub async fn settled(&self) -> FetchState<T> {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => Some(state.clone()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.state())
    }
}

fn decode<T: DeserializeOwned>(body: Option<serde_json::Value>) -> Result<Option<T>, FetchError> {
    body.map(serde_json::from_value::<T>)
        .transpose()
        .map_err(FetchError::from)
}

/// Applies an outcome, the check for staleness and the write happen under the
/// channel lock so a newer `Loading` can not be overwritten.
fn settle<T>(
    state: &watch::Sender<FetchState<T>>,
    tokens: &TokenCounter,
    resolution: Resolution,
    token: RequestToken,
    outcome: Result<Option<T>, FetchError>,
) {
    let applied = state.send_if_modified(|current| {
        if resolution == Resolution::LatestOnly && !tokens.is_latest(token) {
            return false;
        }
        *current = match outcome {
            Ok(payload) => FetchState::Success(payload),
            Err(err) => {
                warn!("request {} failed: {}", token, err);
                FetchState::Failure(err.message())
            }
        };
        true
    });

    if !applied {
        debug!("discarding stale response of {}", token);
    }
}
