use crate::config::RequestConfig;
use crate::transport::Transport;
use async_trait::async_trait;
use error::FetchError;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::oneshot;

pub(crate) type Response = Result<Option<serde_json::Value>, FetchError>;

/// Transport whose responses are released by the test, per url.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    pending: Mutex<HashMap<String, VecDeque<oneshot::Receiver<Response>>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        ScriptedTransport::default()
    }

    /// Registers the next response for `url`, released when the sender fires.
    pub(crate) fn respond_to(&self, url: &str) -> oneshot::Sender<Response> {
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(rx);
        tx
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str, _config: &RequestConfig) -> Response {
        self.requests.lock().unwrap().push(url.to_string());

        let rx = self
            .pending
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|queue| queue.pop_front());

        match rx {
            None => Err(FetchError::network(format!("unexpected request {url}"))),
            Some(rx) => rx.await.unwrap_or_else(|_| Err(FetchError::network(""))),
        }
    }
}
