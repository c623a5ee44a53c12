use indexmap::IndexMap;
use std::time::Duration;

/// Per request transport configuration, handed to the [`crate::Transport`] untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestConfig {
    pub headers: IndexMap<String, String>,
    pub timeout: Option<Duration>,
    /// Overrides whatever token the transport would send on its own.
    pub bearer: Option<String>,
}

impl RequestConfig {
    pub fn new() -> Self {
        RequestConfig::default()
    }

    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn bearer<S: Into<String>>(mut self, token: S) -> Self {
        self.bearer = Some(token.into());
        self
    }
}
