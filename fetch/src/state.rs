use std::fmt::{Display, Formatter};

/// Outcome of the current request of a fetcher.
#[derive(Clone, Debug, PartialEq)]
pub enum FetchState<T> {
    /// Nothing was requested yet, or the last request was cancelled.
    Idle,
    Loading,
    /// `None` when the response carried no body.
    Success(Option<T>),
    Failure(String),
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        FetchState::Idle
    }
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            FetchState::Success(payload) => payload.as_ref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchState::Failure(message) => Some(message),
            _ => None,
        }
    }
}

impl<T> Display for FetchState<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchState::Idle => f.write_str("idle"),
            FetchState::Loading => f.write_str("loading"),
            FetchState::Success(Some(_)) => f.write_str("success"),
            FetchState::Success(None) => f.write_str("success (empty)"),
            FetchState::Failure(message) => write!(f, "failure: {message}"),
        }
    }
}
