use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Identifies one issued request of a fetcher, later requests carry larger tokens.
#[derive(
    Copy, Clone, Debug, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd, Default,
)]
pub struct RequestToken(pub u64);

impl Display for RequestToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic token source, one per fetcher.
#[derive(Debug, Default)]
pub struct TokenCounter {
    latest: AtomicU64,
}

impl TokenCounter {
    pub fn new() -> Self {
        TokenCounter {
            latest: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Token of the most recent request, `RequestToken(0)` before the first one.
    pub fn latest(&self) -> RequestToken {
        RequestToken(self.latest.load(Ordering::Acquire))
    }

    pub fn is_latest(&self, token: RequestToken) -> bool {
        self.latest() == token
    }
}

static GLOBAL_ID: AtomicUsize = AtomicUsize::new(0);

pub fn new_id() -> usize {
    GLOBAL_ID.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use crate::id::{RequestToken, TokenCounter, new_id};

    #[test]
    fn not_same() {
        let mut ids = vec![];

        for _ in 0..1000 {
            let id = new_id();
            if ids.contains(&(id)) {
                panic!("overlapping ids")
            }
            ids.push(id)
        }
    }

    #[test]
    fn tokens_increase() {
        let counter = TokenCounter::new();
        assert_eq!(counter.latest(), RequestToken(0));

        let first = counter.next();
        let second = counter.next();

        assert!(second > first);
        assert!(counter.is_latest(second));
        assert!(!counter.is_latest(first));
    }
}
