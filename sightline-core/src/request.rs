//! Request sequencing — keep superseded correlation runs from overwriting newer results.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Monotonically increasing identifier of one correlation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Hands out request tokens and cancels the in-flight request when a newer one begins.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, cancelling whichever request was in flight.
    pub fn begin(&self) -> (RequestToken, CancellationToken) {
        let token = RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1);
        let cancel = CancellationToken::new();
        let previous = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(cancel.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        (token, cancel)
    }

    /// Whether `token` belongs to the most recent request.
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}

/// Holds the most recent result, rejecting results from older requests.
#[derive(Debug)]
pub struct LatestResult<T> {
    slot: Mutex<Option<(RequestToken, T)>>,
}

impl<T> LatestResult<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Store `value` unless a result from a newer request is already published.
    ///
    /// Returns whether the value was accepted.
    pub fn publish(&self, token: RequestToken, value: T) -> bool {
        let mut slot = self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((published, _)) = slot.as_ref()
            && *published > token
        {
            tracing::debug!(
                stale = token.value(),
                current = published.value(),
                "Discarding stale correlation result"
            );
            return false;
        }
        *slot = Some((token, value));
        true
    }

    /// Token of the currently published result.
    pub fn token(&self) -> Option<RequestToken> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|(token, _)| *token)
    }
}

impl<T: Clone> LatestResult<T> {
    pub fn get(&self) -> Option<T> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|(_, value)| value.clone())
    }
}

impl<T> Default for LatestResult<T> {
    fn default() -> Self {
        Self::new()
    }
}
