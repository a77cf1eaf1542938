//! Injectable single-flight cache.
//!
//! Holds at most one value. The first `get_or_fetch` on an empty cache starts
//! the fetch and parks a shared handle to it; concurrent callers await that
//! same handle instead of starting their own. Successful results are kept
//! until `reset`; failures are handed to every waiter and then forgotten so
//! the next call tries again.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::reflector::ReflectorError;

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, ReflectorError>>>;

struct InFlight<T: Clone> {
    flight: u64,
    fetch: SharedFetch<T>,
}

struct CacheState<T: Clone> {
    value: Option<T>,
    in_flight: Option<InFlight<T>>,
    next_flight: u64,
}

pub struct SingleFlightCache<T: Clone> {
    state: Mutex<CacheState<T>>,
    fetches: AtomicU64,
}

impl<T> SingleFlightCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CacheState {
                value: None,
                in_flight: None,
                next_flight: 0,
            }),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn get(&self) -> Option<T> {
        self.state.lock().expect("cache mutex poisoned").value.clone()
    }

    /// Store a value directly, superseding any fetch in progress.
    pub fn set(&self, value: T) {
        let mut state = self.state.lock().expect("cache mutex poisoned");
        state.value = Some(value);
        state.in_flight = None;
    }

    /// Forget the cached value. A fetch still in progress keeps running for
    /// its current waiters but will not populate the cache.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("cache mutex poisoned");
        state.value = None;
        state.in_flight = None;
    }

    pub fn is_fetching(&self) -> bool {
        self.state.lock().expect("cache mutex poisoned").in_flight.is_some()
    }

    /// How many fetches this cache has started.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Return the cached value, or join or start the single fetch for it.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<T, ReflectorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ReflectorError>> + Send + 'static,
    {
        let (flight, shared) = {
            let mut state = self.state.lock().expect("cache mutex poisoned");
            if let Some(value) = &state.value {
                return Ok(value.clone());
            }
            match &state.in_flight {
                Some(in_flight) => (in_flight.flight, in_flight.fetch.clone()),
                None => {
                    let flight = state.next_flight;
                    state.next_flight += 1;
                    let shared = fetch().boxed().shared();
                    state.in_flight = Some(InFlight {
                        flight,
                        fetch: shared.clone(),
                    });
                    self.fetches.fetch_add(1, Ordering::SeqCst);
                    (flight, shared)
                }
            }
        };

        let outcome = shared.await;

        let mut state = self.state.lock().expect("cache mutex poisoned");
        let current = state.in_flight.as_ref().map(|f| f.flight) == Some(flight);
        if current {
            state.in_flight = None;
            match &outcome {
                Ok(value) => state.value = Some(value.clone()),
                Err(e) => tracing::debug!("single-flight fetch failed, not caching: {e}"),
            }
        }
        outcome
    }
}

impl<T> Default for SingleFlightCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
