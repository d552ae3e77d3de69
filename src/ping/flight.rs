// src/ping/flight.rs
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

/// Coalesces concurrent executions that share a key.
///
/// The first submission for a key starts the work on its own task and every
/// later submission joins it, receiving the same broadcast result. The entry
/// is removed under the map lock immediately before the result is sent, so a
/// submission that observes the completion always starts a fresh execution
/// the next time around.
///
/// Because the work runs on a detached task, a waiter that stops listening
/// (deadline, shutdown) does not cancel it; the execution keeps going and
/// remains joinable until it broadcasts.
pub struct FlightGroup<K, T> {
    in_flight: Arc<Mutex<HashMap<K, broadcast::Sender<T>>>>,
}

impl<K, T> FlightGroup<K, T>
where
    K: Hash + Eq + Clone + Send + 'static,
    T: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Join the in-flight execution for `key`, starting one if none exists.
    ///
    /// Returns a receiver that yields the result once the execution finishes.
    /// Dropping the receiver abandons the wait only; the work itself is
    /// unaffected. An execution that panics delivers nothing: its entry is
    /// cleared and the channel closes, so waiters see the flight die and the
    /// key accepts fresh work.
    pub fn submit<F, Fut>(&self, key: K, work: F) -> broadcast::Receiver<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut guard = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(tx) = guard.get(&key) {
            return tx.subscribe();
        }

        // Capacity 1 is enough: exactly one result is ever sent per flight.
        let (tx, rx) = broadcast::channel(1);
        guard.insert(key.clone(), tx);
        drop(guard);

        let fut = work();
        let in_flight = Arc::clone(&self.in_flight);
        tokio::spawn(async move {
            // The entry must come out of the map even when the work panics,
            // or the key would be wedged for every later submission.
            let outcome = AssertUnwindSafe(fut).catch_unwind().await;
            let mut guard = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(tx) = guard.remove(&key) {
                match outcome {
                    Ok(value) => {
                        // A send error just means every waiter already walked away.
                        let _ = tx.send(value);
                    }
                    // A panicked execution has nothing to deliver; dropping
                    // the sender unsent closes the channel for every waiter.
                    Err(_) => drop(tx),
                }
            }
        });

        rx
    }

    /// Number of executions currently in flight.
    pub fn pending_count(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
