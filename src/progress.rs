//! Observer trait for state-machine transitions.
//!
//! Inject an [`Arc<dyn StateObserver>`] via
//! [`crate::config::ConversionConfigBuilder::observer`] (or directly into a
//! [`crate::state::StateMachine`]) to see every event the machine applies.
//! A render adapter such as the CLI spinner follows the workflow this way
//! without polling.
//!
//! # Example
//!
//! ```rust
//! use svgscale::{ConversionState, Event, StateMachine, StateObserver};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl StateObserver for Counter {
//!     fn on_transition(&self, _event: &Event, _state: &ConversionState) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(Counter(AtomicUsize::new(0)));
//! let mut machine = StateMachine::with_observer(counter.clone());
//! machine.dispatch(Event::Reset);
//! assert_eq!(counter.0.load(Ordering::SeqCst), 1);
//! ```

use crate::state::{ConversionState, Event};
use std::sync::Arc;

/// Called by the state machine as it applies (or discards) events.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` because the
/// observer is shared with the blocking export task's owner.
pub trait StateObserver: Send + Sync {
    /// Called after `event` has been applied; `state` is the new state.
    fn on_transition(&self, event: &Event, state: &ConversionState) {
        let _ = (event, state);
    }

    /// Called when `event` was not applicable and the state did not change.
    ///
    /// # Arguments
    /// * `event` — the discarded event
    /// * `state` — the unchanged current state
    /// * `stale` — `true` when the event was a completion for an operation that
    ///   began before the last reset or upload
    fn on_discarded(&self, event: &Event, state: &ConversionState, stale: bool) {
        let _ = (event, state, stale);
    }
}

/// A no-op implementation for callers that don't need transition events.
pub struct NoopObserver;

impl StateObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type SharedObserver = Arc<dyn StateObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingObserver {
        applied: AtomicUsize,
        discarded: AtomicUsize,
        stale: AtomicUsize,
    }

    impl StateObserver for TrackingObserver {
        fn on_transition(&self, _event: &Event, _state: &ConversionState) {
            self.applied.fetch_add(1, Ordering::SeqCst);
        }

        fn on_discarded(&self, _event: &Event, _state: &ConversionState, stale: bool) {
            self.discarded.fetch_add(1, Ordering::SeqCst);
            if stale {
                self.stale.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let obs = NoopObserver;
        obs.on_transition(&Event::Reset, &ConversionState::Initial);
        obs.on_discarded(&Event::ExportStarted, &ConversionState::Initial, false);
    }

    #[test]
    fn tracking_observer_receives_events() {
        use crate::state::StateMachine;

        let tracker = Arc::new(TrackingObserver {
            applied: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
            stale: AtomicUsize::new(0),
        });
        let mut machine = StateMachine::with_observer(tracker.clone());

        machine.dispatch(Event::FileSubmitted);
        let ticket = machine.ticket();
        machine.dispatch(Event::Reset);
        machine.complete(ticket, Event::ParseFailed(crate::error::Failure::unspecified()));
        machine.dispatch(Event::ExportStarted);

        assert_eq!(tracker.applied.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.discarded.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.stale.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_observer_works() {
        let obs: SharedObserver = Arc::new(NoopObserver);
        obs.on_transition(&Event::Reset, &ConversionState::Initial);
    }
}
