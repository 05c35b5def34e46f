//! Lifecycle state and graceful shutdown with in-flight request tracking.
//!
//! Uses `ArcSwap` for lock-free state transitions, a `CancellationToken`
//! to broadcast the shutdown signal to every adapter, and an atomic counter
//! with RAII guards for in-flight tracking.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use addsvc_core::messages::ServingStatus;
use arc_swap::ArcSwap;
use tokio_util::sync::CancellationToken;

/// Whole-service lifecycle state.
///
/// State machine: Starting -> Running -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Listeners are being bound; no requests are served yet.
    Starting,
    /// Both adapters are accepting requests.
    Running,
    /// Shutdown was signalled; in-flight requests are finishing.
    Draining,
    /// Every adapter has returned.
    Stopped,
}

impl LifecycleState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }

    /// Health status reported for this state.
    #[must_use]
    pub fn serving_status(self) -> ServingStatus {
        if self == Self::Running {
            ServingStatus::Serving
        } else {
            ServingStatus::NotServing
        }
    }
}

/// Controls graceful shutdown with lifecycle state and in-flight tracking.
///
/// 1. Health probes read `state()` to report readiness
/// 2. Adapters check `is_accepting()` before admitting new requests
/// 3. `trigger_shutdown()` moves to `Draining` and cancels the shared token
/// 4. Adapters drain their own in-flight work within the grace period
/// 5. The supervisor calls `mark_stopped()` once every adapter has returned
#[derive(Debug)]
pub struct ShutdownController {
    token: CancellationToken,
    triggered: AtomicBool,
    in_flight: Arc<AtomicU64>,
    state: ArcSwap<LifecycleState>,
}

impl ShutdownController {
    /// Creates a new controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            triggered: AtomicBool::new(false),
            in_flight: Arc::new(AtomicU64::new(0)),
            state: ArcSwap::from_pointee(LifecycleState::Starting),
        }
    }

    /// Transitions to `Running`. Has no effect once shutdown has begun.
    pub fn set_running(&self) {
        if !self.triggered.load(Ordering::Acquire) {
            self.state.store(Arc::new(LifecycleState::Running));
        }
    }

    /// Returns a token that is cancelled when shutdown is triggered.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Moves to `Draining` and signals every holder of the cancellation token.
    ///
    /// Returns `true` for the call that actually initiated shutdown and
    /// `false` for every later call.
    pub fn trigger_shutdown(&self) -> bool {
        if self.triggered.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.state.store(Arc::new(LifecycleState::Draining));
        self.token.cancel();
        true
    }

    /// Records that every adapter has finished.
    pub fn mark_stopped(&self) {
        self.state.store(Arc::new(LifecycleState::Stopped));
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        **self.state.load()
    }

    /// Whether new requests may be admitted.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        !self.triggered.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn serving_status(&self) -> ServingStatus {
        self.state().serving_status()
    }

    /// Creates an RAII guard that tracks an in-flight request.
    ///
    /// The counter is incremented on creation and decremented when the guard
    /// is dropped, including during unwinding or task abort.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard that decrements the in-flight counter when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_starting() {
        let controller = ShutdownController::new();
        assert_eq!(controller.state(), LifecycleState::Starting);
        assert_eq!(controller.serving_status(), ServingStatus::NotServing);
        assert_eq!(controller.in_flight_count(), 0);
        assert!(controller.is_accepting());
    }

    #[test]
    fn full_state_machine() {
        let controller = ShutdownController::new();

        controller.set_running();
        assert_eq!(controller.state(), LifecycleState::Running);
        assert_eq!(controller.serving_status(), ServingStatus::Serving);

        assert!(controller.trigger_shutdown());
        assert_eq!(controller.state(), LifecycleState::Draining);
        assert_eq!(controller.serving_status(), ServingStatus::NotServing);
        assert!(!controller.is_accepting());

        controller.mark_stopped();
        assert_eq!(controller.state(), LifecycleState::Stopped);
    }

    #[test]
    fn trigger_shutdown_only_fires_once() {
        let controller = ShutdownController::new();
        controller.set_running();
        assert!(controller.trigger_shutdown());
        assert!(!controller.trigger_shutdown());
        assert_eq!(controller.state(), LifecycleState::Draining);
    }

    #[test]
    fn set_running_after_shutdown_is_ignored() {
        let controller = ShutdownController::new();
        controller.trigger_shutdown();
        controller.set_running();
        assert_eq!(controller.state(), LifecycleState::Draining);
    }

    #[test]
    fn in_flight_guard_increments_and_decrements() {
        let controller = ShutdownController::new();

        let guard1 = controller.in_flight_guard();
        let guard2 = controller.in_flight_guard();
        assert_eq!(controller.in_flight_count(), 2);

        drop(guard1);
        assert_eq!(controller.in_flight_count(), 1);

        drop(guard2);
        assert_eq!(controller.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn cancellation_token_observes_shutdown() {
        let controller = ShutdownController::new();
        let token = controller.cancellation_token();
        assert!(!token.is_cancelled());

        controller.trigger_shutdown();
        token.cancelled().await;
        assert!(token.is_cancelled());
    }
}
