//! Single-flight guard for broadcast runs

use std::sync::{
    Arc, LazyLock,
    atomic::{AtomicBool, Ordering},
};

/// The flag shared by every orchestrator in the process
static PROCESS_FLIGHT: LazyLock<SingleFlight> = LazyLock::new(SingleFlight::new);

/// Admits at most one broadcast run at a time.
///
/// Clones share the same flag, so every holder of a clone observes the same
/// run state. [`SingleFlight::process_wide`] hands out the one flag shared by
/// the whole process; [`SingleFlight::new`] creates an isolated one.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    in_progress: Arc<AtomicBool>,
}

impl SingleFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide guard
    #[must_use]
    pub fn process_wide() -> Self {
        PROCESS_FLIGHT.clone()
    }

    /// Enter the running state, or `None` if a run is already active.
    #[must_use]
    pub fn try_acquire(&self) -> Option<RunGuard> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard {
                in_progress: Arc::clone(&self.in_progress),
            })
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }
}

/// Held for the duration of a run; dropping it returns to idle on every exit path.
#[derive(Debug)]
#[must_use = "the run ends as soon as the guard is dropped"]
pub struct RunGuard {
    in_progress: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.in_progress.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let flight = SingleFlight::new();
        let guard = flight.try_acquire();
        assert!(guard.is_some());
        assert!(flight.is_running());
        assert!(flight.try_acquire().is_none());
        assert!(flight.clone().try_acquire().is_none());
    }

    #[test]
    fn test_drop_releases() {
        let flight = SingleFlight::new();
        {
            let _guard = flight.try_acquire();
            assert!(flight.is_running());
        }
        assert!(!flight.is_running());
        assert!(flight.try_acquire().is_some());
    }

    #[test]
    fn test_process_wide_instances_share_state() {
        let first = SingleFlight::process_wide();
        let second = SingleFlight::process_wide();
        let isolated = SingleFlight::new();

        let guard = first.try_acquire();
        assert!(guard.is_some());
        assert!(second.is_running());
        assert!(second.try_acquire().is_none());
        assert!(!isolated.is_running());

        drop(guard);
        assert!(!second.is_running());
    }

    #[test]
    fn test_release_on_panic() {
        let flight = SingleFlight::new();
        let inner = flight.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = inner.try_acquire();
            panic!("destination loop blew up");
        });
        assert!(result.is_err());
        assert!(!flight.is_running());
    }
}
