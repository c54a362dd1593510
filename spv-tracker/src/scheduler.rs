//! Periodic task scheduling
//!
//! Sweeps are registered through [`Scheduler::every`] instead of owning their
//! own timers. [`TokioScheduler`] runs each task on a fixed interval and
//! never lets two runs of the same task overlap.

use spv_common::Result;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub trait Scheduler {
    /// Run `task` every `period` until the returned handle is aborted
    fn every<F, Fut>(&self, name: &'static str, period: Duration, task: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static;
}

/// Guard that admits one run at a time
#[derive(Debug, Default)]
pub struct SingleFlight {
    running: AtomicBool,
}

/// Held for the duration of one admitted run
pub struct Flight<'a> {
    owner: &'a SingleFlight,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run, or `None` if one is already in progress
    pub fn try_begin(&self) -> Option<Flight<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Flight { owner: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.owner.running.store(false, Ordering::Release);
    }
}

/// Counters of one scheduled task
#[derive(Debug, Default)]
pub struct TaskStats {
    pub runs: AtomicU64,
    pub failures: AtomicU64,
    pub skipped: AtomicU64,
}

/// Interval-driven scheduler on the tokio runtime
#[derive(Debug, Clone, Default)]
pub struct TokioScheduler {
    stats: Arc<std::sync::Mutex<Vec<(&'static str, Arc<TaskStats>)>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stats of a registered task by name
    pub fn stats(&self, name: &str) -> Option<Arc<TaskStats>> {
        self.stats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, s)| s.clone())
    }
}

impl Scheduler for TokioScheduler {
    fn every<F, Fut>(&self, name: &'static str, period: Duration, task: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let stats = Arc::new(TaskStats::default());
        self.stats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((name, stats.clone()));

        info!("Scheduling '{}' every {:?}", name, period);

        let flight = Arc::new(SingleFlight::new());
        let task = Arc::new(task);

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                if flight.is_running() {
                    stats.skipped.fetch_add(1, Ordering::Relaxed);
                    warn!("'{}' still running from the previous tick; skipping", name);
                    continue;
                }

                let flight = flight.clone();
                let task = task.clone();
                let stats = stats.clone();
                tokio::spawn(async move {
                    let Some(_flight) = flight.try_begin() else {
                        stats.skipped.fetch_add(1, Ordering::Relaxed);
                        return;
                    };
                    stats.runs.fetch_add(1, Ordering::Relaxed);
                    debug!("'{}' tick", name);
                    if let Err(e) = task().await {
                        stats.failures.fetch_add(1, Ordering::Relaxed);
                        error!("'{}' failed: {}", name, e);
                    }
                });
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spv_common::Error;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_single_flight_admits_one() {
        let flight = SingleFlight::new();
        let first = flight.try_begin();
        assert!(first.is_some());
        assert!(flight.try_begin().is_none());
        drop(first);
        assert!(!flight.is_running());
        assert!(flight.try_begin().is_some());
    }

    #[tokio::test]
    async fn test_overlapping_ticks_are_skipped() {
        let scheduler = TokioScheduler::new();
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let (a, m) = (active.clone(), max_active.clone());
        let handle = scheduler.every("slow", Duration::from_millis(10), move || {
            let (a, m) = (a.clone(), m.clone());
            async move {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                m.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(35)).await;
                a.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        let stats = scheduler.stats("slow").unwrap();
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert!(stats.runs.load(Ordering::Relaxed) >= 2);
        assert!(stats.skipped.load(Ordering::Relaxed) >= 1);
    }

    #[tokio::test]
    async fn test_failed_tick_does_not_stop_schedule() {
        let scheduler = TokioScheduler::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        let handle = scheduler.every("flaky", Duration::from_millis(10), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(Error::Internal("boom".to_string()))
            }
        });

        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.abort();

        assert!(calls.load(Ordering::SeqCst) >= 3);
        assert!(scheduler.stats("flaky").unwrap().failures.load(Ordering::Relaxed) >= 3);
    }
}
