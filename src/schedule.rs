//! Repeating timers.
//!
//! [`Scheduler`] runs on logical time so tests can step it; the binary uses
//! [`spawn_repeating`], which drives the same kind of task off tokio's clock.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone)]
struct Task {
    id: u64,
    name: String,
    period: Duration,
    next_due: Duration,
}

/// Cancellable repeating tasks over a logical clock starting at zero.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    next_id: u64,
    tasks: Vec<Task>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// First fire is one full period from now. A zero period is treated as 1 ms.
    pub fn every(&mut self, name: &str, period: Duration) -> TaskHandle {
        let period = period.max(Duration::from_millis(1));
        let id = self.next_id;
        self.next_id += 1;
        self.tasks.push(Task {
            id,
            name: name.to_string(),
            period,
            next_due: self.now + period,
        });
        TaskHandle(id)
    }

    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != handle.0);
        self.tasks.len() != before
    }

    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.tasks.iter().any(|t| t.id == handle.0)
    }

    /// Moves the clock forward and returns the names of the tasks that came
    /// due, earliest first. Each due task fires once and is re-armed from
    /// the new time; missed periods are dropped.
    pub fn advance(&mut self, by: Duration) -> Vec<String> {
        self.now += by;
        let now = self.now;
        let mut due: Vec<(Duration, u64, String)> = Vec::new();
        for task in self.tasks.iter_mut().filter(|t| t.next_due <= now) {
            due.push((task.next_due, task.id, task.name.clone()));
            task.next_due = now + task.period;
        }
        due.sort();
        due.into_iter().map(|(_, _, name)| name).collect()
    }
}

/// A spawned repeating task. Stops on [`RepeatingTask::cancel`] or drop.
#[derive(Debug)]
pub struct RepeatingTask {
    handle: Option<JoinHandle<()>>,
}

impl RepeatingTask {
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Runs `tick` every `period`, first after one period. A slow tick delays
/// the next one instead of queueing extra runs.
pub fn spawn_repeating<F, Fut>(period: Duration, mut tick: F) -> RepeatingTask
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let period = period.max(Duration::from_millis(1));
    let handle = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            tick().await;
        }
    });
    RepeatingTask {
        handle: Some(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn fires_on_period_boundaries() {
        let mut s = Scheduler::new();
        s.every("cleanup", Duration::from_secs(3600));
        s.every("refresh", Duration::from_secs(30));

        assert!(s.advance(Duration::from_secs(29)).is_empty());
        assert_eq!(s.advance(Duration::from_secs(1)), vec!["refresh"]);
        assert_eq!(s.advance(Duration::from_secs(30)), vec!["refresh"]);
    }

    #[test]
    fn overdue_ticks_do_not_accumulate() {
        let mut s = Scheduler::new();
        s.every("refresh", Duration::from_secs(30));
        assert_eq!(s.advance(Duration::from_secs(300)), vec!["refresh"]);
        assert!(s.advance(Duration::from_secs(29)).is_empty());
        assert_eq!(s.advance(Duration::from_secs(1)), vec!["refresh"]);
    }

    #[test]
    fn due_order_is_earliest_first() {
        let mut s = Scheduler::new();
        s.every("slow", Duration::from_secs(20));
        s.every("fast", Duration::from_secs(10));
        assert_eq!(s.advance(Duration::from_secs(25)), vec!["fast", "slow"]);
    }

    #[test]
    fn cancelled_task_never_fires() {
        let mut s = Scheduler::new();
        let h = s.every("cleanup", Duration::from_secs(10));
        assert!(s.cancel(h));
        assert!(!s.is_scheduled(h));
        assert!(s.advance(Duration::from_secs(100)).is_empty());
        assert!(!s.cancel(h));
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_task_ticks_until_dropped() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let task = spawn_repeating(Duration::from_secs(30), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(task.is_running());

        drop(task);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
