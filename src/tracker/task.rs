use std::future::Future;
use std::time::Duration;

use tokio::select;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::time;

pub type StopSignal = oneshot::Receiver<()>;

/// A spawned timer loop that can be cancelled.
///
/// Once [Task::stop] returns the loop runs no further ticks.
#[derive(Debug)]
pub struct Task {
    name: &'static str,
    handle: JoinHandle<()>,
    stop: oneshot::Sender<()>,
}

impl Task {
    pub fn spawn<F>(name: &'static str, f: impl FnOnce(StopSignal) -> F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (stop, signal) = oneshot::channel();

        Self {
            name,
            handle: tokio::spawn(f(signal)),
            stop,
        }
    }

    /// Runs `tick` every `period`, the first time one `period` from now.
    pub fn repeat(
        name: &'static str, period: Duration, mut tick: impl FnMut() + Send + 'static,
    ) -> Self {
        Self::spawn(name, move |mut signal| async move {
            let mut timer = time::timer(period);

            loop {
                select! {
                    biased;

                    _ = &mut signal => {
                        tracing::trace!(task = name, "stopped timer");
                        break;
                    }

                    _ = timer.tick() => tick(),
                }
            }
        })
    }

    /// Runs `f` once after `delay`.
    pub fn delay(name: &'static str, delay: Duration, f: impl FnOnce() + Send + 'static) -> Self {
        Self::spawn(name, move |signal| async move {
            select! {
                biased;

                _ = signal => tracing::trace!(task = name, "cancelled delayed task"),
                _ = tokio::time::sleep(delay) => f(),
            }
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(self) {
        let _ = self.stop.send(());
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = count.clone();
        (count, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn repeats_until_stopped() {
        let (count, tick) = counter();
        let task = Task::repeat("test", Duration::from_millis(300), tick);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        task.stop();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3, "no ticks after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_task_runs_once() {
        let (count, mut tick) = counter();
        let task = Task::delay("test", Duration::from_secs(3), move || tick());

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_task_can_be_cancelled() {
        let (count, mut tick) = counter();
        let task = Task::delay("test", Duration::from_secs(3), move || tick());

        tokio::time::sleep(Duration::from_secs(1)).await;
        task.stop();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
