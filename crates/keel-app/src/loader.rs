//! Supervised background loading.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Cooperative cancellation flag checked by load workers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the worker to stop at its next check point.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// A background load running on its own thread.
///
/// The owner polls [`is_finished`](Self::is_finished) each tick and
/// collects the result with [`try_take`](Self::try_take). Dropping the
/// task cancels it and joins the worker, so a load is never left
/// detached.
pub struct LoadTask<T> {
    token: CancelToken,
    handle: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> LoadTask<T> {
    /// Spawn `f` on a named worker thread.
    ///
    /// The worker receives the task's [`CancelToken`] and is expected to
    /// check it at its loop points.
    pub fn spawn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(&CancelToken) -> T + Send + 'static,
    {
        let token = CancelToken::new();
        let worker_token = token.clone();

        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || f(&worker_token))
            .expect("Failed to spawn load worker thread");

        Self {
            token,
            handle: Some(handle),
        }
    }
}

impl<T> LoadTask<T> {
    /// Returns `true` once the worker has run to completion.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Take the produced value, joining the worker.
    ///
    /// Returns `None` while the worker is still running, and exactly one
    /// `Some` afterwards. A worker that panicked yields `None` with
    /// `is_finished` reporting `true`.
    pub fn try_take(&mut self) -> Option<T> {
        if !self.is_finished() {
            return None;
        }
        let handle = self.handle.take()?;
        handle.join().ok()
    }

    /// Request cancellation without blocking.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl<T> Drop for LoadTask<T> {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    fn wait_until_finished<T>(task: &LoadTask<T>) {
        while !task.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn produces_a_value_exactly_once() {
        let mut task = LoadTask::spawn("test-load", |_| 42);
        wait_until_finished(&task);

        assert_eq!(task.try_take(), Some(42));
        assert_eq!(task.try_take(), None);
        assert!(task.is_finished());
    }

    #[test]
    fn running_task_is_not_finished() {
        let (tx, rx) = mpsc::channel::<()>();
        let mut task = LoadTask::spawn("test-load", move |_| {
            rx.recv().ok();
            7
        });

        assert!(!task.is_finished());
        assert_eq!(task.try_take(), None);

        tx.send(()).unwrap();
        wait_until_finished(&task);
        assert_eq!(task.try_take(), Some(7));
    }

    #[test]
    fn cancel_reaches_the_worker() {
        let mut task = LoadTask::spawn("test-load", |token| {
            while !token.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            "stopped"
        });

        task.cancel();
        wait_until_finished(&task);
        assert_eq!(task.try_take(), Some("stopped"));
    }

    #[test]
    fn drop_cancels_and_joins() {
        let observed = Arc::new(AtomicBool::new(false));
        let worker_observed = Arc::clone(&observed);

        let task = LoadTask::spawn("test-load", move |token| {
            while !token.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            worker_observed.store(true, Ordering::Release);
        });

        drop(task);
        // Drop joins, so the store must already be visible
        assert!(observed.load(Ordering::Acquire));
    }
}
