//! The two schedulable contexts.
//!
//! Ribbon distinguishes the *calling context* (the synchronous API surface,
//! modeled as a [`TaskQueue`] the host drains once per iteration of its own
//! event loop) from the *background context* (a [`TaskExecutor`] that runs
//! layout computation off the calling thread). Both are explicit values
//! passed at construction, never ambient.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Executes tasks on the background context.
///
/// Implementations must be safe to use from multiple threads. Submission
/// order is preserved per executor.
pub trait TaskExecutor: Send + Sync {
    /// Enqueues a task. Never blocks on the task itself.
    fn execute(&self, task: Task);
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        // A panicking task must not wedge every later submission; the
        // protected data is still structurally sound.
        poisoned.into_inner()
    })
}

/// A [`TaskExecutor`] backed by dedicated worker threads draining a channel.
pub struct BackgroundExecutor {
    sender: Mutex<Option<mpsc::Sender<Task>>>,
}

impl BackgroundExecutor {
    /// Spawns `workers` background threads (at least one).
    pub fn new(workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Task>();
        let receiver = Arc::new(Mutex::new(receiver));
        for index in 0..workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let builder = thread::Builder::new().name(format!("ribbon-layout-{index}"));
            let spawned = builder.spawn(move || loop {
                let task = {
                    let guard = lock_ignoring_poison(&receiver);
                    guard.recv()
                };
                match task {
                    Ok(task) => task(),
                    Err(_) => break,
                }
            });
            if let Err(err) = spawned {
                log::error!("failed to spawn background layout worker: {err}");
            }
        }
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Stops accepting work and lets the workers drain and exit.
    pub fn close(&self) {
        lock_ignoring_poison(&self.sender).take();
    }
}

impl TaskExecutor for BackgroundExecutor {
    fn execute(&self, task: Task) {
        let guard = lock_ignoring_poison(&self.sender);
        match guard.as_ref() {
            Some(sender) => {
                if sender.send(task).is_err() {
                    log::warn!("background layout workers are gone; dropping task");
                }
            }
            None => log::debug!("executor closed; dropping task"),
        }
    }
}

impl Drop for BackgroundExecutor {
    fn drop(&mut self) {
        self.close();
    }
}

/// The calling-context task queue.
///
/// Work posted here runs when the host drains the queue on its own event
/// loop, which keeps range recomputation and batch application on the
/// calling context even when they originate from background completions.
#[derive(Clone, Default)]
pub struct TaskQueue {
    inner: Arc<Mutex<VecDeque<Task>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts a task for the next drain.
    pub fn post(&self, task: Task) {
        lock_ignoring_poison(&self.inner).push_back(task);
    }

    /// Runs queued tasks until the queue is empty, including tasks posted
    /// while draining. Returns how many ran.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = lock_ignoring_poison(&self.inner).pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }

    /// Discards all queued tasks without running them.
    pub fn clear(&self) {
        lock_ignoring_poison(&self.inner).clear();
    }

    pub fn is_empty(&self) -> bool {
        lock_ignoring_poison(&self.inner).is_empty()
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &lock_ignoring_poison(&self.inner).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::channel;

    #[test]
    fn test_background_executor_runs_tasks() {
        let executor = BackgroundExecutor::new(2);
        let (tx, rx) = channel();
        for i in 0..8 {
            let tx = tx.clone();
            executor.execute(Box::new(move || {
                tx.send(i).ok();
            }));
        }
        let mut received: Vec<i32> = (0..8).map(|_| rx.recv().unwrap()).collect();
        received.sort_unstable();
        assert_eq!(received, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_closed_executor_drops_tasks() {
        let executor = BackgroundExecutor::new(1);
        executor.close();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = Arc::clone(&ran);
        executor.execute(Box::new(move || {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_queue_drains_nested_posts() {
        let queue = TaskQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let queue_clone = queue.clone();
        let ran_clone = Arc::clone(&ran);
        queue.post(Box::new(move || {
            let ran_inner = Arc::clone(&ran_clone);
            queue_clone.post(Box::new(move || {
                ran_inner.fetch_add(1, Ordering::SeqCst);
            }));
            ran_clone.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(queue.drain(), 2);
        assert_eq!(ran.load(Ordering::SeqCst), 2);
        assert!(queue.is_empty());
    }
}
