//! Bounded worker pool.
//!
//! Runs async tasks on a fixed set of background threads. The text server
//! uses it for fork-join work such as splitting a distance-field bitmap into
//! row ranges.

use std::future::Future;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use async_executor::{Executor, Task};

/// A thread pool for executing async tasks.
///
/// # Example
///
/// ```
/// use verso_core::TaskPool;
///
/// let pool = TaskPool::new(2);
/// let task = pool.spawn(async { 42 });
/// assert_eq!(pollster::block_on(task), 42);
/// ```
pub struct TaskPool {
    executor: Arc<Executor<'static>>,
    threads: Vec<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl TaskPool {
    /// Create a new task pool with the specified number of threads.
    ///
    /// # Panics
    ///
    /// Panics if num_threads is 0 or a worker thread cannot be spawned.
    pub fn new(num_threads: usize) -> Self {
        assert!(num_threads > 0, "TaskPool must have at least one thread");

        let executor = Arc::new(Executor::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut threads = Vec::with_capacity(num_threads);

        for i in 0..num_threads {
            let exec = executor.clone();
            let shutdown_flag = shutdown.clone();

            let handle = thread::Builder::new()
                .name(format!("verso-worker-{}", i))
                .spawn(move || {
                    while !shutdown_flag.load(Ordering::Acquire) {
                        if !exec.try_tick() {
                            thread::sleep(Duration::from_micros(200));
                        }
                    }
                });

            match handle {
                Ok(handle) => threads.push(handle),
                Err(e) => panic!("failed to spawn task pool thread: {}", e),
            }
        }

        tracing::debug!("TaskPool created with {} threads", num_threads);

        Self {
            executor,
            threads,
            shutdown,
        }
    }

    /// Create a task pool using the number of available CPU cores.
    pub fn with_num_cpus() -> Self {
        Self::new(num_cpus::get())
    }

    /// Uses max(1, num_cpus - 1) to leave one core free for the caller.
    pub fn default_threads() -> Self {
        Self::new(Self::default_thread_count())
    }

    pub fn default_thread_count() -> usize {
        num_cpus::get().saturating_sub(1).max(1)
    }

    /// Spawn an async task on the pool.
    pub fn spawn<T>(&self, future: impl Future<Output = T> + Send + 'static) -> Task<T>
    where
        T: Send + 'static,
    {
        self.executor.spawn(future)
    }

    /// Get the number of threads in this pool.
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Splits `0..len` into at most `thread_count` contiguous ranges, runs `job`
    /// on each range in the pool and blocks until all of them finish.
    ///
    /// Results come back in range order. Must not be called from a pool
    /// worker, which would wait on itself.
    pub fn fork_join<T, F>(&self, len: usize, job: F) -> Vec<T>
    where
        T: Send + 'static,
        F: Fn(Range<usize>) -> T + Send + Sync + 'static,
    {
        if len == 0 {
            return Vec::new();
        }

        let chunks = self.thread_count().min(len);
        let chunk_len = len.div_ceil(chunks);
        let job = Arc::new(job);

        let tasks: Vec<Task<T>> = (0..len)
            .step_by(chunk_len)
            .map(|start| {
                let range = start..(start + chunk_len).min(len);
                let job = job.clone();
                self.spawn(async move { job(range) })
            })
            .collect();

        tasks
            .into_iter()
            .map(futures_lite::future::block_on)
            .collect()
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);

        for handle in std::mem::take(&mut self.threads) {
            if let Err(e) = handle.join() {
                tracing::error!("Task pool thread panicked: {:?}", e);
            }
        }
    }

    /// Shutdown the task pool and wait for all threads to finish.
    ///
    /// Tasks that have not started by then are dropped.
    pub fn shutdown(mut self) {
        tracing::debug!("Shutting down TaskPool with {} threads", self.threads.len());
        self.stop();
        tracing::debug!("TaskPool shutdown complete");
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::default_threads()
    }
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("threads", &self.threads.len())
            .finish()
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.stop();
    }
}
