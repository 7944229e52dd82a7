//! Worker pool that grows whenever every worker is busy.
//!
//! `core` workers stay up for the life of the pool. A job submitted while no
//! worker is idle gets a fresh worker, which retires after sitting idle for
//! `keep_alive`. A stalled job therefore never delays another one.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{trace, warn};

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queue {
    jobs: VecDeque<Job>,
    open: bool,
}

struct Workers {
    name: String,
    queue: Mutex<Queue>,
    ready: Condvar,
    /// Idle workers not yet promised to a submitted job.
    idle: AtomicUsize,
    spawned: AtomicUsize,
    keep_alive: Duration,
}

/// Workers exit once every queued job has run and the pool is dropped.
/// They are never joined.
pub(crate) struct WorkerPool {
    workers: Arc<Workers>,
}

impl WorkerPool {
    pub(crate) fn new(name: &str, core: usize, keep_alive: Duration) -> io::Result<Self> {
        let workers = Arc::new(Workers {
            name: name.to_string(),
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                open: true,
            }),
            ready: Condvar::new(),
            idle: AtomicUsize::new(0),
            spawned: AtomicUsize::new(0),
            keep_alive,
        });

        for _ in 0..core {
            workers.idle.fetch_add(1, Ordering::AcqRel);
            spawn_worker(&workers, true)?;
        }

        Ok(Self { workers })
    }

    /// Queue a job and make sure some worker is free to run it. Gives the
    /// job back if the pool is shutting down.
    pub(crate) fn submit(&self, job: Job) -> Result<(), Job> {
        if !claim_idle(&self.workers.idle) {
            if let Err(err) = spawn_worker(&self.workers, false) {
                // The job still runs once a busy worker frees up.
                warn!(error = %err, "failed to grow worker pool");
            }
        }

        let mut queue = self.workers.lock();
        if !queue.open {
            return Err(job);
        }
        queue.jobs.push_back(job);
        drop(queue);
        self.workers.ready.notify_one();
        Ok(())
    }

    /// Threads started so far, core workers included.
    #[cfg(test)]
    fn spawned(&self) -> usize {
        self.workers.spawned.load(Ordering::Acquire)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.workers.lock().open = false;
        self.workers.ready.notify_all();
    }
}

impl Workers {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until a job is queued. `None` means this worker should exit.
    fn next_job(&self, core: bool) -> Option<Job> {
        let mut queue = self.lock();
        loop {
            if let Some(job) = queue.jobs.pop_front() {
                return Some(job);
            }
            if !queue.open {
                return None;
            }
            let (guard, wait) = self
                .ready
                .wait_timeout(queue, self.keep_alive)
                .unwrap_or_else(PoisonError::into_inner);
            queue = guard;
            // No idle slot left to give up means a job is on its way.
            if wait.timed_out() && queue.jobs.is_empty() && !core && claim_idle(&self.idle) {
                return None;
            }
        }
    }
}

fn claim_idle(idle: &AtomicUsize) -> bool {
    idle.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        .is_ok()
}

fn spawn_worker(workers: &Arc<Workers>, core: bool) -> io::Result<()> {
    let index = workers.spawned.fetch_add(1, Ordering::AcqRel);
    let shared = Arc::clone(workers);
    thread::Builder::new()
        .name(format!("{}-{index}", workers.name))
        .spawn(move || work(&shared, core))?;
    Ok(())
}

fn work(workers: &Workers, core: bool) {
    while let Some(job) = workers.next_job(core) {
        job();
        workers.idle.fetch_add(1, Ordering::AcqRel);
    }
    trace!(core, "worker exiting");
}
