//! Fixed-size worker-thread pool with an SPMD `Communicator` contract (C10).
//!
//! Deliberately not built on `rayon`: the protocol below needs a barrier
//! every worker reaches together plus a collective reduction folded back into
//! one value (`checkpoint`/`reduce`), which doesn't fit a work-stealing
//! scheduler. Persistent OS threads coordinated by `crossbeam-channel` plus a
//! `std::sync::Barrier` give the scatter/gather shape split search (C8) and
//! transform (C11) actually need, at the cost of giving up work-stealing load
//! balance (row ranges are assigned once per dispatch, not re-balanced
//! mid-flight).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use thiserror::Error;

/// Errors surfaced by the worker pool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("worker thread panicked: {0}")]
    Panicked(String),
    #[error("cancellation requested")]
    Canceled,
}

/// Result alias for worker-pool operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// A reduction operator applied collectively across workers in
/// [`Communicator::reduce`].
#[derive(Debug, Clone, Copy)]
pub enum ReduceOp {
    Sum,
    Max,
    LogicalAnd,
}

impl ReduceOp {
    fn fold(self, a: f64, b: f64) -> f64 {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Max => a.max(b),
            ReduceOp::LogicalAnd => {
                if a != 0.0 && b != 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Per-round handle given to each worker: a barrier, a checkpoint (barrier +
/// boolean all-reduce), and a collective reduction. Built on a
/// [`std::sync::Barrier`] for the synchronization points and a
/// `parking_lot::Mutex`-guarded accumulator for the reduction itself.
pub struct Communicator {
    barrier: Arc<Barrier>,
    checkpoint_ok: Arc<Mutex<bool>>,
    reduce_acc: Arc<Mutex<Option<f64>>>,
    cancel: Arc<AtomicBool>,
}

impl Communicator {
    /// Blocks until every worker (and the main thread) reaches this call.
    pub fn barrier(&self) {
        self.barrier.wait();
    }

    /// Barrier plus a boolean all-reduce: returns `true` only if every
    /// participant passed `true` since the previous checkpoint. Used to
    /// propagate a worker's error to the main thread without unwinding
    /// across a thread boundary.
    pub fn checkpoint(&self, ok: bool) -> bool {
        {
            let mut guard = self.checkpoint_ok.lock();
            if !ok {
                *guard = false;
            }
        }
        self.barrier.wait();
        let result = *self.checkpoint_ok.lock();
        let wait_result = self.barrier.wait();
        if wait_result.is_leader() {
            *self.checkpoint_ok.lock() = true;
        }
        self.barrier.wait();
        result
    }

    /// Collective reduction of `value` across every participant using `op`.
    pub fn reduce(&self, op: ReduceOp, value: &mut f64) {
        {
            let mut acc = self.reduce_acc.lock();
            *acc = Some(match *acc {
                Some(existing) => op.fold(existing, *value),
                None => *value,
            });
        }
        self.barrier.wait();
        *value = self.reduce_acc.lock().expect("reduce value set before barrier");
        let wait_result = self.barrier.wait();
        if wait_result.is_leader() {
            *self.reduce_acc.lock() = None;
        }
        self.barrier.wait();
    }

    /// `true` once a cancellation has been requested via
    /// [`WorkerPool::cancel`].
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}

type Job = Box<dyn FnOnce(&Communicator) + Send>;

/// A fixed pool of worker threads coordinated through [`Communicator`].
pub struct WorkerPool {
    senders: Vec<Sender<Job>>,
    handles: Vec<std::thread::JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
    dispatch_lock: Mutex<()>,
}

impl WorkerPool {
    /// Spawns `num_threads` persistent worker threads.
    #[must_use]
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let cancel = Arc::new(AtomicBool::new(false));
        let barrier = Arc::new(Barrier::new(num_threads));
        let checkpoint_ok = Arc::new(Mutex::new(true));
        let reduce_acc = Arc::new(Mutex::new(None));

        let mut senders = Vec::with_capacity(num_threads);
        let mut handles = Vec::with_capacity(num_threads);

        for _ in 0..num_threads {
            let (tx, rx): (Sender<Job>, Receiver<Job>) = bounded(1);
            let comm = Communicator {
                barrier: barrier.clone(),
                checkpoint_ok: checkpoint_ok.clone(),
                reduce_acc: reduce_acc.clone(),
                cancel: cancel.clone(),
            };
            let handle = std::thread::spawn(move || {
                while let Ok(job) = rx.recv() {
                    job(&comm);
                }
            });
            senders.push(tx);
            handles.push(handle);
        }

        WorkerPool {
            senders,
            handles,
            cancel,
            dispatch_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.senders.len()
    }

    /// Requests cancellation; workers observe it at their next `checkpoint`.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Dispatches `make_job(worker_index)` to every worker and waits for all
    /// of them to finish. Only one dispatch may be in flight at a time (the
    /// pool serves one fit or one transform operation at a time).
    pub fn scatter_gather<F>(&self, make_job: F)
    where
        F: Fn(usize) -> Job,
    {
        let _guard = self.dispatch_lock.lock();
        for (i, sender) in self.senders.iter().enumerate() {
            sender.send(make_job(i)).expect("worker thread alive");
        }
    }

    /// Runs `f(worker_index, communicator)` on every worker and blocks until
    /// all of them report a result, returning one `T` per worker in worker
    /// order. Built on [`WorkerPool::scatter_gather`] plus a return channel,
    /// since `scatter_gather` alone only dispatches — it does not wait.
    ///
    /// This is the split-search (C8) and transform (C11) entry point: callers
    /// give every worker its own row/candidate range and a shared `Arc`
    /// snapshot of the data it needs, and get back one partial result per
    /// worker to merge.
    pub fn map<T, F>(&self, f: F) -> Vec<T>
    where
        T: Send + 'static,
        F: Fn(usize, &Communicator) -> T + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let (result_tx, result_rx): (Sender<T>, Receiver<T>) = bounded(self.senders.len());
        self.scatter_gather(|worker| {
            let f = Arc::clone(&f);
            let result_tx = result_tx.clone();
            Box::new(move |comm: &Communicator| {
                let result = f(worker, comm);
                let _ = result_tx.send(result);
            })
        });
        (0..self.senders.len())
            .map(|_| result_rx.recv().expect("worker sent its result"))
            .collect()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.senders.clear();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn pool_reports_requested_thread_count() {
        let pool = WorkerPool::new(4);
        assert_eq!(pool.num_threads(), 4);
    }

    #[test]
    fn reduce_sums_across_workers() {
        let pool = WorkerPool::new(4);
        let results: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(std::sync::Barrier::new(5));
        pool.scatter_gather(|worker| {
            let results = results.clone();
            let done = done.clone();
            Box::new(move |comm: &Communicator| {
                let mut v = (worker + 1) as f64;
                comm.reduce(ReduceOp::Sum, &mut v);
                results.lock().push(v);
                done.wait();
            })
        });
        done.wait();
        let r = results.lock();
        assert_eq!(r.len(), 4);
        assert!(r.iter().all(|&v| v == 10.0)); // 1+2+3+4
    }

    #[test]
    fn map_collects_one_result_per_worker_in_order() {
        let pool = WorkerPool::new(4);
        let results = pool.map(|worker, _comm| worker * 10);
        assert_eq!(results, vec![0, 10, 20, 30]);
    }

    #[test]
    fn checkpoint_propagates_failure() {
        let pool = WorkerPool::new(2);
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(std::sync::Barrier::new(3));
        let failing = Arc::new(AtomicUsize::new(0));
        pool.scatter_gather(|worker| {
            let outcomes = outcomes.clone();
            let done = done.clone();
            let failing = failing.clone();
            Box::new(move |comm: &Communicator| {
                let ok = worker != 0;
                let all_ok = comm.checkpoint(ok);
                if !all_ok {
                    failing.fetch_add(1, Ordering::SeqCst);
                }
                outcomes.lock().push(all_ok);
                done.wait();
            })
        });
        done.wait();
        let outcomes = outcomes.lock();
        assert!(outcomes.iter().all(|&ok| !ok));
    }
}
