//! Bounded pool of background worker threads.
//!
//! Jobs are queued on a single channel and picked up in arrival order by
//! whichever worker is free. Every submitted job produces exactly one
//! `Finished` record: either its output or the message of the panic that
//! aborted it. Results are collected by the owning thread, either by polling
//! (`try_recv`) or by blocking on one ticket (`wait_for`).

use std::collections::{HashSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use thiserror::Error;

/// A unit of work executed on a worker thread.
pub trait Job: Send + 'static {
    type Output: Send + 'static;

    /// Short description for log output.
    fn describe(&self) -> String;

    fn run(self) -> Self::Output;
}

/// Identifies one submitted job.
pub type Ticket = u64;

/// Completion record for one job.
#[derive(Debug)]
pub struct Finished<T> {
    pub ticket: Ticket,
    /// Job output, or the panic message if the job panicked
    pub outcome: Result<T, String>,
}

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Worker pool has shut down")]
    Closed,
}

/// Message sent to worker threads.
enum WorkerMessage<J> {
    Run(Ticket, J),
    Shutdown,
}

/// Fixed-size pool of worker threads running jobs of type `J`.
pub struct WorkerPool<J: Job> {
    request_tx: Sender<WorkerMessage<J>>,
    result_rx: Receiver<Finished<J::Output>>,
    handles: Vec<JoinHandle<()>>,
    next_ticket: Ticket,
    pending: HashSet<Ticket>,
    /// Results received while waiting for a different ticket
    buffered: VecDeque<Finished<J::Output>>,
    dispatched: usize,
}

impl<J: Job> WorkerPool<J> {
    /// Spawn `threads` workers (at least one).
    pub fn spawn(name: &str, threads: usize) -> Result<Self, PoolError> {
        let threads = threads.max(1);
        let (request_tx, request_rx) = mpsc::channel::<WorkerMessage<J>>();
        let (result_tx, result_rx) = mpsc::channel::<Finished<J::Output>>();
        let request_rx = Arc::new(Mutex::new(request_rx));

        let mut handles = Vec::with_capacity(threads);
        for i in 0..threads {
            let request_rx = Arc::clone(&request_rx);
            let result_tx = result_tx.clone();
            let thread_name = format!("{}-{}", name, i);
            let handle = thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || {
                    log::debug!("Worker {} started", thread_name);
                    Self::worker_loop(&request_rx, &result_tx);
                    log::debug!("Worker {} exiting", thread_name);
                })?;
            handles.push(handle);
        }

        log::info!("Spawned {} '{}' worker threads", threads, name);

        Ok(Self {
            request_tx,
            result_rx,
            handles,
            next_ticket: 0,
            pending: HashSet::new(),
            buffered: VecDeque::new(),
            dispatched: 0,
        })
    }

    fn worker_loop(
        request_rx: &Mutex<Receiver<WorkerMessage<J>>>,
        result_tx: &Sender<Finished<J::Output>>,
    ) {
        loop {
            let message = match request_rx.lock() {
                Ok(rx) => rx.recv(),
                Err(_) => {
                    log::error!("Worker queue lock poisoned, worker exiting");
                    break;
                }
            };

            match message {
                Ok(WorkerMessage::Run(ticket, job)) => {
                    let description = job.describe();
                    log::trace!("Running job {} ({})", ticket, description);
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.run()))
                        .map_err(|payload| panic_message(payload.as_ref()));
                    if let Err(message) = &outcome {
                        log::error!("Job {} ({}) panicked: {}", ticket, description, message);
                    }
                    if result_tx.send(Finished { ticket, outcome }).is_err() {
                        log::debug!("Result channel closed, worker exiting");
                        break;
                    }
                }
                Ok(WorkerMessage::Shutdown) | Err(RecvError) => break,
            }
        }
    }

    /// Queue a job. Returns the ticket that identifies its result.
    pub fn submit(&mut self, job: J) -> Result<Ticket, PoolError> {
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let description = job.describe();
        self.request_tx
            .send(WorkerMessage::Run(ticket, job))
            .map_err(|_| PoolError::Closed)?;

        self.pending.insert(ticket);
        self.dispatched += 1;
        log::debug!("Dispatched job {} ({})", ticket, description);
        Ok(ticket)
    }

    fn received(&mut self, finished: &Finished<J::Output>) {
        self.pending.remove(&finished.ticket);
    }

    /// Take one completed result without blocking.
    pub fn try_recv(&mut self) -> Option<Finished<J::Output>> {
        if let Some(finished) = self.buffered.pop_front() {
            return Some(finished);
        }
        match self.result_rx.try_recv() {
            Ok(finished) => {
                self.received(&finished);
                Some(finished)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("All workers disconnected");
                None
            }
        }
    }

    /// Block until the job with `ticket` completes.
    ///
    /// Results for other tickets that arrive meanwhile stay queued for
    /// `try_recv`. Returns `None` if the ticket is unknown or the workers are
    /// gone.
    pub fn wait_for(&mut self, ticket: Ticket) -> Option<Finished<J::Output>> {
        if let Some(pos) = self.buffered.iter().position(|f| f.ticket == ticket) {
            return self.buffered.remove(pos);
        }
        if !self.pending.contains(&ticket) {
            return None;
        }

        loop {
            match self.result_rx.recv() {
                Ok(finished) => {
                    self.received(&finished);
                    if finished.ticket == ticket {
                        return Some(finished);
                    }
                    self.buffered.push_back(finished);
                }
                Err(RecvError) => {
                    log::warn!("Workers disconnected while waiting for job {}", ticket);
                    return None;
                }
            }
        }
    }

    /// Whether a job is still queued or running.
    pub fn is_pending(&self, ticket: Ticket) -> bool {
        self.pending.contains(&ticket)
    }

    /// Number of jobs queued or running.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Total number of jobs submitted since the pool was spawned.
    pub fn dispatched_count(&self) -> usize {
        self.dispatched
    }

    pub fn thread_count(&self) -> usize {
        self.handles.len()
    }
}

impl<J: Job> Drop for WorkerPool<J> {
    fn drop(&mut self) {
        log::debug!("Shutting down {} worker threads", self.handles.len());

        for _ in 0..self.handles.len() {
            let _ = self.request_tx.send(WorkerMessage::Shutdown);
        }

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.join() {
                log::warn!("Worker thread panicked: {:?}", e);
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Square(u64);

    impl Job for Square {
        type Output = u64;

        fn describe(&self) -> String {
            format!("square {}", self.0)
        }

        fn run(self) -> u64 {
            if self.0 == 13 {
                panic!("unlucky");
            }
            self.0 * self.0
        }
    }

    fn drain(pool: &mut WorkerPool<Square>, expected: usize) -> Vec<Finished<u64>> {
        let mut results = Vec::new();
        for _ in 0..1000 {
            while let Some(finished) = pool.try_recv() {
                results.push(finished);
            }
            if results.len() == expected {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        results
    }

    #[test]
    fn test_every_job_completes_once() {
        let mut pool = WorkerPool::spawn("test", 3).unwrap();
        let tickets: Vec<Ticket> = (0..20).map(|i| pool.submit(Square(i)).unwrap()).collect();
        assert_eq!(pool.dispatched_count(), 20);

        let mut results = drain(&mut pool, 20);
        results.sort_by_key(|f| f.ticket);
        assert_eq!(results.len(), 20);
        for (finished, ticket) in results.iter().zip(&tickets) {
            assert_eq!(finished.ticket, *ticket);
        }
        assert_eq!(results[4].outcome.as_ref().unwrap(), &16);
        assert_eq!(pool.pending_count(), 0);
    }

    #[test]
    fn test_panic_reported_as_failure() {
        let mut pool = WorkerPool::spawn("test", 1).unwrap();
        let bad = pool.submit(Square(13)).unwrap();
        let good = pool.submit(Square(3)).unwrap();

        let finished = pool.wait_for(bad).unwrap();
        assert_eq!(finished.outcome.unwrap_err(), "unlucky");

        // The worker survives the panic
        let finished = pool.wait_for(good).unwrap();
        assert_eq!(finished.outcome.unwrap(), 9);
    }

    #[test]
    fn test_wait_for_buffers_other_results() {
        let mut pool = WorkerPool::spawn("test", 1).unwrap();
        let first = pool.submit(Square(2)).unwrap();
        let second = pool.submit(Square(5)).unwrap();

        let finished = pool.wait_for(second).unwrap();
        assert_eq!(finished.outcome.unwrap(), 25);

        let buffered = pool.try_recv().unwrap();
        assert_eq!(buffered.ticket, first);
        assert!(pool.wait_for(first).is_none());
    }
}
