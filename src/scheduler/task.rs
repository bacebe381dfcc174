//! The worker pool and the `task_chain` / `spawn` primitives (spec §4.1).
//!
//! Tasks run to completion on a worker; there is no preemption and no
//! per-task cancellation (spec §5). The pool is a thin wrapper over
//! `rayon::ThreadPool` — the host crate already leans on rayon for every
//! morsel-driven parallel operator, so the DAG scheduler is built as a
//! layer on top of it rather than a second work-stealing implementation.

use crate::common::error::{EngineError, EngineResult};
use std::panic::{self, AssertUnwindSafe};

/// A unit of work submitted to the [`Scheduler`]. Boxed so chains and
/// plans can hold heterogeneous closures.
pub type Task = Box<dyn FnOnce() -> EngineResult<()> + Send>;

/// One global scheduler per process (spec §4.1 "Model"): a fixed-size
/// worker pool sized to hardware concurrency by default.
pub struct Scheduler {
    pool: rayon::ThreadPool,
}

impl Scheduler {
    pub fn new(num_threads: usize) -> EngineResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads.max(1))
            .thread_name(|i| format!("vectorq-worker-{i}"))
            .build()
            .map_err(|e| EngineError::Scheduler(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn from_system() -> EngineResult<Self> {
        Self::new(num_cpus::get())
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Enqueue a task whose preconditions are already satisfied
    /// (spec §4.1 "Public contract"). Fire-and-forget: failures must be
    /// observed by a caller who joins on the enclosing scope instead.
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(f);
    }

    /// Run `f` inside the pool and block the caller until it (and every
    /// task it transitively spawns via `scope`) completes. This is how
    /// operators express "await": by spawning children and letting the
    /// parent complete once `rayon::scope` returns (spec §5).
    pub fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        self.pool.install(f)
    }

    /// Construct a composite task that runs `tasks` strictly in order,
    /// where each task is fully finished — including any work it spawned
    /// internally via `rayon::scope` — before the next one starts
    /// (spec §4.1 `task_chain`). A panic in any task aborts the query
    /// and is converted into an [`EngineError::Internal`] rather than
    /// unwinding across the pool boundary (spec §5 "Panics in any task
    /// abort the query").
    pub fn task_chain(&self, tasks: Vec<Task>) -> EngineResult<()> {
        self.install(|| {
            for task in tasks {
                let result = panic::catch_unwind(AssertUnwindSafe(task));
                match result {
                    Ok(inner) => inner?,
                    Err(payload) => {
                        let msg = panic_message(payload);
                        return Err(EngineError::Internal(format!(
                            "task panicked: {msg}"
                        )));
                    }
                }
            }
            Ok(())
        })
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn task_chain_runs_in_order() {
        let scheduler = Scheduler::new(4).unwrap();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut tasks: Vec<Task> = Vec::new();
        for i in 0..5 {
            let order = order.clone();
            tasks.push(Box::new(move || {
                order.lock().unwrap().push(i);
                Ok(())
            }));
        }

        scheduler.task_chain(tasks).unwrap();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn task_chain_propagates_panics_as_errors() {
        let scheduler = Scheduler::new(2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter2 = counter.clone();

        let tasks: Vec<Task> = vec![
            Box::new(move || {
                counter2.fetch_add(1, Ordering::SeqCst);
                panic!("boom");
            }),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        ];

        let result = scheduler.task_chain(tasks);
        assert!(result.is_err());
    }
}
