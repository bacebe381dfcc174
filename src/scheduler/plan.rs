//! `ExecutionPlan`: the operator DAG (spec §4.1 "an execution plan
//! declares arbitrary DAG edges between named operator tasks").
//!
//! Generic over the per-edge payload type `T` (in this crate, always
//! `OperatorResult`) so the scheduler has no dependency on the exec
//! layer's types.

use crate::common::error::{EngineError, EngineResult};
use crate::scheduler::task::Scheduler;
use std::sync::Mutex;

/// A plan node's work: given the already-computed outputs of its
/// producers (in `create_link` order), produce this node's output.
pub type PlanTask<T> = Box<dyn FnOnce(&[T]) -> EngineResult<T> + Send>;

struct PlanNode<T> {
    task: Mutex<Option<PlanTask<T>>>,
    /// Indices of nodes whose output must be available before this node runs.
    producers: Vec<usize>,
}

/// A DAG of operator tasks. `add_operator` assigns each a monotonically
/// increasing index (spec §4.1); `create_link` declares a producer→consumer
/// edge; `start`/`join` execute the plan, `join` returning the output of
/// the plan's sink (the node added last with no outgoing edge is assumed
/// to be the sink, matching the planner's convention of making the final
/// merged component's output the plan's result).
pub struct ExecutionPlan<T> {
    nodes: Vec<PlanNode<T>>,
    outputs: Vec<Mutex<Option<T>>>,
    sink: Option<usize>,
}

impl<T: Send + Clone + 'static> ExecutionPlan<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            outputs: Vec::new(),
            sink: None,
        }
    }

    /// Register an operator task and return its index in the DAG.
    pub fn add_operator(&mut self, task: PlanTask<T>) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(PlanNode {
            task: Mutex::new(Some(task)),
            producers: Vec::new(),
        });
        self.outputs.push(Mutex::new(None));
        self.sink = Some(idx);
        idx
    }

    /// Declare that `consumer`'s task tree must not begin until
    /// `producer`'s task tree has completed (spec §4.1 `create_link`).
    pub fn create_link(&mut self, producer_idx: usize, consumer_idx: usize) {
        self.nodes[consumer_idx].producers.push(producer_idx);
    }

    /// Explicitly mark the plan's sink (overrides the "last node added" default).
    pub fn set_sink(&mut self, idx: usize) {
        self.sink = Some(idx);
    }

    fn run_node(&self, idx: usize, scheduler: &Scheduler) -> EngineResult<T> {
        {
            let guard = self.outputs[idx].lock().unwrap();
            if let Some(existing) = guard.as_ref() {
                return Ok(existing.clone());
            }
        }

        let producer_indices = self.nodes[idx].producers.clone();
        // Run producers first. Independent producers run in parallel on
        // the scheduler's pool; a consumer only observes completed output
        // (spec §5 "a consumer sees the producer's complete output").
        let producer_outputs: Vec<EngineResult<T>> = if producer_indices.is_empty() {
            Vec::new()
        } else {
            scheduler.install(|| {
                use rayon::prelude::*;
                producer_indices
                    .par_iter()
                    .map(|&p| self.run_node(p, scheduler))
                    .collect()
            })
        };

        let mut inputs = Vec::with_capacity(producer_outputs.len());
        for out in producer_outputs {
            inputs.push(out?);
        }

        let task = self.nodes[idx]
            .task
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| EngineError::Scheduler(format!("node {idx} already consumed")))?;

        let result = task(&inputs)?;
        *self.outputs[idx].lock().unwrap() = Some(result.clone());
        Ok(result)
    }

    /// Submit the plan for execution and release workers (spec §4.1
    /// `add_task` + `start`). In this synchronous model `start` runs the
    /// whole DAG to completion; `join` simply returns the cached sink
    /// output, mirroring the spec's blocking-`join` contract.
    pub fn start(&self, scheduler: &Scheduler) -> EngineResult<()> {
        let sink = self
            .sink
            .ok_or_else(|| EngineError::Scheduler("plan has no operators".to_string()))?;
        self.run_node(sink, scheduler)?;
        Ok(())
    }

    /// Block until the plan's sink has completed and return its output
    /// (spec §4.1 `join`).
    pub fn join(&self, scheduler: &Scheduler) -> EngineResult<T> {
        let sink = self
            .sink
            .ok_or_else(|| EngineError::Scheduler("plan has no operators".to_string()))?;
        self.run_node(sink, scheduler)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<T: Send + Clone + 'static> Default for ExecutionPlan<T> {
    fn default() -> Self {
        Self::new()
    }
}
