//! Greedy join-order planner (spec §4.8): a disjoint-set forest plus a
//! min-priority queue keyed by `size(left) × size(right)`, assembling a
//! `HashJoin` operator DAG bottom-up.
//!
//! The host crate's own `planner::optimizer::JoinOrderingRule` is an
//! unimplemented stub (`// TODO: Implement join ordering optimization`),
//! so this is new code; the union-find + min-heap shape is the standard
//! greedy MST-style join assembly, consistent with the host's
//! `OptimizationRule` trait shape (one rule, one well-defined transform).

use crate::common::config::OperatorOptions;
use crate::common::error::{EngineError, EngineResult};
use crate::exec::{LazyTable, OperatorResult};
use crate::operators::{HashJoinOperator, Operator};
use crate::scheduler::ExecutionPlan;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// One equality join predicate between two base tables (spec §4.8
/// "a set of equality join predicates `{(left_col, right_col)}`").
pub struct JoinPredicate {
    pub left_table: String,
    pub left_col: String,
    pub right_table: String,
    pub right_col: String,
}

impl JoinPredicate {
    pub fn new(
        left_table: impl Into<String>,
        left_col: impl Into<String>,
        right_table: impl Into<String>,
        right_col: impl Into<String>,
    ) -> Self {
        Self {
            left_table: left_table.into(),
            left_col: left_col.into(),
            right_table: right_table.into(),
            right_col: right_col.into(),
        }
    }
}

struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    /// Union by size, returning the new root.
    fn union(&mut self, a: usize, b: usize) -> usize {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return ra;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        ra
    }
}

/// Build an `ExecutionPlan` joining every table in `tables` according to
/// `predicates`, cheapest-first by `row_count(left) × row_count(right)`
/// (spec §4.8 steps 1-5). Returns the plan and the index of its sink
/// node — the final merged component's output.
pub fn plan_joins(
    tables: Vec<LazyTable>,
    predicates: Vec<JoinPredicate>,
    options: OperatorOptions,
    num_threads: usize,
) -> EngineResult<(ExecutionPlan<OperatorResult>, usize)> {
    let table_index: HashMap<String, usize> = tables
        .iter()
        .enumerate()
        .map(|(i, t)| (t.table.name.clone(), i))
        .collect();
    let sizes: Vec<usize> = tables.iter().map(|t| t.row_count()).collect();

    let mut plan: ExecutionPlan<OperatorResult> = ExecutionPlan::new();
    let mut component_sink: Vec<usize> = Vec::with_capacity(tables.len());
    for table in &tables {
        let single = OperatorResult::single(table.clone());
        let node = plan.add_operator(Box::new(move |_inputs: &[OperatorResult]| Ok(single.clone())));
        component_sink.push(node);
    }

    let mut dsu = DisjointSet::new(tables.len());
    let mut heap: BinaryHeap<Reverse<(usize, usize)>> = BinaryHeap::new();
    for (idx, pred) in predicates.iter().enumerate() {
        let lt = *table_index
            .get(&pred.left_table)
            .ok_or_else(|| EngineError::MissingColumn(pred.left_table.clone()))?;
        let rt = *table_index
            .get(&pred.right_table)
            .ok_or_else(|| EngineError::MissingColumn(pred.right_table.clone()))?;
        heap.push(Reverse((sizes[lt].saturating_mul(sizes[rt]), idx)));
    }

    while let Some(Reverse((_, idx))) = heap.pop() {
        let pred = &predicates[idx];
        let lt = table_index[&pred.left_table];
        let rt = table_index[&pred.right_table];
        let root_l = dsu.find(lt);
        let root_r = dsu.find(rt);
        if root_l == root_r {
            return Err(EngineError::CyclicJoin(vec![pred.left_table.clone(), pred.right_table.clone()]));
        }

        let left_sink = component_sink[root_l];
        let right_sink = component_sink[root_r];
        let left_table = pred.left_table.clone();
        let left_col = pred.left_col.clone();
        let right_table = pred.right_table.clone();
        let right_col = pred.right_col.clone();

        let join_node = plan.add_operator(Box::new(move |inputs: &[OperatorResult]| {
            let mut combined = OperatorResult::new(Vec::new());
            for input in inputs {
                for lazy in &input.tables {
                    combined.push(lazy.clone());
                }
            }
            let mut op = HashJoinOperator::new(
                left_table.clone(),
                left_col.clone(),
                right_table.clone(),
                right_col.clone(),
                options,
                num_threads,
            );
            op.run(combined)
        }));
        plan.create_link(left_sink, join_node);
        plan.create_link(right_sink, join_node);

        let new_root = dsu.union(root_l, root_r);
        component_sink[new_root] = join_node;
    }

    let sink = component_sink[dsu.find(0)];
    plan.set_sink(sink);
    Ok((plan, sink))
}
