//! The four hard operators (spec §4.3-§4.6) plus the predicate tree
//! they share.
//!
//! Every operator follows the same three-phase shape the host's
//! execution operators use (`execute()` after setup, here split
//! explicitly into Initialize/Execute/Finish since LIP's build phase
//! and probe phase are genuinely separate scheduler stages — see
//! SPEC_FULL §10.4): `initialize` resolves column references and
//! builds any side-tables, `execute` runs the parallel per-chunk/
//! per-batch work, `finish` assembles and back-propagates.

pub mod filter_join;
pub mod hash_aggregate;
pub mod hash_join;
pub mod predicate;
pub mod select;

pub use filter_join::{DimJoinSpec, FilterJoinOperator};
pub use hash_aggregate::{HashAggregateOperator, OrderKey};
pub use hash_join::HashJoinOperator;
pub use predicate::{CompareOp, ConnectiveOp, Predicate, PredicateTree};
pub use select::SelectOperator;

use crate::common::error::EngineResult;
use crate::exec::OperatorResult;

/// Common shape every operator in this module implements. `initialize`
/// and `finish` are synchronous setup/teardown; `execute` is where an
/// operator is expected to fan out across the scheduler's worker pool.
pub trait Operator {
    fn initialize(&mut self, input: &OperatorResult) -> EngineResult<()>;
    fn execute(&mut self, input: OperatorResult) -> EngineResult<OperatorResult>;
    fn finish(&mut self) -> EngineResult<()> {
        Ok(())
    }

    /// Run all three phases in sequence — the common case for a
    /// one-shot operator invocation within a plan node.
    fn run(&mut self, input: OperatorResult) -> EngineResult<OperatorResult> {
        self.initialize(&input)?;
        let output = self.execute(input)?;
        self.finish()?;
        Ok(output)
    }
}
