//! The DAG task scheduler (spec §4.1 / §5): a fixed-size worker pool
//! executing short-lived tasks with explicit producer→consumer edges.

pub mod plan;
pub mod task;

pub use plan::{ExecutionPlan, PlanTask};
pub use task::{Scheduler, Task};
