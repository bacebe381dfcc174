//! `OperatorOptions` — the small config object recognized by every operator (spec §6).

use crate::common::error::EngineError;

/// Chooses between the single-phase and two-phase hash aggregate implementation.
/// `HashAgg` (two-phase, thread-local pre-aggregation then merge) is the
/// recommended default for the core; `ArrowAgg` is a simpler single-phase
/// strategy kept for the cross-check in testable property 2 (spec §8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateStrategy {
    ArrowAgg,
    HashAgg,
}

impl Default for AggregateStrategy {
    fn default() -> Self {
        AggregateStrategy::HashAgg
    }
}

/// Operator-wide tuning knobs. Recognized fields per spec §6.
#[derive(Debug, Clone, Copy)]
pub struct OperatorOptions {
    /// Multiplier on hardware concurrency used to size batches in join
    /// probe, LIP probe, and per-chunk filter/take. Default 1.0.
    pub parallel_factor: f64,
    /// Aggregate implementation strategy.
    pub aggregate_type: AggregateStrategy,
}

impl Default for OperatorOptions {
    fn default() -> Self {
        Self {
            parallel_factor: 1.0,
            aggregate_type: AggregateStrategy::default(),
        }
    }
}

impl OperatorOptions {
    /// Returns a copy with out-of-range options clamped to sensible
    /// defaults, per spec §7 ("Unsupported operator option" policy).
    /// `parallel_factor <= 0` is clamped to `1.0` and logged.
    pub fn normalized(&self) -> Self {
        let mut opts = *self;
        if opts.parallel_factor <= 0.0 {
            tracing::warn!(
                target: "vectorq::config",
                requested = opts.parallel_factor,
                "parallel_factor <= 0 is invalid, clamping to 1.0"
            );
            opts.parallel_factor = 1.0;
        }
        opts
    }

    /// Number of parallel batches to split `num_chunks` chunks into,
    /// given the available hardware threads.
    pub fn batch_count(&self, num_chunks: usize, threads: usize) -> usize {
        let opts = self.normalized();
        let denom = ((threads as f64) * opts.parallel_factor).max(1.0);
        ((num_chunks as f64) / denom).ceil().max(1.0) as usize
    }

    /// Validate an option and surface [`EngineError::InvalidOption`] when a
    /// caller wants strict validation instead of silent clamping.
    pub fn validate_parallel_factor(value: f64) -> Result<f64, EngineError> {
        if value <= 0.0 {
            Err(EngineError::InvalidOption {
                option: "parallel_factor",
                reason: format!("must be > 0, got {value}"),
            })
        } else {
            Ok(value)
        }
    }
}
