//! Capacity decider: the pure control-loop step.
//!
//! Given the live capacity snapshot, the collection's policy and a window of
//! per-partition consumption samples, decides whether provisioned
//! throughput should move and to what. No I/O, no clock, no state: the same
//! inputs always give the same decision.

use std::fmt;

use cosmoscale_core::{CapacityDecision, CapacityPolicy, CapacitySnapshot, MetricSample};

use crate::error::DecideError;

/// Samples needed before the average is trusted.
pub const MIN_SAMPLES: usize = 2;

/// Aggregate consumption at or below this is never resized.
pub const ACTIVITY_FLOOR: f64 = 1000.0;

/// Capacity moves in steps of this size; smaller adjustments are skipped.
pub const CAPACITY_STEP: u64 = 100;

/// Why a decision came out as `NoChange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    /// Fewer than [`MIN_SAMPLES`] observations.
    InsufficientSamples(usize),
    /// Utilization sits inside the hysteresis band.
    WithinBand,
    /// Aggregate consumption is at or below [`ACTIVITY_FLOOR`].
    BelowActivityFloor,
    /// The adjustment would be at most one [`CAPACITY_STEP`].
    DeltaTooSmall,
}

impl fmt::Display for HoldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldReason::InsufficientSamples(n) => write!(f, "only {n} metric samples"),
            HoldReason::WithinBand => f.write_str("utilization within band"),
            HoldReason::BelowActivityFloor => f.write_str("consumption below activity floor"),
            HoldReason::DeltaTooSmall => {
                write!(f, "adjustment smaller than {CAPACITY_STEP}")
            }
        }
    }
}

/// Load figures derived from the sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadEstimate {
    /// Mean per-partition consumption per second.
    pub average: f64,
    /// `partition_count * average`.
    pub aggregate: f64,
    /// `aggregate / current_capacity`, rounded to two decimals.
    pub ratio: f64,
    /// Capacity that would put utilization exactly at the threshold. Only
    /// computed when the band is left.
    pub raw_target: Option<f64>,
}

/// Decision plus the numbers that led to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub decision: CapacityDecision,
    pub hold: Option<HoldReason>,
    pub load: Option<LoadEstimate>,
}

impl Evaluation {
    fn hold(reason: HoldReason, load: Option<LoadEstimate>) -> Self {
        Self {
            decision: CapacityDecision::NoChange,
            hold: Some(reason),
            load,
        }
    }
}

/// Evaluate one collection.
///
/// Fails closed: a zero capacity or partition count is rejected before any
/// division happens.
pub fn decide(
    policy: &CapacityPolicy,
    snapshot: &CapacitySnapshot,
    sample: &MetricSample,
) -> Result<Evaluation, DecideError> {
    if snapshot.current_capacity == 0 {
        return Err(DecideError::ZeroCapacity);
    }
    if snapshot.partition_count == 0 {
        return Err(DecideError::ZeroPartitions);
    }

    let average = match sample.mean() {
        Some(avg) if sample.len() >= MIN_SAMPLES => avg,
        _ => {
            return Ok(Evaluation::hold(
                HoldReason::InsufficientSamples(sample.len()),
                None,
            ));
        }
    };

    let aggregate = snapshot.partition_count as f64 * average;
    let ratio = round2(aggregate / snapshot.current_capacity as f64);
    let mut load = LoadEstimate {
        average,
        aggregate,
        ratio,
        raw_target: None,
    };

    // Upper edge inclusive, lower edge exclusive.
    let above = round2(ratio - policy.increase_rate) >= policy.threshold_rate;
    let below = round2(ratio + policy.increase_rate) < policy.threshold_rate;
    if !(above || below) {
        return Ok(Evaluation::hold(HoldReason::WithinBand, Some(load)));
    }
    if aggregate <= ACTIVITY_FLOOR {
        return Ok(Evaluation::hold(HoldReason::BelowActivityFloor, Some(load)));
    }

    let raw_target = aggregate / policy.threshold_rate;
    load.raw_target = Some(raw_target);

    if (raw_target - aggregate).abs() <= CAPACITY_STEP as f64 {
        return Ok(Evaluation::hold(HoldReason::DeltaTooSmall, Some(load)));
    }

    let target = quantize(raw_target).max(policy.default_value);
    Ok(Evaluation {
        decision: CapacityDecision::SetTo(target),
        hold: None,
        load: Some(load),
    })
}

/// Next multiple of [`CAPACITY_STEP`] strictly above `raw`.
fn quantize(raw: f64) -> u64 {
    let step = CAPACITY_STEP as f64;
    let floored = raw - raw.rem_euclid(step);
    floored as u64 + CAPACITY_STEP
}

/// Round half to even at two decimal places.
fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}
