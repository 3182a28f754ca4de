//! cosmoscale-autoscale: metrics-driven throughput scaling for collections.
//!
//! Turns a short window of per-second consumption samples into a bounded,
//! quantized capacity decision, and runs that decision for every managed
//! collection in one finite pass.
//!
//! # Decision Algorithm
//!
//! ```text
//! average   = mean(samples)                  // needs >= 2 samples
//! aggregate = partitions * average
//! ratio     = round2(aggregate / capacity)
//!
//! if (ratio - increase >= threshold || ratio + increase < threshold)
//!    && aggregate > 1000:
//!     raw = aggregate / threshold
//!     if |raw - aggregate| > 100:
//!         SetTo(max(floor(raw / 100) * 100 + 100, default_value))
//!
//! NoChange otherwise
//! ```
//!
//! # Pass
//!
//! ```text
//! Orchestrator::run_pass
//!   └── per collection (bounded worker pool)
//!         PartitionCounter → CapacityApplier::current_capacity
//!           → MetricSampler → decide() → CapacityApplier::apply_capacity
//! ```

pub mod decider;
pub mod error;
pub mod orchestrator;
pub mod report;
pub mod sources;

pub use decider::{Evaluation, HoldReason, LoadEstimate, decide};
pub use error::{DecideError, ScaleError, ScaleResult};
pub use orchestrator::{Orchestrator, PassOptions};
pub use report::{Outcome, PassReport, ResourceReport};
pub use sources::{CapacityApplier, Collaborators, MetricSampler, PartitionCounter};
