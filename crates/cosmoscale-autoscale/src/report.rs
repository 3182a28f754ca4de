//! Per-pass results.

use std::fmt;

use cosmoscale_core::ResourceId;

use crate::decider::Evaluation;
use crate::error::ScaleError;

/// What happened to one collection during a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Capacity was replaced.
    Resized { from: u64, to: u64 },
    /// Dry run: capacity would have been replaced.
    WouldResize { from: u64, to: u64 },
    /// Evaluated; the decider chose not to move.
    Unchanged { capacity: u64, evaluation: Evaluation },
    /// Data was unusable (no samples, no partitions, invalid capacity).
    Skipped(ScaleError),
    /// A collaborator call failed or timed out.
    Failed(ScaleError),
    /// The pass was cancelled before this collection finished.
    Cancelled,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Resized { from, to } => write!(f, "resized {from} -> {to} RU/s"),
            Outcome::WouldResize { from, to } => {
                write!(f, "would resize {from} -> {to} RU/s (dry run)")
            }
            Outcome::Unchanged {
                capacity,
                evaluation,
            } => {
                write!(f, "unchanged at {capacity} RU/s")?;
                if let Some(load) = &evaluation.load {
                    write!(f, ", consuming {:.0} RU/s", load.aggregate)?;
                }
                if let Some(reason) = &evaluation.hold {
                    write!(f, " ({reason})")?;
                }
                Ok(())
            }
            Outcome::Skipped(e) => write!(f, "skipped: {e}"),
            Outcome::Failed(e) => write!(f, "failed: {e}"),
            Outcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceReport {
    pub resource: ResourceId,
    pub outcome: Outcome,
}

/// Results for a whole pass, in configuration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub resources: Vec<ResourceReport>,
}

impl PassReport {
    pub fn resized(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Resized { .. } | Outcome::WouldResize { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Unchanged { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Cancelled))
    }

    pub fn get(&self, resource: &ResourceId) -> Option<&Outcome> {
        self.resources
            .iter()
            .find(|r| &r.resource == resource)
            .map(|r| &r.outcome)
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.resources.iter().filter(|r| pred(&r.outcome)).count()
    }
}
