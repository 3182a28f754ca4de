//! Autoscale error types.

use cosmoscale_core::ResourceId;
use thiserror::Error;

/// Per-collection failures. None of them abort the rest of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScaleError {
    #[error("{resource}: metrics unavailable: {reason}")]
    MetricUnavailable { resource: ResourceId, reason: String },

    #[error("{resource}: partition count unresolved: {reason}")]
    PartitionUnresolved { resource: ResourceId, reason: String },

    #[error("{resource}: control plane error: {reason}")]
    ControlPlane { resource: ResourceId, reason: String },

    #[error("{resource}: invalid state: {reason}")]
    InvalidState { resource: ResourceId, reason: String },
}

impl ScaleError {
    pub fn resource(&self) -> &ResourceId {
        match self {
            ScaleError::MetricUnavailable { resource, .. }
            | ScaleError::PartitionUnresolved { resource, .. }
            | ScaleError::ControlPlane { resource, .. }
            | ScaleError::InvalidState { resource, .. } => resource,
        }
    }

    /// Short machine-friendly kind name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ScaleError::MetricUnavailable { .. } => "metric_unavailable",
            ScaleError::PartitionUnresolved { .. } => "partition_unresolved",
            ScaleError::ControlPlane { .. } => "control_plane",
            ScaleError::InvalidState { .. } => "invalid_state",
        }
    }
}

pub type ScaleResult<T> = Result<T, ScaleError>;

/// Inputs the decider refuses to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecideError {
    #[error("current capacity is zero")]
    ZeroCapacity,

    #[error("partition count is zero")]
    ZeroPartitions,
}
