//! Orchestrator: runs one capacity pass over every managed collection.
//!
//! Each collection is evaluated independently on a bounded worker pool:
//! partition count → metric sample → current capacity → decide → apply.
//! A failure in one collection is logged and recorded in the report; it
//! never stops its siblings.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, info_span, warn};

use cosmoscale_core::{
    CapacityDecision, CapacitySnapshot, ConfigResult, ManagedCollection, MetricWindow, Settings,
};

use crate::decider::decide;
use crate::error::ScaleError;
use crate::report::{Outcome, PassReport, ResourceReport};
use crate::sources::Collaborators;

/// Knobs for one pass.
#[derive(Debug, Clone)]
pub struct PassOptions {
    /// Maximum collections evaluated at the same time.
    pub concurrency: usize,
    /// Timeout applied to every collaborator call.
    pub call_timeout: Duration,
    /// Evaluate but never apply.
    pub dry_run: bool,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            call_timeout: Duration::from_secs(30),
            dry_run: false,
        }
    }
}

impl PassOptions {
    pub fn from_settings(settings: &Settings) -> ConfigResult<Self> {
        Ok(Self {
            concurrency: settings.run.concurrency,
            call_timeout: settings.call_timeout()?,
            dry_run: settings.run.dry_run,
        })
    }
}

/// Drives the sampler, decider and applier for a list of collections.
pub struct Orchestrator {
    collections: Vec<ManagedCollection>,
    worker: Arc<Worker>,
}

impl Orchestrator {
    pub fn new(
        collections: Vec<ManagedCollection>,
        collaborators: Collaborators,
        options: PassOptions,
    ) -> Self {
        Self {
            collections,
            worker: Arc::new(Worker {
                collaborators,
                options,
            }),
        }
    }

    pub fn collections(&self) -> &[ManagedCollection] {
        &self.collections
    }

    pub fn options(&self) -> &PassOptions {
        &self.worker.options
    }

    /// Run one pass over the `[now-10m, now-5m)` metric window.
    pub async fn run_pass(&self, shutdown: watch::Receiver<bool>) -> PassReport {
        self.run_pass_at(MetricWindow::trailing(Utc::now()), shutdown)
            .await
    }

    /// Run one pass over an explicit metric window.
    ///
    /// Setting `shutdown` to `true` stops new collections from starting and
    /// abandons in-flight ones at their next step. A capacity write that has
    /// already been issued is allowed to finish.
    pub async fn run_pass_at(
        &self,
        window: MetricWindow,
        mut shutdown: watch::Receiver<bool>,
    ) -> PassReport {
        let options = &self.worker.options;
        info!(
            collections = self.collections.len(),
            concurrency = options.concurrency,
            dry_run = options.dry_run,
            window_start = %window.start,
            window_end = %window.end,
            "capacity pass started"
        );

        let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut task_index = HashMap::new();
        let mut outcomes: Vec<Option<Outcome>> = vec![None; self.collections.len()];

        for (index, collection) in self.collections.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => {
                    info!("shutdown requested, not starting remaining collections");
                    break;
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let worker = self.worker.clone();
            let collection = collection.clone();
            let task_shutdown = shutdown.clone();
            let span = info_span!(
                "collection",
                account = %collection.id.account,
                database = %collection.id.database,
                collection = %collection.id.collection,
            );
            let handle = tasks.spawn(
                async move {
                    let _permit = permit;
                    worker.evaluate(&collection, window, task_shutdown).await
                }
                .instrument(span),
            );
            task_index.insert(handle.id(), index);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    if let Some(&index) = task_index.get(&id) {
                        outcomes[index] = Some(outcome);
                    }
                }
                Err(e) => {
                    let Some(&index) = task_index.get(&e.id()) else {
                        continue;
                    };
                    let resource = self.collections[index].id.clone();
                    error!(%resource, error = %e, "collection evaluation aborted");
                    outcomes[index] = Some(if e.is_cancelled() {
                        Outcome::Cancelled
                    } else {
                        Outcome::Failed(ScaleError::InvalidState {
                            resource,
                            reason: format!("evaluation aborted: {e}"),
                        })
                    });
                }
            }
        }

        let report = PassReport {
            resources: self
                .collections
                .iter()
                .zip(outcomes)
                .map(|(collection, outcome)| ResourceReport {
                    resource: collection.id.clone(),
                    outcome: outcome.unwrap_or(Outcome::Cancelled),
                })
                .collect(),
        };

        info!(
            resized = report.resized(),
            unchanged = report.unchanged(),
            skipped = report.skipped(),
            failed = report.failed(),
            cancelled = report.cancelled(),
            "capacity pass finished"
        );
        report
    }
}

/// Shared, immutable per-pass state handed to each collection task.
struct Worker {
    collaborators: Collaborators,
    options: PassOptions,
}

/// Why a collection stopped before reaching a decision.
enum Interrupt {
    Cancelled,
    Skip(ScaleError),
    Fail(ScaleError),
}

/// Failure of a single collaborator call.
enum CallError {
    Cancelled,
    Failed(String),
}

impl CallError {
    fn into_interrupt(self, make: impl FnOnce(String) -> ScaleError) -> Interrupt {
        match self {
            CallError::Cancelled => Interrupt::Cancelled,
            CallError::Failed(reason) => Interrupt::Fail(make(reason)),
        }
    }
}

impl Worker {
    async fn evaluate(
        &self,
        collection: &ManagedCollection,
        window: MetricWindow,
        mut shutdown: watch::Receiver<bool>,
    ) -> Outcome {
        let resource = &collection.id;
        match self.try_evaluate(collection, window, &mut shutdown).await {
            Ok(outcome) => outcome,
            Err(Interrupt::Cancelled) => {
                debug!(%resource, "evaluation cancelled");
                Outcome::Cancelled
            }
            Err(Interrupt::Skip(e)) => {
                match &e {
                    ScaleError::InvalidState { .. } => {
                        warn!(%resource, kind = e.kind(), error = %e, "collection skipped")
                    }
                    _ => info!(%resource, kind = e.kind(), error = %e, "collection skipped"),
                }
                Outcome::Skipped(e)
            }
            Err(Interrupt::Fail(e)) => {
                error!(%resource, kind = e.kind(), error = %e, "collection evaluation failed");
                Outcome::Failed(e)
            }
        }
    }

    async fn try_evaluate(
        &self,
        collection: &ManagedCollection,
        window: MetricWindow,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Outcome, Interrupt> {
        let resource = &collection.id;
        let c = &self.collaborators;

        let partition_count = self
            .call(shutdown, c.partitions.count_partitions(collection))
            .await
            .map_err(|e| {
                e.into_interrupt(|reason| ScaleError::PartitionUnresolved {
                    resource: resource.clone(),
                    reason,
                })
            })?;
        if partition_count == 0 {
            return Err(Interrupt::Skip(ScaleError::PartitionUnresolved {
                resource: resource.clone(),
                reason: "no partition key ranges reported".to_string(),
            }));
        }

        let sample = self
            .call(shutdown, c.sampler.fetch_recent_samples(collection, &window))
            .await
            .map_err(|e| {
                e.into_interrupt(|reason| ScaleError::MetricUnavailable {
                    resource: resource.clone(),
                    reason,
                })
            })?;
        if sample.is_empty() {
            return Err(Interrupt::Skip(ScaleError::MetricUnavailable {
                resource: resource.clone(),
                reason: "no metric data in window".to_string(),
            }));
        }

        let current_capacity = self
            .call(shutdown, c.applier.current_capacity(collection))
            .await
            .map_err(|e| {
                e.into_interrupt(|reason| ScaleError::ControlPlane {
                    resource: resource.clone(),
                    reason,
                })
            })?;

        let snapshot = CapacitySnapshot {
            current_capacity,
            partition_count,
        };
        let evaluation = decide(&collection.policy, &snapshot, &sample).map_err(|e| {
            Interrupt::Skip(ScaleError::InvalidState {
                resource: resource.clone(),
                reason: e.to_string(),
            })
        })?;

        let target = match evaluation.decision {
            CapacityDecision::NoChange => {
                debug!(
                    %resource,
                    capacity = current_capacity,
                    partitions = partition_count,
                    samples = sample.len(),
                    consumption = evaluation.load.map(|l| l.aggregate),
                    ratio = evaluation.load.map(|l| l.ratio),
                    hold = ?evaluation.hold,
                    "no capacity change"
                );
                return Ok(Outcome::Unchanged {
                    capacity: current_capacity,
                    evaluation,
                });
            }
            CapacityDecision::SetTo(target) => target,
        };
        // A floor-clamped target can equal what is already provisioned.
        if target == current_capacity {
            debug!(
                %resource,
                capacity = current_capacity,
                "target already provisioned"
            );
            return Ok(Outcome::Unchanged {
                capacity: current_capacity,
                evaluation,
            });
        }

        let consumption = evaluation.load.map(|l| l.aggregate);
        if self.options.dry_run {
            info!(
                %resource,
                from = current_capacity,
                to = target,
                consumption,
                "dry run: capacity change not applied"
            );
            return Ok(Outcome::WouldResize {
                from: current_capacity,
                to: target,
            });
        }

        if *shutdown.borrow() {
            return Err(Interrupt::Cancelled);
        }

        // Not raced against shutdown: once sent, the write runs to completion.
        info!(
            %resource,
            from = current_capacity,
            to = target,
            consumption,
            "replacing provisioned capacity"
        );
        let applied = tokio::time::timeout(
            self.options.call_timeout,
            c.applier.apply_capacity(collection, target),
        )
        .await;
        match flatten(applied, self.options.call_timeout) {
            Ok(()) => Ok(Outcome::Resized {
                from: current_capacity,
                to: target,
            }),
            Err(reason) => Err(Interrupt::Fail(ScaleError::ControlPlane {
                resource: resource.clone(),
                reason,
            })),
        }
    }

    /// Run one collaborator call under the pass timeout, giving up early on
    /// shutdown.
    async fn call<T, F>(
        &self,
        shutdown: &mut watch::Receiver<bool>,
        fut: F,
    ) -> Result<T, CallError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let timeout = self.options.call_timeout;
        tokio::select! {
            biased;
            _ = wait_for_shutdown(shutdown) => Err(CallError::Cancelled),
            res = tokio::time::timeout(timeout, fut) => flatten(res, timeout).map_err(CallError::Failed),
        }
    }
}

fn flatten<T>(
    res: Result<anyhow::Result<T>, tokio::time::error::Elapsed>,
    timeout: Duration,
) -> Result<T, String> {
    match res {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(_) => Err(format!("timed out after {timeout:?}")),
    }
}

/// Resolves once the shutdown flag is set. Never resolves if the sender is
/// gone without having signalled.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
