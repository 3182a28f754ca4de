use std::fmt::Write as _;

use cosmoscale_autoscale::Evaluation;
use cosmoscale_core::{CapacityDecision, CapacityPolicy, CapacitySnapshot, MetricSample};

pub fn decide(
    capacity: u64,
    partitions: u32,
    policy: CapacityPolicy,
    samples: Vec<u64>,
) -> anyhow::Result<()> {
    policy.validate().map_err(anyhow::Error::msg)?;
    let snapshot = CapacitySnapshot {
        current_capacity: capacity,
        partition_count: partitions,
    };
    let evaluation = cosmoscale_autoscale::decide(&policy, &snapshot, &MetricSample::new(samples))?;
    print!("{}", describe(&evaluation));
    Ok(())
}

fn describe(evaluation: &Evaluation) -> String {
    let mut out = String::new();
    if let Some(load) = &evaluation.load {
        let _ = writeln!(out, "average     {:.2} RU/s per partition", load.average);
        let _ = writeln!(out, "aggregate   {:.2} RU/s", load.aggregate);
        let _ = writeln!(out, "ratio       {:.2}", load.ratio);
        if let Some(raw) = load.raw_target {
            let _ = writeln!(out, "raw target  {raw:.2} RU/s");
        }
    }
    match (&evaluation.decision, &evaluation.hold) {
        (CapacityDecision::SetTo(target), _) => {
            let _ = writeln!(out, "decision    set capacity to {target} RU/s");
        }
        (CapacityDecision::NoChange, Some(reason)) => {
            let _ = writeln!(out, "decision    no change ({reason})");
        }
        (CapacityDecision::NoChange, None) => {
            let _ = writeln!(out, "decision    no change");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CapacityPolicy {
        CapacityPolicy {
            threshold_rate: 0.7,
            increase_rate: 0.1,
            default_value: 400,
        }
    }

    fn evaluate(capacity: u64, partitions: u32, samples: Vec<u64>) -> Evaluation {
        let snapshot = CapacitySnapshot {
            current_capacity: capacity,
            partition_count: partitions,
        };
        cosmoscale_autoscale::decide(&policy(), &snapshot, &MetricSample::new(samples)).unwrap()
    }

    #[test]
    fn describes_a_resize() {
        let text = describe(&evaluate(1000, 2, vec![600, 700]));
        assert!(text.contains("average     650.00 RU/s per partition"), "{text}");
        assert!(text.contains("aggregate   1300.00 RU/s"), "{text}");
        assert!(text.contains("ratio       1.30"), "{text}");
        assert!(text.contains("raw target  1857.14 RU/s"), "{text}");
        assert!(text.ends_with("decision    set capacity to 1900 RU/s\n"), "{text}");
    }

    #[test]
    fn describes_a_hold() {
        let text = describe(&evaluate(2000, 2, vec![600, 800]));
        assert!(!text.contains("raw target"), "{text}");
        assert!(text.ends_with("decision    no change (utilization within band)\n"), "{text}");
    }

    #[test]
    fn too_few_samples_has_no_load() {
        let text = describe(&evaluate(1000, 2, vec![600]));
        assert!(!text.contains("average"), "{text}");
        assert!(text.starts_with("decision    no change ("), "{text}");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(decide(0, 2, policy(), vec![600, 700]).is_err());
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let mut policy = policy();
        policy.threshold_rate = -1.0;
        assert!(decide(1000, 2, policy, vec![600, 700]).is_err());
    }
}
