//! Threshold alert evaluation, run synchronously on every metric ingestion.
//!
//! Stateless: each crossing produces a new firing alert draft. There is no
//! deduplication window and no automatic resolution.

use crate::db::enums::AlertSeverity;
use crate::db::models::NewMetricSample;

pub const CPU_WARNING_THRESHOLD: f64 = 80.0;
pub const CPU_CRITICAL_THRESHOLD: f64 = 90.0;
pub const MEMORY_WARNING_THRESHOLD: f64 = 80.0;
pub const MEMORY_CRITICAL_THRESHOLD: f64 = 90.0;
pub const DISK_WARNING_THRESHOLD: f64 = 85.0;

/// An alert the evaluator wants persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub severity: AlertSeverity,
    pub message: String,
}

/// Pure function from one metric sample to zero or more alert drafts. Each
/// qualifying metric emits independently, so a sample hot on both CPU and
/// memory yields two drafts.
pub fn evaluate(sample: &NewMetricSample) -> Vec<AlertDraft> {
    let mut drafts = Vec::new();

    if let Some(draft) = tiered(
        "CPU",
        sample.cpu_usage,
        CPU_WARNING_THRESHOLD,
        CPU_CRITICAL_THRESHOLD,
    ) {
        drafts.push(draft);
    }
    if let Some(draft) = tiered(
        "Memory",
        sample.memory_usage,
        MEMORY_WARNING_THRESHOLD,
        MEMORY_CRITICAL_THRESHOLD,
    ) {
        drafts.push(draft);
    }
    // Disk has a single tier: anything over the threshold is a warning,
    // never critical.
    if sample.disk_usage > DISK_WARNING_THRESHOLD {
        drafts.push(AlertDraft {
            severity: AlertSeverity::Warning,
            message: format!(
                "Disk usage at {:.1}% exceeds {:.0}% threshold",
                sample.disk_usage, DISK_WARNING_THRESHOLD
            ),
        });
    }

    drafts
}

fn tiered(metric: &str, value: f64, warning: f64, critical: f64) -> Option<AlertDraft> {
    if value > critical {
        Some(AlertDraft {
            severity: AlertSeverity::Critical,
            message: format!(
                "{metric} usage at {value:.1}% exceeds {critical:.0}% threshold"
            ),
        })
    } else if value > warning {
        Some(AlertDraft {
            severity: AlertSeverity::Warning,
            message: format!(
                "{metric} usage at {value:.1}% exceeds {warning:.0}% threshold"
            ),
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(cpu: f64, memory: f64, disk: f64) -> NewMetricSample {
        NewMetricSample {
            cpu_usage: cpu,
            memory_usage: memory,
            disk_usage: disk,
            network_in: 0.0,
            network_out: 0.0,
        }
    }

    #[test]
    fn test_quiet_sample_produces_no_alerts() {
        assert!(evaluate(&sample(50.0, 40.0, 30.0)).is_empty());
    }

    #[test]
    fn test_cpu_warning_tier() {
        let drafts = evaluate(&sample(85.0, 0.0, 0.0));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].severity, AlertSeverity::Warning);
        assert!(drafts[0].message.contains("CPU"));
    }

    #[test]
    fn test_cpu_critical_tier() {
        let drafts = evaluate(&sample(95.0, 0.0, 0.0));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_thresholds_are_strict() {
        // Exactly at a threshold is not a crossing.
        assert!(evaluate(&sample(80.0, 80.0, 85.0)).is_empty());
        // Exactly 90 stays in the warning tier.
        let drafts = evaluate(&sample(90.0, 0.0, 0.0));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].severity, AlertSeverity::Warning);
    }

    #[test]
    fn test_disk_is_never_critical() {
        let drafts = evaluate(&sample(0.0, 0.0, 99.9));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].severity, AlertSeverity::Warning);
    }

    #[test]
    fn test_each_metric_emits_independently() {
        let drafts = evaluate(&sample(95.0, 85.0, 90.0));
        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[0].severity, AlertSeverity::Critical);
        assert_eq!(drafts[1].severity, AlertSeverity::Warning);
        assert_eq!(drafts[2].severity, AlertSeverity::Warning);
    }
}
