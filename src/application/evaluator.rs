// Threshold evaluator - measurements against configured expectations
use crate::domain::alert::Alert;
use crate::domain::measurement::MeasurementSet;
use crate::domain::pool_status::PoolStatus;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperaturePolicy {
    pub expected: f64,
    pub threshold: f64,
}

impl TemperaturePolicy {
    pub fn new(expected: f64, threshold: f64) -> Self {
        Self {
            expected,
            threshold,
        }
    }

    pub fn check(&self, current: f64) -> Option<Alert> {
        let delta = current - self.expected;
        if delta < -self.threshold {
            Some(Alert::TempLow {
                current,
                expected: self.expected,
                delta,
            })
        } else if delta > self.threshold {
            Some(Alert::TempHigh {
                current,
                expected: self.expected,
                delta,
            })
        } else {
            None
        }
    }
}

/// Evaluate one set of measurements. Every call starts from scratch;
/// nothing carries over from earlier checks.
pub fn evaluate(measurements: MeasurementSet, policy: &TemperaturePolicy, now: DateTime<Utc>) -> PoolStatus {
    let mut alerts = Vec::new();

    let current = measurements.temperature();
    if let Some(alert) = current.and_then(|t| policy.check(t)) {
        alerts.push(alert);
    }

    if measurements.water_flow() == Some(false) {
        alerts.push(Alert::FlowLoss);
    }

    PoolStatus {
        temperature_delta: current.map(|t| t - policy.expected),
        expected_temperature: policy.expected,
        measurements,
        alerts,
        last_updated: now,
    }
}
