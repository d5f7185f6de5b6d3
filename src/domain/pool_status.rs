// Pool status snapshot derived from one evaluation
use super::alert::{Alert, AlertKind};
use super::measurement::MeasurementSet;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolStatus {
    pub measurements: MeasurementSet,
    pub expected_temperature: f64,
    pub temperature_delta: Option<f64>,
    pub alerts: Vec<Alert>,
    pub last_updated: DateTime<Utc>,
}

impl PoolStatus {
    pub fn has_alert(&self, kind: AlertKind) -> bool {
        self.alerts.iter().any(|a| a.kind() == kind)
    }

    pub fn temperature_alert(&self) -> Option<&Alert> {
        self.alerts
            .iter()
            .find(|a| matches!(a.kind(), AlertKind::TempLow | AlertKind::TempHigh))
    }

    pub fn flow_alert(&self) -> bool {
        self.has_alert(AlertKind::FlowLoss)
    }
}
