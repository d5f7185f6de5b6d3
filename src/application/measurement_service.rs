// Measurement service - fresh readings, persistence and history queries
use crate::application::measurement_repository::MeasurementRepository;
use crate::application::measurement_source::MeasurementSource;
use crate::domain::measurement::{Measurement, MeasurementKey, MeasurementSet};
use crate::error::{FetchError, HistoryError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Stored measurements of one key over `[from, to]`
#[derive(Debug, Serialize)]
pub struct MeasurementHistory {
    #[serde(rename = "type")]
    pub key: MeasurementKey,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub measurements: Vec<Measurement>,
}

#[derive(Clone)]
pub struct MeasurementService {
    source: Arc<dyn MeasurementSource>,
    repository: Arc<dyn MeasurementRepository>,
}

impl MeasurementService {
    pub fn new(source: Arc<dyn MeasurementSource>, repository: Arc<dyn MeasurementRepository>) -> Self {
        Self { source, repository }
    }

    /// Fetch the current set from the cloud and persist it
    pub async fn current(&self) -> Result<MeasurementSet, FetchError> {
        let measurements = self.source.current_measurements().await?;
        record(self.repository.as_ref(), &measurements).await;
        Ok(measurements)
    }

    pub async fn history(
        &self,
        key: MeasurementKey,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<MeasurementHistory, HistoryError> {
        let from = window_start(duration, now)
            .ok_or_else(|| HistoryError::OutOfRange(humantime::format_duration(duration).to_string()))?;
        let measurements = self.repository.historical_measurements(key, from, now).await?;
        Ok(MeasurementHistory {
            key,
            from,
            to: now,
            measurements,
        })
    }

    pub async fn latest(&self) -> anyhow::Result<BTreeMap<MeasurementKey, Measurement>> {
        let latest = self.repository.latest_measurements().await?;
        for key in MeasurementKey::ALL.iter().filter(|k| !latest.contains_key(k)) {
            tracing::debug!("No stored {} measurement", key);
        }
        Ok(latest)
    }
}

fn window_start(duration: Duration, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let span = chrono::Duration::from_std(duration).ok()?;
    now.checked_sub_signed(span)
}

/// Store every measurement of a set. Storage failures are logged and skipped.
pub async fn record(repository: &dyn MeasurementRepository, measurements: &MeasurementSet) {
    for measurement in measurements.iter() {
        if let Err(e) = repository.store_measurement(measurement).await {
            tracing::warn!("Failed to store {} measurement: {:#}", measurement.key, e);
        }
    }
}
