// Repository trait for stored measurements
use crate::domain::measurement::{Measurement, MeasurementKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait MeasurementRepository: Send + Sync {
    async fn store_measurement(&self, measurement: &Measurement) -> anyhow::Result<()>;

    /// Measurements of one key in `[from, to]`, oldest first
    async fn historical_measurements(
        &self,
        key: MeasurementKey,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Measurement>>;

    /// Most recent stored measurement per key
    async fn latest_measurements(&self) -> anyhow::Result<BTreeMap<MeasurementKey, Measurement>>;
}
