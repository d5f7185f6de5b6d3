// Source of fresh measurements for the monitor
use crate::domain::measurement::MeasurementSet;
use crate::error::FetchError;
use async_trait::async_trait;

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait MeasurementSource: Send + Sync {
    async fn current_measurements(&self) -> Result<MeasurementSet, FetchError>;
}
