// Pool monitor - scheduled checks with alerting
use crate::application::alert_dispatcher::AlertDispatcher;
use crate::application::evaluator::{evaluate, TemperaturePolicy};
use crate::application::measurement_repository::MeasurementRepository;
use crate::application::measurement_service::record;
use crate::application::measurement_source::MeasurementSource;
use crate::domain::pool_status::PoolStatus;
use crate::error::{FetchError, MonitorError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::mem;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorPhase {
    Idle,
    Running,
    Stopped,
}

enum Lifecycle {
    Idle,
    Running(CancellationToken),
    Stopped,
}

impl Lifecycle {
    fn phase(&self) -> MonitorPhase {
        match self {
            Lifecycle::Idle => MonitorPhase::Idle,
            Lifecycle::Running(_) => MonitorPhase::Running,
            Lifecycle::Stopped => MonitorPhase::Stopped,
        }
    }
}

pub struct PoolMonitor {
    source: Arc<dyn MeasurementSource>,
    dispatcher: Arc<AlertDispatcher>,
    recorder: Option<Arc<dyn MeasurementRepository>>,
    policy: TemperaturePolicy,
    check_interval: Duration,
    last_check: RwLock<Option<DateTime<Utc>>>,
    latest: RwLock<Option<PoolStatus>>,
    lifecycle: Mutex<Lifecycle>,
}

impl PoolMonitor {
    /// `check_interval` must be non-zero.
    pub fn new(
        source: Arc<dyn MeasurementSource>,
        dispatcher: Arc<AlertDispatcher>,
        policy: TemperaturePolicy,
        check_interval: Duration,
    ) -> Self {
        Self {
            source,
            dispatcher,
            recorder: None,
            policy,
            check_interval,
            last_check: RwLock::new(None),
            latest: RwLock::new(None),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Persist the measurements of every check
    pub fn with_recorder(mut self, recorder: Arc<dyn MeasurementRepository>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn policy(&self) -> TemperaturePolicy {
        self.policy
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Start periodic checks. The first check runs immediately.
    pub async fn start(self: &Arc<Self>) -> Result<(), MonitorError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if !matches!(*lifecycle, Lifecycle::Idle) {
            return Err(MonitorError::AlreadyStarted);
        }

        let cancel = CancellationToken::new();
        *lifecycle = Lifecycle::Running(cancel.clone());
        drop(lifecycle);

        let monitor = Arc::clone(self);
        tokio::spawn(async move { monitor.run(cancel).await });

        tracing::info!(
            "Pool monitor started (interval {}, expected {:.1}°C ±{:.1}°C)",
            humantime::format_duration(self.check_interval),
            self.policy.expected,
            self.policy.threshold
        );
        Ok(())
    }

    /// Stop periodic checks. A check already in progress runs to completion.
    pub async fn stop(&self) -> Result<(), MonitorError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if !matches!(*lifecycle, Lifecycle::Running(_)) {
            return Err(MonitorError::NotRunning);
        }
        if let Lifecycle::Running(cancel) = mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            cancel.cancel();
        }
        tracing::info!("Pool monitor stopped");
        Ok(())
    }

    pub async fn phase(&self) -> MonitorPhase {
        self.lifecycle.lock().await.phase()
    }

    async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.check().await {
                        tracing::error!("Scheduled pool check failed: {}", e);
                    }
                }
            }
        }

        tracing::debug!("Pool monitor loop exited");
    }

    /// Run one check now: fetch, evaluate, alert. The check time is
    /// recorded before fetching, so failed checks still count.
    pub async fn check(&self) -> Result<PoolStatus, FetchError> {
        *self.last_check.write().await = Some(Utc::now());
        tracing::info!("Checking pool status");

        let measurements = self.source.current_measurements().await?;
        if measurements.is_empty() {
            tracing::warn!("Device reported no readable measurements");
        }
        for measurement in measurements.iter() {
            tracing::debug!("{}: {}", measurement.key, measurement.value);
        }
        if let Some(recorder) = &self.recorder {
            record(recorder.as_ref(), &measurements).await;
        }

        let status = evaluate(measurements, &self.policy, Utc::now());
        if let Some(alert) = status.temperature_alert() {
            tracing::warn!("Temperature alert: {:?}", alert);
        }
        if status.flow_alert() {
            tracing::warn!("Water flow alert: no flow to probes");
        }
        if let Err(e) = self.dispatcher.dispatch(&status.alerts, status.last_updated).await {
            tracing::error!("{}", e);
        }

        *self.latest.write().await = Some(status.clone());
        Ok(status)
    }

    /// Fresh evaluation without alerting
    pub async fn status(&self) -> Result<PoolStatus, FetchError> {
        let measurements = self.source.current_measurements().await?;
        Ok(evaluate(measurements, &self.policy, Utc::now()))
    }

    pub async fn latest_status(&self) -> Option<PoolStatus> {
        self.latest.read().await.clone()
    }

    pub async fn last_check_time(&self) -> Option<DateTime<Utc>> {
        *self.last_check.read().await
    }
}
