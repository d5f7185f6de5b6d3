// Remote session client - login, device selection and stale-session recovery
use crate::application::measurement_source::MeasurementSource;
use crate::application::normalizer::normalize;
use crate::application::pool_api::PoolCloudApi;
use crate::domain::device::{DeviceDetail, DeviceKind, SelectedDevice};
use crate::domain::measurement::MeasurementSet;
use crate::domain::session::{Credentials, Session};
use crate::error::{AuthError, FetchError, SelectError, SessionError};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

/// Owns the one session of this process.
///
/// Every operation that reads or replaces session state holds the session lock
/// for its full duration, so a scheduled check and a manual check never
/// interleave their refresh and select steps.
pub struct SessionClient {
    api: Arc<dyn PoolCloudApi>,
    credentials: Credentials,
    session: Mutex<Session>,
    initialized: watch::Sender<bool>,
}

impl SessionClient {
    pub fn new(api: Arc<dyn PoolCloudApi>, credentials: Credentials) -> Self {
        let (initialized, _) = watch::channel(false);
        Self {
            api,
            credentials,
            session: Mutex::new(Session::default()),
            initialized,
        }
    }

    /// Run initialization in the background. Failure is logged, not fatal.
    ///
    /// The completion signal fires after the first attempt. Failed attempts
    /// are repeated every `retry_delay` until one succeeds or a device has
    /// been selected some other way.
    pub fn spawn_initialization(self: &Arc<Self>, retry_delay: Duration) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match client.initialize().await {
                    Ok(()) => {
                        tracing::info!("Session initialized");
                        return;
                    }
                    Err(e) => tracing::warn!(
                        "Session initialization failed, retrying in {}: {}",
                        humantime::format_duration(retry_delay),
                        e
                    ),
                }

                tokio::time::sleep(retry_delay).await;
                if client.session.lock().await.selected.is_some() {
                    tracing::info!("Device selected meanwhile, initialization retries stopped");
                    return;
                }
            }
        })
    }

    /// Login, fetch the device list and select the first device.
    /// A failed selection gets one token refresh and one retry.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        let result = {
            let mut session = self.session.lock().await;
            self.initialize_in(&mut session).await
        };
        self.initialized.send_replace(true);
        result
    }

    /// Resolves once the first initialization attempt has finished
    pub async fn wait_initialized(&self) {
        let mut rx = self.initialized.subscribe();
        let _ = rx.wait_for(|done| *done).await;
    }

    pub fn is_initialized(&self) -> bool {
        *self.initialized.borrow()
    }

    pub async fn login(&self) -> Result<(), AuthError> {
        let mut session = self.session.lock().await;
        self.login_in(&mut session).await
    }

    pub async fn fetch_device_list(&self) -> Result<(), FetchError> {
        let mut session = self.session.lock().await;
        self.fetch_device_list_in(&mut session).await
    }

    pub async fn select_device(&self, serial: &str) -> Result<(), SelectError> {
        let mut session = self.session.lock().await;
        self.select_in(&mut session, serial).await
    }

    /// Re-select the cached device to force fresh data, then normalize it
    pub async fn get_measurements(&self) -> Result<MeasurementSet, FetchError> {
        let mut session = self.session.lock().await;
        let serial = session
            .selected_serial()
            .map(str::to_owned)
            .ok_or(FetchError::NoDeviceSelected)?;

        self.select_in(&mut session, &serial)
            .await
            .map_err(|e| FetchError::Refresh(Box::new(e)))?;

        let selected = session.selected.as_ref().ok_or(FetchError::NoDeviceSelected)?;
        Ok(normalize(&selected.readings, selected.fetched_at))
    }

    pub async fn selected_device(&self) -> Option<SelectedDevice> {
        self.session.lock().await.selected.clone()
    }

    pub async fn session(&self) -> Session {
        self.session.lock().await.clone()
    }

    async fn initialize_in(&self, session: &mut Session) -> Result<(), SessionError> {
        self.login_in(session).await?;
        self.fetch_device_list_in(session).await?;

        let Some(serial) = session.devices.first().map(|d| d.serial_number.clone()) else {
            tracing::info!("No devices available to select");
            return Ok(());
        };

        tracing::info!("Selecting first device {}", serial);
        if let Err(e) = self.select_in(session, &serial).await {
            tracing::warn!("Selecting device {} failed: {}; refreshing token and retrying", serial, e);
            self.login_in(session).await?;
            self.select_in(session, &serial).await?;
        }

        Ok(())
    }

    async fn login_in(&self, session: &mut Session) -> Result<(), AuthError> {
        let token = self.api.login(&self.credentials).await?;
        tracing::info!("Login successful, token {}", token.redacted());
        session.token = Some(token);
        Ok(())
    }

    async fn fetch_device_list_in(&self, session: &mut Session) -> Result<(), FetchError> {
        let token = session.token.as_ref().ok_or(FetchError::Unauthorized)?;
        let devices = self.api.list_devices(token).await?;

        tracing::debug!("Fetched {} devices", devices.len());
        session.devices = devices;
        session.last_fetch = Some(Utc::now());
        Ok(())
    }

    async fn fetch_detail(&self, session: &Session, serial: &str) -> Result<DeviceDetail, FetchError> {
        let token = session.token.as_ref().ok_or(FetchError::Unauthorized)?;
        self.api.device_detail(token, serial).await
    }

    async fn select_in(&self, session: &mut Session, serial: &str) -> Result<(), SelectError> {
        if !session.is_listed(serial) {
            return Err(SelectError::UnknownDevice(serial.to_string()));
        }

        let detail = self.fetch_detail(session, serial).await?;
        if !detail.is_empty() {
            return accept_detail(session, serial, detail);
        }

        tracing::warn!("Empty response for device {}, attempting full reconnect", serial);
        self.login_in(session).await?;
        self.fetch_device_list_in(session).await?;
        if !session.is_listed(serial) {
            return Err(SelectError::UnknownDevice(serial.to_string()));
        }

        // single retry; a second empty answer is terminal
        let retry = self.fetch_detail(session, serial).await?;
        if retry.is_empty() {
            tracing::error!("Still empty response for device {} after reconnect", serial);
            return Err(SelectError::StaleSession(serial.to_string()));
        }

        tracing::info!("Reconnected, selected device {}", serial);
        accept_detail(session, serial, retry)
    }
}

fn accept_detail(session: &mut Session, serial: &str, detail: DeviceDetail) -> Result<(), SelectError> {
    match &detail.kind {
        DeviceKind::NotFound => return Err(SelectError::NotFound(serial.to_string())),
        DeviceKind::AccessDenied => return Err(SelectError::Forbidden(serial.to_string())),
        DeviceKind::NeverConnected => {
            tracing::info!("Device {} has never been connected", serial);
        }
        DeviceKind::Unit => {}
        DeviceKind::Unspecified => {
            tracing::warn!("Response for device {} has no kind, treating it as a unit", serial);
        }
        DeviceKind::Other(kind) => {
            return Err(SelectError::UnsupportedKind {
                serial: serial.to_string(),
                kind: kind.clone(),
            });
        }
    }

    let now = Utc::now();
    session.selected = Some(SelectedDevice::from_detail(detail, now));
    session.last_fetch = Some(now);
    Ok(())
}

#[async_trait]
impl MeasurementSource for SessionClient {
    async fn current_measurements(&self) -> Result<MeasurementSet, FetchError> {
        self.get_measurements().await
    }
}
