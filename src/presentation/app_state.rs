// Application state for HTTP handlers
use crate::application::alert_dispatcher::AlertDispatcher;
use crate::application::measurement_service::MeasurementService;
use crate::application::monitor::PoolMonitor;
use crate::application::session_client::SessionClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionClient>,
    pub monitor: Arc<PoolMonitor>,
    pub measurement_service: MeasurementService,
    pub dispatcher: Arc<AlertDispatcher>,
}
