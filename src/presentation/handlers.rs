// HTTP request handlers
use crate::domain::device::Device;
use crate::domain::measurement::MeasurementKey;
use crate::presentation::api_error::ApiError;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_HISTORY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "type")]
    pub measurement_type: Option<String>,
    pub duration: Option<String>,
}

#[derive(Serialize)]
struct DevicesResponse {
    initialized: bool,
    devices: Vec<Device>,
    selected: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Fresh measurements from the cloud, persisted on the way out
pub async fn current_measurements(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let measurements = state.measurement_service.current().await?;
    Ok(Json(measurements))
}

pub async fn latest_measurements(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let latest = state.measurement_service.latest().await?;
    Ok(Json(latest))
}

pub async fn measurement_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (key, duration) = parse_history_query(&query)?;
    let history = state.measurement_service.history(key, duration, Utc::now()).await?;
    Ok(Json(history))
}

fn parse_history_query(query: &HistoryQuery) -> Result<(MeasurementKey, Duration), ApiError> {
    let name = query
        .measurement_type
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("missing 'type' parameter"))?;
    let key = MeasurementKey::from_name(name)
        .ok_or_else(|| ApiError::bad_request(format!("unknown measurement type '{}'", name)))?;

    let duration = match query.duration.as_deref() {
        None | Some("") => DEFAULT_HISTORY,
        Some(text) => humantime::parse_duration(text)
            .map_err(|e| ApiError::bad_request(format!("invalid duration '{}': {}", text, e)))?,
    };

    Ok((key, duration))
}

/// Fresh evaluation, no alerts sent
pub async fn pool_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let status = state.monitor.status().await?;
    Ok(Json(status))
}

/// Scheduler state and the outcome of the last completed check
pub async fn monitor_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let monitor = &state.monitor;
    let policy = monitor.policy();
    let phase = monitor.phase().await;
    let last_check = monitor.last_check_time().await;
    let latest = monitor.latest_status().await;

    Json(json!({
        "phase": phase,
        "check_interval": humantime::format_duration(monitor.check_interval()).to_string(),
        "expected_temperature": policy.expected,
        "temperature_threshold": policy.threshold,
        "last_check": last_check,
        "latest": latest,
    }))
}

/// Start a check in the background and return immediately
pub async fn trigger_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let last_check = state.monitor.last_check_time().await;
    let monitor = state.monitor.clone();
    tokio::spawn(async move {
        if let Err(e) = monitor.check().await {
            tracing::error!("Manual pool check failed: {}", e);
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "check triggered", "last_check": last_check })),
    )
}

pub async fn send_test_alert(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.dispatcher.send_test(Utc::now()).await?;
    Ok(Json(json!({ "status": "test alert sent" })))
}

pub async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.session.session().await;
    Json(DevicesResponse {
        initialized: state.session.is_initialized(),
        selected: session.selected_serial().map(str::to_owned),
        devices: session.devices,
    })
}

/// Log in again and reload the device list
pub async fn refresh_devices(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.session.login().await?;
    state.session.fetch_device_list().await?;
    Ok(list_devices(State(state)).await)
}

pub async fn select_device(
    State(state): State<Arc<AppState>>,
    Path(serial): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.session.select_device(&serial).await?;
    let selected = state.session.selected_device().await;
    Ok(Json(json!({ "status": "selected", "device": selected })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(measurement_type: Option<&str>, duration: Option<&str>) -> HistoryQuery {
        HistoryQuery {
            measurement_type: measurement_type.map(str::to_string),
            duration: duration.map(str::to_string),
        }
    }

    #[test]
    fn test_history_query_defaults_to_a_day() {
        let (key, duration) = parse_history_query(&query(Some("water_temperature"), None)).unwrap();
        assert_eq!(key, MeasurementKey::Temperature);
        assert_eq!(duration, DEFAULT_HISTORY);
    }

    #[test]
    fn test_history_query_parses_humantime() {
        let (key, duration) = parse_history_query(&query(Some("ph"), Some("6h"))).unwrap();
        assert_eq!(key, MeasurementKey::Ph);
        assert_eq!(duration, Duration::from_secs(6 * 3600));
    }

    #[test]
    fn test_history_query_rejects_bad_input() {
        for q in [
            query(None, None),
            query(Some("salinity"), None),
            query(Some("redox"), Some("soon")),
        ] {
            let err = parse_history_query(&q).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, "ok");
    }
}
