//! Error types for the pool telemetry service

/// Login failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("credentials rejected: {0}")]
    Rejected(String),

    #[error("authentication service unreachable: {0}")]
    Unreachable(String),

    #[error("unreadable login response: {0}")]
    Decode(String),
}

/// Failures of authenticated fetches
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("session token rejected")]
    Unauthorized,

    #[error("network error: {0}")]
    Network(String),

    #[error("unreadable response: {0}")]
    Decode(String),

    #[error("no device selected")]
    NoDeviceSelected,

    #[error("refreshing selected device failed: {0}")]
    Refresh(#[source] Box<SelectError>),
}

/// Failures of device selection
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("device {0} is not in the current device list")]
    UnknownDevice(String),

    #[error("device not found: {0}")]
    NotFound(String),

    #[error("access denied for device: {0}")]
    Forbidden(String),

    #[error("received empty response for device {0} even after reconnect")]
    StaleSession(String),

    #[error("unsupported response kind '{kind}' for device {serial}")]
    UnsupportedKind { serial: String, kind: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("reconnect failed: {0}")]
    Reconnect(#[from] AuthError),
}

/// Failures of the initial login, list and select sequence
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Select(#[from] SelectError),
}

/// Failure to deliver one alert to one receiver
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("alerting is disabled")]
    Disabled,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

#[derive(Debug)]
pub struct DeliveryFailure {
    pub receiver: String,
    pub error: SendError,
}

/// Per-receiver failures of one multi-receiver send
#[derive(Debug, thiserror::Error)]
#[error("failed to deliver alert to {} receiver(s): {}", .failures.len(), describe_failures(.failures))]
pub struct AggregateError {
    pub failures: Vec<DeliveryFailure>,
}

fn describe_failures(failures: &[DeliveryFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.receiver, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("alert service is disabled")]
    Disabled,

    #[error("no receivers configured")]
    NoReceivers,

    #[error(transparent)]
    Delivery(#[from] AggregateError),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("monitor has already been started")]
    AlreadyStarted,

    #[error("monitor is not running")]
    NotRunning,
}

/// History query failures
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history duration {0} reaches past the earliest representable time")]
    OutOfRange(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_error_lists_every_receiver() {
        let err = AggregateError {
            failures: vec![
                DeliveryFailure {
                    receiver: "a@example.com".to_string(),
                    error: SendError::Delivery("timeout".to_string()),
                },
                DeliveryFailure {
                    receiver: "b@example.com".to_string(),
                    error: SendError::Disabled,
                },
            ],
        };
        let message = err.to_string();
        assert!(message.starts_with("failed to deliver alert to 2 receiver(s)"));
        assert!(message.contains("a@example.com: delivery failed: timeout"));
        assert!(message.contains("b@example.com: alerting is disabled"));
    }

    #[test]
    fn test_refresh_error_keeps_select_cause() {
        let err = FetchError::Refresh(Box::new(SelectError::StaleSession("110".to_string())));
        assert!(err.to_string().contains("even after reconnect"));
    }
}
