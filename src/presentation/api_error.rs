// HTTP error mapping
use crate::error::{AuthError, DispatchError, FetchError, HistoryError, SelectError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {}", self.message);
        } else {
            tracing::debug!("Request rejected: {}", self.message);
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    }
}

impl From<SelectError> for ApiError {
    fn from(e: SelectError) -> Self {
        let status = match &e {
            SelectError::UnknownDevice(_) | SelectError::NotFound(_) => StatusCode::NOT_FOUND,
            SelectError::Forbidden(_) => StatusCode::FORBIDDEN,
            SelectError::UnsupportedKind { .. } => StatusCode::BAD_GATEWAY,
            SelectError::StaleSession(_) | SelectError::Fetch(_) | SelectError::Reconnect(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        Self::new(status, e.to_string())
    }
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        let status = match &e {
            DispatchError::Disabled => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::NoReceivers => StatusCode::BAD_REQUEST,
            DispatchError::Delivery(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, e.to_string())
    }
}

impl From<HistoryError> for ApiError {
    fn from(e: HistoryError) -> Self {
        match e {
            HistoryError::OutOfRange(_) => Self::bad_request(e.to_string()),
            HistoryError::Storage(inner) => inner.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, format!("{:#}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_error_status() {
        let cases = [
            (SelectError::NotFound("1".to_string()), StatusCode::NOT_FOUND),
            (SelectError::Forbidden("1".to_string()), StatusCode::FORBIDDEN),
            (SelectError::StaleSession("1".to_string()), StatusCode::SERVICE_UNAVAILABLE),
            (SelectError::UnknownDevice("1".to_string()), StatusCode::NOT_FOUND),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status(), status);
        }
    }

    #[test]
    fn test_fetch_and_dispatch_status() {
        assert_eq!(
            ApiError::from(FetchError::NoDeviceSelected).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(DispatchError::NoReceivers).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DispatchError::Disabled).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_history_error_status() {
        assert_eq!(
            ApiError::from(HistoryError::OutOfRange("100000000years".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(HistoryError::Storage(anyhow::anyhow!("influx down"))).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
