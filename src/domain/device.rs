// Pool controller device models
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub severity: String,
    pub message: String,
}

/// A device as listed by the cloud service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub serial_number: String,
    pub display_name: String,
    pub online: bool,
    pub status_messages: Vec<StatusMessage>,
}

impl Device {
    pub fn new(serial_number: String, display_name: String, online: bool) -> Self {
        Self {
            serial_number,
            display_name,
            online,
            status_messages: Vec::new(),
        }
    }
}

/// Kind of record the cloud service reports for a detail lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DeviceKind {
    Unit,
    NeverConnected,
    NotFound,
    AccessDenied,
    /// The service omitted the kind discriminator
    Unspecified,
    Other(String),
}

impl DeviceKind {
    pub fn from_typename(typename: &str) -> Self {
        match typename {
            "Unit" => DeviceKind::Unit,
            "UnitNeverConnected" => DeviceKind::NeverConnected,
            "UnitNotFoundError" => DeviceKind::NotFound,
            "UnitAccessDeniedError" => DeviceKind::AccessDenied,
            "" => DeviceKind::Unspecified,
            other => DeviceKind::Other(other.to_string()),
        }
    }
}

/// One status value exactly as the service reports it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawReading {
    pub remote_type: String,
    pub value: String,
    pub unit: Option<String>,
    pub observed_at: Option<DateTime<Utc>>,
}

impl RawReading {
    pub fn new(remote_type: impl Into<String>, value: impl Into<String>, unit: Option<String>) -> Self {
        Self {
            remote_type: remote_type.into(),
            value: value.into(),
            unit,
            observed_at: None,
        }
    }
}

/// Detail snapshot returned for a single device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceDetail {
    pub kind: DeviceKind,
    pub serial_number: String,
    pub name: String,
    pub status_messages: Vec<StatusMessage>,
    pub readings: Vec<RawReading>,
}

impl DeviceDetail {
    /// A response that echoed no serial number back
    pub fn empty() -> Self {
        Self {
            kind: DeviceKind::Unspecified,
            serial_number: String::new(),
            name: String::new(),
            status_messages: Vec::new(),
            readings: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.serial_number.is_empty()
    }
}

/// The cached record of the selected device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedDevice {
    pub serial_number: String,
    pub name: String,
    pub never_connected: bool,
    pub status_messages: Vec<StatusMessage>,
    pub readings: Vec<RawReading>,
    pub fetched_at: DateTime<Utc>,
}

impl SelectedDevice {
    pub fn from_detail(detail: DeviceDetail, fetched_at: DateTime<Utc>) -> Self {
        let never_connected = detail.kind == DeviceKind::NeverConnected;
        Self {
            serial_number: detail.serial_number,
            name: detail.name,
            never_connected,
            status_messages: detail.status_messages,
            // a never-connected unit has no live measurements
            readings: if never_connected { Vec::new() } else { detail.readings },
            fetched_at,
        }
    }
}
