// Remote session state
use super::device::{Device, SelectedDevice};
use chrono::{DateTime, Utc};
use std::fmt;

/// Opaque bearer token issued by the cloud service
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters only, safe for logs
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(6).collect();
        format!("{}…", prefix)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthToken").field(&self.redacted()).finish()
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub token: Option<AuthToken>,
    pub devices: Vec<Device>,
    pub selected: Option<SelectedDevice>,
    pub last_fetch: Option<DateTime<Utc>>,
}

impl Session {
    pub fn selected_serial(&self) -> Option<&str> {
        self.selected.as_ref().map(|d| d.serial_number.as_str())
    }

    pub fn is_listed(&self, serial: &str) -> bool {
        self.devices.iter().any(|d| d.serial_number == serial)
    }
}
