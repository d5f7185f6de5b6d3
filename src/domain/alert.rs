// Alert domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Normal => write!(f, "Normal"),
            Priority::High => write!(f, "High"),
            Priority::Critical => write!(f, "Critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertKind {
    TempLow,
    TempHigh,
    FlowLoss,
}

/// A condition raised by one evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Alert {
    TempLow { current: f64, expected: f64, delta: f64 },
    TempHigh { current: f64, expected: f64, delta: f64 },
    FlowLoss,
}

impl Alert {
    pub fn kind(&self) -> AlertKind {
        match self {
            Alert::TempLow { .. } => AlertKind::TempLow,
            Alert::TempHigh { .. } => AlertKind::TempHigh,
            Alert::FlowLoss => AlertKind::FlowLoss,
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            Alert::TempLow { .. } => Priority::High,
            Alert::TempHigh { .. } => Priority::Normal,
            Alert::FlowLoss => Priority::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Receiver {
    pub email: String,
    #[serde(default)]
    pub name: String,
}

impl Receiver {
    /// Mailbox form, `Name <email>` when a name is known
    pub fn mailbox(&self) -> String {
        if self.name.is_empty() {
            self.email.clone()
        } else {
            format!("{} <{}>", self.name, self.email)
        }
    }
}
