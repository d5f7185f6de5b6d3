// Measurement domain models
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Canonical measurement keys, independent of upstream naming
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MeasurementKey {
    Temperature,
    #[serde(rename = "PH")]
    Ph,
    Redox,
    WaterFlow,
}

impl MeasurementKey {
    pub const ALL: [MeasurementKey; 4] = [
        MeasurementKey::Temperature,
        MeasurementKey::Ph,
        MeasurementKey::Redox,
        MeasurementKey::WaterFlow,
    ];

    /// Name used when persisting the measurement
    pub fn storage_name(&self) -> &'static str {
        match self {
            MeasurementKey::Temperature => "water_temperature",
            MeasurementKey::Ph => "ph",
            MeasurementKey::Redox => "redox",
            MeasurementKey::WaterFlow => "water_flow",
        }
    }

    /// Accepts storage names as well as the canonical display names
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "water_temperature" | "temperature" | "temp" => Some(MeasurementKey::Temperature),
            "ph" => Some(MeasurementKey::Ph),
            "redox" => Some(MeasurementKey::Redox),
            "water_flow" | "waterflow" => Some(MeasurementKey::WaterFlow),
            _ => None,
        }
    }
}

impl fmt::Display for MeasurementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementKey::Temperature => write!(f, "Temperature"),
            MeasurementKey::Ph => write!(f, "PH"),
            MeasurementKey::Redox => write!(f, "Redox"),
            MeasurementKey::WaterFlow => write!(f, "WaterFlow"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementValue {
    Numeric { value: f64, unit: String },
    Boolean(bool),
}

impl MeasurementValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MeasurementValue::Numeric { value, .. } => Some(*value),
            MeasurementValue::Boolean(_) => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            MeasurementValue::Boolean(flag) => Some(*flag),
            MeasurementValue::Numeric { .. } => None,
        }
    }
}

impl fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementValue::Numeric { value, unit } if unit.is_empty() => write!(f, "{:.2}", value),
            MeasurementValue::Numeric { value, unit } => write!(f, "{:.2} {}", value, unit),
            MeasurementValue::Boolean(true) => write!(f, "YES"),
            MeasurementValue::Boolean(false) => write!(f, "NO"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub key: MeasurementKey,
    pub value: MeasurementValue,
    pub observed_at: DateTime<Utc>,
}

impl Measurement {
    pub fn numeric(key: MeasurementKey, value: f64, unit: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            key,
            value: MeasurementValue::Numeric {
                value,
                unit: unit.into(),
            },
            observed_at,
        }
    }

    pub fn flag(key: MeasurementKey, flag: bool, observed_at: DateTime<Utc>) -> Self {
        Self {
            key,
            value: MeasurementValue::Boolean(flag),
            observed_at,
        }
    }
}

/// Measurements of one check, at most one per canonical key
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MeasurementSet {
    entries: BTreeMap<MeasurementKey, Measurement>,
}

impl MeasurementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts unless the key is already present. Returns whether it was inserted.
    pub fn insert_first(&mut self, measurement: Measurement) -> bool {
        if self.entries.contains_key(&measurement.key) {
            return false;
        }
        self.entries.insert(measurement.key, measurement);
        true
    }

    pub fn get(&self, key: MeasurementKey) -> Option<&Measurement> {
        self.entries.get(&key)
    }

    pub fn temperature(&self) -> Option<f64> {
        self.get(MeasurementKey::Temperature)
            .and_then(|m| m.value.as_f64())
    }

    pub fn water_flow(&self) -> Option<bool> {
        self.get(MeasurementKey::WaterFlow)
            .and_then(|m| m.value.as_flag())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
