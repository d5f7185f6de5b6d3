// Measurement normalizer - remote status values to canonical measurements
use crate::domain::device::RawReading;
use crate::domain::measurement::{Measurement, MeasurementKey, MeasurementSet};
use chrono::{DateTime, Utc};

/// Map a remote status value type to its canonical key
pub fn canonical_key(remote_type: &str) -> Option<MeasurementKey> {
    match remote_type {
        "WATER_TEMPERATURE" => Some(MeasurementKey::Temperature),
        "PH" => Some(MeasurementKey::Ph),
        "REDOX" => Some(MeasurementKey::Redox),
        "WATER_FLOW_TO_PROBES" => Some(MeasurementKey::WaterFlow),
        _ => None,
    }
}

fn default_unit(key: MeasurementKey) -> &'static str {
    match key {
        MeasurementKey::Temperature => "°C",
        MeasurementKey::Redox => "mV",
        MeasurementKey::Ph | MeasurementKey::WaterFlow => "",
    }
}

/// Convert raw readings into a measurement set.
/// Unknown types and unreadable values are left out, never defaulted.
pub fn normalize(readings: &[RawReading], fetched_at: DateTime<Utc>) -> MeasurementSet {
    let mut set = MeasurementSet::new();

    for reading in readings {
        let Some(key) = canonical_key(&reading.remote_type) else {
            continue;
        };
        let observed_at = reading.observed_at.unwrap_or(fetched_at);

        let measurement = match key {
            MeasurementKey::WaterFlow => match reading.value.trim() {
                "YES" => Measurement::flag(key, true, observed_at),
                "NO" => Measurement::flag(key, false, observed_at),
                other => {
                    tracing::debug!("Ignoring unreadable flow value '{}'", other);
                    continue;
                }
            },
            _ => {
                let Some(value) = reading
                    .value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                else {
                    tracing::debug!(
                        "Ignoring unreadable {} value '{}'",
                        reading.remote_type,
                        reading.value
                    );
                    continue;
                };
                let unit = reading
                    .unit
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .unwrap_or(default_unit(key));
                Measurement::numeric(key, value, unit, observed_at)
            }
        };

        set.insert_first(measurement);
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::measurement::MeasurementValue;

    fn reading(remote_type: &str, value: &str, unit: Option<&str>) -> RawReading {
        RawReading::new(remote_type, value, unit.map(str::to_string))
    }

    #[test]
    fn test_maps_all_canonical_types() {
        let readings = vec![
            reading("WATER_TEMPERATURE", "27.4", Some("°C")),
            reading("PH", "7.21", None),
            reading("REDOX", "712", Some("mV")),
            reading("WATER_FLOW_TO_PROBES", "YES", None),
        ];
        let set = normalize(&readings, Utc::now());

        assert_eq!(set.len(), 4);
        assert_eq!(set.temperature(), Some(27.4));
        assert_eq!(set.water_flow(), Some(true));
        assert_eq!(
            set.get(MeasurementKey::Redox).map(|m| m.value.clone()),
            Some(MeasurementValue::Numeric {
                value: 712.0,
                unit: "mV".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_types_are_dropped() {
        let readings = vec![
            reading("SALT_CONCENTRATION", "3.1", Some("g/l")),
            reading("PH", "7.0", None),
        ];
        let set = normalize(&readings, Utc::now());
        assert_eq!(set.len(), 1);
        assert!(set.get(MeasurementKey::Ph).is_some());
    }

    #[test]
    fn test_unreadable_values_are_absent_not_zero() {
        let readings = vec![
            reading("WATER_TEMPERATURE", "--", None),
            reading("WATER_FLOW_TO_PROBES", "", None),
        ];
        let set = normalize(&readings, Utc::now());
        assert!(set.is_empty());
        assert_eq!(set.temperature(), None);
    }

    #[test]
    fn test_non_finite_values_are_absent() {
        let readings = vec![
            reading("WATER_TEMPERATURE", "NaN", Some("°C")),
            reading("PH", "inf", None),
            reading("REDOX", "-infinity", Some("mV")),
            reading("REDOX", "690", Some("mV")),
        ];
        let set = normalize(&readings, Utc::now());
        assert_eq!(set.len(), 1);
        assert_eq!(set.temperature(), None);
        assert!(set.get(MeasurementKey::Ph).is_none());
        assert!(set.get(MeasurementKey::Redox).is_some());
    }

    #[test]
    fn test_default_units() {
        let readings = vec![
            reading("WATER_TEMPERATURE", "26", Some("")),
            reading("REDOX", "650", None),
        ];
        let set = normalize(&readings, Utc::now());
        let unit_of = |key| match set.get(key).map(|m| &m.value) {
            Some(MeasurementValue::Numeric { unit, .. }) => unit.clone(),
            _ => String::new(),
        };
        assert_eq!(unit_of(MeasurementKey::Temperature), "°C");
        assert_eq!(unit_of(MeasurementKey::Redox), "mV");
    }

    #[test]
    fn test_flow_no_is_false() {
        let set = normalize(&[reading("WATER_FLOW_TO_PROBES", "NO", None)], Utc::now());
        assert_eq!(set.water_flow(), Some(false));
    }
}
