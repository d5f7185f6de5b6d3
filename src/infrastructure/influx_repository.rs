// InfluxDB repository implementation
use crate::application::measurement_repository::MeasurementRepository;
use crate::domain::measurement::{Measurement, MeasurementKey, MeasurementValue};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

const MEASUREMENT: &str = "pool_measurement";
const FLAG_UNIT: &str = "flag";

#[derive(Debug, Clone)]
pub struct InfluxRepository {
    client: reqwest::Client,
    host: String,
    token: String,
    database: String,
    retention_policy: String,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResponse {
    results: Vec<InfluxQLResult>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResult {
    #[serde(default)]
    series: Option<Vec<InfluxQLSeries>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLSeries {
    columns: Vec<String>,
    values: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    tags: Option<HashMap<String, String>>,
}

impl InfluxRepository {
    pub fn new(host: String, token: String, database: String, retention_policy: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            token,
            database,
            retention_policy,
        }
    }

    fn build_query_url(&self, query: &str) -> String {
        format!(
            "{}/query?db={}&rp={}&q={}",
            self.host,
            urlencoding::encode(&self.database),
            urlencoding::encode(&self.retention_policy),
            urlencoding::encode(query)
        )
    }

    fn build_write_url(&self) -> String {
        format!(
            "{}/write?db={}&rp={}&precision=ms",
            self.host,
            urlencoding::encode(&self.database),
            urlencoding::encode(&self.retention_policy)
        )
    }

    async fn execute_query(&self, query: &str) -> Result<InfluxQLResponse> {
        tracing::debug!("Executing InfluxQL: {}", query);
        let response = self
            .client
            .get(self.build_query_url(query))
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to InfluxDB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("InfluxDB query failed with status {}: {}", status, body);
        }

        let data = response
            .json::<InfluxQLResponse>()
            .await
            .context("Failed to parse InfluxDB response")?;

        if let Some(error) = data.results.first().and_then(|r| r.error.as_ref()) {
            anyhow::bail!("InfluxDB query error: {}", error);
        }

        Ok(data)
    }
}

#[async_trait]
impl MeasurementRepository for InfluxRepository {
    async fn store_measurement(&self, measurement: &Measurement) -> Result<()> {
        let line = line_protocol(measurement);
        tracing::debug!("Writing point: {}", line);

        let response = self
            .client
            .post(self.build_write_url())
            .header("Authorization", format!("Token {}", self.token))
            .body(line)
            .send()
            .await
            .context("Failed to send write to InfluxDB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("InfluxDB write failed with status {}: {}", status, body);
        }

        Ok(())
    }

    async fn historical_measurements(
        &self,
        key: MeasurementKey,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Measurement>> {
        // "name" is a reserved keyword in InfluxQL and must be quoted
        let query = format!(
            "SELECT value, \"unit\" FROM {} WHERE \"name\" = '{}' AND time >= '{}' AND time <= '{}' ORDER BY time ASC",
            MEASUREMENT,
            key.storage_name(),
            from.to_rfc3339_opts(SecondsFormat::Millis, true),
            to.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        let response = self.execute_query(&query).await?;
        let measurements = parse_history(key, &response);
        tracing::debug!("Found {} {} points", measurements.len(), key);
        Ok(measurements)
    }

    async fn latest_measurements(&self) -> Result<BTreeMap<MeasurementKey, Measurement>> {
        let query = format!("SELECT last(value) FROM {} GROUP BY \"name\", \"unit\"", MEASUREMENT);
        let response = self.execute_query(&query).await?;
        Ok(parse_latest(&response))
    }
}

fn escape_tag(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

/// One point in InfluxDB line protocol, millisecond precision.
/// Flags are stored as 1/0 with unit "flag"; an empty unit tag is omitted.
fn line_protocol(measurement: &Measurement) -> String {
    let (value, unit) = match &measurement.value {
        MeasurementValue::Numeric { value, unit } => (*value, unit.as_str()),
        MeasurementValue::Boolean(flag) => (if *flag { 1.0 } else { 0.0 }, FLAG_UNIT),
    };

    let mut line = format!("{},name={}", MEASUREMENT, escape_tag(measurement.key.storage_name()));
    if !unit.is_empty() {
        line.push_str(",unit=");
        line.push_str(&escape_tag(unit));
    }
    line.push_str(&format!(
        " value={} {}",
        value,
        measurement.observed_at.timestamp_millis()
    ));
    line
}

fn to_measurement(key: MeasurementKey, value: f64, unit: Option<&str>, at: DateTime<Utc>) -> Measurement {
    if key == MeasurementKey::WaterFlow || unit == Some(FLAG_UNIT) {
        Measurement::flag(key, value != 0.0, at)
    } else {
        Measurement::numeric(key, value, unit.unwrap_or_default(), at)
    }
}

fn parse_time(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn parse_history(key: MeasurementKey, response: &InfluxQLResponse) -> Vec<Measurement> {
    let mut points = Vec::new();
    let Some(series) = response.results.first().and_then(|r| r.series.as_ref()) else {
        return points;
    };

    for s in series {
        let time_idx = s.columns.iter().position(|c| c == "time").unwrap_or(0);
        let value_idx = s.columns.iter().position(|c| c == "value").unwrap_or(1);
        let unit_idx = s.columns.iter().position(|c| c == "unit");

        for row in &s.values {
            let (Some(time), Some(value)) = (
                row.get(time_idx).and_then(parse_time),
                row.get(value_idx).and_then(|v| v.as_f64()),
            ) else {
                continue;
            };
            let unit = unit_idx.and_then(|i| row.get(i)).and_then(|v| v.as_str());
            points.push(to_measurement(key, value, unit, time));
        }
    }

    points.sort_by_key(|m| m.observed_at);
    points
}

fn parse_latest(response: &InfluxQLResponse) -> BTreeMap<MeasurementKey, Measurement> {
    let mut latest: BTreeMap<MeasurementKey, Measurement> = BTreeMap::new();
    let Some(series) = response.results.first().and_then(|r| r.series.as_ref()) else {
        return latest;
    };

    for s in series {
        let Some(tags) = &s.tags else { continue };
        let Some(key) = tags.get("name").and_then(|n| MeasurementKey::from_name(n)) else {
            continue;
        };
        let unit = tags.get("unit").map(String::as_str).filter(|u| !u.is_empty());

        let time_idx = s.columns.iter().position(|c| c == "time").unwrap_or(0);
        let value_idx = s.columns.iter().position(|c| c == "last").unwrap_or(1);
        let Some(row) = s.values.first() else { continue };
        let (Some(time), Some(value)) = (
            row.get(time_idx).and_then(parse_time),
            row.get(value_idx).and_then(|v| v.as_f64()),
        ) else {
            continue;
        };

        // a key may appear under several units; keep the newest
        let newer = latest.get(&key).is_none_or(|existing| existing.observed_at < time);
        if newer {
            latest.insert(key, to_measurement(key, value, unit, time));
        }
    }

    latest
}
