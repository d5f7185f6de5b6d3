// Pool cloud client - GraphQL over HTTPS
use crate::application::pool_api::PoolCloudApi;
use crate::domain::device::{Device, DeviceDetail, DeviceKind, RawReading, StatusMessage};
use crate::domain::session::{AuthToken, Credentials};
use crate::error::{AuthError, FetchError};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Applied to every request, login included
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const APP_NAME: &str = "pool-live";
const APP_VERSION: &str = "4.2.0";
const APP_MODE: &str = "production";
const UNIT_PAGE_SIZE: u32 = 15;

const UNIT_LIST_QUERY: &str = r#"
query UnitList($after: String, $first: Int, $search: String) {
  units(after: $after, first: $first, searchQuery: $search) {
    cursor
    units {
      __typename
      ... on Unit { serialNumber name online statusMessages { type severity message } }
      ... on UnitNeverConnected { serialNumber name }
    }
  }
}"#;

const UNIT_DETAIL_QUERY: &str = r#"
fragment StatusValueFields on StatusValue {
  type
  center {
    __typename
    ... on StringValue { value }
  }
  bottomRight
}

query UnitDetailStatusQuery($sn: String!) {
  unitBySerialNumber(serialNumber: $sn) {
    __typename
    ... on Unit {
      serialNumber
      name
      statusMessages { type severity message }
      statusValues {
        primary { ...StatusValueFields }
        secondary { ...StatusValueFields }
      }
    }
    ... on UnitNeverConnected { serialNumber name }
    ... on UnitNotFoundError { serialNumber }
    ... on UnitAccessDeniedError { serialNumber }
  }
}"#;

#[derive(Debug, Clone)]
pub struct HttpPoolCloudApi {
    client: reqwest::Client,
    base_url: String,
    auth_url: String,
    cloud_id: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
    cloud: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: String,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQLError>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct UnitListData {
    #[serde(default)]
    units: UnitPage,
}

#[derive(Debug, Default, Deserialize)]
struct UnitPage {
    #[serde(default)]
    units: Vec<UnitDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitDto {
    #[serde(default)]
    serial_number: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    online: bool,
    #[serde(default)]
    status_messages: Vec<StatusMessageDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitDetailData {
    #[serde(default)]
    unit_by_serial_number: Option<UnitDetailDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitDetailDto {
    #[serde(rename = "__typename", default)]
    typename: String,
    #[serde(default)]
    serial_number: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status_messages: Vec<StatusMessageDto>,
    #[serde(default)]
    status_values: Option<StatusValuesDto>,
}

#[derive(Debug, Default, Deserialize)]
struct StatusMessageDto {
    #[serde(default)]
    severity: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct StatusValuesDto {
    #[serde(default)]
    primary: Vec<StatusValueDto>,
    #[serde(default)]
    secondary: Vec<StatusValueDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusValueDto {
    #[serde(rename = "type", default)]
    value_type: String,
    #[serde(default)]
    center: Option<CenterDto>,
    #[serde(default)]
    bottom_right: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CenterDto {
    #[serde(default)]
    value: Option<String>,
}

impl From<StatusMessageDto> for StatusMessage {
    fn from(dto: StatusMessageDto) -> Self {
        StatusMessage {
            severity: dto.severity,
            message: dto.message,
        }
    }
}

impl UnitDto {
    fn into_device(self) -> Device {
        let display_name = self.name.unwrap_or_else(|| self.serial_number.clone());
        let mut device = Device::new(self.serial_number, display_name, self.online);
        device.status_messages = self.status_messages.into_iter().map(Into::into).collect();
        device
    }
}

impl UnitDetailDto {
    fn into_detail(self) -> DeviceDetail {
        let readings = self
            .status_values
            .map(|values| {
                values
                    .primary
                    .into_iter()
                    .chain(values.secondary)
                    .map(|v| {
                        let value = v.center.and_then(|c| c.value).unwrap_or_default();
                        RawReading::new(v.value_type, value, v.bottom_right)
                    })
                    .collect()
            })
            .unwrap_or_default();

        DeviceDetail {
            kind: DeviceKind::from_typename(&self.typename),
            serial_number: self.serial_number,
            name: self.name.unwrap_or_default(),
            status_messages: self.status_messages.into_iter().map(Into::into).collect(),
            readings,
        }
    }
}

fn map_devices(response: GraphQLResponse<UnitListData>) -> Result<Vec<Device>, FetchError> {
    let Some(data) = response.data else {
        return Err(FetchError::Decode(graphql_errors(&response.errors)));
    };
    Ok(data
        .units
        .units
        .into_iter()
        .filter(|u| !u.serial_number.is_empty())
        .map(UnitDto::into_device)
        .collect())
}

/// A missing unit object maps to an empty detail so the session can treat it as stale
fn map_detail(response: GraphQLResponse<UnitDetailData>) -> DeviceDetail {
    if !response.errors.is_empty() {
        tracing::debug!("Unit detail returned errors: {}", graphql_errors(&response.errors));
    }
    response
        .data
        .and_then(|d| d.unit_by_serial_number)
        .map(UnitDetailDto::into_detail)
        .unwrap_or_else(DeviceDetail::empty)
}

fn graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "response carried no data".to_string();
    }
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn fetch_status_error(status: StatusCode, body: String) -> FetchError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::Unauthorized,
        _ => FetchError::Network(format!("status {}: {}", status, body)),
    }
}

fn login_status_error(status: StatusCode, body: String) -> AuthError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => {
            AuthError::Rejected(format!("status {}", status))
        }
        _ => AuthError::Unreachable(format!("status {}: {}", status, body)),
    }
}

impl HttpPoolCloudApi {
    pub fn new(base_url: String, auth_url: String, cloud_id: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            auth_url,
            cloud_id,
        })
    }

    async fn graphql<T>(&self, token: &AuthToken, body: serde_json::Value) -> Result<GraphQLResponse<T>, FetchError>
    where
        T: DeserializeOwned,
    {
        tracing::debug!("GraphQL request to {}", self.base_url);
        let response = self
            .client
            .post(&self.base_url)
            .header("Accept", "application/json")
            .header("X-App-Name", APP_NAME)
            .header("X-App-Version", APP_VERSION)
            .header("X-Mode", APP_MODE)
            .bearer_auth(token.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        tracing::debug!("GraphQL response status {}", status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fetch_status_error(status, body));
        }

        response
            .json::<GraphQLResponse<T>>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PoolCloudApi for HttpPoolCloudApi {
    async fn login(&self, credentials: &Credentials) -> Result<AuthToken, AuthError> {
        tracing::debug!("Logging in to {} as {}", self.auth_url, credentials.email);
        let request = LoginRequest {
            email: &credentials.email,
            password: &credentials.password,
            cloud: &self.cloud_id,
        };

        let response = self
            .client
            .post(&self.auth_url)
            .header("Accept", "application/json")
            .header("X-App-Name", APP_NAME)
            .header("X-App-Version", APP_VERSION)
            .header("X-Mode", APP_MODE)
            .json(&request)
            .send()
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(login_status_error(status, body));
        }

        let login = response
            .json::<LoginResponse>()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?;
        if login.token.is_empty() {
            return Err(AuthError::Decode("no token in login response".to_string()));
        }

        Ok(AuthToken::new(login.token))
    }

    async fn list_devices(&self, token: &AuthToken) -> Result<Vec<Device>, FetchError> {
        let body = json!({
            "operationName": "UnitList",
            "query": UNIT_LIST_QUERY,
            "variables": { "after": null, "first": UNIT_PAGE_SIZE, "search": "" },
        });
        let response = self.graphql::<UnitListData>(token, body).await?;
        map_devices(response)
    }

    async fn device_detail(&self, token: &AuthToken, serial: &str) -> Result<DeviceDetail, FetchError> {
        let body = json!({
            "operationName": "UnitDetailStatusQuery",
            "query": UNIT_DETAIL_QUERY,
            "variables": { "sn": serial },
        });
        let response = self.graphql::<UnitDetailData>(token, body).await?;
        Ok(map_detail(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_list_mapping() {
        let raw = r#"{
            "data": {
                "units": {
                    "cursor": null,
                    "units": [
                        {"__typename": "Unit", "serialNumber": "110", "name": "Backyard", "online": true,
                         "statusMessages": [{"type": "WARN", "severity": "WARNING", "message": "Low chlorine"}]},
                        {"__typename": "UnitNeverConnected", "serialNumber": "220", "name": null},
                        {"__typename": "Unit", "serialNumber": ""}
                    ]
                }
            }
        }"#;
        let response: GraphQLResponse<UnitListData> = serde_json::from_str(raw).unwrap();
        let devices = map_devices(response).unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].display_name, "Backyard");
        assert!(devices[0].online);
        assert_eq!(devices[0].status_messages[0].message, "Low chlorine");
        assert_eq!(devices[1].display_name, "220");
        assert!(!devices[1].online);
    }

    #[test]
    fn test_unit_list_without_data_is_decode_error() {
        let raw = r#"{"errors": [{"message": "internal"}]}"#;
        let response: GraphQLResponse<UnitListData> = serde_json::from_str(raw).unwrap();
        assert!(matches!(map_devices(response), Err(FetchError::Decode(m)) if m == "internal"));
    }

    #[test]
    fn test_unit_detail_mapping() {
        let raw = r#"{
            "data": {
                "unitBySerialNumber": {
                    "__typename": "Unit",
                    "serialNumber": "110",
                    "name": "Backyard",
                    "statusMessages": [],
                    "statusValues": {
                        "primary": [
                            {"type": "WATER_TEMPERATURE", "center": {"value": "27.5"}, "bottomRight": "°C"},
                            {"type": "WATER_FLOW_TO_PROBES", "center": {"value": "YES"}}
                        ],
                        "secondary": [
                            {"type": "REDOX", "center": {"value": "705"}, "bottomRight": "mV"}
                        ]
                    }
                }
            }
        }"#;
        let response: GraphQLResponse<UnitDetailData> = serde_json::from_str(raw).unwrap();
        let detail = map_detail(response);

        assert_eq!(detail.kind, DeviceKind::Unit);
        assert_eq!(detail.serial_number, "110");
        assert_eq!(detail.readings.len(), 3);
        assert_eq!(detail.readings[0], RawReading::new("WATER_TEMPERATURE", "27.5", Some("°C".to_string())));
        assert_eq!(detail.readings[1].unit, None);
        assert_eq!(detail.readings[2].remote_type, "REDOX");
    }

    #[test]
    fn test_missing_unit_maps_to_empty_detail() {
        for raw in [
            r#"{"data": {"unitBySerialNumber": null}}"#,
            r#"{"data": null, "errors": [{"message": "expired"}]}"#,
            r#"{"data": {"unitBySerialNumber": {"__typename": "Unit", "serialNumber": ""}}}"#,
        ] {
            let response: GraphQLResponse<UnitDetailData> = serde_json::from_str(raw).unwrap();
            assert!(map_detail(response).is_empty(), "{}", raw);
        }
    }

    #[test]
    fn test_detail_query_shape() {
        assert!(UNIT_DETAIL_QUERY.contains("unitBySerialNumber(serialNumber: $sn)"));
        assert!(UNIT_DETAIL_QUERY.contains("... on StringValue { value }"));
        assert!(UNIT_DETAIL_QUERY.contains("primary { ...StatusValueFields }"));
        assert!(!UNIT_DETAIL_QUERY.contains("center { value }"));
    }

    #[test]
    fn test_filtration_center_has_no_reading_value() {
        let raw = r#"{
            "data": {
                "unitBySerialNumber": {
                    "__typename": "Unit",
                    "serialNumber": "110",
                    "statusValues": {
                        "primary": [
                            {"type": "FILTRATION", "center": {"__typename": "UpcomingFiltrationPeriodValue"}},
                            {"type": "PH", "center": {"__typename": "StringValue", "value": "7.2"}}
                        ]
                    }
                }
            }
        }"#;
        let response: GraphQLResponse<UnitDetailData> = serde_json::from_str(raw).unwrap();
        let detail = map_detail(response);

        assert_eq!(detail.readings.len(), 2);
        assert_eq!(detail.readings[0].value, "");
        assert_eq!(detail.readings[1].value, "7.2");
    }

    #[test]
    fn test_error_kinds_from_status() {
        assert!(matches!(
            fetch_status_error(StatusCode::UNAUTHORIZED, String::new()),
            FetchError::Unauthorized
        ));
        assert!(matches!(
            fetch_status_error(StatusCode::BAD_GATEWAY, String::new()),
            FetchError::Network(_)
        ));
        assert!(matches!(
            login_status_error(StatusCode::UNAUTHORIZED, String::new()),
            AuthError::Rejected(_)
        ));
        assert!(matches!(
            login_status_error(StatusCode::SERVICE_UNAVAILABLE, String::new()),
            AuthError::Unreachable(_)
        ));
    }
}
