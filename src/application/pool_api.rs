// Port for the pool-controller cloud service
use crate::domain::device::{Device, DeviceDetail};
use crate::domain::session::{AuthToken, Credentials};
use crate::error::{AuthError, FetchError};
use async_trait::async_trait;

#[async_trait]
pub trait PoolCloudApi: Send + Sync {
    /// Exchange credentials for a fresh token
    async fn login(&self, credentials: &Credentials) -> Result<AuthToken, AuthError>;

    /// List the devices visible to the token, in service order
    async fn list_devices(&self, token: &AuthToken) -> Result<Vec<Device>, FetchError>;

    /// Full detail for one device. An empty serial in the result means the
    /// service answered without echoing the device back.
    async fn device_detail(&self, token: &AuthToken, serial: &str) -> Result<DeviceDetail, FetchError>;
}
