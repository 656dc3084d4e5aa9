// Device endpoints: listing, detail, registration, metadata edits, and
// the manual poll trigger.

use serde_json::json;

use crate::client::PresenceClient;
use crate::error::Error;
use crate::types::device::DeviceListResponse;
use crate::types::{Device, DeviceInput, DeviceListParams, OkResponse};

impl PresenceClient {
    /// `GET /api/devices`
    pub async fn list_devices(&self, params: &DeviceListParams) -> Result<Vec<Device>, Error> {
        let url = self.api_url(&["devices"])?;
        let query = params.to_query();
        let resp: DeviceListResponse = if query.is_empty() {
            self.get(url).await?
        } else {
            self.get_with_params(url, &query).await?
        };
        Ok(resp.items)
    }

    /// `GET /api/devices/{mac}`
    pub async fn get_device(&self, mac: &str) -> Result<Device, Error> {
        let url = self.api_url(&["devices", mac])?;
        self.get(url).await
    }

    /// `POST /api/devices/{mac}/register`
    pub async fn register_device(&self, mac: &str, input: &DeviceInput) -> Result<OkResponse, Error> {
        input.validate()?;
        let url = self.api_url(&["devices", mac, "register"])?;
        self.post(url, input).await
    }

    /// `PATCH /api/devices/{mac}`
    pub async fn patch_device(&self, mac: &str, input: &DeviceInput) -> Result<OkResponse, Error> {
        input.validate()?;
        let url = self.api_url(&["devices", mac])?;
        self.patch(url, input).await
    }

    /// `POST /api/refresh`: ask the add-on to poll the router right away.
    pub async fn refresh_devices(&self) -> Result<OkResponse, Error> {
        let url = self.api_url(&["refresh"])?;
        self.post(url, &json!({})).await
    }
}
