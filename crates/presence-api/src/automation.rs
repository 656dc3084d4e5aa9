// Automation endpoints: primitive catalogs, capability template CRUD,
// per-device capability state, assignments, and global capabilities.

use crate::client::PresenceClient;
use crate::error::Error;
use crate::types::{
    ActionType, CapabilityDeviceAssignment, CapabilityListParams, CapabilityPatch,
    CapabilityTemplate, CapabilityUIModel, SetStateResult, StateSourceType,
};

impl PresenceClient {
    // ── Primitives ───────────────────────────────────────────────────

    /// `GET /api/automation/action-types`
    pub async fn list_action_types(&self) -> Result<Vec<ActionType>, Error> {
        let url = self.api_url(&["automation", "action-types"])?;
        self.get(url).await
    }

    /// `GET /api/automation/state-source-types`
    pub async fn list_state_source_types(&self) -> Result<Vec<StateSourceType>, Error> {
        let url = self.api_url(&["automation", "state-source-types"])?;
        self.get(url).await
    }

    // ── Capability templates ─────────────────────────────────────────

    /// `GET /api/automation/capabilities`
    pub async fn list_capabilities(
        &self,
        params: &CapabilityListParams,
    ) -> Result<Vec<CapabilityTemplate>, Error> {
        let url = self.api_url(&["automation", "capabilities"])?;
        let query = params.to_query();
        if query.is_empty() {
            self.get(url).await
        } else {
            self.get_with_params(url, &query).await
        }
    }

    /// `GET /api/automation/capabilities/{id}`
    pub async fn get_capability(&self, id: &str) -> Result<CapabilityTemplate, Error> {
        let url = self.api_url(&["automation", "capabilities", id])?;
        self.get(url).await
    }

    /// `POST /api/automation/capabilities`
    pub async fn create_capability(
        &self,
        template: &CapabilityTemplate,
    ) -> Result<CapabilityTemplate, Error> {
        let url = self.api_url(&["automation", "capabilities"])?;
        self.post(url, template).await
    }

    /// `PUT /api/automation/capabilities/{id}`
    pub async fn update_capability(
        &self,
        id: &str,
        template: &CapabilityTemplate,
    ) -> Result<CapabilityTemplate, Error> {
        let url = self.api_url(&["automation", "capabilities", id])?;
        self.put(url, template).await
    }

    /// `DELETE /api/automation/capabilities/{id}`
    pub async fn delete_capability(&self, id: &str) -> Result<(), Error> {
        let url = self.api_url(&["automation", "capabilities", id])?;
        self.delete(url).await
    }

    // ── Assignments ──────────────────────────────────────────────────

    /// `GET /api/automation/capabilities/{id}/devices`
    pub async fn list_capability_assignments(
        &self,
        capability_id: &str,
    ) -> Result<Vec<CapabilityDeviceAssignment>, Error> {
        let url = self.api_url(&["automation", "capabilities", capability_id, "devices"])?;
        self.get(url).await
    }

    /// `PATCH /api/automation/capabilities/{id}/devices/{device}`
    pub async fn patch_capability_device(
        &self,
        capability_id: &str,
        device_id: &str,
        patch: &CapabilityPatch,
    ) -> Result<SetStateResult, Error> {
        patch.validate()?;
        let url = self.api_url(&[
            "automation",
            "capabilities",
            capability_id,
            "devices",
            device_id,
        ])?;
        self.patch(url, patch).await
    }

    // ── Device capabilities ──────────────────────────────────────────

    /// `GET /api/devices/{id}/capabilities`
    pub async fn list_device_capabilities(
        &self,
        device_id: &str,
    ) -> Result<Vec<CapabilityUIModel>, Error> {
        let url = self.api_url(&["devices", device_id, "capabilities"])?;
        self.get(url).await
    }

    /// `PATCH /api/devices/{id}/capabilities/{capabilityId}`
    pub async fn patch_device_capability(
        &self,
        device_id: &str,
        capability_id: &str,
        patch: &CapabilityPatch,
    ) -> Result<SetStateResult, Error> {
        patch.validate()?;
        let url = self.api_url(&["devices", device_id, "capabilities", capability_id])?;
        self.patch(url, patch).await
    }

    // ── Global capabilities ──────────────────────────────────────────

    /// `GET /api/global/capabilities`
    pub async fn list_global_capabilities(&self) -> Result<Vec<CapabilityUIModel>, Error> {
        let url = self.api_url(&["global", "capabilities"])?;
        self.get(url).await
    }

    /// `PATCH /api/global/capabilities/{capabilityId}`
    pub async fn patch_global_capability(
        &self,
        capability_id: &str,
        patch: &CapabilityPatch,
    ) -> Result<SetStateResult, Error> {
        patch.validate()?;
        let url = self.api_url(&["global", "capabilities", capability_id])?;
        self.patch(url, patch).await
    }
}
