use reqwest::Method;

use super::*;

impl BookingApiClient {
    /// POST /notifications/devices
    pub async fn register_device(
        &self,
        request: &DeviceRegistrationRequest,
    ) -> Result<(), BookingApiError> {
        let url = self.endpoint("notifications/devices")?;
        self.authenticated_send(Method::POST, url, request).await?;
        tracing::info!(
            device_id = %request.device_id,
            device_type = ?request.device_type,
            "Registered device push token"
        );
        Ok(())
    }

    /// DELETE /notifications/devices/{device_id}
    pub async fn unregister_device(&self, device_id: &str) -> Result<(), BookingApiError> {
        let url = self.endpoint(&format!("notifications/devices/{device_id}"))?;
        self.authenticated_send_no_body(Method::DELETE, url).await?;
        tracing::info!(device_id, "Unregistered device push token");
        Ok(())
    }

    /// GET /notifications/settings
    pub async fn get_settings(&self) -> Result<NotificationTypeToggles, BookingApiError> {
        let url = self.endpoint("notifications/settings")?;
        let body = self.authenticated_get(url, &[]).await?;
        Self::decode(&body)
    }

    /// PUT /notifications/settings
    pub async fn put_settings(
        &self,
        toggles: &NotificationTypeToggles,
    ) -> Result<(), BookingApiError> {
        let url = self.endpoint("notifications/settings")?;
        self.authenticated_send(Method::PUT, url, toggles).await?;
        Ok(())
    }
}
