use reqwest::Method;

use super::*;
use crate::models::{PendingBooking, StatusUpdateRequest};

impl BookingApiClient {
    /// GET /service-centers/{id}/bookings/pending
    pub async fn get_pending_bookings(
        &self,
        service_center_id: &str,
    ) -> Result<Vec<String>, BookingApiError> {
        let url = self.endpoint(&format!(
            "service-centers/{service_center_id}/bookings/pending"
        ))?;
        let body = self.authenticated_get(url, &[]).await?;
        let bookings: Vec<PendingBooking> = Self::decode(&body)?;
        Ok(bookings.into_iter().map(|b| b.uuid).collect())
    }

    /// PATCH /bookings/{id}/status
    pub async fn patch_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<(), BookingApiError> {
        let url = self.endpoint(&format!("bookings/{booking_id}/status"))?;
        self.authenticated_send(Method::PATCH, url, &StatusUpdateRequest { status })
            .await?;
        tracing::info!(booking_id, status = status.as_str(), "Booking status updated");
        Ok(())
    }
}
