use reqwest::Method;

use super::*;
use crate::models::UnreadCount;

impl BookingApiClient {
    /// GET /notifications?page=&limit=&isRead=
    pub async fn get_notifications(
        &self,
        page: u32,
        limit: u32,
        is_read: Option<bool>,
    ) -> Result<NotificationPage, BookingApiError> {
        let url = self.endpoint("notifications")?;
        let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
        if let Some(is_read) = is_read {
            query.push(("isRead", is_read.to_string()));
        }
        let body = self.authenticated_get(url, &query).await?;
        let page_data: NotificationPage = Self::decode(&body)?;
        tracing::debug!(
            page,
            items = page_data.items.len(),
            total = page_data.total,
            "Fetched notification page"
        );
        Ok(page_data)
    }

    /// GET /notifications/unread-count
    pub async fn get_unread_count(&self) -> Result<u64, BookingApiError> {
        let url = self.endpoint("notifications/unread-count")?;
        let body = self.authenticated_get(url, &[]).await?;
        let count: UnreadCount = Self::decode(&body)?;
        Ok(count.count)
    }

    /// PATCH /notifications/{id}/read
    pub async fn mark_read(&self, id: &str) -> Result<(), BookingApiError> {
        let url = self.endpoint(&format!("notifications/{id}/read"))?;
        self.authenticated_send_no_body(Method::PATCH, url).await?;
        Ok(())
    }

    /// PATCH /notifications/read-all
    pub async fn mark_all_read(&self) -> Result<(), BookingApiError> {
        let url = self.endpoint("notifications/read-all")?;
        self.authenticated_send_no_body(Method::PATCH, url).await?;
        Ok(())
    }
}
