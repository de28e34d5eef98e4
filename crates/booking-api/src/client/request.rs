use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::*;
use crate::models::ApiResponse;

impl BookingApiClient {
    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and return the raw body of a successful response.
    async fn execute(&self, builder: RequestBuilder, url: &Url) -> Result<String, BookingApiError> {
        let resp = self.authorize(builder).send().await?;

        let status = resp.status();
        let body = resp.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::warn!(url = %url, "Got 401 from booking service");
        }

        if !status.is_success() {
            return Err(BookingApiError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(body)
    }

    /// Execute a GET request with optional query parameters.
    pub(super) async fn authenticated_get(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<String, BookingApiError> {
        let builder = self.http.get(url.clone()).query(query);
        self.execute(builder, &url).await
    }

    /// Execute a request with a JSON body.
    pub(super) async fn authenticated_send(
        &self,
        method: Method,
        url: Url,
        body: &impl Serialize,
    ) -> Result<String, BookingApiError> {
        let builder = self.http.request(method, url.clone()).json(body);
        self.execute(builder, &url).await
    }

    /// Execute a request without a body.
    pub(super) async fn authenticated_send_no_body(
        &self,
        method: Method,
        url: Url,
    ) -> Result<String, BookingApiError> {
        let builder = self.http.request(method, url.clone());
        self.execute(builder, &url).await
    }

    /// Decode the `data` field of a response envelope.
    pub(super) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, BookingApiError> {
        let resp: ApiResponse<T> = serde_json::from_str(body)?;
        Ok(resp.data)
    }
}
