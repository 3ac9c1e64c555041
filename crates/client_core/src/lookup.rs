use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared::{domain::Username, protocol::PartnerEnvironmentResponse};
use tracing::debug;
use url::Url;

use crate::{
    api::ApiService,
    services::{EnvironmentLookup, LookupError},
};

/// Resolves a username's partner environment over HTTP.
pub struct HttpEnvironmentLookup {
    http: Client,
    api: ApiService,
}

impl HttpEnvironmentLookup {
    pub fn new(api: ApiService, request_timeout: Duration) -> Result<Self, LookupError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| LookupError::Transport(err.to_string()))?;
        Ok(Self { http, api })
    }

    pub fn with_client(http: Client, api: ApiService) -> Self {
        Self { http, api }
    }
}

#[async_trait]
impl EnvironmentLookup for HttpEnvironmentLookup {
    async fn base_url(&self, username: &Username) -> Result<Url, LookupError> {
        let request = self.api.request(&self.http, username)?;
        debug!(url = %request.url(), "requesting partner environment");

        let res = self
            .http
            .execute(request)
            .await
            .map_err(|err| LookupError::Transport(err.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body: PartnerEnvironmentResponse = res
            .json()
            .await
            .map_err(|err| LookupError::Decode(err.to_string()))?;
        Url::parse(body.base_url.trim())
            .map_err(|err| LookupError::InvalidUrl(format!("{}: {err}", body.base_url)))
    }
}

#[cfg(test)]
#[path = "tests/lookup_tests.rs"]
mod tests;
