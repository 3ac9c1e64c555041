use serde::{Deserialize, Serialize};

use crate::domain::PartnerEnvironment;

pub const PARTNER_ENVIRONMENT_METHOD: &str = "getPartnerEnvironment";

/// Sent both as query parameters and as the JSON body of the registration call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerEnvironmentRequest {
    pub method: String,
    pub username: String,
    pub environment: PartnerEnvironment,
}

impl PartnerEnvironmentRequest {
    pub fn new(username: impl Into<String>, environment: PartnerEnvironment) -> Self {
        Self {
            method: PARTNER_ENVIRONMENT_METHOD.to_string(),
            username: username.into(),
            environment,
        }
    }

    pub fn query_pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("method", self.method.as_str()),
            ("username", self.username.as_str()),
            ("environment", self.environment.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerEnvironmentResponse {
    #[serde(rename = "baseURL", alias = "base_url", alias = "url")]
    pub base_url: String,
}
