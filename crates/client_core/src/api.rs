use reqwest::{header, Client, Method, Request};
use shared::{
    domain::{PartnerEnvironment, Username},
    error::{ApiException, ErrorCode},
    protocol::PartnerEnvironmentRequest,
};
use url::Url;

pub const DEFAULT_REGISTRATION_URL: &str =
    "http://registration.securenettech.com/registration.php";

/// Builds requests against the partner registration endpoint.
#[derive(Debug, Clone)]
pub struct ApiService {
    registration_url: String,
    environment: PartnerEnvironment,
}

impl Default for ApiService {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRATION_URL, PartnerEnvironment::Production)
    }
}

impl ApiService {
    pub fn new(registration_url: impl Into<String>, environment: PartnerEnvironment) -> Self {
        Self {
            registration_url: registration_url.into(),
            environment,
        }
    }

    pub fn environment(&self) -> PartnerEnvironment {
        self.environment
    }

    /// POST with `method`, `username` and `environment` both in the query string
    /// and as a pretty-printed JSON body.
    pub fn request(&self, http: &Client, username: &Username) -> Result<Request, ApiException> {
        let mut url = Url::parse(&self.registration_url).map_err(|err| {
            ApiException::new(
                ErrorCode::BadRequestUrl,
                format!("invalid registration url '{}': {err}", self.registration_url),
            )
        })?;

        let payload = PartnerEnvironmentRequest::new(username.as_str(), self.environment);
        url.query_pairs_mut().extend_pairs(payload.query_pairs());

        let body = serde_json::to_vec_pretty(&payload)
            .map_err(|err| ApiException::new(ErrorCode::BadRequestBody, err.to_string()))?;

        http.request(Method::POST, url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .build()
            .map_err(|err| ApiException::new(ErrorCode::BadRequestUrl, err.to_string()))
    }
}
