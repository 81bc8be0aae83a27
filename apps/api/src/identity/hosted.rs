//! Client for the hosted identity REST API (Identity Toolkit v1 surface).
//!
//! Both sign-in flows post JSON to `{endpoint}/v1/accounts:<method>?key=<api key>`
//! and read `localId` / `email` from the reply. Point `IDENTITY_ENDPOINT` at an
//! emulator for local work.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::identity::{FederatedCredential, Identity, IdentityProvider};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithPasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct HostedIdentityProvider {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl HostedIdentityProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/v1/accounts:{}", self.endpoint, method)
    }

    async fn call<B: Serialize>(&self, method: &str, body: &B) -> Result<Identity, AppError> {
        let response = self
            .http
            .post(self.method_url(method))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Identity provider unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = parse_error_message(&text)
                .unwrap_or_else(|| format!("status {}", status.as_u16()));
            if status.is_client_error() {
                return Err(AppError::Authentication(message));
            }
            warn!("Identity provider {method} failed with {status}: {text}");
            return Err(AppError::Identity(message));
        }

        let parsed: SignInResponse = response
            .json()
            .await
            .map_err(|e| AppError::Identity(format!("Malformed identity response: {e}")))?;
        debug!("Identity provider {method} signed in {}", parsed.local_id);

        Ok(Identity {
            uid: parsed.local_id,
            email: parsed.email.unwrap_or_default(),
        })
    }
}

/// Pulls `error.message` out of an identity error body, e.g. `INVALID_PASSWORD`.
fn parse_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error.message)
}

fn idp_post_body(credential: &FederatedCredential) -> String {
    format!(
        "id_token={}&providerId={}",
        credential.id_token, credential.provider_id
    )
}

#[async_trait]
impl IdentityProvider for HostedIdentityProvider {
    async fn sign_in_federated(
        &self,
        credential: &FederatedCredential,
    ) -> Result<Identity, AppError> {
        if credential.id_token.trim().is_empty() {
            return Err(AppError::Authentication("Missing sign-in token".into()));
        }
        let request = SignInWithIdpRequest {
            post_body: idp_post_body(credential),
            request_uri: "http://localhost",
            return_secure_token: true,
            return_idp_credential: true,
        };
        self.call("signInWithIdp", &request).await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AppError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Email and password are required".into(),
            ));
        }
        let request = SignInWithPasswordRequest {
            email: email.trim(),
            password,
            return_secure_token: true,
        };
        self.call("signInWithPassword", &request).await
    }
}
