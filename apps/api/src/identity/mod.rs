//! Identity Provider: turns credentials into a stable `{uid, email}`.

pub mod hosted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub use hosted::HostedIdentityProvider;

/// Provider id used when a federated sign-in request names none.
pub const DEFAULT_FEDERATED_PROVIDER: &str = "google.com";

/// An authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

/// Token obtained by the client from a federated sign-in popup/redirect.
#[derive(Debug, Clone, Deserialize)]
pub struct FederatedCredential {
    pub id_token: String,
    #[serde(default = "default_provider")]
    pub provider_id: String,
}

fn default_provider() -> String {
    DEFAULT_FEDERATED_PROVIDER.to_string()
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_federated(&self, credential: &FederatedCredential)
        -> Result<Identity, AppError>;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Identity, AppError>;
}
