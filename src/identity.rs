use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, instrument};

use crate::error::{AppError, AppResult};

/// Write access to the identity provider's per-user metadata.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Store our internal `user_id` in the provider user's public metadata.
    async fn update_public_metadata(&self, clerk_id: &str, user_id: &str) -> AppResult<()>;
}

/// Clerk Backend API client.
#[derive(Clone)]
pub struct ClerkClient {
    http: Client,
    api_url: String,
    secret_key: String,
}

impl ClerkClient {
    pub fn new(api_url: &str, secret_key: &str) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    fn metadata_url(&self, clerk_id: &str) -> String {
        format!("{}/users/{}/metadata", self.api_url, clerk_id)
    }
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    #[instrument(skip(self))]
    async fn update_public_metadata(&self, clerk_id: &str, user_id: &str) -> AppResult<()> {
        let res = self
            .http
            .patch(self.metadata_url(clerk_id))
            .bearer_auth(&self.secret_key)
            .json(&json!({ "public_metadata": { "userId": user_id } }))
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::IdentityProvider(format!(
                "metadata update returned {status}: {body}"
            )));
        }

        debug!(%status, "public metadata updated");
        Ok(())
    }
}
