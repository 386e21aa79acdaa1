use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    users::dto::{CreateUserParams, PublicUser, UpdateUserParams},
};

pub const USER_CREATED: &str = "user.created";
pub const USER_UPDATED: &str = "user.updated";
pub const USER_DELETED: &str = "user.deleted";

/// Envelope of a Clerk webhook delivery. `data` stays raw until the
/// event kind is known to carry a user.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl WebhookEvent {
    /// `data.id` when it is a string; used for logging only.
    pub fn data_id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }

    pub fn user(&self) -> AppResult<ClerkUser> {
        if self.data.is_null() {
            return Ok(ClerkUser::default());
        }
        ClerkUser::deserialize(&self.data).map_err(|e| AppError::InvalidPayload(e.to_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ClerkUser {
    pub id: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    pub image_url: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailAddress {
    pub email_address: String,
}

impl ClerkUser {
    pub fn clerk_id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Missing fields map to empty strings and are rejected by validation.
    pub fn to_create_params(&self) -> CreateUserParams {
        CreateUserParams {
            clerk_id: self.clerk_id().to_string(),
            email: self
                .email_addresses
                .first()
                .map(|e| e.email_address.clone())
                .unwrap_or_default(),
            username: self.username.clone().unwrap_or_default(),
            first_name: self.first_name.clone().unwrap_or_default(),
            last_name: self.last_name.clone().unwrap_or_default(),
            photo: self.image_url.clone().unwrap_or_default(),
        }
    }

    pub fn to_update_params(&self) -> UpdateUserParams {
        UpdateUserParams {
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            photo: self.image_url.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub message: &'static str,
    pub user: Option<PublicUser>,
}

impl WebhookResponse {
    pub fn ok(user: Option<PublicUser>) -> Self {
        Self {
            message: "OK",
            user,
        }
    }
}
