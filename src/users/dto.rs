use lazy_static::lazy_static;
use mongodb::bson::oid::ObjectId;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::users::repo_types::User;

/// Fields for a new user, as mapped from the identity provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserParams {
    pub clerk_id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub photo: String,
}

impl CreateUserParams {
    pub fn validate(&self) -> AppResult<()> {
        let required = [
            ("clerkId", &self.clerk_id),
            ("email", &self.email),
            ("username", &self.username),
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("photo", &self.photo),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(AppError::Validation(format!("{field} is required")));
        }
        if !is_valid_email(&self.email) {
            return Err(AppError::Validation(format!(
                "email {} is not valid",
                self.email
            )));
        }
        Ok(())
    }

    pub fn into_user(self) -> User {
        User {
            id: ObjectId::new(),
            clerk_id: self.clerk_id,
            email: self.email,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            photo: self.photo,
        }
    }
}

/// Fields replaced on update. `None` leaves the stored value untouched.
/// Email is deliberately absent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl UpdateUserParams {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.photo.is_none()
    }

    #[cfg(test)]
    pub fn apply(&self, user: &mut User) {
        if let Some(v) = &self.username {
            user.username = v.clone();
        }
        if let Some(v) = &self.first_name {
            user.first_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            user.last_name = v.clone();
        }
        if let Some(v) = &self.photo {
            user.photo = v.clone();
        }
    }
}

/// User as returned to HTTP clients, with the id as a hex string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub clerk_id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub photo: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        let User {
            id,
            clerk_id,
            email,
            username,
            first_name,
            last_name,
            photo,
        } = user;
        Self {
            id: id.to_hex(),
            clerk_id,
            email,
            username,
            first_name,
            last_name,
            photo,
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CreateUserParams {
        CreateUserParams {
            clerk_id: "u1".into(),
            email: "a@b.com".into(),
            username: "alice".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            photo: "http://x/img.png".into(),
        }
    }

    #[test]
    fn complete_params_validate() {
        assert!(params().validate().is_ok());
    }

    #[test]
    fn blank_required_field_is_rejected() {
        let mut p = params();
        p.username = "  ".into();
        let err = p.validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn malformed_email_is_rejected() {
        let mut p = params();
        p.email = "not-an-email".into();
        assert!(matches!(p.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn public_user_uses_hex_id_and_camel_case() {
        let user = params().into_user();
        let hex = user.id.to_hex();
        let json = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert_eq!(json["_id"], hex);
        assert_eq!(json["clerkId"], "u1");
        assert_eq!(json["firstName"], "A");
    }

    #[test]
    fn update_only_touches_provided_fields() {
        let mut user = params().into_user();
        let changes = UpdateUserParams {
            first_name: Some("Alicia".into()),
            ..Default::default()
        };
        changes.apply(&mut user);
        assert_eq!(user.first_name, "Alicia");
        assert_eq!(user.last_name, "B");
        assert_eq!(user.email, "a@b.com");
    }
}
