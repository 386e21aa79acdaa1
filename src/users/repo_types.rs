use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// User record in the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub clerk_id: String, // identity provider id, unique
    pub email: String, // unique
    pub username: String, // unique
    pub first_name: String,
    pub last_name: String,
    pub photo: String, // avatar URL
}
