use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Event record in the `events` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default = "DateTime::now")]
    pub created_at: DateTime,
    pub image_url: String,
    #[serde(default = "DateTime::now")]
    pub start_date_time: DateTime,
    #[serde(default = "DateTime::now")]
    pub end_date_time: DateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default = "default_is_free")]
    pub is_free: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ObjectId>, // ref categories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<ObjectId>, // ref users
}

fn default_is_free() -> bool {
    true
}

/// Category record in the `categories` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String, // unique
}
