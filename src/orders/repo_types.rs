use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Order record in the `orders` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default = "DateTime::now")]
    pub created_at: DateTime,
    pub stripe_id: String, // unique
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<ObjectId>, // ref events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer: Option<ObjectId>, // ref users
}
