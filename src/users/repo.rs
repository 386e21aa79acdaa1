use std::sync::Arc;

use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId, to_document, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, ReturnDocument},
};

use crate::{
    db::{Collections, Connector},
    error::{AppError, AppResult},
    users::{dto::UpdateUserParams, repo_types::User},
};

const DUPLICATE_KEY: i32 = 11000;
const ORGANIZER: &str = "organizer";
const BUYER: &str = "buyer";

/// Storage primitives behind the user service.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user; uniqueness violations surface as `Validation`.
    async fn insert(&self, user: &User) -> AppResult<()>;
    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<User>>;
    async fn find_by_clerk_id(&self, clerk_id: &str) -> AppResult<Option<User>>;
    /// Apply `changes` and return the record as it is after the update.
    async fn update_by_clerk_id(
        &self,
        clerk_id: &str,
        changes: &UpdateUserParams,
    ) -> AppResult<Option<User>>;
    /// Clear `organizer` on every event pointing at `user_id`.
    async fn unlink_organizer(&self, user_id: ObjectId) -> AppResult<u64>;
    /// Clear `buyer` on every order pointing at `user_id`.
    async fn unset_buyer(&self, user_id: ObjectId) -> AppResult<u64>;
    async fn delete_by_id(&self, id: ObjectId) -> AppResult<Option<User>>;
}

pub struct MongoUserStore {
    connector: Arc<Connector>,
}

impl MongoUserStore {
    pub fn new(connector: Arc<Connector>) -> Self {
        Self { connector }
    }

    async fn collections(&self) -> AppResult<Collections> {
        let database = self.connector.connect().await?;
        Ok(Collections::new(&database))
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert(&self, user: &User) -> AppResult<()> {
        let users = self.collections().await?.users;
        users.insert_one(user, None).await.map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::Validation(format!("user already exists: {e}"))
            } else {
                AppError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<User>> {
        let users = self.collections().await?.users;
        Ok(users.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_by_clerk_id(&self, clerk_id: &str) -> AppResult<Option<User>> {
        let users = self.collections().await?.users;
        Ok(users.find_one(doc! { "clerkId": clerk_id }, None).await?)
    }

    async fn update_by_clerk_id(
        &self,
        clerk_id: &str,
        changes: &UpdateUserParams,
    ) -> AppResult<Option<User>> {
        let users = self.collections().await?.users;
        let Some(update) = profile_update(changes)? else {
            return Ok(users.find_one(doc! { "clerkId": clerk_id }, None).await?);
        };

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        users
            .find_one_and_update(doc! { "clerkId": clerk_id }, update, options)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    AppError::Validation(format!("username already taken: {e}"))
                } else {
                    AppError::Database(e)
                }
            })
    }

    async fn unlink_organizer(&self, user_id: ObjectId) -> AppResult<u64> {
        let events = self.collections().await?.events;
        let (filter, update) = unlink(ORGANIZER, user_id);
        let result = events.update_many(filter, update, None).await?;
        Ok(result.modified_count)
    }

    async fn unset_buyer(&self, user_id: ObjectId) -> AppResult<u64> {
        let orders = self.collections().await?.orders;
        let (filter, update) = unlink(BUYER, user_id);
        let result = orders.update_many(filter, update, None).await?;
        Ok(result.modified_count)
    }

    async fn delete_by_id(&self, id: ObjectId) -> AppResult<Option<User>> {
        let users = self.collections().await?.users;
        Ok(users.find_one_and_delete(doc! { "_id": id }, None).await?)
    }
}

/// `$set` document for a profile update, or `None` when nothing changes.
fn profile_update(changes: &UpdateUserParams) -> AppResult<Option<Document>> {
    if changes.is_empty() {
        return Ok(None);
    }
    let set = to_document(changes).map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(Some(doc! { "$set": set }))
}

/// Filter and update removing `field` wherever it points at `user_id`.
fn unlink(field: &str, user_id: ObjectId) -> (Document, Document) {
    (doc! { field: user_id }, doc! { "$unset": { field: "" } })
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}
