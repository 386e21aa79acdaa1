use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

use crate::{
    error::{AppError, AppResult},
    users::{
        dto::{CreateUserParams, UpdateUserParams},
        repo::UserStore,
        repo_types::User,
    },
    utils::handle_error,
};

/// User operations on top of a [`UserStore`]. Every failure is logged
/// and returned as is; nothing is retried.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    revalidate: broadcast::Sender<String>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, revalidate: broadcast::Sender<String>) -> Self {
        Self { store, revalidate }
    }

    #[instrument(skip(self, params), fields(clerk_id = %params.clerk_id))]
    pub async fn create_user(&self, params: CreateUserParams) -> AppResult<User> {
        let result: AppResult<User> = async move {
            params.validate()?;
            let user = params.into_user();
            self.store.insert(&user).await?;
            info!(user_id = %user.id, "user created");
            Ok(user)
        }
        .await;
        result.map_err(handle_error)
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_id(&self, user_id: &str) -> AppResult<User> {
        let result: AppResult<User> = async move {
            let id = ObjectId::parse_str(user_id)
                .map_err(|_| AppError::Validation(format!("invalid user id {user_id}")))?;
            self.store
                .find_by_id(id)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".into()))
        }
        .await;
        result.map_err(handle_error)
    }

    #[instrument(skip(self, changes))]
    pub async fn update_user(&self, clerk_id: &str, changes: UpdateUserParams) -> AppResult<User> {
        let result: AppResult<User> = async move {
            let user = self
                .store
                .update_by_clerk_id(clerk_id, &changes)
                .await?
                .ok_or_else(|| AppError::NotFound("User update failed".into()))?;
            info!(user_id = %user.id, "user updated");
            Ok(user)
        }
        .await;
        result.map_err(handle_error)
    }

    /// Removes the user after unlinking it from events and orders.
    /// The unlink and the delete are separate writes, not a transaction.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, clerk_id: &str) -> AppResult<Option<User>> {
        let result: AppResult<Option<User>> = async move {
            let user = self
                .store
                .find_by_clerk_id(clerk_id)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".into()))?;

            let (events, orders) = tokio::try_join!(
                self.store.unlink_organizer(user.id),
                self.store.unset_buyer(user.id),
            )?;
            debug!(user_id = %user.id, events, orders, "references unlinked");

            let deleted = self.store.delete_by_id(user.id).await?;
            self.revalidate_path("/");
            info!(user_id = %user.id, found = deleted.is_some(), "user deleted");
            Ok(deleted)
        }
        .await;
        result.map_err(handle_error)
    }

    fn revalidate_path(&self, path: &str) {
        if self.revalidate.send(path.to_string()).is_err() {
            debug!(path, "no revalidation subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{order_for, organized_event, MemoryUserStore};

    fn params(clerk_id: &str, email: &str, username: &str) -> CreateUserParams {
        CreateUserParams {
            clerk_id: clerk_id.into(),
            email: email.into(),
            username: username.into(),
            first_name: "A".into(),
            last_name: "B".into(),
            photo: "http://x/img.png".into(),
        }
    }

    fn service(store: Arc<MemoryUserStore>) -> (UserService, broadcast::Receiver<String>) {
        let (tx, rx) = broadcast::channel(8);
        (UserService::new(store, tx), rx)
    }

    #[tokio::test]
    async fn create_then_get_by_id() {
        let store = Arc::new(MemoryUserStore::default());
        let (users, _rx) = service(store.clone());

        let created = users.create_user(params("u1", "a@b.com", "alice")).await.unwrap();
        assert_eq!(created.clerk_id, "u1");
        assert_eq!(created.email, "a@b.com");
        assert_eq!(created.username, "alice");

        let fetched = users.get_user_by_id(&created.id.to_hex()).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_validation_error() {
        let store = Arc::new(MemoryUserStore::default());
        let (users, _rx) = service(store.clone());

        users.create_user(params("u1", "a@b.com", "alice")).await.unwrap();
        let err = users
            .create_user(params("u2", "a@b.com", "bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.users().len(), 1);
    }

    #[tokio::test]
    async fn get_unknown_or_malformed_id_fails() {
        let (users, _rx) = service(Arc::new(MemoryUserStore::default()));

        let err = users.get_user_by_id(&ObjectId::new().to_hex()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = users.get_user_by_id("nope").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn update_overwrites_profile_but_not_email() {
        let store = Arc::new(MemoryUserStore::default());
        let (users, _rx) = service(store.clone());
        users.create_user(params("u1", "a@b.com", "alice")).await.unwrap();

        let updated = users
            .update_user(
                "u1",
                UpdateUserParams {
                    username: Some("alice2".into()),
                    first_name: Some("Ann".into()),
                    last_name: Some("Bee".into()),
                    photo: Some("http://x/new.png".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.username, "alice2");
        assert_eq!(updated.first_name, "Ann");
        assert_eq!(updated.last_name, "Bee");
        assert_eq!(updated.photo, "http://x/new.png");
        assert_eq!(updated.email, "a@b.com");
    }

    #[tokio::test]
    async fn update_unknown_user_is_not_found() {
        let (users, _rx) = service(Arc::new(MemoryUserStore::default()));
        let err = users
            .update_user("ghost", UpdateUserParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(err.to_string().contains("User update failed"));
    }

    #[tokio::test]
    async fn delete_unlinks_events_and_orders_without_removing_them() {
        let store = Arc::new(MemoryUserStore::default());
        let (users, mut rx) = service(store.clone());

        let alice = users.create_user(params("u1", "a@b.com", "alice")).await.unwrap();
        let bob = users.create_user(params("u2", "b@b.com", "bob")).await.unwrap();
        store.add_event(organized_event(Some(alice.id)));
        store.add_event(organized_event(Some(bob.id)));
        store.add_order(order_for(Some(alice.id)));

        let deleted = users.delete_user("u1").await.unwrap();
        assert_eq!(deleted.map(|u| u.id), Some(alice.id));

        assert_eq!(store.users().len(), 1);
        let events = store.events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.organizer != Some(alice.id)));
        assert!(events.iter().any(|e| e.organizer == Some(bob.id)));
        let orders = store.orders();
        assert_eq!(orders.len(), 1);
        assert!(orders[0].buyer.is_none());

        assert_eq!(rx.recv().await.unwrap(), "/");
    }

    #[tokio::test]
    async fn delete_unknown_user_is_not_found() {
        let store = Arc::new(MemoryUserStore::default());
        let (users, _rx) = service(store.clone());
        store.add_event(organized_event(None));

        let err = users.delete_user("ghost").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.events().len(), 1);
    }
}
