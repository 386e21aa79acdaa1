//! In-memory fakes shared by the unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};

use crate::{
    error::{AppError, AppResult},
    events::Event,
    identity::IdentityProvider,
    orders::Order,
    users::{dto::UpdateUserParams, repo::UserStore, repo_types::User},
};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    events: Vec<Event>,
    orders: Vec<Order>,
}

/// `UserStore` over plain vectors, with the same unique keys as the indexes.
#[derive(Default)]
pub struct MemoryUserStore {
    data: Mutex<Collections>,
}

impl MemoryUserStore {
    pub fn users(&self) -> Vec<User> {
        self.data.lock().unwrap().users.clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.data.lock().unwrap().events.clone()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.data.lock().unwrap().orders.clone()
    }

    pub fn add_event(&self, event: Event) {
        self.data.lock().unwrap().events.push(event);
    }

    pub fn add_order(&self, order: Order) {
        self.data.lock().unwrap().orders.push(order);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: &User) -> AppResult<()> {
        let mut data = self.data.lock().unwrap();
        let clash = data.users.iter().any(|u| {
            u.clerk_id == user.clerk_id || u.email == user.email || u.username == user.username
        });
        if clash {
            return Err(AppError::Validation("duplicate key".into()));
        }
        data.users.push(user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<User>> {
        let data = self.data.lock().unwrap();
        Ok(data.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_clerk_id(&self, clerk_id: &str) -> AppResult<Option<User>> {
        let data = self.data.lock().unwrap();
        Ok(data.users.iter().find(|u| u.clerk_id == clerk_id).cloned())
    }

    async fn update_by_clerk_id(
        &self,
        clerk_id: &str,
        changes: &UpdateUserParams,
    ) -> AppResult<Option<User>> {
        let mut data = self.data.lock().unwrap();
        if let Some(username) = &changes.username {
            let taken = data
                .users
                .iter()
                .any(|u| u.clerk_id != clerk_id && &u.username == username);
            if taken {
                return Err(AppError::Validation("duplicate key".into()));
            }
        }
        Ok(data
            .users
            .iter_mut()
            .find(|u| u.clerk_id == clerk_id)
            .map(|user| {
                changes.apply(user);
                user.clone()
            }))
    }

    async fn unlink_organizer(&self, user_id: ObjectId) -> AppResult<u64> {
        let mut data = self.data.lock().unwrap();
        let mut modified = 0;
        for event in data.events.iter_mut().filter(|e| e.organizer == Some(user_id)) {
            event.organizer = None;
            modified += 1;
        }
        Ok(modified)
    }

    async fn unset_buyer(&self, user_id: ObjectId) -> AppResult<u64> {
        let mut data = self.data.lock().unwrap();
        let mut modified = 0;
        for order in data.orders.iter_mut().filter(|o| o.buyer == Some(user_id)) {
            order.buyer = None;
            modified += 1;
        }
        Ok(modified)
    }

    async fn delete_by_id(&self, id: ObjectId) -> AppResult<Option<User>> {
        let mut data = self.data.lock().unwrap();
        let position = data.users.iter().position(|u| u.id == id);
        Ok(position.map(|i| data.users.remove(i)))
    }
}

/// Records metadata writes instead of calling the provider.
#[derive(Default)]
pub struct RecordingIdentity {
    calls: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingIdentity {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::default(),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for RecordingIdentity {
    async fn update_public_metadata(&self, clerk_id: &str, user_id: &str) -> AppResult<()> {
        if self.fail {
            return Err(AppError::IdentityProvider("metadata update returned 503".into()));
        }
        self.calls
            .lock()
            .unwrap()
            .push((clerk_id.to_string(), user_id.to_string()));
        Ok(())
    }
}

pub fn organized_event(organizer: Option<ObjectId>) -> Event {
    Event {
        id: ObjectId::new(),
        title: "Rust meetup".into(),
        description: None,
        location: Some("Online".into()),
        created_at: DateTime::now(),
        image_url: "http://x/cover.png".into(),
        start_date_time: DateTime::now(),
        end_date_time: DateTime::now(),
        price: None,
        is_free: true,
        url: None,
        category: None,
        organizer,
    }
}

pub fn order_for(buyer: Option<ObjectId>) -> Order {
    Order {
        id: ObjectId::new(),
        created_at: DateTime::now(),
        stripe_id: format!("cs_test_{}", ObjectId::new().to_hex()),
        total_amount: Some("25".into()),
        event: None,
        buyer,
    }
}
