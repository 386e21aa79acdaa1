use mongodb::{
    bson::doc,
    options::{ClientOptions, IndexOptions},
    Client, Collection, Database, IndexModel,
};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::{
    error::{AppError, AppResult},
    events::{Category, Event},
    orders::Order,
    users::repo_types::User,
};

pub const DATABASE_NAME: &str = "evently";

/// Lazily connects once and hands out the same database handle afterwards.
///
/// Concurrent first callers wait on a single in-flight attempt. A failed
/// attempt is not cached, the next call tries again.
pub struct Connector {
    uri: Option<String>,
    database: OnceCell<Database>,
}

impl Connector {
    pub fn new(uri: Option<String>) -> Self {
        Self {
            uri,
            database: OnceCell::new(),
        }
    }

    #[cfg(test)]
    pub fn is_connected(&self) -> bool {
        self.database.initialized()
    }

    #[instrument(skip(self))]
    pub async fn connect(&self) -> AppResult<Database> {
        let database = self.database.get_or_try_init(|| self.establish()).await?;
        Ok(database.clone())
    }

    async fn establish(&self) -> AppResult<Database> {
        let uri = self
            .uri
            .as_deref()
            .ok_or_else(|| AppError::Configuration("MONGODB_URI is missing".into()))?;

        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| AppError::Connection(e.to_string()))?;
        options.app_name = Some(DATABASE_NAME.into());

        let client =
            Client::with_options(options).map_err(|e| AppError::Connection(e.to_string()))?;
        let database = client.database(DATABASE_NAME);
        database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| AppError::Connection(e.to_string()))?;

        Collections::new(&database).ensure_indexes().await?;
        info!(database = DATABASE_NAME, "connected to database");
        Ok(database)
    }
}

/// Typed handles for every collection the app uses, resolved once per database.
#[derive(Clone)]
pub struct Collections {
    pub users: Collection<User>,
    pub events: Collection<Event>,
    pub orders: Collection<Order>,
    pub categories: Collection<Category>,
}

impl Collections {
    pub fn new(database: &Database) -> Self {
        Self {
            users: database.collection("users"),
            events: database.collection("events"),
            orders: database.collection("orders"),
            categories: database.collection("categories"),
        }
    }

    /// Unique constraints live in the store, not in application checks.
    pub async fn ensure_indexes(&self) -> AppResult<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.users
            .create_indexes(
                ["clerkId", "email", "username"].into_iter().map(|field| {
                    IndexModel::builder()
                        .keys(doc! { field: 1 })
                        .options(unique())
                        .build()
                }),
                None,
            )
            .await?;
        self.orders
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "stripeId": 1 })
                    .options(unique())
                    .build(),
                None,
            )
            .await?;
        self.categories
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "name": 1 })
                    .options(unique())
                    .build(),
                None,
            )
            .await?;

        debug!("unique indexes ensured");
        Ok(())
    }
}
