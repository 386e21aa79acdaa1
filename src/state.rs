use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::db::Connector;
use crate::identity::{ClerkClient, IdentityProvider};
use crate::users::{repo::MongoUserStore, services::UserService};
use crate::webhooks::signature::WebhookVerifier;

const REVALIDATE_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<Connector>,
    pub users: UserService,
    pub identity: Arc<dyn IdentityProvider>,
    pub verifier: WebhookVerifier,
    revalidate: broadcast::Sender<String>,
}

impl AppState {
    /// Loads configuration and connects once; any missing setting is fatal.
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let verifier = WebhookVerifier::new(&config.clerk.webhook_secret)?;

        let db = Arc::new(Connector::new(config.mongodb_uri.clone()));
        db.connect().await?;

        let (revalidate, _) = broadcast::channel(REVALIDATE_CAPACITY);
        let users = UserService::new(
            Arc::new(MongoUserStore::new(db.clone())),
            revalidate.clone(),
        );
        let identity = Arc::new(ClerkClient::new(
            &config.clerk.api_url,
            &config.clerk.secret_key,
        )) as Arc<dyn IdentityProvider>;

        Ok(Self {
            config,
            db,
            users,
            identity,
            verifier,
            revalidate,
        })
    }

    /// Paths whose cached views should be rebuilt.
    pub fn subscribe_revalidation(&self) -> broadcast::Receiver<String> {
        self.revalidate.subscribe()
    }

    #[cfg(test)]
    pub fn fake(
        store: Arc<dyn crate::users::repo::UserStore>,
        identity: Arc<dyn IdentityProvider>,
        webhook_secret: &str,
    ) -> Self {
        let config = Arc::new(AppConfig {
            mongodb_uri: None,
            clerk: crate::config::ClerkConfig {
                webhook_secret: webhook_secret.into(),
                secret_key: "sk_test".into(),
                api_url: crate::config::DEFAULT_CLERK_API_URL.into(),
            },
        });
        let (revalidate, _) = broadcast::channel(REVALIDATE_CAPACITY);
        Self {
            db: Arc::new(Connector::new(None)),
            users: UserService::new(store, revalidate.clone()),
            identity,
            verifier: WebhookVerifier::new(webhook_secret).expect("valid test secret"),
            revalidate,
            config,
        }
    }
}
