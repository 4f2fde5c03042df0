use std::sync::Arc;

use tracing::info;

use crate::{
    config::{Config, MEMORY_STORE},
    dispatch::InviteDispatcher,
    errors::Result,
    identity::{IdentityProvider, StoreIdentityProvider},
    mailer::{Mailer, mailer_for},
    store::{RecordStore, memory::MemoryStore, surreal::SurrealStore},
    views::editor_form::SaveTracker,
};

/// Rows being saved, one tracker per editable table.
#[derive(Clone, Default)]
pub struct SaveTrackers {
    pub members: SaveTracker,
    pub news: SaveTracker,
    pub events: SaveTracker,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RecordStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub mailer: Arc<dyn Mailer>,
    pub invites: InviteDispatcher,
    pub saves: SaveTrackers,
}

impl AppState {
    pub async fn init(config: Config) -> Result<Self> {
        let store: Arc<dyn RecordStore> = if config.store_url == MEMORY_STORE {
            info!("Using the in-memory record store");
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(SurrealStore::connect(&config).await?)
        };
        let mailer = mailer_for(&config.mail);
        Ok(Self::with_backends(config, store, mailer))
    }

    pub fn with_backends(config: Config, store: Arc<dyn RecordStore>, mailer: Arc<dyn Mailer>) -> Self {
        let identity = Arc::new(StoreIdentityProvider::new(store.clone(), &config));
        let invites = InviteDispatcher::new(store.clone(), mailer.clone(), &config);
        Self {
            config: Arc::new(config),
            store,
            identity,
            mailer,
            invites,
            saves: SaveTrackers::default(),
        }
    }
}
