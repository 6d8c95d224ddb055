//! The set of document stores the server manages.

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::StorageConfig;
use crate::resources::{CollectionResource, HighlightConfig, Plan, SingletonResource, SnippetLibrary, Template};
use crate::store::collection::Collection;
use crate::store::document::{DocumentStore, StoreOptions};
use crate::store::error::StoreError;
use crate::store::recovery::{refuse, start_fresh};

#[derive(Clone)]
pub struct Stores {
    pub plans: DocumentStore<Collection<Plan>>,
    pub templates: DocumentStore<Collection<Template>>,
    pub highlights: DocumentStore<HighlightConfig>,
    pub snippets: DocumentStore<SnippetLibrary>,
}

impl Stores {
    /// Open (or create) every document under `config.data_dir`.
    pub async fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        let dir = &config.data_dir;
        let recover = config.recover_corrupt;

        Ok(Self {
            plans: DocumentStore::open(dir.join(&config.plans_file), collection_options(recover)).await?,
            templates: DocumentStore::open(dir.join(&config.templates_file), collection_options(recover))
                .await?,
            highlights: DocumentStore::open(dir.join(&config.highlights_file), singleton_options(recover))
                .await?,
            snippets: DocumentStore::open(dir.join(&config.snippets_file), singleton_options(recover))
                .await?,
        })
    }

    /// Independent snapshots of every document. Not a transactional view
    /// across stores.
    pub fn backup(&self) -> Result<Value, StoreError> {
        let mut backup = Map::new();
        backup.insert("createdAt".to_string(), json!(Utc::now()));
        backup.insert(Plan::KIND.to_string(), to_value(&self.plans.snapshot())?);
        backup.insert(Template::KIND.to_string(), to_value(&self.templates.snapshot())?);
        backup.insert(HighlightConfig::KIND.to_string(), to_value(&self.highlights.snapshot())?);
        backup.insert(SnippetLibrary::KIND.to_string(), to_value(&self.snippets.snapshot())?);
        Ok(Value::Object(backup))
    }

    /// Drain pending mutations on every store.
    pub async fn close(&self) {
        tokio::join!(
            self.plans.close(),
            self.templates.close(),
            self.highlights.close(),
            self.snippets.close(),
        );
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

fn collection_options<R: CollectionResource>(recover: bool) -> StoreOptions<Collection<R>> {
    let options = StoreOptions::new(Collection::default()).normalize(Collection::normalized);
    if recover {
        options.on_corrupt(start_fresh(Collection::default()))
    } else {
        options.on_corrupt(refuse())
    }
}

fn singleton_options<R: SingletonResource>(recover: bool) -> StoreOptions<R> {
    let options = StoreOptions::new(R::default()).normalize(R::normalized);
    if recover {
        options.on_corrupt(start_fresh(R::default()))
    } else {
        options.on_corrupt(refuse())
    }
}
