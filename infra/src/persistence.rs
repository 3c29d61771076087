use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Context, Result};
use err_derive::Error;
use log::*;
use serde::{de::DeserializeOwned, Serialize};

use crate::documents::{HasMeta, Version};
use crate::ids::{Entity, Id};

#[derive(Debug, PartialEq, Eq, Error)]
#[error(display = "stale version")]
pub struct ConcurrencyError;

pub trait Storage {
    fn save<D>(&self, document: &mut D) -> Result<()>
    where
        D: Serialize + HasMeta + Entity;

    fn load<D>(&self, id: &Id<D>) -> Result<Option<D>>
    where
        D: DeserializeOwned + Entity;

    fn delete<D>(&self, id: &Id<D>) -> Result<()>
    where
        D: Entity;
}

#[derive(Debug, Default)]
struct Store {
    documents: RwLock<HashMap<String, serde_json::Value>>,
    sequence: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct Documents {
    store: Arc<Store>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentConnectionManager {
    store: Arc<Store>,
}

impl Store {
    fn read(&self) -> Result<RwLockReadGuard<HashMap<String, serde_json::Value>>> {
        self.documents
            .read()
            .map_err(|_| anyhow!("document store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<HashMap<String, serde_json::Value>>> {
        self.documents
            .write()
            .map_err(|_| anyhow!("document store lock poisoned"))
    }

    fn next_version(&self) -> Version {
        Version::from_sequence(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl DocumentConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl r2d2::ManageConnection for DocumentConnectionManager {
    type Connection = Documents;
    type Error = std::convert::Infallible;

    fn connect(&self) -> Result<Documents, Self::Error> {
        let store = self.store.clone();
        Ok(Documents { store })
    }

    fn is_valid(&self, _conn: &mut Documents) -> Result<(), Self::Error> {
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Documents) -> bool {
        false
    }
}

impl Storage for Documents {
    fn save<D>(&self, document: &mut D) -> Result<()>
    where
        D: Serialize + HasMeta + Entity,
    {
        let mut json = serde_json::to_value(&*document).context("serialize document")?;
        let key = document.meta().id.to_string();

        let mut documents = self.store.write()?;
        let expected = &document.meta().version;
        if expected.is_initial() {
            if documents.contains_key(&key) {
                warn!("Insert of {} found an existing document", key);
                return Err(ConcurrencyError.into());
            }
        } else {
            let stored = documents
                .get(&key)
                .and_then(|doc| doc.get("_version"))
                .and_then(|version| version.as_str());
            if stored != Some(expected.as_str()) {
                warn!(
                    "Update of {} expected version {:?}; found {:?}",
                    key,
                    expected.as_str(),
                    stored
                );
                return Err(ConcurrencyError.into());
            }
        }

        let version = self.store.next_version();
        json.as_object_mut()
            .ok_or_else(|| anyhow!("document must serialize to an object"))?
            .insert(
                "_version".to_string(),
                serde_json::to_value(&version).context("serialize version")?,
            );
        documents.insert(key.clone(), json);
        drop(documents);

        document.meta_mut().version = version;
        debug!("Saved {} at version {:?}", key, document.meta().version);
        Ok(())
    }

    fn load<D>(&self, id: &Id<D>) -> Result<Option<D>>
    where
        D: DeserializeOwned + Entity,
    {
        let documents = self.store.read()?;
        if let Some(json) = documents.get(&id.to_string()) {
            let doc = serde_json::from_value(json.clone()).context("deserialize document")?;
            Ok(Some(doc))
        } else {
            Ok(None)
        }
    }

    fn delete<D>(&self, id: &Id<D>) -> Result<()>
    where
        D: Entity,
    {
        let mut documents = self.store.write()?;
        let removed = documents.remove(&id.to_string());
        debug!("Removed {}: present={}", id, removed.is_some());
        Ok(())
    }
}
