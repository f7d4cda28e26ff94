use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Document, Repository, RepositoryError};

/// Thread-safe map keyed by document id. Iteration order is the id order.
#[derive(Clone)]
pub struct InMemoryRepository<T> {
    documents: Arc<Mutex<BTreeMap<String, T>>>,
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self {
            documents: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl<T: Document> InMemoryRepository<T> {
    fn guard(&self) -> Result<MutexGuard<'_, BTreeMap<String, T>>, RepositoryError> {
        self.documents
            .lock()
            .map_err(|_| RepositoryError::Unavailable(format!("{} lock poisoned", T::COLLECTION)))
    }
}

impl<T: Document> Repository<T> for InMemoryRepository<T> {
    fn insert(&self, document: T) -> Result<T, RepositoryError> {
        let mut guard = self.guard()?;
        if guard.contains_key(document.id()) {
            return Err(RepositoryError::Conflict {
                collection: T::COLLECTION,
                id: document.id().to_string(),
            });
        }
        guard.insert(document.id().to_string(), document.clone());
        Ok(document)
    }

    fn update(&self, document: T) -> Result<(), RepositoryError> {
        let mut guard = self.guard()?;
        match guard.get_mut(document.id()) {
            Some(slot) => {
                *slot = document;
                Ok(())
            }
            None => Err(RepositoryError::NotFound {
                collection: T::COLLECTION,
                id: document.id().to_string(),
            }),
        }
    }

    fn upsert(&self, document: T) -> Result<(), RepositoryError> {
        let mut guard = self.guard()?;
        guard.insert(document.id().to_string(), document);
        Ok(())
    }

    fn fetch(&self, id: &str) -> Result<Option<T>, RepositoryError> {
        Ok(self.guard()?.get(id).cloned())
    }

    fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.guard()?.remove(id).is_some())
    }

    fn list(&self) -> Result<Vec<T>, RepositoryError> {
        Ok(self.guard()?.values().cloned().collect())
    }
}
