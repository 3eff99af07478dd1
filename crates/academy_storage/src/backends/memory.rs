use academy_core::{ListQuery, Page, Record, Repository, Result, SchoolLevel, Storage};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct MemoryStore<T: Record> {
    collection: String,
    records: Vec<T>,
    next_id: i64,
}

impl<T: Record> MemoryStore<T> {
    pub fn new(collection: String) -> Self {
        Self {
            collection,
            records: Vec::new(),
            next_id: 1,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn create(&mut self, draft: T::Draft) -> T {
        let record = T::from_draft(self.next_id, draft, Utc::now());
        self.next_id += 1;
        self.records.push(record.clone());
        record
    }

    fn position(&self, id: i64) -> Option<usize> {
        self.records.iter().position(|r| r.id() == id)
    }

    fn list(&self, query: &ListQuery) -> Page<T> {
        let mut matching: Vec<&T> = self.records.iter().filter(|r| r.matches(query)).collect();
        matching.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(query.offset())
            .take(query.limit() as usize)
            .cloned()
            .collect();
        Page {
            items,
            total,
            page: query.page(),
            limit: query.limit(),
        }
    }
}

/// In-process repository, lost on restart.
pub struct MemoryRepository<T: Record> {
    store: Arc<RwLock<MemoryStore<T>>>,
}

impl<T: Record> MemoryRepository<T> {
    pub fn new(collection: &str) -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new(collection.to_string()))),
        }
    }
}

#[async_trait]
impl<T: Record> Repository<T> for MemoryRepository<T> {
    async fn create(&self, draft: T::Draft) -> Result<T> {
        let mut store = self.store.write().await;
        Ok(store.create(draft))
    }

    async fn get(&self, id: i64) -> Result<Option<T>> {
        let store = self.store.read().await;
        Ok(store.records.iter().find(|r| r.id() == id).cloned())
    }

    async fn update(&self, id: i64, patch: T::Patch) -> Result<Option<T>> {
        let mut store = self.store.write().await;
        let Some(idx) = store.position(id) else {
            return Ok(None);
        };
        let record = &mut store.records[idx];
        record.apply(patch, Utc::now());
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut store = self.store.write().await;
        match store.position(id) {
            Some(idx) => {
                store.records.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<T>> {
        let store = self.store.read().await;
        Ok(store.list(query))
    }

    async fn record_view(&self, id: i64) -> Result<Option<T>> {
        let mut store = self.store.write().await;
        let Some(idx) = store.position(id) else {
            return Ok(None);
        };
        let record = &mut store.records[idx];
        record.record_view();
        Ok(Some(record.clone()))
    }

    async fn clear(&self) -> Result<u64> {
        let mut store = self.store.write().await;
        let removed = store.records.len() as u64;
        store.records.clear();
        tracing::debug!("cleared {} records from {}", removed, store.collection());
        Ok(removed)
    }
}

pub struct MemoryStorage;

impl MemoryStorage {
    pub fn create() -> Storage {
        Storage {
            notices: Arc::new(MemoryRepository::new("notices")),
            gallery: Arc::new(MemoryRepository::new("gallery")),
            roadmaps: Arc::new(MemoryRepository::new("roadmaps")),
            middle_school: Arc::new(MemoryRepository::new(SchoolLevel::Middle.collection())),
            high_school: Arc::new(MemoryRepository::new(SchoolLevel::High.collection())),
        }
    }
}
