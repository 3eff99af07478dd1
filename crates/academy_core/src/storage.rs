use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::models::{Admission, GalleryItem, Notice, Roadmap};
use crate::types::{ListQuery, Page, SchoolLevel};
use crate::Result;

/// A persisted CMS entity.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Payload used to create a new record.
    type Draft: Send + Sync + 'static;
    /// Partial update; `None` fields are left untouched.
    type Patch: Send + Sync + 'static;

    fn from_draft(id: i64, draft: Self::Draft, now: DateTime<Utc>) -> Self;

    fn apply(&mut self, patch: Self::Patch, now: DateTime<Utc>);

    fn id(&self) -> i64;

    fn title(&self) -> &str;

    fn category(&self) -> Option<&str>;

    /// Text matched by `ListQuery::search`.
    fn search_text(&self) -> String;

    fn created_at(&self) -> DateTime<Utc>;

    /// Bumps the view counter. Returns false for records that do not count views.
    fn record_view(&mut self) -> bool {
        false
    }

    fn matches(&self, query: &ListQuery) -> bool {
        if let Some(category) = query.category_filter() {
            if self.category() != Some(category) {
                return false;
            }
        }
        if let Some(search) = query.search_filter() {
            let needle = search.to_lowercase();
            if !self.search_text().to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    async fn create(&self, draft: T::Draft) -> Result<T>;

    async fn get(&self, id: i64) -> Result<Option<T>>;

    async fn update(&self, id: i64, patch: T::Patch) -> Result<Option<T>>;

    /// Returns true when a record was removed.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Newest first, filtered by the query's category and search text.
    async fn list(&self, query: &ListQuery) -> Result<Page<T>>;

    async fn record_view(&self, id: i64) -> Result<Option<T>>;

    /// Removes every record of the collection, returning how many were removed.
    async fn clear(&self) -> Result<u64>;
}

/// Every collection the site keeps, bundled for the HTTP layer and the importer.
#[derive(Clone)]
pub struct Storage {
    pub notices: Arc<dyn Repository<Notice>>,
    pub gallery: Arc<dyn Repository<GalleryItem>>,
    pub roadmaps: Arc<dyn Repository<Roadmap>>,
    pub middle_school: Arc<dyn Repository<Admission>>,
    pub high_school: Arc<dyn Repository<Admission>>,
}

impl Storage {
    pub fn admissions(&self, level: SchoolLevel) -> Arc<dyn Repository<Admission>> {
        match level {
            SchoolLevel::Middle => self.middle_school.clone(),
            SchoolLevel::High => self.high_school.clone(),
        }
    }
}
