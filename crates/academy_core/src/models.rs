use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::Record;
use crate::text::{excerpt, EXCERPT_CHARS};
use crate::types::Attachments;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admission {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub category: String,
    pub attachments: Attachments,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdmission {
    pub title: String,
    pub content: String,
    /// Set by the importer; derived from `content` when absent.
    #[serde(skip_deserializing)]
    pub excerpt: Option<String>,
    pub category: String,
    #[serde(default)]
    pub attachments: Attachments,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub attachments: Option<Attachments>,
}

impl Record for Admission {
    type Draft = NewAdmission;
    type Patch = AdmissionPatch;

    fn from_draft(id: i64, draft: NewAdmission, now: DateTime<Utc>) -> Self {
        let excerpt = match draft.excerpt {
            Some(e) if e.chars().count() <= draft.content.chars().count() => e,
            _ => excerpt(&draft.content, EXCERPT_CHARS),
        };
        Self {
            id,
            title: draft.title,
            content: draft.content,
            excerpt,
            category: draft.category,
            attachments: draft.attachments,
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: AdmissionPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.excerpt = excerpt(&content, EXCERPT_CHARS);
            self.content = content;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(attachments) = patch.attachments {
            self.attachments = attachments;
        }
        self.updated_at = now;
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn category(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn search_text(&self) -> String {
        format!("{}\n{}", self.title, self.content)
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn record_view(&mut self) -> bool {
        self.views += 1;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub is_pinned: bool,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotice {
    pub title: String,
    pub content: String,
    #[serde(default = "default_notice_category")]
    pub category: String,
    #[serde(default)]
    pub is_pinned: bool,
}

fn default_notice_category() -> String {
    "공지".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub is_pinned: Option<bool>,
}

impl Record for Notice {
    type Draft = NewNotice;
    type Patch = NoticePatch;

    fn from_draft(id: i64, draft: NewNotice, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            content: draft.content,
            category: draft.category,
            is_pinned: draft.is_pinned,
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: NoticePatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(is_pinned) = patch.is_pinned {
            self.is_pinned = is_pinned;
        }
        self.updated_at = now;
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn category(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn search_text(&self) -> String {
        format!("{}\n{}", self.title, self.content)
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn record_view(&mut self) -> bool {
        self.views += 1;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGalleryItem {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub image_url: String,
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItemPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
}

impl Record for GalleryItem {
    type Draft = NewGalleryItem;
    type Patch = GalleryItemPatch;

    fn from_draft(id: i64, draft: NewGalleryItem, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            image_url: draft.image_url,
            category: draft.category,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: GalleryItemPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = image_url;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        self.updated_at = now;
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn category(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn search_text(&self) -> String {
        format!("{}\n{}", self.title, self.description.as_deref().unwrap_or_default())
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roadmap {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub category: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoadmap {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub sort_order: Option<i32>,
}

impl Record for Roadmap {
    type Draft = NewRoadmap;
    type Patch = RoadmapPatch;

    fn from_draft(id: i64, draft: NewRoadmap, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            content: draft.content,
            category: draft.category,
            sort_order: draft.sort_order,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: RoadmapPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(sort_order) = patch.sort_order {
            self.sort_order = sort_order;
        }
        self.updated_at = now;
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn category(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn search_text(&self) -> String {
        format!("{}\n{}", self.title, self.content)
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
