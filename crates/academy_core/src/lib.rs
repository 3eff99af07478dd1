pub mod error;
pub mod models;
pub mod storage;
pub mod text;
pub mod types;

pub use error::{Error, Result};
pub use models::{
    Admission, AdmissionPatch, GalleryItem, GalleryItemPatch, NewAdmission, NewGalleryItem,
    NewNotice, NewRoadmap, Notice, NoticePatch, Roadmap, RoadmapPatch,
};
pub use storage::{Record, Repository, Storage};
pub use types::{Attachments, ListQuery, Page, SchoolLevel, ScrapedArticle};

pub mod prelude {
    pub use crate::storage::{Record, Repository, Storage};
    pub use crate::types::{ListQuery, Page, SchoolLevel};
    pub use crate::{Error, Result};
}
