use academy_core::Storage;
use academy_scraper::ScrapeManager;
use std::path::Path;

use crate::session::SessionStore;

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// An empty configured password disables login entirely.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        !self.password.is_empty() && self.username == username && self.password == password
    }
}

pub struct AppState {
    pub storage: Storage,
    pub sessions: SessionStore,
    pub scraper: ScrapeManager,
    pub admin: AdminCredentials,
}

impl AppState {
    /// Admin uploads share the directory the importer downloads images into.
    pub fn uploads_dir(&self) -> &Path {
        &self.scraper.settings().config.uploads_dir
    }

    pub fn uploads_prefix(&self) -> &str {
        &self.scraper.settings().config.uploads_prefix
    }
}
