use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An article pulled off a remote admission board, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedArticle {
    pub title: String,
    pub content: String,
    pub category: String,
    pub image_urls: Vec<String>,
    pub original_url: String,
}

/// Provenance blob stored next to every imported admission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachments {
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchoolLevel {
    Middle,
    High,
}

impl SchoolLevel {
    pub const ALL: [SchoolLevel; 2] = [SchoolLevel::Middle, SchoolLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchoolLevel::Middle => "middle",
            SchoolLevel::High => "high",
        }
    }

    /// Name of the storage collection holding this level's admissions.
    pub fn collection(&self) -> &'static str {
        match self {
            SchoolLevel::Middle => "middle_school_admissions",
            SchoolLevel::High => "high_school_admissions",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SchoolLevel::Middle => "중등",
            SchoolLevel::High => "고등",
        }
    }
}

impl fmt::Display for SchoolLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchoolLevel {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "middle" | "middle-school" | "middle_school" => Ok(SchoolLevel::Middle),
            "high" | "high-school" | "high_school" => Ok(SchoolLevel::High),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown school level: {}",
                other
            ))),
        }
    }
}

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Pagination and filtering for list operations. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            category: None,
            search: None,
        }
    }
}

impl ListQuery {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }

    pub fn offset(&self) -> usize {
        ((self.page() - 1) as usize) * self.limit() as usize
    }

    /// Empty strings are treated as "no filter".
    pub fn category_filter(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    pub fn search_filter(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_school_level_parse() {
        assert_eq!("middle".parse::<SchoolLevel>().unwrap(), SchoolLevel::Middle);
        assert_eq!("High-School".parse::<SchoolLevel>().unwrap(), SchoolLevel::High);
        assert!("college".parse::<SchoolLevel>().is_err());
    }

    #[test]
    fn test_list_query_bounds() {
        let query = ListQuery::new(0, 500);
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), MAX_PAGE_LIMIT);
        assert_eq!(ListQuery::new(3, 10).offset(), 20);
        assert_eq!(ListQuery::default().with_category("  ").category_filter(), None);
    }

    #[test]
    fn test_attachments_json_shape() {
        let attachments = Attachments {
            images: vec!["/uploads/a.jpg".to_string()],
            original_url: Some("https://example.com/1".to_string()),
        };
        let json = serde_json::to_value(&attachments).unwrap();
        assert_eq!(json["originalUrl"], "https://example.com/1");
        assert_eq!(json["images"][0], "/uploads/a.jpg");
    }
}
