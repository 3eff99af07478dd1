use academy_core::{Error, Result};
use mime_guess::mime::{self, Mime};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use url::Url;

/// Stores remote images under the uploads directory.
#[derive(Clone)]
pub struct ImageDownloader {
    client: Client,
    uploads_dir: PathBuf,
    url_prefix: String,
}

impl ImageDownloader {
    pub fn new(client: Client, uploads_dir: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            client,
            uploads_dir: uploads_dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Creates the uploads directory. A failure here aborts the run.
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.uploads_dir).await.map_err(|e| {
            Error::Storage(format!(
                "Failed to create uploads directory {}: {}",
                self.uploads_dir.display(),
                e
            ))
        })
    }

    /// Downloads `url` and returns its site path (`/uploads/<file>`). On any
    /// failure the original URL is returned unchanged.
    pub async fn download_image(&self, url: &str) -> String {
        match self.try_download(url).await {
            Ok(local) => {
                tracing::debug!("🖼️ Saved {} as {}", url, local);
                local
            }
            Err(e) => {
                tracing::warn!("⚠️ Keeping remote image {}: {}", url, e);
                url.to_string()
            }
        }
    }

    async fn try_download(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Scraping(format!("HTTP {} for image", status)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());
        if let Some(ct) = content_type.as_deref() {
            if !is_image_type(ct) {
                return Err(Error::Scraping(format!("Not an image: {}", ct)));
            }
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(Error::Scraping("Empty image body".to_string()));
        }

        let filename = filename_for(url, content_type.as_deref());
        self.ensure_dir().await?;
        tokio::fs::write(self.uploads_dir.join(&filename), &bytes).await?;

        Ok(format!("{}/{}", self.url_prefix, filename))
    }
}

/// Content-addressed file name: the same URL always maps to the same file.
pub fn filename_for(url: &str, content_type: Option<&str>) -> String {
    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
    let extension = extension_from_url(url)
        .or_else(|| content_type.and_then(extension_from_content_type))
        .unwrap_or_else(|| "jpg".to_string());
    format!("scraped_{}.{}", &digest[..16], extension)
}

/// `image/*`, or `application/octet-stream` which some boards send for every file.
fn is_image_type(content_type: &str) -> bool {
    content_type
        .parse::<Mime>()
        .map(|m| m.type_() == mime::IMAGE || m.essence_str() == mime::APPLICATION_OCTET_STREAM.essence_str())
        .unwrap_or(false)
}

fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.last()?.to_ascii_lowercase();
    let (_, ext) = last.rsplit_once('.')?;
    mime_guess::from_ext(ext)
        .first()
        .filter(|m| m.type_() == mime::IMAGE)
        .map(|_| ext.to_string())
}

fn extension_from_content_type(content_type: &str) -> Option<String> {
    let parsed = content_type.parse::<Mime>().ok()?;
    if parsed.type_() != mime::IMAGE {
        return None;
    }
    let extensions = mime_guess::get_mime_extensions_str(parsed.essence_str())?;
    // image/jpeg also lists jfif and jpe
    extensions
        .iter()
        .find(|ext| **ext == "jpg")
        .or_else(|| extensions.first())
        .map(|ext| ext.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    fn downloader(dir: &Path) -> ImageDownloader {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        ImageDownloader::new(client, dir.join("uploads"), "/uploads/")
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/data/editor/poster.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(b"\x89PNG fake")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let downloader = downloader(dir.path());
        let url = format!("{}/data/editor/poster.png", server.url());
        let local = downloader.download_image(&url).await;

        assert!(local.starts_with("/uploads/scraped_"));
        assert!(local.ends_with(".png"));
        let filename = local.trim_start_matches("/uploads/");
        let written = std::fs::read(dir.path().join("uploads").join(filename)).unwrap();
        assert_eq!(written, b"\x89PNG fake");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_image_keeps_original_url() {
        let dir = tempdir().unwrap();
        let downloader = downloader(dir.path());
        let url = "http://127.0.0.1:1/missing.jpg";
        assert_eq!(downloader.download_image(url).await, url);
    }

    #[tokio::test]
    async fn test_error_status_and_html_bodies_are_rejected() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/gone.jpg")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/login.jpg")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html>login</html>")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let downloader = downloader(dir.path());
        for path in ["/gone.jpg", "/login.jpg"] {
            let url = format!("{}{}", server.url(), path);
            assert_eq!(downloader.download_image(&url).await, url);
        }
        assert!(!dir.path().join("uploads").exists()
            || std::fs::read_dir(dir.path().join("uploads")).unwrap().next().is_none());
    }

    #[test]
    fn test_filename_for() {
        let a = filename_for("https://example.com/a/photo.JPEG?w=300", None);
        assert!(a.starts_with("scraped_"));
        assert!(a.ends_with(".jpeg"));
        assert_eq!(a, filename_for("https://example.com/a/photo.JPEG?w=300", None));

        let b = filename_for("https://example.com/image.php?id=3", Some("image/webp"));
        assert!(b.ends_with(".webp"));
        assert!(filename_for("https://example.com/view", None).ends_with(".jpg"));
        assert!(filename_for("https://example.com/view", Some("image/jpeg")).ends_with(".jpg"));
        assert!(filename_for("https://example.com/a.php", Some("image/png; charset=binary")).ends_with(".png"));
    }

    #[test]
    fn test_is_image_type() {
        assert!(is_image_type("image/png"));
        assert!(is_image_type("IMAGE/JPEG"));
        assert!(is_image_type("application/octet-stream"));
        assert!(!is_image_type("text/html; charset=utf-8"));
        assert!(!is_image_type("not a mime"));
    }
}
