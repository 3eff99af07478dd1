use academy_core::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// A fetched page. `url` is the final URL after redirects.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub body: String,
}

pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/*;q=0.8,*/*;q=0.7"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
    );

    Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(Error::Http)
}

/// Sequential HTML fetcher with a fixed pause between requests.
pub struct Fetcher {
    client: Client,
    delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Fetcher {
    pub fn new(client: Client, delay: Duration) -> Self {
        Self {
            client,
            delay,
            last_request: Mutex::new(None),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < self.delay {
                sleep(self.delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Fetches `url`. Failures are logged and reported as `None`; callers skip the URL.
    pub async fn fetch(&self, url: &str) -> Option<Page> {
        self.throttle().await;

        match self.try_fetch(url).await {
            Ok(page) => Some(page),
            Err(e) => {
                tracing::warn!("⚠️ Failed to fetch {}: {}", url, e);
                None
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<Page> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Scraping(format!("HTTP {} for {}", status, url)));
        }
        let final_url = response.url().to_string();
        let body = response.text().await?;
        Ok(Page {
            url: final_url,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn fetcher(delay: Duration) -> Fetcher {
        Fetcher::new(
            build_client("test-agent", Duration::from_secs(5)).unwrap(),
            delay,
        )
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_headers() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/board")
            .match_header("user-agent", "test-agent")
            .match_header("accept-language", mockito::Matcher::Regex("ko-KR".to_string()))
            .with_status(200)
            .with_body("<html><body><h1>입시</h1></body></html>")
            .create_async()
            .await;

        let page = fetcher(Duration::ZERO)
            .fetch(&format!("{}/board", server.url()))
            .await
            .unwrap();
        assert!(page.body.contains("입시"));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_failures_are_soft() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = fetcher(Duration::ZERO);
        assert!(fetcher.fetch(&format!("{}/missing", server.url())).await.is_none());
        assert!(fetcher.fetch("http://127.0.0.1:1/unreachable").await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_waits_between_requests() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("ok")
            .expect(2)
            .create_async()
            .await;

        let fetcher = fetcher(Duration::from_millis(200));
        let url = format!("{}/page", server.url());
        let started = std::time::Instant::now();
        fetcher.fetch(&url).await.unwrap();
        fetcher.fetch(&url).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(200));
    }
}
