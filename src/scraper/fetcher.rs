//! HTTP fetcher
//!
//! Every request the scraper makes goes through one [`Fetcher`]:
//! - Builds the HTTP client with a descriptive user agent
//! - Spaces requests out by the configured cooldown
//! - Maps transport failures and non-success statuses to `NotFound`
//! - Optionally inlines `<iframe>` contents into fetched pages

use crate::config::UserAgentConfig;
use crate::scraper::Cooldown;
use crate::{Result, ScrapeError};
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use auction_scraper::config::UserAgentConfig;
/// use auction_scraper::scraper::build_http_client;
///
/// let config = UserAgentConfig {
///     name: "auction-scraper".to_string(),
///     version: "0.1".to_string(),
///     contact_url: Some("https://example.com/about".to_string()),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> std::result::Result<Client, reqwest::Error> {
    // Format: Name/Version (+ContactURL)
    let user_agent = match &config.contact_url {
        Some(contact) => format!("{}/{} (+{})", config.name, config.version, contact),
        None => format!("{}/{}", config.name, config.version),
    };

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rate-limited HTTP client shared by an adapter and the pipeline
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    cooldown: Cooldown,
}

impl Fetcher {
    pub fn new(client: Client, cooldown: Duration) -> Self {
        Self {
            client,
            cooldown: Cooldown::new(cooldown),
        }
    }

    pub fn cooldown(&self) -> &Cooldown {
        &self.cooldown
    }

    /// Waits out the cooldown, then issues a GET
    ///
    /// The request instant is recorded whether or not the request succeeds.
    async fn send(&mut self, uri: &str) -> Result<Response> {
        let url = Url::parse(uri)?;

        if let Some(wait) = self.cooldown.time_until_ready(Instant::now()) {
            tracing::debug!("Awaiting cooldown expiry in {:.2}s", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }

        tracing::debug!("GET {}", url);
        let result = self.client.get(url).send().await;
        self.cooldown.record_request(Instant::now());

        result.map_err(|e| ScrapeError::not_found(uri, describe_transport_error(&e)))
    }

    /// Fetches a resource, returning its status and raw body
    ///
    /// Non-success statuses are returned rather than raised; only transport
    /// failures are errors.
    pub async fn get_bytes(&mut self, uri: &str) -> Result<(StatusCode, Vec<u8>)> {
        let response = self.send(uri).await?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ScrapeError::not_found(uri, describe_transport_error(&e)))?;
        Ok((status, body.to_vec()))
    }

    /// Fetches a resource as text, failing on non-success statuses
    pub async fn get_text(&mut self, uri: &str) -> Result<String> {
        let response = self.send(uri).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::not_found(uri, format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| ScrapeError::not_found(uri, describe_transport_error(&e)))
    }

    /// Fetches and deserializes a JSON resource
    pub async fn get_json<T: DeserializeOwned>(&mut self, uri: &str) -> Result<T> {
        let body = self.get_text(uri).await?;
        serde_json::from_str(&body)
            .map_err(|e| ScrapeError::parse(uri, format!("invalid JSON body: {}", e)))
    }

    /// Fetches an HTML page
    ///
    /// With `resolve_frames`, the body of every `<iframe src=...>` is fetched
    /// and placed inside its iframe element. Frames that fail to load are
    /// left empty.
    pub async fn get_page(&mut self, uri: &str, resolve_frames: bool) -> Result<String> {
        let body = self.get_text(uri).await?;
        if !resolve_frames {
            return Ok(body);
        }

        let base = Url::parse(uri)?;
        let (mut document, frames) = collect_frames(&body, &base);

        for frame in frames {
            match self.get_text(frame.src.as_str()).await {
                Ok(content) => document = inline_frame(document, &frame.outer_html, &content),
                Err(e) => tracing::debug!("Skipping frame {} of {}: {}", frame.src, uri, e),
            }
        }

        Ok(document)
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        "connection failed".to_string()
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else {
        error.to_string()
    }
}

struct FrameRef {
    src: Url,
    outer_html: String,
}

/// Serializes the document and lists its frames
///
/// The parsed document never outlives this call, so callers can await
/// between frames.
fn collect_frames(body: &str, base: &Url) -> (String, Vec<FrameRef>) {
    let document = Html::parse_document(body);
    let mut frames = Vec::new();

    if let Ok(selector) = Selector::parse("iframe[src]") {
        for element in document.select(&selector) {
            let src = element
                .value()
                .attr("src")
                .and_then(|src| base.join(src.trim()).ok());
            if let Some(src) = src {
                frames.push(FrameRef {
                    src,
                    outer_html: element.html(),
                });
            }
        }
    }

    (document.root_element().html(), frames)
}

fn inline_frame(document: String, outer_html: &str, content: &str) -> String {
    let Some(close) = outer_html.rfind("</iframe>") else {
        return document;
    };
    let filled = format!("{}{}{}", &outer_html[..close], content, &outer_html[close..]);
    document.replacen(outer_html, &filled, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            name: "TestScraper".to_string(),
            version: "1.0".to_string(),
            contact_url: Some("https://example.com/about".to_string()),
        }
    }

    fn test_fetcher(cooldown: Duration) -> Fetcher {
        Fetcher::new(build_http_client(&create_test_config()).unwrap(), cooldown)
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&create_test_config()).is_ok());

        let anonymous = UserAgentConfig {
            contact_url: None,
            ..create_test_config()
        };
        assert!(build_http_client(&anonymous).is_ok());
    }

    #[test]
    fn test_inline_frame() {
        let page = r#"<html><body><iframe src="/f"></iframe></body></html>"#.to_string();
        let inlined = inline_frame(page, r#"<iframe src="/f"></iframe>"#, "<p>hi</p>");
        assert_eq!(
            inlined,
            r#"<html><body><iframe src="/f"><p>hi</p></iframe></body></html>"#
        );
    }

    #[tokio::test]
    async fn test_get_text_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/l/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>lot</html>"))
            .mount(&server)
            .await;

        let mut fetcher = test_fetcher(Duration::ZERO);
        let body = fetcher
            .get_text(&format!("{}/l/1", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html>lot</html>");
    }

    #[tokio::test]
    async fn test_non_success_status_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut fetcher = test_fetcher(Duration::ZERO);
        let err = fetcher
            .get_text(&format!("{}/l/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::NotFound { .. }));

        // A failed request still counts toward the cooldown
        assert!(fetcher.cooldown().last_request().is_some());
    }

    #[tokio::test]
    async fn test_get_bytes_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_bytes(vec![1, 2, 3]))
            .mount(&server)
            .await;

        let mut fetcher = test_fetcher(Duration::ZERO);
        let (status, body) = fetcher
            .get_bytes(&format!("{}/img.jpg", server.uri()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let mut fetcher = test_fetcher(Duration::ZERO);
        let err = fetcher
            .get_json::<serde_json::Value>(&format!("{}/api", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_cooldown_spaces_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let mut fetcher = test_fetcher(Duration::from_secs(2));
        let uri = format!("{}/page", server.uri());

        fetcher.get_text(&uri).await.unwrap();
        let first = fetcher.cooldown().last_request().unwrap();
        fetcher.get_text(&uri).await.unwrap();
        let second = fetcher.cooldown().last_request().unwrap();

        assert!(second.duration_since(first) >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_resolve_frames() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body><iframe src="/frame"></iframe><iframe src="/broken"></iframe></body></html>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/frame"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>framed</p>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut fetcher = test_fetcher(Duration::ZERO);
        let uri = format!("{}/page", server.uri());

        let page = fetcher.get_page(&uri, true).await.unwrap();
        assert!(page.contains(r#"<iframe src="/frame"><p>framed</p></iframe>"#));
        assert!(page.contains(r#"<iframe src="/broken"></iframe>"#));

        let raw = fetcher.get_page(&uri, false).await.unwrap();
        assert!(!raw.contains("framed"));
    }
}
