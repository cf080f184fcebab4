// src/fetch.rs
// =============================================================================
// This module downloads pages for the crawler and the page scanner.
//
// Key functionality:
// - PageFetcher trait: the one seam between our logic and the network
// - HttpFetcher: the real implementation built on reqwest
// - Optional proxy routing: non-local targets can be fetched through
//   `GET {endpoint}/api/proxy?url=<encoded target>`
// - Every request has a timeout, so a hung server cannot stall a crawl
//
// Rust concepts:
// - Traits: PageFetcher lets tests swap the network for an in-memory map
// - async-trait: async methods inside a trait
// - thiserror: a typed error enum with readable messages
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use thiserror::Error;
use url::{Host, Url};

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User agent sent with every request unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("dga-auditor/", env!("CARGO_PKG_VERSION"));

// Everything that can go wrong while fetching a single page
//
// These are all *recoverable*: the crawler skips the page and the scanner
// records it with score 0. None of them aborts a walk.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request timed out
    #[error("request timed out")]
    Timeout,
    /// Server answered with a non-2xx status
    #[error("HTTP {0}")]
    Status(u16),
    /// Redirect loop or too many redirects
    #[error("too many redirects")]
    TooManyRedirects,
    /// DNS or TCP level failure
    #[error("connection failed: {0}")]
    Connect(String),
    /// Anything else reqwest reports (bad body encoding, TLS, ...)
    #[error("request failed: {0}")]
    Request(String),
    /// The proxy endpoint could not be combined with the target URL
    #[error("invalid proxy endpoint: {0}")]
    ProxyUrl(#[from] url::ParseError),
    /// The HTTP client itself could not be built
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

// A downloaded page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested (not the proxy URL)
    pub url: Url,
    /// Where the page was actually served from, after redirects
    pub final_url: Url,
    /// HTTP status code (always 2xx, other codes become FetchError::Status)
    pub status: u16,
    /// Content-Type header, if the server sent one
    pub content_type: Option<String>,
    /// Response body decoded as text
    pub body: String,
}

impl FetchedPage {
    // Servers that omit Content-Type get the benefit of the doubt
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map_or(true, |ct| ct.to_ascii_lowercase().contains("html"))
    }
}

/// Anything that can turn a URL into page markup.
///
/// The crawler and the aggregator only ever talk to this trait, which keeps
/// them free of reqwest and lets the tests run without a network.
#[async_trait]
pub trait PageFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

// Settings for the HTTP fetcher, filled from the command line
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Base URL of a proxy exposing `/api/proxy?url=...`
    pub proxy_endpoint: Option<Url>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy_endpoint: None,
        }
    }
}

// The real fetcher
//
// We build one reqwest Client and reuse it for every page (connection pooling).
pub struct HttpFetcher {
    client: Client,
    proxy_endpoint: Option<Url>,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(5))  // Follow up to 5 redirects
            .user_agent(config.user_agent)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            proxy_endpoint: config.proxy_endpoint,
        })
    }

    // Works out which URL actually goes on the wire for a target
    //
    // Local targets are always fetched directly; everything else goes
    // through the proxy when one is configured.
    fn request_url(&self, target: &Url) -> Result<Url, FetchError> {
        match &self.proxy_endpoint {
            Some(endpoint) if !is_local_host(target) => proxy_url(endpoint, target),
            _ => Ok(target.clone()),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let request_url = self.request_url(url)?;
        let proxied = request_url != *url;
        tracing::debug!(url = %url, via = %request_url, "fetching page");

        let response = self
            .client
            .get(request_url)
            .send()
            .await
            .map_err(categorize_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Behind the proxy, response.url() is the proxy's own address
        let final_url = if proxied {
            url.clone()
        } else {
            response.url().clone()
        };

        let body = response.text().await.map_err(categorize_error)?;

        Ok(FetchedPage {
            url: url.clone(),
            final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

// Builds `{endpoint}/api/proxy?url=<encoded target>`
pub fn proxy_url(endpoint: &Url, target: &Url) -> Result<Url, FetchError> {
    let mut url = endpoint.join("/api/proxy")?;
    url.query_pairs_mut()
        .clear()
        .append_pair("url", target.as_str());
    Ok(url)
}

// True for localhost, 127.0.0.0/8 and ::1
pub fn is_local_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback() || ip == Ipv4Addr::UNSPECIFIED,
        Some(Host::Ipv6(ip)) => ip.is_loopback() || ip == Ipv6Addr::UNSPECIFIED,
        None => false,
    }
}

// Maps reqwest's error into our own categories
fn categorize_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_redirect() {
        FetchError::TooManyRedirects
    } else if error.is_connect() {
        FetchError::Connect(error.to_string())
    } else {
        FetchError::Request(error.to_string())
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a trait for fetching?
//    - The crawler only needs "give me the HTML for this URL"
//    - Hiding reqwest behind a trait lets tests use a HashMap instead
//    - The compiler checks both implementations keep the same contract
//
// 2. What does #[async_trait] do?
//    - Traits can't easily hold async fns on stable Rust for dyn use
//    - The macro rewrites them to return boxed futures
//
// 3. What is #[from] in thiserror?
//    - It generates `impl From<url::ParseError> for FetchError`
//    - So the ? operator converts the error automatically
// -----------------------------------------------------------------------------

#[cfg(test)]
pub mod testing {
    // In-memory fetcher shared by the crawler and report tests

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct StaticFetcher {
        pages: HashMap<String, (String, String)>,
        redirects: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(self, url: &str, body: &str) -> Self {
            self.with_typed_page(url, "text/html; charset=utf-8", body)
        }

        pub fn with_typed_page(mut self, url: &str, content_type: &str, body: &str) -> Self {
            let key = Url::parse(url).expect("fixture url").to_string();
            self.pages.insert(key, (content_type.to_string(), body.to_string()));
            self
        }

        /// Serves `to` whenever `from` is requested, like a followed redirect.
        pub fn with_redirect(mut self, from: &str, to: &str) -> Self {
            let from = Url::parse(from).expect("fixture url").to_string();
            let to = Url::parse(to).expect("fixture url").to_string();
            self.redirects.insert(from, to);
            self
        }

        /// URLs fetched so far, in request order.
        pub fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            let served = match self.redirects.get(url.as_str()) {
                Some(target) => Url::parse(target).expect("fixture url"),
                None => url.clone(),
            };
            match self.pages.get(served.as_str()) {
                Some((content_type, body)) => Ok(FetchedPage {
                    url: url.clone(),
                    final_url: served,
                    status: 200,
                    content_type: Some(content_type.clone()),
                    body: body.clone(),
                }),
                None => Err(FetchError::Status(404)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // Serves exactly one HTTP response on a random local port
    //
    // `respond` receives the request line and returns (status line, body).
    async fn serve_once<F>(respond: F) -> SocketAddr
    where
        F: FnOnce(&str) -> (&'static str, String) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.expect("read request");
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let request_line = request.lines().next().unwrap_or_default().to_string();
            let (status, body) = respond(&request_line);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write response");
            let _ = socket.shutdown().await;
        });
        addr
    }

    fn fetcher(config: FetchConfig) -> HttpFetcher {
        HttpFetcher::new(config).expect("client")
    }

    #[tokio::test]
    async fn test_fetch_success_returns_body_and_content_type() {
        let addr = serve_once(|_| ("200 OK", "<html lang=\"ar\"></html>".to_string())).await;
        let url = Url::parse(&format!("http://{addr}/page")).unwrap();

        let page = fetcher(FetchConfig::default()).fetch(&url).await.unwrap();

        assert_eq!(page.status, 200);
        assert_eq!(page.body, "<html lang=\"ar\"></html>");
        assert_eq!(page.content_type.as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(page.url, url);
        assert_eq!(page.final_url, url);
    }

    #[tokio::test]
    async fn test_final_url_follows_redirect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for _ in 0..2 {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap();
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let response = if request.starts_with("GET /start ") {
                    format!("HTTP/1.1 301 Moved Permanently\r\nLocation: http://{addr}/final\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                } else {
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok".to_string()
                };
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });
        let url = Url::parse(&format!("http://{addr}/start")).unwrap();

        let page = fetcher(FetchConfig::default()).fetch(&url).await.unwrap();

        assert_eq!(page.body, "ok");
        assert_eq!(page.url, url);
        assert_eq!(page.final_url.path(), "/final");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_error() {
        let addr = serve_once(|_| ("404 Not Found", "missing".to_string())).await;
        let url = Url::parse(&format!("http://{addr}/gone")).unwrap();

        let err = fetcher(FetchConfig::default()).fetch(&url).await.unwrap_err();

        assert!(matches!(err, FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_fetch_times_out_on_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let url = Url::parse(&format!("http://{addr}/slow")).unwrap();
        let config = FetchConfig {
            timeout: Duration::from_millis(200),
            ..FetchConfig::default()
        };

        let err = fetcher(config).fetch(&url).await.unwrap_err();

        assert!(matches!(err, FetchError::Timeout));
    }

    #[tokio::test]
    async fn test_remote_target_goes_through_proxy() {
        let addr = serve_once(|request_line| ("200 OK", request_line.to_string())).await;
        let config = FetchConfig {
            proxy_endpoint: Some(Url::parse(&format!("http://{addr}")).unwrap()),
            ..FetchConfig::default()
        };
        let target = Url::parse("https://portal.example.gov.sa/services").unwrap();

        let page = fetcher(config).fetch(&target).await.unwrap();

        assert!(page
            .body
            .starts_with("GET /api/proxy?url=https%3A%2F%2Fportal.example.gov.sa%2Fservices "));
        assert_eq!(page.url, target);
        assert_eq!(page.final_url, target);
    }

    #[test]
    fn test_local_targets_bypass_proxy() {
        let http = fetcher(FetchConfig {
            proxy_endpoint: Some(Url::parse("https://proxy.example").unwrap()),
            ..FetchConfig::default()
        });
        let local = Url::parse("http://localhost:3000/").unwrap();
        let remote = Url::parse("https://example.com/a?b=c").unwrap();

        assert_eq!(http.request_url(&local).unwrap(), local);
        assert_eq!(
            http.request_url(&remote).unwrap().as_str(),
            "https://proxy.example/api/proxy?url=https%3A%2F%2Fexample.com%2Fa%3Fb%3Dc"
        );
    }

    #[test]
    fn test_is_html() {
        let page = |content_type: Option<&str>| FetchedPage {
            url: Url::parse("https://a.example/").unwrap(),
            final_url: Url::parse("https://a.example/").unwrap(),
            status: 200,
            content_type: content_type.map(str::to_string),
            body: String::new(),
        };
        assert!(page(Some("text/html; charset=utf-8")).is_html());
        assert!(page(Some("application/XHTML+xml")).is_html());
        assert!(page(None).is_html());
        assert!(!page(Some("application/pdf")).is_html());
    }

    #[test]
    fn test_is_local_host() {
        assert!(is_local_host(&Url::parse("http://localhost/").unwrap()));
        assert!(is_local_host(&Url::parse("http://127.0.0.1:8080/").unwrap()));
        assert!(is_local_host(&Url::parse("http://[::1]/").unwrap()));
        assert!(!is_local_host(&Url::parse("https://my.gov.sa/").unwrap()));
    }
}
