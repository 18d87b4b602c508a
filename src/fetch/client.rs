use crate::fetch::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::header::CONTENT_TYPE;
use sitesnap_config::FetchSettings;
use url::Url;

/// What came back for one asset request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}
impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Downloads binary assets.
///
/// Answering with a non-2xx status is not an error at this level; the fetcher
/// decides what counts as a failed asset.
#[async_trait]
pub trait AssetClient: Send + Sync {
    async fn get(&self, url: &Url) -> Result<Response>;
}

/// [`AssetClient`] over `reqwest`, with the configured timeout and user agent.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}
impl HttpClient {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout())
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetClient for HttpClient {
    async fn get(&self, url: &Url) -> Result<Response> {
        let response = self.client.get(url.clone()).send().await.or_raise(|| ErrorKind::Request)?;
        let status = response.status();
        let content_type =
            response.headers().get(CONTENT_TYPE).and_then(|value| value.to_str().ok()).map(str::to_string);
        // Nobody reads the body of a failed download.
        if !status.is_success() {
            return Ok(Response { status: status.as_u16(), content_type, body: Vec::new() });
        }
        let body = response.bytes().await.or_raise(|| ErrorKind::Request)?;
        Ok(Response { status: status.as_u16(), content_type, body: body.to_vec() })
    }
}
