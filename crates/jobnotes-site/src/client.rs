use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};

use crate::config::SiteConfig;

/// Browser-like HTTP session, cookies are kept between requests.
pub fn build_client(config: &SiteConfig) -> anyhow::Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-TW,zh;q=0.9,en-US;q=0.8,en;q=0.7"),
    );

    let client = reqwest::ClientBuilder::new()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .cookie_store(true)
        .gzip(true)
        .deflate(true)
        .timeout(config.timeout())
        .build()?;
    Ok(client)
}
