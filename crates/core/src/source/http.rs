//! HTTP plumbing shared by the site sources.

use reqwest::{Client, Proxy, Response, StatusCode};

use super::{SourceError, SourceOptions};

const USER_AGENT: &str = concat!("torrentdb/", env!("CARGO_PKG_VERSION"));

/// Build an HTTP client honouring the configured proxy.
///
/// A bare `host:port` is treated as a SOCKS5 proxy with remote DNS resolution.
pub(crate) fn build_client(options: &SourceOptions) -> Result<Client, SourceError> {
    let mut builder = Client::builder()
        .timeout(options.timeout)
        .user_agent(USER_AGENT);

    if let Some(url) = proxy_url(&options.proxy_addr) {
        let proxy = Proxy::all(&url).map_err(|e| {
            SourceError::RemoteUnavailable(format!("invalid proxy {}: {}", url, e))
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| SourceError::RemoteUnavailable(format!("failed to build client: {}", e)))
}

fn proxy_url(addr: &str) -> Option<String> {
    let addr = addr.trim();
    if addr.is_empty() {
        None
    } else if addr.contains("://") {
        Some(addr.to_string())
    } else {
        Some(format!("socks5h://{}", addr))
    }
}

/// GET `url`, mapping transport failures and error statuses to source errors.
pub(crate) async fn get(client: &Client, url: &str) -> Result<Response, SourceError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SourceError::RemoteUnavailable(format!("{}: {}", url, e)))?;

    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(SourceError::NotFound(url.to_string())),
        status => Err(SourceError::RemoteUnavailable(format!(
            "{}: HTTP {}",
            url, status
        ))),
    }
}

/// GET `url` and decode the body, falling back to `charset` when the
/// response doesn't declare one.
pub(crate) async fn get_text(
    client: &Client,
    url: &str,
    charset: &str,
) -> Result<String, SourceError> {
    get(client, url)
        .await?
        .text_with_charset(charset)
        .await
        .map_err(|e| SourceError::RemoteUnavailable(format!("{}: {}", url, e)))
}
