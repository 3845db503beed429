use crate::modules::error::ConsoleError;
use crate::modules::form::UUID_SEGMENTS;
use crate::modules::types::{ConfigPayload, InstallRequest, PgnDescriptor, UuidResponse};
use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

pub const UUID_PATH: &str = "/admin/uuid";
pub const ADMIN_PATH: &str = "/admin";
pub const INSTALL_PATH: &str = "/apps/install";
pub const MESSAGES_PATH: [&str; 4] = ["signalk", "v1", "api", "messages"];

/// HTTP side of the gateway's admin surface.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base: Url,
    client: Client,
}

impl GatewayClient {
    pub fn new(base: Url, timeout: Option<Duration>) -> Result<Self, ConsoleError> {
        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(ConsoleError::fatal(format!("gateway url {base} cannot carry paths")));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("argo-console/0.1"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ConsoleError::fatal(format!("http client: {e}")))?;

        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(None);
        url
    }

    /// `/signalk/v1/api/messages/{key}` with `key` encoded as one path segment.
    ///
    /// Dot segments are normalized away by every URL parser, even when
    /// percent-encoded, so `.`, `..` and the empty key have no address.
    pub fn message_url(&self, key: &str) -> Result<Url, ConsoleError> {
        if matches!(key, "" | "." | "..") {
            return Err(ConsoleError::fatal(format!(
                "message key `{key}` cannot be sent as a path segment"
            )));
        }
        let mut url = self.base.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| ConsoleError::fatal(format!("gateway url {} cannot carry paths", self.base)))?
            .clear()
            .extend(MESSAGES_PATH)
            .push(key);
        Ok(url)
    }

    pub async fn generate_uuid(&self) -> Result<Vec<String>, ConsoleError> {
        let url = self.endpoint(UUID_PATH);
        debug!("GET {url}");
        let body: UuidResponse = self.client.get(url).send().await?.error_for_status()?.json().await?;
        if body.uuid.len() != UUID_SEGMENTS {
            return Err(ConsoleError::malformed(format!(
                "identifier has {} segments, expected {UUID_SEGMENTS}",
                body.uuid.len()
            )));
        }
        Ok(body.uuid)
    }

    pub async fn fetch_descriptor(&self, key: &str) -> Result<PgnDescriptor, ConsoleError> {
        let url = self.message_url(key)?;
        debug!("GET {url}");
        let response = self.client.get(url).send().await?.error_for_status()?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Posts the configuration and returns the raw response body.
    pub async fn submit_config(&self, payload: &ConfigPayload) -> Result<String, ConsoleError> {
        let url = self.endpoint(ADMIN_PATH);
        debug!("POST {url}");
        let response = self.client.post(url).json(payload).send().await?;
        let body = checked(response).await?;
        info!("Configuration accepted: {body}");
        Ok(body)
    }

    pub async fn install_app(&self, request: &InstallRequest) -> Result<(), ConsoleError> {
        let url = self.endpoint(INSTALL_PATH);
        debug!("POST {url} {request}");
        let response = self.client.post(url).json(request).send().await?;
        checked(response).await?;
        info!("Install requested: {request}");
        Ok(())
    }
}

async fn checked(response: Response) -> Result<String, ConsoleError> {
    let status = response.status();
    let path = response.url().path().to_string();
    let body = response.text().await?;
    if !status.is_success() {
        debug!("{path} answered {status}: {body}");
        return Err(ConsoleError::UnexpectedStatus {
            status: status.as_u16(),
            path,
        });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> GatewayClient {
        GatewayClient::new(Url::parse(base).unwrap(), None).unwrap()
    }

    #[test]
    fn message_url_encodes_the_key() {
        let c = client("http://boat.local:8080/");
        assert_eq!(
            c.message_url("126992").unwrap().as_str(),
            "http://boat.local:8080/signalk/v1/api/messages/126992"
        );
        assert_eq!(
            c.message_url("a/b?c#d").unwrap().as_str(),
            "http://boat.local:8080/signalk/v1/api/messages/a%2Fb%3Fc%23d"
        );
        assert_eq!(
            c.message_url("x y").unwrap().path(),
            "/signalk/v1/api/messages/x%20y"
        );
        assert_eq!(
            c.message_url("...").unwrap().path(),
            "/signalk/v1/api/messages/..."
        );
    }

    #[test]
    fn dot_and_empty_keys_have_no_message_url() {
        let c = client("http://boat.local/");
        for key in ["", ".", ".."] {
            assert!(
                matches!(c.message_url(key), Err(ConsoleError::Fatal { .. })),
                "key {key:?} must not collapse onto the messages index"
            );
        }
    }

    #[test]
    fn endpoints_ignore_base_path_and_query() {
        let c = client("https://boat.local/console?tab=stats");
        assert_eq!(c.endpoint(ADMIN_PATH).as_str(), "https://boat.local/admin");
        assert_eq!(c.endpoint(UUID_PATH).as_str(), "https://boat.local/admin/uuid");
        assert_eq!(
            c.message_url("1").unwrap().as_str(),
            "https://boat.local/signalk/v1/api/messages/1"
        );
    }

    #[test]
    fn rejects_urls_without_host() {
        assert!(matches!(
            GatewayClient::new(Url::parse("mailto:admin@boat").unwrap(), None),
            Err(ConsoleError::Fatal { .. })
        ));
    }
}
