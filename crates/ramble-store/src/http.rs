use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ramble_types::{ContentHash, Endpoint};
use reqwest::multipart;
use reqwest::{Client, Response};
use serde::Deserialize;

use crate::error::{StoreError, StoreResult};
use crate::traits::{ContentStore, PinResponse, StoreConnector};

/// HTTP API client for one storage node (`/api/v0/{add,cat,pin/add}`).
#[derive(Debug, Clone)]
pub struct IpfsHttpStore {
    endpoint: Endpoint,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct AddEntry {
    #[serde(rename = "Hash")]
    hash: String,
}

/// `add` answers with one object, a JSON array, or one object per line.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AddResponse {
    Many(Vec<AddEntry>),
    One(AddEntry),
}

#[derive(Debug, Deserialize)]
struct PinBody {
    #[serde(rename = "Pins", default)]
    pins: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "Message")]
    message: String,
}

fn build_client(timeout: Duration) -> StoreResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| StoreError::InvalidEndpoint(e.to_string()))
}

impl IpfsHttpStore {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> StoreResult<Self> {
        Ok(Self::with_client(endpoint, build_client(timeout)?))
    }

    /// Talk to `endpoint` through an existing client and its connection pool.
    pub fn with_client(endpoint: Endpoint, client: Client) -> Self {
        Self { endpoint, client }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/api/v0/{}",
            self.endpoint.base_url(),
            path.trim_start_matches('/')
        )
    }

    fn unavailable(&self, err: reqwest::Error) -> StoreError {
        StoreError::Unavailable {
            endpoint: self.endpoint.to_string(),
            reason: err.to_string(),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> StoreResult<Response> {
        request.send().await.map_err(|e| self.unavailable(e))
    }

    /// Error text from a non-success response, preferring the API's
    /// `Message` field.
    async fn failure_reason(&self, response: Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiError>(&body) {
            Ok(err) => err.message,
            Err(_) => format!("{status}: {}", body.trim()),
        }
    }
}

/// First hash in an `add` response body.
fn parse_add_response(body: &str) -> StoreResult<ContentHash> {
    let entry = match serde_json::from_str::<AddResponse>(body.trim()) {
        Ok(AddResponse::One(entry)) => Some(entry),
        Ok(AddResponse::Many(entries)) => entries.into_iter().next(),
        Err(_) => body
            .lines()
            .filter(|line| !line.trim().is_empty())
            .find_map(|line| serde_json::from_str::<AddEntry>(line).ok()),
    };
    let entry = entry.ok_or_else(|| StoreError::MalformedResponse(format!("no hash in {body:?}")))?;
    entry
        .hash
        .parse()
        .map_err(|e| StoreError::MalformedResponse(format!("bad hash {:?}: {e}", entry.hash)))
}

#[async_trait]
impl ContentStore for IpfsHttpStore {
    async fn add(&self, data: &[u8]) -> StoreResult<ContentHash> {
        let form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(data.to_vec()).file_name("payload.json"),
        );
        let response = self
            .send(self.client.post(self.url("add")).multipart(form))
            .await?;
        if !response.status().is_success() {
            return Err(StoreError::Rejected(self.failure_reason(response).await));
        }
        let body = response.text().await.map_err(|e| self.unavailable(e))?;
        parse_add_response(&body)
    }

    async fn fetch(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
        let mut response = self
            .send(self.client.post(self.url(&format!("cat?arg={hash}"))))
            .await?;
        if !response.status().is_success() {
            let reason = self.failure_reason(response).await;
            tracing::debug!(endpoint = %self.endpoint, %hash, %reason, "cat failed");
            return Err(StoreError::NotFound(*hash));
        }

        let mut payload = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.unavailable(e))? {
            payload.extend_from_slice(&chunk);
        }
        if payload.is_empty() {
            return Err(StoreError::Empty(*hash));
        }
        Ok(payload)
    }

    async fn pin(&self, hash: &ContentHash) -> StoreResult<PinResponse> {
        let response = self
            .send(self.client.post(self.url(&format!("pin/add?arg={hash}"))))
            .await?;
        if !response.status().is_success() {
            return Err(StoreError::PinRejected {
                hash: *hash,
                reason: self.failure_reason(response).await,
            });
        }
        let body = response.text().await.map_err(|e| self.unavailable(e))?;
        let pins = serde_json::from_str::<PinBody>(&body)
            .map(|parsed| {
                parsed
                    .pins
                    .iter()
                    .filter_map(|p| p.parse().ok())
                    .collect()
            })
            .unwrap_or_default();
        Ok(PinResponse { pins, body })
    }
}

/// Builds an [`IpfsHttpStore`] per endpoint.
///
/// All stores share one client, so connections survive rebinds and
/// connecting is cheap.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: Client,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> StoreResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

impl StoreConnector for HttpConnector {
    fn connect(&self, endpoint: &Endpoint) -> StoreResult<Arc<dyn ContentStore>> {
        Ok(Arc::new(IpfsHttpStore::with_client(
            endpoint.clone(),
            self.client.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_urls() {
        let store =
            IpfsHttpStore::new(Endpoint::http("localhost", 5001), Duration::from_secs(1)).unwrap();
        assert_eq!(store.url("add"), "http://localhost:5001/api/v0/add");
        assert_eq!(store.url("/pin/add?arg=x"), "http://localhost:5001/api/v0/pin/add?arg=x");
    }

    #[test]
    fn add_response_single_object() {
        let hash = ContentHash::digest(b"one");
        let body = format!(r#"{{"Name":"payload.json","Hash":"{hash}","Size":"12"}}"#);
        assert_eq!(parse_add_response(&body).unwrap(), hash);
    }

    #[test]
    fn add_response_array_takes_first() {
        let first = ContentHash::digest(b"first");
        let second = ContentHash::digest(b"second");
        let body = format!(r#"[{{"Hash":"{first}"}},{{"Hash":"{second}"}}]"#);
        assert_eq!(parse_add_response(&body).unwrap(), first);
    }

    #[test]
    fn add_response_line_delimited() {
        let first = ContentHash::digest(b"first");
        let second = ContentHash::digest(b"second");
        let body = format!("{{\"Hash\":\"{first}\"}}\n{{\"Hash\":\"{second}\"}}\n");
        assert_eq!(parse_add_response(&body).unwrap(), first);
    }

    #[test]
    fn add_response_without_hash_is_malformed() {
        assert!(matches!(
            parse_add_response(r#"{"Message":"oops"}"#),
            Err(StoreError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_add_response(r#"{"Hash":"not-a-hash"}"#),
            Err(StoreError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_node_is_unavailable() {
        // Port 9 (discard) on localhost is not an HTTP API.
        let store =
            IpfsHttpStore::new(Endpoint::http("127.0.0.1", 9), Duration::from_millis(500)).unwrap();
        let err = store.fetch(&ContentHash::digest(b"x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn connector_stores_share_one_client() {
        let connector = HttpConnector::new(Duration::from_millis(500)).unwrap();
        let first =
            IpfsHttpStore::with_client(Endpoint::http("127.0.0.1", 9), connector.client.clone());
        assert_eq!(first.url("cat"), "http://127.0.0.1:9/api/v0/cat");

        // Every endpoint gets a working store without building a new client.
        for port in [9, 10, 11] {
            let store = connector.connect(&Endpoint::http("127.0.0.1", port)).unwrap();
            let err = store.fetch(&ContentHash::digest(b"x")).await.unwrap_err();
            let StoreError::Unavailable { endpoint, .. } = err else {
                panic!("expected unavailable, got {err:?}");
            };
            assert!(endpoint.ends_with(&format!(":{port}")));
        }
    }
}
