//! LiveKit agent dispatch client
//!
//! Talks to `livekit.AgentDispatchService` over Twirp: every call is a JSON
//! `POST {base}/twirp/livekit.AgentDispatchService/{Method}` signed with a
//! short-lived room admin token.
//!
//! # Connection Behavior
//!
//! | Setting | Default | Notes |
//! |---------|---------|-------|
//! | Request timeout | 30 seconds | Configurable via [`LiveKitConfig::with_timeout`] |
//! | Token lifetime | 10 minutes | A fresh token is signed per call |
//!
//! `ws://` and `wss://` server URLs are accepted and rewritten to `http://`
//! and `https://`. The client does **not** retry; a failed call is returned
//! as-is to the caller.
//!
//! # Error Handling
//!
//! | Condition | Error |
//! |-----------|-------|
//! | Request timed out | [`RegistryError::Timeout`] |
//! | Connection refused / DNS failure | [`RegistryError::Connection`] |
//! | 401, 403 | [`RegistryError::Authentication`] |
//! | 404 on `DeleteDispatch` | [`RegistryError::DispatchNotFound`] |
//! | Any other non-2xx | [`RegistryError::Rejected`] |
//! | Undecodable body | [`RegistryError::Protocol`] |
//!
//! # Example
//!
//! ```rust,ignore
//! use dispatcher_livekit::{LiveKitConfig, LiveKitDispatchClient};
//!
//! let config = LiveKitConfig::new("wss://my-project.livekit.cloud", "APIkey", "secret");
//! let client = LiveKitDispatchClient::new(config)?;
//! let reconciler = Reconciler::new(Arc::new(client));
//! ```

use std::time::Duration;

use async_trait::async_trait;
use dispatcher_core::{
    AgentName, Dispatch, DispatchId, DispatchMetadata, DispatchRegistry, RegistryError,
    RegistryResult, RoomName, SecretString,
};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use crate::error::{LiveKitError, LiveKitResult};
use crate::token::TokenSigner;
use crate::wire::{
    CreateDispatchRequest, DeleteDispatchRequest, ListDispatchRequest, ListDispatchResponse,
    TwirpError, WireDispatch,
};

/// Default timeout for registry calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const SERVICE: &str = "livekit.AgentDispatchService";

/// Connection settings for a LiveKit server
#[derive(Debug, Clone)]
pub struct LiveKitConfig {
    /// Server URL, `http(s)://` or `ws(s)://`
    pub url: String,
    pub api_key: String,
    pub api_secret: SecretString,
    pub timeout: Duration,
}

impl LiveKitConfig {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<SecretString>,
    ) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Normalize a server URL to an HTTP base without a trailing slash
pub fn http_base_url(raw: &str) -> LiveKitResult<Url> {
    let mut url = Url::parse(raw.trim())?;
    let scheme = match url.scheme() {
        "http" | "https" => None,
        "ws" => Some("http"),
        "wss" => Some("https"),
        other => {
            return Err(LiveKitError::UnsupportedScheme {
                scheme: other.to_string(),
            });
        }
    };
    if let Some(scheme) = scheme {
        url.set_scheme(scheme)
            .map_err(|()| LiveKitError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
            })?;
    }

    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// [`DispatchRegistry`] backed by a LiveKit server
#[derive(Clone)]
pub struct LiveKitDispatchClient {
    base_url: Url,
    http: Client,
    signer: TokenSigner,
}

impl std::fmt::Debug for LiveKitDispatchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveKitDispatchClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.signer.api_key())
            .finish()
    }
}

impl LiveKitDispatchClient {
    /// Create a client from connection settings
    pub fn new(config: LiveKitConfig) -> LiveKitResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("dispatcher-livekit/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LiveKitError::HttpClient(e.to_string()))?;

        Self::with_http_client(config, http)
    }

    /// Create a client with a custom HTTP client
    ///
    /// The configured timeout is ignored; `http` carries its own.
    pub fn with_http_client(config: LiveKitConfig, http: Client) -> LiveKitResult<Self> {
        let base_url = http_base_url(&config.url)?;
        let signer = TokenSigner::new(config.api_key, &config.api_secret)?;

        Ok(Self {
            base_url,
            http,
            signer,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/twirp/{SERVICE}/{method}",
            self.base_url.as_str().trim_end_matches('/')
        )
    }

    /// Send one Twirp call and return the successful response
    async fn call<B: Serialize>(
        &self,
        method: &str,
        room: &RoomName,
        body: &B,
    ) -> RegistryResult<reqwest::Response> {
        let url = self.endpoint(method);
        let token = self
            .signer
            .room_admin_token(room)
            .map_err(|e| RegistryError::authentication(e.to_string()))?;

        debug!(url = %url, room = %room, "Calling dispatch service");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(method, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_response(status, response).await);
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> RegistryResult<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(method, &e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            RegistryError::protocol(format!("Failed to parse {method} response: {e}"))
        })
    }
}

fn transport_error(method: &str, err: &reqwest::Error) -> RegistryError {
    if err.is_timeout() {
        RegistryError::timeout(format!("{method}: {err}"))
    } else if err.is_connect() {
        RegistryError::connection(format!("{method}: {err}"))
    } else if err.is_decode() {
        RegistryError::protocol(format!("{method}: {err}"))
    } else {
        RegistryError::connection(format!("{method} failed: {err}"))
    }
}

async fn handle_error_response(status: StatusCode, response: reqwest::Response) -> RegistryError {
    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<TwirpError>(&text) {
        Ok(twirp) if !twirp.msg.is_empty() => twirp.msg,
        Ok(twirp) if !twirp.code.is_empty() => twirp.code,
        _ if text.is_empty() => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
        _ => text,
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RegistryError::authentication(message),
        _ => RegistryError::rejected(status.as_u16(), message),
    }
}

#[async_trait]
impl DispatchRegistry for LiveKitDispatchClient {
    async fn list(&self, room: &RoomName) -> RegistryResult<Vec<Dispatch>> {
        let response = self
            .call(
                "ListDispatch",
                room,
                &ListDispatchRequest {
                    room: room.as_str(),
                },
            )
            .await?;
        let body: ListDispatchResponse = Self::decode("ListDispatch", response).await?;

        let dispatches = body
            .agent_dispatches
            .into_iter()
            .map(Dispatch::try_from)
            .collect::<RegistryResult<Vec<_>>>()?;

        debug!(room = %room, count = dispatches.len(), "Listed dispatches");
        Ok(dispatches)
    }

    async fn create(
        &self,
        room: &RoomName,
        agent_name: &AgentName,
        metadata: &DispatchMetadata,
    ) -> RegistryResult<Dispatch> {
        let response = self
            .call(
                "CreateDispatch",
                room,
                &CreateDispatchRequest {
                    room: room.as_str(),
                    agent_name: agent_name.as_str(),
                    metadata: metadata.as_str(),
                },
            )
            .await?;
        let mut wire: WireDispatch = Self::decode("CreateDispatch", response).await?;

        // Some servers echo only the id.
        if wire.room.is_empty() {
            wire.room = room.to_string();
        }
        if wire.agent_name.is_empty() {
            wire.agent_name = agent_name.to_string();
        }
        if wire.metadata.is_empty() {
            wire.metadata = metadata.as_str().to_string();
        }
        let dispatch = Dispatch::try_from(wire)?;

        info!(
            dispatch_id = %dispatch.id,
            room = %room,
            agent_name = %agent_name,
            "Created dispatch"
        );
        Ok(dispatch)
    }

    async fn delete(&self, dispatch_id: &DispatchId, room: &RoomName) -> RegistryResult<()> {
        let result = self
            .call(
                "DeleteDispatch",
                room,
                &DeleteDispatchRequest {
                    dispatch_id: dispatch_id.as_str(),
                    room: room.as_str(),
                },
            )
            .await;

        match result {
            Ok(_) => {
                info!(dispatch_id = %dispatch_id, room = %room, "Deleted dispatch");
                Ok(())
            }
            Err(RegistryError::Rejected { status: 404, .. }) => {
                Err(RegistryError::dispatch_not_found(dispatch_id, room))
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_schemes_are_rewritten() {
        assert_eq!(
            http_base_url("wss://demo.livekit.cloud").unwrap().as_str(),
            "https://demo.livekit.cloud/"
        );
        assert_eq!(
            http_base_url("ws://localhost:7880/").unwrap().as_str(),
            "http://localhost:7880/"
        );
        assert_eq!(
            http_base_url("https://demo.livekit.cloud").unwrap().scheme(),
            "https"
        );
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        let err = http_base_url("ftp://demo.livekit.cloud").unwrap_err();
        assert!(matches!(err, LiveKitError::UnsupportedScheme { .. }));
        assert!(matches!(
            http_base_url("not a url").unwrap_err(),
            LiveKitError::InvalidUrl(_)
        ));
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        let client = LiveKitDispatchClient::new(LiveKitConfig::new(
            "https://proxy.example.com/livekit/",
            "key",
            "secret",
        ))
        .unwrap();
        assert_eq!(
            client.endpoint("ListDispatch"),
            "https://proxy.example.com/livekit/twirp/livekit.AgentDispatchService/ListDispatch"
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = LiveKitConfig::new("https://x.example.com", "APIkey", "topsecret");
        assert!(!format!("{config:?}").contains("topsecret"));

        let client = LiveKitDispatchClient::new(config).unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("APIkey"));
        assert!(!debug.contains("topsecret"));
    }

    #[test]
    fn test_empty_credentials_fail_construction() {
        let err =
            LiveKitDispatchClient::new(LiveKitConfig::new("https://x.example.com", "", "s"))
                .unwrap_err();
        assert!(matches!(err, LiveKitError::MissingCredential { .. }));
    }
}
