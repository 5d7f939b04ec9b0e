//! Server access tokens for the registry API

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use crate::error::{LiveKitError, LiveKitResult};
use dispatcher_core::{RoomName, SecretString};

/// Lifetime of a signed token in minutes
pub const TOKEN_TTL_MINUTES: i64 = 10;

/// Video grant carried by server-side tokens
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub room_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// API key
    pub iss: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub nbf: i64,
    pub exp: i64,
    pub jti: String,
    pub video: VideoGrant,
}

/// Signs short-lived HS256 tokens with the API key and secret
#[derive(Clone)]
pub struct TokenSigner {
    api_key: String,
    encoding_key: EncodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("api_key", &self.api_key)
            .field("ttl_minutes", &self.ttl.num_minutes())
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(api_key: impl Into<String>, api_secret: &SecretString) -> LiveKitResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LiveKitError::MissingCredential { name: "api_key" });
        }
        if api_secret.is_empty() {
            return Err(LiveKitError::MissingCredential { name: "api_secret" });
        }

        Ok(Self {
            api_key,
            encoding_key: EncodingKey::from_secret(api_secret.expose_secret().as_bytes()),
            ttl: Duration::minutes(TOKEN_TTL_MINUTES),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Claims for an admin token scoped to `room`
    pub fn room_admin_claims(&self, room: &RoomName) -> AccessClaims {
        let now = Utc::now();
        AccessClaims {
            iss: self.api_key.clone(),
            sub: None,
            nbf: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            video: VideoGrant {
                room_admin: true,
                room: Some(room.to_string()),
            },
        }
    }

    /// Sign an admin token scoped to `room`
    pub fn room_admin_token(&self, room: &RoomName) -> LiveKitResult<String> {
        let claims = self.room_admin_claims(room);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| LiveKitError::Token(format!("Failed to sign access token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    fn signer() -> TokenSigner {
        TokenSigner::new("APIkey123", &SecretString::from("a-long-enough-test-secret")).unwrap()
    }

    #[test]
    fn test_token_round_trips_with_room_admin_grant() {
        let room = RoomName::parse("demo-1").unwrap();
        let token = signer().room_admin_token(&room).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&["APIkey123"]);
        validation.validate_nbf = true;
        let data = decode::<AccessClaims>(
            &token,
            &DecodingKey::from_secret(b"a-long-enough-test-secret"),
            &validation,
        )
        .unwrap();

        assert_eq!(data.claims.iss, "APIkey123");
        assert!(data.claims.video.room_admin);
        assert_eq!(data.claims.video.room.as_deref(), Some("demo-1"));
        assert_eq!(data.claims.exp - data.claims.nbf, TOKEN_TTL_MINUTES * 60);
    }

    #[test]
    fn test_grant_serializes_camel_case() {
        let claims = signer().room_admin_claims(&RoomName::parse("r").unwrap());
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["video"]["roomAdmin"], true);
        assert_eq!(json["video"]["room"], "r");
        assert!(json.get("sub").is_none());
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let err = TokenSigner::new("", &SecretString::from("secret")).unwrap_err();
        assert!(matches!(err, LiveKitError::MissingCredential { name: "api_key" }));

        let err = TokenSigner::new("key", &SecretString::from("")).unwrap_err();
        assert!(matches!(err, LiveKitError::MissingCredential { name: "api_secret" }));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let debug = format!("{:?}", signer());
        assert!(debug.contains("APIkey123"));
        assert!(!debug.contains("a-long-enough-test-secret"));
    }
}
