//! Secret values that stay out of logs
//!
//! Registry credentials travel through configuration structs that are
//! `Debug`-printed and traced. [`SecretString`] keeps the API secret out of
//! that output: `Debug`, `Display` and `Serialize` all print `[REDACTED]`, and
//! the buffer is zeroed on drop.
//!
//! ```
//! use dispatcher_core::secret::SecretString;
//!
//! let secret = SecretString::from("api-secret-value");
//! assert_eq!(format!("{secret:?}"), "[REDACTED]");
//! assert_eq!(secret.expose_secret(), "api-secret-value");
//! ```

use serde::{Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A string secret that cannot be accidentally printed or serialized
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString {
    inner: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// The only way to read the value. Never log what this returns.
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self { inner: value }
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_and_display_redact() {
        let secret = SecretString::from("livekit-secret");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(secret.to_string(), "[REDACTED]");
    }

    #[test]
    fn test_secret_serialize_redacts() {
        let secret = SecretString::from("livekit-secret".to_string());
        let json = serde_json::to_string(&secret).unwrap();
        assert_eq!(json, "\"[REDACTED]\"");
    }

    #[test]
    fn test_secret_in_struct() {
        #[derive(Debug)]
        struct Credentials {
            api_key: String,
            api_secret: SecretString,
        }

        let creds = Credentials {
            api_key: "APIkey".to_string(),
            api_secret: SecretString::from("sk_live_abc123"),
        };

        let debug = format!("{creds:?}");
        assert!(debug.contains("APIkey"));
        assert!(!debug.contains("sk_live"));
        assert_eq!(creds.api_secret.expose_secret(), "sk_live_abc123");
    }
}
