//! Validated identifier types for rooms, agents and dispatches
//!
//! Every name that reaches the registry goes through one of these newtypes.
//! Construction is parse-don't-validate: `parse()` returns a `Result`, and
//! serde deserialization runs the same checks through `try_from`.
//!
//! # Validation Rules
//!
//! Room and agent names:
//! - Non-empty and not whitespace-only
//! - No leading or trailing whitespace
//! - At most [`MAX_NAME_LENGTH`] bytes
//! - No control characters
//!
//! Dispatch ids are opaque registry values; they only need to be non-empty.
//!
//! # Examples
//!
//! ```rust
//! use dispatcher_core::identifiers::{AgentName, RoomName};
//!
//! let room = RoomName::parse("demo-1").unwrap();
//! let agent: AgentName = "livekit-agent".parse().unwrap();
//! assert_eq!(room.as_str(), "demo-1");
//! assert_eq!(agent.to_string(), "livekit-agent");
//!
//! assert!(RoomName::parse("").is_err());
//! assert!(RoomName::parse("  demo  ").is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length in bytes for room and agent names
pub const MAX_NAME_LENGTH: usize = 256;

/// Error type for identifier validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdValidationError {
    /// The identifier string is empty
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },
    /// The identifier contains only whitespace
    #[error("{kind} cannot be whitespace-only")]
    WhitespaceOnly { kind: &'static str },
    /// The identifier has leading or trailing whitespace
    #[error("{kind} cannot have leading or trailing whitespace")]
    LeadingTrailingWhitespace { kind: &'static str },
    /// The identifier exceeds the maximum length
    #[error("{kind} too long ({length} bytes, max {max})")]
    TooLong {
        kind: &'static str,
        length: usize,
        max: usize,
    },
    /// The identifier contains control characters
    #[error("{kind} cannot contain control characters")]
    ControlCharacters { kind: &'static str },
}

impl IdValidationError {
    /// Which identifier kind failed validation ("room name", "agent name", ...)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty { kind }
            | Self::WhitespaceOnly { kind }
            | Self::LeadingTrailingWhitespace { kind }
            | Self::TooLong { kind, .. }
            | Self::ControlCharacters { kind } => kind,
        }
    }

    /// Whether the value was simply absent (empty or blank)
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Empty { .. } | Self::WhitespaceOnly { .. })
    }
}

/// Validator shared by [`RoomName`] and [`AgentName`]
pub struct NameValidator;

impl NameValidator {
    /// Validate a room or agent name
    ///
    /// ```rust
    /// use dispatcher_core::identifiers::NameValidator;
    ///
    /// assert!(NameValidator::validate("room name", "demo-1").is_ok());
    /// assert!(NameValidator::validate("room name", "").is_err());
    /// assert!(NameValidator::validate("room name", "bad\nname").is_err());
    /// ```
    pub fn validate<'a>(kind: &'static str, value: &'a str) -> Result<&'a str, IdValidationError> {
        if value.is_empty() {
            return Err(IdValidationError::Empty { kind });
        }

        if value.trim().is_empty() {
            return Err(IdValidationError::WhitespaceOnly { kind });
        }

        if value != value.trim() {
            return Err(IdValidationError::LeadingTrailingWhitespace { kind });
        }

        if value.len() > MAX_NAME_LENGTH {
            return Err(IdValidationError::TooLong {
                kind,
                length: value.len(),
                max: MAX_NAME_LENGTH,
            });
        }

        if value.chars().any(char::is_control) {
            return Err(IdValidationError::ControlCharacters { kind });
        }

        Ok(value)
    }
}

/// Shared trait impls for the string newtypes below
macro_rules! string_identifier {
    ($name:ident) => {
        impl $name {
            /// Get the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Create the identifier without validation (for tests and trusted registry data)
            #[doc(hidden)]
            pub fn new_unchecked(value: impl Into<String>) -> Self {
                Self(value.into())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdValidationError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

/// Name of a conference room
///
/// Rooms are not stored entities here; the name is only the key used to
/// query the dispatch registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomName(String);

impl RoomName {
    /// Parse and validate a room name
    pub fn parse(name: impl AsRef<str>) -> Result<Self, IdValidationError> {
        NameValidator::validate("room name", name.as_ref()).map(|s| Self(s.to_string()))
    }
}

string_identifier!(RoomName);

/// Name identifying which agent implementation should join a room
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentName(String);

impl AgentName {
    /// Agent name used when nothing else is configured
    pub const DEFAULT: &'static str = "livekit-agent";

    /// Parse and validate an agent name
    pub fn parse(name: impl AsRef<str>) -> Result<Self, IdValidationError> {
        NameValidator::validate("agent name", name.as_ref()).map(|s| Self(s.to_string()))
    }
}

impl Default for AgentName {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

string_identifier!(AgentName);

/// Registry-assigned dispatch identifier
///
/// Opaque: the registry decides its format, so only emptiness is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DispatchId(String);

impl DispatchId {
    /// Parse a dispatch id
    pub fn parse(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
        let id = id.as_ref();
        if id.is_empty() {
            return Err(IdValidationError::Empty { kind: "dispatch id" });
        }
        Ok(Self(id.to_string()))
    }
}

string_identifier!(DispatchId);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_room_names() {
        assert!(RoomName::parse("demo-1").is_ok());
        assert!(RoomName::parse("team standup").is_ok());
        assert!(RoomName::parse("salle-réunion").is_ok());
    }

    #[test]
    fn test_invalid_room_names() {
        assert_eq!(
            RoomName::parse(""),
            Err(IdValidationError::Empty { kind: "room name" })
        );
        assert_eq!(
            RoomName::parse("   "),
            Err(IdValidationError::WhitespaceOnly { kind: "room name" })
        );
        assert_eq!(
            RoomName::parse(" demo"),
            Err(IdValidationError::LeadingTrailingWhitespace { kind: "room name" })
        );
        assert_eq!(
            RoomName::parse("demo\u{0007}"),
            Err(IdValidationError::ControlCharacters { kind: "room name" })
        );
        assert!(matches!(
            RoomName::parse("a".repeat(MAX_NAME_LENGTH + 1)),
            Err(IdValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_error_reports_kind() {
        let err = AgentName::parse("").unwrap_err();
        assert_eq!(err.kind(), "agent name");
        assert!(err.is_missing());
        assert_eq!(err.to_string(), "agent name cannot be empty");

        let err = AgentName::parse(" x").unwrap_err();
        assert!(!err.is_missing());
    }

    #[test]
    fn test_default_agent_name() {
        assert_eq!(AgentName::default().as_str(), "livekit-agent");
    }

    #[test]
    fn test_dispatch_id_only_rejects_empty() {
        assert!(DispatchId::parse("AD_abc123").is_ok());
        assert!(DispatchId::parse(" odd id ").is_ok());
        assert!(DispatchId::parse("").is_err());
    }

    #[test]
    fn test_serde_runs_validation() {
        let room: RoomName = serde_json::from_str(r#""demo-1""#).unwrap();
        assert_eq!(room, "demo-1");
        assert!(serde_json::from_str::<RoomName>(r#""""#).is_err());
        assert_eq!(serde_json::to_string(&room).unwrap(), r#""demo-1""#);
    }

    proptest! {
        #[test]
        fn prop_trimmed_printable_names_are_accepted(name in "[a-zA-Z0-9][a-zA-Z0-9 _.-]{0,60}[a-zA-Z0-9]") {
            let room = RoomName::parse(&name).unwrap();
            prop_assert_eq!(room.as_str(), name.as_str());
        }

        #[test]
        fn prop_padded_names_are_rejected(name in "[a-z]{1,20}") {
            let padded = format!(" {name}");
            prop_assert!(AgentName::parse(padded).is_err());
        }
    }
}
