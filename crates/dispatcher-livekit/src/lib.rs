//! # Dispatcher LiveKit
//!
//! [`DispatchRegistry`](dispatcher_core::DispatchRegistry) implementation for
//! a LiveKit server's agent dispatch API.
//!
//! - **[`LiveKitDispatchClient`]**: Twirp client for list/create/delete
//! - **[`LiveKitConfig`]**: server URL, API key and secret, timeout
//! - **[`TokenSigner`]**: HS256 room admin tokens

pub mod client;
pub mod error;
pub mod token;
mod wire;

pub use client::{DEFAULT_TIMEOUT, LiveKitConfig, LiveKitDispatchClient, http_base_url};
pub use error::{LiveKitError, LiveKitResult};
pub use token::{AccessClaims, TOKEN_TTL_MINUTES, TokenSigner, VideoGrant};
