//! # Dispatcher HTTP
//!
//! axum trigger endpoints over the dispatch [`Reconciler`](dispatcher_core::Reconciler).
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | `POST` | `/api/livekit/request-agent` | Ensure the agent is dispatched to a room |
//! | `DELETE` | `/api/livekit/stop-agent` | Remove the agent's dispatch |
//! | `GET` | `/api/livekit/dispatches` | List dispatches, poll worker readiness |
//! | `GET` | `/health` | Liveness and registry configuration |
//! | `GET` | `/api-docs/openapi.json` | OpenAPI document |
//!
//! ```rust,ignore
//! let config = DispatcherConfigBuilder::from_env()?.build()?;
//! let state = AppState::from_config(&config)?;
//! let app = router(state, &config);
//! ```

pub mod config;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod router;
pub mod shutdown;
pub mod state;

pub use config::{ConfigError, DispatcherConfig, DispatcherConfigBuilder};
pub use error::{
    ErrorCode, ErrorResponse, RequestId, RequestIdExtension, TriggerError, TriggerErrorKind,
    TriggerResult, request_id_middleware,
};
pub use router::router;
pub use shutdown::shutdown_signal;
pub use state::AppState;
