//! Shared handler state

use std::sync::Arc;

use dispatcher_core::{AgentName, DispatchMetadata, DispatchRegistry, Reconciler};
use dispatcher_livekit::{LiveKitDispatchClient, LiveKitResult};
use tracing::{info, warn};

use crate::config::DispatcherConfig;
use crate::error::{RequestId, TriggerError};

/// State handed to every trigger handler
///
/// Holds no per-room data; the registry is re-queried on every request.
#[derive(Clone, Debug)]
pub struct AppState {
    reconciler: Option<Reconciler>,
    missing_settings: Arc<[&'static str]>,
    registry_backend: &'static str,
    default_agent_name: AgentName,
    default_metadata: DispatchMetadata,
}

impl AppState {
    /// State backed by `registry`
    pub fn new(registry: Arc<dyn DispatchRegistry>, backend: &'static str) -> Self {
        Self {
            reconciler: Some(Reconciler::new(registry)),
            missing_settings: Arc::from(Vec::new()),
            registry_backend: backend,
            default_agent_name: AgentName::default(),
            default_metadata: DispatchMetadata::default(),
        }
    }

    /// State without a registry; every trigger reports a configuration error
    pub fn unconfigured(missing: Vec<&'static str>) -> Self {
        Self {
            reconciler: None,
            missing_settings: Arc::from(missing),
            registry_backend: "none",
            default_agent_name: AgentName::default(),
            default_metadata: DispatchMetadata::default(),
        }
    }

    /// Build state from configuration, using LiveKit when it is configured
    pub fn from_config(config: &DispatcherConfig) -> LiveKitResult<Self> {
        let state = match &config.livekit {
            Some(livekit) => {
                let client = LiveKitDispatchClient::new(livekit.clone())?;
                info!(url = %client.base_url(), "Using LiveKit dispatch registry");
                Self::new(Arc::new(client), "livekit")
            }
            None => {
                warn!(
                    missing = ?config.missing_registry_settings,
                    "Registry not configured; triggers will fail until it is"
                );
                Self::unconfigured(config.missing_registry_settings.clone())
            }
        };

        Ok(state
            .with_default_agent_name(config.default_agent_name.clone())
            .with_default_metadata(config.default_metadata.clone()))
    }

    #[must_use]
    pub fn with_default_agent_name(mut self, name: AgentName) -> Self {
        self.default_agent_name = name;
        self
    }

    #[must_use]
    pub fn with_default_metadata(mut self, metadata: DispatchMetadata) -> Self {
        self.default_metadata = metadata;
        self
    }

    /// Reconciler, or a configuration error when no registry is set up
    pub fn reconciler(&self, request_id: &RequestId) -> Result<&Reconciler, TriggerError> {
        self.reconciler.as_ref().ok_or_else(|| {
            TriggerError::configuration_error(self.missing_settings.to_vec(), request_id.clone())
        })
    }

    pub fn registry_configured(&self) -> bool {
        self.reconciler.is_some()
    }

    pub fn registry_backend(&self) -> &'static str {
        self.registry_backend
    }

    pub fn default_agent_name(&self) -> &AgentName {
        &self.default_agent_name
    }

    pub fn default_metadata(&self) -> &DispatchMetadata {
        &self.default_metadata
    }
}
