//! Subcommand implementations
//!
//! Registry commands talk to LiveKit directly with the same configuration the
//! HTTP service reads from the environment.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Args;
use dispatcher_core::{
    AgentName, DispatchMetadata, IdValidationError, InMemoryRegistry, ReconcileError, Reconciler,
    RoomName,
};
use dispatcher_http::{
    AppState, ConfigError, DispatcherConfig, DispatcherConfigBuilder, router, shutdown_signal,
};
use dispatcher_livekit::{LiveKitDispatchClient, LiveKitError};
use serde_json::json;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid {field}: {source}")]
    InvalidArgument {
        field: &'static str,
        source: IdValidationError,
    },

    #[error("Registry not configured; missing {}", .missing.join(", "))]
    RegistryNotConfigured { missing: Vec<&'static str> },

    #[error(transparent)]
    LiveKit(#[from] LiveKitError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;

#[derive(Args, Debug)]
pub struct RoomArgs {
    /// Room name
    #[arg(long)]
    room: String,
    /// Agent name (defaults to AGENT_NAME or livekit-agent)
    #[arg(long)]
    agent: Option<String>,
}

impl RoomArgs {
    fn resolve(&self, config: &DispatcherConfig) -> CliResult<(RoomName, AgentName)> {
        let room = parse_room(&self.room)?;
        let agent_name = match &self.agent {
            Some(name) => AgentName::parse(name).map_err(|source| CliError::InvalidArgument {
                field: "agent",
                source,
            })?,
            None => config.default_agent_name.clone(),
        };
        Ok((room, agent_name))
    }
}

fn parse_room(value: &str) -> CliResult<RoomName> {
    RoomName::parse(value).map_err(|source| CliError::InvalidArgument {
        field: "room",
        source,
    })
}

fn load_config() -> CliResult<DispatcherConfig> {
    Ok(DispatcherConfigBuilder::from_env()?.build()?)
}

fn livekit_reconciler(config: &DispatcherConfig) -> CliResult<Reconciler> {
    let livekit = config
        .livekit
        .clone()
        .ok_or_else(|| CliError::RegistryNotConfigured {
            missing: config.missing_registry_settings.clone(),
        })?;
    let client = LiveKitDispatchClient::new(livekit)?;
    Ok(Reconciler::new(Arc::new(client)))
}

fn print_json(value: &serde_json::Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run_serve(bind: Option<SocketAddr>, in_memory: bool) -> CliResult<()> {
    let mut builder = DispatcherConfigBuilder::from_env()?;
    if let Some(addr) = bind {
        builder = builder.bind_addr(addr);
    }
    let config = builder.build()?;

    let state = if in_memory {
        info!("Using in-memory dispatch registry");
        AppState::new(Arc::new(InMemoryRegistry::new()), "in-memory")
            .with_default_agent_name(config.default_agent_name.clone())
            .with_default_metadata(config.default_metadata.clone())
    } else {
        AppState::from_config(&config)?
    };

    let app = router(state, &config);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Dispatcher listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Dispatcher stopped");
    Ok(())
}

pub async fn run_start(target: RoomArgs, metadata: Option<String>) -> CliResult<()> {
    let config = load_config()?;
    let (room, agent_name) = target.resolve(&config)?;
    let metadata = metadata
        .map(DispatchMetadata::new)
        .unwrap_or_else(|| config.default_metadata.clone());

    let outcome = livekit_reconciler(&config)?
        .ensure_dispatch(&room, &agent_name, &metadata)
        .await?;

    print_json(&json!({
        "outcome": outcome.as_str(),
        "dispatch": outcome.dispatch(),
    }))
}

pub async fn run_stop(target: RoomArgs) -> CliResult<()> {
    let config = load_config()?;
    let (room, agent_name) = target.resolve(&config)?;

    let deleted = livekit_reconciler(&config)?
        .remove_dispatch(&room, &agent_name)
        .await?;

    print_json(&json!({
        "status": "success",
        "dispatchId": deleted.dispatch_id,
        "room": deleted.room,
        "agentName": deleted.agent_name,
    }))
}

pub async fn run_status(target: RoomArgs) -> CliResult<()> {
    let config = load_config()?;
    let (room, agent_name) = target.resolve(&config)?;

    let dispatch = livekit_reconciler(&config)?
        .describe_dispatch(&room, &agent_name)
        .await?;

    print_json(&json!({
        "room": room,
        "agentName": agent_name,
        "workerRunning": dispatch.as_ref().is_some_and(|d| d.has_running_worker()),
        "dispatch": dispatch,
    }))
}

pub async fn run_list(room: &str) -> CliResult<()> {
    let config = load_config()?;
    let room = parse_room(room)?;

    let dispatches = livekit_reconciler(&config)?.list_dispatches(&room).await?;

    print_json(&json!({
        "room": room,
        "dispatches": dispatches,
    }))
}

pub async fn run_purge(target: RoomArgs) -> CliResult<()> {
    let config = load_config()?;
    let (room, agent_name) = target.resolve(&config)?;

    let deleted = livekit_reconciler(&config)?
        .purge_dispatches(&room, &agent_name)
        .await?;

    print_json(&json!({
        "room": room,
        "agentName": agent_name,
        "deleted": deleted,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(room: &str, agent: Option<&str>) -> RoomArgs {
        RoomArgs {
            room: room.to_string(),
            agent: agent.map(str::to_string),
        }
    }

    #[test]
    fn test_resolve_uses_default_agent() {
        let config = DispatcherConfig::default();
        let (room, agent) = target("demo-1", None).resolve(&config).unwrap();
        assert_eq!(room.as_str(), "demo-1");
        assert_eq!(agent, config.default_agent_name);
    }

    #[test]
    fn test_resolve_rejects_blank_room() {
        let config = DispatcherConfig::default();
        let err = target("  ", Some("avatar-agent"))
            .resolve(&config)
            .unwrap_err();
        assert!(matches!(
            err,
            CliError::InvalidArgument { field: "room", .. }
        ));
    }

    #[test]
    fn test_unconfigured_registry_names_missing_settings() {
        let config = DispatcherConfig::default();
        let err = livekit_reconciler(&config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("LIVEKIT_URL"));
        assert!(message.contains("LIVEKIT_API_SECRET"));
    }
}
