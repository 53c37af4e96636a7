//! Error types for the gameplay core.

use thiserror::Error;

use crate::entity::EntityId;

/// Errors raised while loading or validating a [`GameConfig`](crate::config::GameConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors surfaced by the gameplay core.
///
/// Removing an absent entity and contacts between unpaired categories are not
/// errors and never appear here.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A body exists without its collider (or the reverse), or the registry and
    /// the physics world disagree about which entities are alive.
    #[error("invariant violation on entity {entity:?}: {detail}")]
    InvariantViolation {
        entity: Option<EntityId>,
        detail: String,
    },
}
