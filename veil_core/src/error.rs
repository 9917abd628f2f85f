use bevy::prelude::Entity;
use thiserror::Error;
use veil_runtime::{CommandParseError, INVIS_USAGE};

/// Failures raised by the visibility core and its command surface.
///
/// `Display` output doubles as the feedback string shown to the command issuer.
#[derive(Debug, Error)]
pub enum VeilError {
    #[error("entity {0:?} is no longer valid")]
    InvalidEntity(Entity),
    #[error("target '{0}' not found.")]
    TargetNotFound(String),
    #[error("multiple players found '{0}'. be more specific or use id.")]
    AmbiguousTarget(String),
    #[error("You do not have permission to use this command.")]
    PermissionDenied,
    #[error("host state '{0}' is not available yet")]
    MissingHostState(&'static str),
    #[error("invalid target selector: {0}")]
    InvalidSelector(String),
    #[error("{0}")]
    Usage(String),
}

impl From<CommandParseError> for VeilError {
    fn from(err: CommandParseError) -> Self {
        match err {
            CommandParseError::InvalidSelector(token) => VeilError::InvalidSelector(token),
            CommandParseError::MissingArgument(_) | CommandParseError::Empty => {
                VeilError::Usage(INVIS_USAGE.to_string())
            }
            other => VeilError::Usage(other.to_string()),
        }
    }
}
