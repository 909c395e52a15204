use crate::models::types::ZoneId;
use thiserror::Error;

pub type AppResult<T> = Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Move failed collision or permission checks
    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),

    /// Action reserved for the host, or a second world submission
    #[error("unauthorized action: {0}")]
    UnauthorizedAction(&'static str),

    /// Join or move before any world was submitted
    #[error("no active session")]
    NoActiveSession,

    /// Move into a zone whose denial has not expired yet
    #[error("zone {0} was denied recently")]
    StaleDenial(ZoneId),

    /// The host connection went away; the session is gone
    #[error("Host left the meeting")]
    HostLoss,

    #[error("connection has not joined the session")]
    UnknownParticipant,

    #[error("invalid world: {0}")]
    InvalidWorld(String),

    #[error(transparent)]
    Infra(#[from] InfraError),
}

impl DomainError {
    /// Refusals are part of normal operation and are never reported to clients.
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidTransition(_)
                | DomainError::UnauthorizedAction(_)
                | DomainError::NoActiveSession
                | DomainError::StaleDenial(_)
                | DomainError::UnknownParticipant
                | DomainError::InvalidWorld(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigErrorKind {
    #[error("failed to read file: {0}")]
    Read(std::io::Error),

    #[error("failed to parse file: {0}")]
    Parse(toml::de::Error),

    #[error("invalid environment variable {0}: {1}")]
    InvalidEnv(String, String),
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: std::path::PathBuf,
        #[source]
        source: ConfigErrorKind,
    },

    #[error("invalid environment: {0}")]
    Env(#[source] ConfigErrorKind),

    #[error("network issue: {0}")]
    Net(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
