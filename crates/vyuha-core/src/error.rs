use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VyuhaError {
    #[error("invalid risk assessment: {0}")]
    InvalidRisk(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("proposer oracle error: {0}")]
    Proposer(String),

    #[error("policy oracle error: {0}")]
    PolicyOracle(String),

    #[error("malformed oracle response: {0}")]
    MalformedResponse(String),

    #[error("corrupt state file {path}: {reason}")]
    CorruptState { path: PathBuf, reason: String },

    #[error("state ledger lock poisoned")]
    LedgerPoisoned,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl VyuhaError {
    /// True for failures writing or reading the state ledger or event log.
    /// These fail the current request and are reported as internal failures,
    /// never as a validation rejection.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            VyuhaError::Io(_)
                | VyuhaError::Yaml(_)
                | VyuhaError::Json(_)
                | VyuhaError::CorruptState { .. }
                | VyuhaError::LedgerPoisoned
        )
    }
}

pub type Result<T> = std::result::Result<T, VyuhaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_is_persistence() {
        let err = VyuhaError::Io(std::io::Error::other("disk full"));
        assert!(err.is_persistence());
    }

    #[test]
    fn oracle_errors_are_not_persistence() {
        assert!(!VyuhaError::Proposer("timeout".into()).is_persistence());
        assert!(!VyuhaError::PolicyOracle("502".into()).is_persistence());
        assert!(!VyuhaError::InvalidRisk("p > 1".into()).is_persistence());
    }
}
