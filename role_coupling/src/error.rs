use thiserror::Error;

/// Error kinds that callers need to tell apart.  Everything else is
/// propagated as a plain anyhow error with context.
#[derive(Debug, Error)]
pub enum CouplingError {
    /// Required input is missing or inconsistent.  Raised before any genome is scanned.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A pair row names a role that is not in the role table of the same file
    #[error("Corrupt coupling database: line {line} refers to unknown role {role_id}")]
    UnknownRole { role_id: String, line: usize },
    #[error("Corrupt coupling database: {0}")]
    CorruptState(String),
}
