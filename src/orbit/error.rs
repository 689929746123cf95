use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrbitError {
    #[error("malformed element set ({field}): {message}")]
    MalformedElementSet {
        field: &'static str,
        message: String,
    },
    #[error("invalid orbit: {0}")]
    InvalidOrbit(String),
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("propagation error: {0}")]
    Propagation(String),
}

impl OrbitError {
    pub(crate) fn malformed(field: &'static str, message: impl Into<String>) -> Self {
        OrbitError::MalformedElementSet {
            field,
            message: message.into(),
        }
    }
}
