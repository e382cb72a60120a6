use thiserror::Error;

/// Crate-wide error type.
///
/// Every variant maps to a process exit code so the binary can stay a thin
/// wrapper around the library.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Malformed input: {0}")]
    InputShape(String),

    #[error("Outlier model fit failed: {0}")]
    ModelFit(String),

    #[error("Data engine error: {0}")]
    Data(String),

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 2,
            AppError::InputShape(_) => 3,
            AppError::ModelFit(_) => 4,
            AppError::Data(_) => 5,
            AppError::Io(_) => 6,
        }
    }
}
