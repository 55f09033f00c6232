use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Google Sheets API error: {0}")]
    Sheets(String),

    #[error("OAuth2 authentication error: {0}")]
    Auth(String),

    #[error("Database connection error: {0}")]
    Connect(String),

    #[error("Database error: {0}")]
    Database(#[from] tiberius::error::Error),

    #[error("Schema mismatch for table '{table}': {reason}")]
    Schema { table: String, reason: String },

    #[error("Feeds failed: {}", .failed.join(", "))]
    PartialRun { failed: Vec<String> },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Process exit status for this error.
    ///
    /// A run where only some feeds failed exits with 2 so schedulers can
    /// tell it apart from a run that never started.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::PartialRun { .. } => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
