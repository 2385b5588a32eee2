use thiserror::Error;

#[derive(Debug, Error)]
pub enum OooError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("connector session error: {0}")]
    Session(String),

    #[error("all analysis tasks failed: {0}")]
    Analysis(String),

    #[error("model invocation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("prompt template not found: {0}")]
    TemplateNotFound(String),

    #[error(transparent)]
    Model(#[from] ooo_model::ModelError),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OooError>;
