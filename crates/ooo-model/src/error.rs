use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model credentials missing: set OOO_API_KEY or OPENAI_API_KEY")]
    MissingCredentials,

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode model response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("model returned an empty response")]
    EmptyResponse,
}
