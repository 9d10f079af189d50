#[derive(Debug, thiserror::Error)]
pub enum JimengError {
    #[error("session token is missing. Please provide it or set the JIMENG_API_TOKEN environment variable.")]
    MissingSessionToken,
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("failed to acquire an upload token: {0}")]
    Auth(String),
    #[error("image upload failed at the {step} step: {message}")]
    Upload { step: &'static str, message: String },
    #[error("generation request was accepted but no history record id was returned: {0}")]
    Submission(String),
    #[error("unexpected response from the service: {0}")]
    Protocol(String),
    #[error("generation was rejected by the content filter (fail_code {fail_code})")]
    ContentFiltered { fail_code: String },
    #[error("image generation failed (fail_code {fail_code})")]
    GenerationFailed { fail_code: String },
    #[error("generation was cancelled before reaching a terminal status")]
    Cancelled,
    #[error("generation did not reach a terminal status within the polling limits")]
    TimedOut,
    #[error("API request failed: {message}")]
    ApiError { message: String },
    #[error("Network request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Failed to serialize or parse a payload: {0}")]
    JsonFailed(#[from] serde_json::Error),
    #[error("URL parsing failed: {0}")]
    UrlParseFailed(#[from] url::ParseError),
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
