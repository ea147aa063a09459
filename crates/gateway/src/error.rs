use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced a response (connect failure, timeout).
    #[error("Gateway request failed: {0}")]
    Transport(String),

    #[error("Gateway returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The body did not match the expected schema.
    #[error("Gateway response parsing failed: {0}")]
    Parse(String),

    /// HTTP succeeded but the body reports a failure status code.
    #[error("Gateway rejected the request ({status_code}): {message}")]
    Rejected {
        status_code: String,
        message: String,
    },

    #[error("Gateway returned an empty response")]
    EmptyResponse,
}

pub type Result<T> = std::result::Result<T, GatewayError>;
