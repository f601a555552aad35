use thiserror::Error;

/// Everything that can go wrong while answering a single session message.
///
/// Recoverable conditions (`LowConfidence`, a failed route plan) are handled
/// inside the pipeline; the remaining variants surface to the client as an
/// `error` message and leave session state untouched.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("unknown positioning mode '{0}'")]
    InvalidMode(String),
    #[error("no usable beacon readings in request")]
    InsufficientInput,
    #[error("no reading matched a known beacon")]
    UnresolvableBeacons,
    #[error("trilateration confidence {0:.2} below threshold")]
    LowConfidence(f64),
    #[error("no route to '{0}'")]
    NoRoute(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "malformed request",
            Self::InvalidMode(_) => "invalid mode",
            Self::InsufficientInput => "insufficient input",
            Self::UnresolvableBeacons => "unresolvable beacons",
            Self::LowConfidence(_) => "low confidence",
            Self::NoRoute(_) => "no route",
            Self::Internal(_) => "internal failure",
        }
    }

    /// The only condition the orchestrator recovers from by degrading to
    /// the weighted estimator. Everything else surfaces to the client.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::LowConfidence(_))
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(error: serde_json::Error) -> Self {
        PipelineError::MalformedRequest(error.to_string())
    }
}
