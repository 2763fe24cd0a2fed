use thiserror::Error;

/// Pipeline step a request was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    Call,
    Extract,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Build => "build",
            Stage::Call => "call",
            Stage::Extract => "extract",
        };
        write!(f, "{}", s)
    }
}

/// Every way a food or exercise request can fail after the method check.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid request body: {0}")]
    InvalidRequestBody(#[source] serde_json::Error),

    #[error("Invalid image data format.")]
    InvalidInputFormat,

    #[error("Missing required profile fields: {}", .0.join(", "))]
    InvalidProfile(Vec<&'static str>),

    #[error("Request to model API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API call failed with status: {status}, {body}")]
    UpstreamCallFailed { status: u16, body: String },

    #[error("Unexpected model API response: {0}")]
    MalformedUpstreamResponse(String),

    #[error("No valid JSON found in the response.")]
    NoJsonFound,

    #[error("Failed to parse JSON from the response: {0}")]
    MalformedJson(#[source] serde_json::Error),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::InvalidRequestBody(_)
            | PipelineError::InvalidInputFormat
            | PipelineError::InvalidProfile(_) => Stage::Build,
            PipelineError::Transport(_)
            | PipelineError::UpstreamCallFailed { .. }
            | PipelineError::MalformedUpstreamResponse(_) => Stage::Call,
            PipelineError::NoJsonFound | PipelineError::MalformedJson(_) => Stage::Extract,
        }
    }
}
