use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame record is missing field `{field}`")]
    MissingField { field: String },

    #[error("frame record has invalid value {value:?} for field `{field}`")]
    InvalidField { field: String, value: String },

    #[error("no frames to analyze")]
    EmptyInput,
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{program} reported an error: {message}")]
    Command { program: String, message: String },

    #[error("no {codec_type} stream in {input}")]
    NoStream { input: String, codec_type: String },

    #[error("output file already exists: {0}")]
    OutputExists(String),

    #[error("invalid time value: {0}")]
    InvalidTime(String),

    #[error("target index {index} out of range, only {len} inputs")]
    TargetOutOfRange { index: usize, len: usize },
}
