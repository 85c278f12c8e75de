//! Response shaping: one envelope for every verb and endpoint.

pub mod envelope;
pub mod formatter;
pub mod postprocess;
pub mod sanitize;
pub mod shapes;

pub use envelope::{
    ErrorBody, ErrorEnvelope, PageRequest, Pagination, ResponseEnvelope, ResponseMetadata,
    ResponseType, SuccessEnvelope,
};
pub use formatter::{FormatContext, ResponseFormatter};
pub use sanitize::sanitize_data;

/// Internal formatting failure. Never leaves the formatter.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("{shape} payload is malformed: {reason}")]
    Malformed { shape: &'static str, reason: String },

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl FormatError {
    pub(crate) fn malformed(shape: &'static str, reason: impl Into<String>) -> Self {
        FormatError::Malformed {
            shape,
            reason: reason.into(),
        }
    }
}
