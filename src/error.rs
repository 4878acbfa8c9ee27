//! Error taxonomy for the data-handling and evaluation core.
//!
//! Every variant signals caller misuse and is raised at the point of
//! violation. Degenerate numeric cases are not errors; they resolve to 0.

use thiserror::Error;

/// Errors raised by the splitter, the feature pipeline and the evaluation engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Invalid proportions, thresholds or cost fields.
    #[error("configuration error: {0}")]
    Config(String),

    /// Missing or mismatched columns, incompatible label encodings.
    #[error("schema error: {0}")]
    Schema(String),

    /// A transform was requested from a pipeline that has not been fitted.
    #[error("pipeline not fitted: {0}")]
    NotFitted(String),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn not_fitted(msg: impl Into<String>) -> Self {
        Self::NotFitted(msg.into())
    }
}

/// Result alias used by the library core.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PipelineError::config("proportions sum to 1.1").to_string(),
            "configuration error: proportions sum to 1.1"
        );
        assert_eq!(
            PipelineError::schema("missing column Amount").to_string(),
            "schema error: missing column Amount"
        );
        assert!(PipelineError::not_fitted("transform")
            .to_string()
            .starts_with("pipeline not fitted"));
    }

    #[test]
    fn test_converts_into_anyhow() {
        fn fails() -> anyhow::Result<()> {
            Err(PipelineError::schema("bad"))?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(err.downcast_ref::<PipelineError>().is_some());
    }
}
