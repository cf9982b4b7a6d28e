// SPDX-License-Identifier: MIT

//! The error taxonomy shared by every manager and the reconciler.
//!
//! spec.md §7 names exactly three kinds a manager operation can fail with;
//! `not-modified` is not an error at all (the control-plane client models it
//! as `Ok(None)`).

use thiserror::Error;

/// Coded failure of a manager or service-controller operation.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A name, privilege, CIDR, or runtime-config value failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A required mount (or other external precondition) was absent.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Everything else: subprocess failures, I/O errors, and the output
    /// of a failed subprocess invocation that the caller should be able to
    /// inspect for diagnosis.
    #[error("internal error: {message}{}", format_output(.output))]
    Internal {
        message: String,
        /// Captured combined stdout+stderr of the failing subprocess, if any.
        output: Option<String>,
    },
}

fn format_output(output: &Option<String>) -> String {
    match output {
        Some(o) if !o.is_empty() => format!(" (output: {o})"),
        _ => String::new(),
    }
}

impl AgentError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            output: None,
        }
    }

    pub fn internal_with_output(msg: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            output: Some(output.into()),
        }
    }

    /// The error code as it would be surfaced to an imperative RPC caller.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Unavailable(_) => "unavailable",
            Self::Internal { .. } => "internal",
        }
    }
}

impl From<std::io::Error> for AgentError {
    fn from(e: std::io::Error) -> Self {
        AgentError::internal(e.to_string())
    }
}

pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
