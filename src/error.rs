//! Error Types
//!
//! Classified errors surfaced to the user. Everything else travels as a plain
//! `anyhow::Error` with context attached.

use thiserror::Error;

/// Errors the user can correct or act upon
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    /// Invalid or unsupported argument, format or enum combination
    #[error("{0}")]
    Parameter(String),

    /// A name or uuid lookup matched nothing
    #[error("unknown {kind} {query}")]
    ResourceNotFound { kind: String, query: String },
}

impl CliError {
    pub fn parameter(message: impl Into<String>) -> Self {
        Self::Parameter(message.into())
    }

    pub fn not_found(kind: impl Into<String>, query: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            kind: kind.into(),
            query: query.into(),
        }
    }

    /// Label used in the output envelope
    pub fn label(&self) -> &'static str {
        match self {
            Self::Parameter(_) => "ParameterError",
            Self::ResourceNotFound { .. } => "ResourceNotFound",
        }
    }
}

/// Render any error the way the output envelope reports it
pub fn envelope_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<CliError>() {
        Some(cli) => format!("{}: {}", cli.label(), cli),
        None => format!("Error: {:#}", error),
    }
}

/// Check whether an error chain carries a given classified error
#[cfg(test)]
pub fn is_parameter_error(error: &anyhow::Error) -> bool {
    matches!(error.downcast_ref::<CliError>(), Some(CliError::Parameter(_)))
}

#[cfg(test)]
pub fn is_not_found(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<CliError>(),
        Some(CliError::ResourceNotFound { .. })
    )
}
