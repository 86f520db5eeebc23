//! Errors raised while reading, parsing or loading a schema file.

use std::fmt;
use std::ops::Range;
use std::path::PathBuf;

use s4_core::diagnostics::Diagnostic;
use s4_core::{DiagnosticOptions, DispatchError};

/// Failure to read, parse or load a schema file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The file could not be read.
    Io { path: PathBuf, message: String },
    /// The text is not a valid schema.
    Parse {
        message: String,
        span: Option<Range<usize>>,
    },
    /// An entry was rejected by the dispatcher.
    Dispatch {
        error: DispatchError,
        span: Range<usize>,
    },
}

impl SchemaError {
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::Io { .. } => "S0001",
            SchemaError::Parse { .. } => "S0002",
            SchemaError::Dispatch { error, .. } => error.code(),
        }
    }

    /// Where in the schema source the error points, if anywhere.
    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            SchemaError::Io { .. } => None,
            SchemaError::Parse { span, .. } => span.clone(),
            SchemaError::Dispatch { span, .. } => Some(span.clone()),
        }
    }

    pub fn diagnostic(&self) -> Diagnostic {
        match self {
            SchemaError::Io { .. } => Diagnostic::error(self.code(), self.to_string(), "unreadable"),
            SchemaError::Parse { message, .. } => {
                Diagnostic::error(self.code(), "invalid schema file", message.clone())
                    .with_help("see the `[[class]]`, `[[union]]`, `[[generic]]` and `[[method]]` tables")
            }
            SchemaError::Dispatch { error, .. } => Diagnostic::from(error),
        }
    }

    /// Render against the schema source.
    pub fn render(&self, source: &str, filename: &str, opts: &DiagnosticOptions) -> String {
        self.diagnostic().render(self.span(), source, filename, opts)
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Io { path, message } => {
                write!(f, "failed to read {}: {}", path.display(), message)
            }
            SchemaError::Parse { message, .. } => write!(f, "invalid schema file: {}", message),
            SchemaError::Dispatch { error, .. } => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for SchemaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_errors_keep_their_codes() {
        let err = SchemaError::Dispatch {
            error: DispatchError::UnknownGeneric {
                name: "area".to_string(),
            },
            span: 4..10,
        };
        assert_eq!(err.code(), "D0005");
        assert_eq!(err.span(), Some(4..10));
        assert_eq!(err.to_string(), "no generic function named `area`");
    }

    #[test]
    fn parse_error_renders_plain_without_span() {
        let err = SchemaError::Parse {
            message: "expected `=`".to_string(),
            span: None,
        };
        let out = err.render("", "s4.toml", &DiagnosticOptions::colorless());
        assert!(out.starts_with("error[S0002]: invalid schema file"), "{}", out);
    }
}
