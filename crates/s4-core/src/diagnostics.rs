//! Ariadne-based rendering of dispatch errors and ambiguity warnings.
//!
//! When the error can be traced to a span of a source file (a schema entry),
//! the report is drawn against that source with a labeled span and a help
//! line. Without a span the same code, message and help are printed as
//! plain text. JSON mode produces one object per diagnostic.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::class::render_signature;
use crate::error::{AmbiguousDispatch, DispatchError};

/// How diagnostics are rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiagnosticOptions {
    pub color: bool,
    pub json: bool,
}

impl DiagnosticOptions {
    /// Colorless human-readable output (used by tests).
    pub fn colorless() -> Self {
        DiagnosticOptions {
            color: false,
            json: false,
        }
    }
}

/// Severity of a rendered diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// Everything a renderer needs, independent of the output format.
///
/// Errors and warnings from this crate convert into one; other crates build
/// their own for failures that are not dispatch errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    /// Text attached to the highlighted span.
    pub label: String,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, label: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code,
            message: message.into(),
            label: label.into(),
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render for a terminal, or as a JSON line when `opts.json` is set.
    pub fn render(&self, span: Option<Range<usize>>, source: &str, filename: &str, opts: &DiagnosticOptions) -> String {
        render(self, span, source, filename, opts)
    }

    pub fn to_json(&self, span: Option<Range<usize>>, filename: &str) -> serde_json::Value {
        to_json(self, span, filename)
    }
}

impl From<&DispatchError> for Diagnostic {
    fn from(error: &DispatchError) -> Self {
        error_diagnostic(error)
    }
}

impl From<&AmbiguousDispatch> for Diagnostic {
    fn from(warning: &AmbiguousDispatch) -> Self {
        warning_diagnostic(warning)
    }
}

fn error_diagnostic(error: &DispatchError) -> Diagnostic {
    let (label, help) = match error {
        DispatchError::Cycle { .. } => (
            "parent links form a cycle".to_string(),
            Some("remove one of the parent links in the cycle".to_string()),
        ),
        DispatchError::SealedClass { class } => (
            format!("`{}` redefined here", class),
            Some("sealed classes cannot be redefined; choose a new name".to_string()),
        ),
        DispatchError::ReservedClassName { name } => (
            format!("`{}` used as a class name", name),
            Some("`ANY` and `missing` may only appear in method signatures".to_string()),
        ),
        DispatchError::DuplicateGeneric { existing_arity, .. } => (
            "redefined with a different number of parameters".to_string(),
            Some(format!(
                "keep {} dispatch parameter(s) or use a new generic name",
                existing_arity
            )),
        ),
        DispatchError::UnknownGeneric { name } => (
            format!("`{}` is not defined", name),
            Some("define the generic before adding methods to it".to_string()),
        ),
        DispatchError::ArityMismatch {
            expected, found, ..
        } => {
            let help = if expected > found {
                format!("missing {} class(es)", expected - found)
            } else {
                format!("{} extra class(es)", found - expected)
            };
            (format!("expected {} class(es)", expected), Some(help))
        }
        DispatchError::NoApplicableMethod { classes, .. } => (
            format!("no method for ({})", render_signature(classes)),
            Some(
                "define a method for these classes, one of their ancestors, or `ANY`".to_string(),
            ),
        ),
        DispatchError::NoNextMethod { current, .. } => (
            format!("({}) is the last applicable method", render_signature(current)),
            None,
        ),
        DispatchError::UnknownMethod { .. } => ("unknown method".to_string(), None),
        DispatchError::Handler { message, .. } => (message.clone(), None),
    };
    Diagnostic {
        severity: Severity::Error,
        code: error.code(),
        message: error.to_string(),
        label,
        help,
    }
}

fn warning_diagnostic(warning: &AmbiguousDispatch) -> Diagnostic {
    Diagnostic {
        severity: Severity::Warning,
        code: AmbiguousDispatch::CODE,
        message: warning.to_string(),
        label: format!(
            "{} signature(s) tie at distance {}",
            warning.runners_up.len() + 1,
            warning.distance
        ),
        help: Some(format!(
            "define a method for ({}) to settle the choice",
            render_signature(&warning.classes)
        )),
    }
}

/// Render an error. `span` locates it in `source`, when known.
pub fn render_error(
    error: &DispatchError,
    span: Option<Range<usize>>,
    source: &str,
    filename: &str,
    opts: &DiagnosticOptions,
) -> String {
    render(&error_diagnostic(error), span, source, filename, opts)
}

/// Render an ambiguity warning.
pub fn render_warning(
    warning: &AmbiguousDispatch,
    span: Option<Range<usize>>,
    source: &str,
    filename: &str,
    opts: &DiagnosticOptions,
) -> String {
    render(&warning_diagnostic(warning), span, source, filename, opts)
}

/// The JSON object for an error, as emitted in `--json` mode.
pub fn error_json(error: &DispatchError, span: Option<Range<usize>>, filename: &str) -> serde_json::Value {
    to_json(&error_diagnostic(error), span, filename)
}

/// The JSON object for an ambiguity warning.
pub fn warning_json(warning: &AmbiguousDispatch, span: Option<Range<usize>>, filename: &str) -> serde_json::Value {
    to_json(&warning_diagnostic(warning), span, filename)
}

fn to_json(diag: &Diagnostic, span: Option<Range<usize>>, filename: &str) -> serde_json::Value {
    let spans: Vec<serde_json::Value> = span
        .into_iter()
        .map(|r| {
            serde_json::json!({
                "start": r.start,
                "end": r.end,
                "label": diag.label,
            })
        })
        .collect();
    serde_json::json!({
        "code": diag.code,
        "severity": diag.severity.as_str(),
        "message": diag.message,
        "file": filename,
        "spans": spans,
        "help": diag.help,
    })
}

fn render(
    diag: &Diagnostic,
    span: Option<Range<usize>>,
    source: &str,
    filename: &str,
    opts: &DiagnosticOptions,
) -> String {
    if opts.json {
        return format!("{}\n", to_json(diag, span, filename));
    }

    let span = match span {
        Some(span) if !source.is_empty() => span,
        _ => return render_plain(diag),
    };

    // Clamp to the source and keep the span non-empty for ariadne.
    let source_len = source.len();
    let start = span.start.min(source_len.saturating_sub(1));
    let end = span.end.min(source_len).max(start + 1);
    let range = start..end;

    let kind = match diag.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
    };
    let color = match diag.severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
    };

    let mut builder = Report::build(kind, range.clone())
        .with_code(diag.code)
        .with_message(&diag.message)
        .with_config(Config::default().with_color(opts.color))
        .with_label(Label::new(range).with_message(&diag.label).with_color(color));
    if let Some(help) = &diag.help {
        builder.set_help(help);
    }

    let mut buf = Vec::new();
    if builder.finish().write(Source::from(source), &mut buf).is_err() {
        return render_plain(diag);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn render_plain(diag: &Diagnostic) -> String {
    let mut out = format!("{}[{}]: {}\n", diag.severity.as_str(), diag.code, diag.message);
    if let Some(help) = &diag.help {
        out.push_str(&format!("  = help: {}\n", help));
    }
    out
}
