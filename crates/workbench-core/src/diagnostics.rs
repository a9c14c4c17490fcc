//! Diagnostics and annotation data model.
//!
//! Two shapes live here:
//! - [`Diagnostic`]: what an external capability (template parser, renderer, variable evaluator)
//!   reports, with **1-based** line/column positions.
//! - [`Annotation`]: what a text surface displays, with **0-based** rows/columns.
//!
//! The conversion between the two happens exactly once, in [`Annotation::at`]. Capabilities that
//! evaluate wrapped source must translate positions back to the user's text before building a
//! [`Diagnostic`]; nothing downstream applies further offsets.

use std::collections::BTreeSet;
use std::fmt;

/// The class of failure a [`Diagnostic`] describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// The template text could not be parsed.
    TemplateSyntax,
    /// The variable definitions could not be parsed.
    VariableSyntax,
    /// The variable definitions parsed, but not into a mapping.
    VariableType,
    /// A render referenced a name with no supplied value.
    ///
    /// Carries the offending name when the capability could identify it.
    Undefined(Option<String>),
    /// Any other failure, labelled by the capability that raised it.
    Other(String),
}

impl DiagnosticKind {
    /// Human-readable class label (e.g. `"TemplateSyntaxError"`).
    pub fn label(&self) -> &str {
        match self {
            Self::TemplateSyntax => "TemplateSyntaxError",
            Self::VariableSyntax => "SyntaxError",
            Self::VariableType => "TypeError",
            Self::Undefined(_) => "UndefinedError",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A structured failure reported by an external capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Failure class.
    pub kind: DiagnosticKind,
    /// Message without any position suffix.
    pub message: String,
    /// Line number, 1-based.
    pub line: usize,
    /// Column number, 1-based.
    pub column: usize,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            column,
        }
    }

    /// `"<Kind>: <message>"`, as shown in annotations.
    pub fn headline(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (line {}, column {})",
            self.headline(),
            self.line,
            self.column
        )
    }
}

/// Annotation severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Blocking problems (syntax errors, failed renders).
    Error,
    /// Advisory problems (extra or undefined variables).
    Warning,
}

/// Identifies one of the three text surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SurfaceId {
    /// The template input surface.
    Template,
    /// The variable-definitions input surface.
    Variables,
    /// The rendered output surface.
    Output,
}

impl SurfaceId {
    /// All surfaces, in display order.
    pub const ALL: [Self; 3] = [Self::Template, Self::Variables, Self::Output];

    /// Short lowercase name, used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Variables => "variables",
            Self::Output => "output",
        }
    }
}

/// A positioned, severity-tagged message attached to a text surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Row, 0-based.
    pub row: usize,
    /// Column, 0-based.
    pub column: usize,
    /// Message text.
    pub message: String,
    /// Severity.
    pub severity: Severity,
}

impl Annotation {
    /// Create an annotation at an explicit 0-based position.
    pub fn new(row: usize, column: usize, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            row,
            column,
            message: message.into(),
            severity,
        }
    }

    /// Create an annotation at the position a [`Diagnostic`] reports.
    ///
    /// Converts the diagnostic's 1-based line/column to 0-based row/column. Positions reported as
    /// `0` are clamped to the first row/column.
    pub fn at(
        diagnostic: &Diagnostic,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self::new(
            diagnostic.line.saturating_sub(1),
            diagnostic.column.saturating_sub(1),
            message,
            severity,
        )
    }

    /// Create an error annotation carrying the diagnostic's headline.
    pub fn error(diagnostic: &Diagnostic) -> Self {
        Self::at(diagnostic, diagnostic.headline(), Severity::Error)
    }
}

/// Variable names on both sides of a reconciliation pass.
///
/// Derived fresh on every pass; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSets {
    /// Names the template reads without binding them itself.
    pub declared_by_template: BTreeSet<String>,
    /// Names the user's variable definitions supply.
    pub declared_by_user: BTreeSet<String>,
}

impl VariableSets {
    /// Names the user supplied that the template never reads.
    pub fn extra(&self) -> Vec<String> {
        self.declared_by_user
            .difference(&self.declared_by_template)
            .cloned()
            .collect()
    }

    /// Names the template reads that the user never supplied.
    pub fn missing(&self) -> Vec<String> {
        self.declared_by_template
            .difference(&self.declared_by_user)
            .cloned()
            .collect()
    }
}
