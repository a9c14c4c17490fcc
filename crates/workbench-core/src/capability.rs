//! External capability interfaces.
//!
//! The workbench never parses or renders templates itself. Integrations (e.g.
//! `workbench-core-jinja`) implement these traits and report failures as structured
//! [`Diagnostic`]s with 1-based positions relative to the text they were given.

use crate::diagnostics::Diagnostic;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// The evaluated variable mapping handed to the renderer.
///
/// Keys keep the order in which they were written.
pub type Variables = Map<String, Value>;

/// A template parser + renderer.
pub trait TemplateCapability {
    /// Parse `template` and return the names it references without binding them locally.
    fn parse(&self, template: &str) -> Result<BTreeSet<String>, Diagnostic>;

    /// Render `template` against `variables`.
    ///
    /// With `strict` set, any reference to a name with no supplied value must fail with a
    /// [`DiagnosticKind::Undefined`](crate::DiagnosticKind::Undefined) diagnostic instead of
    /// rendering as empty text.
    fn render(&self, template: &str, variables: &Variables, strict: bool)
    -> Result<String, Diagnostic>;
}

/// A variable-definition evaluator.
pub trait VariableEvaluator {
    /// Evaluate the variable-definition text.
    ///
    /// Returns whatever value the text denotes; the caller decides whether it is a usable
    /// mapping.
    fn evaluate(&self, text: &str) -> Result<Value, Diagnostic>;
}

impl<T: TemplateCapability + ?Sized> TemplateCapability for &T {
    fn parse(&self, template: &str) -> Result<BTreeSet<String>, Diagnostic> {
        (**self).parse(template)
    }

    fn render(
        &self,
        template: &str,
        variables: &Variables,
        strict: bool,
    ) -> Result<String, Diagnostic> {
        (**self).render(template, variables, strict)
    }
}

impl<V: VariableEvaluator + ?Sized> VariableEvaluator for &V {
    fn evaluate(&self, text: &str) -> Result<Value, Diagnostic> {
        (**self).evaluate(text)
    }
}

impl<T: TemplateCapability + ?Sized> TemplateCapability for Box<T> {
    fn parse(&self, template: &str) -> Result<BTreeSet<String>, Diagnostic> {
        (**self).parse(template)
    }

    fn render(
        &self,
        template: &str,
        variables: &Variables,
        strict: bool,
    ) -> Result<String, Diagnostic> {
        (**self).render(template, variables, strict)
    }
}

impl<V: VariableEvaluator + ?Sized> VariableEvaluator for Box<V> {
    fn evaluate(&self, text: &str) -> Result<Value, Diagnostic> {
        (**self).evaluate(text)
    }
}
