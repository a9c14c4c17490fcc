//! Jinja template capability.

use crate::adapter::{self, Bindings};
use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use std::collections::{BTreeSet, HashSet};
use tracing::trace;
use workbench_core::{Diagnostic, DiagnosticKind, TemplateCapability, Variables};

/// Parses and renders Jinja templates with `minijinja`.
///
/// Every call builds a fresh environment, so passes share no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct JinjaTemplates;

impl JinjaTemplates {
    /// Create the capability.
    pub fn new() -> Self {
        Self
    }

    fn environment<'source>(strict: bool) -> Environment<'source> {
        let mut env = Environment::new();
        env.set_undefined_behavior(if strict {
            UndefinedBehavior::Strict
        } else {
            UndefinedBehavior::Lenient
        });
        env
    }
}

impl TemplateCapability for JinjaTemplates {
    fn parse(&self, template: &str) -> Result<BTreeSet<String>, Diagnostic> {
        let env = Self::environment(false);
        let parsed = env
            .template_from_str(template)
            .map_err(|err| {
                diagnostic(&err, template, DiagnosticKind::TemplateSyntax, &Bindings::default())
            })?;
        let names: BTreeSet<String> = parsed.undeclared_variables(false).into_iter().collect();
        trace!(?names, "parsed template");
        Ok(names)
    }

    fn render(
        &self,
        template: &str,
        variables: &Variables,
        strict: bool,
    ) -> Result<String, Diagnostic> {
        let env = Self::environment(strict);
        let parsed = env.template_from_str(template).map_err(|err| {
            diagnostic(&err, template, DiagnosticKind::TemplateSyntax, &Bindings::default())
        })?;
        parsed.render(variables).map_err(|err| {
            let inputs: HashSet<String> = parsed.undeclared_variables(false);
            let bindings = Bindings::new(variables).with_inputs(&inputs);
            diagnostic(&err, template, DiagnosticKind::TemplateSyntax, &bindings)
        })
    }
}

/// Convert a `minijinja` error raised while processing `source`.
///
/// Syntax errors become `syntax`, so the same conversion serves templates and variable
/// expressions. Undefined-value failures are named by resolving the blamed expression against
/// `bindings`.
pub(crate) fn diagnostic(
    err: &minijinja::Error,
    source: &str,
    syntax: DiagnosticKind,
    bindings: &Bindings<'_>,
) -> Diagnostic {
    let message = err
        .detail()
        .map(str::to_string)
        .unwrap_or_else(|| err.kind().to_string());
    let blamed = err
        .range()
        .and_then(|range| adapter::blamed_expression(source, range));

    let kind = match err.kind() {
        ErrorKind::SyntaxError => syntax,
        ErrorKind::UndefinedError => {
            DiagnosticKind::Undefined(adapter::undefined_name(&message, blamed, bindings))
        }
        other => DiagnosticKind::Other(format!("{other:?}")),
    };

    let (line, column) = match err.range() {
        Some(range) => adapter::position_of(source, range.start),
        None => (err.line().unwrap_or(1), 1),
    };

    Diagnostic::new(kind, message, line, column)
}
