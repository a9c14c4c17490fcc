//! Variable-definition evaluators.
//!
//! - [`JsonVariables`]: the text is a JSON value (normally an object literal).
//! - [`ExpressionVariables`]: the text is a Jinja expression, which accepts Python-style dict
//!   literals such as `{'name': 'World', 'items': [1, 2]}`.

use crate::adapter::{self, Bindings};
use crate::template::diagnostic;
use minijinja::{Environment, UndefinedBehavior, context};
use serde_json::Value;
use workbench_core::{Diagnostic, DiagnosticKind, VariableEvaluator};

/// Evaluates JSON variable definitions with `serde_json`.
///
/// Any text `serde_json` rejects is a syntax failure; shape checks happen later, in the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonVariables;

impl VariableEvaluator for JsonVariables {
    fn evaluate(&self, text: &str) -> Result<Value, Diagnostic> {
        serde_json::from_str(text).map_err(|err| {
            let message = err.to_string();
            Diagnostic::new(
                DiagnosticKind::VariableSyntax,
                adapter::strip_location_suffix(&message),
                err.line().max(1),
                err.column().max(1),
            )
        })
    }
}

/// Evaluates variable definitions written as a Jinja expression.
///
/// Names referenced inside the expression are undefined and fail the evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionVariables;

impl VariableEvaluator for ExpressionVariables {
    fn evaluate(&self, text: &str) -> Result<Value, Diagnostic> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        let expression = env
            .compile_expression(text)
            .map_err(|err| {
                diagnostic(&err, text, DiagnosticKind::VariableSyntax, &Bindings::default())
            })?;
        let value = expression
            .eval(context! {})
            .map_err(|err| {
                diagnostic(&err, text, DiagnosticKind::VariableSyntax, &Bindings::default())
            })?;

        serde_json::to_value(&value)
            .map_err(|err| Diagnostic::new(DiagnosticKind::VariableType, err.to_string(), 1, 1))
    }
}
