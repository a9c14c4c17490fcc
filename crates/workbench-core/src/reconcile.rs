//! Diagnostics reconciliation.
//!
//! [`DiagnosticsEngine::reconcile`] turns one (template text, variables text) pair into a complete
//! set of annotations for the two input surfaces plus exactly one output value. Stages run in a
//! fixed order:
//!
//! 1. template parse (fatal on failure)
//! 2. variable evaluation + mapping check (fatal on failure)
//! 3. if either failed: write the fatal message(s) and stop
//! 4. extra/missing variable sets (extra -> warning on the variables surface)
//! 5. strict render, refining the missing list (warning on the template surface)
//! 6. lenient render, producing the output (error on the template surface on failure)
//!
//! A pass never fails: every capability failure is folded into the returned [`Reconciliation`].

use crate::capability::{TemplateCapability, VariableEvaluator, Variables};
use crate::diagnostics::{
    Annotation, Diagnostic, DiagnosticKind, Severity, SurfaceId, VariableSets,
};
use serde_json::Value;
use tracing::debug;

/// Message used when the variable definitions do not evaluate to a mapping.
pub const NOT_A_MAPPING: &str = "Variables should be defined as a dictionary";

/// The outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Annotations for the template surface.
    pub template_annotations: Vec<Annotation>,
    /// Annotations for the variables surface.
    pub variables_annotations: Vec<Annotation>,
    /// The single authoritative output value (rendered text or an error message).
    pub output: String,
    /// Whether a syntax stage failed and rendering was skipped.
    pub fatal: bool,
    /// Variable sets, when both syntax stages succeeded.
    pub variable_sets: Option<VariableSets>,
    /// Undefined variables reported by the strict render, strict-render culprit first.
    pub undefined: Vec<String>,
}

impl Reconciliation {
    /// Annotations addressed to `surface`.
    ///
    /// The output surface never carries annotations.
    pub fn annotations(&self, surface: SurfaceId) -> &[Annotation] {
        match surface {
            SurfaceId::Template => &self.template_annotations,
            SurfaceId::Variables => &self.variables_annotations,
            SurfaceId::Output => &[],
        }
    }

    /// Whether the pass produced no annotations at all.
    pub fn is_clean(&self) -> bool {
        self.template_annotations.is_empty() && self.variables_annotations.is_empty()
    }
}

/// Runs reconciliation passes against a template capability and a variable evaluator.
#[derive(Debug, Clone)]
pub struct DiagnosticsEngine<T, V> {
    templates: T,
    variables: V,
}

impl<T, V> DiagnosticsEngine<T, V>
where
    T: TemplateCapability,
    V: VariableEvaluator,
{
    /// Create an engine over the given capabilities.
    pub fn new(templates: T, variables: V) -> Self {
        Self {
            templates,
            variables,
        }
    }

    /// The template capability.
    pub fn templates(&self) -> &T {
        &self.templates
    }

    /// The variable evaluator.
    pub fn variables(&self) -> &V {
        &self.variables
    }

    /// Run one full reconciliation pass.
    pub fn reconcile(&self, template_text: &str, variables_text: &str) -> Reconciliation {
        let mut result = Reconciliation::default();
        let mut fatal_messages = Vec::<String>::new();

        let declared_by_template = match self.templates.parse(template_text) {
            Ok(names) => Some(names),
            Err(diagnostic) => {
                debug!(%diagnostic, "template parse failed");
                result.template_annotations.push(Annotation::error(&diagnostic));
                fatal_messages.push(format!(
                    "Error in the template text:\n{}",
                    diagnostic.headline()
                ));
                None
            }
        };

        let variables = match self.evaluate_variables(variables_text) {
            Ok(variables) => Some(variables),
            Err(diagnostic) => {
                debug!(%diagnostic, "variable evaluation failed");
                result
                    .variables_annotations
                    .push(Annotation::error(&diagnostic));
                fatal_messages.push(format!(
                    "Error in the variable definitions:\n{}",
                    diagnostic.headline()
                ));
                None
            }
        };

        let (Some(declared_by_template), Some(variables)) = (declared_by_template, variables)
        else {
            result.fatal = true;
            result.output = fatal_messages.join("\n\n");
            return result;
        };

        let sets = VariableSets {
            declared_by_template,
            declared_by_user: variables.keys().cloned().collect(),
        };

        let extra = sets.extra();
        if !extra.is_empty() {
            debug!(?extra, "user variables not mentioned in the template");
            result.variables_annotations.push(Annotation::new(
                0,
                0,
                extra_variables_message(&extra),
                Severity::Warning,
            ));
        }

        let mut missing = sets.missing();
        if let Err(diagnostic) = self.templates.render(template_text, &variables, true) {
            debug!(%diagnostic, "strict render failed");
            if let DiagnosticKind::Undefined(Some(name)) = &diagnostic.kind {
                promote(&mut missing, name);
            }
            if !missing.is_empty() {
                result.template_annotations.push(Annotation::at(
                    &diagnostic,
                    undefined_variables_message(&missing),
                    Severity::Warning,
                ));
                result.undefined = missing;
            }
        }

        match self.templates.render(template_text, &variables, false) {
            Ok(rendered) => result.output = rendered,
            Err(diagnostic) => {
                debug!(%diagnostic, "render failed");
                result.template_annotations.push(Annotation::error(&diagnostic));
                result.output = diagnostic.message;
            }
        }

        result.variable_sets = Some(sets);
        result
    }

    fn evaluate_variables(&self, text: &str) -> Result<Variables, Diagnostic> {
        match self.variables.evaluate(text)? {
            Value::Object(map) => Ok(map),
            _ => Err(Diagnostic::new(
                DiagnosticKind::VariableType,
                NOT_A_MAPPING,
                1,
                1,
            )),
        }
    }
}

/// Move `name` to the front of `missing`, removing any later duplicate.
fn promote(missing: &mut Vec<String>, name: &str) {
    missing.retain(|candidate| candidate != name);
    missing.insert(0, name.to_string());
}

fn variables_phrase(count: usize) -> &'static str {
    if count > 1 {
        "variables are"
    } else {
        "variable is"
    }
}

/// Warning text for user variables the template never reads.
pub fn extra_variables_message(extra: &[String]) -> String {
    format!(
        "The following user {} not mentioned in the template: {}",
        variables_phrase(extra.len()),
        extra.join(", ")
    )
}

/// Warning text for template variables with no supplied value.
pub fn undefined_variables_message(missing: &[String]) -> String {
    format!(
        "The following template {} not defined: {}",
        variables_phrase(missing.len()),
        missing.join(", ")
    )
}
