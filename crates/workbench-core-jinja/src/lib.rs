#![warn(missing_docs)]
//! `workbench-core-jinja` - Jinja capability for `workbench-core`.
//!
//! Provides the template parser/renderer ([`JinjaTemplates`], backed by `minijinja`) and two
//! variable-definition evaluators ([`JsonVariables`], [`ExpressionVariables`]). All three report
//! failures as `workbench-core` [`Diagnostic`](workbench_core::Diagnostic)s with 1-based
//! positions in the text they were handed; no wrapper text is ever injected around user input.
//!
//! ```rust
//! use workbench_core::VariablesSyntax;
//!
//! let engine = workbench_core_jinja::engine(VariablesSyntax::Json);
//! let result = engine.reconcile("Hello, {{ name }}!", r#"{"name": "World"}"#);
//! assert_eq!(result.output, "Hello, World!");
//! assert!(result.is_clean());
//! ```

pub mod adapter;
pub mod template;
pub mod variables;

pub use template::JinjaTemplates;
pub use variables::{ExpressionVariables, JsonVariables};

use workbench_core::{DiagnosticsEngine, VariableEvaluator, VariablesSyntax};

/// A variable evaluator chosen at runtime.
pub type DynVariables = Box<dyn VariableEvaluator + Send + Sync>;

/// A diagnostics engine over the Jinja capability.
pub type JinjaEngine = DiagnosticsEngine<JinjaTemplates, DynVariables>;

/// The evaluator for `syntax`.
pub fn evaluator(syntax: VariablesSyntax) -> DynVariables {
    match syntax {
        VariablesSyntax::Json => Box::new(JsonVariables),
        VariablesSyntax::Expression => Box::new(ExpressionVariables),
    }
}

/// A diagnostics engine reading variable definitions written in `syntax`.
pub fn engine(syntax: VariablesSyntax) -> JinjaEngine {
    DiagnosticsEngine::new(JinjaTemplates::new(), evaluator(syntax))
}
