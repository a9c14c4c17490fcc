#![warn(missing_docs)]
//! Workbench Core - headless template workbench kernel
//!
//! # Overview
//!
//! `workbench-core` drives an interactive template workbench: a template surface, a variable
//! definitions surface, and an output surface that is re-rendered on every edit. It does not
//! parse or render templates itself; a [`TemplateCapability`] and a [`VariableEvaluator`]
//! (see `workbench-core-jinja`) do that, and report failures as structured [`Diagnostic`]s.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Workbench (startup fallback, edit passes)  │  ← Public API
//! ├──────────────────────┬──────────────────────┤
//! │  DiagnosticsEngine   │  Shareable codec     │  ← Core logic
//! ├──────────────────────┼──────────────────────┤
//! │  Capability traits   │  gzip + base64url    │  ← External boundary
//! ├──────────────────────┴──────────────────────┤
//! │  Surfaces · StateStore · Location · Config  │  ← Host integration
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use workbench_core::codec::{self, ShareableState};
//!
//! let state = ShareableState::new("Hello, {{ name }}!", r#"{"name": "World"}"#);
//! let token = codec::encode(&state).unwrap();
//! assert_eq!(codec::decode(&token).unwrap(), state);
//! ```
//!
//! # Module Description
//!
//! - [`diagnostics`] - Diagnostic / annotation data model
//! - [`capability`] - Template and variable capability traits
//! - [`reconcile`] - Diagnostics reconciliation engine
//! - [`codec`] - Shareable state tokens
//! - [`surface`] - Text-editing surfaces
//! - [`store`] - Persisted local state
//! - [`location`] - Location and share links
//! - [`workbench`] - Edit orchestration
//! - [`config`] - Configuration

pub mod capability;
pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod location;
pub mod reconcile;
pub mod store;
pub mod surface;
pub mod workbench;

pub use capability::{TemplateCapability, VariableEvaluator, Variables};
pub use codec::{DecodeFailure, ShareableState};
pub use config::{ConfigError, VariablesSyntax, WorkbenchConfig};
pub use diagnostics::{Annotation, Diagnostic, DiagnosticKind, Severity, SurfaceId, VariableSets};
pub use location::Location;
pub use reconcile::{DiagnosticsEngine, NOT_A_MAPPING, Reconciliation};
pub use store::{FileStore, MemoryStore, StateStore, StoreError};
pub use surface::{BufferSurface, SurfaceChange, SurfaceChangeCallback, TextSurface};
pub use workbench::{InitialSource, Surfaces, Workbench};
