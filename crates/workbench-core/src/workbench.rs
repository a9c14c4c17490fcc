//! Edit orchestration.
//!
//! [`Workbench`] owns the three surfaces, the diagnostics engine, the persisted store and the
//! current location, and sequences them:
//!
//! - **startup**: initial content comes from the first source that works, in order:
//!   link fragment -> persisted state -> built-in defaults. A decoded fragment is cleared from
//!   the location. One pass then runs on the loaded content.
//! - **per edit**: clear every annotation, reconcile, apply annotations, write the output,
//!   persist the raw inputs, refresh the share link (also after fatal passes, so broken drafts
//!   stay shareable).
//!
//! Change notifications from the two input surfaces are queued on a channel; [`Workbench::pump`]
//! runs one pass per queued notification, in arrival order. Passes never overlap.

use crate::capability::{TemplateCapability, VariableEvaluator};
use crate::codec::{self, ShareableState};
use crate::diagnostics::SurfaceId;
use crate::location::Location;
use crate::reconcile::{DiagnosticsEngine, Reconciliation};
use crate::store::{StateStore, TEMPLATE_KEY, VARIABLES_KEY};
use crate::surface::{BufferSurface, SurfaceChange, TextSurface};
use std::sync::mpsc::{self, Receiver};
use tracing::{debug, info, warn};

/// The three surfaces a workbench drives.
#[derive(Debug)]
pub struct Surfaces<S> {
    /// Template input.
    pub template: S,
    /// Variable-definitions input.
    pub variables: S,
    /// Rendered output.
    pub output: S,
}

impl<S> Surfaces<S> {
    /// Borrow the surface identified by `id`.
    pub fn get(&self, id: SurfaceId) -> &S {
        match id {
            SurfaceId::Template => &self.template,
            SurfaceId::Variables => &self.variables,
            SurfaceId::Output => &self.output,
        }
    }

    /// Mutably borrow the surface identified by `id`.
    pub fn get_mut(&mut self, id: SurfaceId) -> &mut S {
        match id {
            SurfaceId::Template => &mut self.template,
            SurfaceId::Variables => &mut self.variables,
            SurfaceId::Output => &mut self.output,
        }
    }
}

impl Surfaces<BufferSurface> {
    /// Three empty in-memory surfaces.
    pub fn buffers() -> Self {
        Self {
            template: BufferSurface::empty(SurfaceId::Template),
            variables: BufferSurface::empty(SurfaceId::Variables),
            output: BufferSurface::empty(SurfaceId::Output),
        }
    }
}

/// Where the initial editor content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialSource {
    /// A token in the location fragment.
    Link,
    /// Previously persisted input text.
    Persisted,
    /// The built-in default pair.
    Defaults,
}

/// Edit orchestration controller.
pub struct Workbench<S, T, V, P> {
    surfaces: Surfaces<S>,
    engine: DiagnosticsEngine<T, V>,
    store: P,
    location: Location,
    initial_source: InitialSource,
    share_link: String,
    last: Reconciliation,
    passes: u64,
    changes: Receiver<SurfaceChange>,
}

impl<S, T, V, P> Workbench<S, T, V, P>
where
    S: TextSurface,
    T: TemplateCapability,
    V: VariableEvaluator,
    P: StateStore,
{
    /// Load initial content, subscribe to the input surfaces and run the first pass.
    pub fn start(
        mut surfaces: Surfaces<S>,
        engine: DiagnosticsEngine<T, V>,
        store: P,
        mut location: Location,
        defaults: ShareableState,
    ) -> Self {
        let (initial, initial_source) = resolve_initial(&mut location, &store, defaults);
        info!(source = ?initial_source, "loaded initial content");

        surfaces.template.set_value(&initial.template_text);
        surfaces.variables.set_value(&initial.variables_text);

        let (sender, changes) = mpsc::channel();
        for surface in [&mut surfaces.template, &mut surfaces.variables] {
            let sender = sender.clone();
            surface.subscribe(Box::new(move |change| {
                // The receiver only goes away together with the workbench.
                let _ = sender.send(*change);
            }));
        }

        let mut workbench = Self {
            surfaces,
            engine,
            store,
            location,
            initial_source,
            share_link: String::new(),
            last: Reconciliation::default(),
            passes: 0,
            changes,
        };
        workbench.refresh();
        workbench
    }

    /// Run one pass per queued change notification. Returns the number of passes run.
    pub fn pump(&mut self) -> usize {
        let mut passes = 0;
        while let Ok(change) = self.changes.try_recv() {
            debug!(
                surface = change.surface.name(),
                version = change.new_version,
                "input changed"
            );
            self.refresh();
            passes += 1;
        }
        passes
    }

    /// Run one reconciliation pass on the current input text.
    pub fn refresh(&mut self) -> &Reconciliation {
        let template_text = self.surfaces.template.value();
        let variables_text = self.surfaces.variables.value();

        for id in SurfaceId::ALL {
            self.surfaces.get_mut(id).clear_annotations();
        }

        let result = self.engine.reconcile(&template_text, &variables_text);
        debug!(
            fatal = result.fatal,
            template = result.template_annotations.len(),
            variables = result.variables_annotations.len(),
            "reconciled"
        );

        self.surfaces
            .template
            .set_annotations(result.template_annotations.clone());
        self.surfaces
            .variables
            .set_annotations(result.variables_annotations.clone());
        self.surfaces.output.set_value(&result.output);

        self.persist(&template_text, &variables_text);

        let state = ShareableState::new(template_text, variables_text);
        match codec::encode(&state) {
            Ok(token) => self.share_link = self.location.share_link(&token),
            Err(err) => warn!(%err, "failed to encode share link"),
        }

        self.last = result;
        self.passes += 1;
        &self.last
    }

    fn persist(&mut self, template_text: &str, variables_text: &str) {
        for (key, value) in [(TEMPLATE_KEY, template_text), (VARIABLES_KEY, variables_text)] {
            if let Err(err) = self.store.set(key, value) {
                warn!(%err, key, "failed to persist input text");
            }
        }
    }

    /// The three surfaces.
    pub fn surfaces(&self) -> &Surfaces<S> {
        &self.surfaces
    }

    /// Mutably borrow one surface, e.g. to apply a user edit.
    ///
    /// Edits are picked up by the next [`pump`](Self::pump).
    pub fn surface_mut(&mut self, id: SurfaceId) -> &mut S {
        self.surfaces.get_mut(id)
    }

    /// The diagnostics engine.
    pub fn engine(&self) -> &DiagnosticsEngine<T, V> {
        &self.engine
    }

    /// The persisted store.
    pub fn store(&self) -> &P {
        &self.store
    }

    /// The current location (fragment cleared after a successful link load).
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Where the initial content came from.
    pub fn initial_source(&self) -> InitialSource {
        self.initial_source
    }

    /// Link target carrying the current input pair.
    pub fn share_link(&self) -> &str {
        &self.share_link
    }

    /// The most recent pass.
    pub fn last_result(&self) -> &Reconciliation {
        &self.last
    }

    /// Number of passes run so far, including the startup pass.
    pub fn passes(&self) -> u64 {
        self.passes
    }
}

fn resolve_initial<P: StateStore>(
    location: &mut Location,
    store: &P,
    defaults: ShareableState,
) -> (ShareableState, InitialSource) {
    if let Some(token) = location.fragment() {
        match codec::decode(token) {
            Ok(state) => {
                location.clear_fragment();
                return (state, InitialSource::Link);
            }
            Err(err) => warn!(reason = err.reason(), "ignoring undecodable link fragment"),
        }
    }

    if let (Some(template_text), Some(variables_text)) =
        (store.get(TEMPLATE_KEY), store.get(VARIABLES_KEY))
        && !template_text.is_empty()
        && !variables_text.is_empty()
    {
        return (
            ShareableState::new(template_text, variables_text),
            InitialSource::Persisted,
        );
    }

    (defaults, InitialSource::Defaults)
}
