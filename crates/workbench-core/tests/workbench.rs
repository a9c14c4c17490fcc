use pretty_assertions::assert_eq;
use serde_json::Value;
use std::collections::BTreeSet;
use workbench_core::codec::{self, ShareableState};
use workbench_core::store::{TEMPLATE_KEY, VARIABLES_KEY};
use workbench_core::{
    BufferSurface, Diagnostic, DiagnosticKind, DiagnosticsEngine, InitialSource, Location,
    MemoryStore, Severity, StateStore, StoreError, SurfaceId, Surfaces, TemplateCapability,
    TextSurface, VariableEvaluator, Variables, Workbench,
};

/// `{{ name }}` placeholders only; an unclosed `{{` is a syntax error.
struct Placeholders;

fn placeholders(template: &str) -> Result<Vec<(String, usize)>, Diagnostic> {
    let mut out = Vec::new();
    let mut rest = template;
    let mut consumed = 0;
    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open..].find("}}") else {
            return Err(Diagnostic::new(
                DiagnosticKind::TemplateSyntax,
                "unclosed tag",
                1,
                consumed + open + 1,
            ));
        };
        let name = rest[open + 2..open + close].trim().to_string();
        out.push((name, consumed + open + 1));
        consumed += open + close + 2;
        rest = &rest[open + close + 2..];
    }
    Ok(out)
}

impl TemplateCapability for Placeholders {
    fn parse(&self, template: &str) -> Result<BTreeSet<String>, Diagnostic> {
        Ok(placeholders(template)?.into_iter().map(|(n, _)| n).collect())
    }

    fn render(
        &self,
        template: &str,
        variables: &Variables,
        strict: bool,
    ) -> Result<String, Diagnostic> {
        let mut out = template.to_string();
        for (name, column) in placeholders(template)? {
            let value = match variables.get(&name) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None if strict => {
                    return Err(Diagnostic::new(
                        DiagnosticKind::Undefined(Some(name)),
                        "undefined value",
                        1,
                        column,
                    ));
                }
                None => String::new(),
            };
            out = out.replacen(&format!("{{{{ {name} }}}}"), &value, 1);
        }
        Ok(out)
    }
}

struct Json;

impl VariableEvaluator for Json {
    fn evaluate(&self, text: &str) -> Result<Value, Diagnostic> {
        serde_json::from_str(text).map_err(|err| {
            Diagnostic::new(
                DiagnosticKind::VariableSyntax,
                "invalid JSON",
                err.line(),
                err.column(),
            )
        })
    }
}

/// A store whose writes always fail.
#[derive(Default)]
struct ReadOnlyStore(MemoryStore);

impl StateStore for ReadOnlyStore {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key)
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(std::io::Error::other("read-only").into())
    }
}

type TestBench<P> = Workbench<BufferSurface, Placeholders, Json, P>;

fn defaults() -> ShareableState {
    ShareableState::new("Hello, {{ name }}!", r#"{"name": "World"}"#)
}

fn start<P: StateStore>(store: P, location: &str) -> TestBench<P> {
    Workbench::start(
        Surfaces::buffers(),
        DiagnosticsEngine::new(Placeholders, Json),
        store,
        Location::parse(location).unwrap(),
        defaults(),
    )
}

#[test]
fn test_defaults_load_and_render_once() {
    let bench = start(MemoryStore::new(), "http://localhost/");

    assert_eq!(bench.initial_source(), InitialSource::Defaults);
    assert_eq!(bench.passes(), 1);
    assert_eq!(bench.surfaces().output.text(), "Hello, World!");
    assert!(bench.last_result().is_clean());
    assert_eq!(bench.store().get(TEMPLATE_KEY).as_deref(), Some("Hello, {{ name }}!"));
}

#[test]
fn test_link_fragment_wins_and_is_cleared() {
    let shared = ShareableState::new("{{ greeting }}", r#"{"greeting": "hi"}"#);
    let token = codec::encode(&shared).unwrap();
    let store = MemoryStore::with_entries([(TEMPLATE_KEY, "stored"), (VARIABLES_KEY, "{}")]);

    let bench = start(store, &format!("https://example.com/wb/#{token}"));

    assert_eq!(bench.initial_source(), InitialSource::Link);
    assert_eq!(bench.location().fragment(), None);
    assert_eq!(bench.surfaces().template.text(), "{{ greeting }}");
    assert_eq!(bench.surfaces().output.text(), "hi");
    assert_eq!(bench.share_link(), format!("https://example.com/wb/#{token}"));
}

#[test]
fn test_bad_fragment_falls_back_to_persisted_state() {
    let store = MemoryStore::with_entries([
        (TEMPLATE_KEY, "{{ a }}"),
        (VARIABLES_KEY, r#"{"a": 1}"#),
    ]);

    let bench = start(store, "http://localhost/#%%%garbage");

    assert_eq!(bench.initial_source(), InitialSource::Persisted);
    assert_eq!(bench.surfaces().output.text(), "1");
    assert!(bench.location().fragment().is_some());
}

#[test]
fn test_partial_persisted_state_falls_back_to_defaults() {
    let store = MemoryStore::with_entries([(TEMPLATE_KEY, "{{ a }}"), (VARIABLES_KEY, "")]);

    let bench = start(store, "http://localhost/");

    assert_eq!(bench.initial_source(), InitialSource::Defaults);
    assert_eq!(bench.surfaces().template.text(), "Hello, {{ name }}!");
}

#[test]
fn test_each_change_event_runs_one_pass() {
    let mut bench = start(MemoryStore::new(), "http://localhost/");

    let template = bench.surface_mut(SurfaceId::Template);
    template.set_value("Bye, {{ name }}");
    template.insert(15, ".");
    bench
        .surface_mut(SurfaceId::Variables)
        .set_value(r#"{"name": "Moon"}"#);

    assert_eq!(bench.pump(), 3);
    assert_eq!(bench.pump(), 0);
    assert_eq!(bench.passes(), 4);
    assert_eq!(bench.surfaces().output.text(), "Bye, Moon.");
    assert_eq!(bench.store().get(VARIABLES_KEY).as_deref(), Some(r#"{"name": "Moon"}"#));
}

#[test]
fn test_stale_annotations_are_cleared() {
    let mut bench = start(MemoryStore::new(), "http://localhost/");

    bench.surface_mut(SurfaceId::Variables).set_value("{}");
    bench.pump();
    let warnings = bench.surfaces().template.annotations().to_vec();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, Severity::Warning);
    assert_eq!(bench.surfaces().output.text(), "Hello, !");

    bench
        .surface_mut(SurfaceId::Variables)
        .set_value(r#"{"name": "again"}"#);
    bench.pump();
    assert!(bench.surfaces().template.annotations().is_empty());
    assert_eq!(bench.surfaces().output.text(), "Hello, again!");
}

#[test]
fn test_fatal_pass_still_refreshes_share_link() {
    let mut bench = start(MemoryStore::new(), "http://localhost/");
    let before = bench.share_link().to_string();

    bench
        .surface_mut(SurfaceId::Template)
        .set_value("broken {{ draft");
    bench.pump();

    assert!(bench.last_result().fatal);
    assert_eq!(bench.surfaces().template.annotations().len(), 1);
    assert_ne!(bench.share_link(), before);

    let token = bench.share_link().split_once('#').unwrap().1;
    let decoded = codec::decode(token).unwrap();
    assert_eq!(decoded.template_text, "broken {{ draft");
}

#[test]
fn test_persistence_failure_does_not_abort_pass() {
    let mut bench = start(ReadOnlyStore::default(), "http://localhost/");

    bench
        .surface_mut(SurfaceId::Variables)
        .set_value(r#"{"name": "still renders"}"#);
    bench.pump();

    assert_eq!(bench.surfaces().output.text(), "Hello, still renders!");
    assert!(bench.share_link().starts_with("http://localhost/#"));
}
