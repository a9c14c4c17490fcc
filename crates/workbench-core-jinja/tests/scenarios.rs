use pretty_assertions::assert_eq;
use workbench_core::{
    BufferSurface, DiagnosticsEngine, InitialSource, Location, MemoryStore, NOT_A_MAPPING,
    Severity, SurfaceId, Surfaces, TextSurface, VariablesSyntax, Workbench, WorkbenchConfig,
};
use workbench_core_jinja::{ExpressionVariables, JinjaEngine, JinjaTemplates, engine};

fn json_engine() -> JinjaEngine {
    engine(VariablesSyntax::Json)
}

#[test]
fn test_complete_variables_render_cleanly() {
    let result = json_engine().reconcile("Hello, {{ name }}!", r#"{"name": "World"}"#);

    assert_eq!(result.output, "Hello, World!");
    assert!(result.is_clean());
    assert!(!result.fatal);
}

#[test]
fn test_missing_variable_warns_and_renders_best_effort() {
    let result = json_engine().reconcile("Hello, {{ name }}!", "{}");

    assert_eq!(result.output, "Hello, !");
    assert!(result.variables_annotations.is_empty());
    assert_eq!(result.template_annotations.len(), 1);
    let warning = &result.template_annotations[0];
    assert_eq!(warning.severity, Severity::Warning);
    assert_eq!(warning.row, 0);
    assert_eq!(
        warning.message,
        "The following template variable is not defined: name"
    );
}

#[test]
fn test_unclosed_tag_is_fatal() {
    let result = json_engine().reconcile("{{ unclosed", r#"{"unclosed": 1}"#);

    assert!(result.fatal);
    assert_eq!(result.template_annotations.len(), 1);
    let error = &result.template_annotations[0];
    assert_eq!(error.severity, Severity::Error);
    assert_eq!(error.row, 0);
    assert!(error.message.starts_with("TemplateSyntaxError: "));
    assert!(result.variables_annotations.is_empty());
    assert!(
        result
            .output
            .starts_with("Error in the template text:\nTemplateSyntaxError: ")
    );
    assert!(result.variable_sets.is_none());
}

#[test]
fn test_non_mapping_variables_are_a_type_error() {
    let result = json_engine().reconcile("{{ name }}", r#""not a dict""#);

    assert!(result.fatal);
    assert!(result.template_annotations.is_empty());
    assert_eq!(result.variables_annotations.len(), 1);
    assert_eq!(
        result.variables_annotations[0].message,
        format!("TypeError: {NOT_A_MAPPING}")
    );
    assert_eq!(
        (result.variables_annotations[0].row, result.variables_annotations[0].column),
        (0, 0)
    );
}

#[test]
fn test_extra_variable_warns_on_variables_surface() {
    let result = json_engine().reconcile("{{ name }}", r#"{"name": "World", "extra": 1}"#);

    assert_eq!(result.output, "World");
    assert!(result.template_annotations.is_empty());
    assert_eq!(result.variables_annotations.len(), 1);
    assert_eq!(
        result.variables_annotations[0].message,
        "The following user variable is not mentioned in the template: extra"
    );
    assert_eq!(result.variables_annotations[0].severity, Severity::Warning);
}

#[test]
fn test_variable_syntax_error_reports_row_of_failure() {
    let result = json_engine().reconcile("{{ a }}", "{\n  \"a\": 1,\n  oops\n}");

    assert!(result.fatal);
    assert_eq!(result.variables_annotations.len(), 1);
    assert_eq!(result.variables_annotations[0].row, 2);
    assert!(
        result.variables_annotations[0]
            .message
            .starts_with("SyntaxError: ")
    );
    assert!(result.output.starts_with("Error in the variable definitions:\n"));
}

#[test]
fn test_nested_attribute_is_found_by_strict_render() {
    let result = json_engine().reconcile("{{ user.email }}", r#"{"user": {}}"#);

    assert!(!result.fatal);
    assert_eq!(result.undefined, vec!["email"]);
    assert_eq!(result.output, "");
    assert_eq!(
        result.template_annotations[0].message,
        "The following template variable is not defined: email"
    );
}

#[test]
fn test_filtered_variable_is_reported_not_the_filter() {
    let result = json_engine().reconcile("{{ name | upper }}", "{}");

    assert!(!result.fatal);
    assert_eq!(result.undefined, vec!["name"]);
    assert_eq!(
        result.template_annotations[0].message,
        "The following template variable is not defined: name"
    );
}

#[test]
fn test_unbound_root_is_reported_not_its_attribute() {
    let result = json_engine().reconcile("{{ user.email }}", "{}");

    assert!(!result.fatal);
    assert_eq!(result.undefined, vec!["user"]);
}

#[test]
fn test_first_missing_link_of_a_chain_is_reported() {
    let result = json_engine().reconcile("{{ a.b.c }}", r#"{"a": {}}"#);

    assert!(!result.fatal);
    assert_eq!(result.undefined, vec!["b"]);
}

#[test]
fn test_several_missing_variables_are_pluralised() {
    let result = json_engine().reconcile("{{ b }} {{ a }}", "{}");

    assert_eq!(result.undefined[0], "b");
    assert_eq!(result.undefined.len(), 2);
    assert!(
        result.template_annotations[0]
            .message
            .starts_with("The following template variables are not defined: b, ")
    );
}

#[test]
fn test_runtime_failure_is_reported_as_error() {
    let result = json_engine().reconcile(r#"{{ "a" + 1 }}"#, "{}");

    assert!(!result.fatal);
    assert_eq!(result.template_annotations.len(), 1);
    assert_eq!(result.template_annotations[0].severity, Severity::Error);
    assert!(!result.output.is_empty());
}

#[test]
fn test_expression_variables() {
    let engine = DiagnosticsEngine::new(JinjaTemplates, ExpressionVariables);
    let result = engine.reconcile(
        "{% for x in items %}{{ x }},{% endfor %}",
        "{'items': [1, 2, 3]}",
    );

    assert_eq!(result.output, "1,2,3,");
    assert!(result.is_clean());
}

#[test]
fn test_reconcile_is_idempotent() {
    let engine = json_engine();
    let first = engine.reconcile("{{ a }}{{ b.c }}", r#"{"b": {}, "z": 0}"#);
    let second = engine.reconcile("{{ a }}{{ b.c }}", r#"{"b": {}, "z": 0}"#);

    assert_eq!(first, second);
}

#[test]
fn test_shared_link_reopens_the_same_draft() {
    let config = WorkbenchConfig::default();
    let mut author = Workbench::start(
        Surfaces::<BufferSurface>::buffers(),
        json_engine(),
        MemoryStore::new(),
        config.location().unwrap(),
        config.default_state(),
    );
    assert_eq!(author.initial_source(), InitialSource::Defaults);
    assert_eq!(author.surfaces().output.text(), "Hello, World!");

    author
        .surface_mut(SurfaceId::Template)
        .set_value("{% if broken %}");
    author.pump();
    assert!(author.last_result().fatal);

    let reader = Workbench::start(
        Surfaces::<BufferSurface>::buffers(),
        json_engine(),
        MemoryStore::new(),
        Location::parse(author.share_link()).unwrap(),
        config.default_state(),
    );
    assert_eq!(reader.initial_source(), InitialSource::Link);
    assert_eq!(reader.surfaces().template.value(), "{% if broken %}");
    assert_eq!(reader.surfaces().variables.value(), r#"{"name": "World"}"#);
    assert_eq!(reader.location().fragment(), None);
}
