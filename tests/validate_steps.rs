//! Steps templates: group ordering, loops, and call-site binding.

mod helpers;

use helpers::*;
use workflow_validator::DiagnosticKind;

#[test]
fn later_groups_are_not_visible() {
    let result = run(include_str!("fixtures/steps_future_reference.yaml"));
    assert_eq!(result.diagnostics.len(), 1, "{}", render(&result.diagnostics));
    let d = &result.diagnostics[0];
    assert_eq!(d.kind, DiagnosticKind::UnresolvedReference);
    assert_eq!(d.path, "templates.main.steps[0].a");
    assert_eq!(d.field, "arguments.parameters[0].value");
    assert_eq!(d.message, "failed to resolve {{steps.b.status}}");
}

#[test]
fn siblings_in_a_group_cannot_see_each_other() {
    let result = run(
        r#"
entrypoint: main
templates:
  - name: main
    steps:
      - - name: a
          template: gen
        - name: b
          template: echo
          arguments:
            parameters:
              - name: msg
                value: "{{steps.a.outputs.result}}"
  - name: gen
    script:
      image: python:3.12
      source: print(1)
  - name: echo
    inputs:
      parameters:
        - name: msg
    container:
      image: alpine
"#,
    );
    assert_has(
        &result,
        DiagnosticKind::UnresolvedReference,
        "failed to resolve {{steps.a.outputs.result}}",
    );
}

#[test]
fn loop_items_and_aggregates() {
    let result = run(
        r#"
entrypoint: main
templates:
  - name: main
    steps:
      - - name: gen
          template: gen
          withSequence:
            count: "3"
        - name: each
          template: echo
          withItems: [a, b]
          arguments:
            parameters:
              - name: msg
                value: "{{item}}"
      - - name: sum
          template: echo
          withParam: "{{steps.each.outputs.parameters}}"
          arguments:
            parameters:
              - name: msg
                value: "{{item.total}} {{steps.gen.outputs.result}} {{steps.each.status}}"
  - name: gen
    script:
      image: python:3.12
      source: print(1)
  - name: echo
    inputs:
      parameters:
        - name: msg
    container:
      image: alpine
      args: ["{{inputs.parameters.msg}}"]
"#,
    );
    assert_success(&result);
}

#[test]
fn item_outside_a_loop_is_unresolved() {
    let result = run(
        r#"
entrypoint: main
templates:
  - name: main
    steps:
      - - name: a
          template: echo
          arguments:
            parameters:
              - name: msg
                value: "{{item}}"
  - name: echo
    inputs:
      parameters:
        - name: msg
    container:
      image: alpine
"#,
    );
    assert_has(&result, DiagnosticKind::UnresolvedReference, "failed to resolve {{item}}");
}

#[test]
fn conflicting_loop_sources() {
    let result = run(
        r#"
entrypoint: main
templates:
  - name: main
    steps:
      - - name: a
          template: noop
          withItems: [1]
          withParam: "[1]"
  - name: noop
    suspend: {}
"#,
    );
    assert_has(
        &result,
        DiagnosticKind::BadRequest,
        "only one of withItems, withParam, withSequence can be specified",
    );
}

#[test]
fn missing_input_is_reported_at_the_call_site() {
    let result = run(
        r#"
entrypoint: main
templates:
  - name: main
    steps:
      - - name: a
          template: echo
  - name: echo
    inputs:
      parameters:
        - name: msg
        - name: level
          default: info
      artifacts:
        - name: data
          path: /data
        - name: extra
          path: /extra
          optional: true
    container:
      image: alpine
"#,
    );
    assert_has(&result, DiagnosticKind::BadRequest, "inputs.parameters.msg was not supplied");
    assert_has(&result, DiagnosticKind::BadRequest, "inputs.artifacts.data was not supplied");
    assert!(
        result.diagnostics.iter().all(|d| d.path == "templates.main.steps[0].a"),
        "{}",
        render(&result.diagnostics)
    );
    assert_eq!(result.diagnostics.len(), 2, "{}", render(&result.diagnostics));
}

#[test]
fn step_names_must_be_unique_across_groups() {
    let result = run(
        r#"
entrypoint: main
templates:
  - name: main
    steps:
      - - {name: a, template: noop}
      - - {name: a, template: noop}
  - name: noop
    suspend: {}
"#,
    );
    assert_has(&result, DiagnosticKind::BadRequest, "'a' is not unique");
}

#[test]
fn undefined_step_template() {
    let result = run(
        r#"
entrypoint: main
templates:
  - name: main
    steps:
      - - {name: a, template: nowhere}
"#,
    );
    assert_has(&result, DiagnosticKind::UndefinedTemplate, "template name 'nowhere' undefined");
}
