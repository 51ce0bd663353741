//! Template-level rules: body type, execution policies, leaf bodies,
//! declared outputs, and artifact locations.

mod helpers;

use helpers::*;
use workflow_validator::{DiagnosticKind, ExecutorKind, ValidateOpts};

/// Wrap a single template as the entrypoint of a workflow.
fn single(template: &str) -> String {
    let indented: String = template
        .lines()
        .map(|l| format!("    {}\n", l))
        .collect();
    format!("entrypoint: main\ntemplates:\n  - name: main\n{}", indented)
}

#[test]
fn body_type_is_required_and_unique() {
    let result = run(&single("inputs: {}"));
    assert_has(&result, DiagnosticKind::BadRequest, "template type unspecified");

    let result = run(&single("container: {image: alpine}\nsuspend: {}"));
    assert_has(
        &result,
        DiagnosticKind::BadRequest,
        "multiple template types specified: container, suspend",
    );
}

#[test]
fn container_output_from_parameter_is_incompatible() {
    let result = run(&single(
        r#"
container:
  image: alpine
outputs:
  parameters:
    - name: out
      valueFrom:
        parameter: "{{inputs.parameters.x}}"
"#,
    ));
    assert_has(
        &result,
        DiagnosticKind::IncompatibleValueFrom,
        "path must be specified for container templates",
    );
}

#[test]
fn output_value_sources_per_kind() {
    assert_success(&run(&single(
        r#"
resource:
  action: create
  manifest: |
    apiVersion: v1
    kind: ConfigMap
    metadata:
      name: {{workflow.name}}-cm
outputs:
  parameters:
    - name: uid
      valueFrom:
        jsonPath: "{.metadata.uid}"
"#,
    )));

    assert_success(&run(&single(
        r#"
suspend:
  duration: "1h30m"
outputs:
  parameters:
    - name: approved
      valueFrom:
        supplied: {}
        default: "no"
"#,
    )));

    let result = run(&single(
        r#"
suspend: {}
outputs:
  parameters:
    - name: a
      value: x
      valueFrom:
        supplied: {}
    - name: b
    - name: c
      valueFrom:
        default: "1"
    - name: d
      valueFrom:
        path: /d
        jqFilter: .d
"#,
    ));
    assert_has(&result, DiagnosticKind::BadRequest, "has both valueFrom and value specified");
    assert_has(&result, DiagnosticKind::BadRequest, "valueFrom is required");
    assert_has(&result, DiagnosticKind::BadRequest, "valueFrom type unspecified");
    assert_has(&result, DiagnosticKind::BadRequest, "multiple valueFrom types specified: path, jqFilter");
}

#[test]
fn global_name_must_be_literal() {
    let result = run(&single(
        r#"
container:
  image: alpine
outputs:
  parameters:
    - name: out
      globalName: "{{inputs.parameters.n}}"
      valueFrom:
        path: /out
"#,
    ));
    assert_has(&result, DiagnosticKind::BadRequest, "globalName must be a literal name");
}

#[test]
fn execution_policies() {
    let result = run(&single(
        r#"
container:
  image: alpine
parallelism: 2
activeDeadlineSeconds: 0
timeout: 30
retryStrategy:
  limit: 3
  retryPolicy: Sometimes
"#,
    ));
    assert_has(&result, DiagnosticKind::BadRequest, "parallelism is only valid for steps and dag templates");
    assert_has(&result, DiagnosticKind::BadRequest, "activeDeadlineSeconds must be a positive integer");
    assert_has(&result, DiagnosticKind::BadRequest, "invalid timeout format '30'");
    assert_has(&result, DiagnosticKind::BadRequest, "retryPolicy 'Sometimes' is invalid");

    let result = run(&(single(
        r#"
steps:
  - - {name: a, template: leaf}
retryStrategy:
  limit: 1
activeDeadlineSeconds: 10
"#,
    ) + "  - name: leaf\n    suspend: {}\n"));
    assert_has(&result, DiagnosticKind::BadRequest, "retryStrategy is only valid for");
    assert_has(&result, DiagnosticKind::BadRequest, "activeDeadlineSeconds is only valid for leaf templates");
}

#[test]
fn retry_variables_are_in_scope() {
    assert_success(&run(&single(
        r#"
retryStrategy:
  limit: "{{workflow.parameters.retries}}"
container:
  image: alpine
  args: ["{{retries}}", "{{lastRetry.exitCode}}", "{{pod.name}}"]
"#,
    )
    .replace("entrypoint: main", "entrypoint: main\narguments:\n  parameters:\n    - {name: retries, value: \"2\"}")));
}

#[test]
fn leaf_bodies() {
    let result = run(&single(
        r#"
inputs:
  artifacts:
    - name: src
      path: /work
      git:
        repo: https://example.com/src.git
container:
  image: ""
  volumeMounts:
    - {name: a, mountPath: /work}
    - {name: b, mountPath: /work}
"#,
    ));
    assert_has(&result, DiagnosticKind::BadRequest, "container.image may not be empty");
    assert_has(&result, DiagnosticKind::BadRequest, "mountPath '/work' is already used by volumeMounts[0]");
    assert_has(&result, DiagnosticKind::BadRequest, "path '/work' already mounted in container.volumeMounts");

    let result = run(&single("resource:\n  action: create\n  manifest: \"key: [unclosed\"\n"));
    assert_has(&result, DiagnosticKind::BadRequest, "resource.manifest must be a valid yaml");

    let result = run(&single("resource:\n  action: explode\n"));
    assert_has(&result, DiagnosticKind::BadRequest, "action 'explode' is invalid");

    let result = run(&single("suspend:\n  duration: soon\n"));
    assert_has(&result, DiagnosticKind::BadRequest, "invalid suspend duration 'soon'");

    let result = run(&single("suspend:\n  duration: \"-5\"\n"));
    assert_has(&result, DiagnosticKind::BadRequest, "invalid suspend duration '-5'");
}

#[test]
fn artifact_locations() {
    let result = run(&single(
        r#"
container:
  image: alpine
outputs:
  artifacts:
    - name: report
      path: /tmp/report
      s3:
        key: reports/latest
      http:
        url: https://example.com/report
    - name: logs
      path: /tmp/logs
      hdfs:
        addresses: [nn:8020]
        path: /logs
        krbCCacheSecret: {name: krb, key: ccache}
archiveLocation:
  git: {}
"#,
    ));
    assert_has(&result, DiagnosticKind::BadRequest, "only one artifact location may be specified, found: http, s3");
    assert_has(
        &result,
        DiagnosticKind::BadRequest,
        "hdfs.krbConfigConfigMap is required with hdfs.krbCCacheSecret",
    );
    assert_has(&result, DiagnosticKind::BadRequest, "git.repo is required");
}

#[test]
fn input_artifact_path_rules() {
    let result = run(
        r#"
entrypoint: main
templates:
  - name: main
    inputs:
      artifacts:
        - name: data
          path: /data
          from: "{{workflow.outputs.artifacts.x}}"
          raw:
            data: hello
    steps:
      - - {name: a, template: leaf}
  - name: leaf
    inputs:
      artifacts:
        - name: data
          raw:
            data: hello
    container:
      image: alpine
"#,
    );
    assert_has(&result, DiagnosticKind::BadRequest, "from not valid in inputs");
    assert_has(&result, DiagnosticKind::BadRequest, "path only valid in container/script templates");
    assert_has(&result, DiagnosticKind::BadRequest, "path not specified");
}

#[test]
fn base_image_outputs_depend_on_executor() {
    let template = r#"
container:
  image: alpine
  volumeMounts:
    - {name: out, mountPath: /mnt/out}
outputs:
  parameters:
    - name: inside
      valueFrom:
        path: /mnt/out/p
    - name: outside
      valueFrom:
        path: /tmp/p
"#;
    assert_success(&run(&single(template)));

    let opts = ValidateOpts {
        executor_kind: ExecutorKind::KubernetesApi,
        ..Default::default()
    };
    let result = run_with(&single(template), &opts);
    assert_eq!(result.diagnostics.len(), 1, "{}", render(&result.diagnostics));
    assert_eq!(result.diagnostics[0].field, "outputs.parameters.outside.valueFrom.path");
    assert_has(
        &result,
        DiagnosticKind::BadRequest,
        "executor 'k8sapi' does not support outputs from base image layer",
    );
}

#[test]
fn enum_values() {
    let result = run(
        r#"
entrypoint: main
arguments:
  parameters:
    - name: env
      value: qa
      enum: [dev, prod]
templates:
  - name: main
    inputs:
      parameters:
        - name: env
          enum: [dev, prod]
        - name: empty
          default: x
          enum: []
    container:
      image: alpine
"#,
    );
    assert_has(&result, DiagnosticKind::BadRequest, "value 'qa' is not in the enum list");
    assert_has(
        &result,
        DiagnosticKind::BadRequest,
        "value 'qa' for inputs.parameters.env is not in the enum list",
    );
    assert_has(&result, DiagnosticKind::BadRequest, "enum should contain at least one value");
}
