//! Serde types for the workflow document.
//!
//! Field names follow the camelCase wire format. Unknown fields of the
//! container/script/resource specs and of templates are retained in `extra`
//! maps so that `{{...}}` references inside them are still checked.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

// =============================================================================
// SCALARS
// =============================================================================

/// A string that also accepts numbers and booleans on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AnyString(pub String);

impl AnyString {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AnyString {
    fn from(s: &str) -> Self {
        AnyString(s.to_string())
    }
}

impl std::fmt::Display for AnyString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for AnyString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AnyString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(AnyString(match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        }))
    }
}

/// Kubernetes-style int-or-string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntOrString {
    Int(i64),
    Str(String),
}

impl IntOrString {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            IntOrString::Int(i) => Some(*i),
            IntOrString::Str(s) => s.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for IntOrString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntOrString::Int(i) => write!(f, "{}", i),
            IntOrString::Str(s) => f.write_str(s),
        }
    }
}

// =============================================================================
// TOP-LEVEL DOCUMENT
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowDoc {
    pub metadata: Metadata,
    pub entrypoint: Option<String>,
    pub on_exit: Option<String>,
    pub arguments: Arguments,
    pub templates: Vec<Template>,
    pub workflow_metadata: Option<WorkflowMetadata>,
    pub priority: Option<i32>,
    pub service_account_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub name: Option<String>,
    pub generate_name: Option<String>,
    pub namespace: Option<String>,
    pub uid: Option<String>,
    pub annotations: BTreeMap<String, AnyString>,
    pub labels: BTreeMap<String, AnyString>,
}

/// Labels and annotations applied to every run of the workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowMetadata {
    pub annotations: BTreeMap<String, AnyString>,
    pub labels: BTreeMap<String, AnyString>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Arguments {
    pub parameters: Vec<Parameter>,
    pub artifacts: Vec<Artifact>,
}

impl Arguments {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn artifact(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Outputs {
    pub parameters: Vec<Parameter>,
    pub artifacts: Vec<Artifact>,
    pub result: Option<String>,
    pub exit_code: Option<String>,
}

// =============================================================================
// PARAMETERS
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Parameter {
    pub name: String,
    pub value: Option<AnyString>,
    pub default: Option<AnyString>,
    pub value_from: Option<ValueFrom>,
    pub global_name: Option<String>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<AnyString>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValueFrom {
    pub path: Option<String>,
    pub jq_filter: Option<String>,
    pub json_path: Option<String>,
    pub parameter: Option<String>,
    pub expression: Option<String>,
    pub supplied: Option<SuppliedValueFrom>,
    pub default: Option<AnyString>,
    pub config_map_key_ref: Option<ConfigMapKeySelector>,
    pub event: Option<String>,
}

/// Marker for a value supplied at runtime (e.g. by resuming a suspend).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppliedValueFrom {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigMapKeySelector {
    pub name: String,
    pub key: String,
    pub optional: Option<bool>,
}

/// The single populated source of a `valueFrom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Path,
    JqFilter,
    JsonPath,
    Parameter,
    Expression,
    Supplied,
    ConfigMapKeyRef,
    Event,
}

impl ValueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueSource::Path => "path",
            ValueSource::JqFilter => "jqFilter",
            ValueSource::JsonPath => "jsonPath",
            ValueSource::Parameter => "parameter",
            ValueSource::Expression => "expression",
            ValueSource::Supplied => "supplied",
            ValueSource::ConfigMapKeyRef => "configMapKeyRef",
            ValueSource::Event => "event",
        }
    }
}

fn set(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.is_empty())
}

impl ValueFrom {
    /// Every populated source, in declaration order.
    pub fn sources(&self) -> Vec<ValueSource> {
        let mut out = Vec::new();
        if set(&self.path) {
            out.push(ValueSource::Path);
        }
        if set(&self.jq_filter) {
            out.push(ValueSource::JqFilter);
        }
        if set(&self.json_path) {
            out.push(ValueSource::JsonPath);
        }
        if set(&self.parameter) {
            out.push(ValueSource::Parameter);
        }
        if set(&self.expression) {
            out.push(ValueSource::Expression);
        }
        if self.supplied.is_some() {
            out.push(ValueSource::Supplied);
        }
        if self.config_map_key_ref.is_some() {
            out.push(ValueSource::ConfigMapKeyRef);
        }
        if set(&self.event) {
            out.push(ValueSource::Event);
        }
        out
    }
}

// =============================================================================
// ARTIFACTS
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Artifact {
    pub name: String,
    pub path: Option<String>,
    pub from: Option<String>,
    pub global_name: Option<String>,
    pub optional: bool,
    pub mode: Option<i32>,
    #[serde(flatten)]
    pub location: ArtifactLocation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtifactLocation {
    pub archive_logs: Option<bool>,
    pub git: Option<GitArtifact>,
    pub http: Option<HttpArtifact>,
    pub s3: Option<S3Artifact>,
    pub hdfs: Option<HdfsArtifact>,
    pub gcs: Option<GcsArtifact>,
    pub oss: Option<OssArtifact>,
    pub azure: Option<AzureArtifact>,
    pub artifactory: Option<ArtifactoryArtifact>,
    pub raw: Option<RawArtifact>,
}

/// A borrowed view of the populated location variant.
#[derive(Debug, Clone, Copy)]
pub enum LocationVariant<'a> {
    Git(&'a GitArtifact),
    Http(&'a HttpArtifact),
    S3(&'a S3Artifact),
    Hdfs(&'a HdfsArtifact),
    Gcs(&'a GcsArtifact),
    Oss(&'a OssArtifact),
    Azure(&'a AzureArtifact),
    Artifactory(&'a ArtifactoryArtifact),
    Raw(&'a RawArtifact),
}

impl LocationVariant<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            LocationVariant::Git(_) => "git",
            LocationVariant::Http(_) => "http",
            LocationVariant::S3(_) => "s3",
            LocationVariant::Hdfs(_) => "hdfs",
            LocationVariant::Gcs(_) => "gcs",
            LocationVariant::Oss(_) => "oss",
            LocationVariant::Azure(_) => "azure",
            LocationVariant::Artifactory(_) => "artifactory",
            LocationVariant::Raw(_) => "raw",
        }
    }
}

impl ArtifactLocation {
    pub fn variants(&self) -> Vec<LocationVariant<'_>> {
        let mut out = Vec::new();
        if let Some(g) = &self.git {
            out.push(LocationVariant::Git(g));
        }
        if let Some(h) = &self.http {
            out.push(LocationVariant::Http(h));
        }
        if let Some(s) = &self.s3 {
            out.push(LocationVariant::S3(s));
        }
        if let Some(h) = &self.hdfs {
            out.push(LocationVariant::Hdfs(h));
        }
        if let Some(g) = &self.gcs {
            out.push(LocationVariant::Gcs(g));
        }
        if let Some(o) = &self.oss {
            out.push(LocationVariant::Oss(o));
        }
        if let Some(a) = &self.azure {
            out.push(LocationVariant::Azure(a));
        }
        if let Some(a) = &self.artifactory {
            out.push(LocationVariant::Artifactory(a));
        }
        if let Some(r) = &self.raw {
            out.push(LocationVariant::Raw(r));
        }
        out
    }

    pub fn has_location(&self) -> bool {
        !self.variants().is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretKeySelector {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GitArtifact {
    pub repo: String,
    pub revision: Option<String>,
    pub depth: Option<u64>,
    pub username_secret: Option<SecretKeySelector>,
    pub password_secret: Option<SecretKeySelector>,
    pub ssh_private_key_secret: Option<SecretKeySelector>,
    pub insecure_ignore_host_key: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpArtifact {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct S3Artifact {
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub key: String,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HdfsArtifact {
    pub addresses: Vec<String>,
    pub path: String,
    pub hdfs_user: Option<String>,
    pub krb_c_cache_secret: Option<SecretKeySelector>,
    pub krb_keytab_secret: Option<SecretKeySelector>,
    pub krb_username: Option<String>,
    pub krb_realm: Option<String>,
    pub krb_config_config_map: Option<ConfigMapKeySelector>,
    pub krb_service_principal_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GcsArtifact {
    pub bucket: Option<String>,
    pub key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OssArtifact {
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AzureArtifact {
    pub endpoint: Option<String>,
    pub container: Option<String>,
    pub blob: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtifactoryArtifact {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawArtifact {
    pub data: String,
}

// =============================================================================
// TEMPLATES
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Template {
    pub name: String,
    pub inputs: Arguments,
    pub outputs: Outputs,
    pub container: Option<Container>,
    pub script: Option<Script>,
    pub resource: Option<Resource>,
    pub suspend: Option<Suspend>,
    pub steps: Option<Vec<Vec<WorkflowStep>>>,
    pub dag: Option<DagTemplate>,
    pub daemon: Option<bool>,
    pub parallelism: Option<IntOrString>,
    pub active_deadline_seconds: Option<IntOrString>,
    pub retry_strategy: Option<RetryStrategy>,
    pub timeout: Option<IntOrString>,
    pub archive_location: Option<ArtifactLocation>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Container {
    pub image: Option<String>,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub working_dir: Option<String>,
    pub volume_mounts: Vec<VolumeMount>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Script {
    pub source: String,
    #[serde(flatten)]
    pub container: Container,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Resource {
    pub action: String,
    pub manifest: Option<String>,
    pub success_condition: Option<String>,
    pub failure_condition: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Suspend {
    pub duration: Option<IntOrString>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryStrategy {
    pub limit: Option<IntOrString>,
    pub retry_policy: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Sequence {
    pub count: Option<IntOrString>,
    pub start: Option<IntOrString>,
    pub end: Option<IntOrString>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContinueOn {
    pub error: bool,
    pub failed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowStep {
    pub name: String,
    pub template: String,
    pub arguments: Arguments,
    pub with_items: Option<Vec<Value>>,
    pub with_param: Option<String>,
    pub with_sequence: Option<Sequence>,
    pub when: Option<String>,
    pub continue_on: Option<ContinueOn>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DagTemplate {
    pub target: Option<String>,
    pub fail_fast: Option<bool>,
    pub tasks: Vec<DagTask>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DagTask {
    pub name: String,
    pub template: String,
    pub arguments: Arguments,
    pub dependencies: Vec<String>,
    pub depends: Option<String>,
    pub with_items: Option<Vec<Value>>,
    pub with_param: Option<String>,
    pub with_sequence: Option<Sequence>,
    pub when: Option<String>,
    pub continue_on: Option<ContinueOn>,
}

/// Loop sources shared by steps and tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopSpec<'a> {
    pub with_items: Option<&'a [Value]>,
    pub with_param: Option<&'a str>,
    pub with_sequence: Option<&'a Sequence>,
}

impl LoopSpec<'_> {
    /// Whether the call fans out into an aggregated list of results.
    pub fn aggregates(&self) -> bool {
        self.with_items.is_some_and(|i| !i.is_empty())
            || self.with_param.is_some_and(|p| !p.is_empty())
    }

    pub fn is_loop(&self) -> bool {
        self.aggregates() || self.with_sequence.is_some()
    }
}

impl WorkflowStep {
    pub fn loop_spec(&self) -> LoopSpec<'_> {
        LoopSpec {
            with_items: self.with_items.as_deref(),
            with_param: self.with_param.as_deref(),
            with_sequence: self.with_sequence.as_ref(),
        }
    }
}

impl DagTask {
    pub fn loop_spec(&self) -> LoopSpec<'_> {
        LoopSpec {
            with_items: self.with_items.as_deref(),
            with_param: self.with_param.as_deref(),
            with_sequence: self.with_sequence.as_ref(),
        }
    }

    pub fn uses_depends(&self) -> bool {
        self.depends.as_deref().is_some_and(|d| !d.trim().is_empty())
    }
}

// =============================================================================
// TEMPLATE VARIANTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Container,
    Script,
    Resource,
    Suspend,
    Steps,
    Dag,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Container => "container",
            TemplateKind::Script => "script",
            TemplateKind::Resource => "resource",
            TemplateKind::Suspend => "suspend",
            TemplateKind::Steps => "steps",
            TemplateKind::Dag => "dag",
        }
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self, TemplateKind::Steps | TemplateKind::Dag)
    }

    /// Leaf kinds that run in a pod.
    pub fn runs_pod(&self) -> bool {
        matches!(
            self,
            TemplateKind::Container | TemplateKind::Script | TemplateKind::Resource
        )
    }

    /// Kinds that capture stdout and an exit code.
    pub fn has_result(&self) -> bool {
        matches!(self, TemplateKind::Container | TemplateKind::Script)
    }
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The variant payload of a template. Exactly one is populated in a valid document.
#[derive(Debug, Clone, Copy)]
pub enum TemplateBody<'a> {
    Container(&'a Container),
    Script(&'a Script),
    Resource(&'a Resource),
    Suspend(&'a Suspend),
    Steps(&'a [Vec<WorkflowStep>]),
    Dag(&'a DagTemplate),
}

impl<'a> TemplateBody<'a> {
    pub fn kind(&self) -> TemplateKind {
        match self {
            TemplateBody::Container(_) => TemplateKind::Container,
            TemplateBody::Script(_) => TemplateKind::Script,
            TemplateBody::Resource(_) => TemplateKind::Resource,
            TemplateBody::Suspend(_) => TemplateKind::Suspend,
            TemplateBody::Steps(_) => TemplateKind::Steps,
            TemplateBody::Dag(_) => TemplateKind::Dag,
        }
    }

    pub fn container(&self) -> Option<&'a Container> {
        match *self {
            TemplateBody::Container(c) => Some(c),
            TemplateBody::Script(s) => Some(&s.container),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyError {
    Unspecified,
    Multiple(Vec<TemplateKind>),
}

impl Template {
    /// Populated variant fields, in declaration order.
    pub fn populated_kinds(&self) -> Vec<TemplateKind> {
        let mut kinds = Vec::new();
        if self.container.is_some() {
            kinds.push(TemplateKind::Container);
        }
        if self.script.is_some() {
            kinds.push(TemplateKind::Script);
        }
        if self.resource.is_some() {
            kinds.push(TemplateKind::Resource);
        }
        if self.suspend.is_some() {
            kinds.push(TemplateKind::Suspend);
        }
        if self.steps.is_some() {
            kinds.push(TemplateKind::Steps);
        }
        if self.dag.is_some() {
            kinds.push(TemplateKind::Dag);
        }
        kinds
    }

    pub fn body(&self) -> Result<TemplateBody<'_>, BodyError> {
        let kinds = self.populated_kinds();
        if kinds.len() > 1 {
            return Err(BodyError::Multiple(kinds));
        }
        if let Some(c) = &self.container {
            return Ok(TemplateBody::Container(c));
        }
        if let Some(s) = &self.script {
            return Ok(TemplateBody::Script(s));
        }
        if let Some(r) = &self.resource {
            return Ok(TemplateBody::Resource(r));
        }
        if let Some(s) = &self.suspend {
            return Ok(TemplateBody::Suspend(s));
        }
        if let Some(groups) = &self.steps {
            return Ok(TemplateBody::Steps(groups));
        }
        if let Some(d) = &self.dag {
            return Ok(TemplateBody::Dag(d));
        }
        Err(BodyError::Unspecified)
    }

    pub fn kind(&self) -> Option<TemplateKind> {
        self.body().ok().map(|b| b.kind())
    }

    pub fn is_daemon(&self) -> bool {
        self.daemon.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_string_accepts_scalars() {
        let p: Parameter = serde_json::from_value(serde_json::json!({
            "name": "n", "value": 3, "default": true
        }))
        .unwrap();
        assert_eq!(p.value.unwrap().as_str(), "3");
        assert_eq!(p.default.unwrap().as_str(), "true");
    }

    #[test]
    fn body_counts_variants() {
        let t: Template = serde_json::from_value(serde_json::json!({
            "name": "t", "container": {"image": "alpine"}, "suspend": {}
        }))
        .unwrap();
        assert_eq!(
            t.body().unwrap_err(),
            BodyError::Multiple(vec![TemplateKind::Container, TemplateKind::Suspend])
        );

        let empty: Template = serde_json::from_value(serde_json::json!({"name": "t"})).unwrap();
        assert_eq!(empty.body().unwrap_err(), BodyError::Unspecified);
    }

    #[test]
    fn script_flattens_container_fields() {
        let t: Template = serde_json::from_value(serde_json::json!({
            "name": "s",
            "script": {"image": "python", "source": "print(1)", "resources": {"limits": {}}}
        }))
        .unwrap();
        let Ok(TemplateBody::Script(s)) = t.body() else {
            panic!("expected script body");
        };
        assert_eq!(s.container.image.as_deref(), Some("python"));
        assert!(s.container.extra.contains_key("resources"));
    }

    #[test]
    fn artifact_location_is_flattened() {
        let a: Artifact = serde_json::from_value(serde_json::json!({
            "name": "src", "path": "/src", "git": {"repo": "https://example.com/r.git"}
        }))
        .unwrap();
        let variants = a.location.variants();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].name(), "git");
    }

    #[test]
    fn value_from_sources_in_order() {
        let vf: ValueFrom = serde_json::from_value(serde_json::json!({
            "path": "/tmp/out", "supplied": {}
        }))
        .unwrap();
        assert_eq!(vf.sources(), vec![ValueSource::Path, ValueSource::Supplied]);
    }
}
