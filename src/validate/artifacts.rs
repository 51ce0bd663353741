//! Artifact-location rules: one populated variant, its required fields, and
//! mutually exclusive options within a variant.

use crate::parse::types::{ArtifactLocation, GitArtifact, HdfsArtifact, LocationVariant};

/// A problem at `field`, relative to the location being checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationIssue {
    pub field: String,
    pub message: String,
}

impl LocationIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        LocationIssue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check a location. An empty location is not an issue here; callers that
/// need a concrete location check `has_location` themselves.
pub fn check_location(loc: &ArtifactLocation) -> Vec<LocationIssue> {
    let variants = loc.variants();
    if variants.len() > 1 {
        let names: Vec<&str> = variants.iter().map(|v| v.name()).collect();
        return vec![LocationIssue::new(
            "",
            format!(
                "only one artifact location may be specified, found: {}",
                names.join(", ")
            ),
        )];
    }

    let mut issues = Vec::new();
    let Some(variant) = variants.first() else {
        return issues;
    };
    match variant {
        LocationVariant::Git(git) => check_git(git, &mut issues),
        LocationVariant::Http(h) => require(&mut issues, &h.url, "http.url"),
        LocationVariant::S3(s) => require(&mut issues, &s.key, "s3.key"),
        LocationVariant::Hdfs(h) => check_hdfs(h, &mut issues),
        LocationVariant::Gcs(g) => require(&mut issues, &g.key, "gcs.key"),
        LocationVariant::Oss(o) => require(&mut issues, &o.key, "oss.key"),
        LocationVariant::Azure(a) => require(&mut issues, &a.blob, "azure.blob"),
        LocationVariant::Artifactory(a) => require(&mut issues, &a.url, "artifactory.url"),
        LocationVariant::Raw(r) => require(&mut issues, &r.data, "raw.data"),
    }
    issues
}

fn require(issues: &mut Vec<LocationIssue>, value: &str, field: &str) {
    if value.trim().is_empty() {
        issues.push(LocationIssue::new(field, format!("{} is required", field)));
    }
}

fn check_git(git: &GitArtifact, issues: &mut Vec<LocationIssue>) {
    require(issues, &git.repo, "git.repo");
    if git.ssh_private_key_secret.is_some()
        && (git.username_secret.is_some() || git.password_secret.is_some())
    {
        issues.push(LocationIssue::new(
            "git.sshPrivateKeySecret",
            "git.sshPrivateKeySecret cannot be combined with git.usernameSecret or git.passwordSecret",
        ));
    }
}

fn check_hdfs(hdfs: &HdfsArtifact, issues: &mut Vec<LocationIssue>) {
    if hdfs.addresses.iter().all(|a| a.trim().is_empty()) {
        issues.push(LocationIssue::new(
            "hdfs.addresses",
            "hdfs.addresses must contain at least one address",
        ));
    }
    require(issues, &hdfs.path, "hdfs.path");

    let ccache = hdfs.krb_c_cache_secret.is_some();
    let keytab = hdfs.krb_keytab_secret.is_some();
    if ccache && keytab {
        issues.push(LocationIssue::new(
            "hdfs.krbCCacheSecret",
            "hdfs.krbCCacheSecret and hdfs.krbKeytabSecret cannot be set at the same time",
        ));
        return;
    }

    let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    let mut needed: Vec<&str> = Vec::new();
    if keytab {
        if !set(&hdfs.krb_username) {
            needed.push("krbUsername");
        }
        if !set(&hdfs.krb_realm) {
            needed.push("krbRealm");
        }
    }
    if ccache || keytab {
        if hdfs.krb_config_config_map.is_none() {
            needed.push("krbConfigConfigMap");
        }
        if !set(&hdfs.krb_service_principal_name) {
            needed.push("krbServicePrincipalName");
        }
    }
    let secret = if keytab { "krbKeytabSecret" } else { "krbCCacheSecret" };
    for field in needed {
        issues.push(LocationIssue::new(
            format!("hdfs.{}", field),
            format!("hdfs.{} is required with hdfs.{}", field, secret),
        ));
    }
}
