//! Explicit configuration passed to the validator and the treeinfo
//! resolver, plus the repository descriptor model.
//!
//! The source these APIs replace kept this state in process-wide
//! singletons; here it travels as plain structs.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeSet;
use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

/// Where a repository record came from.  Treeinfo-derived records are
/// read-only from the UI's perspective and are replaced wholesale on
/// every refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoOrigin {
    User,
    System,
    TreeInfo,
}

/// How the repository URL is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoType {
    BaseUrl,
    MirrorList,
    MetaLink,
    Nfs,
}

/// A package repository descriptor, the unit consumed by the
/// package-install executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    pub name: String,
    pub origin: RepoOrigin,
    #[serde(rename = "type")]
    pub rtype: RepoType,
    /// Absolute URL of the repository.
    pub url: String,
    pub proxy: Option<String>,
    pub ssl_verify: bool,
    pub ssl_ca_cert: Option<String>,
    pub ssl_client_cert: Option<String>,
    pub ssl_client_key: Option<String>,
    pub enabled: bool,
    /// Path relative to the installation tree root, for treeinfo
    /// variants ("." marks the root repository).
    pub relative_path: Option<String>,
}

impl RepoConfig {
    pub fn with_url(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            origin: RepoOrigin::User,
            rtype: RepoType::BaseUrl,
            url: url.to_string(),
            proxy: None,
            ssl_verify: true,
            ssl_ca_cert: None,
            ssl_client_cert: None,
            ssl_client_key: None,
            enabled: true,
            relative_path: None,
        }
    }
}

/// Atomically replace all treeinfo-derived records with a fresh set:
/// prior treeinfo records are discarded before the new ones land, and
/// user/system records keep their positions.
pub fn replace_treeinfo_repositories(repos: &mut Vec<RepoConfig>, fresh: Vec<RepoConfig>) {
    repos.retain(|r| r.origin != RepoOrigin::TreeInfo);
    repos.extend(fresh);
}

/// Process-level configuration for validation and treeinfo
/// resolution.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Treeinfo variant types whose repositories default to enabled.
    pub enabled_repository_types: BTreeSet<String>,
    /// Repository names that identify the base repository, matched
    /// case-insensitively against treeinfo variant names.
    pub default_repo_names: Vec<String>,
    /// Names user repositories may not take.
    pub reserved_repo_names: BTreeSet<String>,
    /// Attempts before the resolver gives up on a network source.
    pub treeinfo_retries: u32,
    /// Base quantum of the progressive retry delay.
    pub backoff_base: Duration,
    /// Connection timeout for each metadata request.
    pub timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            enabled_repository_types: ["variant", "addon"]
                .into_iter()
                .map(|s| s.to_string())
                .collect(),
            default_repo_names: vec!["baseos".to_string(), "fedora".to_string()],
            reserved_repo_names: [
                "anaconda",
                "rawhide",
                "fedora",
                "updates",
                "updates-testing",
            ]
            .into_iter()
            .map(|s| s.to_string())
            .collect(),
            treeinfo_retries: 6,
            backoff_base: Duration::from_millis(250),
            timeout: Duration::from_secs(30),
        }
    }
}
