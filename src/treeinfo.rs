//! Resolution of an installation-source URL into package repositories
//! via `.treeinfo` metadata.
//!
//! The resolver loads `<root>/.treeinfo` (falling back to
//! `<root>/treeinfo`) from a local path or over HTTP/FTP with a
//! bounded retry loop, validates the INI schema, enumerates the
//! variant repositories and resolves their absolute URLs.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ini::Ini;
use tracing::{debug, instrument, warn};

use crate::config::{CoreConfig, RepoConfig, RepoOrigin, RepoType};
use crate::errors::TreeInfoError;
use crate::urlutils::{split_protocol, ProxyString};

/// Metadata file names probed at the tree root, in order.
pub const TREE_INFO_NAMES: [&str; 2] = [".treeinfo", "treeinfo"];

const USER_AGENT: &str = concat!("kscore/", env!("CARGO_PKG_VERSION"));

/// One installation source with its transport options.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub url: String,
    pub rtype: RepoType,
    pub proxy: Option<String>,
    pub ssl_verify: bool,
    pub ssl_ca_cert: Option<String>,
    pub ssl_client_cert: Option<String>,
    pub ssl_client_key: Option<String>,
}

impl SourceConfig {
    pub fn with_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            rtype: RepoType::BaseUrl,
            proxy: None,
            ssl_verify: true,
            ssl_ca_cert: None,
            ssl_client_cert: None,
            ssl_client_key: None,
        }
    }
}

/// Outcome of one HTTP attempt.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// The HTTP seam; tests inject fakes, production uses
/// [`ReqwestTransport`].
pub trait Transport {
    fn fetch(&self, url: &str, source: &SourceConfig, timeout: Duration) -> Result<HttpReply>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn fetch(&self, url: &str, source: &SourceConfig, timeout: Duration) -> Result<HttpReply> {
        (**self).fetch(url, source, timeout)
    }
}

/// The time seam for the retry loop.
pub trait Sleeper {
    fn sleep(&self, delay: Duration);
}

impl<T: Sleeper + ?Sized> Sleeper for &T {
    fn sleep(&self, delay: Duration) {
        (**self).sleep(delay)
    }
}

pub struct RealSleeper;

impl Sleeper for RealSleeper {
    fn sleep(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Proxy map for a source, in the shape the HTTP client consumes:
/// both `http` and `https` traffic go through the configured proxy.
pub fn proxies_for(source: &SourceConfig) -> Result<Option<BTreeMap<&'static str, String>>> {
    let Some(proxy) = &source.proxy else {
        return Ok(None);
    };
    let url = ProxyString::parse(proxy)?.url();
    Ok(Some(BTreeMap::from([("http", url.clone()), ("https", url)])))
}

/// Production transport on top of reqwest's blocking client.
pub struct ReqwestTransport;

impl Transport for ReqwestTransport {
    fn fetch(&self, url: &str, source: &SourceConfig, timeout: Duration) -> Result<HttpReply> {
        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .danger_accept_invalid_certs(!source.ssl_verify);
        if let Some(proxies) = proxies_for(source)? {
            // Both entries carry the same URL, so one `all` proxy
            // covers the map.
            if let Some(proxy_url) = proxies.get("http") {
                builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
            }
        }
        if let Some(ca) = &source.ssl_ca_cert {
            let pem = std::fs::read(ca)?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }
        if let (Some(cert), Some(key)) = (&source.ssl_client_cert, &source.ssl_client_key) {
            let cert_pem = std::fs::read(cert)?;
            let key_pem = std::fs::read(key)?;
            builder = builder.identity(reqwest::Identity::from_pkcs8_pem(&cert_pem, &key_pem)?);
        }
        let client = builder.build()?;
        let response = client.get(url).send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(HttpReply { status, body })
    }
}

/// Type of a treeinfo variant entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantType {
    Variant,
    Addon,
    Optional,
}

impl VariantType {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "variant" => Some(Self::Variant),
            "addon" => Some(Self::Addon),
            "optional" => Some(Self::Optional),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Variant => "variant",
            Self::Addon => "addon",
            Self::Optional => "optional",
        }
    }
}

/// One repository enumerated from a treeinfo document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeInfoRepo {
    pub name: String,
    pub rtype: VariantType,
    pub relative_path: String,
    /// Resolved absolute URL.
    pub url: String,
    pub enabled: bool,
    pub valid: bool,
}

/// Parsed and resolved treeinfo metadata for one tree root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeInfoMetadata {
    pub root_url: String,
    pub release_version: Option<String>,
    repositories: Vec<TreeInfoRepo>,
}

impl TreeInfoMetadata {
    /// Variant repositories, sorted by name.
    pub fn repositories(&self) -> &[TreeInfoRepo] {
        &self.repositories
    }

    /// The repository living at the tree root itself, if any.
    pub fn root_repo(&self) -> Option<&TreeInfoRepo> {
        self.repositories.iter().find(|r| r.relative_path == ".")
    }

    fn base_repo(&self, config: &CoreConfig) -> Option<&TreeInfoRepo> {
        self.repositories
            .iter()
            .find(|repo| {
                config
                    .default_repo_names
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(&repo.name))
            })
            .or_else(|| self.root_repo())
    }

    /// URL of the base repository: a repository matching the
    /// configured default names wins, then the root repository, then
    /// the tree root URL itself.
    pub fn get_base_repo_url(&self, config: &CoreConfig) -> &str {
        match self.base_repo(config) {
            Some(repo) => &repo.url,
            None => &self.root_url,
        }
    }

    /// True when a base repository was actually enumerated and its
    /// `repodata` is usable.
    pub fn verify_image_base_repo(&self, config: &CoreConfig) -> bool {
        self.base_repo(config).map(|r| r.valid).unwrap_or(false)
    }
}

/// Map resolver output to repository descriptors, inheriting the
/// source's transport options.
pub fn generate_treeinfo_repositories(
    source: &SourceConfig,
    metadata: &TreeInfoMetadata,
) -> Vec<RepoConfig> {
    metadata
        .repositories()
        .iter()
        .map(|repo| RepoConfig {
            name: repo.name.clone(),
            origin: RepoOrigin::TreeInfo,
            rtype: RepoType::BaseUrl,
            url: repo.url.clone(),
            proxy: source.proxy.clone(),
            ssl_verify: source.ssl_verify,
            ssl_ca_cert: source.ssl_ca_cert.clone(),
            ssl_client_cert: source.ssl_client_cert.clone(),
            ssl_client_key: source.ssl_client_key.clone(),
            enabled: repo.enabled,
            relative_path: Some(repo.relative_path.clone()),
        })
        .collect()
}

/// Join a variant's relative path onto the tree root, normalizing
/// `.`/`..` segments while leaving the protocol intact.  A relative
/// path of `"."` resolves to the root itself.
pub fn join_url(root: &str, relative: &str) -> Result<String> {
    if relative == "." {
        return Ok(root.to_string());
    }
    let (protocol, rest) = split_protocol(root)?;
    let absolute = rest.starts_with('/');
    let joined = format!("{}/{}", rest.trim_end_matches('/'), relative);
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let mut path = segments.join("/");
    if absolute {
        path.insert(0, '/');
    }
    Ok(format!("{protocol}{path}"))
}

fn local_root(url: &str) -> Option<PathBuf> {
    if let Some(path) = url.strip_prefix("file://") {
        return Some(PathBuf::from(path));
    }
    if url.starts_with('/') {
        return Some(PathBuf::from(url));
    }
    None
}

/// Resolves one installation source; holds no shared mutable state
/// and is safe to run once per logical request.
pub struct TreeInfoResolver<'a> {
    source: &'a SourceConfig,
    config: &'a CoreConfig,
    transport: Box<dyn Transport + 'a>,
    sleeper: Box<dyn Sleeper + 'a>,
    cancel: Arc<AtomicBool>,
}

impl<'a> TreeInfoResolver<'a> {
    pub fn new(source: &'a SourceConfig, config: &'a CoreConfig) -> Self {
        Self {
            source,
            config,
            transport: Box::new(ReqwestTransport),
            sleeper: Box::new(RealSleeper),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_transport(mut self, transport: Box<dyn Transport + 'a>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper + 'a>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Flag that aborts the retry loop between attempts.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    #[instrument(skip(self), fields(url = %self.source.url))]
    pub fn resolve(&self) -> Result<TreeInfoMetadata, TreeInfoError> {
        match self.source.rtype {
            RepoType::MirrorList | RepoType::MetaLink => {
                return Err(TreeInfoError::NoTreeInfo(
                    "Unsupported type of the repository.".to_string(),
                ));
            }
            RepoType::BaseUrl | RepoType::Nfs => {}
        }
        let root_url = self.source.url.trim_end_matches('/');
        let text = match local_root(root_url) {
            Some(root) => load_local(&root)?,
            None => self.load_remote(root_url)?,
        };
        self.parse_with_root(&text, root_url)
    }

    fn load_remote(&self, root_url: &str) -> Result<String, TreeInfoError> {
        let mut not_found = [false; TREE_INFO_NAMES.len()];
        for attempt in 1..=self.config.treeinfo_retries {
            if self.cancel.load(Ordering::Relaxed) {
                return Err(TreeInfoError::NoTreeInfo("cancelled".to_string()));
            }
            if attempt > 1 {
                // Progressive delay: base * 2^k, k = 1, 2, …
                let delay = self.config.backoff_base * 2u32.pow(attempt - 1);
                self.sleeper.sleep(delay);
            }
            for (idx, name) in TREE_INFO_NAMES.iter().enumerate() {
                if not_found[idx] {
                    continue;
                }
                let target = format!("{root_url}/{name}");
                match self.transport.fetch(&target, self.source, self.config.timeout) {
                    Ok(reply) if reply.status == 404 => {
                        debug!(url = target.as_str(), "treeinfo name not present");
                        not_found[idx] = true;
                        if not_found.iter().all(|b| *b) {
                            return Err(TreeInfoError::NoTreeInfo(
                                "No treeinfo metadata found (404).".to_string(),
                            ));
                        }
                    }
                    Ok(reply) if (200..300).contains(&reply.status) => {
                        debug!(url = target.as_str(), attempt, "fetched treeinfo");
                        return Ok(reply.body);
                    }
                    Ok(reply) => {
                        warn!(status = reply.status, "unexpected HTTP status for {target}");
                    }
                    Err(e) => {
                        warn!("failed to fetch {target}: {e:#}");
                    }
                }
            }
        }
        Err(TreeInfoError::NoTreeInfo(
            "Couldn't download treeinfo metadata.".to_string(),
        ))
    }

    fn parse_with_root(&self, text: &str, root_url: &str) -> Result<TreeInfoMetadata, TreeInfoError> {
        let ini = Ini::load_from_str(text)
            .map_err(|e| TreeInfoError::InvalidTreeInfo(e.to_string()))?;
        for required in ["header", "release", "tree"] {
            if ini.section(Some(required)).is_none() {
                return Err(TreeInfoError::InvalidTreeInfo(format!(
                    "missing required section [{required}]"
                )));
            }
        }
        let release_version = ini
            .section(Some("release"))
            .and_then(|s| s.get("version"))
            .map(|v| v.to_lowercase());
        let probe_root = local_root(root_url);
        let mut repositories = Vec::new();
        for (section, properties) in ini.iter() {
            let Some(section) = section else { continue };
            if !section.starts_with("variant-") {
                continue;
            }
            for key in ["id", "name", "type", "repository"] {
                if properties.get(key).is_none() {
                    return Err(TreeInfoError::InvalidTreeInfo(format!(
                        "section [{section}] is missing key \"{key}\""
                    )));
                }
            }
            let name = properties.get("name").expect("checked above");
            let type_value = properties.get("type").expect("checked above");
            let Some(rtype) = VariantType::parse(type_value) else {
                warn!(section, variant_type = type_value, "skipping variant of unknown type");
                continue;
            };
            let relative_path = properties.get("repository").expect("checked above");
            let url = join_url(root_url, relative_path)
                .map_err(|e| TreeInfoError::InvalidTreeInfo(e.to_string()))?;
            let valid = match &probe_root {
                // Local trees are probed for usable repodata; remote
                // ones are assumed valid until fetched.
                Some(_) => {
                    let path = url.strip_prefix("file://").unwrap_or(&url);
                    Path::new(path).join("repodata").exists()
                }
                None => true,
            };
            repositories.push(TreeInfoRepo {
                name: name.to_string(),
                rtype,
                relative_path: relative_path.to_string(),
                url,
                enabled: self
                    .config
                    .enabled_repository_types
                    .contains(rtype.as_str()),
                valid,
            });
        }
        repositories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(TreeInfoMetadata {
            root_url: root_url.to_string(),
            release_version,
            repositories,
        })
    }
}

fn load_local(root: &Path) -> Result<String, TreeInfoError> {
    for name in TREE_INFO_NAMES {
        let path = root.join(name);
        if path.is_file() {
            return std::fs::read_to_string(&path).map_err(|e| {
                TreeInfoError::NoTreeInfo(format!("Couldn't read {}: {e}", path.display()))
            });
        }
    }
    Err(TreeInfoError::NoTreeInfo(
        "No treeinfo metadata found.".to_string(),
    ))
}
