//! Cross-command semantic validation of a parsed handler store.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::CoreConfig;
use crate::handler::HandlerStore;
use crate::options::ParsedCommand;
use crate::urlutils::{parse_hd_url, parse_nfs_url, split_protocol, ProxyString};

static REPO_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:-]+$").unwrap());

const URL_SCHEMES: &[&str] = &["http", "https", "ftp", "file"];

/// Collected validation outcome; the caller decides whether errors are
/// fatal.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

/// A multi-disk device (RAID set, LVM volume group, btrfs pool) whose
/// members must be selected together.
#[derive(Debug, Clone)]
pub struct DiskAggregate {
    pub name: String,
    pub members: BTreeSet<String>,
}

/// One storage device as reported by the platform layer.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    /// The device's current format is Linux-native.
    pub format_linux: bool,
    /// The disk carries a usable signature (partition table or
    /// filesystem magic).
    pub has_signature: bool,
    pub protected: bool,
}

/// Storage facts supplied by the platform layer; the validator never
/// probes hardware itself.
#[derive(Debug, Clone, Default)]
pub struct StorageTopology {
    pub aggregates: Vec<DiskAggregate>,
    pub devices: Vec<DeviceInfo>,
}

/// Caller context for one validation run.
pub struct ValidationContext<'a> {
    pub config: &'a CoreConfig,
    pub topology: Option<&'a StorageTopology>,
    /// Whether authenticated proxies are acceptable in this context.
    pub allow_proxy_auth: bool,
}

impl<'a> ValidationContext<'a> {
    pub fn new(config: &'a CoreConfig) -> Self {
        Self {
            config,
            topology: None,
            allow_proxy_auth: true,
        }
    }
}

/// The clearpart erasure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearPolicy {
    All,
    Linux,
    None,
}

/// Whether `device` may be erased under `policy`.  Protected devices
/// are never erasable.
pub fn can_erase_device(policy: ClearPolicy, initialize_labels: bool, device: &DeviceInfo) -> bool {
    if device.protected {
        return false;
    }
    match policy {
        ClearPolicy::All => true,
        ClearPolicy::Linux => device.format_linux,
        ClearPolicy::None => initialize_labels && !device.has_signature,
    }
}

pub fn validate(store: &HandlerStore, ctx: &ValidationContext) -> ValidationReport {
    let mut report = ValidationReport::default();
    check_repos(store, ctx, &mut report);
    check_source(store, ctx, &mut report);
    check_disk_selection(store, ctx, &mut report);
    check_clearpart(store, ctx, &mut report);
    report
}

fn check_proxy(owner: &str, value: &str, ctx: &ValidationContext, report: &mut ValidationReport) {
    match ProxyString::parse(value) {
        Ok(proxy) => {
            if !ctx.allow_proxy_auth {
                if let Err(e) = proxy.require_no_auth() {
                    report.error(format!("The '{owner}' proxy is invalid: {e}"));
                }
            }
        }
        Err(e) => report.error(format!("The '{owner}' proxy is invalid: {e}")),
    }
}

fn check_url_scheme(name: &str, url: &str, report: &mut ValidationReport) {
    if url.starts_with("nfs:") {
        let (_, host, _) = parse_nfs_url(url);
        if host.is_empty() {
            report.error(format!("The '{name}' repository is invalid: NFS URL has no host"));
        }
        return;
    }
    if url.starts_with("hd:") {
        let (device, _) = parse_hd_url(url);
        if device.is_empty() {
            report.error(format!("The '{name}' repository is invalid: harddrive URL has no device"));
        }
        return;
    }
    match split_protocol(url) {
        Ok((protocol, _)) if !protocol.is_empty() => {
            let scheme = protocol.trim_end_matches("://");
            if !URL_SCHEMES.contains(&scheme) {
                report.error(format!(
                    "The '{name}' repository is invalid: unsupported URL scheme \"{scheme}\""
                ));
            }
        }
        Ok(_) => report.error(format!("The '{name}' repository is invalid: URL has no scheme")),
        Err(e) => report.error(format!("The '{name}' repository is invalid: {e}")),
    }
}

fn repo_url<'a>(record: &'a ParsedCommand) -> Result<Option<&'a str>, &'static str> {
    let sources = [
        record.str_value("baseurl"),
        record.str_value("mirrorlist"),
        record.str_value("metalink"),
    ];
    let mut found = sources.into_iter().flatten();
    match (found.next(), found.next()) {
        (Some(url), None) => Ok(Some(url)),
        (None, _) => Ok(None),
        (Some(_), Some(_)) => Err("only one of --baseurl, --mirrorlist or --metalink is allowed"),
    }
}

fn check_repos(store: &HandlerStore, ctx: &ValidationContext, report: &mut ValidationReport) {
    let mut seen = BTreeSet::new();
    for record in store.records("repo") {
        let name = record.str_value("name").unwrap_or("");
        if name.is_empty() {
            report.error("A repository is missing its name.");
            continue;
        }
        if !REPO_NAME_RE.is_match(name) {
            report.error(format!(
                "The '{name}' repository has an invalid name: allowed characters are [A-Za-z0-9_.:-]"
            ));
        }
        if ctx.config.reserved_repo_names.contains(name) {
            report.error(format!("The '{name}' repository name is reserved."));
        }
        if !seen.insert(name.to_string()) {
            report.error(format!("The '{name}' repository is defined twice."));
        }
        match repo_url(record) {
            Ok(Some(url)) => check_url_scheme(name, url, report),
            Ok(None) => report.warning(format!("The '{name}' repository has no URL.")),
            Err(e) => report.error(format!("The '{name}' repository is invalid: {e}")),
        }
        if let Some(proxy) = record.str_value("proxy") {
            check_proxy(name, proxy, ctx, report);
        }
    }
}

fn check_source(store: &HandlerStore, ctx: &ValidationContext, report: &mut ValidationReport) {
    let Some(url) = store.singleton("url") else {
        return;
    };
    let sources: Vec<&str> = ["url", "mirrorlist", "metalink"]
        .into_iter()
        .filter_map(|opt| url.str_value(opt))
        .collect();
    match sources.as_slice() {
        [] => report.error("The url command needs --url, --mirrorlist or --metalink."),
        [value] => check_url_scheme("url", value, report),
        _ => report.error(
            "The installation source is invalid: only one of --url, --mirrorlist or --metalink is allowed",
        ),
    }
    if let Some(proxy) = url.str_value("proxy") {
        check_proxy("url", proxy, ctx, report);
    }
}

fn list_values<'a>(record: &'a ParsedCommand, option: &str) -> &'a [String] {
    record
        .get(option)
        .and_then(|v| v.as_list())
        .unwrap_or(&[])
}

fn check_disk_selection(store: &HandlerStore, ctx: &ValidationContext, report: &mut ValidationReport) {
    let Some(topology) = ctx.topology else {
        return;
    };
    let Some(ignoredisk) = store.singleton("ignoredisk") else {
        return;
    };
    let selected: BTreeSet<&str> = list_values(ignoredisk, "only-use")
        .iter()
        .map(|s| s.as_str())
        .collect();
    if selected.is_empty() {
        return;
    }
    for aggregate in &topology.aggregates {
        let chosen: Vec<&str> = aggregate
            .members
            .iter()
            .map(|m| m.as_str())
            .filter(|m| selected.contains(m))
            .collect();
        if chosen.is_empty() || chosen.len() == aggregate.members.len() {
            continue;
        }
        let missing: Vec<&str> = aggregate
            .members
            .iter()
            .map(|m| m.as_str())
            .filter(|m| !selected.contains(m))
            .collect();
        report.error(format!(
            "Device \"{}\" spans selected and unselected disks; also select: {}",
            aggregate.name,
            missing.join(", ")
        ));
    }
}

fn clear_policy(clearpart: &ParsedCommand) -> ClearPolicy {
    if clearpart.flag("all") {
        ClearPolicy::All
    } else if clearpart.flag("linux") {
        ClearPolicy::Linux
    } else {
        ClearPolicy::None
    }
}

fn check_clearpart(store: &HandlerStore, ctx: &ValidationContext, report: &mut ValidationReport) {
    let Some(topology) = ctx.topology else {
        return;
    };
    let Some(clearpart) = store.singleton("clearpart") else {
        return;
    };
    let policy = clear_policy(clearpart);
    let initlabel = clearpart.flag("initlabel");
    for drive in list_values(clearpart, "drives") {
        let Some(device) = topology.devices.iter().find(|d| &d.name == drive) else {
            report.warning(format!("clearpart names unknown drive \"{drive}\""));
            continue;
        };
        if !can_erase_device(policy, initlabel, device) {
            report.error(format!(
                "Device \"{}\" may not be erased under the current clearpart policy.",
                device.name
            ));
        }
    }
}
