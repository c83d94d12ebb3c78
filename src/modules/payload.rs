//! Payload subsystem: installation sources, additional repositories
//! and the `%packages` section.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::{BASE_VERSION, CURRENT_VERSION};
use crate::options::{CommandDef, CommandKind, OptKind, OptionDef};
use crate::spec::{ModuleSpec, SectionDef, SectionKind};

const REPO_OPTS: &[OptionDef] = &[
    OptionDef::new("name", OptKind::Str, BASE_VERSION),
    OptionDef::new("baseurl", OptKind::Str, BASE_VERSION),
    OptionDef::new("mirrorlist", OptKind::Str, BASE_VERSION),
    OptionDef::new("metalink", OptKind::Str, 32),
    OptionDef::new("proxy", OptKind::Str, BASE_VERSION),
    OptionDef::new("cost", OptKind::Int, BASE_VERSION),
    OptionDef::new("excludepkgs", OptKind::List, BASE_VERSION),
    OptionDef::new("includepkgs", OptKind::List, BASE_VERSION),
    OptionDef::flag("noverifyssl", BASE_VERSION),
    OptionDef::new("sslcacert", OptKind::Str, 32),
    OptionDef::new("sslclientcert", OptKind::Str, 32),
    OptionDef::new("sslclientkey", OptKind::Str, 32),
    OptionDef::flag("install", BASE_VERSION),
];

const URL_OPTS: &[OptionDef] = &[
    OptionDef::new("url", OptKind::Str, BASE_VERSION),
    OptionDef::new("mirrorlist", OptKind::Str, BASE_VERSION),
    OptionDef::new("metalink", OptKind::Str, 32),
    OptionDef::new("proxy", OptKind::Str, BASE_VERSION),
    OptionDef::flag("noverifyssl", BASE_VERSION),
];

const HARDDRIVE_OPTS: &[OptionDef] = &[
    OptionDef::new("partition", OptKind::Str, BASE_VERSION),
    OptionDef::new("dir", OptKind::Str, BASE_VERSION),
];

const NFS_OPTS: &[OptionDef] = &[
    OptionDef::new("server", OptKind::Str, BASE_VERSION),
    OptionDef::new("dir", OptKind::Str, BASE_VERSION),
    OptionDef::new("opts", OptKind::Str, BASE_VERSION),
];

pub(crate) const LIVEIMG_OPTS: &[OptionDef] = &[
    OptionDef::new("url", OptKind::Str, BASE_VERSION),
    OptionDef::new("proxy", OptKind::Str, BASE_VERSION),
    OptionDef::new("checksum", OptKind::Str, BASE_VERSION),
    OptionDef::flag("noverifyssl", BASE_VERSION),
];

const PACKAGES_OPTS: &[OptionDef] = &[
    OptionDef::flag("excludedocs", BASE_VERSION),
    OptionDef::flag("ignoremissing", BASE_VERSION),
    OptionDef::flag("exclude-weakdeps", 32),
    OptionDef::new("inst-langs", OptKind::List, BASE_VERSION),
];

/// `liveimg` is declared by both the payload and deployment modules;
/// both cite this single definition so the shared merge succeeds.
pub(crate) const LIVEIMG: CommandDef =
    CommandDef::new("liveimg", CommandKind::Singleton, LIVEIMG_OPTS, BASE_VERSION).shared();

pub fn spec() -> ModuleSpec {
    ModuleSpec {
        name: "payload",
        version: CURRENT_VERSION,
        commands: vec![
            CommandDef::new("repo", CommandKind::Repeatable("RepoData"), REPO_OPTS, BASE_VERSION),
            CommandDef::new("url", CommandKind::Singleton, URL_OPTS, BASE_VERSION),
            CommandDef::new("cdrom", CommandKind::Singleton, &[], BASE_VERSION),
            CommandDef::new("harddrive", CommandKind::Singleton, HARDDRIVE_OPTS, BASE_VERSION),
            CommandDef::new("nfs", CommandKind::Singleton, NFS_OPTS, BASE_VERSION),
            LIVEIMG,
        ],
        sections: vec![SectionDef::new(
            "packages",
            SectionKind::Packages,
            PACKAGES_OPTS,
            BASE_VERSION,
        )],
        addons: vec![],
    }
}
