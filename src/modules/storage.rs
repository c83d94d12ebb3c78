//! Storage subsystem commands: disk selection, clearing and automatic
//! partitioning.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::{BASE_VERSION, CURRENT_VERSION};
use crate::options::{CommandDef, CommandKind, OptKind, OptionDef};
use crate::spec::ModuleSpec;

const CLEARPART_OPTS: &[OptionDef] = &[
    OptionDef::flag("all", BASE_VERSION),
    OptionDef::flag("linux", BASE_VERSION),
    OptionDef::flag("none", BASE_VERSION),
    OptionDef::flag("initlabel", BASE_VERSION),
    OptionDef::new("drives", OptKind::List, BASE_VERSION),
    OptionDef::new("disklabel", OptKind::Str, BASE_VERSION),
];

const IGNOREDISK_OPTS: &[OptionDef] = &[
    OptionDef::new("drives", OptKind::List, BASE_VERSION),
    OptionDef::new("only-use", OptKind::List, BASE_VERSION),
];

const AUTOPART_OPTS: &[OptionDef] = &[
    OptionDef::new(
        "type",
        OptKind::Choice(&["lvm", "btrfs", "plain", "thinp"]),
        BASE_VERSION,
    ),
    OptionDef::flag("nohome", BASE_VERSION),
    OptionDef::flag("encrypted", BASE_VERSION),
    OptionDef::new("passphrase", OptKind::Str, BASE_VERSION),
];

const BOOTLOADER_OPTS: &[OptionDef] = &[
    OptionDef::new(
        "location",
        OptKind::Choice(&["mbr", "partition", "none"]),
        BASE_VERSION,
    ),
    // Kernel arguments often begin with dashes themselves.
    OptionDef::new("append", OptKind::Str, BASE_VERSION).require_equals(),
    OptionDef::new("boot-drive", OptKind::Str, BASE_VERSION),
    OptionDef::new("timeout", OptKind::Int, BASE_VERSION),
    OptionDef::flag("disabled", 33),
];

pub fn spec() -> ModuleSpec {
    ModuleSpec {
        name: "storage",
        version: CURRENT_VERSION,
        commands: vec![
            CommandDef::new("clearpart", CommandKind::Singleton, CLEARPART_OPTS, BASE_VERSION),
            CommandDef::new("ignoredisk", CommandKind::Singleton, IGNOREDISK_OPTS, BASE_VERSION),
            CommandDef::new("autopart", CommandKind::Singleton, AUTOPART_OPTS, BASE_VERSION),
            CommandDef::new("zerombr", CommandKind::Singleton, &[], BASE_VERSION),
            CommandDef::new("bootloader", CommandKind::Singleton, BOOTLOADER_OPTS, BASE_VERSION),
        ],
        sections: vec![],
        addons: vec![],
    }
}
