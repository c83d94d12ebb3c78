//! System configuration commands (locale, users, scripts) and the
//! script/certificate sections.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::{BASE_VERSION, CURRENT_VERSION};
use crate::options::{CommandDef, CommandKind, OptKind, OptionDef};
use crate::spec::{ModuleSpec, SectionDef, SectionKind};

const KEYBOARD_OPTS: &[OptionDef] = &[
    OptionDef::new("vckeymap", OptKind::Str, BASE_VERSION),
    OptionDef::new("xlayouts", OptKind::List, BASE_VERSION),
];

const TIMEZONE_OPTS: &[OptionDef] = &[OptionDef::flag("utc", BASE_VERSION)];

const ROOTPW_OPTS: &[OptionDef] = &[
    OptionDef::flag("iscrypted", BASE_VERSION),
    OptionDef::flag("plaintext", BASE_VERSION),
    OptionDef::flag("lock", BASE_VERSION),
    OptionDef::flag("allow-ssh", 33),
];

const USER_OPTS: &[OptionDef] = &[
    OptionDef::new("name", OptKind::Str, BASE_VERSION),
    OptionDef::new("password", OptKind::Str, BASE_VERSION),
    OptionDef::flag("iscrypted", BASE_VERSION),
    OptionDef::new("groups", OptKind::List, BASE_VERSION),
    OptionDef::new("homedir", OptKind::Str, BASE_VERSION),
    OptionDef::new("shell", OptKind::Str, BASE_VERSION),
    OptionDef::new("uid", OptKind::Int, BASE_VERSION),
    OptionDef::new("gid", OptKind::Int, BASE_VERSION),
    OptionDef::new("gecos", OptKind::Str, BASE_VERSION),
    OptionDef::flag("lock", BASE_VERSION),
];

const GROUP_OPTS: &[OptionDef] = &[
    OptionDef::new("name", OptKind::Str, BASE_VERSION),
    OptionDef::new("gid", OptKind::Int, BASE_VERSION),
];

const FIRSTBOOT_OPTS: &[OptionDef] = &[
    OptionDef::flag("enable", BASE_VERSION),
    OptionDef::flag("disable", BASE_VERSION),
    OptionDef::flag("reconfig", BASE_VERSION),
];

const REBOOT_OPTS: &[OptionDef] = &[
    OptionDef::flag("eject", BASE_VERSION),
    OptionDef::flag("kexec", 32),
];

const SCRIPT_OPTS: &[OptionDef] = &[
    OptionDef::new("interpreter", OptKind::Str, BASE_VERSION),
    OptionDef::new("log", OptKind::Str, BASE_VERSION),
    OptionDef::flag("erroronfail", BASE_VERSION),
];

const POST_OPTS: &[OptionDef] = &[
    OptionDef::new("interpreter", OptKind::Str, BASE_VERSION),
    OptionDef::new("log", OptKind::Str, BASE_VERSION),
    OptionDef::flag("erroronfail", BASE_VERSION),
    OptionDef::flag("nochroot", BASE_VERSION),
];

const CERTIFICATE_OPTS: &[OptionDef] = &[
    OptionDef::new("filename", OptKind::Str, 34),
    OptionDef::new("dir", OptKind::Str, 34),
];

pub fn spec() -> ModuleSpec {
    ModuleSpec {
        name: "system",
        version: CURRENT_VERSION,
        commands: vec![
            CommandDef::new("lang", CommandKind::Singleton, &[], BASE_VERSION).with_positionals(1),
            CommandDef::new("keyboard", CommandKind::Singleton, KEYBOARD_OPTS, BASE_VERSION)
                .with_positionals(1),
            CommandDef::new("timezone", CommandKind::Singleton, TIMEZONE_OPTS, BASE_VERSION)
                .with_positionals(1),
            CommandDef::new("rootpw", CommandKind::Singleton, ROOTPW_OPTS, BASE_VERSION)
                .with_positionals(1),
            CommandDef::new("user", CommandKind::Repeatable("UserData"), USER_OPTS, BASE_VERSION),
            CommandDef::new("group", CommandKind::Repeatable("GroupData"), GROUP_OPTS, BASE_VERSION),
            CommandDef::new("skipx", CommandKind::Singleton, &[], BASE_VERSION),
            CommandDef::new("firstboot", CommandKind::Singleton, FIRSTBOOT_OPTS, BASE_VERSION),
            CommandDef::new("reboot", CommandKind::Singleton, REBOOT_OPTS, BASE_VERSION),
        ],
        sections: vec![
            SectionDef::new("pre", SectionKind::Script, SCRIPT_OPTS, BASE_VERSION),
            SectionDef::new("pre-install", SectionKind::Script, SCRIPT_OPTS, BASE_VERSION),
            SectionDef::new("post", SectionKind::Script, POST_OPTS, BASE_VERSION),
            SectionDef::new("onerror", SectionKind::Script, SCRIPT_OPTS, BASE_VERSION),
            SectionDef::new("traceback", SectionKind::Script, SCRIPT_OPTS, BASE_VERSION),
            SectionDef::new("certificate", SectionKind::Certificate, CERTIFICATE_OPTS, 34),
        ],
        addons: vec![],
    }
}
