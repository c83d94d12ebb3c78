//! Image/tree deployment commands.  Declares `liveimg` as shared with
//! the payload module.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::{BASE_VERSION, CURRENT_VERSION};
use crate::options::{CommandDef, CommandKind, OptKind, OptionDef};
use crate::spec::ModuleSpec;

const OSTREESETUP_OPTS: &[OptionDef] = &[
    OptionDef::new("osname", OptKind::Str, BASE_VERSION),
    OptionDef::new("remote", OptKind::Str, BASE_VERSION),
    OptionDef::new("url", OptKind::Str, BASE_VERSION),
    OptionDef::new("ref", OptKind::Str, BASE_VERSION),
    OptionDef::flag("nogpg", BASE_VERSION),
];

pub fn spec() -> ModuleSpec {
    ModuleSpec {
        name: "deployment",
        version: CURRENT_VERSION,
        commands: vec![
            CommandDef::new("ostreesetup", CommandKind::Singleton, OSTREESETUP_OPTS, BASE_VERSION),
            super::payload::LIVEIMG,
        ],
        sections: vec![],
        addons: vec![],
    }
}
