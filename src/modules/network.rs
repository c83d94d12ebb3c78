//! Network subsystem commands.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::{BASE_VERSION, CURRENT_VERSION};
use crate::options::{CommandDef, CommandKind, OptKind, OptionDef};
use crate::spec::ModuleSpec;

const NETWORK_OPTS: &[OptionDef] = &[
    OptionDef::new("device", OptKind::Str, BASE_VERSION),
    OptionDef::new(
        "bootproto",
        OptKind::Choice(&["dhcp", "static", "ibft", "query"]),
        BASE_VERSION,
    ),
    OptionDef::new("ip", OptKind::Str, BASE_VERSION),
    OptionDef::new("netmask", OptKind::Str, BASE_VERSION),
    OptionDef::new("gateway", OptKind::Str, BASE_VERSION),
    OptionDef::new("nameserver", OptKind::List, BASE_VERSION),
    OptionDef::new("hostname", OptKind::Str, BASE_VERSION),
    OptionDef::new("mtu", OptKind::Int, BASE_VERSION),
    OptionDef::flag("onboot", BASE_VERSION),
    OptionDef::flag("noipv4", BASE_VERSION),
    OptionDef::flag("noipv6", BASE_VERSION),
    // Activation on a configured-but-not-boot device came later.
    OptionDef::flag("activate", 32),
];

const FIREWALL_OPTS: &[OptionDef] = &[
    OptionDef::flag("enabled", BASE_VERSION),
    OptionDef::flag("disabled", BASE_VERSION),
    OptionDef::new("port", OptKind::List, BASE_VERSION),
    OptionDef::new("service", OptKind::List, BASE_VERSION),
    OptionDef::flag("use-system-defaults", 32),
];

pub fn spec() -> ModuleSpec {
    ModuleSpec {
        name: "network",
        version: CURRENT_VERSION,
        commands: vec![
            CommandDef::new(
                "network",
                CommandKind::Repeatable("NetworkData"),
                NETWORK_OPTS,
                BASE_VERSION,
            ),
            CommandDef::new("firewall", CommandKind::Singleton, FIREWALL_OPTS, BASE_VERSION),
        ],
        sections: vec![],
        addons: vec![],
    }
}
