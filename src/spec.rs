//! The kickstart specification: per-module command/section tables and
//! the composer that merges them into the single parser input.
//!
//! Each subsystem module contributes commands, data record types,
//! sections and addons.  Composition enforces disjointness: a name may
//! be claimed by at most one module unless the command is explicitly
//! marked shared.  Violations are programming errors detected up
//! front, long before any user input is parsed.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde_derive::{Deserialize, Serialize};

use crate::options::{CommandDef, CommandKind, OptionDef};
use crate::sections::AddonData;

/// Section body semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    /// Package list: `pkg` installs, `-pkg` excludes, `@group` groups.
    Packages,
    /// Script body stored verbatim.
    Script,
    /// PEM payload stored verbatim.
    Certificate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionDef {
    pub name: &'static str,
    pub kind: SectionKind,
    pub options: &'static [OptionDef],
    pub introduced: u32,
}

impl SectionDef {
    pub const fn new(
        name: &'static str,
        kind: SectionKind,
        options: &'static [OptionDef],
        introduced: u32,
    ) -> Self {
        Self {
            name,
            kind,
            options,
            introduced,
        }
    }
}

pub type AddonFactory = fn() -> Box<dyn AddonData>;

/// What one subsystem module contributes to the composed grammar.
pub struct ModuleSpec {
    pub name: &'static str,
    pub version: u32,
    pub commands: Vec<CommandDef>,
    pub sections: Vec<SectionDef>,
    pub addons: Vec<(&'static str, AddonFactory)>,
}

/// The unified grammar the parser runs against.
#[derive(Debug)]
pub struct ComposedSpec {
    version: u32,
    commands: BTreeMap<&'static str, CommandDef>,
    /// Declaration order across modules; drives canonical serialization.
    command_order: Vec<&'static str>,
    sections: BTreeMap<&'static str, SectionDef>,
    section_order: Vec<&'static str>,
    addons: BTreeMap<&'static str, AddonFactory>,
}

impl ComposedSpec {
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn command(&self, name: &str) -> Option<&CommandDef> {
        self.commands.get(name)
    }

    pub fn section(&self, name: &str) -> Option<&SectionDef> {
        self.sections.get(name)
    }

    pub fn command_order(&self) -> &[&'static str] {
        &self.command_order
    }

    pub fn section_order(&self) -> &[&'static str] {
        &self.section_order
    }

    pub fn addon_factory(&self, id: &str) -> Option<&AddonFactory> {
        self.addons.get(id)
    }

    pub fn has_addons(&self) -> bool {
        !self.addons.is_empty()
    }
}

/// Merge module specifications.  The composed version is the maximum
/// of the module versions.
pub fn compose(modules: Vec<ModuleSpec>) -> Result<ComposedSpec> {
    let mut version = 0;
    let mut commands: BTreeMap<&'static str, CommandDef> = BTreeMap::new();
    let mut command_order = Vec::new();
    let mut records: BTreeMap<&'static str, &'static str> = BTreeMap::new();
    let mut sections = BTreeMap::new();
    let mut section_order = Vec::new();
    let mut addons = BTreeMap::new();
    for module in &modules {
        version = version.max(module.version);
        for cmd in &module.commands {
            if let Some(existing) = commands.get(cmd.name) {
                if !(cmd.shared && existing.shared) {
                    bail!(
                        "command \"{}\" claimed by module \"{}\" is already registered",
                        cmd.name,
                        module.name
                    );
                }
                if existing != cmd {
                    bail!(
                        "shared command \"{}\" has conflicting definitions (module \"{}\")",
                        cmd.name,
                        module.name
                    );
                }
                continue;
            }
            if let CommandKind::Repeatable(record) = cmd.kind {
                if let Some(owner) = records.insert(record, module.name) {
                    bail!(
                        "record type \"{}\" claimed by module \"{}\" is already registered by \"{}\"",
                        record,
                        module.name,
                        owner
                    );
                }
            }
            commands.insert(cmd.name, *cmd);
            command_order.push(cmd.name);
        }
        for section in &module.sections {
            if sections.insert(section.name, *section).is_some() {
                bail!(
                    "section \"%{}\" claimed by module \"{}\" is already registered",
                    section.name,
                    module.name
                );
            }
            section_order.push(section.name);
        }
        for (id, factory) in &module.addons {
            if addons.insert(*id, *factory).is_some() {
                bail!(
                    "addon \"{}\" claimed by module \"{}\" is already registered",
                    id,
                    module.name
                );
            }
        }
    }
    Ok(ComposedSpec {
        version,
        commands,
        command_order,
        sections,
        section_order,
        addons,
    })
}

/// Every subsystem module this core ships, in declaration order.
pub fn default_modules() -> Vec<ModuleSpec> {
    vec![
        crate::modules::network::spec(),
        crate::modules::storage::spec(),
        crate::modules::payload::spec(),
        crate::modules::deployment::spec(),
        crate::modules::system::spec(),
    ]
}

/// The full builtin specification.
pub fn default_spec() -> ComposedSpec {
    compose(default_modules()).expect("builtin module specs are disjoint")
}
