//! The handler store: the typed aggregate produced by a parse pass,
//! and its canonical serializer.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde_json::json;

use crate::options::{ArgValue, ParsedCommand};
use crate::sections::{AddonData, SectionData};
use crate::spec::{ComposedSpec, SectionKind};

/// Aggregate root for one kickstart document.
///
/// Singleton commands hold at most one value (later occurrences
/// replace earlier ones); repeatable commands append in input order;
/// section bodies append when a section is opened twice; addons are
/// keyed by id.
#[derive(Debug, Default)]
pub struct HandlerStore {
    singletons: BTreeMap<String, ParsedCommand>,
    repeatable: BTreeMap<String, Vec<ParsedCommand>>,
    sections: BTreeMap<String, SectionData>,
    addons: BTreeMap<String, Box<dyn AddonData>>,
}

impl HandlerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.singletons.is_empty()
            && self.repeatable.is_empty()
            && self.sections.is_empty()
            && self.addons.is_empty()
    }

    /// Singleton write; replaces any prior value.
    pub fn set(&mut self, value: ParsedCommand) {
        self.singletons.insert(value.name.clone(), value);
    }

    /// Repeatable write; insertion order is preserved and observable
    /// in the serialized output.
    pub fn append(&mut self, record: ParsedCommand) {
        self.repeatable
            .entry(record.name.clone())
            .or_default()
            .push(record);
    }

    /// Open (or reopen) a section.  Reopening keeps the accumulated
    /// body; a reopen header with arguments replaces the stored one.
    pub fn open_section(&mut self, name: &str, kind: SectionKind, header: ParsedCommand) {
        match self.sections.get_mut(name) {
            Some(existing) => {
                if !header.args.is_empty() || !header.positionals.is_empty() {
                    existing.header = header;
                }
            }
            None => {
                self.sections
                    .insert(name.to_string(), SectionData::new(name, kind, header));
            }
        }
    }

    pub fn add_section_line(&mut self, name: &str, line: &str) {
        if let Some(section) = self.sections.get_mut(name) {
            section.lines.push(line.to_string());
        }
    }

    pub fn put_addon(&mut self, id: &str, data: Box<dyn AddonData>) {
        self.addons.insert(id.to_string(), data);
    }

    pub fn singleton(&self, name: &str) -> Option<&ParsedCommand> {
        self.singletons.get(name)
    }

    pub fn records(&self, name: &str) -> &[ParsedCommand] {
        self.repeatable.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn section(&self, name: &str) -> Option<&SectionData> {
        self.sections.get(name)
    }

    pub fn addon(&self, id: &str) -> Option<&dyn AddonData> {
        self.addons.get(id).map(|b| b.as_ref())
    }

    pub fn addon_mut(&mut self, id: &str) -> Option<&mut (dyn AddonData + 'static)> {
        self.addons.get_mut(id).map(|b| b.as_mut())
    }

    pub fn addon_ids(&self) -> impl Iterator<Item = &str> {
        self.addons.keys().map(|k| k.as_str())
    }

    /// Canonical textual form: singletons first in the composed spec's
    /// declaration order, then repeatable groups in declaration order
    /// (each group in insertion order), then sections in declaration
    /// order, then addons by id.
    pub fn to_text(&self, spec: &ComposedSpec) -> String {
        let mut out = String::new();
        for name in spec.command_order() {
            if let Some(cmd) = self.singletons.get(*name) {
                write_command(&mut out, "", cmd);
            }
        }
        for name in spec.command_order() {
            if let Some(records) = self.repeatable.get(*name) {
                for record in records {
                    write_command(&mut out, "", record);
                }
            }
        }
        for name in spec.section_order() {
            if let Some(section) = self.sections.get(*name) {
                write_command(&mut out, "%", &section.header);
                for line in &section.lines {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str("%end\n");
            }
        }
        for (id, addon) in &self.addons {
            addon.serialize(id, &mut out);
        }
        out
    }

    /// JSON export of the store, the installer-facing analogue of the
    /// canonical text.
    pub fn to_json(&self, spec: &ComposedSpec) -> serde_json::Value {
        let mut addons = serde_json::Map::new();
        for (id, addon) in &self.addons {
            let mut text = String::new();
            addon.serialize(id, &mut text);
            addons.insert(id.clone(), json!(text));
        }
        json!({
            "version": spec.version(),
            "commands": self.singletons,
            "records": self.repeatable,
            "sections": self.sections,
            "addons": addons,
        })
    }
}

impl PartialEq for HandlerStore {
    fn eq(&self, other: &Self) -> bool {
        if self.singletons != other.singletons
            || self.repeatable != other.repeatable
            || self.sections != other.sections
        {
            return false;
        }
        if self.addons.len() != other.addons.len() {
            return false;
        }
        // Addon objects compare by their serialized form.
        self.addons.iter().all(|(id, addon)| {
            other.addons.get(id).is_some_and(|theirs| {
                let (mut a, mut b) = (String::new(), String::new());
                addon.serialize(id, &mut a);
                theirs.serialize(id, &mut b);
                a == b
            })
        })
    }
}

fn quote(value: &str) -> Cow<'_, str> {
    shlex::try_quote(value).unwrap_or(Cow::Borrowed(value))
}

fn write_command(out: &mut String, prefix: &str, cmd: &ParsedCommand) {
    out.push_str(prefix);
    out.push_str(&cmd.name);
    for (name, value) in &cmd.args {
        match value {
            ArgValue::Flag(true) => {
                out.push_str(" --");
                out.push_str(name);
            }
            ArgValue::Flag(false) => {}
            ArgValue::Int(n) => {
                out.push_str(" --");
                out.push_str(name);
                out.push('=');
                out.push_str(&n.to_string());
            }
            ArgValue::Str(s) => {
                out.push_str(" --");
                out.push_str(name);
                out.push('=');
                out.push_str(&quote(s));
            }
            ArgValue::List(items) => {
                out.push_str(" --");
                out.push_str(name);
                out.push('=');
                out.push_str(&quote(&items.join(",")));
            }
        }
    }
    for positional in &cmd.positionals {
        out.push(' ');
        out.push_str(&quote(positional));
    }
    for token in &cmd.tail {
        out.push(' ');
        out.push_str(&quote(token));
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ArgValue;
    use crate::spec::default_spec;

    fn cmd(name: &str, args: &[(&str, ArgValue)]) -> ParsedCommand {
        ParsedCommand {
            name: name.to_string(),
            args: args
                .iter()
                .map(|(n, v)| (n.to_string(), v.clone()))
                .collect(),
            positionals: Vec::new(),
            tail: Vec::new(),
        }
    }

    #[test]
    fn test_empty_store_serializes_empty() {
        let spec = default_spec();
        let store = HandlerStore::new();
        assert!(store.is_empty());
        assert_eq!(store.to_text(&spec), "");
    }

    #[test]
    fn test_singleton_replace() {
        let mut store = HandlerStore::new();
        store.set(cmd("timezone", &[]));
        store.set(cmd("timezone", &[("utc", ArgValue::Flag(true))]));
        assert!(store.singleton("timezone").unwrap().flag("utc"));
    }

    #[test]
    fn test_repeatable_order() {
        let spec = default_spec();
        let mut store = HandlerStore::new();
        store.append(cmd("network", &[("device", ArgValue::Str("eth0".into()))]));
        store.append(cmd("network", &[("device", ArgValue::Str("eth1".into()))]));
        let records = store.records("network");
        assert_eq!(records[0].str_value("device"), Some("eth0"));
        assert_eq!(records[1].str_value("device"), Some("eth1"));
        let text = store.to_text(&spec);
        assert!(text.find("eth0").unwrap() < text.find("eth1").unwrap());
    }

    #[test]
    fn test_quoting() {
        let spec = default_spec();
        let mut store = HandlerStore::new();
        store.set(cmd(
            "bootloader",
            &[("append", ArgValue::Str("console=ttyS0 quiet".into()))],
        ));
        let text = store.to_text(&spec);
        assert_eq!(text, "bootloader --append=\"console=ttyS0 quiet\"\n");
    }

    #[test]
    fn test_section_reopen_appends() {
        let mut store = HandlerStore::new();
        store.open_section("packages", SectionKind::Packages, ParsedCommand::empty("packages"));
        store.add_section_line("packages", "vim");
        store.open_section("packages", SectionKind::Packages, ParsedCommand::empty("packages"));
        store.add_section_line("packages", "emacs");
        assert_eq!(store.section("packages").unwrap().lines, vec!["vim", "emacs"]);
    }
}
