//! Section bodies and the addon seam.
//!
//! Builtin sections (`%packages`, the script sections, `%certificate`)
//! store their body lines verbatim in a [`SectionData`]; `%addon`
//! bodies are handed to an [`AddonData`] object registered under the
//! addon id.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{bail, Result};
use serde_derive::{Deserialize, Serialize};

use crate::options::ParsedCommand;
use crate::spec::SectionKind;

/// The stored form of one `%name … %end` block.  Reopening a section
/// appends to `lines`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionData {
    pub name: String,
    pub kind: SectionKind,
    pub header: ParsedCommand,
    pub lines: Vec<String>,
}

impl SectionData {
    pub fn new(name: &str, kind: SectionKind, header: ParsedCommand) -> Self {
        Self {
            name: name.to_string(),
            kind,
            header,
            lines: Vec::new(),
        }
    }

    /// Packages selected for installation (`%packages` body lines that
    /// are not excludes).  Group references keep their `@` prefix.
    /// Script and certificate bodies have no package semantics and
    /// yield nothing.
    pub fn packages(&self) -> Vec<&str> {
        if self.kind != SectionKind::Packages {
            return Vec::new();
        }
        self.lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty() && !l.starts_with('-'))
            .collect()
    }

    /// Packages excluded via a `-pkg` body line.
    pub fn excluded_packages(&self) -> Vec<&str> {
        if self.kind != SectionKind::Packages {
            return Vec::new();
        }
        self.lines
            .iter()
            .map(|l| l.trim())
            .filter_map(|l| l.strip_prefix('-'))
            .collect()
    }
}

/// A third-party addon's data object.  One instance lives in the
/// handler store per addon id that appears in the document; the hooks
/// mirror the section lifecycle.
pub trait AddonData {
    fn handle_header(&mut self, args: &[String], line: usize) -> Result<()>;
    fn handle_line(&mut self, text: &str, line: usize) -> Result<()>;
    fn handle_end(&mut self) -> Result<()>;
    /// Append the canonical `%addon id … %end` block to `out`.
    fn serialize(&self, id: &str, out: &mut String);
    /// Downcasting seam for typed access to a concrete addon.
    fn as_any(&self) -> &dyn std::any::Any;
}

impl std::fmt::Debug for dyn AddonData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut text = String::new();
        self.serialize("<addon>", &mut text);
        f.write_str(text.trim_end())
    }
}

/// A generic addon implementation that records `--name[=value]` header
/// options into a typed bag and keeps body lines verbatim.  Useful on
/// its own and as the reference addon for tests.
#[derive(Debug, Default)]
pub struct OptionBagAddon {
    header_args: Vec<String>,
    pub lines: Vec<String>,
}

impl OptionBagAddon {
    pub fn factory() -> Box<dyn AddonData> {
        Box::<OptionBagAddon>::default()
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        let prefix = format!("--{name}");
        self.header_args.iter().rev().find_map(|arg| {
            if let Some(rest) = arg.strip_prefix(&prefix) {
                match rest.strip_prefix('=') {
                    Some(value) => Some(value),
                    None if rest.is_empty() => Some(""),
                    None => None,
                }
            } else {
                None
            }
        })
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.lookup(name).and_then(|v| v.parse().ok())
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.lookup(name).filter(|v| !v.is_empty())
    }

    pub fn get_flag(&self, name: &str) -> bool {
        matches!(self.lookup(name), Some(""))
    }
}

impl AddonData for OptionBagAddon {
    fn handle_header(&mut self, args: &[String], line: usize) -> Result<()> {
        for arg in args {
            if !arg.starts_with("--") {
                bail!("unexpected addon argument \"{arg}\" on line {line}");
            }
        }
        if !args.is_empty() {
            self.header_args = args.to_vec();
        }
        Ok(())
    }

    fn handle_line(&mut self, text: &str, _line: usize) -> Result<()> {
        self.lines.push(text.to_string());
        Ok(())
    }

    fn handle_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn serialize(&self, id: &str, out: &mut String) {
        out.push_str("%addon ");
        out.push_str(id);
        for arg in &self.header_args {
            out.push(' ');
            out.push_str(arg);
        }
        out.push('\n');
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("%end\n");
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
