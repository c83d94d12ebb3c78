//! Data-driven option parsing for kickstart commands and section
//! headers.
//!
//! Each command carries a schema of [`OptionDef`]s; parsing an
//! argument vector against the schema yields a typed [`ParsedCommand`]
//! whose arguments are canonically ordered by the schema.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use serde_derive::{Deserialize, Serialize};

use crate::errors::ParseError;

/// The value kind of a single option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptKind {
    /// Present/absent; takes no value.
    Flag,
    Str,
    Int,
    /// One of a fixed set of words.
    Choice(&'static [&'static str]),
    /// Comma-separated values; repeated occurrences append.
    List,
}

/// How an option accepts its value on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMode {
    /// `--name=value` only.
    Equals,
    /// `--name value` only.
    Next,
    /// Either form.
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionDef {
    pub name: &'static str,
    pub kind: OptKind,
    pub mode: ValueMode,
    /// Kickstart syntax version that introduced this option.
    pub introduced: u32,
}

impl OptionDef {
    pub const fn new(name: &'static str, kind: OptKind, introduced: u32) -> Self {
        Self {
            name,
            kind,
            mode: ValueMode::Both,
            introduced,
        }
    }

    pub const fn flag(name: &'static str, introduced: u32) -> Self {
        Self::new(name, OptKind::Flag, introduced)
    }

    /// Restrict the option to the `--name=value` form.  Used where the
    /// value routinely begins with dashes and would be misread as the
    /// next option.
    pub const fn require_equals(mut self) -> Self {
        self.mode = ValueMode::Equals;
        self
    }
}

/// Whether a command stores a single value or appends data records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Singleton,
    /// The argument names the record type produced per invocation.
    Repeatable(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDef {
    pub name: &'static str,
    pub kind: CommandKind,
    pub options: &'static [OptionDef],
    /// Maximum positional arguments following the options.
    pub max_positionals: usize,
    /// Collect unrecognized trailing tokens verbatim instead of
    /// erroring on them.
    pub free_tail: bool,
    /// Explicitly shared across module specifications (e.g. `liveimg`).
    pub shared: bool,
    pub introduced: u32,
}

impl CommandDef {
    pub const fn new(
        name: &'static str,
        kind: CommandKind,
        options: &'static [OptionDef],
        introduced: u32,
    ) -> Self {
        Self {
            name,
            kind,
            options,
            max_positionals: 0,
            free_tail: false,
            shared: false,
            introduced,
        }
    }

    pub const fn with_positionals(mut self, n: usize) -> Self {
        self.max_positionals = n;
        self
    }

    pub const fn with_free_tail(mut self) -> Self {
        self.free_tail = true;
        self
    }

    pub const fn shared(mut self) -> Self {
        self.shared = true;
        self
    }

    fn find_option(&self, name: &str) -> Option<&'static OptionDef> {
        self.options.iter().find(|o| o.name == name)
    }
}

/// A typed argument value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Flag(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> bool {
        matches!(self, ArgValue::Flag(true))
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ArgValue::List(l) => Some(l),
            _ => None,
        }
    }
}

/// One parsed invocation of a command (or section header).  Arguments
/// are stored in schema order, which makes the canonical serialization
/// and structural comparison straightforward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<(String, ArgValue)>,
    pub positionals: Vec<String>,
    pub tail: Vec<String>,
}

impl ParsedCommand {
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            args: Vec::new(),
            positionals: Vec::new(),
            tail: Vec::new(),
        }
    }

    pub fn get(&self, option: &str) -> Option<&ArgValue> {
        self.args
            .iter()
            .find(|(name, _)| name == option)
            .map(|(_, v)| v)
    }

    pub fn flag(&self, option: &str) -> bool {
        self.get(option).map(|v| v.as_flag()).unwrap_or(false)
    }

    pub fn str_value(&self, option: &str) -> Option<&str> {
        self.get(option).and_then(|v| v.as_str())
    }
}

fn invalid(def: &CommandDef, option: &str, line: usize, reason: impl Into<String>) -> ParseError {
    ParseError::InvalidArgument {
        command: def.name.to_string(),
        option: option.to_string(),
        line,
        reason: reason.into(),
    }
}

fn parse_value(
    def: &CommandDef,
    opt: &OptionDef,
    value: &str,
    prior: Option<ArgValue>,
    line: usize,
) -> Result<ArgValue, ParseError> {
    match opt.kind {
        OptKind::Flag => unreachable!("flags carry no value"),
        OptKind::Str => Ok(ArgValue::Str(value.to_string())),
        OptKind::Int => value
            .parse::<i64>()
            .map(ArgValue::Int)
            .map_err(|_| invalid(def, opt.name, line, format!("\"{value}\" is not an integer"))),
        OptKind::Choice(choices) => {
            if choices.contains(&value) {
                Ok(ArgValue::Str(value.to_string()))
            } else {
                Err(invalid(
                    def,
                    opt.name,
                    line,
                    format!("\"{}\" is not one of {}", value, choices.join(", ")),
                ))
            }
        }
        OptKind::List => {
            let mut items = match prior {
                Some(ArgValue::List(items)) => items,
                _ => Vec::new(),
            };
            items.extend(value.split(',').map(|s| s.to_string()));
            Ok(ArgValue::List(items))
        }
    }
}

/// Parse `argv` against `def` at syntax version `version`.  `line` is
/// only used to decorate errors.
pub fn parse_command(
    def: &CommandDef,
    argv: &[String],
    version: u32,
    line: usize,
) -> Result<ParsedCommand, ParseError> {
    let mut values: Vec<(&'static str, ArgValue)> = Vec::new();
    let mut positionals = Vec::new();
    let mut tail = Vec::new();
    let mut tokens = argv.iter().enumerate();
    'tokens: while let Some((idx, token)) = tokens.next() {
        let Some(body) = token.strip_prefix("--") else {
            if positionals.len() < def.max_positionals {
                positionals.push(token.clone());
                continue;
            }
            if def.free_tail {
                tail.extend(argv[idx..].iter().cloned());
                break;
            }
            return Err(invalid(def, token, line, "unexpected positional argument"));
        };
        let (name, inline_value) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };
        let Some(opt) = def.find_option(name) else {
            if def.free_tail {
                tail.extend(argv[idx..].iter().cloned());
                break;
            }
            return Err(ParseError::UnknownOption {
                command: def.name.to_string(),
                option: name.to_string(),
                line,
            });
        };
        if opt.introduced > version {
            return Err(ParseError::VersionMismatch {
                command: def.name.to_string(),
                option: opt.name.to_string(),
                line,
                introduced: opt.introduced,
                target: version,
            });
        }
        if let OptKind::Flag = opt.kind {
            if inline_value.is_some() {
                return Err(invalid(def, opt.name, line, "flag takes no value"));
            }
            values.retain(|(n, _)| *n != opt.name);
            values.push((opt.name, ArgValue::Flag(true)));
            continue 'tokens;
        }
        let value = match (inline_value, opt.mode) {
            (Some(v), ValueMode::Equals | ValueMode::Both) => v.to_string(),
            (Some(_), ValueMode::Next) => {
                return Err(invalid(def, opt.name, line, "value must follow as a separate token"));
            }
            (None, ValueMode::Equals) => {
                return Err(invalid(def, opt.name, line, "value must be given as --name=value"));
            }
            (None, ValueMode::Next | ValueMode::Both) => match tokens.next() {
                Some((_, v)) if !v.starts_with("--") => v.clone(),
                _ => return Err(invalid(def, opt.name, line, "missing value")),
            },
        };
        let prior = values
            .iter()
            .position(|(n, _)| *n == opt.name)
            .map(|i| values.remove(i).1);
        let parsed = parse_value(def, opt, &value, prior, line)?;
        values.push((opt.name, parsed));
    }
    // Canonical order is schema order, not occurrence order.
    let mut args = Vec::with_capacity(values.len());
    for opt in def.options {
        if let Some(pos) = values.iter().position(|(n, _)| *n == opt.name) {
            let (name, value) = values.remove(pos);
            args.push((name.to_string(), value));
        }
    }
    Ok(ParsedCommand {
        name: def.name.to_string(),
        args,
        positionals,
        tail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTS: &[OptionDef] = &[
        OptionDef::new("device", OptKind::Str, 30),
        OptionDef::new(
            "bootproto",
            OptKind::Choice(&["dhcp", "static", "ibft", "query"]),
            30,
        ),
        OptionDef::new("nameserver", OptKind::List, 30),
        OptionDef::new("mtu", OptKind::Int, 30),
        OptionDef::flag("onboot", 30),
        OptionDef::flag("activate", 32),
    ];

    const DEF: CommandDef = CommandDef::new("network", CommandKind::Repeatable("NetworkData"), OPTS, 30);

    fn argv(s: &str) -> Vec<String> {
        s.split_whitespace().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_basic_forms() {
        let cmd = parse_command(&DEF, &argv("--device=eth0 --bootproto dhcp --onboot"), 32, 1).unwrap();
        assert_eq!(cmd.str_value("device"), Some("eth0"));
        assert_eq!(cmd.str_value("bootproto"), Some("dhcp"));
        assert!(cmd.flag("onboot"));
        assert!(!cmd.flag("activate"));
    }

    #[test]
    fn test_canonical_schema_order() {
        let cmd = parse_command(&DEF, &argv("--onboot --device=eth0"), 32, 1).unwrap();
        let names: Vec<_> = cmd.args.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["device", "onboot"]);
    }

    #[test]
    fn test_list_appends() {
        let cmd = parse_command(&DEF, &argv("--nameserver=1.1.1.1,8.8.8.8 --nameserver=9.9.9.9"), 32, 1)
            .unwrap();
        assert_eq!(
            cmd.get("nameserver").unwrap().as_list().unwrap(),
            &["1.1.1.1", "8.8.8.8", "9.9.9.9"]
        );
    }

    #[test]
    fn test_int_and_choice_errors() {
        let err = parse_command(&DEF, &argv("--mtu=soon"), 32, 7).unwrap_err();
        assert!(matches!(err, ParseError::InvalidArgument { line: 7, .. }));
        let err = parse_command(&DEF, &argv("--bootproto=carrier-pigeon"), 32, 2).unwrap_err();
        assert!(matches!(err, ParseError::InvalidArgument { line: 2, .. }));
    }

    #[test]
    fn test_unknown_option() {
        let err = parse_command(&DEF, &argv("--slaves=eth0"), 32, 3).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownOption {
                command: "network".into(),
                option: "slaves".into(),
                line: 3,
            }
        );
    }

    #[test]
    fn test_version_gate() {
        let err = parse_command(&DEF, &argv("--activate"), 30, 4).unwrap_err();
        assert!(matches!(
            err,
            ParseError::VersionMismatch {
                introduced: 32,
                target: 30,
                ..
            }
        ));
    }

    #[test]
    fn test_value_mode_equals() {
        const OPTS: &[OptionDef] = &[OptionDef::new("append", OptKind::Str, 30).require_equals()];
        const DEF: CommandDef = CommandDef::new("bootloader", CommandKind::Singleton, OPTS, 30);
        let cmd = parse_command(&DEF, &argv("--append=quiet"), 30, 1).unwrap();
        assert_eq!(cmd.str_value("append"), Some("quiet"));
        let err = parse_command(&DEF, &argv("--append quiet"), 30, 2).unwrap_err();
        assert!(matches!(err, ParseError::InvalidArgument { line: 2, .. }));
        assert!(err.to_string().contains("--name=value"));
    }

    #[test]
    fn test_value_mode_next() {
        const OPTS: &[OptionDef] = &[OptionDef {
            name: "device",
            kind: OptKind::Str,
            mode: ValueMode::Next,
            introduced: 30,
        }];
        const DEF: CommandDef = CommandDef::new("probe", CommandKind::Singleton, OPTS, 30);
        let cmd = parse_command(&DEF, &argv("--device sda"), 30, 1).unwrap();
        assert_eq!(cmd.str_value("device"), Some("sda"));
        let err = parse_command(&DEF, &argv("--device=sda"), 30, 3).unwrap_err();
        assert!(matches!(err, ParseError::InvalidArgument { line: 3, .. }));
        assert!(err.to_string().contains("separate token"));
    }

    #[test]
    fn test_flag_rejects_value() {
        let err = parse_command(&DEF, &argv("--onboot=yes"), 32, 5).unwrap_err();
        assert!(matches!(err, ParseError::InvalidArgument { .. }));
    }

    #[test]
    fn test_positionals() {
        const LANG: CommandDef =
            CommandDef::new("lang", CommandKind::Singleton, &[], 30).with_positionals(1);
        let cmd = parse_command(&LANG, &argv("en_US.UTF-8"), 30, 1).unwrap();
        assert_eq!(cmd.positionals, vec!["en_US.UTF-8"]);
        let err = parse_command(&LANG, &argv("en_US de_DE"), 30, 1).unwrap_err();
        assert!(matches!(err, ParseError::InvalidArgument { .. }));
    }

    #[test]
    fn test_free_tail() {
        const BAG: CommandDef = CommandDef::new("bag", CommandKind::Singleton, OPTS, 30).with_free_tail();
        let cmd = parse_command(&BAG, &argv("--device=eth0 --exotic=1 trailing"), 32, 1).unwrap();
        assert_eq!(cmd.str_value("device"), Some("eth0"));
        assert_eq!(cmd.tail, vec!["--exotic=1", "trailing"]);
    }
}
