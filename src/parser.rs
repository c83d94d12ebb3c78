//! The parse pass: tokenized lines are dispatched to the option
//! parser, section handlers or addon objects, and accumulate in a
//! [`HandlerStore`].
//!
//! The dispatcher is a three-state machine: command lines, inside a
//! builtin section, inside an addon section.  `%end` returns to the
//! command state; EOF inside a section is an error, as is opening a
//! section while one is already open.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use tracing::debug;

use crate::errors::ParseError;
use crate::handler::HandlerStore;
use crate::options::{parse_command, CommandDef, CommandKind};
use crate::spec::ComposedSpec;
use crate::tokenizer::{logical_lines, LogicalLine};

enum State {
    Commands,
    InSection { name: String },
    InAddon { id: String },
}

fn section_error(name: &str, line: usize, cause: impl std::fmt::Display) -> ParseError {
    ParseError::SectionParse {
        name: name.to_string(),
        line,
        cause: cause.to_string(),
    }
}

/// True when a section body line opens another section, which is not
/// permitted.  Only known directives count; a stray `%` inside e.g. a
/// shell script body stays verbatim.
fn opens_section(spec: &ComposedSpec, trimmed: &str) -> bool {
    let Some(word) = trimmed.strip_prefix('%') else {
        return false;
    };
    let word = word.split_whitespace().next().unwrap_or("");
    word == "addon" || spec.section(word).is_some()
}

fn split_tokens(line: &LogicalLine) -> Result<Vec<String>, ParseError> {
    shlex::split(line.text.trim()).ok_or_else(|| ParseError::Syntax {
        line: line.number,
        reason: "unbalanced quoting".to_string(),
    })
}

/// True for a line whose first word is `%end`.  Trailing tokens after
/// `%end` are a syntax error, reported by the caller.
fn is_end_directive(trimmed: &str) -> bool {
    trimmed.split_whitespace().next() == Some("%end")
}

fn close_section(trimmed: &str, line: usize) -> Result<(), ParseError> {
    if trimmed != "%end" {
        return Err(ParseError::Syntax {
            line,
            reason: "%end takes no arguments".to_string(),
        });
    }
    Ok(())
}

/// Parse a full kickstart document against a composed specification.
pub fn parse(spec: &ComposedSpec, text: &str) -> Result<HandlerStore, ParseError> {
    let mut store = HandlerStore::new();
    let mut state = State::Commands;
    for line in logical_lines(text) {
        let trimmed = line.text.trim();
        match &state {
            State::Commands => {
                if trimmed.is_empty() {
                    continue;
                }
                if let Some(directive) = trimmed.strip_prefix('%') {
                    let tokens = split_tokens(&line)?;
                    let name = directive.split_whitespace().next().unwrap_or("");
                    state = open_section(spec, &mut store, name, &tokens, line.number)?;
                } else {
                    handle_command(spec, &mut store, &line)?;
                }
            }
            State::InSection { name } => {
                if is_end_directive(trimmed) {
                    close_section(trimmed, line.number)?;
                    debug!(section = name.as_str(), "closing section");
                    state = State::Commands;
                } else if opens_section(spec, trimmed) {
                    return Err(section_error(
                        name,
                        line.number,
                        format_args!("unexpected \"{trimmed}\" inside an open section"),
                    ));
                } else {
                    store.add_section_line(name, &line.text);
                }
            }
            State::InAddon { id } => {
                if is_end_directive(trimmed) {
                    close_section(trimmed, line.number)?;
                    let addon = store.addon_mut(id).expect("open addon is stored");
                    addon.handle_end().map_err(|e| section_error(id, line.number, e))?;
                    state = State::Commands;
                } else if opens_section(spec, trimmed) {
                    return Err(section_error(
                        id,
                        line.number,
                        format_args!("unexpected \"{trimmed}\" inside an open section"),
                    ));
                } else {
                    let addon = store.addon_mut(id).expect("open addon is stored");
                    addon
                        .handle_line(&line.text, line.number)
                        .map_err(|e| section_error(id, line.number, e))?;
                }
            }
        }
    }
    match state {
        State::Commands => Ok(store),
        State::InSection { name } | State::InAddon { id: name } => {
            Err(ParseError::UnterminatedSection { name })
        }
    }
}

fn handle_command(
    spec: &ComposedSpec,
    store: &mut HandlerStore,
    line: &LogicalLine,
) -> Result<(), ParseError> {
    let tokens = split_tokens(line)?;
    let Some((verb, args)) = tokens.split_first() else {
        return Ok(());
    };
    let Some(def) = spec.command(verb) else {
        return Err(ParseError::UnknownCommand {
            name: verb.clone(),
            line: line.number,
        });
    };
    let parsed = parse_command(def, args, spec.version(), line.number)?;
    match def.kind {
        CommandKind::Singleton => store.set(parsed),
        CommandKind::Repeatable(_) => store.append(parsed),
    }
    Ok(())
}

fn open_section(
    spec: &ComposedSpec,
    store: &mut HandlerStore,
    name: &str,
    tokens: &[String],
    line: usize,
) -> Result<State, ParseError> {
    if name == "end" {
        return Err(ParseError::Syntax {
            line,
            reason: "%end outside of a section".to_string(),
        });
    }
    if name == "addon" {
        let Some(id) = tokens.get(1) else {
            return Err(ParseError::Syntax {
                line,
                reason: "%addon requires an addon id".to_string(),
            });
        };
        let args = &tokens[2..];
        if store.addon(id).is_none() {
            let Some(factory) = spec.addon_factory(id) else {
                return Err(ParseError::UnknownAddon {
                    name: id.clone(),
                    line,
                });
            };
            store.put_addon(id, factory());
        }
        let addon = store.addon_mut(id).expect("addon was just stored");
        addon
            .handle_header(args, line)
            .map_err(|e| section_error(id, line, e))?;
        debug!(addon = id.as_str(), "opened addon section");
        return Ok(State::InAddon { id: id.clone() });
    }
    let Some(section) = spec.section(name) else {
        return Err(ParseError::UnknownSection {
            name: name.to_string(),
            line,
        });
    };
    let def = CommandDef::new(
        section.name,
        CommandKind::Singleton,
        section.options,
        section.introduced,
    );
    let header = parse_command(&def, &tokens[1..], spec.version(), line)?;
    store.open_section(name, section.kind, header);
    debug!(section = name, "opened section");
    Ok(State::InSection {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::OptionBagAddon;
    use crate::spec::{compose, default_modules, default_spec, ModuleSpec};
    use indoc::indoc;
    use similar_asserts::assert_eq as assert_text_eq;

    fn spec_with_test_addon() -> ComposedSpec {
        let mut modules = default_modules();
        modules.push(ModuleSpec {
            name: "test-addon",
            version: 30,
            commands: vec![],
            sections: vec![],
            addons: vec![("my_test_1", OptionBagAddon::factory)],
        });
        compose(modules).unwrap()
    }

    #[test]
    fn test_empty_document() {
        let spec = default_spec();
        let store = parse(&spec, "").unwrap();
        assert!(store.is_empty());
        assert_eq!(store.to_text(&spec), "");
    }

    #[test]
    fn test_single_command() {
        let spec = default_spec();
        let store = parse(&spec, "skipx\n").unwrap();
        assert!(store.singleton("skipx").is_some());
        assert!(store.to_text(&spec).contains("skipx"));
    }

    #[test]
    fn test_repeatable_in_order() {
        let spec = default_spec();
        let store = parse(
            &spec,
            "network --device=eth0 --bootproto=dhcp\nnetwork --device=eth1 --bootproto=dhcp\n",
        )
        .unwrap();
        let records = store.records("network");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].str_value("device"), Some("eth0"));
        assert_eq!(records[1].str_value("device"), Some("eth1"));
    }

    #[test]
    fn test_unknown_command_and_section() {
        let spec = default_spec();
        let err = parse(&spec, "frobnicate --hard\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownCommand {
                name: "frobnicate".into(),
                line: 1
            }
        );
        let err = parse(&spec, "%xconfig\n%end\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownSection {
                name: "xconfig".into(),
                line: 1
            }
        );
    }

    #[test]
    fn test_addon_section() {
        let spec = spec_with_test_addon();
        let input = "%addon my_test_1 --foo=10 --bar\nline1\nline2\n%end\n";
        let store = parse(&spec, input).unwrap();
        let addon = store
            .addon("my_test_1")
            .unwrap()
            .as_any()
            .downcast_ref::<OptionBagAddon>()
            .unwrap();
        assert_eq!(addon.get_int("foo"), Some(10));
        assert!(addon.get_flag("bar"));
        assert_eq!(addon.lines, vec!["line1", "line2"]);
        assert_text_eq!(store.to_text(&spec), input);
    }

    #[test]
    fn test_unknown_addon() {
        let spec = spec_with_test_addon();
        let err = parse(&spec, "%addon no_such_addon\n%end\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownAddon {
                name: "no_such_addon".into(),
                line: 1
            }
        );
    }

    #[test]
    fn test_packages_section_appends() {
        let spec = default_spec();
        let store = parse(
            &spec,
            indoc! {"
                %packages
                vim
                %end
                %packages
                emacs
                %end
            "},
        )
        .unwrap();
        let section = store.section("packages").unwrap();
        assert_eq!(section.lines, vec!["vim", "emacs"]);
    }

    #[test]
    fn test_unterminated_section() {
        let spec = default_spec();
        let err = parse(&spec, "%packages\nvim\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnterminatedSection {
                name: "packages".into()
            }
        );
    }

    #[test]
    fn test_nested_section_rejected() {
        let spec = default_spec();
        let err = parse(&spec, "%packages\n%post\n%end\n%end\n").unwrap_err();
        assert!(matches!(err, ParseError::SectionParse { line: 2, .. }));
    }

    #[test]
    fn test_end_with_trailing_tokens() {
        let spec = default_spec();
        let err = parse(&spec, "%packages\nvim\n%end now\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::Syntax {
                line: 3,
                reason: "%end takes no arguments".into()
            }
        );
    }

    #[test]
    fn test_bootloader_append_requires_equals() {
        let spec = default_spec();
        let err = parse(&spec, "bootloader --append \"console=ttyS0 quiet\"\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidArgument { line: 1, .. }
        ));
        assert!(parse(&spec, "bootloader --append=\"console=ttyS0 quiet\"\n").is_ok());
    }

    #[test]
    fn test_stray_end() {
        let spec = default_spec();
        let err = parse(&spec, "%end\n").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_script_body_keeps_percent_lines() {
        let spec = default_spec();
        let store = parse(
            &spec,
            "%post --erroronfail\nprintf '%s\\n' hello\n%end\n",
        )
        .unwrap();
        let section = store.section("post").unwrap();
        assert!(section.header.flag("erroronfail"));
        // The printf format string is not a directive.
        assert_eq!(section.lines, vec!["printf '%s\\n' hello"]);
    }

    #[test]
    fn test_singleton_replacement() {
        let spec = default_spec();
        let store = parse(&spec, "timezone UTC\ntimezone America/New_York --utc\n").unwrap();
        let tz = store.singleton("timezone").unwrap();
        assert_eq!(tz.positionals, vec!["America/New_York"]);
        assert!(tz.flag("utc"));
    }

    const RICH: &str = indoc! {"
        lang en_US.UTF-8
        keyboard --vckeymap=us us
        timezone America/New_York --utc
        rootpw --iscrypted $6$abcdef
        user --name=admin --groups=wheel,docker --uid=1000
        network --device=eth0 --bootproto=dhcp --activate
        network --device=eth1 --bootproto=static --ip=10.0.0.2 --netmask=255.255.255.0
        firewall --enabled --service=ssh,https
        clearpart --all --initlabel --drives=sda,sdb
        ignoredisk --only-use=sda,sdb
        autopart --type=lvm
        bootloader --location=mbr --append=\"console=ttyS0 quiet\" --timeout=5
        url --url=http://example.com/tree --proxy=http://proxy.example:3128
        repo --name=updates --baseurl=http://example.com/updates --cost=50
        repo --name=extras --baseurl=http://example.com/extras --noverifyssl
        skipx
        firstboot --disable
        reboot --eject
        %packages --excludedocs
        @core
        vim-enhanced
        -sendmail
        %end
        %post --erroronfail --log=/root/post.log
        echo done
        %end
    "};

    /// parse→serialize→parse must be structurally identical.
    #[test]
    fn test_round_trip() {
        let spec = default_spec();
        let first = parse(&spec, RICH).unwrap();
        let text = first.to_text(&spec);
        let second = parse(&spec, &text).unwrap();
        assert!(first == second);
    }

    /// serialize∘parse is idempotent byte-for-byte.
    #[test]
    fn test_serialization_idempotence() {
        let spec = default_spec();
        let canonical = parse(&spec, RICH).unwrap().to_text(&spec);
        let again = parse(&spec, &canonical).unwrap().to_text(&spec);
        assert_text_eq!(canonical, again);
    }

    #[test]
    fn test_json_export() {
        let spec = default_spec();
        let store = parse(&spec, "skipx\nnetwork --device=eth0\n").unwrap();
        let value = store.to_json(&spec);
        assert_eq!(value["version"], spec.version());
        assert!(value["commands"]["skipx"].is_object());
        assert_eq!(value["records"]["network"][0]["name"], "network");
    }
}
