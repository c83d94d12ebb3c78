//! Typed failure taxonomy for the configuration core.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use thiserror::Error;

/// Errors raised while ingesting a kickstart document.  Every variant
/// carries the 1-based line number reported by the tokenizer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command \"{name}\" on line {line}")]
    UnknownCommand { name: String, line: usize },
    #[error("unknown option \"{option}\" for command \"{command}\" on line {line}")]
    UnknownOption {
        command: String,
        option: String,
        line: usize,
    },
    #[error("invalid argument to option \"{option}\" of command \"{command}\" on line {line}: {reason}")]
    InvalidArgument {
        command: String,
        option: String,
        line: usize,
        reason: String,
    },
    #[error("option \"{option}\" of command \"{command}\" was introduced in version {introduced}, but parsing targets version {target} (line {line})")]
    VersionMismatch {
        command: String,
        option: String,
        line: usize,
        introduced: u32,
        target: u32,
    },
    #[error("unknown section \"%{name}\" on line {line}")]
    UnknownSection { name: String, line: usize },
    #[error("section \"%{name}\" is missing its %end")]
    UnterminatedSection { name: String },
    #[error("error in section \"%{name}\" on line {line}: {cause}")]
    SectionParse {
        name: String,
        line: usize,
        cause: String,
    },
    #[error("unknown addon \"{name}\" on line {line}")]
    UnknownAddon { name: String, line: usize },
    #[error("invalid syntax on line {line}: {reason}")]
    Syntax { line: usize, reason: String },
}

/// Errors from the treeinfo resolver.  `NoTreeInfo` is recoverable:
/// the caller may fall back to treating the source URL as a plain
/// repository.  `InvalidTreeInfo` means the metadata existed but was
/// malformed, which is fatal for that source URL.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeInfoError {
    #[error("{0}")]
    NoTreeInfo(String),
    #[error("invalid treeinfo metadata: {0}")]
    InvalidTreeInfo(String),
}
