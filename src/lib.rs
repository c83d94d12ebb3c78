//! Declarative installation-configuration core: a kickstart parsing
//! engine driven by composable grammar specifications, plus a
//! treeinfo resolver that turns an installation-source URL into
//! package repositories.
// SPDX-License-Identifier: Apache-2.0 OR MIT

pub mod config;
pub mod errors;
pub mod handler;
pub mod modules;
pub mod options;
pub mod parser;
pub mod sections;
pub mod spec;
pub mod tokenizer;
pub mod treeinfo;
pub mod urlutils;
pub mod validate;

pub use config::{CoreConfig, RepoConfig, RepoOrigin, RepoType};
pub use errors::{ParseError, TreeInfoError};
pub use handler::HandlerStore;
pub use spec::{default_spec, ComposedSpec, ModuleSpec};
pub use treeinfo::{SourceConfig, TreeInfoMetadata, TreeInfoResolver};
