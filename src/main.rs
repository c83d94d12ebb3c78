//! The main CLI logic.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use kscore::config::CoreConfig;
use kscore::treeinfo::{generate_treeinfo_repositories, SourceConfig, TreeInfoResolver};
use kscore::validate::{ValidationContext, ValidationReport};

#[derive(Debug, Parser)]
#[command(name = "kscore", version, about = "Kickstart and treeinfo configuration core")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a kickstart document and print its canonical form.
    Parse {
        /// Input file, or `-` for stdin.
        path: PathBuf,
        /// Emit the parsed model as JSON instead of kickstart text.
        #[arg(long)]
        json: bool,
    },
    /// Parse a kickstart document and report configuration problems.
    Validate {
        /// Input file, or `-` for stdin.
        path: PathBuf,
        /// Reject proxies that carry credentials.
        #[arg(long)]
        forbid_proxy_auth: bool,
    },
    /// Resolve an installation-source URL into package repositories.
    ResolveTreeinfo {
        /// Tree root: an http/https/ftp URL or a local path.
        url: String,
        /// Proxy specifier, `[scheme://][user[:password]@]host[:port]`.
        #[arg(long)]
        proxy: Option<String>,
        /// Skip TLS certificate verification.
        #[arg(long)]
        no_ssl_verify: bool,
    },
}

fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn print_report(report: &ValidationReport) {
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    for error in &report.errors {
        println!("error: {error}");
    }
}

/// The real main function returns a `Result<>`.
fn inner_main() -> Result<i32> {
    // Diagnostics go to stderr; stdout carries the canonical output.
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    tracing::trace!("starting");
    let cli = Cli::parse();
    let spec = kscore::default_spec();
    match cli.command {
        Command::Parse { path, json } => {
            let text = read_input(&path)?;
            let store = kscore::parser::parse(&spec, &text)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&store.to_json(&spec))?);
            } else {
                print!("{}", store.to_text(&spec));
            }
            Ok(0)
        }
        Command::Validate {
            path,
            forbid_proxy_auth,
        } => {
            let text = read_input(&path)?;
            let store = kscore::parser::parse(&spec, &text)?;
            let config = CoreConfig::default();
            let mut ctx = ValidationContext::new(&config);
            ctx.allow_proxy_auth = !forbid_proxy_auth;
            let report = kscore::validate::validate(&store, &ctx);
            print_report(&report);
            Ok(if report.is_valid() { 0 } else { 1 })
        }
        Command::ResolveTreeinfo {
            url,
            proxy,
            no_ssl_verify,
        } => {
            let mut source = SourceConfig::with_url(&url);
            source.proxy = proxy;
            source.ssl_verify = !no_ssl_verify;
            let config = CoreConfig::default();
            let resolver = TreeInfoResolver::new(&source, &config);
            let metadata = resolver.resolve()?;
            let repos = generate_treeinfo_repositories(&source, &metadata);
            println!("{}", serde_json::to_string_pretty(&repos)?);
            Ok(0)
        }
    }
}

fn main() {
    match inner_main() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}
