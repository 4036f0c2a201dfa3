//! casegen command-line front end
//!
//! Usage: `casegen [SUITE.json]`, reading stdin when the path is omitted or
//! `-`. The resolved suite is printed as JSON on stdout; diagnostics go to
//! stderr through the tracing subscriber (`RUST_LOG`, default `info`).
//!
//! Exit codes: 0 success, 1 invalid document or structural compile error,
//! 2 I/O failure.

use casegen::{Casegen, ResolverConfig, SuiteDocument};
use casegen_core::Severity;
use std::env;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const EXIT_INVALID: u8 = 1;
const EXIT_IO: u8 = 2;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let path = env::args().nth(1).filter(|p| p != "-");
    let input: Box<dyn Read> = match &path {
        Some(path) => match File::open(path) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(e) => {
                tracing::error!(path = %path, "cannot open suite: {}", e);
                return ExitCode::from(EXIT_IO);
            }
        },
        None => Box::new(io::stdin().lock()),
    };

    let document = match SuiteDocument::from_reader(input) {
        Ok(document) => document,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::from(EXIT_INVALID);
        }
    };
    let (definition, embedded) = match document.into_definition() {
        Ok(parts) => parts,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::from(EXIT_INVALID);
        }
    };

    // Environment variables override the document's own settings
    let config = match embedded {
        Some(config) => config.with_overrides(|name| env::var(name).ok()),
        None => ResolverConfig::from_env(),
    };
    tracing::debug!(?config, "resolver configuration");

    let casegen = Casegen::with_standard_library().with_config(config);
    let resolution = match casegen.run(&definition) {
        Ok(resolution) => resolution,
        Err(e) => {
            tracing::error!(code = e.code(), "{}", e);
            return ExitCode::from(EXIT_INVALID);
        }
    };

    let errors = resolution
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    tracing::info!(
        subjects = resolution.suite.len(),
        diagnostics = resolution.diagnostics.len(),
        errors,
        "done"
    );

    let mut stdout = io::stdout().lock();
    let written = serde_json::to_writer_pretty(&mut stdout, &resolution.suite)
        .map_err(io::Error::from)
        .and_then(|()| writeln!(stdout));
    if let Err(e) = written {
        tracing::error!("cannot write output: {}", e);
        return ExitCode::from(EXIT_IO);
    }
    ExitCode::SUCCESS
}
