//! Command line front end for the gedtree library.
//!
//! Loads a GEDCOM file into a [`gedtree::tree::Tree`], prints per-kind
//! record statistics and, when asked, runs a duplicate scan over the
//! individuals. Settings come from an optional `gedtree.toml` next to the
//! binary, overridable through `GEDTREE_*` environment variables.

use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gedtree::matching::{find_duplicates, MatchParams};
use gedtree::records::{RecordKind, RECORD_KINDS};
use gedtree::tree::Tree;

#[derive(Debug, Deserialize)]
struct Settings {
    /// Path of the GEDCOM file to load.
    input: Option<String>,
    /// Run the duplicate scan over individuals after loading.
    #[serde(default)]
    find_duplicates: bool,
    /// Lowest score a pair must reach to be reported.
    #[serde(default = "default_floor")]
    duplicate_floor: f32,
    /// Knobs for the per-record matching rules.
    #[serde(default)]
    matching: MatchParams,
}

fn default_floor() -> f32 {
    80.0
}

fn load_settings() -> Result<Settings, config::ConfigError> {
    Config::builder()
        .add_source(ConfigFile::with_name("gedtree").required(false))
        .add_source(Environment::with_prefix("GEDTREE"))
        .build()?
        .try_deserialize()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = match load_settings() {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "could not read settings");
            return ExitCode::FAILURE;
        }
    };

    // First positional argument wins over the config file.
    let input = match std::env::args().nth(1).or_else(|| settings.input.clone()) {
        Some(path) => path,
        None => {
            warn!("no input file given (set `input` in gedtree.toml or pass a path)");
            return ExitCode::FAILURE;
        }
    };

    let mut tree = Tree::new();
    let loaded = match File::open(&input) {
        Ok(file) => tree.read_from(BufReader::new(file)),
        Err(e) => {
            warn!(error = %e, file = %input, "could not open input");
            return ExitCode::FAILURE;
        }
    };
    match loaded {
        Ok(()) => info!(records = tree.record_count(), file = %input, "loaded"),
        Err(e) => {
            warn!(error = %e, file = %input, "load failed");
            return ExitCode::FAILURE;
        }
    }

    for kind in RECORD_KINDS {
        let count = tree.count_by_kind(kind);
        if count > 0 {
            info!(kind = %kind, count, "records");
        }
    }

    if settings.find_duplicates {
        let pairs = find_duplicates(
            &tree,
            RecordKind::Individual,
            &settings.matching,
            settings.duplicate_floor,
            |_| {},
        );
        info!(pairs = pairs.len(), floor = settings.duplicate_floor, "duplicate scan done");
        for (left, right, score) in &pairs {
            let left_xref = tree.node(*left).map(|n| n.xref().to_owned()).unwrap_or_default();
            let right_xref = tree.node(*right).map(|n| n.xref().to_owned()).unwrap_or_default();
            println!("{score:6.2}  @{left_xref}@  @{right_xref}@");
        }
    }

    ExitCode::SUCCESS
}
