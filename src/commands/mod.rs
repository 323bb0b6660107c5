//! Command handlers module.
//!
//! - `features.rs`: privacy config import and feature queries
//! - `matching.rs`: matching attribute evaluation

mod features;
mod matching;

use std::io::Read;
use std::path::Path;

use anyhow::Context;

pub use features::{cmd_enabled, cmd_exceptions, cmd_import, cmd_ingest, cmd_toggles};
pub use matching::cmd_match;

/// Reads a command input file; `-` reads stdin.
fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
