//! Matching attribute command handler.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use remoteconf::rmf::{MatchingAttributeRegistry, StaticDeviceState};

use super::read_input;

/// Match command.
///
/// Maps every attribute of the input object, evaluates each one against
/// `state`, and prints the per-attribute and overall result.
pub async fn cmd_match(input: &Path, state: StaticDeviceState) -> anyhow::Result<()> {
    let raw: serde_json::Value =
        serde_json::from_str(&read_input(input)?).context("attribute input is not JSON")?;
    let attributes = raw
        .as_object()
        .context("attribute input must be a JSON object")?;

    let registry = MatchingAttributeRegistry::with_device_state(&Arc::new(state));
    let mapped = registry.map_all(attributes);

    for key in &mapped.unrecognized {
        println!("{key}: unrecognized");
    }
    for error in &mapped.rejected {
        println!("rejected: {error}");
    }

    let mut matched = mapped.rejected.is_empty() && mapped.unrecognized.is_empty();
    for attribute in &mapped.attributes {
        let outcome = registry.evaluate(attribute).await?;
        matched &= outcome == Some(true);
        let result = match outcome {
            Some(true) => "match",
            Some(false) => "no match",
            None => "unknown",
        };
        println!("{}: {result}", attribute.key());
    }

    println!("overall: {}", if matched { "match" } else { "no match" });
    Ok(())
}
