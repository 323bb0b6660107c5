//! Privacy feature command handlers.

use std::path::Path;

use anyhow::{Context, bail};
use remoteconf::config::RemoteConfConfig;
use remoteconf::privacy::{FeatureGate, PrivacyFeatureRegistry};
use remoteconf::storage::FeatureStoreFactory;
use remoteconf::PrivacyFeatureName;

use super::read_input;

fn parse_feature(name: &str) -> anyhow::Result<PrivacyFeatureName> {
    match PrivacyFeatureName::parse(name) {
        Some(feature) => Ok(feature),
        None => {
            let known: Vec<_> = PrivacyFeatureName::all().iter().map(|f| f.as_str()).collect();
            bail!("unknown feature '{name}' (known: {})", known.join(", "))
        },
    }
}

/// Import command.
pub fn cmd_import(config: &RemoteConfConfig, feature: &str, input: &Path) -> anyhow::Result<()> {
    let json = read_input(input)?;
    let store = FeatureStoreFactory::create(config)?;
    let registry = PrivacyFeatureRegistry::with_exception_lists(&store);

    match registry.dispatch(feature, &json)? {
        Some(claimed) => {
            let toggle = store
                .get_toggle(claimed.as_str())?
                .with_context(|| format!("toggle for '{claimed}' missing after import"))?;
            println!(
                "Imported {claimed}: {} (min version {}), {} exception(s)",
                if toggle.enabled { "enabled" } else { "disabled" },
                toggle
                    .min_supported_version
                    .map_or_else(|| "none".to_string(), |v| v.to_string()),
                store.list_exceptions(claimed.as_str())?.len()
            );
        },
        None => println!("No importer claimed feature '{feature}'"),
    }
    Ok(())
}

/// Ingest command. Prints the ingest report as JSON.
pub fn cmd_ingest(config: &RemoteConfConfig, input: &Path) -> anyhow::Result<()> {
    let document = read_input(input)?;
    let store = FeatureStoreFactory::create(config)?;
    let registry = PrivacyFeatureRegistry::with_exception_lists(&store);

    let report = registry.ingest(&document)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_success() {
        bail!("{} feature(s) failed to import", report.failed.len());
    }
    Ok(())
}

/// Toggles command.
pub fn cmd_toggles(config: &RemoteConfConfig) -> anyhow::Result<()> {
    let store = FeatureStoreFactory::create(config)?;
    let toggles = store.list_toggles()?;

    if toggles.is_empty() {
        println!("No feature toggles stored");
        return Ok(());
    }

    println!("{:<20} {:<8} MIN VERSION", "FEATURE", "ENABLED");
    for toggle in toggles {
        println!(
            "{:<20} {:<8} {}",
            toggle.feature_key,
            toggle.enabled,
            toggle
                .min_supported_version
                .map_or_else(|| "-".to_string(), |v| v.to_string())
        );
    }
    Ok(())
}

/// Exceptions command.
pub fn cmd_exceptions(config: &RemoteConfConfig, feature: &str) -> anyhow::Result<()> {
    let feature = parse_feature(feature)?;
    let store = FeatureStoreFactory::create(config)?;

    for entry in store.list_exceptions(feature.as_str())? {
        if entry.reason.is_empty() {
            println!("{}", entry.domain);
        } else {
            println!("{}\t{}", entry.domain, entry.reason);
        }
    }
    Ok(())
}

/// Enabled command.
pub fn cmd_enabled(
    config: &RemoteConfConfig,
    feature: &str,
    app_version: Option<i64>,
    host: Option<&str>,
) -> anyhow::Result<()> {
    let feature = parse_feature(feature)?;
    let store = FeatureStoreFactory::create(config)?;
    let gate = FeatureGate::new(store, app_version.unwrap_or(config.app_version));

    println!(
        "{feature} enabled for version {}: {}",
        gate.app_version(),
        gate.is_enabled(feature)?
    );
    if let Some(host) = host {
        println!("{host} excepted: {}", gate.is_exception(feature, host)?);
    }
    Ok(())
}
