//! Print one instrument as TOML.

use std::path::Path;

use anyhow::Context;
use clap::Args;

use super::common::load_config;

#[derive(Args)]
pub struct ShowArgs {
    /// Instrument id
    id: u32,
}

pub fn run(args: ShowArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let table = load_config(config)?.preset_table()?;
    let preset = table.lookup(args.id).with_context(|| {
        format!(
            "Unknown instrument id {}. Use 'cantor instruments' to list them.",
            args.id
        )
    })?;
    print!("{}", toml::to_string_pretty(preset)?);
    Ok(())
}
