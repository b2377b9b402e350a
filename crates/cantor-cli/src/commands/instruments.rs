//! Instrument catalog listing.

use std::path::Path;

use anyhow::Context;
use cantor_synth::{Category, InstrumentPreset};
use clap::Args;

use super::common::load_config;

#[derive(Args)]
pub struct InstrumentsArgs {
    /// Show only one category (piano, organ, strings, brass, woodwind, synth, pad, bells, bass)
    #[arg(short, long)]
    category: Option<String>,

    /// Print full presets as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: InstrumentsArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let table = config.preset_table()?;

    let filter = match args.category.as_deref() {
        Some(name) => Some(
            Category::from_name(name).with_context(|| format!("Unknown category '{name}'"))?,
        ),
        None => None,
    };
    let presets: Vec<&InstrumentPreset> = table
        .iter()
        .filter(|p| filter.is_none_or(|c| p.category == c))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&presets)?);
        return Ok(());
    }

    println!("Available Instruments");
    println!("=====================\n");
    println!("  {:>4}  {:20} {:10} {:10} extras", "ID", "NAME", "CATEGORY", "WAVEFORM");
    for preset in presets {
        println!(
            "  {:>4}  {:20} {:10} {:10} {}",
            preset.id,
            preset.name,
            preset.category.as_str(),
            preset.waveform.as_str(),
            extras(preset)
        );
    }
    Ok(())
}

fn extras(preset: &InstrumentPreset) -> String {
    let mut parts = Vec::new();
    let partials = preset.harmonic_partials().count();
    if partials > 0 {
        parts.push(format!("{partials} harmonics"));
    }
    if preset.secondary.is_some() {
        parts.push("secondary".to_owned());
    }
    if let Some(filter) = preset.filter {
        parts.push(filter.filter_type.to_string());
    }
    if preset.vibrato.is_some() {
        parts.push("vibrato".to_owned());
    }
    if preset.tremolo.is_some() {
        parts.push("tremolo".to_owned());
    }
    if preset.chorus.is_some() {
        parts.push("chorus".to_owned());
    }
    if preset.uses_reverb() {
        parts.push(format!("reverb {:.0}%", preset.reverb_mix * 100.0));
    }
    parts.join(", ")
}
