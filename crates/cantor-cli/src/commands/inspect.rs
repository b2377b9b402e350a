//! Build one voice offline and print its node graph.

use std::path::Path;

use anyhow::Context;
use cantor_core::AutomationEvent;
use cantor_synth::{ToneRole, Voice, VoiceBuilder, VoiceGraph, VoiceRequest};
use clap::Args;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use super::common::{load_config, parse_frequency};

#[derive(Args)]
pub struct InspectArgs {
    /// Instrument id (unknown ids fall back to the default instrument)
    id: u32,

    /// Note name (C4, F#3, Bb2) or frequency in Hz
    note: String,

    /// Sample the envelope at these times in seconds (repeatable)
    #[arg(long = "at", value_name = "SECONDS")]
    at: Vec<f64>,

    /// Release the note at this time in seconds
    #[arg(long, value_name = "SECONDS")]
    release: Option<f64>,

    /// Print the graph and samples as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Sample {
    time: f64,
    phase: &'static str,
    gain: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    cutoff: Option<f32>,
}

#[derive(Serialize)]
struct Report {
    graph: VoiceGraph,
    #[serde(skip_serializing_if = "Option::is_none")]
    teardown_at: Option<f64>,
    samples: Vec<Sample>,
}

pub fn run(args: InspectArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let table = config.preset_table()?;
    let options = config.synth_options();
    let frequency = parse_frequency(&args.note)?;

    let preset = table.get(args.id);
    if preset.id != args.id {
        tracing::info!(requested = args.id, using = preset.id, "unknown instrument, using default");
    }

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut voice = VoiceBuilder::new(options.sample_rate).build(
        VoiceRequest {
            key: &args.note,
            generation: 1,
            preset,
            frequency,
            master_volume: options.master_volume,
            now: 0.0,
            reverb_ready: options.reverb,
        },
        &mut rng,
    );

    let teardown_at = match args.release {
        Some(t) => {
            anyhow::ensure!(t.is_finite() && t >= 0.0, "release time must be non-negative");
            Some(voice.release(t))
        }
        None => None,
    };

    let times = if args.at.is_empty() {
        default_times(&voice, teardown_at)
    } else {
        args.at.clone()
    };
    let samples = times
        .into_iter()
        .map(|time| Sample {
            time,
            phase: voice.phase_at(time).as_str(),
            gain: voice.gain_at(time),
            cutoff: voice.cutoff_at(time),
        })
        .collect();

    let report = Report {
        graph: voice.graph(),
        teardown_at,
        samples,
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing voice graph")?
        );
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Stage boundaries of the envelope, plus the release when scheduled.
fn default_times(voice: &Voice, teardown_at: Option<f64>) -> Vec<f64> {
    let env = voice.preset().envelope;
    let attack = f64::from(env.attack);
    let mut times = vec![0.0, attack, attack + f64::from(env.decay)];
    if let (Some(released), Some(due)) = (voice.released_at(), teardown_at) {
        times.push(released);
        times.push(released + f64::from(env.release));
        times.push(due);
    }
    times.sort_by(f64::total_cmp);
    times.dedup();
    times
}

fn role_label(role: ToneRole) -> String {
    match role {
        ToneRole::Primary => "primary".to_owned(),
        ToneRole::Secondary => "secondary".to_owned(),
        ToneRole::Harmonic { number } => format!("harmonic {number}"),
    }
}

fn event_label(event: &AutomationEvent) -> &'static str {
    match event {
        AutomationEvent::SetValue { .. } => "set",
        AutomationEvent::LinearRamp { .. } => "linear",
        AutomationEvent::ExponentialRamp { .. } => "exponential",
    }
}

fn print_events(events: &[AutomationEvent]) {
    for event in events {
        println!(
            "  {:12} {:>9.4} s  {:.5}",
            event_label(event),
            event.time(),
            event.value()
        );
    }
}

fn print_report(report: &Report) {
    let graph = &report.graph;
    println!(
        "{} (id {}) playing {} at {:.2} Hz",
        graph.preset_name, graph.preset_id, graph.key, graph.frequency
    );

    println!("\nOscillators:");
    for osc in &graph.oscillators {
        println!(
            "  {:12} {:9} {:>9.2} Hz  detune {:>7.1}c  gain {:.3}{}",
            role_label(osc.role),
            osc.waveform.as_str(),
            osc.frequency,
            osc.detune_cents,
            osc.gain,
            if osc.chorused { "  (chorus)" } else { "" }
        );
    }

    if let Some(filter) = &graph.filter {
        println!("\nFilter: {} q {:.2}", filter.filter_type, filter.q);
        print_events(&filter.cutoff);
    }
    for (name, lfo) in [
        ("Vibrato", graph.vibrato),
        ("Tremolo", graph.tremolo),
        ("Chorus", graph.chorus),
    ] {
        if let Some(lfo) = lfo {
            println!(
                "{name}: {:.3} Hz, depth {:.3}, start phase {:.3}",
                lfo.rate, lfo.depth, lfo.start_phase
            );
        }
    }
    match graph.reverb {
        Some(send) => println!("Reverb: dry {:.2}, wet {:.2}", send.dry, send.wet),
        None => println!("Reverb: none (dry)"),
    }

    println!("\nEnvelope:");
    print_events(&graph.envelope);
    if let Some(due) = report.teardown_at {
        println!("Teardown at {due:.4} s");
    }

    println!("\n  {:>9}  {:8} {:>9} {:>10}", "TIME", "PHASE", "GAIN", "CUTOFF");
    for sample in &report.samples {
        let cutoff = sample
            .cutoff
            .map_or_else(|| "-".to_owned(), |c| format!("{c:.1}"));
        println!(
            "  {:>9.4}  {:8} {:>9.5} {:>10}",
            sample.time, sample.phase, sample.gain, cutoff
        );
    }
}
