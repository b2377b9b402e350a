//! Live playback on the default output device.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use cantor_synth::Synth;
use clap::Args;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::common::{load_config, parse_frequency};

/// Upper bound on waiting for the reverb impulse before playing dry.
const REVERB_WAIT: Duration = Duration::from_secs(10);

#[derive(Args)]
pub struct PlayArgs {
    /// Instrument id
    id: u32,

    /// Notes to play together (C4, F#3, Bb2 or Hz)
    #[arg(required = true)]
    notes: Vec<String>,

    /// Seconds to hold the notes before releasing them
    #[arg(long, default_value_t = 1.5)]
    hold: f32,
}

pub fn run(args: PlayArgs, config: Option<&Path>) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.hold.is_finite() && args.hold >= 0.0,
        "hold must be non-negative"
    );
    let config = load_config(config)?;
    let notes = args
        .notes
        .iter()
        .map(|n| parse_frequency(n).map(|f| (n.as_str(), f)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no default output device")?;
    let supported = device
        .default_output_config()
        .context("querying output configuration")?;
    let channels = usize::from(supported.channels());
    let stream_config = supported.config();

    let mut options = config.synth_options();
    options.sample_rate = supported.sample_rate() as f32;
    let mut synth = Synth::with_presets(options, config.preset_table()?);
    synth.set_instrument(args.id);
    if synth.reverb_pending() && !synth.wait_for_reverb(REVERB_WAIT) {
        tracing::warn!("reverb not ready, playing dry");
    }
    let release = synth.current_instrument().envelope.release;
    println!(
        "Playing {} on {}",
        synth.current_instrument().name,
        channels_label(channels)
    );

    let shared = Arc::new(Mutex::new(synth));
    let cb_synth = Arc::clone(&shared);
    let mut left = Vec::new();
    let mut right = Vec::new();

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                left.resize(frames, 0.0);
                right.resize(frames, 0.0);
                match cb_synth.lock() {
                    Ok(mut synth) => synth.render(&mut left, &mut right),
                    Err(_) => {
                        data.fill(0.0);
                        return;
                    }
                }
                for (i, frame) in data.chunks_exact_mut(channels).enumerate() {
                    match frame {
                        [mono] => *mono = 0.5 * (left[i] + right[i]),
                        [l, r, rest @ ..] => {
                            *l = left[i];
                            *r = right[i];
                            rest.fill(0.0);
                        }
                        [] => {}
                    }
                }
            },
            |err| tracing::warn!(error = %err, "output stream error"),
            None,
        )
        .context("building output stream")?;
    stream.play().context("starting output stream")?;

    with_synth(&shared, |synth| {
        for &(key, frequency) in &notes {
            synth.play_note(key, frequency);
        }
    })?;
    std::thread::sleep(Duration::from_secs_f32(args.hold));

    with_synth(&shared, Synth::stop_all_notes)?;
    std::thread::sleep(Duration::from_secs_f32(release + 0.2));

    drop(stream);
    println!("Done!");
    Ok(())
}

fn with_synth(shared: &Mutex<Synth>, f: impl FnOnce(&mut Synth)) -> anyhow::Result<()> {
    let mut synth = shared
        .lock()
        .map_err(|_| anyhow::anyhow!("audio callback panicked"))?;
    f(&mut synth);
    Ok(())
}

fn channels_label(channels: usize) -> String {
    match channels {
        1 => "mono output".to_owned(),
        2 => "stereo output".to_owned(),
        n => format!("{n}-channel output"),
    }
}
