//! Reverb impulse generation and background loading.
//!
//! The shared reverb is a convolution with a synthetic hall impulse. Building
//! it (2.5 s of noise per channel plus FFT partitioning) is too slow for the
//! caller of [`Synth::new`](crate::Synth::new), so an [`ImpulseLoader`] runs
//! the [`ImpulseGenerator`] on a worker thread and hands back a ready
//! [`ReverbBus`] over a channel. The synth polls that channel without
//! blocking; until it delivers, voices play dry.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cantor_core::StereoConvolver;
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError, bounded};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ReverbError;

/// Length of the hall impulse in seconds.
pub const HALL_SECONDS: f32 = 2.5;

/// Length of the early-reflection transient in seconds.
pub const EARLY_REFLECTION_SECONDS: f32 = 0.05;

/// A stereo impulse response.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    sample_rate: f32,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl ImpulseResponse {
    /// Wrap two channels, zero-padding the shorter one.
    pub fn new(sample_rate: f32, mut left: Vec<f32>, mut right: Vec<f32>) -> Self {
        let len = left.len().max(right.len());
        left.resize(len, 0.0);
        right.resize(len, 0.0);
        Self {
            sample_rate,
            left,
            right,
        }
    }

    /// Sample rate the impulse was generated for.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Frames per channel.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Whether the impulse has no frames.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        self.len() as f32 / self.sample_rate
    }

    /// Left channel.
    pub fn left(&self) -> &[f32] {
        &self.left
    }

    /// Right channel.
    pub fn right(&self) -> &[f32] {
        &self.right
    }
}

/// Source of the reverb impulse.
///
/// Implementations run on the loader's worker thread.
pub trait ImpulseGenerator: Send + 'static {
    /// Produce an impulse for `sample_rate`.
    fn generate(&self, sample_rate: f32) -> Result<ImpulseResponse, ReverbError>;
}

/// Synthetic hall: exponentially decaying noise with an early-reflection spike.
///
/// ```text
/// sample[i] = (noise(i) * exp(-3 i / len) + early(i)) * 0.5
/// early(i)  = 0.5 * exp(-20 i / (sr * 0.05))   for the first 50 ms, else 0
/// ```
///
/// `noise` is uniform in `[-1, 1]`, drawn independently per channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct HallImpulse {
    seed: Option<u64>,
}

impl HallImpulse {
    /// Hall impulse seeded from OS entropy.
    pub fn new() -> Self {
        Self { seed: None }
    }

    /// Hall impulse with reproducible noise.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl ImpulseGenerator for HallImpulse {
    fn generate(&self, sample_rate: f32) -> Result<ImpulseResponse, ReverbError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(ReverbError::InvalidSampleRate(sample_rate));
        }

        let frames = (sample_rate * HALL_SECONDS) as usize;
        let mut left = Vec::new();
        let mut right = Vec::new();
        left.try_reserve_exact(frames)
            .and_then(|()| right.try_reserve_exact(frames))
            .map_err(|_| ReverbError::Allocation { frames })?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let early_frames = sample_rate * EARLY_REFLECTION_SECONDS;
        let len = frames as f32;
        for i in 0..frames {
            let t = i as f32;
            let decay = libm::expf(-3.0 * t / len);
            let early = if t < early_frames {
                libm::expf(-20.0 * t / early_frames) * 0.5
            } else {
                0.0
            };
            let noise_l: f32 = rng.random_range(-1.0..=1.0);
            let noise_r: f32 = rng.random_range(-1.0..=1.0);
            left.push((noise_l * decay + early) * 0.5);
            right.push((noise_r * decay + early) * 0.5);
        }

        Ok(ImpulseResponse::new(sample_rate, left, right))
    }
}

/// The shared reverb: the impulse plus the convolver built from it.
pub struct ReverbBus {
    impulse: Arc<ImpulseResponse>,
    convolver: StereoConvolver,
    wet_l: Vec<f32>,
    wet_r: Vec<f32>,
}

impl ReverbBus {
    /// Partition `impulse` for `block_size`-frame processing.
    pub fn new(impulse: ImpulseResponse, block_size: usize) -> Self {
        let convolver = StereoConvolver::new(impulse.left(), impulse.right(), block_size);
        let block_size = convolver.block_size();
        Self {
            impulse: Arc::new(impulse),
            convolver,
            wet_l: vec![0.0; block_size],
            wet_r: vec![0.0; block_size],
        }
    }

    /// The impulse this bus convolves with.
    pub fn impulse(&self) -> &Arc<ImpulseResponse> {
        &self.impulse
    }

    /// Convolve one block of mono send signal and add it to the outputs.
    pub fn process_into(&mut self, send: &[f32], out_l: &mut [f32], out_r: &mut [f32]) {
        let n = send
            .len()
            .min(self.wet_l.len())
            .min(out_l.len())
            .min(out_r.len());
        self.convolver
            .process_block(&send[..n], &mut self.wet_l[..n], &mut self.wet_r[..n]);
        for i in 0..n {
            out_l[i] += self.wet_l[i];
            out_r[i] += self.wet_r[i];
        }
    }

    /// Clear the reverb tail.
    pub fn reset(&mut self) {
        self.convolver.reset();
    }
}

impl std::fmt::Debug for ReverbBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverbBus")
            .field("frames", &self.impulse.len())
            .field("convolver", &self.convolver)
            .finish_non_exhaustive()
    }
}

/// Handle to an impulse being generated on a worker thread.
#[derive(Debug)]
pub struct ImpulseLoader {
    rx: Option<Receiver<Result<ReverbBus, ReverbError>>>,
    spawn_error: Option<ReverbError>,
}

impl ImpulseLoader {
    /// Start generating on a named worker thread.
    ///
    /// A failure to spawn is not returned here; it is delivered by the first
    /// [`poll`](Self::poll) like any other generation failure.
    pub fn spawn<G: ImpulseGenerator>(generator: G, sample_rate: f32, block_size: usize) -> Self {
        let (tx, rx) = bounded(1);
        let spawned = thread::Builder::new()
            .name("cantor-impulse".into())
            .spawn(move || {
                let result = generator
                    .generate(sample_rate)
                    .map(|impulse| ReverbBus::new(impulse, block_size));
                // The synth may have been dropped; nobody is waiting then.
                let _ = tx.send(result);
            });

        match spawned {
            Ok(_) => Self {
                rx: Some(rx),
                spawn_error: None,
            },
            Err(err) => Self {
                rx: None,
                spawn_error: Some(ReverbError::Spawn(err)),
            },
        }
    }

    /// Check for a result without blocking.
    ///
    /// Returns `None` while generation is still running. Once a result has
    /// been returned the loader is spent and keeps returning `None`.
    pub fn poll(&mut self) -> Option<Result<ReverbBus, ReverbError>> {
        if let Some(err) = self.spawn_error.take() {
            return Some(Err(err));
        }
        let rx = self.rx.as_ref()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(ReverbError::Disconnected),
        };
        self.rx = None;
        Some(result)
    }

    /// Block up to `timeout` for a result.
    pub fn wait(&mut self, timeout: Duration) -> Option<Result<ReverbBus, ReverbError>> {
        if let Some(err) = self.spawn_error.take() {
            return Some(Err(err));
        }
        let rx = self.rx.as_ref()?;
        let result = match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => Err(ReverbError::Disconnected),
        };
        self.rx = None;
        Some(result)
    }

    /// Whether a result is still outstanding.
    pub fn is_pending(&self) -> bool {
        self.rx.is_some() || self.spawn_error.is_some()
    }
}
