//! Stereo FFT convolution for the shared reverb bus.
//!
//! Uniformly partitioned overlap-save: the impulse response is split into
//! blocks of `B` samples, each pre-transformed at size `2B`. Every input
//! block is transformed once, pushed into a frequency-domain delay line and
//! multiply-accumulated against all partitions. Cost per block is one
//! forward FFT, two inverse FFTs and `2 * partitions` complex MACs,
//! independent of impulse length.
//!
//! Output is sample-aligned with input: block `n` of output contains the
//! linear convolution result for the same frames as block `n` of input.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

const ZERO: Complex<f32> = Complex { re: 0.0, im: 0.0 };

/// Mono-in, stereo-out partitioned convolver.
///
/// # Example
///
/// ```rust
/// use cantor_core::StereoConvolver;
///
/// // Unit impulse on the left, half-gain impulse delayed by 3 on the right
/// let mut conv = StereoConvolver::new(&[1.0], &[0.0, 0.0, 0.0, 0.5], 8);
///
/// let mut input = [0.0f32; 8];
/// input[0] = 1.0;
/// let (mut l, mut r) = ([0.0f32; 8], [0.0f32; 8]);
/// conv.process_block(&input, &mut l, &mut r);
///
/// assert!((l[0] - 1.0).abs() < 1e-5);
/// assert!((r[3] - 0.5).abs() < 1e-5);
/// ```
pub struct StereoConvolver {
    block_size: usize,
    fft_size: usize,
    partitions: usize,
    ir_len: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    /// Partition spectra, `partitions * fft_size` each, partition-major.
    filter_l: Vec<Complex<f32>>,
    filter_r: Vec<Complex<f32>>,
    /// Ring of past input-window spectra, same layout as the filters.
    history: Vec<Complex<f32>>,
    ring_pos: usize,
    input_window: Vec<f32>,
    acc_l: Vec<Complex<f32>>,
    acc_r: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    silent_blocks: usize,
}

impl StereoConvolver {
    /// Build a convolver for the given left/right impulse responses.
    ///
    /// The channels may differ in length; the shorter one is zero-padded.
    /// All FFT planning and spectrum allocation happens here, so this is
    /// the expensive call and belongs off the audio thread.
    pub fn new(left: &[f32], right: &[f32], block_size: usize) -> Self {
        let block_size = block_size.max(1);
        let fft_size = block_size * 2;
        let ir_len = left.len().max(right.len());
        let partitions = ir_len.div_ceil(block_size).max(1);

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let ifft = planner.plan_fft_inverse(fft_size);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());
        let mut scratch = vec![ZERO; scratch_len];

        let filter_l = partition_spectra(left, block_size, partitions, &*fft, &mut scratch);
        let filter_r = partition_spectra(right, block_size, partitions, &*fft, &mut scratch);

        #[cfg(feature = "tracing")]
        tracing::debug!(ir_len, block_size, partitions, "convolver built");

        Self {
            block_size,
            fft_size,
            partitions,
            ir_len,
            fft,
            ifft,
            filter_l,
            filter_r,
            history: vec![ZERO; partitions * fft_size],
            ring_pos: 0,
            input_window: vec![0.0; fft_size],
            acc_l: vec![ZERO; fft_size],
            acc_r: vec![ZERO; fft_size],
            scratch,
            silent_blocks: usize::MAX,
        }
    }

    /// Frames consumed and produced per [`process_block`](Self::process_block).
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of impulse partitions.
    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Impulse length in samples (longer channel).
    pub fn ir_len(&self) -> usize {
        self.ir_len
    }

    /// Whether the tail from previous input has fully decayed.
    pub fn is_idle(&self) -> bool {
        self.silent_blocks > self.partitions + 1
    }

    /// Convolve one block.
    ///
    /// `input` may be shorter than [`block_size`](Self::block_size); it is
    /// zero-padded. Only the first `input.len()` frames of each output are
    /// written, and they are overwritten rather than accumulated.
    pub fn process_block(&mut self, input: &[f32], out_l: &mut [f32], out_r: &mut [f32]) {
        let b = self.block_size;
        let n = input.len().min(b).min(out_l.len()).min(out_r.len());

        let silent = input[..n].iter().all(|&x| x == 0.0);
        if silent {
            self.silent_blocks = self.silent_blocks.saturating_add(1);
        } else {
            self.silent_blocks = 0;
        }
        if self.is_idle() {
            out_l[..n].fill(0.0);
            out_r[..n].fill(0.0);
            return;
        }

        // Slide the 2B input window by one block
        self.input_window.copy_within(b.., 0);
        self.input_window[b..b + n].copy_from_slice(&input[..n]);
        self.input_window[b + n..].fill(0.0);

        let fft_size = self.fft_size;
        let slot = self.ring_pos * fft_size;
        {
            let spectrum = &mut self.history[slot..slot + fft_size];
            for (dst, &x) in spectrum.iter_mut().zip(&self.input_window) {
                *dst = Complex::new(x, 0.0);
            }
            self.fft.process_with_scratch(spectrum, &mut self.scratch);
        }

        self.acc_l.fill(ZERO);
        self.acc_r.fill(ZERO);
        for p in 0..self.partitions {
            let h = ((self.ring_pos + p) % self.partitions) * fft_size;
            let f = p * fft_size;
            let x = &self.history[h..h + fft_size];
            let fl = &self.filter_l[f..f + fft_size];
            let fr = &self.filter_r[f..f + fft_size];
            for k in 0..fft_size {
                self.acc_l[k] += x[k] * fl[k];
                self.acc_r[k] += x[k] * fr[k];
            }
        }
        self.ring_pos = (self.ring_pos + self.partitions - 1) % self.partitions;

        self.ifft.process_with_scratch(&mut self.acc_l, &mut self.scratch);
        self.ifft.process_with_scratch(&mut self.acc_r, &mut self.scratch);

        let scale = 1.0 / fft_size as f32;
        for i in 0..n {
            out_l[i] = self.acc_l[b + i].re * scale;
            out_r[i] = self.acc_r[b + i].re * scale;
        }
    }

    /// Forget all input history.
    pub fn reset(&mut self) {
        self.history.fill(ZERO);
        self.input_window.fill(0.0);
        self.ring_pos = 0;
        self.silent_blocks = usize::MAX;
    }
}

impl core::fmt::Debug for StereoConvolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StereoConvolver")
            .field("block_size", &self.block_size)
            .field("partitions", &self.partitions)
            .field("ir_len", &self.ir_len)
            .finish_non_exhaustive()
    }
}

fn partition_spectra(
    ir: &[f32],
    block_size: usize,
    partitions: usize,
    fft: &dyn Fft<f32>,
    scratch: &mut [Complex<f32>],
) -> Vec<Complex<f32>> {
    let fft_size = block_size * 2;
    let mut spectra = vec![ZERO; partitions * fft_size];
    for (p, chunk) in spectra.chunks_exact_mut(fft_size).enumerate() {
        let start = (p * block_size).min(ir.len());
        let end = (start + block_size).min(ir.len());
        for (dst, &x) in chunk.iter_mut().zip(&ir[start..end]) {
            *dst = Complex::new(x, 0.0);
        }
        fft.process_with_scratch(chunk, scratch);
    }
    spectra
}
