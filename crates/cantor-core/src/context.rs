//! Audio context: the sample clock every schedule is expressed against.
//!
//! The context owns a frame counter that only moves while the context is
//! [`ContextState::Running`]. Time advances one render quantum at a time, so
//! anything scheduled "at `now`" lands on a quantum boundary and all nodes
//! created during one call share the same start frame.

/// Number of frames produced per render quantum.
pub const RENDER_QUANTUM: usize = 128;

/// Lifecycle state of an [`AudioContext`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContextState {
    /// Clock is frozen; rendering produces silence. Contexts start here,
    /// mirroring host autoplay policies.
    #[default]
    Suspended,
    /// Clock advances as audio is rendered.
    Running,
    /// Context has been discarded and can no longer be resumed.
    Closed,
}

/// Monotonic sample clock with a suspend/resume signal.
///
/// # Example
///
/// ```rust
/// use cantor_core::{AudioContext, ContextState, RENDER_QUANTUM};
///
/// let mut ctx = AudioContext::new(48000.0);
/// assert_eq!(ctx.state(), ContextState::Suspended);
///
/// // Suspended contexts do not advance
/// assert!(!ctx.advance(RENDER_QUANTUM));
/// assert_eq!(ctx.current_time(), 0.0);
///
/// ctx.resume();
/// assert!(ctx.advance(RENDER_QUANTUM));
/// assert_eq!(ctx.current_frame(), 128);
/// ```
#[derive(Debug, Clone)]
pub struct AudioContext {
    sample_rate: f32,
    frames: u64,
    state: ContextState,
}

impl AudioContext {
    /// Create a suspended context at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frames: 0,
            state: ContextState::Suspended,
        }
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Whether the clock is currently advancing.
    pub fn is_running(&self) -> bool {
        self.state == ContextState::Running
    }

    /// Frames rendered since creation.
    pub fn current_frame(&self) -> u64 {
        self.frames
    }

    /// Current time in seconds.
    pub fn current_time(&self) -> f64 {
        self.frame_time(0)
    }

    /// Time in seconds of the frame `offset` frames after the current one.
    pub fn frame_time(&self, offset: usize) -> f64 {
        (self.frames + offset as u64) as f64 / f64::from(self.sample_rate)
    }

    /// Seconds covered by one sample.
    pub fn sample_period(&self) -> f64 {
        1.0 / f64::from(self.sample_rate)
    }

    /// Resume a suspended context.
    ///
    /// Returns `true` if the state changed. A closed context stays closed.
    pub fn resume(&mut self) -> bool {
        if self.state == ContextState::Suspended {
            self.state = ContextState::Running;
            return true;
        }
        false
    }

    /// Suspend a running context, freezing the clock.
    pub fn suspend(&mut self) -> bool {
        if self.state == ContextState::Running {
            self.state = ContextState::Suspended;
            return true;
        }
        false
    }

    /// Close the context permanently.
    pub fn close(&mut self) {
        self.state = ContextState::Closed;
    }

    /// Advance the clock by `frames`.
    ///
    /// Returns `false` without moving when the context is not running.
    pub fn advance(&mut self, frames: usize) -> bool {
        if !self.is_running() {
            return false;
        }
        self.frames += frames as u64;
        true
    }
}

impl Default for AudioContext {
    fn default() -> Self {
        Self::new(48000.0)
    }
}
