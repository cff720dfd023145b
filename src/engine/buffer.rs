//! Audio Buffer Management
//!
//! The block buffer handed through the signal chain. The orchestrator owns it
//! for the duration of a block and lends each stage exclusive mutable access.

use crate::error::{Result, VoxError};

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    Mono,
    /// Two channels (stereo: left, right)
    #[default]
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Planar block buffer with zero, one or two channels of equal length
///
/// Zero channels is a legal (degenerate) buffer: every stage treats it as a
/// no-op. More than two channels is rejected at construction.
///
/// # Example
/// ```
/// use voxproc::engine::{AudioBuffer, ChannelLayout};
///
/// let buffer = AudioBuffer::new(512, ChannelLayout::Stereo);
/// assert_eq!(buffer.num_channels(), 2);
/// assert_eq!(buffer.len(), 512);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    samples: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Create a silent buffer with the given number of samples per channel
    pub fn new(num_samples: usize, layout: ChannelLayout) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; layout.num_channels()],
        }
    }

    /// Create a buffer with no channels
    pub fn empty() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// Create a buffer from per-channel sample vectors
    ///
    /// # Errors
    /// Fails for more than two channels or channels of unequal length.
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Result<Self> {
        if channels.len() > 2 {
            return Err(VoxError::UnsupportedChannelCount {
                channels: channels.len(),
            });
        }

        if let [left, right] = channels.as_slice() {
            if left.len() != right.len() {
                return Err(VoxError::ChannelLengthMismatch {
                    expected: left.len(),
                    got: right.len(),
                });
            }
        }

        Ok(Self { samples: channels })
    }

    /// Create a buffer from interleaved sample data (L, R, L, R, ... for stereo)
    pub fn from_interleaved(interleaved: &[f32], layout: ChannelLayout) -> Result<Self> {
        let num_channels = layout.num_channels();

        if interleaved.len() % num_channels != 0 {
            return Err(VoxError::ChannelLengthMismatch {
                expected: interleaved.len() - interleaved.len() % num_channels,
                got: interleaved.len(),
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self { samples })
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut interleaved = Vec::with_capacity(self.num_channels() * self.len());

        for index in 0..self.len() {
            for channel in &self.samples {
                interleaved.push(channel[index]);
            }
        }

        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer holds no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the channel layout, or None for a channel-less buffer
    pub fn channel_layout(&self) -> Option<ChannelLayout> {
        ChannelLayout::from_count(self.num_channels())
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Get mutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// Split into left and optional right channel for in-place processing
    ///
    /// Returns None when the buffer has no channels.
    #[inline]
    pub fn stereo_mut(&mut self) -> Option<(&mut [f32], Option<&mut [f32]>)> {
        match self.samples.as_mut_slice() {
            [] => None,
            [left] => Some((left.as_mut_slice(), None)),
            [left, right, ..] => Some((left.as_mut_slice(), Some(right.as_mut_slice()))),
        }
    }

    /// Multiply every sample by a linear gain
    pub fn apply_gain(&mut self, gain: f32) {
        for channel in &mut self.samples {
            for sample in channel.iter_mut() {
                *sample *= gain;
            }
        }
    }

    /// Largest absolute sample value across all channels (linear)
    pub fn peak_magnitude(&self) -> f32 {
        self.samples
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|s| s.abs())
            .fold(0.0_f32, f32::max)
    }

    /// RMS level of one channel (linear), 0.0 for an empty channel
    pub fn rms(&self, channel: usize) -> f32 {
        let Some(samples) = self.samples.get(channel) else {
            return 0.0;
        };
        if samples.is_empty() {
            return 0.0;
        }

        let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_sq / samples.len() as f64).sqrt() as f32
    }
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::empty()
    }
}
