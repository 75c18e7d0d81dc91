mod default_loader;
mod load_options;
mod loader;
mod upsample;
mod writer;

use crate::error::{AudioSimError, Result};
pub use default_loader::DefaultAudioLoader;
pub use load_options::{LoadOptions, MonoMode};
pub use loader::AudioDataLoader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
pub use upsample::upsample_2x;
pub use writer::write_wav;

/// Container for decoded audio with reference-counted sharing.
///
/// # Data Format
/// Samples are stored **interleaved** as f64, frame by frame:
/// - Stereo: `[L0, R0, L1, R1, ...]`
/// - Mono: `[M0, M1, M2, ...]`
///
/// The simulation itself only works on mono series; use [`AudioData::channel_samples`]
/// or the [`MonoMode`] load options to get one.
#[derive(Debug, Clone)]
pub struct AudioData {
    inner: Arc<AudioDataInner>,
}

#[derive(Debug)]
pub(crate) struct AudioDataInner {
    /// Interleaved samples, `total_frames * channels` long
    pub samples: Vec<f64>,
    pub sample_rate: u32,
    pub channels: u16,
    pub total_frames: usize,
}

impl AudioData {
    /// Wraps interleaved samples. A trailing partial frame is kept in `samples()` but
    /// not counted in `total_frames()`.
    pub fn new(samples: Vec<f64>, sample_rate: u32, channels: u16) -> Self {
        let total_frames = if channels == 0 {
            0
        } else {
            samples.len() / channels as usize
        };
        Self {
            inner: Arc::new(AudioDataInner {
                samples,
                sample_rate,
                channels,
                total_frames,
            }),
        }
    }

    /// Wraps a single-channel series.
    pub fn mono(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self::new(samples, sample_rate, 1)
    }

    /// Decodes a file with the default Symphonia loader and default options.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        DefaultAudioLoader.load(path.as_ref(), &LoadOptions::default())
    }

    /// Decodes a file with the default Symphonia loader.
    pub fn from_path_with_options(
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<Arc<Self>> {
        DefaultAudioLoader.load(path.as_ref(), options)
    }

    /// Decodes a file with a custom [`AudioDataLoader`].
    pub fn from_path_with_loader<L: AudioDataLoader>(
        path: impl AsRef<Path>,
        loader: &L,
        options: &LoadOptions,
    ) -> Result<Arc<Self>> {
        loader.load(path.as_ref(), options)
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.inner.channels
    }

    pub fn duration(&self) -> Duration {
        if self.inner.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.inner.total_frames as f64 / self.inner.sample_rate as f64)
    }

    pub fn samples(&self) -> &[f64] {
        &self.inner.samples
    }

    pub fn total_frames(&self) -> usize {
        self.inner.total_frames
    }

    pub fn is_empty(&self) -> bool {
        self.inner.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.samples.len()
    }

    /// Get samples for a specific channel (0-indexed)
    pub fn channel_samples(&self, channel: usize) -> Result<Vec<f64>> {
        if channel >= self.inner.channels as usize {
            return Err(AudioSimError::AudioLoading(format!(
                "Channel {} out of range ({} channels)",
                channel, self.inner.channels
            )));
        }

        Ok(self
            .inner
            .samples
            .chunks_exact(self.inner.channels as usize)
            .map(|frame| frame[channel])
            .collect())
    }

    /// Keeps channel 0 only.
    pub fn first_channel(&self) -> Result<Self> {
        if self.inner.channels == 1 {
            return Ok(self.clone());
        }
        Ok(Self::mono(self.channel_samples(0)?, self.inner.sample_rate))
    }

    /// Convert to mono by averaging all channels
    pub fn to_mono(&self) -> Self {
        if self.inner.channels <= 1 {
            return self.clone();
        }

        let channels = self.inner.channels as usize;
        let mono_samples = self
            .inner
            .samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f64>() / channels as f64)
            .collect();

        Self::mono(mono_samples, self.inner.sample_rate)
    }
}
