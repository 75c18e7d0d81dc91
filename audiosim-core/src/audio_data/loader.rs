use crate::audio_data::{AudioData, LoadOptions};
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;

/// Trait for decoding audio files into [`AudioData`].
///
/// AudioSim ships a Symphonia-backed [`DefaultAudioLoader`](crate::audio_data::DefaultAudioLoader),
/// but any decoder can be plugged into [`AudioData::from_path_with_loader`].
///
/// # Example
///
/// ```ignore
/// use audiosim_core::audio_data::{AudioData, AudioDataLoader, LoadOptions};
/// use audiosim_core::error::Result;
/// use std::path::Path;
/// use std::sync::Arc;
///
/// struct SilenceLoader;
///
/// impl AudioDataLoader for SilenceLoader {
///     fn load(&self, _path: &Path, _options: &LoadOptions) -> Result<Arc<AudioData>> {
///         Ok(Arc::new(AudioData::new(vec![0.0; 44100], 44100, 1)))
///     }
/// }
/// ```
pub trait AudioDataLoader {
    /// Decodes the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an `AudioSimError` if the file cannot be opened or decoded.
    fn load(&self, path: &Path, options: &LoadOptions) -> Result<Arc<AudioData>>;
}
