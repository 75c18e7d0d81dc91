use crate::audio_data::AudioData;
use crate::error::{AudioSimError, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Encodes `audio` as a 32-bit float WAV file at `path`.
///
/// Samples are written as-is; keeping them inside `[-1, 1]` is the caller's job.
pub fn write_wav(path: impl AsRef<Path>, audio: &AudioData) -> Result<()> {
    let path = path.as_ref();
    if audio.channels() == 0 {
        return Err(AudioSimError::AudioWriting(
            "cannot write audio with zero channels".to_string(),
        ));
    }

    let spec = WavSpec {
        channels: audio.channels(),
        sample_rate: audio.sample_rate(),
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| map_hound_error(path, e))?;
    let frame_samples = audio.total_frames() * audio.channels() as usize;
    for &sample in &audio.samples()[..frame_samples] {
        writer
            .write_sample(sample as f32)
            .map_err(|e| map_hound_error(path, e))?;
    }
    writer.finalize().map_err(|e| map_hound_error(path, e))?;

    log::info!(
        "Wrote {}: channels: {}, rate: {} Hz, frames: {}",
        path.display(),
        audio.channels(),
        audio.sample_rate(),
        audio.total_frames()
    );
    Ok(())
}

fn map_hound_error(path: &Path, err: hound::Error) -> AudioSimError {
    match err {
        hound::Error::IoError(e) => AudioSimError::Io(e),
        other => AudioSimError::AudioWriting(format!("{}: {}", path.display(), other)),
    }
}
