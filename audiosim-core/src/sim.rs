use crate::config::AudioSimDesc;
use crate::error::Result;
use crate::irs::IrsStore;
use crate::math::Vec3;
use crate::stream::AudioStream;
use std::path::Path;
use std::sync::Arc;

/// Entry point for rendering audio through a loaded impulse-response set.
///
/// `AudioSim` owns the configuration and shares the parsed [`IrsStore`] with
/// every [`AudioStream`] it creates. Streams are independent, so any number may
/// render against the same store at once.
///
/// # Example
///
/// ```no_run
/// use audiosim_core::{AudioSim, AudioSimDesc, Vec3};
///
/// # fn main() -> audiosim_core::Result<()> {
/// let sim = AudioSim::from_path("room.irs", AudioSimDesc::default())?;
/// let position = Vec3::new(1.0, 2.0, 1.5);
/// let mut stream = sim.init_stream(position)?;
///
/// let speech = vec![0.0; 48000];
/// let rendered = sim.render(&mut stream, position, &speech, speech.len() * 2)?;
/// assert_eq!(rendered.len(), 96000);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AudioSim {
    desc: AudioSimDesc,
    store: Arc<IrsStore>,
}

impl AudioSim {
    pub fn new(store: IrsStore, desc: AudioSimDesc) -> Result<Self> {
        Self::with_shared_store(Arc::new(store), desc)
    }

    pub fn with_shared_store(store: Arc<IrsStore>, desc: AudioSimDesc) -> Result<Self> {
        desc.validate()?;
        Ok(Self { desc, store })
    }

    /// Loads the impulse-response set at `path`.
    pub fn from_path(path: impl AsRef<Path>, desc: AudioSimDesc) -> Result<Self> {
        desc.validate()?;
        let store = IrsStore::from_path(path)?;
        Self::new(store, desc)
    }

    pub fn desc(&self) -> &AudioSimDesc {
        &self.desc
    }

    pub fn store(&self) -> &Arc<IrsStore> {
        &self.store
    }

    /// Rate of the impulse responses after upsampling.
    pub fn sample_rate(&self) -> u32 {
        self.store.header().upsampled_rate()
    }

    /// Opens a stream on the source closest to `position`.
    pub fn init_stream(&self, position: Vec3) -> Result<AudioStream> {
        let source = self.store.closest_source(position)?;
        log::debug!(
            "Streaming from source {} at {:?} for listener position {:?}",
            source.id(),
            source.position(),
            position
        );
        AudioStream::new(Arc::clone(&self.store), source.index(), &self.desc)
    }

    /// Renders `frames` samples of `input` through `stream`, one configured
    /// block at a time.
    ///
    /// Past the end of `input` the stream is fed silence, so a `frames` longer
    /// than the input lets the echo tail ring out. The last block is always
    /// processed at full size and truncated to `frames`.
    pub fn render(
        &self,
        stream: &mut AudioStream,
        position: Vec3,
        input: &[f64],
        frames: usize,
    ) -> Result<Vec<f64>> {
        let block_size = self.desc.block_size;
        let mut rendered = Vec::with_capacity(frames);
        let mut src_block = vec![0.0; block_size];
        let mut dst_block = vec![0.0; block_size];

        let mut count = 0;
        while count < frames {
            let start = count.min(input.len());
            let available = (input.len() - start).min(block_size);
            src_block[..available].copy_from_slice(&input[start..start + available]);
            src_block[available..].fill(0.0);

            let report = stream.process_block(position, &src_block, &mut dst_block)?;
            log::debug!(
                "Block at frame {}: peak {:.4}, running peak {:.4}",
                count,
                report.block_peak,
                report.running_peak
            );

            let take = (frames - count).min(block_size);
            rendered.extend_from_slice(&dst_block[..take]);
            count += block_size;
        }

        Ok(rendered)
    }

    /// Renders `input` through a fresh stream at `position`, padded to
    /// [`AudioSimDesc::output_padding`] times its length.
    pub fn render_padded(&self, position: Vec3, input: &[f64]) -> Result<Vec<f64>> {
        let mut stream = self.init_stream(position)?;
        let frames = input.len() * self.desc.output_padding;
        log::info!(
            "Rendering {} input frames into {} output frames",
            input.len(),
            frames
        );
        self.render(&mut stream, position, input, frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AudioSimError;
    use crate::irs::fixture::{IrsFixture, square_2x2};

    const EPS: f64 = 1e-9;

    fn small_sim() -> AudioSim {
        AudioSim::new(square_2x2(&[1.0]), AudioSimDesc::new().block_size(4)).unwrap()
    }

    #[test]
    fn test_render_length_and_padding() {
        let sim = small_sim();
        let input = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let position = Vec3::new(5.0, 5.0, 0.0);

        let mut stream = sim.init_stream(position).unwrap();
        let rendered = sim.render(&mut stream, position, &input, 12).unwrap();
        assert_eq!(rendered.len(), 12);
        assert!((rendered[0] - 0.99).abs() < EPS);
        assert!((rendered[1] - 0.495).abs() < EPS);
        assert!(rendered[2..].iter().all(|s| s.abs() < EPS));

        // frames need not be a multiple of the block size
        let mut stream = sim.init_stream(position).unwrap();
        assert_eq!(sim.render(&mut stream, position, &input, 7).unwrap().len(), 7);
    }

    #[test]
    fn test_render_far_past_input_end() {
        let sim = small_sim();
        let input = [0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let position = Vec3::new(5.0, 5.0, 0.0);

        let rendered = sim.render_padded(position, &input).unwrap();
        assert_eq!(rendered.len(), 12);
        assert!((rendered[5] - 0.99).abs() < EPS);
        assert!((rendered[6] - 0.495).abs() < EPS);

        // several blocks of pure silence after the input
        let mut stream = sim.init_stream(position).unwrap();
        let rendered = sim.render(&mut stream, position, &input, 30).unwrap();
        assert_eq!(rendered.len(), 30);
        assert!(rendered[7..].iter().all(|s| s.abs() < EPS));

        let mut stream = sim.init_stream(position).unwrap();
        let rendered = sim.render(&mut stream, position, &[], 9).unwrap();
        assert_eq!(rendered, vec![0.0; 9]);
    }

    #[test]
    fn test_tail_rings_out_past_input() {
        // upsampled response [0, 0, 0, 0, 0, 0.5, 1.0, 0.5] reaches into the second block
        let sim = AudioSim::new(
            square_2x2(&[0.0, 0.0, 0.0, 1.0]),
            AudioSimDesc::new().block_size(4),
        )
        .unwrap();
        let input = [1.0, 0.0, 0.0, 0.0];

        let rendered = sim.render_padded(Vec3::new(5.0, 5.0, 0.0), &input).unwrap();
        let expected = [0.0, 0.0, 0.0, 0.0, 0.0, 0.495, 0.99, 0.495];
        assert_eq!(rendered.len(), expected.len());
        for (r, e) in rendered.iter().zip(expected) {
            assert!((r - e).abs() < EPS);
        }
    }

    #[test]
    fn test_init_stream_picks_closest_source() {
        let store = IrsFixture::new(40, 40, 1.0)
            .source(10, [-10, 0, 0], 1)
            .source(20, [10, 0, 0], 1)
            .listener(0, [0, 0, 0])
            .block(10, 0, vec![1.0])
            .block(20, 0, vec![1.0])
            .build();
        let sim = AudioSim::new(store, AudioSimDesc::default()).unwrap();

        let stream = sim.init_stream(Vec3::new(8.0, 1.0, 0.0)).unwrap();
        assert_eq!(stream.source().id(), 20);
        let stream = sim.init_stream(Vec3::new(-3.0, 0.0, 0.0)).unwrap();
        assert_eq!(stream.source().id(), 10);
    }

    #[test]
    fn test_empty_store_rejects_streams() {
        let store = IrsFixture::new(40, 40, 1.0).build();
        let sim = AudioSim::new(store, AudioSimDesc::default()).unwrap();
        let err = sim.init_stream(Vec3::ZERO).unwrap_err();
        assert!(matches!(err, AudioSimError::Precondition(_)));
    }

    #[test]
    fn test_invalid_desc_is_rejected() {
        let err = AudioSim::new(square_2x2(&[1.0]), AudioSimDesc::new().block_size(3)).unwrap_err();
        assert!(matches!(err, AudioSimError::Precondition(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = AudioSim::from_path("/nonexistent/room.irs", AudioSimDesc::default()).unwrap_err();
        assert!(matches!(err, AudioSimError::Io(_)));
    }

    #[test]
    fn test_sample_rate_is_upsampled() {
        let sim = small_sim();
        assert_eq!(sim.sample_rate(), 44100);
    }
}
