//! Block-by-block convolution of a mono signal with a position-dependent impulse response.

use crate::config::AudioSimDesc;
use crate::convolve::Convolver;
use crate::error::{AudioSimError, Result};
use crate::interpolate::interpolate;
use crate::irs::{IrsStore, Source, SourceIndex};
use crate::math::Vec3;
use std::sync::Arc;

/// Lifecycle of an [`AudioStream`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No block processed since creation or the last reset
    Fresh,
    /// Carrying an echo tail from the previous block
    Active,
}

/// What one `process_block` call did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockReport {
    /// Largest absolute sample of this block before normalization
    pub block_peak: f64,
    /// Running peak after this block
    pub running_peak: f64,
    /// Factor applied to every output sample, `headroom / running_peak`
    pub gain: f64,
    /// Length of the impulse response used for this block
    pub ir_len: usize,
    /// Samples carried into the next block
    pub tail_len: usize,
}

/// A streaming session bound to one source of an impulse-response set.
///
/// Each block is convolved with the impulse response interpolated at the
/// listener position passed in, so the listener may move between blocks. The
/// part of each convolution that extends past the block is carried as a tail
/// and overlap-added into the following blocks.
///
/// The running peak starts at [`AudioSimDesc::initial_peak`] and never
/// decreases. Every output block is divided by it and scaled by the headroom,
/// which keeps output within `[-headroom, headroom]` without pumping.
#[derive(Debug)]
pub struct AudioStream {
    store: Arc<IrsStore>,
    source: SourceIndex,
    tail: Option<Vec<f64>>,
    peak: f64,
    headroom: f64,
    convolver: Convolver,
}

impl AudioStream {
    /// # Errors
    ///
    /// `Precondition` if `desc` is invalid or `source` is not in `store`.
    pub fn new(store: Arc<IrsStore>, source: SourceIndex, desc: &AudioSimDesc) -> Result<Self> {
        desc.validate()?;
        if source.get() >= store.sources().len() {
            return Err(AudioSimError::Precondition(format!(
                "source index {} out of range for {} sources",
                source.get(),
                store.sources().len()
            )));
        }

        Ok(Self {
            store,
            source,
            tail: None,
            peak: desc.initial_peak,
            headroom: desc.headroom,
            convolver: Convolver::new(),
        })
    }

    pub fn source(&self) -> &Source {
        self.store.source(self.source)
    }

    pub fn store(&self) -> &Arc<IrsStore> {
        &self.store
    }

    pub fn state(&self) -> StreamState {
        if self.tail.is_some() {
            StreamState::Active
        } else {
            StreamState::Fresh
        }
    }

    pub fn running_peak(&self) -> f64 {
        self.peak
    }

    pub fn headroom(&self) -> f64 {
        self.headroom
    }

    /// Samples still to be overlap-added into future blocks, unnormalized.
    pub fn tail(&self) -> Option<&[f64]> {
        self.tail.as_deref()
    }

    /// Drops the pending tail. The running peak is kept.
    pub fn reset(&mut self) {
        log::debug!("Resetting stream for source {}", self.source().id());
        self.tail = None;
    }

    /// Convolves one block with the impulse response at `position`.
    ///
    /// `input` and `output` must have the same power-of-two length.
    pub fn process_block(
        &mut self,
        position: Vec3,
        input: &[f64],
        output: &mut [f64],
    ) -> Result<BlockReport> {
        check_block(input, output)?;
        let ir = interpolate(&self.store, self.source(), position);
        self.process_block_with_ir(&ir, input, output)
    }

    /// Convolves one block with a caller-supplied impulse response.
    ///
    /// An empty `ir` is treated as a single zero sample.
    pub fn process_block_with_ir(
        &mut self,
        ir: &[f64],
        input: &[f64],
        output: &mut [f64],
    ) -> Result<BlockReport> {
        check_block(input, output)?;
        let ir: &[f64] = if ir.is_empty() { &[0.0] } else { ir };

        let len = input.len();
        let convolved = self.convolver.convolve_real(input, ir);
        let tail_len = convolved.len() - len;

        let previous = self.tail.take().unwrap_or_default();
        let merge = len.min(previous.len());

        let mut block_peak = 0.0_f64;
        for (i, (out, &sample)) in output.iter_mut().zip(&convolved[..len]).enumerate() {
            *out = if i < merge { sample + previous[i] } else { sample };
            block_peak = block_peak.max(out.abs());
        }

        self.peak = self.peak.max(block_peak);
        let gain = self.headroom / self.peak;
        for out in output.iter_mut() {
            *out *= gain;
        }

        // Whatever of the old tail was not merged lies beyond this block and
        // lines up with the start of the new tail.
        let carried = &previous[merge..];
        let mut tail = vec![0.0; tail_len.max(carried.len())];
        for (slot, value) in tail.iter_mut().zip(carried) {
            *slot = *value;
        }
        for (slot, value) in tail.iter_mut().zip(&convolved[len..]) {
            *slot += value;
        }

        let report = BlockReport {
            block_peak,
            running_peak: self.peak,
            gain,
            ir_len: ir.len(),
            tail_len: tail.len(),
        };
        log::trace!("Processed block of {} frames: {:?}", len, report);

        self.tail = Some(tail);
        Ok(report)
    }
}

fn check_block(input: &[f64], output: &[f64]) -> Result<()> {
    if !input.len().is_power_of_two() {
        return Err(AudioSimError::Precondition(format!(
            "block length {} is not a power of two",
            input.len()
        )));
    }
    if output.len() != input.len() {
        return Err(AudioSimError::Precondition(format!(
            "output length {} does not match block length {}",
            output.len(),
            input.len()
        )));
    }
    Ok(())
}
