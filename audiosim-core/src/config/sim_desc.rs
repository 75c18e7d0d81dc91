use crate::error::{AudioSimError, Result};

/// Configuration descriptor for an [`AudioSim`](crate::AudioSim)
#[derive(Debug, Clone)]
pub struct AudioSimDesc {
    /// Number of frames fed to a stream per `process_block` call. Must be a power of two.
    pub block_size: usize,
    /// Scale applied after dividing by the running peak, in `(0, 1]`.
    pub headroom: f64,
    /// Starting value of every stream's running peak. Acts as a floor, so quiet
    /// input is never amplified.
    pub initial_peak: f64,
    /// Rendered length as a multiple of the input length, so the echo tail can ring out.
    pub output_padding: usize,
}

impl Default for AudioSimDesc {
    fn default() -> Self {
        Self {
            block_size: 32768,
            headroom: 0.99,
            initial_peak: 1.0,
            output_padding: 2,
        }
    }
}

impl AudioSimDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    pub fn headroom(mut self, headroom: f64) -> Self {
        self.headroom = headroom;
        self
    }

    pub fn initial_peak(mut self, peak: f64) -> Self {
        self.initial_peak = peak;
        self
    }

    pub fn output_padding(mut self, factor: usize) -> Self {
        self.output_padding = factor;
        self
    }

    /// Checks the values a stream relies on.
    pub fn validate(&self) -> Result<()> {
        if !self.block_size.is_power_of_two() {
            return Err(AudioSimError::Precondition(format!(
                "block size {} is not a power of two",
                self.block_size
            )));
        }

        if !(self.headroom > 0.0 && self.headroom <= 1.0) {
            return Err(AudioSimError::Precondition(format!(
                "headroom {} must be in (0, 1]",
                self.headroom
            )));
        }

        if !(self.initial_peak > 0.0 && self.initial_peak.is_finite()) {
            return Err(AudioSimError::Precondition(format!(
                "initial peak {} must be positive",
                self.initial_peak
            )));
        }

        if self.output_padding == 0 {
            return Err(AudioSimError::Precondition(
                "output padding must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
