#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonoMode {
    /// Keep original channels: stereo if input is stereo, mono if input is mono
    Original,
    /// Keep only channel 0 and drop the others
    FirstChannel,
    /// Average all channels of each frame into one sample
    Downmix,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// How to reduce multichannel input
    pub mono: MonoMode,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            mono: MonoMode::Original,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mono(mut self, mode: MonoMode) -> Self {
        self.mono = mode;
        self
    }
}
