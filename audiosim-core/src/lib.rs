//! Offline acoustic rendering from precomputed impulse-response sets.
//!
//! An IRS file holds room impulse responses simulated on a grid of listener
//! positions for each sound source. [`IrsStore`] loads one, [`AudioSim`] picks
//! the source closest to a listener, and an [`AudioStream`] convolves a mono
//! signal block by block with the impulse response interpolated at the
//! listener's position.

pub mod audio_data;
pub mod config;
pub mod convolve;
pub mod error;
pub mod interpolate;
pub mod irs;
pub mod math;
pub mod sim;
pub mod stream;

pub use audio_data::{AudioData, LoadOptions, MonoMode, write_wav};
pub use config::AudioSimDesc;
pub use convolve::{Convolver, convolve};
pub use error::{AudioSimError, Result};
pub use interpolate::{Interpolation, Tap, interpolate};
pub use irs::{IrsHeader, IrsStore, Listener, ListenerGrid, ListenerIndex, Source, SourceIndex};
pub use math::Vec3;
pub use sim::AudioSim;
pub use stream::{AudioStream, BlockReport, StreamState};
