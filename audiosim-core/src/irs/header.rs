//! Fixed-width records of the IRS binary format.
//!
//! Every record is packed little-endian with no padding:
//!
//! - file header (44 bytes): magic `iSim`, version, header size, voxel extents
//!   (x, y, z), sampling rate, speed of sound (f32, voxels/sample),
//!   scale (f32, voxels/metre), source count, listener count
//! - chunk header (8 bytes): size, entry count
//! - source record (24 bytes): id, x, y, z, type, sample count
//! - listener record (16 bytes): id, x, y, z
//! - data header (12 bytes): size, source id, listener id, then `sample count` f32s
//!
//! All integers are i32.

use crate::error::{AudioSimError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

/// Magic bytes at the start of every IRS file.
pub const IRS_MAGIC: [u8; 4] = *b"iSim";

/// Size of [`IrsHeader`] on disk.
pub const HEADER_SIZE: usize = 44;

/// Largest raw sample block accepted per (source, listener) pair.
const MAX_SAMPLES_PER_BLOCK: usize = 1 << 26;

/// The file-level header of an IRS file.
#[derive(Debug, Clone, PartialEq)]
pub struct IrsHeader {
    pub version: i32,
    /// Header size as declared by the writer
    pub header_size: i32,
    /// Scene extents in voxels
    pub size_x: i32,
    pub size_y: i32,
    pub size_z: i32,
    /// Rate of the raw stored samples in Hz
    pub sampling_rate: i32,
    /// Voxels per sample
    pub speed_of_sound: f32,
    /// Voxels per metre
    pub scale: f32,
    pub n_sources: i32,
    pub n_listeners: i32,
}

impl IrsHeader {
    /// Half the scene length along X, in metres.
    pub fn half_extent_x(&self) -> f64 {
        0.5 * self.size_x as f64 / self.scale as f64
    }

    /// Half the scene height along Y, in metres.
    pub fn half_extent_y(&self) -> f64 {
        0.5 * self.size_y as f64 / self.scale as f64
    }

    /// Sample rate of the stored impulse responses after the 2x upsample.
    pub fn upsampled_rate(&self) -> u32 {
        (self.sampling_rate.max(0) as u32).saturating_mul(2)
    }

    /// Converts a quantized voxel coordinate to metres.
    pub(crate) fn to_metres(&self, voxels: i32) -> f32 {
        voxels as f32 / self.scale
    }

    pub(crate) fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(eof_as_format("file header"))?;
        if magic != IRS_MAGIC {
            return Err(AudioSimError::Format(format!(
                "invalid magic bytes {:?}, expected \"iSim\"",
                String::from_utf8_lossy(&magic)
            )));
        }

        let header = Self::read_fields(reader).map_err(eof_as_format("file header"))?;

        if !(header.scale.is_finite() && header.scale > 0.0) {
            return Err(AudioSimError::Format(format!(
                "scale must be positive, got {}",
                header.scale
            )));
        }

        Ok(header)
    }

    fn read_fields<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            version: reader.read_i32::<LittleEndian>()?,
            header_size: reader.read_i32::<LittleEndian>()?,
            size_x: reader.read_i32::<LittleEndian>()?,
            size_y: reader.read_i32::<LittleEndian>()?,
            size_z: reader.read_i32::<LittleEndian>()?,
            sampling_rate: reader.read_i32::<LittleEndian>()?,
            speed_of_sound: reader.read_f32::<LittleEndian>()?,
            scale: reader.read_f32::<LittleEndian>()?,
            n_sources: reader.read_i32::<LittleEndian>()?,
            n_listeners: reader.read_i32::<LittleEndian>()?,
        })
    }
}

/// Header that opens the source and listener chunks.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChunkHeader {
    pub size: i32,
    pub n_entries: usize,
}

impl ChunkHeader {
    pub fn read<R: Read>(reader: &mut R, what: &'static str) -> Result<Self> {
        let size = reader
            .read_i32::<LittleEndian>()
            .map_err(eof_as_format(what))?;
        let n_entries = reader
            .read_i32::<LittleEndian>()
            .map_err(eof_as_format(what))?;
        Ok(Self {
            size,
            n_entries: non_negative(n_entries, what)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SourceRecord {
    pub id: i32,
    pub position: [i32; 3],
    pub kind: i32,
    pub n_samples: usize,
}

impl SourceRecord {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut fields = [0i32; 6];
        reader
            .read_i32_into::<LittleEndian>(&mut fields)
            .map_err(eof_as_format("source record"))?;
        let [id, x, y, z, kind, n_samples] = fields;

        let n_samples = non_negative(n_samples, "source sample count")?;
        if n_samples > MAX_SAMPLES_PER_BLOCK {
            return Err(AudioSimError::Format(format!(
                "source {} declares {} samples per listener (limit {})",
                id, n_samples, MAX_SAMPLES_PER_BLOCK
            )));
        }

        Ok(Self {
            id,
            position: [x, y, z],
            kind,
            n_samples,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ListenerRecord {
    pub id: i32,
    pub position: [i32; 3],
}

impl ListenerRecord {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut fields = [0i32; 4];
        reader
            .read_i32_into::<LittleEndian>(&mut fields)
            .map_err(eof_as_format("listener record"))?;
        let [id, x, y, z] = fields;
        Ok(Self {
            id,
            position: [x, y, z],
        })
    }
}

/// Correlates the sample block that follows with a (source, listener) pair.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DataHeader {
    pub size: i32,
    pub source_id: i32,
    pub listener_id: i32,
}

impl DataHeader {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut fields = [0i32; 3];
        reader
            .read_i32_into::<LittleEndian>(&mut fields)
            .map_err(eof_as_format("data header"))?;
        let [size, source_id, listener_id] = fields;
        Ok(Self {
            size,
            source_id,
            listener_id,
        })
    }
}

/// Samples decoded per read.
const READ_CHUNK: usize = 4096;

/// Reads one raw sample block of `n_samples` f32s.
pub(crate) fn read_samples<R: Read>(reader: &mut R, n_samples: usize) -> Result<Vec<f32>> {
    let mut samples = Vec::with_capacity(n_samples.min(READ_CHUNK));
    let mut chunk = [0f32; READ_CHUNK];
    let mut remaining = n_samples;
    while remaining > 0 {
        let n = remaining.min(READ_CHUNK);
        reader
            .read_f32_into::<LittleEndian>(&mut chunk[..n])
            .map_err(eof_as_format("sample block"))?;
        samples.extend_from_slice(&chunk[..n]);
        remaining -= n;
    }
    Ok(samples)
}

/// Maps a short read to a format error naming the record; other IO errors pass through.
fn eof_as_format(what: &'static str) -> impl Fn(io::Error) -> AudioSimError {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            AudioSimError::Format(format!("file truncated in {}", what))
        } else {
            AudioSimError::Io(e)
        }
    }
}

fn non_negative(value: i32, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| AudioSimError::Format(format!("negative {}: {}", what, value)))
}
