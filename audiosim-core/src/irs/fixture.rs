//! In-memory IRS files for tests.

use super::{HEADER_SIZE, IRS_MAGIC, IrsStore};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{Cursor, Write};

pub(crate) struct IrsFixture {
    size: [i32; 3],
    scale: f32,
    sources: Vec<(i32, [i32; 3], usize)>,
    listeners: Vec<(i32, [i32; 3])>,
    blocks: Vec<(i32, i32, Vec<f32>)>,
}

impl IrsFixture {
    pub fn new(size_x: i32, size_y: i32, scale: f32) -> Self {
        Self {
            size: [size_x, size_y, 10],
            scale,
            sources: Vec::new(),
            listeners: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn source(mut self, id: i32, position: [i32; 3], n_samples: usize) -> Self {
        self.sources.push((id, position, n_samples));
        self
    }

    pub fn listener(mut self, id: i32, position: [i32; 3]) -> Self {
        self.listeners.push((id, position));
        self
    }

    /// Blocks are written in the order they are added.
    pub fn block(mut self, source_id: i32, listener_id: i32, samples: Vec<f32>) -> Self {
        self.blocks.push((source_id, listener_id, samples));
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        buf.write_all(&IRS_MAGIC).unwrap();
        buf.write_i32::<LittleEndian>(1).unwrap(); // version
        buf.write_i32::<LittleEndian>(HEADER_SIZE as i32).unwrap();
        for extent in self.size {
            buf.write_i32::<LittleEndian>(extent).unwrap();
        }
        buf.write_i32::<LittleEndian>(22050).unwrap();
        buf.write_f32::<LittleEndian>(0.5).unwrap(); // speed of sound
        buf.write_f32::<LittleEndian>(self.scale).unwrap();
        buf.write_i32::<LittleEndian>(self.sources.len() as i32).unwrap();
        buf.write_i32::<LittleEndian>(self.listeners.len() as i32).unwrap();

        buf.write_i32::<LittleEndian>(8 + 24 * self.sources.len() as i32)
            .unwrap();
        buf.write_i32::<LittleEndian>(self.sources.len() as i32).unwrap();
        for (id, [x, y, z], n_samples) in &self.sources {
            for field in [*id, *x, *y, *z, 0, *n_samples as i32] {
                buf.write_i32::<LittleEndian>(field).unwrap();
            }
        }

        buf.write_i32::<LittleEndian>(8 + 16 * self.listeners.len() as i32)
            .unwrap();
        buf.write_i32::<LittleEndian>(self.listeners.len() as i32).unwrap();
        for (id, [x, y, z]) in &self.listeners {
            for field in [*id, *x, *y, *z] {
                buf.write_i32::<LittleEndian>(field).unwrap();
            }
        }

        for (source_id, listener_id, samples) in &self.blocks {
            buf.write_i32::<LittleEndian>(12 + 4 * samples.len() as i32)
                .unwrap();
            buf.write_i32::<LittleEndian>(*source_id).unwrap();
            buf.write_i32::<LittleEndian>(*listener_id).unwrap();
            for sample in samples {
                buf.write_f32::<LittleEndian>(*sample).unwrap();
            }
        }

        buf
    }

    pub fn build(&self) -> IrsStore {
        IrsStore::from_reader(Cursor::new(self.to_bytes())).unwrap()
    }
}

/// One source with a 2x2 grid at (0,0), (0,10), (10,0), (10,10) metres inside a
/// 40 m square scene. Every listener stores `raw` (upsampled on load).
pub(crate) fn square_2x2(raw: &[f32]) -> IrsStore {
    let mut fixture = IrsFixture::new(40, 40, 1.0).source(0, [0, 0, 0], raw.len());
    for (id, position) in [[0, 0, 0], [10, 0, 0], [0, 10, 0], [10, 10, 0]]
        .into_iter()
        .enumerate()
    {
        fixture = fixture.listener(id as i32, position);
    }
    for id in 0..4 {
        fixture = fixture.block(0, id, raw.to_vec());
    }
    fixture.build()
}

/// One source with an `axis`x`axis` grid spaced `spacing` metres apart, starting at
/// the origin. The listener at grid (row, col) stores `[row * axis + col + 1]`.
pub(crate) fn numbered_grid(axis: i32, spacing: i32, extent: i32) -> IrsStore {
    let mut fixture = IrsFixture::new(extent, extent, 1.0).source(0, [0, 0, 0], 1);
    for row in 0..axis {
        for col in 0..axis {
            fixture = fixture.listener(row * axis + col, [row * spacing, col * spacing, 0]);
        }
    }
    for id in 0..axis * axis {
        fixture = fixture.block(0, id, vec![(id + 1) as f32]);
    }
    fixture.build()
}
