//! Impulse-response set (IRS) loading and the spatial store built from it.
//!
//! An [`IrsStore`] is parsed once from an IRS file and never mutated afterwards,
//! so it can be shared between any number of streams behind an `Arc`.
//!
//! The file lists every listener once, but carries one sample block per
//! (source, listener) pair. The store therefore keeps one [`Listener`] record per
//! pair, all owned by a single arena and addressed through [`ListenerIndex`].
//! Each [`Source`] arranges its own listeners in a [`ListenerGrid`] sorted by
//! ascending x, then ascending y.

mod grid;
mod header;

#[cfg(test)]
pub(crate) mod fixture;

pub use grid::ListenerGrid;
pub use header::{HEADER_SIZE, IRS_MAGIC, IrsHeader};

use crate::audio_data::upsample_2x;
use crate::error::{AudioSimError, Result};
use crate::math::{Vec3, distance, exact_sqrt};
use header::{ChunkHeader, DataHeader, ListenerRecord, SourceRecord, read_samples};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Position of a [`Source`] in its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceIndex(pub(crate) usize);

/// Position of a [`Listener`] in its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerIndex(pub(crate) usize);

impl SourceIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

impl ListenerIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

/// A sound emitter and the grid of listeners recorded for it.
#[derive(Debug, Clone)]
pub struct Source {
    index: SourceIndex,
    id: i32,
    position: Vec3,
    kind: i32,
    raw_sample_count: usize,
    grid: ListenerGrid,
}

impl Source {
    pub fn index(&self) -> SourceIndex {
        self.index
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    /// Position in metres
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Type tag as stored in the file
    pub fn kind(&self) -> i32 {
        self.kind
    }

    /// Samples per listener as stored in the file, before upsampling.
    pub fn raw_sample_count(&self) -> usize {
        self.raw_sample_count
    }

    /// Samples per listener series after upsampling.
    pub fn data_len(&self) -> usize {
        self.raw_sample_count * 2
    }

    pub fn listener_axis_size(&self) -> usize {
        self.grid.axis_size()
    }

    pub fn listener_count(&self) -> usize {
        self.grid.len()
    }

    pub fn grid(&self) -> &ListenerGrid {
        &self.grid
    }
}

/// A receiver position holding the impulse response measured there for one source.
#[derive(Debug, Clone)]
pub struct Listener {
    index: ListenerIndex,
    id: i32,
    position: Vec3,
    source: SourceIndex,
    data: Vec<f64>,
}

impl Listener {
    pub fn index(&self) -> ListenerIndex {
        self.index
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    /// Position in metres
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// The source this impulse response was recorded for.
    pub fn source(&self) -> SourceIndex {
        self.source
    }

    /// Upsampled impulse response. Empty if the file carried no block for this pair.
    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

/// Immutable in-memory view of an IRS file.
#[derive(Debug)]
pub struct IrsStore {
    header: IrsHeader,
    sources: Vec<Source>,
    listeners: Vec<Listener>,
}

impl IrsStore {
    /// Opens and parses the IRS file at `path`.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be opened, otherwise as [`IrsStore::from_reader`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        log::info!("Loading IRS file {}", path.display());
        Self::from_reader(BufReader::new(file))
    }

    /// Parses an IRS stream.
    ///
    /// # Errors
    ///
    /// - `Format` on bad magic, a truncated record, negative counts, or a data
    ///   block naming an unknown source or listener id.
    /// - `Precondition` if the listener count is not a perfect square.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let header = IrsHeader::read(&mut reader)?;
        log::info!(
            "IRS header: version {}, extents {}x{}x{} voxels, {} Hz, scale {} voxels/m, {} sources, {} listeners",
            header.version,
            header.size_x,
            header.size_y,
            header.size_z,
            header.sampling_rate,
            header.scale,
            header.n_sources,
            header.n_listeners
        );
        if header.header_size != HEADER_SIZE as i32 {
            log::debug!(
                "Header declares {} bytes, reading the fixed {} byte layout",
                header.header_size,
                HEADER_SIZE
            );
        }

        let source_chunk = ChunkHeader::read(&mut reader, "source chunk header")?;
        log::trace!(
            "Source chunk: {} bytes, {} entries",
            source_chunk.size,
            source_chunk.n_entries
        );
        if source_chunk.n_entries as i64 != header.n_sources as i64 {
            log::warn!(
                "Header declares {} sources but the source chunk holds {}",
                header.n_sources,
                source_chunk.n_entries
            );
        }
        let source_records = (0..source_chunk.n_entries)
            .map(|_| SourceRecord::read(&mut reader))
            .collect::<Result<Vec<_>>>()?;

        let listener_chunk = ChunkHeader::read(&mut reader, "listener chunk header")?;
        log::trace!(
            "Listener chunk: {} bytes, {} entries",
            listener_chunk.size,
            listener_chunk.n_entries
        );
        if listener_chunk.n_entries as i64 != header.n_listeners as i64 {
            log::warn!(
                "Header declares {} listeners but the listener chunk holds {}",
                header.n_listeners,
                listener_chunk.n_entries
            );
        }
        let listener_records = (0..listener_chunk.n_entries)
            .map(|_| ListenerRecord::read(&mut reader))
            .collect::<Result<Vec<_>>>()?;

        let n_listeners = listener_records.len();
        let axis = exact_sqrt(n_listeners).ok_or_else(|| {
            AudioSimError::Precondition(format!(
                "listener count {} is not a perfect square",
                n_listeners
            ))
        })?;

        // last occurrence wins on duplicate ids
        let source_slots: HashMap<i32, usize> = source_records
            .iter()
            .enumerate()
            .map(|(slot, record)| (record.id, slot))
            .collect();
        let listener_slots: HashMap<i32, usize> = listener_records
            .iter()
            .enumerate()
            .map(|(slot, record)| (record.id, slot))
            .collect();

        let n_blocks = source_records
            .len()
            .checked_mul(n_listeners)
            .ok_or_else(|| {
                AudioSimError::Format(format!(
                    "{} sources x {} listeners overflows the block count",
                    source_records.len(),
                    n_listeners
                ))
            })?;

        let mut listeners = Vec::with_capacity(n_blocks);
        for source_slot in 0..source_records.len() {
            for (listener_slot, record) in listener_records.iter().enumerate() {
                listeners.push(Listener {
                    index: ListenerIndex(source_slot * n_listeners + listener_slot),
                    id: record.id,
                    position: voxels_to_metres(&header, record.position),
                    source: SourceIndex(source_slot),
                    data: Vec::new(),
                });
            }
        }

        for _ in 0..n_blocks {
            let block = DataHeader::read(&mut reader)?;
            let source_slot = *source_slots.get(&block.source_id).ok_or_else(|| {
                AudioSimError::Format(format!(
                    "data block references unknown source id {}",
                    block.source_id
                ))
            })?;
            let listener_slot = *listener_slots.get(&block.listener_id).ok_or_else(|| {
                AudioSimError::Format(format!(
                    "data block references unknown listener id {}",
                    block.listener_id
                ))
            })?;

            let raw = read_samples(&mut reader, source_records[source_slot].n_samples)?;
            log::trace!(
                "Data block ({} bytes): source {} listener {}, {} samples",
                block.size,
                block.source_id,
                block.listener_id,
                raw.len()
            );

            let listener = &mut listeners[source_slot * n_listeners + listener_slot];
            if !listener.data.is_empty() {
                log::warn!(
                    "Duplicate data block for source {} listener {}, keeping the last one",
                    block.source_id,
                    block.listener_id
                );
            }
            listener.data = upsample_2x(&raw);
        }

        let sources = source_records
            .iter()
            .enumerate()
            .map(|(slot, record)| {
                let base = slot * n_listeners;
                let mut cells: Vec<ListenerIndex> =
                    (base..base + n_listeners).map(ListenerIndex).collect();
                cells.sort_by(|a, b| {
                    let (pa, pb) = (listeners[a.0].position, listeners[b.0].position);
                    pa.x.total_cmp(&pb.x).then(pa.y.total_cmp(&pb.y))
                });

                let missing = cells
                    .iter()
                    .filter(|index| listeners[index.0].data.is_empty())
                    .count();
                if missing > 0 && record.n_samples > 0 {
                    log::warn!(
                        "Source {}: {} of {} listeners have no impulse response",
                        record.id,
                        missing,
                        n_listeners
                    );
                }

                Source {
                    index: SourceIndex(slot),
                    id: record.id,
                    position: voxels_to_metres(&header, record.position),
                    kind: record.kind,
                    raw_sample_count: record.n_samples,
                    grid: ListenerGrid::new(axis, cells),
                }
            })
            .collect::<Vec<_>>();

        log::info!(
            "Loaded {} sources with a {}x{} listener grid each ({} samples per impulse response)",
            sources.len(),
            axis,
            axis,
            sources.first().map_or(0, Source::data_len)
        );

        Ok(Self {
            header,
            sources,
            listeners,
        })
    }

    pub fn header(&self) -> &IrsHeader {
        &self.header
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// # Panics
    ///
    /// If `index` came from a different store.
    pub fn source(&self, index: SourceIndex) -> &Source {
        &self.sources[index.0]
    }

    /// # Panics
    ///
    /// If `index` came from a different store.
    pub fn listener(&self, index: ListenerIndex) -> &Listener {
        &self.listeners[index.0]
    }

    /// Impulse response of one listener; its length is the series length.
    pub fn listener_data(&self, index: ListenerIndex) -> &[f64] {
        self.listener(index).data()
    }

    /// Listeners of `source` in grid order.
    pub fn listeners_of<'a>(&'a self, source: &'a Source) -> impl Iterator<Item = &'a Listener> + 'a {
        source.grid().iter().map(move |index| self.listener(index))
    }

    pub fn find_source(&self, id: i32) -> Option<&Source> {
        self.sources.iter().find(|source| source.id == id)
    }

    /// The source nearest to `position`; the earliest in file order on ties.
    ///
    /// # Errors
    ///
    /// `Precondition` if the store holds no sources.
    pub fn closest_source(&self, position: Vec3) -> Result<&Source> {
        self.sources
            .iter()
            .min_by(|a, b| {
                distance(a.position, position).total_cmp(&distance(b.position, position))
            })
            .ok_or_else(|| {
                AudioSimError::Precondition("no sources in the impulse-response set".to_string())
            })
    }

    /// The listener of `source` nearest to `position`, or `None` for an empty grid.
    pub fn closest_listener<'a>(
        &'a self,
        source: &'a Source,
        position: Vec3,
    ) -> Option<&'a Listener> {
        self.listeners_of(source).min_by(|a, b| {
            distance(a.position, position).total_cmp(&distance(b.position, position))
        })
    }
}

fn voxels_to_metres(header: &IrsHeader, [x, y, z]: [i32; 3]) -> Vec3 {
    Vec3::new(header.to_metres(x), header.to_metres(y), header.to_metres(z))
}

#[cfg(test)]
mod tests {
    use super::fixture::IrsFixture;
    use super::*;
    use byteorder::{LittleEndian, WriteBytesExt};
    use std::io::Cursor;

    fn four_listener_fixture() -> IrsFixture {
        // listeners deliberately out of grid order
        IrsFixture::new(40, 40, 2.0)
            .source(7, [4, 6, 0], 2)
            .listener(3, [20, 20, 0])
            .listener(1, [0, 20, 0])
            .listener(2, [20, 0, 0])
            .listener(0, [0, 0, 0])
            .block(7, 0, vec![1.0, 0.0])
            .block(7, 1, vec![2.0, 0.0])
            .block(7, 2, vec![3.0, 0.0])
            .block(7, 3, vec![4.0, 0.0])
    }

    #[test]
    fn test_load_store() {
        let store = four_listener_fixture().build();

        assert_eq!(store.header().sampling_rate, 22050);
        assert_eq!(store.sources().len(), 1);

        let source = &store.sources()[0];
        assert_eq!(source.id(), 7);
        assert_eq!(source.position(), Vec3::new(2.0, 3.0, 0.0));
        assert_eq!(source.listener_axis_size(), 2);
        assert_eq!(source.listener_count(), 4);
        assert_eq!(source.raw_sample_count(), 2);
        assert_eq!(source.data_len(), 4);

        let first = store.listener(source.grid()[(0, 0)]);
        assert_eq!(first.id(), 0);
        assert_eq!(first.source(), source.index());
        assert_eq!(first.data(), &[1.0, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_grid_is_sorted_x_major() {
        let store = four_listener_fixture().build();
        let source = &store.sources()[0];
        let ids: Vec<i32> = store.listeners_of(source).map(Listener::id).collect();
        // (0,0) (0,10) (10,0) (10,10)
        assert_eq!(ids, vec![0, 1, 2, 3]);

        let grid = source.grid();
        assert!(store.listener(grid[(1, 0)]).position().x > store.listener(grid[(0, 1)]).position().x);
        assert!(store.listener(grid[(0, 1)]).position().y > store.listener(grid[(0, 0)]).position().y);
    }

    #[test]
    fn test_listener_data_length() {
        let store = four_listener_fixture().build();
        let source = &store.sources()[0];
        for index in source.grid().iter() {
            assert_eq!(store.listener_data(index).len(), source.data_len());
        }
    }

    #[test]
    fn test_unknown_listener_id() {
        let bytes = IrsFixture::new(40, 40, 1.0)
            .source(0, [0, 0, 0], 1)
            .listener(5, [0, 0, 0])
            .block(0, 6, vec![1.0])
            .to_bytes();
        let err = IrsStore::from_reader(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, AudioSimError::Format(msg) if msg.contains("listener id 6")));
    }

    #[test]
    fn test_unknown_source_id() {
        let bytes = IrsFixture::new(40, 40, 1.0)
            .source(0, [0, 0, 0], 1)
            .listener(5, [0, 0, 0])
            .block(9, 5, vec![1.0])
            .to_bytes();
        let err = IrsStore::from_reader(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, AudioSimError::Format(msg) if msg.contains("source id 9")));
    }

    #[test]
    fn test_truncated_data_block() {
        let mut bytes = four_listener_fixture().to_bytes();
        bytes.truncate(bytes.len() - 3);
        let err = IrsStore::from_reader(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, AudioSimError::Format(msg) if msg.contains("truncated")));
    }

    #[test]
    fn test_truncated_listener_chunk() {
        let bytes = four_listener_fixture().to_bytes();
        // header + source chunk + listener chunk header + half a listener record
        let cut = HEADER_SIZE + 8 + 24 + 8 + 8;
        let err = IrsStore::from_reader(Cursor::new(bytes[..cut].to_vec())).unwrap_err();
        assert!(matches!(err, AudioSimError::Format(_)));
    }

    #[test]
    fn test_non_square_listener_count() {
        let bytes = IrsFixture::new(40, 40, 1.0)
            .source(0, [0, 0, 0], 1)
            .listener(0, [0, 0, 0])
            .listener(1, [1, 0, 0])
            .block(0, 0, vec![1.0])
            .block(0, 1, vec![1.0])
            .to_bytes();
        let err = IrsStore::from_reader(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, AudioSimError::Precondition(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = IrsStore::from_path("no/such/file.irs").unwrap_err();
        assert!(matches!(err, AudioSimError::Io(_)));
    }

    #[test]
    fn test_sources_do_not_share_listener_data() {
        let store = IrsFixture::new(40, 40, 1.0)
            .source(0, [0, 0, 0], 1)
            .source(1, [5, 5, 0], 1)
            .listener(0, [0, 0, 0])
            .block(0, 0, vec![1.0])
            .block(1, 0, vec![-1.0])
            .build();

        let a = &store.sources()[0];
        let b = &store.sources()[1];
        assert_eq!(store.listener_data(a.grid()[(0, 0)]), &[1.0, 0.5]);
        assert_eq!(store.listener_data(b.grid()[(0, 0)]), &[-1.0, -0.5]);
        assert_eq!(store.listener(b.grid()[(0, 0)]).source(), b.index());
    }

    #[test]
    fn test_closest_source() {
        let store = IrsFixture::new(40, 40, 1.0)
            .source(10, [0, 0, 0], 1)
            .source(11, [10, 0, 0], 1)
            .listener(0, [0, 0, 0])
            .block(10, 0, vec![1.0])
            .block(11, 0, vec![1.0])
            .build();

        assert_eq!(store.closest_source(Vec3::new(1.0, 0.0, 0.0)).unwrap().id(), 10);
        assert_eq!(store.closest_source(Vec3::new(9.0, 1.0, 0.0)).unwrap().id(), 11);
        // equidistant: first in file order
        assert_eq!(store.closest_source(Vec3::new(5.0, 0.0, 0.0)).unwrap().id(), 10);
        assert_eq!(store.find_source(11).map(Source::index), Some(SourceIndex(1)));
    }

    #[test]
    fn test_closest_source_on_empty_store() {
        let store = IrsFixture::new(40, 40, 1.0).build();
        assert!(store.is_empty());
        let err = store.closest_source(Vec3::ZERO).unwrap_err();
        assert!(matches!(err, AudioSimError::Precondition(_)));
    }

    #[test]
    fn test_closest_listener() {
        let store = four_listener_fixture().build();
        let source = &store.sources()[0];
        let nearest = store
            .closest_listener(source, Vec3::new(9.0, 1.0, 0.0))
            .unwrap();
        assert_eq!(nearest.id(), 2);
    }

    #[test]
    fn test_closest_listener_outlives_source_lookup() {
        let store = four_listener_fixture().build();
        let nearest = {
            let index = store.sources()[0].index();
            store.closest_listener(store.source(index), Vec3::new(0.0, 9.0, 0.0))
        };
        let nearest = nearest.unwrap();
        assert_eq!(nearest.id(), 1);
        assert_eq!(nearest.source(), store.sources()[0].index());

        let empty = IrsFixture::new(10, 10, 1.0).source(0, [0, 0, 0], 1).build();
        assert!(empty.closest_listener(&empty.sources()[0], Vec3::ZERO).is_none());
    }

    #[test]
    fn test_truncated_file_with_large_declared_block() {
        let mut bytes = IrsFixture::new(10, 10, 1.0)
            .source(0, [0, 0, 0], 1 << 24)
            .listener(0, [0, 0, 0])
            .to_bytes();
        // data block header only, no samples
        for field in [12, 0, 0] {
            bytes.write_i32::<LittleEndian>(field).unwrap();
        }
        let err = IrsStore::from_reader(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, AudioSimError::Format(_)));
    }
}
