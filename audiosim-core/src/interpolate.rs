//! Derives an impulse response for an arbitrary position from a source's listener grid.
//!
//! The scene extent from the IRS header splits each horizontal axis into three
//! zones. A query beyond the extent on both X and Y snaps to the nearest grid
//! corner, beyond it on one axis interpolates linearly along the grid edge, and
//! inside it interpolates bilinearly between the four surrounding listeners.
//! Height (z) is ignored.

use crate::irs::{IrsStore, ListenerIndex, Source};
use crate::math::Vec3;

/// One listener's contribution to an interpolated impulse response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    pub listener: ListenerIndex,
    pub weight: f64,
}

/// The listeners selected for a query position and their weights.
///
/// Weights always sum to 1 unless the grid is empty, in which case there are no taps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interpolation {
    taps: Vec<Tap>,
}

impl Interpolation {
    pub fn taps(&self) -> &[Tap] {
        &self.taps
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    pub fn weight_sum(&self) -> f64 {
        self.taps.iter().map(|tap| tap.weight).sum()
    }

    /// Weight given to `listener`, zero if it was not selected.
    pub fn weight_of(&self, listener: ListenerIndex) -> f64 {
        self.taps
            .iter()
            .find(|tap| tap.listener == listener)
            .map_or(0.0, |tap| tap.weight)
    }

    /// Weighted sum of the selected listeners' impulse responses.
    pub fn combine(&self, store: &IrsStore) -> Vec<f64> {
        weighted_sum(
            self.taps
                .iter()
                .map(|tap| (store.listener_data(tap.listener), tap.weight)),
        )
    }

    // A listener picked twice (degenerate 1-wide grids) keeps a single tap.
    fn push(&mut self, listener: ListenerIndex, weight: f64) {
        match self.taps.iter_mut().find(|tap| tap.listener == listener) {
            Some(tap) => tap.weight += weight,
            None => self.taps.push(Tap { listener, weight }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Below,
    Inside,
    Above,
}

impl Side {
    fn classify(value: f64, half_extent: f64) -> Self {
        if value < -half_extent {
            Side::Below
        } else if value > half_extent {
            Side::Above
        } else {
            Side::Inside
        }
    }

    /// Grid line an off-grid query clamps to.
    fn edge(self, axis: usize) -> Option<usize> {
        match self {
            Side::Below => Some(0),
            Side::Above => Some(axis - 1),
            Side::Inside => None,
        }
    }
}

/// Selects the listeners of `source` around `position` and weights them.
pub fn select(store: &IrsStore, source: &Source, position: Vec3) -> Interpolation {
    let grid = source.grid();
    let axis = grid.axis_size();
    let mut interpolation = Interpolation::default();
    if axis == 0 {
        log::debug!("Source {} has no listeners", source.id());
        return interpolation;
    }

    let header = store.header();
    let (x, y) = (position.x as f64, position.y as f64);
    let side_x = Side::classify(x, header.half_extent_x());
    let side_y = Side::classify(y, header.half_extent_y());

    let x_at = |index: ListenerIndex| store.listener(index).position().x as f64;
    let y_at = |index: ListenerIndex| store.listener(index).position().y as f64;

    match (side_x.edge(axis), side_y.edge(axis)) {
        (Some(row), Some(col)) => {
            interpolation.push(grid[(row, col)], 1.0);
        }
        (Some(row), None) => {
            let lines: Vec<f64> = grid.row(row).iter().copied().map(y_at).collect();
            let (lower, upper, t) = bracket(&lines, y);
            interpolation.push(grid[(row, lower)], 1.0 - t);
            interpolation.push(grid[(row, upper)], t);
        }
        (None, Some(col)) => {
            let lines: Vec<f64> = grid.column(col).map(x_at).collect();
            let (lower, upper, t) = bracket(&lines, x);
            interpolation.push(grid[(lower, col)], 1.0 - t);
            interpolation.push(grid[(upper, col)], t);
        }
        (None, None) => {
            let x_lines: Vec<f64> = grid.column(0).map(x_at).collect();
            let y_lines: Vec<f64> = grid.row(0).iter().copied().map(y_at).collect();
            let (x0, x1, tx) = bracket(&x_lines, x);
            let (y0, y1, ty) = bracket(&y_lines, y);
            interpolation.push(grid[(x0, y0)], (1.0 - tx) * (1.0 - ty));
            interpolation.push(grid[(x1, y0)], tx * (1.0 - ty));
            interpolation.push(grid[(x0, y1)], (1.0 - tx) * ty);
            interpolation.push(grid[(x1, y1)], tx * ty);
        }
    }

    log::trace!(
        "Interpolating ({:.3}, {:.3}) over source {}: {:?}/{:?}, {} taps",
        x,
        y,
        source.id(),
        side_x,
        side_y,
        interpolation.taps.len()
    );
    interpolation
}

/// Impulse response for `position`, interpolated from `source`'s grid.
pub fn interpolate(store: &IrsStore, source: &Source, position: Vec3) -> Vec<f64> {
    select(store, source, position).combine(store)
}

/// Sums weighted signals sample by sample, zero-padding each to the longest.
pub fn weighted_sum<'a>(signals: impl IntoIterator<Item = (&'a [f64], f64)>) -> Vec<f64> {
    let signals: Vec<(&[f64], f64)> = signals.into_iter().collect();
    let len = signals.iter().map(|(signal, _)| signal.len()).max().unwrap_or(0);

    let mut out = vec![0.0; len];
    for (signal, weight) in signals {
        for (acc, sample) in out.iter_mut().zip(signal) {
            *acc += weight * sample;
        }
    }
    out
}

/// Finds the adjacent pair of ascending grid `lines` around `value`.
///
/// Returns `(lower, upper, t)` with `t` the clamped fractional position of
/// `value` between them. The upper line is the first one strictly above `value`,
/// kept inside the grid so queries past either end resolve to the end pair.
fn bracket(lines: &[f64], value: f64) -> (usize, usize, f64) {
    if lines.len() < 2 {
        return (0, 0, 0.0);
    }

    let upper = lines
        .iter()
        .position(|&line| line > value)
        .unwrap_or(lines.len())
        .clamp(1, lines.len() - 1);
    let lower = upper - 1;

    let span = lines[upper] - lines[lower];
    let t = if span > 0.0 {
        ((value - lines[lower]) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (lower, upper, t)
}
