//! Two-dimensional height lattice with periodic (toroidal) indexing.
//!
//! A `HeightField` stores `width * height` finite f64 height samples in
//! row-major layout. Coordinate access wraps around in both axes, so
//! negative and overflowing indices are valid; there is no boundary
//! failure mode. Growth engines own a field for the duration of one run
//! and hand it back afterwards.

use crate::error::EngineError;

/// A periodic 2D array of height samples.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

/// Validates dimensions and returns the cell count.
fn checked_len(width: usize, height: usize) -> Result<usize, EngineError> {
    if width == 0 || height == 0 {
        return Err(EngineError::InvalidDimensions);
    }
    width
        .checked_mul(height)
        .ok_or(EngineError::InvalidDimensions)
}

impl HeightField {
    /// Creates a zero-filled field of the given dimensions.
    ///
    /// The backing buffer allocation is checked: failure is surfaced as
    /// `EngineError::Allocation` rather than aborting the process.
    pub fn new(width: usize, height: usize) -> Result<Self, EngineError> {
        let len = checked_len(width, height)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| EngineError::Allocation { cells: len })?;
        data.resize(len, 0.0);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Creates a field from a pre-built row-major data vector.
    ///
    /// Rejects length mismatches and non-finite samples; heights must stay
    /// finite for the lifetime of the field.
    pub fn from_data(width: usize, height: usize, data: Vec<f64>) -> Result<Self, EngineError> {
        let len = checked_len(width, height)?;
        if data.len() != len {
            return Err(EngineError::DimensionMismatch {
                expected: len,
                got: data.len(),
            });
        }
        if let Some(index) = data.iter().position(|v| !v.is_finite()) {
            return Err(EngineError::NonFiniteHeight { index });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Field width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Field height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of lattice sites.
    pub fn site_count(&self) -> usize {
        self.data.len()
    }

    /// Read-only access to the underlying row-major data.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable access to the underlying row-major data.
    ///
    /// Engine hot paths that manage their own invariants use this; callers
    /// are responsible for keeping the samples finite.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Converts signed coordinates to a flat index with periodic wrapping.
    fn index(&self, x: isize, y: isize) -> usize {
        let xi = x.rem_euclid(self.width as isize) as usize;
        let yi = y.rem_euclid(self.height as isize) as usize;
        yi * self.width + xi
    }

    /// Gets the value at `(x, y)` with periodic wrapping.
    pub fn get(&self, x: isize, y: isize) -> f64 {
        self.data[self.index(x, y)]
    }

    /// Sets the value at `(x, y)` with periodic wrapping.
    pub fn set(&mut self, x: isize, y: isize, value: f64) {
        debug_assert!(value.is_finite(), "height must be finite, got {value}");
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Flat indices of the four cardinal neighbours of site `k`, in
    /// up/left/right/down order, with periodic wrapping.
    ///
    /// Branch form rather than modular arithmetic; this is the migration
    /// hot path and `k` is already a valid flat index.
    pub fn neighbour_indices(&self, k: usize) -> [usize; 4] {
        let w = self.width;
        let n = self.data.len();
        let col = k % w;
        let up = if k >= w { k - w } else { k + n - w };
        let left = if col > 0 { k - 1 } else { k + w - 1 };
        let right = if col + 1 < w { k + 1 } else { k + 1 - w };
        let down = if k + w < n { k + w } else { k + w - n };
        [up, left, right, down]
    }

    /// Heights of the four cardinal neighbours of `(col, row)`, in
    /// up/left/right/down order, with periodic wrapping.
    pub fn neighbours(&self, col: usize, row: usize) -> [f64; 4] {
        let k = row * self.width + col;
        let [up, left, right, down] = self.neighbour_indices(k);
        [
            self.data[up],
            self.data[left],
            self.data[right],
            self.data[down],
        ]
    }

    /// Mean height over all sites.
    pub fn mean(&self) -> f64 {
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Root-mean-square deviation from the mean height.
    pub fn rms(&self) -> f64 {
        let mean = self.mean();
        let var = self
            .data
            .iter()
            .map(|v| {
                let d = v - mean;
                d * d
            })
            .sum::<f64>()
            / self.data.len() as f64;
        var.sqrt()
    }

    /// In-place scaling of all heights by `factor`.
    pub fn scale_assign(&mut self, factor: f64) {
        self.data.iter_mut().for_each(|v| *v *= factor);
    }

    /// Iterates over all cells yielding `(col, row, value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.data.iter().enumerate().map(|(i, &v)| {
            let x = i % self.width;
            let y = i / self.width;
            (x, y, v)
        })
    }
}
