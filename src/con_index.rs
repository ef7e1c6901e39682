//! Start/count tables and connection-count statistics.
//!
//! Every per-unit view into a flat connection array is a [`StartN`]: the
//! offset of the unit's first entry and how many entries follow. Tables of
//! these are built by a prefix sum over per-unit counts.

use serde::{Deserialize, Serialize};

/// Offset and length of one unit's run within a flat connection array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct StartN {
    /// Starting offset
    pub start: u32,
    /// Number of items
    pub n: u32,
}

impl StartN {
    pub fn new(start: u32, n: u32) -> Self {
        Self { start, n }
    }

    /// One past the last offset.
    #[inline]
    pub fn end(&self) -> u32 {
        self.start + self.n
    }

    /// Offsets covered by this entry.
    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end() as usize
    }
}

/// Running average and maximum of a set of values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AvgMax {
    /// Average, valid after `calc_avg`
    pub avg: f32,
    /// Maximum value seen
    pub max: f32,
    /// Index of the maximum value
    pub max_index: i32,
    /// Running sum
    pub sum: f32,
    /// Number of values seen
    pub n: u32,
}

impl AvgMax {
    /// Reset for a new pass.
    pub fn init(&mut self) {
        self.avg = 0.0;
        self.sum = 0.0;
        self.n = 0;
        self.max = f32::MIN;
        self.max_index = -1;
    }

    /// Fold in one value observed at `index`.
    pub fn update_value(&mut self, val: f32, index: i32) {
        self.sum += val;
        self.n += 1;
        if val > self.max {
            self.max = val;
            self.max_index = index;
        }
    }

    /// Compute the average from the running sum.
    pub fn calc_avg(&mut self) {
        if self.n > 0 {
            self.avg = self.sum / self.n as f32;
        } else {
            self.avg = self.sum;
            self.max = 0.0;
        }
    }
}

/// Fill `con` from per-unit counts by prefix sum and record count stats.
///
/// Returns the total number of connections in this direction.
pub fn set_con_start_n(con: &mut Vec<StartN>, avg_max: &mut AvgMax, counts: &[u32]) -> u32 {
    con.clear();
    con.reserve(counts.len());
    avg_max.init();
    let mut idx = 0u32;
    for (i, &n) in counts.iter().enumerate() {
        con.push(StartN::new(idx, n));
        idx = idx.saturating_add(n);
        avg_max.update_value(n as f32, i as i32);
    }
    avg_max.calc_avg();
    idx
}
