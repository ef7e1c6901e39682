//! Layer shapes.
//!
//! A layer is either a plain 2-D grid of units `[y, x]` or a 4-D grid of
//! pools `[pool_y, pool_x, unit_y, unit_x]`, where every outer cell holds an
//! identical inner grid of units. Units are laid out row-major with the
//! outer-most dimension first, so each pool of a 4-D layer occupies one
//! contiguous run of flat indexes.

use serde::{Deserialize, Serialize};

/// Row-major 2-D or 4-D unit grid.
///
/// # Examples
///
/// ```
/// use corticore::Shape;
///
/// let sh = Shape::new(&[2, 3, 4, 5]);
/// assert_eq!(sh.len(), 120);
/// assert_eq!(sh.n_sub_pools(), 6);
/// assert_eq!(sh.offset(&[1, 0, 0, 0]), 60);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a shape from its dimension sizes, outer-most first.
    ///
    /// Rank is not checked here; [`Shape::is_valid_rank`] is consulted when
    /// the owning network is built so the problem is reported with all others.
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: dims.to_vec(),
        }
    }

    /// 2-D shape of `y` rows by `x` columns.
    pub fn new_2d(y: usize, x: usize) -> Self {
        Self { dims: vec![y, x] }
    }

    /// 4-D shape of `pools_y * pools_x` pools of `units_y * units_x` units.
    pub fn new_4d(pools_y: usize, pools_x: usize, units_y: usize, units_x: usize) -> Self {
        Self {
            dims: vec![pools_y, pools_x, units_y, units_x],
        }
    }

    /// Dimension sizes, outer-most first.
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Size of dimension `d`.
    #[inline]
    pub fn dim(&self, d: usize) -> usize {
        self.dims[d]
    }

    #[inline]
    pub fn is_2d(&self) -> bool {
        self.dims.len() == 2
    }

    #[inline]
    pub fn is_4d(&self) -> bool {
        self.dims.len() == 4
    }

    /// True for the two ranks a layer may have.
    #[inline]
    pub fn is_valid_rank(&self) -> bool {
        self.is_2d() || self.is_4d()
    }

    /// Total number of units.
    #[inline]
    pub fn len(&self) -> usize {
        if self.dims.is_empty() {
            return 0;
        }
        self.dims.iter().product()
    }

    /// True if the shape holds no units.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of sub-pools: `pools_y * pools_x` for 4-D, zero otherwise.
    pub fn n_sub_pools(&self) -> usize {
        if !self.is_4d() {
            return 0;
        }
        self.dims[0] * self.dims[1]
    }

    /// Units per pool: the inner grid size for 4-D, the whole layer otherwise.
    pub fn pool_len(&self) -> usize {
        if self.is_4d() {
            self.dims[2] * self.dims[3]
        } else {
            self.len()
        }
    }

    /// Row-major flat offset of a full index.
    ///
    /// `index` must have one entry per dimension, each within bounds.
    pub fn offset(&self, index: &[usize]) -> usize {
        debug_assert_eq!(index.len(), self.dims.len());
        let mut off = 0;
        for (&i, &d) in index.iter().zip(self.dims.iter()) {
            debug_assert!(i < d, "index {} out of range for dim size {}", i, d);
            off = off * d + i;
        }
        off
    }

    /// Pool number that flat unit index `ui` belongs to (0 for 2-D shapes).
    pub fn pool_of(&self, ui: usize) -> usize {
        if self.is_4d() {
            ui / self.pool_len()
        } else {
            0
        }
    }
}
