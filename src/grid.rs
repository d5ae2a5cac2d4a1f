//! Vertical grids and the small amount of 1-D numerics shared by the solvers.

use ndarray::{Array1, ArrayView1};

use crate::error::RtmError;

/// A strictly increasing column of elevations in m.
///
/// Elevation is negative downward and zero at the surface, so the first point
/// is the bottom of the domain and the last point is the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct VerticalGrid {
    z: Array1<f64>,
}

impl VerticalGrid {
    /// Validate and wrap the elevations.
    pub fn new(z: impl Into<Array1<f64>>) -> Result<Self, RtmError> {
        let z = z.into();
        let increasing = z.windows(2).into_iter().all(|w| w[1] > w[0]);
        if z.len() < 2 || !increasing || z.iter().any(|v| !v.is_finite()) {
            return Err(RtmError::InvalidGrid);
        }
        Ok(Self { z })
    }

    /// Evenly spaced grid from `bottom` to `top` (inclusive) with `num_points`
    /// points.
    pub fn linspace(bottom: f64, top: f64, num_points: usize) -> Result<Self, RtmError> {
        if num_points < 2 {
            return Err(RtmError::InvalidGrid);
        }
        Self::new(Array1::linspace(bottom, top, num_points))
    }

    /// The elevations.
    pub fn z(&self) -> ArrayView1<'_, f64> {
        self.z.view()
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.z.len()
    }

    /// Always false; a valid grid has at least two points.
    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    /// Elevation of the bottom of the domain.
    pub fn bottom(&self) -> f64 {
        self.z[0]
    }

    /// Elevation of the surface.
    pub fn top(&self) -> f64 {
        self.z[self.z.len() - 1]
    }

    /// Index of the surface point.
    pub fn surface_index(&self) -> usize {
        self.z.len() - 1
    }
}

/// Piecewise linear interpolation of `(xs, ys)` at `x`.
///
/// `xs` must be increasing. Outside the table the end values are held, which
/// never happens for solver evaluation points since they stay inside the grid.
pub(crate) fn interp(x: f64, xs: ArrayView1<'_, f64>, ys: ArrayView1<'_, f64>) -> f64 {
    let n = xs.len();
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    let upper = partition_point(xs, x);
    let lower = upper - 1;
    let t = (x - xs[lower]) / (xs[upper] - xs[lower]);
    ys[lower] + t * (ys[upper] - ys[lower])
}

/// Index of the first element of `xs` strictly greater than `x`.
pub(crate) fn partition_point(xs: ArrayView1<'_, f64>, x: f64) -> usize {
    let (mut lo, mut hi) = (0, xs.len());
    while lo < hi {
        let mid = (lo + hi) / 2;
        if xs[mid] <= x {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Trapezoidal rule over `xs`.
pub(crate) fn trapezoid(ys: impl IntoIterator<Item = f64>, xs: ArrayView1<'_, f64>) -> f64 {
    let ys: Vec<f64> = ys.into_iter().collect();
    xs.windows(2)
        .into_iter()
        .zip(ys.windows(2))
        .map(|(x, y)| 0.5 * (x[1] - x[0]) * (y[0] + y[1]))
        .sum()
}
