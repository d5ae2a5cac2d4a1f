//! Two-point boundary value problems for systems of first order ODEs
//!
//! `y' = f(x, y)` on `[a, b]` with `p` conditions on `y(a)` and `n - p` on
//! `y(b)`. The solution is a C¹ cubic spline found by 4th order Lobatto IIIA
//! (Hermite-Simpson) collocation. The collocation equations are solved with
//! Newton's method on the banded global Jacobian, then the mesh is refined
//! wherever the spline's residual `S' - f(x, S)` is too large.

mod banded;

use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use smallvec::{smallvec, SmallVec};

use self::banded::BandedMatrix;
use crate::{error::RtmError, grid::partition_point};

/// Per-node state vector.
pub type State = SmallVec<[f64; 4]>;

/// Row-major `n × n` (or `p × n`) Jacobian block.
type Block = SmallVec<[f64; 16]>;

/// Newton iterations stop when every update is below this, relative to
/// `1 + |y|`.
const NEWTON_TOLERANCE: f64 = 1e-9;

/// Relative residual above which an interval is split in three instead of two.
const TRISECT_FACTOR: f64 = 100.;

/// Lobatto quadrature of the squared residual over one interval, as
/// `(fraction of the interval, weight)`.
fn residual_quadrature() -> [(f64, f64); 3] {
    let offset = 0.5 * f64::sqrt(3. / 7.);
    [
        (0.5 - offset, 49. / 90.),
        (0.5, 32. / 45.),
        (0.5 + offset, 49. / 90.),
    ]
}

/// A system of ODEs with separated boundary conditions.
///
/// Jacobians are row-major: entry `(i, j)` is the derivative of output `i`
/// with respect to `y[j]` and lives at `jac[i * dim + j]`. The defaults use
/// forward differences; implement them analytically when it's cheap.
pub trait BoundaryValueProblem {
    /// Number of unknowns `n`.
    fn dim(&self) -> usize;

    /// Number of conditions `p` imposed at the left end. The remaining
    /// `n - p` are imposed at the right end.
    fn num_left_conditions(&self) -> usize;

    /// Evaluate `f(x, y)` into `dydx`.
    fn rhs(&self, x: f64, y: &[f64], dydx: &mut [f64]);

    /// Jacobian of `f` with respect to `y`, `n × n`.
    fn jacobian(&self, x: f64, y: &[f64], jac: &mut [f64]) {
        forward_difference(y, self.dim(), jac, |y, out| self.rhs(x, y, out));
    }

    /// The `p` residuals of the left boundary conditions.
    fn left_residual(&self, ya: &[f64], residual: &mut [f64]);

    /// The `n - p` residuals of the right boundary conditions.
    fn right_residual(&self, yb: &[f64], residual: &mut [f64]);

    /// Jacobian of the left residuals, `p × n`.
    fn left_jacobian(&self, ya: &[f64], jac: &mut [f64]) {
        let p = self.num_left_conditions();
        forward_difference(ya, p, jac, |y, out| self.left_residual(y, out));
    }

    /// Jacobian of the right residuals, `(n - p) × n`.
    fn right_jacobian(&self, yb: &[f64], jac: &mut [f64]) {
        let q = self.dim() - self.num_left_conditions();
        forward_difference(yb, q, jac, |y, out| self.right_residual(y, out));
    }
}

/// Forward difference Jacobian of `eval` at `y`.
fn forward_difference(
    y: &[f64],
    num_outputs: usize,
    jac: &mut [f64],
    mut eval: impl FnMut(&[f64], &mut [f64]),
) {
    let n = y.len();
    let mut base: State = smallvec![0.; num_outputs];
    let mut shifted: State = smallvec![0.; num_outputs];
    let mut perturbed: State = y.iter().copied().collect();
    eval(y, &mut base);

    for j in 0..n {
        perturbed[j] = y[j] + f64::EPSILON.sqrt() * y[j].abs().max(1.);
        // the step actually taken after rounding
        let step = perturbed[j] - y[j];
        eval(&perturbed, &mut shifted);
        for i in 0..num_outputs {
            jac[i * n + j] = (shifted[i] - base[i]) / step;
        }
        perturbed[j] = y[j];
    }
}

/// Solver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvpOptions {
    /// Allowed RMS of the relative collocation residual on every interval
    pub tolerance: f64,
    /// Give up once refinement would need more nodes than this
    pub max_nodes: usize,
    /// Newton iterations per mesh before giving up
    pub max_newton_iterations: usize,
}

impl Default for BvpOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            max_nodes: 1000,
            max_newton_iterations: 8,
        }
    }
}

/// How a solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvpStatus {
    /// Every interval meets the tolerance
    Converged,
    /// Refinement ran into the node limit
    MaxNodesExceeded,
    /// The collocation system couldn't be solved
    SingularJacobian,
    /// Newton's method didn't settle
    NewtonFailed,
}

impl BvpStatus {
    /// Human readable description.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Converged => "The algorithm converged to the desired accuracy.",
            Self::MaxNodesExceeded => "The maximum number of mesh nodes is exceeded.",
            Self::SingularJacobian => {
                "A singular Jacobian encountered when solving the collocation system."
            }
            Self::NewtonFailed => "Newton iterations failed to converge.",
        }
    }
}

/// Result of [`solve_bvp`].
///
/// Also returned when the solver failed, holding the last iterate, so the
/// caller can decide what to do with it.
#[derive(Debug, Clone)]
pub struct BvpSolution {
    /// Final mesh
    pub x: Array1<f64>,
    /// Solution at the mesh nodes, `(nodes, dim)`
    pub y: Array2<f64>,
    /// `f(x, y)` at the mesh nodes, `(nodes, dim)`
    pub yp: Array2<f64>,
    /// RMS relative residual on each interval of the final mesh
    pub rms_residuals: Array1<f64>,
    /// Outcome
    pub status: BvpStatus,
    /// Number of meshes tried
    pub iterations: usize,
}

impl BvpSolution {
    /// Did the solver reach the tolerance?
    pub fn success(&self) -> bool {
        self.status == BvpStatus::Converged
    }

    /// Diagnostic message.
    pub fn message(&self) -> &'static str {
        self.status.message()
    }

    /// Evaluate the cubic spline solution at `x`.
    ///
    /// Points outside the mesh use the nearest end interval's polynomial.
    pub fn sol(&self, x: f64) -> State {
        let m = self.x.len();
        let i = partition_point(self.x.view(), x).clamp(1, m - 1) - 1;
        let h = self.x[i + 1] - self.x[i];
        let t = (x - self.x[i]) / h;
        hermite(
            h,
            t,
            self.y.row(i),
            self.y.row(i + 1),
            self.yp.row(i),
            self.yp.row(i + 1),
        )
        .0
    }
}

/// Cubic Hermite value and slope at fraction `t` of an interval of width `h`.
fn hermite(
    h: f64,
    t: f64,
    y0: ArrayView1<'_, f64>,
    y1: ArrayView1<'_, f64>,
    f0: ArrayView1<'_, f64>,
    f1: ArrayView1<'_, f64>,
) -> (State, State) {
    let (t2, t3) = (t * t, t * t * t);
    let (h00, h10, h01, h11) = (2. * t3 - 3. * t2 + 1., t3 - 2. * t2 + t, 3. * t2 - 2. * t3, t3 - t2);
    let (d00, d10, d11) = (6. * t2 - 6. * t, 3. * t2 - 4. * t + 1., 3. * t2 - 2. * t);

    let value = (0..y0.len())
        .map(|c| h00 * y0[c] + h10 * h * f0[c] + h01 * y1[c] + h11 * h * f1[c])
        .collect();
    let slope = (0..y0.len())
        .map(|c| d00 * (y0[c] - y1[c]) / h + d10 * f0[c] + d11 * f1[c])
        .collect();
    (value, slope)
}

/// Solve `problem` starting from `guess` (`(nodes, dim)`) on the initial
/// `mesh`.
///
/// Running out of nodes or Newton failures are reported through
/// [`BvpSolution::status`]; malformed inputs are an error.
pub fn solve_bvp<P>(
    problem: &P,
    mesh: ArrayView1<'_, f64>,
    guess: ArrayView2<'_, f64>,
    options: &BvpOptions,
) -> Result<BvpSolution, RtmError>
where
    P: BoundaryValueProblem + ?Sized,
{
    let n = problem.dim();
    if n == 0 || problem.num_left_conditions() > n || guess.dim() != (mesh.len(), n) {
        return Err(RtmError::InconsistentInputs);
    }
    if mesh.len() < 2 || mesh.windows(2).into_iter().any(|w| w[1] <= w[0]) {
        return Err(RtmError::InvalidGrid);
    }

    let mut x = mesh.to_vec();
    let mut y = guess.to_owned();
    let mut iterations = 0;

    loop {
        iterations += 1;
        let newton = newton_solve(problem, &x, &mut y, options.max_newton_iterations);
        let yp = node_derivatives(problem, &x, y.view());

        let finish = |x: Vec<f64>, y, yp, rms_residuals, status| BvpSolution {
            x: Array1::from(x),
            y,
            yp,
            rms_residuals,
            status,
            iterations,
        };

        if let Err(status) = newton {
            debug!("BVP failed on a mesh of {} nodes: {}", x.len(), status.message());
            let rms = Array1::from_elem(x.len() - 1, f64::INFINITY);
            return Ok(finish(x, y, yp, rms, status));
        }

        let rms = rms_residuals(problem, &x, y.view(), yp.view());
        let worst = rms.fold(0., |acc: f64, &r| acc.max(r));
        if worst <= options.tolerance {
            debug!(
                "BVP converged on {} nodes after {} meshes, max residual {:.2e}",
                x.len(),
                iterations,
                worst
            );
            return Ok(finish(x, y, yp, rms, BvpStatus::Converged));
        }

        let refined = refine_mesh(&x, rms.view(), options.tolerance);
        if refined.len() > options.max_nodes {
            debug!(
                "BVP needs {} nodes, more than the limit of {}",
                refined.len(),
                options.max_nodes
            );
            return Ok(finish(x, y, yp, rms, BvpStatus::MaxNodesExceeded));
        }

        let mut next = Array2::zeros((refined.len(), n));
        let current = BvpSolution {
            x: Array1::from(x),
            y,
            yp,
            rms_residuals: rms,
            status: BvpStatus::Converged,
            iterations,
        };
        for (mut row, &xi) in next.rows_mut().into_iter().zip(&refined) {
            for (dst, src) in row.iter_mut().zip(current.sol(xi)) {
                *dst = src;
            }
        }
        x = refined;
        y = next;
    }
}

/// `f(x, y)` at every node.
fn node_derivatives<P>(problem: &P, x: &[f64], y: ArrayView2<'_, f64>) -> Array2<f64>
where
    P: BoundaryValueProblem + ?Sized,
{
    let n = problem.dim();
    let mut yp = Array2::zeros(y.dim());
    let mut f: State = smallvec![0.; n];
    for (i, &xi) in x.iter().enumerate() {
        let yi: State = y.row(i).iter().copied().collect();
        problem.rhs(xi, &yi, &mut f);
        for (dst, src) in yp.row_mut(i).iter_mut().zip(&f) {
            *dst = *src;
        }
    }
    yp
}

/// Newton's method on the collocation equations, updating `y` in place.
fn newton_solve<P>(
    problem: &P,
    x: &[f64],
    y: &mut Array2<f64>,
    max_iterations: usize,
) -> Result<(), BvpStatus>
where
    P: BoundaryValueProblem + ?Sized,
{
    for _ in 0..max_iterations {
        let (mut step, matrix) = collocation_system(problem, x, y.view());
        for v in step.iter_mut() {
            *v = -*v;
        }
        matrix
            .solve(&mut step)
            .map_err(|_| BvpStatus::SingularJacobian)?;

        let mut converged = true;
        // `y` iterates in logical row-major order, which is the unknown order
        for (value, delta) in y.iter_mut().zip(&step) {
            if !delta.is_finite() {
                return Err(BvpStatus::NewtonFailed);
            }
            converged &= delta.abs() <= NEWTON_TOLERANCE * (1. + value.abs());
            *value += delta;
        }
        if converged {
            return Ok(());
        }
    }
    Err(BvpStatus::NewtonFailed)
}

/// Residuals of the collocation equations and their Jacobian.
///
/// Unknowns are ordered node by node. Equations are the left boundary
/// conditions, then `n` per interval, then the right boundary conditions,
/// which keeps the Jacobian banded.
fn collocation_system<P>(problem: &P, x: &[f64], y: ArrayView2<'_, f64>) -> (Vec<f64>, BandedMatrix)
where
    P: BoundaryValueProblem + ?Sized,
{
    let n = problem.dim();
    let p = problem.num_left_conditions();
    let m = x.len();
    let size = m * n;
    let kl = p + n - 1;
    let ku = (2 * n - 1 - p).max(n - 1);

    let mut residual = vec![0.; size];
    let mut matrix = BandedMatrix::zeros(size, kl, ku);

    let ys: Vec<State> = y.rows().into_iter().map(|r| r.iter().copied().collect()).collect();
    let mut fs: Vec<State> = Vec::with_capacity(m);
    let mut js: Vec<Block> = Vec::with_capacity(m);
    for (xi, yi) in x.iter().zip(&ys) {
        let mut f: State = smallvec![0.; n];
        let mut jac: Block = smallvec![0.; n * n];
        problem.rhs(*xi, yi, &mut f);
        problem.jacobian(*xi, yi, &mut jac);
        fs.push(f);
        js.push(jac);
    }

    // left boundary
    let mut bc: State = smallvec![0.; p];
    let mut bc_jac: Block = smallvec![0.; p * n];
    problem.left_residual(&ys[0], &mut bc);
    problem.left_jacobian(&ys[0], &mut bc_jac);
    for a in 0..p {
        residual[a] = bc[a];
        for c in 0..n {
            matrix.add(a, c, bc_jac[a * n + c]);
        }
    }

    // collocation conditions
    let mut y_mid: State = smallvec![0.; n];
    let mut f_mid: State = smallvec![0.; n];
    let mut j_mid: Block = smallvec![0.; n * n];
    for i in 0..m - 1 {
        let h = x[i + 1] - x[i];
        let (y0, y1, f0, f1) = (&ys[i], &ys[i + 1], &fs[i], &fs[i + 1]);
        let (j0, j1) = (&js[i], &js[i + 1]);
        for a in 0..n {
            y_mid[a] = 0.5 * (y0[a] + y1[a]) - h / 8. * (f1[a] - f0[a]);
        }
        let x_mid = x[i] + 0.5 * h;
        problem.rhs(x_mid, &y_mid, &mut f_mid);
        problem.jacobian(x_mid, &y_mid, &mut j_mid);

        for a in 0..n {
            let row = p + i * n + a;
            residual[row] = y1[a] - y0[a] - h / 6. * (f0[a] + 4. * f_mid[a] + f1[a]);

            for c in 0..n {
                let identity = if a == c { 1. } else { 0. };
                // chain rule through y_mid
                let (mut via_left, mut via_right) = (0., 0.);
                for e in 0..n {
                    let half = if e == c { 0.5 } else { 0. };
                    via_left += j_mid[a * n + e] * (half + h / 8. * j0[e * n + c]);
                    via_right += j_mid[a * n + e] * (half - h / 8. * j1[e * n + c]);
                }
                matrix.add(
                    row,
                    i * n + c,
                    -identity - h / 6. * (j0[a * n + c] + 4. * via_left),
                );
                matrix.add(
                    row,
                    (i + 1) * n + c,
                    identity - h / 6. * (j1[a * n + c] + 4. * via_right),
                );
            }
        }
    }

    // right boundary
    let q = n - p;
    let mut bc: State = smallvec![0.; q];
    let mut bc_jac: Block = smallvec![0.; q * n];
    problem.right_residual(&ys[m - 1], &mut bc);
    problem.right_jacobian(&ys[m - 1], &mut bc_jac);
    for a in 0..q {
        let row = size - q + a;
        residual[row] = bc[a];
        for c in 0..n {
            matrix.add(row, (m - 1) * n + c, bc_jac[a * n + c]);
        }
    }

    (residual, matrix)
}

/// RMS over each interval of the spline residual, relative to `1 + |f|`.
fn rms_residuals<P>(
    problem: &P,
    x: &[f64],
    y: ArrayView2<'_, f64>,
    yp: ArrayView2<'_, f64>,
) -> Array1<f64>
where
    P: BoundaryValueProblem + ?Sized,
{
    let n = problem.dim();
    let mut f: State = smallvec![0.; n];
    let quadrature = residual_quadrature();

    (0..x.len() - 1)
        .map(|i| {
            let h = x[i + 1] - x[i];
            let mut total = 0.;
            for (t, weight) in quadrature {
                let (value, slope) = hermite(h, t, y.row(i), y.row(i + 1), yp.row(i), yp.row(i + 1));
                problem.rhs(x[i] + t * h, &value, &mut f);
                total += weight
                    * slope
                        .iter()
                        .zip(&f)
                        .map(|(s, f)| ((s - f) / (1. + f.abs())).powi(2))
                        .sum::<f64>();
            }
            f64::sqrt(0.5 * total)
        })
        .collect()
}

/// Split every interval whose residual exceeds `tolerance`: in half when it's
/// close, in thirds when it's far off.
fn refine_mesh(x: &[f64], rms: ArrayView1<'_, f64>, tolerance: f64) -> Vec<f64> {
    let mut refined = Vec::with_capacity(2 * x.len());
    for (i, &r) in rms.iter().enumerate() {
        let (a, b) = (x[i], x[i + 1]);
        refined.push(a);
        if r > tolerance {
            let h = b - a;
            if r < TRISECT_FACTOR * tolerance {
                refined.push(a + 0.5 * h);
            } else {
                refined.push(a + h / 3.);
                refined.push(a + 2. * h / 3.);
            }
        }
    }
    refined.push(x[x.len() - 1]);
    refined
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::Array;

    /// `u'' = -u` on `[0, π/2]` with `u(0) = 0`, `u(π/2) = 1`, solved by `sin`.
    struct Oscillator;

    impl BoundaryValueProblem for Oscillator {
        fn dim(&self) -> usize {
            2
        }

        fn num_left_conditions(&self) -> usize {
            1
        }

        fn rhs(&self, _x: f64, y: &[f64], dydx: &mut [f64]) {
            dydx[0] = y[1];
            dydx[1] = -y[0];
        }

        fn left_residual(&self, ya: &[f64], residual: &mut [f64]) {
            residual[0] = ya[0];
        }

        fn right_residual(&self, yb: &[f64], residual: &mut [f64]) {
            residual[0] = yb[0] - 1.;
        }
    }

    /// Bratu's problem `u'' + e^u = 0`, `u(0) = u(1) = 0`: non-linear with
    /// two solutions, the lower one has `u'(0) ≈ 0.5494`.
    struct Bratu;

    impl BoundaryValueProblem for Bratu {
        fn dim(&self) -> usize {
            2
        }

        fn num_left_conditions(&self) -> usize {
            1
        }

        fn rhs(&self, _x: f64, y: &[f64], dydx: &mut [f64]) {
            dydx[0] = y[1];
            dydx[1] = -y[0].exp();
        }

        fn left_residual(&self, ya: &[f64], residual: &mut [f64]) {
            residual[0] = ya[0];
        }

        fn right_residual(&self, yb: &[f64], residual: &mut [f64]) {
            residual[0] = yb[0];
        }
    }

    #[test]
    fn linear_oscillator() {
        let mesh = Array::linspace(0., std::f64::consts::FRAC_PI_2, 5);
        let guess = Array2::zeros((5, 2));
        let options = BvpOptions {
            tolerance: 1e-8,
            ..Default::default()
        };
        let solution = solve_bvp(&Oscillator, mesh.view(), guess.view(), &options).unwrap();
        assert!(solution.success(), "{}", solution.message());

        for x in [0.1, 0.7, 1.3] {
            let y = solution.sol(x);
            assert_abs_diff_eq!(y[0], f64::sin(x), epsilon = 1e-7);
            assert_abs_diff_eq!(y[1], f64::cos(x), epsilon = 1e-7);
        }
    }

    #[test]
    fn nonlinear_bratu() {
        let mesh = Array::linspace(0., 1., 5);
        let guess = Array2::zeros((5, 2));
        let solution = solve_bvp(&Bratu, mesh.view(), guess.view(), &BvpOptions::default()).unwrap();
        assert!(solution.success(), "{}", solution.message());
        assert_relative_eq!(solution.y[[0, 1]], 0.5494, max_relative = 1e-3);
        // symmetric about the midpoint
        assert_abs_diff_eq!(solution.sol(0.25)[0], solution.sol(0.75)[0], epsilon = 1e-4);
    }

    #[test]
    fn node_limit_is_reported() {
        let mesh = Array::linspace(0., std::f64::consts::FRAC_PI_2, 3);
        let guess = Array2::zeros((3, 2));
        let options = BvpOptions {
            tolerance: 1e-14,
            max_nodes: 10,
            ..Default::default()
        };
        let solution = solve_bvp(&Oscillator, mesh.view(), guess.view(), &options).unwrap();
        assert!(!solution.success());
        assert_eq!(solution.status, BvpStatus::MaxNodesExceeded);
        assert_eq!(solution.message(), "The maximum number of mesh nodes is exceeded.");
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        let mesh = Array::linspace(0., 1., 4);
        let guess = Array2::zeros((5, 2));
        assert_eq!(
            solve_bvp(&Oscillator, mesh.view(), guess.view(), &BvpOptions::default()).unwrap_err(),
            RtmError::InconsistentInputs
        );

        let mesh = ndarray::array![0., 1., 1.];
        let guess = Array2::zeros((3, 2));
        assert_eq!(
            solve_bvp(&Oscillator, mesh.view(), guess.view(), &BvpOptions::default()).unwrap_err(),
            RtmError::InvalidGrid
        );
    }

    #[test]
    fn refinement_splits_bad_intervals() {
        let x = [0., 1., 2., 3.];
        let rms = ndarray::array![1e-4, 5e-3, 1.];
        let refined = refine_mesh(&x, rms.view(), 1e-3);
        let expected = [0., 1., 1.5, 2., 2. + 1. / 3., 2. + 2. / 3., 3.];
        assert_eq!(refined.len(), expected.len());
        for (a, b) in refined.iter().zip(expected) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-15);
        }
    }

    #[test]
    fn forward_difference_matches_analytic() {
        let y = [0.3, -1.2];
        let mut jac = [0.; 4];
        Bratu.jacobian(0., &y, &mut jac);
        assert_abs_diff_eq!(jac[0], 0., epsilon = 1e-7);
        assert_abs_diff_eq!(jac[1], 1., epsilon = 1e-7);
        assert_relative_eq!(jac[2], -f64::exp(0.3), max_relative = 1e-6);
        assert_abs_diff_eq!(jac[3], 0., epsilon = 1e-7);
    }
}
