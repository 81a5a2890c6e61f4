//! Branch-form MNA assembly and dense LU solving.
//!
//! A connected network with `n` nodes and `m` branches is described by its
//! incidence matrix `A` (m x n), a diagonal branch admittance `C` (m x m), a
//! branch voltage-source vector `b` and a branch current-source vector `i0`.
//! Node voltages solve
//!
//! ```text
//! (A^T C A) u = A^T (C b) + A^T i0
//! ```
//!
//! with the ground node (local node 0) removed. Branch quantities follow as
//! `v = A u` and `i = C (b - v) + i0`.

use crate::components::BranchStamp;
use crate::error::{CirsimError, Result};

use super::scalar::Scalar;

/// Square dense matrix, row-major.
#[derive(Debug, Clone)]
pub struct DenseMatrix<T> {
    data: Vec<T>,
    size: usize,
}

impl<T: Scalar> DenseMatrix<T> {
    /// Create a zero matrix of the given dimension.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![T::zero(); size * size],
            size,
        }
    }

    /// Matrix dimension.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.size + col]
    }

    /// Set matrix element at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.size + col] = value;
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.size + col] += value;
    }

    /// Copy of the matrix with the first row and column removed.
    pub fn without_first(&self) -> Self {
        let n = self.size.saturating_sub(1);
        let mut reduced = Self::new(n);
        for i in 0..n {
            for j in 0..n {
                reduced.set(i, j, self.get(i + 1, j + 1));
            }
        }
        reduced
    }

    /// Solve `self * x = rhs` by LU decomposition with partial pivoting.
    pub fn lu_solve(&self, rhs: &[T], pivot_tolerance: f64) -> Result<Vec<T>> {
        let n = self.size;
        if rhs.len() != n {
            return Err(CirsimError::dimension_mismatch("lu_solve rhs", n, rhs.len()));
        }

        let mut lu = self.data.clone();
        let mut pivots: Vec<usize> = (0..n).collect();

        for k in 0..n {
            // Find pivot
            let mut max_val = lu[k * n + k].modulus();
            let mut max_row = k;
            for i in (k + 1)..n {
                let val = lu[i * n + k].modulus();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val < pivot_tolerance {
                return Err(CirsimError::SingularMatrix);
            }

            if max_row != k {
                pivots.swap(k, max_row);
                for j in 0..n {
                    lu.swap(k * n + j, max_row * n + j);
                }
            }

            // Eliminate
            let pivot = lu[k * n + k];
            for i in (k + 1)..n {
                let factor = lu[i * n + k] / pivot;
                lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    let upper = lu[k * n + j];
                    lu[i * n + j] -= factor * upper;
                }
            }
        }

        // Forward substitution (L * y = Pb)
        let mut x: Vec<T> = pivots.iter().map(|&p| rhs[p]).collect();
        for i in 0..n {
            for j in 0..i {
                let xj = x[j];
                x[i] -= lu[i * n + j] * xj;
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                let xj = x[j];
                x[i] -= lu[i * n + j] * xj;
            }
            x[i] = x[i] / lu[i * n + i];
        }

        Ok(x)
    }
}

/// Incidence matrix stored as the (left, right) node pair of each branch.
///
/// Row `e` has `+1` at `left` and `-1` at `right`; a branch whose ends share
/// a node has an all-zero row.
#[derive(Debug, Clone, Default)]
pub struct Incidence {
    nodes: usize,
    branches: Vec<(usize, usize)>,
}

impl Incidence {
    pub fn new(nodes: usize) -> Self {
        Self {
            nodes,
            branches: Vec::new(),
        }
    }

    /// Append a branch from `left` to `right`.
    pub fn push_branch(&mut self, left: usize, right: usize) {
        debug_assert!(left < self.nodes && right < self.nodes);
        self.branches.push((left, right));
    }

    pub fn node_count(&self) -> usize {
        self.nodes
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Dense entry `A[branch, node]`.
    pub fn get(&self, branch: usize, node: usize) -> f64 {
        let (l, r) = self.branches[branch];
        let mut value = 0.0;
        if l == node {
            value += 1.0;
        }
        if r == node {
            value -= 1.0;
        }
        value
    }

    /// Compute `A x` (branch voltage drops from node voltages).
    pub fn apply<T: Scalar>(&self, x: &[T]) -> Vec<T> {
        self.branches.iter().map(|&(l, r)| x[l] - x[r]).collect()
    }

    /// Compute `A^T y` (net branch quantity leaving each node).
    pub fn apply_transpose<T: Scalar>(&self, y: &[T]) -> Vec<T> {
        let mut out = vec![T::zero(); self.nodes];
        for (&(l, r), &value) in self.branches.iter().zip(y) {
            out[l] += value;
            out[r] -= value;
        }
        out
    }

    /// Compute the unreduced Laplacian `A^T diag(c) A`.
    pub fn laplacian<T: Scalar>(&self, c: &[T]) -> DenseMatrix<T> {
        let mut lap = DenseMatrix::new(self.nodes);
        for (&(l, r), &g) in self.branches.iter().zip(c) {
            if l == r {
                continue;
            }
            lap.add(l, l, g);
            lap.add(r, r, g);
            lap.add(l, r, -g);
            lap.add(r, l, -g);
        }
        lap
    }
}

/// Node and branch results of one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchSolution<T> {
    pub node_voltages: Vec<T>,
    pub branch_currents: Vec<T>,
    pub branch_voltages: Vec<T>,
}

impl<T: Scalar> BranchSolution<T> {
    /// All-zero result for `nodes` nodes and `branches` branches.
    pub fn zeros(nodes: usize, branches: usize) -> Self {
        Self {
            node_voltages: vec![T::zero(); nodes],
            branch_currents: vec![T::zero(); branches],
            branch_voltages: vec![T::zero(); branches],
        }
    }

    /// Check that every value is finite.
    pub fn is_finite(&self) -> bool {
        self.node_voltages
            .iter()
            .chain(&self.branch_currents)
            .chain(&self.branch_voltages)
            .all(|v| v.finite())
    }
}

/// How the reduced system is solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolvePath {
    /// Scalar division for two-node systems, LU otherwise
    Auto,
    /// Always LU
    General,
}

/// Assembled branch-form system over `f64` (DC) or `Complex64` (AC).
#[derive(Debug, Clone)]
pub struct BranchSystem<T> {
    pub incidence: Incidence,
    /// Diagonal of the branch admittance matrix
    pub admittance: Vec<T>,
    pub voltage_sources: Vec<T>,
    pub current_sources: Vec<T>,
}

impl<T: Scalar> BranchSystem<T> {
    /// Create a system with zero admittances and sources.
    pub fn new(incidence: Incidence) -> Self {
        let m = incidence.branch_count();
        Self {
            incidence,
            admittance: vec![T::zero(); m],
            voltage_sources: vec![T::zero(); m],
            current_sources: vec![T::zero(); m],
        }
    }

    /// Zero all admittances and sources, keeping the topology.
    pub fn clear(&mut self) {
        self.admittance.fill(T::zero());
        self.voltage_sources.fill(T::zero());
        self.current_sources.fill(T::zero());
    }

    /// Write one branch's contribution.
    pub fn stamp(&mut self, branch: usize, stamp: BranchStamp<T>) {
        self.admittance[branch] = stamp.admittance;
        self.voltage_sources[branch] = stamp.voltage_source;
        self.current_sources[branch] = stamp.current_source;
    }

    fn check_dimensions(&self) -> Result<()> {
        let m = self.incidence.branch_count();
        for (context, len) in [
            ("admittance", self.admittance.len()),
            ("voltage sources", self.voltage_sources.len()),
            ("current sources", self.current_sources.len()),
        ] {
            if len != m {
                return Err(CirsimError::dimension_mismatch(context, m, len));
            }
        }
        if self.incidence.node_count() < 2 {
            return Err(CirsimError::dimension_mismatch(
                "incidence nodes",
                2,
                self.incidence.node_count(),
            ));
        }
        Ok(())
    }

    /// Solve for node voltages, branch currents and branch voltages.
    pub fn solve(&self, pivot_tolerance: f64) -> Result<BranchSolution<T>> {
        self.solve_with(SolvePath::Auto, pivot_tolerance)
    }

    /// Solve, choosing how the reduced system is handled.
    pub fn solve_with(&self, path: SolvePath, pivot_tolerance: f64) -> Result<BranchSolution<T>> {
        self.check_dimensions()?;
        let n = self.incidence.node_count();

        let lap = self.incidence.laplacian(&self.admittance);
        let driven: Vec<T> = self
            .admittance
            .iter()
            .zip(&self.voltage_sources)
            .map(|(&c, &b)| c * b)
            .collect();
        let rhs: Vec<T> = self
            .incidence
            .apply_transpose(&driven)
            .into_iter()
            .zip(self.incidence.apply_transpose(&self.current_sources))
            .map(|(a, b)| a + b)
            .collect();

        let mut node_voltages = vec![T::zero(); n];
        if n == 2 && path == SolvePath::Auto {
            let pivot = lap.get(1, 1);
            if pivot.modulus() < pivot_tolerance {
                return Err(CirsimError::SingularMatrix);
            }
            node_voltages[1] = rhs[1] / pivot;
        } else {
            let reduced = lap.without_first().lu_solve(&rhs[1..], pivot_tolerance)?;
            node_voltages[1..].copy_from_slice(&reduced);
        }

        let branch_voltages = self.incidence.apply(&node_voltages);
        let branch_currents = self
            .admittance
            .iter()
            .zip(&self.voltage_sources)
            .zip(&branch_voltages)
            .zip(&self.current_sources)
            .map(|(((&c, &b), &v), &i0)| c * (b - v) + i0)
            .collect();

        Ok(BranchSolution {
            node_voltages,
            branch_currents,
            branch_voltages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use num_complex::Complex64;

    fn stamp(admittance: f64, voltage_source: f64, current_source: f64) -> BranchStamp<f64> {
        BranchStamp {
            admittance,
            voltage_source,
            current_source,
        }
    }

    #[test]
    fn test_lu_solve_simple() {
        // 2x + y = 5
        // x + 3y = 6
        let mut a = DenseMatrix::<f64>::new(2);
        a.set(0, 0, 2.0);
        a.set(0, 1, 1.0);
        a.set(1, 0, 1.0);
        a.set(1, 1, 3.0);
        let x = a.lu_solve(&[5.0, 6.0], 1e-15).unwrap();
        assert_abs_diff_eq!(x[0], 1.8, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 1.4, epsilon = 1e-12);
    }

    #[test]
    fn test_lu_solve_needs_pivoting() {
        let mut a = DenseMatrix::<f64>::new(2);
        a.set(0, 1, 1.0);
        a.set(1, 0, 1.0);
        let x = a.lu_solve(&[3.0, 4.0], 1e-15).unwrap();
        assert_abs_diff_eq!(x[0], 4.0);
        assert_abs_diff_eq!(x[1], 3.0);
    }

    #[test]
    fn test_lu_solve_singular() {
        let mut a = DenseMatrix::<f64>::new(2);
        a.set(0, 0, 1.0);
        a.set(0, 1, 2.0);
        a.set(1, 0, 2.0);
        a.set(1, 1, 4.0);
        assert!(matches!(a.lu_solve(&[1.0, 2.0], 1e-15), Err(CirsimError::SingularMatrix)));
    }

    #[test]
    fn test_lu_solve_complex() {
        // (1+j) x = 2j  ->  x = 1 + j
        let mut a = DenseMatrix::<Complex64>::new(1);
        a.set(0, 0, Complex64::new(1.0, 1.0));
        let x = a.lu_solve(&[Complex64::new(0.0, 2.0)], 1e-15).unwrap();
        assert_abs_diff_eq!(x[0].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[0].im, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_incidence_products() {
        let mut inc = Incidence::new(3);
        inc.push_branch(0, 1);
        inc.push_branch(1, 2);
        inc.push_branch(2, 2);
        assert_eq!(inc.get(0, 0), 1.0);
        assert_eq!(inc.get(0, 1), -1.0);
        assert_eq!(inc.get(2, 2), 0.0);

        assert_eq!(inc.apply(&[3.0, 1.0, 0.5]), vec![2.0, 0.5, 0.0]);
        assert_eq!(inc.apply_transpose(&[1.0, 2.0, 7.0]), vec![1.0, 1.0, -2.0]);

        let lap = inc.laplacian(&[1.0, 2.0, 100.0]);
        assert_eq!(lap.get(0, 0), 1.0);
        assert_eq!(lap.get(1, 1), 3.0);
        assert_eq!(lap.get(1, 2), -2.0);
        assert_eq!(lap.get(2, 2), 2.0);
    }

    #[test]
    fn test_two_node_shortcut_matches_general_path() {
        // Source with internal conductance 4 S driving a 2 S load
        let mut inc = Incidence::new(2);
        inc.push_branch(0, 1);
        inc.push_branch(1, 0);
        let mut sys = BranchSystem::new(inc);
        sys.stamp(0, stamp(4.0, 3.0, 0.0));
        sys.stamp(1, stamp(2.0, 0.0, 0.5));

        let fast = sys.solve_with(SolvePath::Auto, 1e-15).unwrap();
        let general = sys.solve_with(SolvePath::General, 1e-15).unwrap();
        for (a, b) in fast.node_voltages.iter().zip(&general.node_voltages) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
        assert_eq!(fast.node_voltages[0], 0.0);
    }

    #[test]
    fn test_branch_currents_satisfy_kcl() {
        let mut inc = Incidence::new(4);
        inc.push_branch(0, 1);
        inc.push_branch(1, 2);
        inc.push_branch(2, 3);
        inc.push_branch(3, 0);
        inc.push_branch(1, 3);
        let mut sys = BranchSystem::new(inc);
        sys.stamp(0, stamp(1e3, 5.0, 0.0));
        sys.stamp(1, stamp(0.5, 0.0, 0.0));
        sys.stamp(2, stamp(0.25, 0.0, 0.1));
        sys.stamp(3, stamp(2.0, 1.0, 0.0));
        sys.stamp(4, stamp(1.0, 0.0, 0.0));

        let sol = sys.solve(1e-15).unwrap();
        let net = sys.incidence.apply_transpose(&sol.branch_currents);
        for node_sum in &net[1..] {
            assert_abs_diff_eq!(*node_sum, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_dimension_mismatch_is_reported() {
        let mut inc = Incidence::new(2);
        inc.push_branch(0, 1);
        let mut sys = BranchSystem::<f64>::new(inc);
        sys.admittance.push(1.0);
        assert!(matches!(
            sys.solve(1e-15),
            Err(CirsimError::DimensionMismatch { expected: 1, actual: 2, .. })
        ));
    }

    #[test]
    fn test_two_node_open_circuit_is_singular() {
        let mut inc = Incidence::new(2);
        inc.push_branch(0, 1);
        let sys = BranchSystem::<f64>::new(inc);
        assert!(matches!(sys.solve(1e-15), Err(CirsimError::SingularMatrix)));
    }
}
