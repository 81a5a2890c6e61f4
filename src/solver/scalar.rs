//! Field abstraction shared by the real (DC) and complex (AC) solves.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use num_complex::Complex64;

/// A number the branch-form MNA system can be assembled and solved over.
pub trait Scalar:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
{
    fn zero() -> Self;

    /// Magnitude used for pivoting and singularity checks.
    fn modulus(self) -> f64;

    fn finite(self) -> bool;
}

impl Scalar for f64 {
    fn zero() -> Self {
        0.0
    }

    fn modulus(self) -> f64 {
        self.abs()
    }

    fn finite(self) -> bool {
        self.is_finite()
    }
}

impl Scalar for Complex64 {
    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }

    fn modulus(self) -> f64 {
        self.norm()
    }

    fn finite(self) -> bool {
        self.is_finite()
    }
}
